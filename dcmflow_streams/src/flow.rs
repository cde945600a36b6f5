//! Composition of the streaming stages into a pipeline.
//!
//! A [`Pipeline`] owns a parse context, an optional byte-level validate gate
//! in front of it, and a chain of part transforms behind it. Raw bytes are
//! written in with [`Pipeline::write_bytes`] and transformed parts are pulled
//! out with [`Pipeline::read_parts`], so the whole arrangement is driven
//! cooperatively by downstream demand: a stage runs only when the consumer
//! asks for more parts, and suspends by returning
//! [`StreamError::DataRequired`] when it needs more input.
//!
//! For any two parts emitted by the parse stage in order, every downstream
//! transform emits its output for the first strictly before its output for
//! the second. Transforms may synthesize new parts between incoming ones but
//! never reorder them. Dropping a pipeline releases all buffered bytes and
//! parts; no background work is left behind.

use crate::parse::{ParseConfig, ParseContext};
use crate::transforms::validate::ValidateTransform;
use crate::{DicomPart, StreamError};

/// A state-holding stage in a DICOM part pipeline. Parts are fed in one at a
/// time in stream order, and each call returns the parts to emit downstream,
/// which may be empty while the transform buffers, or more than one when it
/// synthesizes parts.
///
/// The end of the stream is signalled by the [`DicomPart::End`] part, on
/// which a transform flushes anything it is still holding.
///
pub trait PartTransform {
  fn add_part(
    &mut self,
    part: DicomPart,
  ) -> Result<Vec<DicomPart>, StreamError>;
}

/// A complete parse pipeline: an optional validate gate, the parse stage,
/// and a chain of part transforms.
///
pub struct Pipeline {
  validate: Option<ValidateTransform>,
  context: ParseContext,
  transforms: Vec<Box<dyn PartTransform>>,
}

impl Pipeline {
  /// Creates a new pipeline with the default parse configuration and no
  /// transforms.
  ///
  pub fn new() -> Self {
    Self::with_config(ParseConfig::default())
  }

  /// Creates a new pipeline with the given parse configuration.
  ///
  pub fn with_config(config: ParseConfig) -> Self {
    let mut context = ParseContext::new();
    context.set_config(config);

    Self {
      validate: None,
      context,
      transforms: vec![],
    }
  }

  /// Puts a validate gate in front of the parse stage. Incoming bytes only
  /// reach the parser once the gate has accepted the stream.
  ///
  pub fn with_validation(mut self, validate: ValidateTransform) -> Self {
    self.validate = Some(validate);
    self
  }

  /// Appends a part transform to the downstream end of the pipeline.
  ///
  pub fn with_transform(
    mut self,
    transform: impl PartTransform + 'static,
  ) -> Self {
    self.transforms.push(Box::new(transform));
    self
  }

  /// Writes a chunk of raw DICOM bytes into the pipeline. If `done` is true
  /// this is the final chunk. When a validate gate is configured the bytes
  /// pass through it first, and a rejected stream surfaces its error here.
  ///
  pub fn write_bytes(
    &mut self,
    bytes: Vec<u8>,
    done: bool,
  ) -> Result<(), StreamError> {
    match self.validate.as_mut() {
      Some(validate) => {
        let mut passed = validate.add_bytes(&bytes)?;

        if done {
          passed.append(&mut validate.end()?);
        }

        self.context.write_bytes(passed, done)
      }

      None => self.context.write_bytes(bytes, done),
    }
  }

  /// Reads the next parts out of the pipeline, pulling them from the parse
  /// stage and threading them through each transform in order. Returns
  /// [`StreamError::DataRequired`] when more input is needed, and an empty
  /// vector when the stages consumed everything they were given. The stream
  /// is complete once [`DicomPart::End`] is returned.
  ///
  pub fn read_parts(&mut self) -> Result<Vec<DicomPart>, StreamError> {
    let mut parts = self.context.read_parts()?;

    for transform in self.transforms.iter_mut() {
      let mut transformed = Vec::with_capacity(parts.len());

      for part in parts {
        transformed.append(&mut transform.add_part(part)?);
      }

      parts = transformed;
    }

    Ok(parts)
  }
}

impl Default for Pipeline {
  fn default() -> Self {
    Self::new()
  }
}

/// Reads the next DICOM parts from a read stream, repeatedly reading bytes
/// in 256 KiB chunks until the pipeline makes at least one part available or
/// an error occurs.
///
pub fn read_parts_from_stream(
  stream: &mut dyn std::io::Read,
  pipeline: &mut Pipeline,
) -> Result<Vec<DicomPart>, StreamError> {
  loop {
    match pipeline.read_parts() {
      Ok(parts) => {
        if parts.is_empty() {
          continue;
        } else {
          return Ok(parts);
        }
      }

      // If the pipeline needs more data then read bytes from the stream,
      // write them in, and try again
      Err(StreamError::DataRequired { .. }) => {
        let mut buffer = vec![0u8; 256 * 1024];

        match stream.read(&mut buffer) {
          Ok(0) => pipeline.write_bytes(vec![], true)?,

          Ok(bytes_count) => {
            buffer.truncate(bytes_count);
            pipeline.write_bytes(buffer, false)?;
          }

          Err(e) => {
            return Err(StreamError::FileError {
              when: "Reading from stream".to_string(),
              details: e.to_string(),
            })
          }
        }
      }

      Err(e) => return Err(e),
    }
  }
}

/// Runs a complete in-memory byte vector through a pipeline and returns all
/// emitted parts, ending with [`DicomPart::End`].
///
pub fn read_all_parts(
  bytes: Vec<u8>,
  pipeline: &mut Pipeline,
) -> Result<Vec<DicomPart>, StreamError> {
  pipeline.write_bytes(bytes, true)?;

  let mut parts = vec![];

  loop {
    let next = pipeline.read_parts()?;
    let ended = next.contains(&DicomPart::End);

    parts.extend(next);

    if ended {
      return Ok(parts);
    }
  }
}
