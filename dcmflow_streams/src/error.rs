//! Defines the type used to describe errors that can occur while streaming
//! DICOM data through the parse, modify, validate, and collect stages.

use dcmflow_core::{DataElementTag, DcmflowError};

/// An error that occurred in one of the streaming stages. Errors are terminal
/// for a pipeline: the failing stage stops emitting parts and the error
/// propagates to the consumer.
///
#[derive(Clone, Debug, PartialEq)]
pub enum StreamError {
  /// The parse stage requires more data to be written before the next part
  /// can be read. This is the cooperative suspension signal rather than a
  /// failure.
  DataRequired { when: String },

  /// The end of the incoming data was reached while reading the next part,
  /// and no more data is able to be added. The provided data is malformed or
  /// truncated.
  DataEndedUnexpectedly { when: String, offset: u64 },

  /// The incoming data could not be interpreted at the current position,
  /// e.g. a malformed header, an unrecognized VR, or a misaligned length.
  DataInvalid {
    when: String,
    details: String,
    offset: Option<u64>,
  },

  /// The File Meta Information specified a DICOM transfer syntax that isn't
  /// supported.
  TransferSyntaxNotSupported { transfer_syntax_uid: String },

  /// The validate stage found no configured validation context matching the
  /// stream's SOP class and transfer syntax pair.
  NoValidContext {
    sop_class_uid: String,
    transfer_syntax_uid: String,
  },

  /// The validate stage rejected the stream before reaching a context check,
  /// e.g. a corrupt preamble or File Meta Information elements out of order.
  ValidationFailed { details: String },

  /// An element insertion was requested for a tag that is not in the
  /// dictionary, so no VR is available to encode it with.
  UnknownTagForInsertion { tag: DataElementTag },

  /// An element insertion was requested for a tag whose VR is `SQ`. Sequences
  /// cannot be synthesized into a part stream.
  CannotInsertSequence { tag: DataElementTag },

  /// The collect stage exceeded its configured buffer cap before its stop
  /// condition fired.
  CollectBufferOverflow {
    label: String,
    max_buffer_size: u64,
  },

  /// One of the configured maximums, e.g. the maximum sequence depth, was
  /// exceeded.
  MaximumExceeded { details: String, offset: u64 },

  /// Bytes were written to a stage after its final bytes had already been
  /// written.
  WriteAfterCompletion,

  /// A part was received that is invalid at the current position in the part
  /// stream, e.g. a value chunk with no preceding header.
  PartStreamInvalid { when: String, details: String },

  /// An error with an underlying file or read stream.
  FileError { when: String, details: String },
}

impl std::fmt::Display for StreamError {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "DICOM stream error: {}", self.name())
  }
}

impl StreamError {
  /// Returns the name of the error as a human-readable string.
  ///
  pub fn name(&self) -> String {
    match self {
      StreamError::DataRequired { .. } => "Data required".to_string(),
      StreamError::DataEndedUnexpectedly { .. } => {
        "Unexpected end of data".to_string()
      }
      StreamError::DataInvalid { .. } => "Invalid data".to_string(),
      StreamError::TransferSyntaxNotSupported { .. } => {
        "Transfer syntax not supported".to_string()
      }
      StreamError::NoValidContext { .. } => {
        "No valid presentation context".to_string()
      }
      StreamError::ValidationFailed { .. } => "Validation failed".to_string(),
      StreamError::UnknownTagForInsertion { tag } => {
        format!("Unknown tag for insertion: {}", tag)
      }
      StreamError::CannotInsertSequence { tag } => {
        format!("Cannot insert sequence: {}", tag)
      }
      StreamError::CollectBufferOverflow { .. } => {
        "Collect buffer overflow".to_string()
      }
      StreamError::MaximumExceeded { .. } => "Maximum exceeded".to_string(),
      StreamError::WriteAfterCompletion => {
        "Write after completion".to_string()
      }
      StreamError::PartStreamInvalid { .. } => {
        "Part stream invalid".to_string()
      }
      StreamError::FileError { .. } => "File I/O failure".to_string(),
    }
  }
}

impl DcmflowError for StreamError {
  /// Returns lines of text that describe a stream error in a human-readable
  /// format.
  ///
  fn to_lines(&self, task_description: &str) -> Vec<String> {
    let mut lines = vec![];

    lines.push(format!("DICOM stream error {}", task_description));
    lines.push("".to_string());
    lines.push(format!("  Error: {}", self.name()));

    match self {
      StreamError::DataRequired { when }
      | StreamError::DataEndedUnexpectedly { when, .. }
      | StreamError::DataInvalid { when, .. }
      | StreamError::PartStreamInvalid { when, .. }
      | StreamError::FileError { when, .. } => {
        lines.push(format!("  When: {}", when));
      }

      _ => (),
    };

    match self {
      StreamError::DataInvalid { details, .. }
      | StreamError::ValidationFailed { details }
      | StreamError::MaximumExceeded { details, .. }
      | StreamError::PartStreamInvalid { details, .. }
      | StreamError::FileError { details, .. } => {
        lines.push(format!("  Details: {}", details));
      }

      StreamError::TransferSyntaxNotSupported {
        transfer_syntax_uid,
      } => {
        lines.push(format!("  Transfer syntax UID: {}", transfer_syntax_uid));
      }

      StreamError::NoValidContext {
        sop_class_uid,
        transfer_syntax_uid,
      } => {
        lines.push(format!("  SOP class UID: {}", sop_class_uid));
        lines.push(format!("  Transfer syntax UID: {}", transfer_syntax_uid));
      }

      StreamError::CollectBufferOverflow {
        label,
        max_buffer_size,
      } => {
        lines.push(format!("  Label: {}", label));
        lines.push(format!("  Max buffer size: {} bytes", max_buffer_size));
      }

      _ => (),
    };

    match self {
      StreamError::DataEndedUnexpectedly { offset, .. }
      | StreamError::MaximumExceeded { offset, .. } => {
        lines.push(format!("  Offset: 0x{:X}", offset));
      }

      StreamError::DataInvalid {
        offset: Some(offset),
        ..
      } => {
        lines.push(format!("  Offset: 0x{:X}", offset));
      }

      _ => (),
    };

    lines
  }
}
