//! Byte-level gate that accepts or rejects a DICOM stream by matching its
//! File Meta Information against a set of allowed SOP class and transfer
//! syntax pairs, using a bounded lookahead buffer.

use dcmflow_core::value_representation::ValueLengthSize;
use dcmflow_core::{
  dictionary, transfer_syntax, DataElementTag, ValueRepresentation,
};

use crate::internal::data_element_header::{decode_u16, decode_u32};
use crate::StreamError;

/// A pair of SOP class UID and transfer syntax UID that a validated stream
/// is allowed to use.
///
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationContext {
  pub sop_class_uid: String,
  pub transfer_syntax_uid: String,
}

impl ValidationContext {
  pub fn new(sop_class_uid: &str, transfer_syntax_uid: &str) -> Self {
    Self {
      sop_class_uid: sop_class_uid.to_string(),
      transfer_syntax_uid: transfer_syntax_uid.to_string(),
    }
  }
}

/// The File Meta Information of a stream is guaranteed to fit within this
/// many leading bytes, so the gate never buffers more before deciding.
///
const VALIDATION_LOOKAHEAD: usize = 512;

enum ValidateState {
  Buffering { buffer: Vec<u8> },
  PassThrough,
  Draining { error: StreamError },
}

/// A byte-level transform that sits in front of the parse stage and only
/// lets a stream through once its leading bytes have been validated.
///
/// With no contexts configured the gate only checks that the stream starts
/// with a valid preamble or a valid first data element header. With contexts
/// configured, the SOP class UID and transfer syntax UID are extracted from
/// the File Meta Information, or from the leading data set elements when
/// there is no preamble, and must match one of the configured contexts.
///
/// The failure behavior is controlled by `drain_incoming`: when false, the
/// first write after a failed validation returns the error, cancelling
/// upstream immediately; when true, incoming bytes continue to be accepted
/// and silently discarded, and the error is only surfaced once the stream
/// ends. The drain mode protects producers that cannot tolerate abrupt
/// cancellation.
///
pub struct ValidateTransform {
  contexts: Option<Vec<ValidationContext>>,
  drain_incoming: bool,
  state: ValidateState,
}

impl ValidateTransform {
  /// Creates a new validate gate. `contexts` of `None` enables the
  /// prefix-only check described above.
  ///
  pub fn new(
    contexts: Option<Vec<ValidationContext>>,
    drain_incoming: bool,
  ) -> Self {
    Self {
      contexts,
      drain_incoming,
      state: ValidateState::Buffering { buffer: vec![] },
    }
  }

  /// Adds the next chunk of incoming bytes and returns the bytes to forward
  /// downstream. While the gate is still deciding, nothing is forwarded; on
  /// acceptance the buffered lookahead flushes through, followed by all
  /// subsequent bytes unchanged.
  ///
  pub fn add_bytes(
    &mut self,
    chunk: &[u8],
  ) -> Result<Vec<u8>, StreamError> {
    match &mut self.state {
      ValidateState::PassThrough => Ok(chunk.to_vec()),

      ValidateState::Draining { .. } => Ok(vec![]),

      ValidateState::Buffering { buffer } => {
        buffer.extend_from_slice(chunk);

        if buffer.len() < VALIDATION_LOOKAHEAD {
          return Ok(vec![]);
        }

        let buffer = std::mem::take(buffer);

        match self.validate_buffer(&buffer) {
          Ok(()) => {
            self.state = ValidateState::PassThrough;
            Ok(buffer)
          }

          Err(error) => self.fail(error),
        }
      }
    }
  }

  /// Signals the end of the incoming bytes. A stream shorter than the
  /// lookahead bound is validated here on whatever arrived; a stream that
  /// failed in drain mode surfaces its error here.
  ///
  pub fn end(&mut self) -> Result<Vec<u8>, StreamError> {
    match std::mem::replace(&mut self.state, ValidateState::PassThrough) {
      ValidateState::PassThrough => Ok(vec![]),

      ValidateState::Draining { error } => Err(error),

      ValidateState::Buffering { buffer } => {
        self.validate_buffer(&buffer)?;
        Ok(buffer)
      }
    }
  }

  fn fail(&mut self, error: StreamError) -> Result<Vec<u8>, StreamError> {
    if self.drain_incoming {
      self.state = ValidateState::Draining { error };
      Ok(vec![])
    } else {
      Err(error)
    }
  }

  fn validate_buffer(&self, buffer: &[u8]) -> Result<(), StreamError> {
    match &self.contexts {
      None => validate_prefix(buffer),
      Some(contexts) => validate_contexts(buffer, contexts),
    }
  }
}

fn has_preamble(buffer: &[u8]) -> bool {
  buffer.len() >= 132 && &buffer[128..132] == b"DICM"
}

/// With no contexts configured, a stream is accepted iff it begins with a
/// valid preamble or a plausible first data element header.
///
fn validate_prefix(buffer: &[u8]) -> Result<(), StreamError> {
  if has_preamble(buffer) {
    return Ok(());
  }

  if buffer.len() >= 8 {
    let tag = DataElementTag::from_bytes(buffer, false);

    let has_valid_vr =
      ValueRepresentation::from_bytes(&buffer[4..6]).is_ok();

    if (tag.group == 0x0002 || tag.group == 0x0008)
      && (has_valid_vr || dictionary::find(tag).is_ok())
    {
      return Ok(());
    }
  }

  Err(StreamError::ValidationFailed {
    details: "Stream does not start with a DICOM preamble or a valid data \
      element header"
      .to_string(),
  })
}

fn validate_contexts(
  buffer: &[u8],
  contexts: &[ValidationContext],
) -> Result<(), StreamError> {
  let bytes = if has_preamble(buffer) {
    &buffer[132..]
  } else {
    buffer
  };

  if bytes.len() < 8 {
    return Err(StreamError::ValidationFailed {
      details: "Stream is too short to validate".to_string(),
    });
  }

  let (sop_class_uid, transfer_syntax_uid) =
    if DataElementTag::from_bytes(bytes, false).group == 0x0002 {
      extract_fmi_context(bytes)?
    } else {
      extract_dataset_context(bytes)?
    };

  let is_allowed = contexts.iter().any(|context| {
    context.sop_class_uid == sop_class_uid
      && context.transfer_syntax_uid == transfer_syntax_uid
  });

  if is_allowed {
    Ok(())
  } else {
    Err(StreamError::NoValidContext {
      sop_class_uid,
      transfer_syntax_uid,
    })
  }
}

/// Walks the File Meta Information elements within the lookahead buffer and
/// extracts the media storage SOP class UID and the transfer syntax UID.
/// The File Meta Information is always explicit VR little endian, and its
/// tags must be in ascending order.
///
fn extract_fmi_context(
  bytes: &[u8],
) -> Result<(String, String), StreamError> {
  let mut offset = 0;
  let mut previous_tag = None;
  let mut sop_class_uid = None;
  let mut transfer_syntax_uid = None;

  while offset + 8 <= bytes.len() {
    let tag = DataElementTag::from_bytes(&bytes[offset..], false);

    if tag.group != 0x0002 {
      break;
    }

    if let Some(previous_tag) = previous_tag {
      if tag <= previous_tag {
        return Err(StreamError::ValidationFailed {
          details: format!(
            "File Meta Information tags are out of order at {}",
            tag
          ),
        });
      }
    }
    previous_tag = Some(tag);

    let vr = ValueRepresentation::from_bytes(&bytes[offset + 4..offset + 6])
      .map_err(|_| StreamError::ValidationFailed {
        details: format!(
          "File Meta Information element {} has an invalid VR",
          tag
        ),
      })?;

    let (header_size, length) = match vr.value_length_size() {
      ValueLengthSize::U16 => {
        (8, decode_u16(&bytes[offset + 6..offset + 8], false) as usize)
      }

      ValueLengthSize::U32 => {
        if offset + 12 > bytes.len() {
          break;
        }

        (12, decode_u32(&bytes[offset + 8..offset + 12], false) as usize)
      }
    };

    if offset + header_size + length > bytes.len() {
      break;
    }

    let value = &bytes[offset + header_size..offset + header_size + length];

    if tag == dictionary::MEDIA_STORAGE_SOP_CLASS_UID.tag {
      sop_class_uid = Some(uid_value(value));
    } else if tag == dictionary::TRANSFER_SYNTAX_UID.tag {
      transfer_syntax_uid = Some(uid_value(value));
    }

    offset += header_size + length;
  }

  match (sop_class_uid, transfer_syntax_uid) {
    (Some(sop_class_uid), Some(transfer_syntax_uid)) => {
      Ok((sop_class_uid, transfer_syntax_uid))
    }

    _ => Err(StreamError::ValidationFailed {
      details: "File Meta Information does not contain both a SOP class UID \
        and a transfer syntax UID"
        .to_string(),
    }),
  }
}

/// When a stream has no preamble and no File Meta Information, its data set
/// is expected to lead with small group 0x0008 elements in ascending tag
/// order, from which the SOP class UID is extracted and paired with
/// 'Explicit VR Little Endian' for the context check.
///
fn extract_dataset_context(
  bytes: &[u8],
) -> Result<(String, String), StreamError> {
  let mut offset = 0;
  let mut previous_tag = None;

  while offset + 8 <= bytes.len() {
    let tag = DataElementTag::from_bytes(&bytes[offset..], false);

    if tag > dictionary::SOP_CLASS_UID.tag {
      break;
    }

    if let Some(previous_tag) = previous_tag {
      if tag <= previous_tag {
        return Err(StreamError::ValidationFailed {
          details: format!("Data set tags are out of order at {}", tag),
        });
      }
    }
    previous_tag = Some(tag);

    let vr = ValueRepresentation::from_bytes(&bytes[offset + 4..offset + 6])
      .map_err(|_| StreamError::ValidationFailed {
        details: format!("Data element {} has an invalid VR", tag),
      })?;

    let (header_size, length) = match vr.value_length_size() {
      ValueLengthSize::U16 => {
        (8, decode_u16(&bytes[offset + 6..offset + 8], false) as usize)
      }

      ValueLengthSize::U32 => {
        if offset + 12 > bytes.len() {
          break;
        }

        (12, decode_u32(&bytes[offset + 8..offset + 12], false) as usize)
      }
    };

    if offset + header_size + length > bytes.len() {
      break;
    }

    if tag == dictionary::SOP_CLASS_UID.tag {
      let value =
        &bytes[offset + header_size..offset + header_size + length];

      return Ok((
        uid_value(value),
        transfer_syntax::EXPLICIT_VR_LITTLE_ENDIAN.uid.to_string(),
      ));
    }

    offset += header_size + length;
  }

  Err(StreamError::ValidationFailed {
    details: "SOP class UID not found in the leading data set elements"
      .to_string(),
  })
}

fn uid_value(bytes: &[u8]) -> String {
  String::from_utf8_lossy(bytes)
    .trim_end_matches(['\0', ' '])
    .to_string()
}
