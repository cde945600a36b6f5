//! Builders for the DICOM byte streams used by tests across this crate.

use dcmflow_core::{dictionary, DataElementTag, ValueRepresentation};

use crate::internal::data_element_header::DataElementHeader;
use crate::internal::value_length::ValueLength;
use crate::parse::{ParseConfig, ParseContext};
use crate::{DicomPart, PartTransform, StreamError};

/// Serializes a complete data element, header plus value, in the given
/// encoding. The value must already be of even length.
///
pub fn element(
  tag: DataElementTag,
  vr: ValueRepresentation,
  value: &[u8],
  big_endian: bool,
  explicit_vr: bool,
) -> Vec<u8> {
  let mut bytes = DataElementHeader {
    tag,
    vr: Some(vr),
    length: ValueLength::new(value.len() as u32),
  }
  .to_bytes(big_endian, explicit_vr);

  bytes.extend_from_slice(value);
  bytes
}

pub fn element_le(
  tag: DataElementTag,
  vr: ValueRepresentation,
  value: &[u8],
) -> Vec<u8> {
  element(tag, vr, value, false, true)
}

pub fn element_be(
  tag: DataElementTag,
  vr: ValueRepresentation,
  value: &[u8],
) -> Vec<u8> {
  element(tag, vr, value, true, true)
}

pub fn element_implicit_le(
  tag: DataElementTag,
  value: &[u8],
) -> Vec<u8> {
  let mut bytes = DataElementHeader {
    tag,
    vr: None,
    length: ValueLength::new(value.len() as u32),
  }
  .to_bytes(false, false);

  bytes.extend_from_slice(value);
  bytes
}

pub fn sequence_undefined_le(tag: DataElementTag) -> Vec<u8> {
  DataElementHeader {
    tag,
    vr: Some(ValueRepresentation::Sequence),
    length: ValueLength::Undefined,
  }
  .to_bytes(false, true)
}

pub fn sequence_defined_le(tag: DataElementTag, length: u32) -> Vec<u8> {
  DataElementHeader {
    tag,
    vr: Some(ValueRepresentation::Sequence),
    length: ValueLength::new(length),
  }
  .to_bytes(false, true)
}

pub fn item_undefined_le() -> Vec<u8> {
  DataElementHeader {
    tag: dictionary::ITEM.tag,
    vr: None,
    length: ValueLength::Undefined,
  }
  .to_bytes(false, false)
}

pub fn item_defined_le(length: u32) -> Vec<u8> {
  DataElementHeader {
    tag: dictionary::ITEM.tag,
    vr: None,
    length: ValueLength::new(length),
  }
  .to_bytes(false, false)
}

pub fn item_delimitation_le() -> Vec<u8> {
  DataElementHeader {
    tag: dictionary::ITEM_DELIMITATION_ITEM.tag,
    vr: None,
    length: ValueLength::ZERO,
  }
  .to_bytes(false, false)
}

pub fn sequence_delimitation_le() -> Vec<u8> {
  DataElementHeader {
    tag: dictionary::SEQUENCE_DELIMITATION_ITEM.tag,
    vr: None,
    length: ValueLength::ZERO,
  }
  .to_bytes(false, false)
}

/// The 128-byte preamble followed by the "DICM" prefix.
///
pub fn preamble() -> Vec<u8> {
  let mut bytes = vec![0u8; 128];
  bytes.extend_from_slice(b"DICM");
  bytes
}

/// A File Meta Information group holding an optional media storage SOP class
/// UID and a transfer syntax UID, preceded by its group length element.
///
pub fn fmi_group(
  sop_class_uid: Option<&str>,
  transfer_syntax_uid: &str,
) -> Vec<u8> {
  let mut body = vec![];

  if let Some(sop_class_uid) = sop_class_uid {
    body.extend(element_le(
      dictionary::MEDIA_STORAGE_SOP_CLASS_UID.tag,
      ValueRepresentation::UniqueIdentifier,
      &padded_uid(sop_class_uid),
    ));
  }

  body.extend(element_le(
    dictionary::TRANSFER_SYNTAX_UID.tag,
    ValueRepresentation::UniqueIdentifier,
    &padded_uid(transfer_syntax_uid),
  ));

  let mut bytes = element_le(
    dictionary::FILE_META_INFORMATION_GROUP_LENGTH.tag,
    ValueRepresentation::UnsignedLong,
    &(body.len() as u32).to_le_bytes(),
  );
  bytes.extend(body);

  bytes
}

/// Pads a UID string with a trailing zero byte when its length is odd.
///
pub fn padded_uid(uid: &str) -> Vec<u8> {
  let mut bytes = uid.as_bytes().to_vec();
  ValueRepresentation::UniqueIdentifier.pad_bytes_to_even_length(&mut bytes);
  bytes
}

/// Parses a complete in-memory byte stream into all of its parts, ending
/// with [`DicomPart::End`].
///
pub fn parse_all(bytes: &[u8]) -> Result<Vec<DicomPart>, StreamError> {
  parse_all_with_config(bytes, ParseConfig::default())
}

pub fn parse_all_with_config(
  bytes: &[u8],
  config: ParseConfig,
) -> Result<Vec<DicomPart>, StreamError> {
  let mut context = ParseContext::new();
  context.set_config(config);
  context.write_bytes(bytes.to_vec(), true)?;

  let mut parts = vec![];

  loop {
    let next = context.read_parts()?;
    let ended = next.contains(&DicomPart::End);

    parts.extend(next);

    if ended {
      return Ok(parts);
    }
  }
}

/// Feeds a vector of parts through a transform and returns everything it
/// emits.
///
pub fn run_transform(
  mut transform: impl PartTransform,
  parts: Vec<DicomPart>,
) -> Result<Vec<DicomPart>, StreamError> {
  let mut output = vec![];

  for part in parts {
    output.extend(transform.add_part(part)?);
  }

  Ok(output)
}

/// Concatenates the wire bytes of a sequence of parts.
///
pub fn concat_bytes(parts: &[DicomPart]) -> Vec<u8> {
  let mut bytes = vec![];

  for part in parts {
    bytes.extend_from_slice(part.bytes());
  }

  bytes
}
