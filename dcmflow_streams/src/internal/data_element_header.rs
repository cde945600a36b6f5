use byteorder::ByteOrder;

use dcmflow_core::value_representation::ValueLengthSize;
use dcmflow_core::{dictionary, DataElementTag, ValueRepresentation};

use crate::internal::value_length::ValueLength;

/// Describes the header for a single data element: its tag, VR, and value
/// length. The VR is absent for items and the item/sequence delimitation
/// tags, which never carry one.
///
pub struct DataElementHeader {
  pub tag: DataElementTag,
  pub vr: Option<ValueRepresentation>,
  pub length: ValueLength,
}

impl std::fmt::Display for DataElementHeader {
  /// Formats a data element header in the format "(GROUP,ELEMENT) VR NAME",
  /// e.g. `"(0008,0020) DA Study Date"`.
  ///
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    let tag_name = dictionary::tag_name(self.tag);

    match self.vr {
      Some(vr) => write!(f, "{} {} {}", self.tag, vr, tag_name),
      None => write!(f, "{} {}", self.tag, tag_name),
    }
  }
}

impl DataElementHeader {
  /// Serializes a data element header to its wire bytes in the given
  /// encoding.
  ///
  /// Headers without a VR, i.e. items and delimitation items, are 8 bytes:
  /// the tag followed by a 32-bit length. Implicit VR headers have the same
  /// layout. Explicit VR headers carry the two-byte VR code and then either
  /// a 16-bit length, or a two-byte reserved gap and a 32-bit length,
  /// depending on the VR.
  ///
  pub fn to_bytes(&self, big_endian: bool, explicit_vr: bool) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(12);
    bytes.extend_from_slice(&self.tag.to_bytes(big_endian));

    let vr = match self.vr {
      Some(vr) if explicit_vr => vr,

      // No VR code on the wire, so the length is the next four bytes
      _ => {
        bytes.extend_from_slice(&encode_u32(
          self.length.to_u32(),
          big_endian,
        ));
        return bytes;
      }
    };

    bytes.extend_from_slice(&vr.to_bytes());

    match vr.value_length_size() {
      ValueLengthSize::U16 => {
        let mut length = [0u8; 2];
        if big_endian {
          byteorder::BigEndian::write_u16(
            &mut length,
            self.length.to_u32() as u16,
          );
        } else {
          byteorder::LittleEndian::write_u16(
            &mut length,
            self.length.to_u32() as u16,
          );
        }
        bytes.extend_from_slice(&length);
      }

      ValueLengthSize::U32 => {
        bytes.extend_from_slice(&[0, 0]);
        bytes.extend_from_slice(&encode_u32(
          self.length.to_u32(),
          big_endian,
        ));
      }
    }

    bytes
  }
}

/// Encodes a `u32` in the given byte order.
///
pub fn encode_u32(value: u32, big_endian: bool) -> [u8; 4] {
  let mut bytes = [0u8; 4];

  if big_endian {
    byteorder::BigEndian::write_u32(&mut bytes, value);
  } else {
    byteorder::LittleEndian::write_u32(&mut bytes, value);
  }

  bytes
}

/// Decodes a `u32` from the given byte order.
///
pub fn decode_u32(bytes: &[u8], big_endian: bool) -> u32 {
  if big_endian {
    byteorder::BigEndian::read_u32(bytes)
  } else {
    byteorder::LittleEndian::read_u32(bytes)
  }
}

/// Decodes a `u16` from the given byte order.
///
pub fn decode_u16(bytes: &[u8], big_endian: bool) -> u16 {
  if big_endian {
    byteorder::BigEndian::read_u16(bytes)
  } else {
    byteorder::LittleEndian::read_u16(bytes)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn to_string_test() {
    assert_eq!(
      DataElementHeader {
        tag: dictionary::STUDY_DATE.tag,
        vr: Some(ValueRepresentation::Date),
        length: ValueLength::ZERO,
      }
      .to_string(),
      "(0008,0020) DA Study Date"
    );

    assert_eq!(
      DataElementHeader {
        tag: dictionary::ITEM.tag,
        vr: None,
        length: ValueLength::ZERO,
      }
      .to_string(),
      "(FFFE,E000) Item"
    );
  }

  #[test]
  fn explicit_short_header_test() {
    let header = DataElementHeader {
      tag: dictionary::STUDY_DATE.tag,
      vr: Some(ValueRepresentation::Date),
      length: ValueLength::new(8),
    };

    assert_eq!(
      header.to_bytes(false, true),
      vec![0x08, 0x00, 0x20, 0x00, b'D', b'A', 0x08, 0x00]
    );

    assert_eq!(
      header.to_bytes(true, true),
      vec![0x00, 0x08, 0x00, 0x20, b'D', b'A', 0x00, 0x08]
    );
  }

  #[test]
  fn explicit_long_header_test() {
    let header = DataElementHeader {
      tag: dictionary::PIXEL_DATA.tag,
      vr: Some(ValueRepresentation::OtherByteString),
      length: ValueLength::Undefined,
    };

    assert_eq!(
      header.to_bytes(false, true),
      vec![
        0xE0, 0x7F, 0x10, 0x00, b'O', b'B', 0x00, 0x00, 0xFF, 0xFF, 0xFF,
        0xFF
      ]
    );
  }

  #[test]
  fn implicit_header_test() {
    let header = DataElementHeader {
      tag: dictionary::PATIENT_NAME.tag,
      vr: Some(ValueRepresentation::PersonName),
      length: ValueLength::new(4),
    };

    assert_eq!(
      header.to_bytes(false, false),
      vec![0x10, 0x00, 0x10, 0x00, 0x04, 0x00, 0x00, 0x00]
    );
  }

  #[test]
  fn item_header_test() {
    let header = DataElementHeader {
      tag: dictionary::ITEM_DELIMITATION_ITEM.tag,
      vr: None,
      length: ValueLength::ZERO,
    };

    assert_eq!(
      header.to_bytes(false, true),
      vec![0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00]
    );
  }
}
