//! A DICOM data element tag, defined as 16-bit `group` and `element` values.

use byteorder::ByteOrder;

/// A data element tag that is defined by `group` and `element` values, each of
/// which is a 16-bit unsigned integer.
///
/// The derived ordering compares the group and then the element as unsigned
/// integers, which is identical to ordering by [`DataElementTag::to_int`].
/// Tags with the high bit set, e.g. private groups and the `(FFFE,*)`
/// delimitation tags, therefore sort after all other tags rather than first.
///
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DataElementTag {
  pub group: u16,
  pub element: u16,
}

impl std::fmt::Display for DataElementTag {
  /// Formats a data element tag as `"($GROUP,$ELEMENT)"`, e.g. `"(0008,0020)"`.
  ///
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "({:04X},{:04X})", self.group, self.element)
  }
}

impl DataElementTag {
  /// Creates a new data element tag with the given group and element values.
  ///
  pub const fn new(group: u16, element: u16) -> Self {
    Self { group, element }
  }

  /// Returns whether the tag is private, which is determined by the group
  /// number being odd.
  ///
  pub fn is_private(&self) -> bool {
    self.group & 1 == 1
  }

  /// Returns whether the tag is for a private creator, which is determined by
  /// the group number being odd and the element being between 0x10 and 0xFF.
  /// Ref: PS3.5 7.8.1.
  ///
  pub fn is_private_creator(&self) -> bool {
    self.is_private() && (0x10..=0xFF).contains(&self.element)
  }

  /// Converts a tag to a single 32-bit integer where the group is in the high
  /// 16 bits and the element is in the low 16 bits.
  ///
  pub fn to_int(&self) -> u32 {
    ((self.group as u32) << 16) | self.element as u32
  }

  /// Reads a tag from the first four bytes of `bytes` in the given byte
  /// order.
  ///
  pub fn from_bytes(bytes: &[u8], big_endian: bool) -> Self {
    if big_endian {
      Self::new(
        byteorder::BigEndian::read_u16(&bytes[0..2]),
        byteorder::BigEndian::read_u16(&bytes[2..4]),
      )
    } else {
      Self::new(
        byteorder::LittleEndian::read_u16(&bytes[0..2]),
        byteorder::LittleEndian::read_u16(&bytes[2..4]),
      )
    }
  }

  /// Returns the four bytes for this tag in the given byte order.
  ///
  pub fn to_bytes(&self, big_endian: bool) -> [u8; 4] {
    let mut bytes = [0u8; 4];

    if big_endian {
      byteorder::BigEndian::write_u16(&mut bytes[0..2], self.group);
      byteorder::BigEndian::write_u16(&mut bytes[2..4], self.element);
    } else {
      byteorder::LittleEndian::write_u16(&mut bytes[0..2], self.group);
      byteorder::LittleEndian::write_u16(&mut bytes[2..4], self.element);
    }

    bytes
  }

  /// Formats a data element tag as `"$GROUP$ELEMENT"`, e.g. `"0008002D"`.
  ///
  pub fn to_hex_string(&self) -> String {
    format!("{:04X}{:04X}", self.group, self.element)
  }

  /// Creates a data element tag from a hex string formatted as
  /// `"$GROUP$ELEMENT"`, e.g. `"0008002D"`.
  ///
  #[allow(clippy::result_unit_err)]
  pub fn from_hex_string(tag: &str) -> Result<Self, ()> {
    if tag.len() != 8 {
      return Err(());
    }

    let group = u16::from_str_radix(&tag[0..4], 16).map_err(|_| ())?;
    let element = u16::from_str_radix(&tag[4..8], 16).map_err(|_| ())?;

    Ok(Self { group, element })
  }
}
