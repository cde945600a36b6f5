//! DICOM value representations (VRs).
//!
//! See [section 6.2](https://dicom.nema.org/medical/dicom/current/output/chtml/part05/sect_6.2.html)
//! of the DICOM specification for VR definitions.

/// All DICOM value representations (VRs).
///
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ValueRepresentation {
  AgeString,
  ApplicationEntity,
  AttributeTag,
  CodeString,
  Date,
  DateTime,
  DecimalString,
  FloatingPointDouble,
  FloatingPointSingle,
  IntegerString,
  LongString,
  LongText,
  OtherByteString,
  OtherDoubleString,
  OtherFloatString,
  OtherLongString,
  OtherVeryLongString,
  OtherWordString,
  PersonName,
  Sequence,
  ShortString,
  ShortText,
  SignedLong,
  SignedShort,
  SignedVeryLong,
  Time,
  UniqueIdentifier,
  UniversalResourceIdentifier,
  Unknown,
  UnlimitedCharacters,
  UnlimitedText,
  UnsignedLong,
  UnsignedShort,
  UnsignedVeryLong,
}

/// The two possibilities for the size of the value length field of a VR when
/// serialized with explicit VRs. VRs with a 32-bit length also have a two-byte
/// reserved gap after the VR code, making their headers 12 bytes in total.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ValueLengthSize {
  U16,
  U32,
}

impl std::fmt::Display for ValueRepresentation {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    let bytes = self.to_bytes();

    f.write_str(std::str::from_utf8(&bytes).unwrap())
  }
}

impl ValueRepresentation {
  /// Converts a two-character code, e.g. `b"DA"`, into a value representation.
  ///
  #[allow(clippy::result_unit_err)]
  pub fn from_bytes(bytes: &[u8]) -> Result<Self, ()> {
    match bytes {
      b"AE" => Ok(ValueRepresentation::ApplicationEntity),
      b"AS" => Ok(ValueRepresentation::AgeString),
      b"AT" => Ok(ValueRepresentation::AttributeTag),
      b"CS" => Ok(ValueRepresentation::CodeString),
      b"DA" => Ok(ValueRepresentation::Date),
      b"DS" => Ok(ValueRepresentation::DecimalString),
      b"DT" => Ok(ValueRepresentation::DateTime),
      b"FD" => Ok(ValueRepresentation::FloatingPointDouble),
      b"FL" => Ok(ValueRepresentation::FloatingPointSingle),
      b"IS" => Ok(ValueRepresentation::IntegerString),
      b"LO" => Ok(ValueRepresentation::LongString),
      b"LT" => Ok(ValueRepresentation::LongText),
      b"OB" => Ok(ValueRepresentation::OtherByteString),
      b"OD" => Ok(ValueRepresentation::OtherDoubleString),
      b"OF" => Ok(ValueRepresentation::OtherFloatString),
      b"OL" => Ok(ValueRepresentation::OtherLongString),
      b"OV" => Ok(ValueRepresentation::OtherVeryLongString),
      b"OW" => Ok(ValueRepresentation::OtherWordString),
      b"PN" => Ok(ValueRepresentation::PersonName),
      b"SH" => Ok(ValueRepresentation::ShortString),
      b"SL" => Ok(ValueRepresentation::SignedLong),
      b"SQ" => Ok(ValueRepresentation::Sequence),
      b"SS" => Ok(ValueRepresentation::SignedShort),
      b"ST" => Ok(ValueRepresentation::ShortText),
      b"SV" => Ok(ValueRepresentation::SignedVeryLong),
      b"TM" => Ok(ValueRepresentation::Time),
      b"UC" => Ok(ValueRepresentation::UnlimitedCharacters),
      b"UI" => Ok(ValueRepresentation::UniqueIdentifier),
      b"UL" => Ok(ValueRepresentation::UnsignedLong),
      b"UN" => Ok(ValueRepresentation::Unknown),
      b"UR" => Ok(ValueRepresentation::UniversalResourceIdentifier),
      b"US" => Ok(ValueRepresentation::UnsignedShort),
      b"UT" => Ok(ValueRepresentation::UnlimitedText),
      b"UV" => Ok(ValueRepresentation::UnsignedVeryLong),

      _ => Err(()),
    }
  }

  /// Converts a value representation to its two-byte character code.
  ///
  pub fn to_bytes(&self) -> [u8; 2] {
    *match self {
      ValueRepresentation::AgeString => b"AS",
      ValueRepresentation::ApplicationEntity => b"AE",
      ValueRepresentation::AttributeTag => b"AT",
      ValueRepresentation::CodeString => b"CS",
      ValueRepresentation::Date => b"DA",
      ValueRepresentation::DateTime => b"DT",
      ValueRepresentation::DecimalString => b"DS",
      ValueRepresentation::FloatingPointDouble => b"FD",
      ValueRepresentation::FloatingPointSingle => b"FL",
      ValueRepresentation::IntegerString => b"IS",
      ValueRepresentation::LongString => b"LO",
      ValueRepresentation::LongText => b"LT",
      ValueRepresentation::OtherByteString => b"OB",
      ValueRepresentation::OtherDoubleString => b"OD",
      ValueRepresentation::OtherFloatString => b"OF",
      ValueRepresentation::OtherLongString => b"OL",
      ValueRepresentation::OtherVeryLongString => b"OV",
      ValueRepresentation::OtherWordString => b"OW",
      ValueRepresentation::PersonName => b"PN",
      ValueRepresentation::Sequence => b"SQ",
      ValueRepresentation::ShortString => b"SH",
      ValueRepresentation::ShortText => b"ST",
      ValueRepresentation::SignedLong => b"SL",
      ValueRepresentation::SignedShort => b"SS",
      ValueRepresentation::SignedVeryLong => b"SV",
      ValueRepresentation::Time => b"TM",
      ValueRepresentation::UniqueIdentifier => b"UI",
      ValueRepresentation::UniversalResourceIdentifier => b"UR",
      ValueRepresentation::Unknown => b"UN",
      ValueRepresentation::UnlimitedCharacters => b"UC",
      ValueRepresentation::UnlimitedText => b"UT",
      ValueRepresentation::UnsignedLong => b"UL",
      ValueRepresentation::UnsignedShort => b"US",
      ValueRepresentation::UnsignedVeryLong => b"UV",
    }
  }

  /// Returns whether a value representation stores string data.
  ///
  pub fn is_string(self) -> bool {
    self == ValueRepresentation::AgeString
      || self == ValueRepresentation::ApplicationEntity
      || self == ValueRepresentation::CodeString
      || self == ValueRepresentation::Date
      || self == ValueRepresentation::DateTime
      || self == ValueRepresentation::DecimalString
      || self == ValueRepresentation::IntegerString
      || self == ValueRepresentation::LongString
      || self == ValueRepresentation::LongText
      || self == ValueRepresentation::PersonName
      || self == ValueRepresentation::ShortString
      || self == ValueRepresentation::ShortText
      || self == ValueRepresentation::Time
      || self == ValueRepresentation::UniqueIdentifier
      || self == ValueRepresentation::UniversalResourceIdentifier
      || self == ValueRepresentation::UnlimitedCharacters
      || self == ValueRepresentation::UnlimitedText
  }

  /// Returns the size of the value length field used when a value
  /// representation is serialized with explicit VRs.
  ///
  pub fn value_length_size(self) -> ValueLengthSize {
    match self {
      ValueRepresentation::OtherByteString
      | ValueRepresentation::OtherDoubleString
      | ValueRepresentation::OtherFloatString
      | ValueRepresentation::OtherLongString
      | ValueRepresentation::OtherVeryLongString
      | ValueRepresentation::OtherWordString
      | ValueRepresentation::Sequence
      | ValueRepresentation::SignedVeryLong
      | ValueRepresentation::UniversalResourceIdentifier
      | ValueRepresentation::Unknown
      | ValueRepresentation::UnlimitedCharacters
      | ValueRepresentation::UnlimitedText
      | ValueRepresentation::UnsignedVeryLong => ValueLengthSize::U32,

      _ => ValueLengthSize::U16,
    }
  }

  /// Appends the correct padding byte for the given value representation if
  /// the bytes are not of even length.
  ///
  pub fn pad_bytes_to_even_length(self, bytes: &mut Vec<u8>) {
    if bytes.len() % 2 == 0 {
      return;
    }

    // UI uses a zero byte as padding
    if self == ValueRepresentation::UniqueIdentifier {
      bytes.push(0);
    }
    // String values use a space as padding. The rest do not use any padding.
    else if self.is_string() {
      bytes.push(0x20);
    }
  }
}
