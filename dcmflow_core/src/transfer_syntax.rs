//! Defines the DICOM transfer syntaxes understood by the streaming engine.

/// The value representation (VR) serialization mode of a transfer syntax. This
/// is either implicit or explicit.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VrSerialization {
  VrImplicit,
  VrExplicit,
}

/// The endianness of a transfer syntax, either little endian or big endian.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Endianness {
  LittleEndian,
  BigEndian,
}

/// Describes a single DICOM transfer syntax, with its name, UID, how it
/// serializes value representations (implicit vs explicit), whether it is
/// zlib deflated, and whether it stores its pixel data as encapsulated.
///
#[derive(Debug, PartialEq)]
pub struct TransferSyntax {
  pub name: &'static str,
  pub uid: &'static str,
  pub vr_serialization: VrSerialization,
  pub endianness: Endianness,
  pub is_deflated: bool,
  pub is_encapsulated: bool,
}

/// The 'Implicit VR Little Endian' transfer syntax.
///
pub const IMPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax {
  name: "Implicit VR Little Endian",
  uid: "1.2.840.10008.1.2",
  vr_serialization: VrSerialization::VrImplicit,
  endianness: Endianness::LittleEndian,
  is_deflated: false,
  is_encapsulated: false,
};

/// The 'Explicit VR Little Endian' transfer syntax.
///
pub const EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax {
  name: "Explicit VR Little Endian",
  uid: "1.2.840.10008.1.2.1",
  vr_serialization: VrSerialization::VrExplicit,
  endianness: Endianness::LittleEndian,
  is_deflated: false,
  is_encapsulated: false,
};

/// The 'Encapsulated Uncompressed Explicit VR Little Endian' transfer syntax.
///
pub const ENCAPSULATED_UNCOMPRESSED_EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax =
  TransferSyntax {
    name: "Encapsulated Uncompressed Explicit VR Little Endian",
    uid: "1.2.840.10008.1.2.1.98",
    vr_serialization: VrSerialization::VrExplicit,
    endianness: Endianness::LittleEndian,
    is_deflated: false,
    is_encapsulated: true,
  };

/// The 'Deflated Explicit VR Little Endian' transfer syntax.
///
pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax {
  name: "Deflated Explicit VR Little Endian",
  uid: "1.2.840.10008.1.2.1.99",
  vr_serialization: VrSerialization::VrExplicit,
  endianness: Endianness::LittleEndian,
  is_deflated: true,
  is_encapsulated: false,
};

/// The 'Explicit VR Big Endian' transfer syntax.
///
pub const EXPLICIT_VR_BIG_ENDIAN: TransferSyntax = TransferSyntax {
  name: "Explicit VR Big Endian",
  uid: "1.2.840.10008.1.2.2",
  vr_serialization: VrSerialization::VrExplicit,
  endianness: Endianness::BigEndian,
  is_deflated: false,
  is_encapsulated: false,
};

/// The 'JPEG Baseline (Process 1)' transfer syntax.
///
pub const JPEG_BASELINE_8BIT: TransferSyntax = TransferSyntax {
  name: "JPEG Baseline (Process 1)",
  uid: "1.2.840.10008.1.2.4.50",
  vr_serialization: VrSerialization::VrExplicit,
  endianness: Endianness::LittleEndian,
  is_deflated: false,
  is_encapsulated: true,
};

/// The 'JPEG 2000 Image Compression (Lossless Only)' transfer syntax.
///
pub const JPEG_2K_LOSSLESS_ONLY: TransferSyntax = TransferSyntax {
  name: "JPEG 2000 Image Compression (Lossless Only)",
  uid: "1.2.840.10008.1.2.4.90",
  vr_serialization: VrSerialization::VrExplicit,
  endianness: Endianness::LittleEndian,
  is_deflated: false,
  is_encapsulated: true,
};

/// The 'JPEG 2000 Image Compression' transfer syntax.
///
pub const JPEG_2K: TransferSyntax = TransferSyntax {
  name: "JPEG 2000 Image Compression",
  uid: "1.2.840.10008.1.2.4.91",
  vr_serialization: VrSerialization::VrExplicit,
  endianness: Endianness::LittleEndian,
  is_deflated: false,
  is_encapsulated: true,
};

/// The 'RLE Lossless' transfer syntax.
///
pub const RLE_LOSSLESS: TransferSyntax = TransferSyntax {
  name: "RLE Lossless",
  uid: "1.2.840.10008.1.2.5",
  vr_serialization: VrSerialization::VrExplicit,
  endianness: Endianness::LittleEndian,
  is_deflated: false,
  is_encapsulated: true,
};

/// A list of all supported transfer syntaxes.
///
pub const ALL: [&TransferSyntax; 9] = [
  &IMPLICIT_VR_LITTLE_ENDIAN,
  &EXPLICIT_VR_LITTLE_ENDIAN,
  &ENCAPSULATED_UNCOMPRESSED_EXPLICIT_VR_LITTLE_ENDIAN,
  &DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN,
  &EXPLICIT_VR_BIG_ENDIAN,
  &JPEG_BASELINE_8BIT,
  &JPEG_2K_LOSSLESS_ONLY,
  &JPEG_2K,
  &RLE_LOSSLESS,
];

impl TransferSyntax {
  /// Returns the transfer syntax with the given UID. If the UID isn't
  /// recognized then an error is returned.
  ///
  #[allow(clippy::result_unit_err)]
  pub fn from_uid(uid: &str) -> Result<&'static Self, ()> {
    ALL
      .iter()
      .find(|transfer_syntax| transfer_syntax.uid == uid)
      .copied()
      .ok_or(())
  }

  /// Returns whether data elements are serialized in big endian byte order.
  ///
  pub fn is_big_endian(&self) -> bool {
    self.endianness == Endianness::BigEndian
  }

  /// Returns whether data element headers carry explicit VR codes.
  ///
  pub fn is_explicit_vr(&self) -> bool {
    self.vr_serialization == VrSerialization::VrExplicit
  }
}
