//! Defines the parts of a DICOM stream that are read out of raw bytes by the
//! parse stage and passed through the downstream transforms.

use std::rc::Rc;

use byteorder::ByteOrder;

use dcmflow_core::value_representation::ValueLengthSize;
use dcmflow_core::{dictionary, DataElementTag, ValueRepresentation};

use crate::internal::value_length::UNDEFINED_LENGTH;

/// The header of a single data element, along with its exact on-the-wire
/// bytes and the encoding it was read under.
///
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderPart {
  pub tag: DataElementTag,
  pub vr: ValueRepresentation,
  pub length: u32,
  pub is_fmi: bool,
  pub big_endian: bool,
  pub explicit_vr: bool,
  pub bytes: Rc<Vec<u8>>,
}

impl HeaderPart {
  /// Returns a copy of this header with the given value length, with the
  /// length field of its wire bytes rewritten in place. The rewrite respects
  /// the header's endianness and its 8- vs 12-byte layout.
  ///
  pub fn with_updated_length(&self, length: u32) -> HeaderPart {
    let mut bytes = (*self.bytes).clone();

    if self.explicit_vr {
      match self.vr.value_length_size() {
        ValueLengthSize::U16 => {
          if self.big_endian {
            byteorder::BigEndian::write_u16(&mut bytes[6..8], length as u16);
          } else {
            byteorder::LittleEndian::write_u16(
              &mut bytes[6..8],
              length as u16,
            );
          }
        }

        ValueLengthSize::U32 => {
          if self.big_endian {
            byteorder::BigEndian::write_u32(&mut bytes[8..12], length);
          } else {
            byteorder::LittleEndian::write_u32(&mut bytes[8..12], length);
          }
        }
      }
    } else if self.big_endian {
      byteorder::BigEndian::write_u32(&mut bytes[4..8], length);
    } else {
      byteorder::LittleEndian::write_u32(&mut bytes[4..8], length);
    }

    HeaderPart {
      length,
      bytes: Rc::new(bytes),
      ..self.clone()
    }
  }
}

/// A single element harvested by the collect stage: the element's header
/// fields together with its complete value bytes.
///
#[derive(Clone, Debug, PartialEq)]
pub struct CollectedElement {
  pub tag: DataElementTag,
  pub vr: ValueRepresentation,
  pub length: u32,
  pub big_endian: bool,
  pub explicit_vr: bool,
  pub bytes: Rc<Vec<u8>>,
}

/// A DICOM part is the smallest piece of structured data in a DICOM stream.
/// A stream of these parts is the result of progressive parsing of raw DICOM
/// bytes.
///
/// Every part read off the wire carries its exact on-the-wire serialization
/// in its `bytes` field, so concatenating the bytes of all emitted parts
/// reproduces the original input. Parts synthesized by the engine itself,
/// e.g. the delimitations that close a defined-length sequence, carry empty
/// bytes.
///
#[derive(Clone, Debug, PartialEq)]
pub enum DicomPart {
  /// The 128-byte File Preamble and the "DICM" prefix that precede the File
  /// Meta Information. 132 bytes in total.
  Preamble { bytes: Rc<Vec<u8>> },

  /// The header of a data element. Always followed by one or more
  /// [`DicomPart::ValueChunk`] parts holding the element's value bytes.
  Header(HeaderPart),

  /// A slice of the value bytes of the current data element or pixel data
  /// fragment. `last` is set on the final chunk of the current value.
  ValueChunk {
    big_endian: bool,
    bytes: Rc<Vec<u8>>,
    last: bool,
  },

  /// The header of a sequence data element. A length of `0xFFFFFFFF` means
  /// the sequence is of undefined length and is closed by a
  /// [`DicomPart::SequenceDelimitation`].
  Sequence {
    tag: DataElementTag,
    length: u32,
    big_endian: bool,
    explicit_vr: bool,
    bytes: Rc<Vec<u8>>,
  },

  /// The end of the current sequence or of encapsulated pixel data
  /// fragments. Carries empty bytes when it closes a defined-length
  /// sequence that has no delimiter on the wire.
  SequenceDelimitation { big_endian: bool, bytes: Rc<Vec<u8>> },

  /// The start of an item in the current sequence or fragments. Item
  /// indices start at 1.
  Item {
    index: u32,
    length: u32,
    big_endian: bool,
    bytes: Rc<Vec<u8>>,
  },

  /// The end of the current item. Carries empty bytes when it closes a
  /// defined-length item that has no delimiter on the wire.
  ItemDelimitation {
    index: u32,
    big_endian: bool,
    bytes: Rc<Vec<u8>>,
  },

  /// The header of an encapsulated pixel data element. Its items carry the
  /// pixel data fragments and are emitted as [`DicomPart::Item`] parts
  /// followed by value chunks, closed by a
  /// [`DicomPart::SequenceDelimitation`].
  Fragments {
    tag: DataElementTag,
    vr: ValueRepresentation,
    big_endian: bool,
    explicit_vr: bool,
    bytes: Rc<Vec<u8>>,
  },

  /// A chunk of raw deflated bytes following the File Meta Information of a
  /// deflated transfer syntax, emitted when the parse stage is configured
  /// not to inflate.
  DeflatedChunk { big_endian: bool, bytes: Rc<Vec<u8>> },

  /// Framed but uninterpretable data that parsing was able to step over.
  /// This is the only soft-recovery path: the parse stage emits it and
  /// continues.
  Unknown { big_endian: bool, bytes: Rc<Vec<u8>> },

  /// The elements harvested by a collect stage, emitted ahead of the parts
  /// they were collected from.
  CollectedElements {
    label: String,
    specific_character_set: String,
    elements: Vec<CollectedElement>,
  },

  /// The end of the DICOM stream, with all provided data successfully
  /// parsed.
  End,
}

static NO_BYTES: &[u8] = &[];

impl DicomPart {
  /// Returns the exact on-the-wire bytes of a part. Synthesized parts return
  /// empty bytes.
  ///
  pub fn bytes(&self) -> &[u8] {
    match self {
      DicomPart::Preamble { bytes }
      | DicomPart::ValueChunk { bytes, .. }
      | DicomPart::Sequence { bytes, .. }
      | DicomPart::SequenceDelimitation { bytes, .. }
      | DicomPart::Item { bytes, .. }
      | DicomPart::ItemDelimitation { bytes, .. }
      | DicomPart::Fragments { bytes, .. }
      | DicomPart::DeflatedChunk { bytes, .. }
      | DicomPart::Unknown { bytes, .. } => bytes,

      DicomPart::Header(header) => &header.bytes,

      DicomPart::CollectedElements { .. } | DicomPart::End => NO_BYTES,
    }
  }

  /// Returns whether a part was read under big endian byte ordering.
  ///
  pub fn is_big_endian(&self) -> bool {
    match self {
      DicomPart::ValueChunk { big_endian, .. }
      | DicomPart::Sequence { big_endian, .. }
      | DicomPart::SequenceDelimitation { big_endian, .. }
      | DicomPart::Item { big_endian, .. }
      | DicomPart::ItemDelimitation { big_endian, .. }
      | DicomPart::Fragments { big_endian, .. }
      | DicomPart::DeflatedChunk { big_endian, .. }
      | DicomPart::Unknown { big_endian, .. } => *big_endian,

      DicomPart::Header(header) => header.big_endian,

      DicomPart::Preamble { .. }
      | DicomPart::CollectedElements { .. }
      | DicomPart::End => false,
    }
  }
}

impl std::fmt::Display for DicomPart {
  /// Converts a DICOM part to a human-readable string.
  ///
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    let s = match self {
      DicomPart::Preamble { .. } => "Preamble".to_string(),

      DicomPart::Header(header) => format!(
        "Header: {}, name: {}, vr: {}, length: {} bytes",
        header.tag,
        dictionary::tag_name(header.tag),
        header.vr,
        header.length
      ),

      DicomPart::ValueChunk { bytes, last, .. } => {
        format!("ValueChunk: {} bytes, last: {}", bytes.len(), last)
      }

      DicomPart::Sequence { tag, length, .. } => {
        if *length == UNDEFINED_LENGTH {
          format!(
            "Sequence: {}, name: {}, length: UNDEFINED",
            tag,
            dictionary::tag_name(*tag)
          )
        } else {
          format!(
            "Sequence: {}, name: {}, length: {} bytes",
            tag,
            dictionary::tag_name(*tag),
            length
          )
        }
      }

      DicomPart::SequenceDelimitation { .. } => {
        "SequenceDelimitation".to_string()
      }

      DicomPart::Item { index, length, .. } => {
        if *length == UNDEFINED_LENGTH {
          format!("Item: {}, length: UNDEFINED", index)
        } else {
          format!("Item: {}, length: {} bytes", index, length)
        }
      }

      DicomPart::ItemDelimitation { index, .. } => {
        format!("ItemDelimitation: {}", index)
      }

      DicomPart::Fragments { tag, vr, .. } => format!(
        "Fragments: {}, name: {}, vr: {}",
        tag,
        dictionary::tag_name(*tag),
        vr
      ),

      DicomPart::DeflatedChunk { bytes, .. } => {
        format!("DeflatedChunk: {} bytes", bytes.len())
      }

      DicomPart::Unknown { bytes, .. } => {
        format!("Unknown: {} bytes", bytes.len())
      }

      DicomPart::CollectedElements {
        label, elements, ..
      } => {
        format!("CollectedElements: {}, {} elements", label, elements.len())
      }

      DicomPart::End => "End".to_string(),
    };

    write!(f, "{}", s)
  }
}
