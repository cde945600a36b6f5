//! Transform that rewrites defined-length sequences and items to use
//! undefined lengths with explicit delimiters.
//!
//! The parse stage closes defined-length sequences and items with
//! delimitation parts that carry empty bytes, since there is no delimiter on
//! the wire. That keeps the byte stream intact, but it also means the stored
//! lengths go stale as soon as a downstream transform changes the size of
//! anything inside such a container. Placing this transform ahead of a
//! modify stage removes the problem: container headers are rewritten to the
//! undefined length and the empty delimitation markers are materialized as
//! real 8-byte delimiters.
//!
//! Encapsulated pixel data is left untouched, as fragment items always
//! carry defined lengths.

use std::rc::Rc;

use dcmflow_core::dictionary;

use crate::internal::data_element_header::DataElementHeader;
use crate::internal::value_length::{ValueLength, UNDEFINED_LENGTH};
use crate::{DicomPart, PartTransform, StreamError};

enum Container {
  Sequence,
  Fragments,
}

/// Transform that converts defined-length sequences and items to undefined
/// lengths. The output is no longer byte-identical to the input by design.
///
pub struct UndefinedLengthsTransform {
  containers: Vec<Container>,
}

impl UndefinedLengthsTransform {
  pub fn new() -> Self {
    Self { containers: vec![] }
  }

  fn in_fragments(&self) -> bool {
    matches!(self.containers.last(), Some(Container::Fragments))
  }
}

impl PartTransform for UndefinedLengthsTransform {
  fn add_part(
    &mut self,
    part: DicomPart,
  ) -> Result<Vec<DicomPart>, StreamError> {
    let part = match part {
      DicomPart::Sequence {
        tag,
        length,
        big_endian,
        explicit_vr,
        bytes,
      } => {
        self.containers.push(Container::Sequence);

        if length == UNDEFINED_LENGTH {
          DicomPart::Sequence {
            tag,
            length,
            big_endian,
            explicit_vr,
            bytes,
          }
        } else {
          // The 32-bit length is the last four bytes of the header in both
          // the explicit and the implicit layout
          let mut bytes = (*bytes).clone();
          let length_offset = bytes.len() - 4;
          bytes[length_offset..].fill(0xFF);

          DicomPart::Sequence {
            tag,
            length: UNDEFINED_LENGTH,
            big_endian,
            explicit_vr,
            bytes: Rc::new(bytes),
          }
        }
      }

      DicomPart::Fragments {
        tag,
        vr,
        big_endian,
        explicit_vr,
        bytes,
      } => {
        self.containers.push(Container::Fragments);

        DicomPart::Fragments {
          tag,
          vr,
          big_endian,
          explicit_vr,
          bytes,
        }
      }

      DicomPart::Item {
        index,
        length,
        big_endian,
        bytes,
      } if !self.in_fragments() && length != UNDEFINED_LENGTH => {
        let mut bytes = (*bytes).clone();
        let length_offset = bytes.len() - 4;
        bytes[length_offset..].fill(0xFF);

        DicomPart::Item {
          index,
          length: UNDEFINED_LENGTH,
          big_endian,
          bytes: Rc::new(bytes),
        }
      }

      DicomPart::ItemDelimitation {
        index,
        big_endian,
        bytes,
      } if bytes.is_empty() => {
        let bytes = DataElementHeader {
          tag: dictionary::ITEM_DELIMITATION_ITEM.tag,
          vr: None,
          length: ValueLength::ZERO,
        }
        .to_bytes(big_endian, false);

        DicomPart::ItemDelimitation {
          index,
          big_endian,
          bytes: Rc::new(bytes),
        }
      }

      DicomPart::SequenceDelimitation { big_endian, bytes } => {
        self.containers.pop();

        if bytes.is_empty() {
          let bytes = DataElementHeader {
            tag: dictionary::SEQUENCE_DELIMITATION_ITEM.tag,
            vr: None,
            length: ValueLength::ZERO,
          }
          .to_bytes(big_endian, false);

          DicomPart::SequenceDelimitation {
            big_endian,
            bytes: Rc::new(bytes),
          }
        } else {
          DicomPart::SequenceDelimitation { big_endian, bytes }
        }
      }

      part => part,
    };

    Ok(vec![part])
  }
}

impl Default for UndefinedLengthsTransform {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use dcmflow_core::{dictionary, ValueRepresentation};

  use super::*;
  use crate::test_support;

  #[test]
  fn converts_defined_lengths_test() {
    // A defined-length sequence holding one defined-length item with a
    // single element inside
    let inner = test_support::element_le(
      dictionary::STUDY_DATE.tag,
      ValueRepresentation::Date,
      b"20240101",
    );

    let mut input = test_support::sequence_defined_le(
      dictionary::DERIVATION_CODE_SEQUENCE.tag,
      (inner.len() + 8) as u32,
    );
    input.extend(test_support::item_defined_le(inner.len() as u32));
    input.extend(&inner);

    let parts = test_support::parse_all(&input).unwrap();
    let output =
      test_support::run_transform(UndefinedLengthsTransform::new(), parts)
        .unwrap();

    let bytes = test_support::concat_bytes(&output);

    let mut expected = test_support::sequence_undefined_le(
      dictionary::DERIVATION_CODE_SEQUENCE.tag,
    );
    expected.extend(test_support::item_undefined_le());
    expected.extend(&inner);
    expected.extend(test_support::item_delimitation_le());
    expected.extend(test_support::sequence_delimitation_le());

    assert_eq!(bytes, expected);
  }

  #[test]
  fn leaves_delimited_input_unchanged_test() {
    let mut input = test_support::sequence_undefined_le(
      dictionary::DERIVATION_CODE_SEQUENCE.tag,
    );
    input.extend(test_support::item_undefined_le());
    input.extend(test_support::element_le(
      dictionary::PATIENT_NAME.tag,
      ValueRepresentation::PersonName,
      b"Doe^John",
    ));
    input.extend(test_support::item_delimitation_le());
    input.extend(test_support::sequence_delimitation_le());

    let parts = test_support::parse_all(&input).unwrap();
    let output =
      test_support::run_transform(UndefinedLengthsTransform::new(), parts)
        .unwrap();

    assert_eq!(test_support::concat_bytes(&output), input);
  }
}
