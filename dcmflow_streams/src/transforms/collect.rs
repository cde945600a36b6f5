//! Buffering look-ahead transform that harvests a chosen set of data
//! elements from a stream of DICOM parts and emits them as a single
//! composite part ahead of the buffered originals.

use dcmflow_core::{dictionary, TagPath};

use crate::part::{CollectedElement, HeaderPart};
use crate::tag_path_tracker::TagPathTracker;
use crate::{DicomPart, PartTransform, StreamError};

/// The default cap on buffered bytes before collection fails.
///
pub const DEFAULT_MAX_BUFFER_SIZE: u64 = 1_000_000;

/// An element whose header has arrived and whose value bytes are being
/// accumulated.
///
struct ActiveElement {
  header: HeaderPart,
  value: Vec<u8>,
  collect: bool,
  is_character_set: bool,
}

/// Transform that buffers incoming parts while harvesting the elements
/// matched by its tag condition, then emits a
/// [`DicomPart::CollectedElements`] part followed by the buffered parts once
/// its stop condition fires, after which everything passes straight through.
///
/// The *'(0008,0005) Specific Character Set'* element is always observed,
/// whether or not it is requested, so that consumers can decode the
/// collected string values correctly.
///
pub struct CollectTransform {
  tag_condition: Box<dyn Fn(&TagPath) -> bool>,
  stop_condition: Box<dyn Fn(&TagPath) -> bool>,
  label: String,
  max_buffer_size: u64,

  tracker: TagPathTracker,
  buffer: Vec<DicomPart>,
  buffered_size: u64,
  elements: Vec<CollectedElement>,
  active: Option<ActiveElement>,
  specific_character_set: Option<String>,
  pass_through: bool,
}

impl CollectTransform {
  /// Creates a new collect transform with explicit tag and stop conditions.
  /// A `max_buffer_size` of zero means unlimited buffering.
  ///
  pub fn new(
    tag_condition: Box<dyn Fn(&TagPath) -> bool>,
    stop_condition: Box<dyn Fn(&TagPath) -> bool>,
    label: &str,
    max_buffer_size: u64,
  ) -> Self {
    Self {
      tag_condition,
      stop_condition,
      label: label.to_string(),
      max_buffer_size,
      tracker: TagPathTracker::new(),
      buffer: vec![],
      buffered_size: 0,
      elements: vec![],
      active: None,
      specific_character_set: None,
      pass_through: false,
    }
  }

  /// Creates a collect transform from a set of tag paths. An element is
  /// harvested when any configured path is a prefix of its path ignoring
  /// item indices, and collection stops at the first root element whose tag
  /// is greater than all of the configured paths' head tags.
  ///
  pub fn from_tags(
    tags: Vec<TagPath>,
    label: &str,
    max_buffer_size: u64,
  ) -> Self {
    let max_tag = tags.iter().filter_map(|t| t.head_tag()).max();

    let condition_tags = tags;
    let tag_condition = Box::new(move |path: &TagPath| {
      condition_tags
        .iter()
        .any(|t| path.starts_with_ignoring_items(t))
    });

    let stop_condition = Box::new(move |path: &TagPath| match max_tag {
      Some(max_tag) => {
        path.depth() == 1
          && path.head_tag().map(|tag| tag > max_tag).unwrap_or(false)
      }
      None => true,
    });

    Self::new(tag_condition, stop_condition, label, max_buffer_size)
  }

  /// Builds the composite part holding everything collected so far.
  ///
  fn collected_part(&mut self) -> DicomPart {
    DicomPart::CollectedElements {
      label: self.label.clone(),
      specific_character_set: self
        .specific_character_set
        .clone()
        .unwrap_or_else(|| "ISO_IR 6".to_string()),
      elements: std::mem::take(&mut self.elements),
    }
  }

  /// Releases the collected elements followed by the buffered parts and the
  /// part that triggered the release, then switches to pass-through.
  ///
  fn release(&mut self, trailing: Option<DicomPart>) -> Vec<DicomPart> {
    let mut parts = vec![self.collected_part()];
    parts.append(&mut self.buffer);
    parts.extend(trailing);

    self.pass_through = true;
    self.buffered_size = 0;

    parts
  }
}

impl PartTransform for CollectTransform {
  fn add_part(
    &mut self,
    part: DicomPart,
  ) -> Result<Vec<DicomPart>, StreamError> {
    if self.pass_through {
      return Ok(vec![part]);
    }

    if part == DicomPart::End {
      return Ok(self.release(Some(DicomPart::End)));
    }

    self.tracker.update(&part);

    // The arrival of an element whose path satisfies the stop condition
    // releases everything collected so far, with that element following the
    // buffered parts
    let is_element_start = matches!(
      part,
      DicomPart::Header(_)
        | DicomPart::Sequence { .. }
        | DicomPart::Fragments { .. }
    );

    if is_element_start && (self.stop_condition)(self.tracker.path()) {
      return Ok(self.release(Some(part)));
    }

    match &part {
      DicomPart::Header(header) => {
        let collect = (self.tag_condition)(self.tracker.path());
        let is_character_set =
          header.tag == dictionary::SPECIFIC_CHARACTER_SET.tag;

        if collect || is_character_set {
          self.active = Some(ActiveElement {
            header: header.clone(),
            value: vec![],
            collect,
            is_character_set,
          });
        }
      }

      DicomPart::ValueChunk { bytes, last, .. } => {
        if let Some(active) = self.active.as_mut() {
          active.value.extend_from_slice(bytes);

          if *last {
            let active = self.active.take().unwrap();

            if active.is_character_set {
              self.specific_character_set = Some(
                String::from_utf8_lossy(&active.value)
                  .trim_end_matches(['\0', ' '])
                  .to_string(),
              );
            }

            if active.collect {
              self.elements.push(CollectedElement {
                tag: active.header.tag,
                vr: active.header.vr,
                length: active.header.length,
                big_endian: active.header.big_endian,
                explicit_vr: active.header.explicit_vr,
                bytes: std::rc::Rc::new(active.value),
              });
            }
          }
        }
      }

      _ => (),
    }

    self.buffered_size += part.bytes().len() as u64;

    if self.max_buffer_size > 0 && self.buffered_size > self.max_buffer_size {
      return Err(StreamError::CollectBufferOverflow {
        label: self.label.clone(),
        max_buffer_size: self.max_buffer_size,
      });
    }

    self.buffer.push(part);

    Ok(vec![])
  }
}

#[cfg(test)]
mod tests {
  use dcmflow_core::{dictionary, ValueRepresentation};

  use super::*;
  use crate::test_support;

  #[test]
  fn collects_ahead_of_buffered_parts_test() {
    let mut input = test_support::element_le(
      dictionary::STUDY_DATE.tag,
      ValueRepresentation::Date,
      b"20240101",
    );
    input.extend(test_support::element_le(
      dictionary::PATIENT_NAME.tag,
      ValueRepresentation::PersonName,
      b"Doe^John",
    ));
    input.extend(test_support::element_le(
      dictionary::PIXEL_DATA.tag,
      ValueRepresentation::OtherByteString,
      &[1, 2, 3, 4],
    ));

    let parts = test_support::parse_all(&input).unwrap();

    let collect = CollectTransform::from_tags(
      vec![TagPath::from_element(dictionary::PATIENT_NAME.tag)],
      "patient-details",
      DEFAULT_MAX_BUFFER_SIZE,
    );

    let output = test_support::run_transform(collect, parts.clone()).unwrap();

    // The collected part leads, followed by the buffered parts unchanged
    match &output[0] {
      DicomPart::CollectedElements {
        label,
        specific_character_set,
        elements,
      } => {
        assert_eq!(label, "patient-details");
        assert_eq!(specific_character_set, "ISO_IR 6");
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].tag, dictionary::PATIENT_NAME.tag);
        assert_eq!(elements[0].vr, ValueRepresentation::PersonName);
        assert_eq!(*elements[0].bytes, b"Doe^John".to_vec());
      }

      part => panic!("Expected collected elements but got {}", part),
    }

    assert_eq!(&output[1..], &parts[..]);
  }

  #[test]
  fn collects_specific_character_set_test() {
    let mut input = test_support::element_le(
      dictionary::SPECIFIC_CHARACTER_SET.tag,
      ValueRepresentation::CodeString,
      b"ISO_IR 192",
    );
    input.extend(test_support::element_le(
      dictionary::PATIENT_NAME.tag,
      ValueRepresentation::PersonName,
      b"Doe^John",
    ));

    let parts = test_support::parse_all(&input).unwrap();

    let collect = CollectTransform::from_tags(
      vec![TagPath::from_element(dictionary::PATIENT_NAME.tag)],
      "names",
      0,
    );

    let output = test_support::run_transform(collect, parts).unwrap();

    match &output[0] {
      DicomPart::CollectedElements {
        specific_character_set,
        elements,
        ..
      } => {
        assert_eq!(specific_character_set, "ISO_IR 192");

        // The character set itself was not requested, so it is not among
        // the collected elements
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].tag, dictionary::PATIENT_NAME.tag);
      }

      part => panic!("Expected collected elements but got {}", part),
    }
  }

  #[test]
  fn buffer_overflow_test() {
    let input = test_support::element_le(
      dictionary::PIXEL_DATA.tag,
      ValueRepresentation::OtherByteString,
      &[0u8; 256],
    );

    let parts = test_support::parse_all(&input).unwrap();

    let collect = CollectTransform::from_tags(
      vec![TagPath::from_element(dcmflow_core::DataElementTag::new(
        0xFFFB, 0x0001,
      ))],
      "overflow",
      64,
    );

    assert!(matches!(
      test_support::run_transform(collect, parts),
      Err(StreamError::CollectBufferOverflow { .. })
    ));
  }
}
