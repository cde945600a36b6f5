//! Transform that applies an ordered set of modifications to a stream of
//! DICOM parts: replacing the values of existing data elements, inserting
//! data elements that are missing, and any combination of the two.

use std::rc::Rc;

use dcmflow_core::{
  dictionary, DataElementTag, TagPath, TagPathStep, ValueRepresentation,
};

use crate::internal::data_element_header::DataElementHeader;
use crate::internal::value_length::ValueLength;
use crate::part::HeaderPart;
use crate::tag_path_tracker::TagPathTracker;
use crate::{DicomPart, PartTransform, StreamError};

/// A value transform takes the current value bytes of a data element, or
/// empty bytes when the element is being inserted, and returns the new value
/// bytes.
///
pub type ValueTransform = Box<dyn FnMut(&[u8]) -> Vec<u8>>;

/// Matches the tag paths that a modification applies to.
///
enum TagPathMatcher {
  /// Matches exactly the given path. Item indices in the path may be
  /// wildcards, in which case the modification applies in every item of the
  /// sequence.
  Equals(TagPath),

  /// Matches any path whose trailing steps equal the given path, at any
  /// nesting depth.
  EndsWith(TagPath),
}

impl TagPathMatcher {
  fn matches(&self, path: &TagPath) -> bool {
    match self {
      TagPathMatcher::Equals(p) => p.accepts(path),
      TagPathMatcher::EndsWith(p) => path.ends_with(p),
    }
  }

  fn path(&self) -> &TagPath {
    match self {
      TagPathMatcher::Equals(p) | TagPathMatcher::EndsWith(p) => p,
    }
  }
}

/// A single modification: a matcher selecting the data elements it applies
/// to, the transform producing the new value bytes, and whether the element
/// is inserted when not present in the stream.
///
pub struct TagModification {
  matcher: TagPathMatcher,
  transform: ValueTransform,
  insert: bool,
}

impl TagModification {
  /// Creates a modification that replaces the value of the data element at
  /// the given path. Item indices in the path may be wildcards. Elements not
  /// present in the stream are left absent.
  ///
  pub fn replace(path: TagPath, transform: ValueTransform) -> Self {
    Self {
      matcher: TagPathMatcher::Equals(path),
      transform,
      insert: false,
    }
  }

  /// Creates a modification that replaces the value of every data element
  /// whose path ends with the given path, at any nesting depth.
  ///
  pub fn replace_ending_with(path: TagPath, transform: ValueTransform) -> Self {
    Self {
      matcher: TagPathMatcher::EndsWith(path),
      transform,
      insert: false,
    }
  }

  /// Creates a modification that inserts the data element at the given path
  /// when it is not present in the stream, and replaces its value when it
  /// is. The path must end in an element step. An insertion into a sequence
  /// only occurs in items that actually appear in the stream.
  ///
  pub fn insert(path: TagPath, transform: ValueTransform) -> Self {
    assert!(
      matches!(path.steps().last(), Some(TagPathStep::Element { .. })),
      "Insertion path must end in an element"
    );

    Self {
      matcher: TagPathMatcher::Equals(path),
      transform,
      insert: true,
    }
  }
}

/// Configuration for a [`ModifyTransform`].
///
pub struct ModifyConfig {
  /// Whether insertions are checked against the dictionary when the
  /// transform is created: inserting a tag that is not in the dictionary or
  /// whose VR is a sequence is rejected. When disabled, such insertions are
  /// silently skipped instead.
  ///
  /// Default: true.
  ///
  pub insert_guards: bool,
}

impl Default for ModifyConfig {
  fn default() -> Self {
    Self {
      insert_guards: true,
    }
  }
}

/// An element whose value is being buffered so its transformed replacement
/// can be emitted with a corrected length.
///
struct ActiveReplace {
  header: HeaderPart,
  value: Vec<u8>,
  modification_index: usize,
}

/// Transform that applies [`TagModification`]s to a stream of DICOM parts.
///
/// Replacements buffer the matched element's header and value chunks, then
/// re-emit the header with its length field updated for the transformed
/// value. Insertions are synthesized in ascending unsigned tag order within
/// their scope: ahead of the first existing element with a greater tag, or
/// at the end of the scope when no such element arrives. Inserted and
/// modified headers use the endianness and VR mode of the surrounding
/// stream.
///
pub struct ModifyTransform {
  modifications: Vec<TagModification>,
  tracker: TagPathTracker,
  active_replace: Option<ActiveReplace>,

  // Which insertions have fired at the root, and per open sequence item
  applied_at_root: Vec<bool>,
  item_applied: Vec<Vec<bool>>,

  in_fragments: bool,
  big_endian: bool,
  explicit_vr: bool,
}

impl ModifyTransform {
  /// Creates a new modify transform. The modifications are sorted by their
  /// tag path so that insertions are emitted in stream order. With insert
  /// guards enabled, insertions of tags that are unknown to the dictionary
  /// or whose VR is a sequence are rejected here.
  ///
  pub fn new(
    mut modifications: Vec<TagModification>,
    config: ModifyConfig,
  ) -> Result<Self, StreamError> {
    modifications.sort_by(|a, b| a.matcher.path().cmp(b.matcher.path()));

    if config.insert_guards {
      for modification in modifications.iter().filter(|m| m.insert) {
        let tag = modification.matcher.path().last_tag().unwrap();

        match dictionary::find(tag) {
          Err(()) => {
            return Err(StreamError::UnknownTagForInsertion { tag })
          }

          Ok(entry)
            if entry.vrs.contains(&ValueRepresentation::Sequence) =>
          {
            return Err(StreamError::CannotInsertSequence { tag })
          }

          Ok(_) => (),
        }
      }
    }

    let modification_count = modifications.len();

    Ok(Self {
      modifications,
      tracker: TagPathTracker::new(),
      active_replace: None,
      applied_at_root: vec![false; modification_count],
      item_applied: vec![],
      in_fragments: false,
      big_endian: false,
      explicit_vr: true,
    })
  }
}

impl PartTransform for ModifyTransform {
  fn add_part(
    &mut self,
    part: DicomPart,
  ) -> Result<Vec<DicomPart>, StreamError> {
    // Record the encoding of the surrounding stream so that synthesized
    // headers match it
    match &part {
      DicomPart::Header(header) if !header.is_fmi => {
        self.big_endian = header.big_endian;
        self.explicit_vr = header.explicit_vr;
      }

      DicomPart::Sequence {
        big_endian,
        explicit_vr,
        ..
      }
      | DicomPart::Fragments {
        big_endian,
        explicit_vr,
        ..
      } => {
        self.big_endian = *big_endian;
        self.explicit_vr = *explicit_vr;
      }

      _ => (),
    }

    if self.active_replace.is_some() {
      return self.continue_replace(part);
    }

    match part {
      DicomPart::Header(_)
      | DicomPart::Sequence { .. }
      | DicomPart::Fragments { .. } => self.on_element_start(part),

      DicomPart::Item { .. } => {
        if !self.in_fragments {
          self.item_applied.push(vec![false; self.modifications.len()]);
        }

        self.tracker.update(&part);

        Ok(vec![part])
      }

      DicomPart::ItemDelimitation { .. } => {
        // Insertions that belong in this item and haven't fired yet are
        // emitted ahead of its delimitation
        let scope = self.tracker.scope().clone();
        let mut parts = self.emit_pending_inserts(&scope, None);

        self.item_applied.pop();
        self.tracker.update(&part);

        parts.push(part);

        Ok(parts)
      }

      DicomPart::SequenceDelimitation { .. } => {
        if self.in_fragments {
          self.in_fragments = false;
        }

        self.tracker.update(&part);

        Ok(vec![part])
      }

      DicomPart::End => {
        let mut parts = self.emit_pending_inserts(&TagPath::root(), None);
        parts.push(DicomPart::End);

        Ok(parts)
      }

      part => {
        self.tracker.update(&part);

        Ok(vec![part])
      }
    }
  }
}

impl ModifyTransform {
  /// Handles the start of a data element, sequence, or fragments: first any
  /// insertions that sort before it in its scope are synthesized, then the
  /// element itself is either passed through or captured for replacement.
  ///
  fn on_element_start(
    &mut self,
    part: DicomPart,
  ) -> Result<Vec<DicomPart>, StreamError> {
    let tag = match &part {
      DicomPart::Header(header) => header.tag,
      DicomPart::Sequence { tag, .. } | DicomPart::Fragments { tag, .. } => {
        *tag
      }
      _ => unreachable!(),
    };

    let scope = self.tracker.scope().clone();
    let mut parts = self.emit_pending_inserts(&scope, Some(tag));

    if let DicomPart::Fragments { .. } = part {
      self.in_fragments = true;
    }

    self.tracker.update(&part);

    match part {
      DicomPart::Header(header) => {
        let path = self.tracker.path().clone();

        let matched = self
          .modifications
          .iter()
          .position(|m| m.matcher.matches(&path));

        match matched {
          Some(index) => {
            if self.modifications[index].insert {
              // The element is present after all, so the insertion becomes
              // a replacement and must not fire again in this scope
              self.mark_applied(index);
            }

            self.active_replace = Some(ActiveReplace {
              header,
              value: vec![],
              modification_index: index,
            });

            Ok(parts)
          }

          None => {
            parts.push(DicomPart::Header(header));
            Ok(parts)
          }
        }
      }

      part => {
        parts.push(part);
        Ok(parts)
      }
    }
  }

  /// Buffers the value chunks of an element being replaced. On the last
  /// chunk the transformed value is emitted behind a header with an updated
  /// length.
  ///
  fn continue_replace(
    &mut self,
    part: DicomPart,
  ) -> Result<Vec<DicomPart>, StreamError> {
    match part {
      DicomPart::ValueChunk { bytes, last, .. } => {
        self.tracker.update(&DicomPart::ValueChunk {
          big_endian: self.big_endian,
          bytes: bytes.clone(),
          last,
        });

        let active = self.active_replace.as_mut().unwrap();
        active.value.extend_from_slice(&bytes);

        if !last {
          return Ok(vec![]);
        }

        let ActiveReplace {
          header,
          value,
          modification_index,
        } = self.active_replace.take().unwrap();

        let mut new_value =
          (self.modifications[modification_index].transform)(&value);
        header.vr.pad_bytes_to_even_length(&mut new_value);

        let new_header = header.with_updated_length(new_value.len() as u32);
        let big_endian = new_header.big_endian;

        Ok(vec![
          DicomPart::Header(new_header),
          DicomPart::ValueChunk {
            big_endian,
            bytes: Rc::new(new_value),
            last: true,
          },
        ])
      }

      part => Err(StreamError::PartStreamInvalid {
        when: "Modifying data elements".to_string(),
        details: format!(
          "Expected a value chunk for the element being modified but \
          received {}",
          part
        ),
      }),
    }
  }

  /// Synthesizes the pending insertions that belong in the given scope and,
  /// when `before_tag` is set, sort before that tag. Fired insertions are
  /// recorded against the scope so that wildcard item insertions re-apply in
  /// later items without double-emitting in the current one.
  ///
  fn emit_pending_inserts(
    &mut self,
    scope: &TagPath,
    before_tag: Option<DataElementTag>,
  ) -> Vec<DicomPart> {
    let mut parts = vec![];

    for index in 0..self.modifications.len() {
      let modification = &self.modifications[index];

      if !modification.insert || self.is_applied(index) {
        continue;
      }

      let path = modification.matcher.path();

      if !path.parent().accepts(scope) {
        continue;
      }

      let tag = path.last_tag().unwrap();

      if let Some(before_tag) = before_tag {
        if tag >= before_tag {
          continue;
        }
      }

      parts.extend(self.synthesize_element(index, tag));
      self.mark_applied(index);
    }

    parts
  }

  /// Builds the header and value chunk parts for an inserted element. The VR
  /// comes from the dictionary and the header is serialized in the encoding
  /// of the surrounding stream. Insertions rejected by the dictionary are
  /// skipped; with insert guards enabled they were already refused at
  /// construction.
  ///
  fn synthesize_element(
    &mut self,
    index: usize,
    tag: DataElementTag,
  ) -> Vec<DicomPart> {
    let vr = match dictionary::find(tag) {
      Ok(entry) if !entry.vrs.contains(&ValueRepresentation::Sequence) => {
        entry
          .vrs
          .first()
          .copied()
          .unwrap_or(ValueRepresentation::Unknown)
      }

      _ => return vec![],
    };

    let mut value = (self.modifications[index].transform)(&[]);
    vr.pad_bytes_to_even_length(&mut value);

    let header_bytes = DataElementHeader {
      tag,
      vr: Some(vr),
      length: ValueLength::new(value.len() as u32),
    }
    .to_bytes(self.big_endian, self.explicit_vr);

    vec![
      DicomPart::Header(HeaderPart {
        tag,
        vr,
        length: value.len() as u32,
        is_fmi: false,
        big_endian: self.big_endian,
        explicit_vr: self.explicit_vr,
        bytes: Rc::new(header_bytes),
      }),
      DicomPart::ValueChunk {
        big_endian: self.big_endian,
        bytes: Rc::new(value),
        last: true,
      },
    ]
  }

  fn is_applied(&self, index: usize) -> bool {
    match self.item_applied.last() {
      Some(applied) if !self.tracker.is_at_root() => applied[index],
      _ => self.applied_at_root[index],
    }
  }

  fn mark_applied(&mut self, index: usize) {
    let at_root = self.tracker.is_at_root();

    match self.item_applied.last_mut() {
      Some(applied) if !at_root => applied[index] = true,
      _ => self.applied_at_root[index] = true,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support;

  fn replace_with(value: &'static [u8]) -> ValueTransform {
    Box::new(move |_: &[u8]| value.to_vec())
  }

  fn modify(
    modifications: Vec<TagModification>,
    input: &[u8],
  ) -> Result<Vec<DicomPart>, StreamError> {
    let parts = test_support::parse_all(input)?;
    let transform =
      ModifyTransform::new(modifications, ModifyConfig::default())?;

    test_support::run_transform(transform, parts)
  }

  #[test]
  fn replace_values_test() {
    let mut input = test_support::element_le(
      dictionary::STUDY_DATE.tag,
      ValueRepresentation::Date,
      b"",
    );
    input.extend(test_support::element_le(
      dictionary::PATIENT_NAME.tag,
      ValueRepresentation::PersonName,
      b"John^Doe",
    ));

    let output = modify(
      vec![
        TagModification::replace(
          TagPath::from_element(dictionary::STUDY_DATE.tag),
          replace_with(b""),
        ),
        TagModification::replace(
          TagPath::from_element(dictionary::PATIENT_NAME.tag),
          replace_with(b"Mike"),
        ),
      ],
      &input,
    )
    .unwrap();

    let headers: Vec<_> = output
      .iter()
      .filter_map(|part| match part {
        DicomPart::Header(header) => Some((header.tag, header.length)),
        _ => None,
      })
      .collect();

    assert_eq!(
      headers,
      vec![
        (dictionary::STUDY_DATE.tag, 0),
        (dictionary::PATIENT_NAME.tag, 4),
      ]
    );

    let mut expected = test_support::element_le(
      dictionary::STUDY_DATE.tag,
      ValueRepresentation::Date,
      b"",
    );
    expected.extend(test_support::element_le(
      dictionary::PATIENT_NAME.tag,
      ValueRepresentation::PersonName,
      b"Mike",
    ));

    assert_eq!(test_support::concat_bytes(&output), expected);
  }

  #[test]
  fn replace_is_idempotent_test() {
    let input = test_support::element_le(
      dictionary::PATIENT_NAME.tag,
      ValueRepresentation::PersonName,
      b"John^Doe",
    );

    let modifications = || {
      vec![TagModification::replace(
        TagPath::from_element(dictionary::PATIENT_NAME.tag),
        replace_with(b"Mike"),
      )]
    };

    let once = modify(modifications(), &input).unwrap();
    let once_bytes = test_support::concat_bytes(&once);

    let twice = {
      let transform =
        ModifyTransform::new(modifications(), ModifyConfig::default())
          .unwrap();
      test_support::run_transform(transform, once).unwrap()
    };

    assert_eq!(test_support::concat_bytes(&twice), once_bytes);
  }

  #[test]
  fn replace_preserves_surrounding_parts_test() {
    let mut input = test_support::element_le(
      dictionary::STUDY_DATE.tag,
      ValueRepresentation::Date,
      b"20240101",
    );
    input.extend(test_support::element_le(
      dictionary::PATIENT_NAME.tag,
      ValueRepresentation::PersonName,
      b"John^Doe",
    ));
    input.extend(test_support::element_le(
      dictionary::PATIENT_ID.tag,
      ValueRepresentation::LongString,
      b"12345678",
    ));

    let output = modify(
      vec![TagModification::replace(
        TagPath::from_element(dictionary::PATIENT_NAME.tag),
        replace_with(b"Mike"),
      )],
      &input,
    )
    .unwrap();

    let mut expected = test_support::element_le(
      dictionary::STUDY_DATE.tag,
      ValueRepresentation::Date,
      b"20240101",
    );
    expected.extend(test_support::element_le(
      dictionary::PATIENT_NAME.tag,
      ValueRepresentation::PersonName,
      b"Mike",
    ));
    expected.extend(test_support::element_le(
      dictionary::PATIENT_ID.tag,
      ValueRepresentation::LongString,
      b"12345678",
    ));

    assert_eq!(test_support::concat_bytes(&output), expected);
  }

  #[test]
  fn insert_into_empty_tail_test() {
    let input = test_support::element_le(
      dictionary::STUDY_DATE.tag,
      ValueRepresentation::Date,
      b"20240101",
    );

    let output = modify(
      vec![TagModification::insert(
        TagPath::from_element(dictionary::PATIENT_NAME.tag),
        replace_with(b"John^Doe"),
      )],
      &input,
    )
    .unwrap();

    let mut expected = test_support::element_le(
      dictionary::STUDY_DATE.tag,
      ValueRepresentation::Date,
      b"20240101",
    );
    expected.extend(test_support::element_le(
      dictionary::PATIENT_NAME.tag,
      ValueRepresentation::PersonName,
      b"John^Doe",
    ));

    assert_eq!(test_support::concat_bytes(&output), expected);
  }

  #[test]
  fn insert_ahead_of_greater_tag_test() {
    let mut input = test_support::element_le(
      dictionary::STUDY_DATE.tag,
      ValueRepresentation::Date,
      b"20240101",
    );
    input.extend(test_support::element_le(
      dictionary::PIXEL_DATA.tag,
      ValueRepresentation::OtherByteString,
      &[0, 1, 2, 3],
    ));

    let output = modify(
      vec![
        TagModification::insert(
          TagPath::from_element(dictionary::PATIENT_NAME.tag),
          replace_with(b"John^Doe"),
        ),
        TagModification::insert(
          TagPath::from_element(dictionary::PATIENT_ID.tag),
          replace_with(b"12345678"),
        ),
      ],
      &input,
    )
    .unwrap();

    let tags: Vec<_> = output
      .iter()
      .filter_map(|part| match part {
        DicomPart::Header(header) => Some(header.tag),
        _ => None,
      })
      .collect();

    assert_eq!(
      tags,
      vec![
        dictionary::STUDY_DATE.tag,
        dictionary::PATIENT_NAME.tag,
        dictionary::PATIENT_ID.tag,
        dictionary::PIXEL_DATA.tag,
      ]
    );
  }

  #[test]
  fn insert_skips_missing_sequence_test() {
    let input = test_support::element_le(
      dictionary::PATIENT_NAME.tag,
      ValueRepresentation::PersonName,
      b"John^Doe",
    );

    let output = modify(
      vec![TagModification::insert(
        TagPath::from_item_wildcard(dictionary::DERIVATION_CODE_SEQUENCE.tag)
          .then_element(dictionary::STUDY_DATE.tag),
        replace_with(b"20240101"),
      )],
      &input,
    )
    .unwrap();

    // Nothing is inserted because the sequence never appears
    assert_eq!(test_support::concat_bytes(&output), input);
  }

  #[test]
  fn insert_before_high_bit_tag_test() {
    // An element in a private group with the high bit set. A signed 32-bit
    // tag comparison would order it before every standard tag.
    let high_bit_tag = DataElementTag::new(0xFFFB, 0x0001);

    let input = test_support::element_le(
      high_bit_tag,
      ValueRepresentation::Unknown,
      &[0, 0],
    );

    let output = modify(
      vec![TagModification::insert(
        TagPath::from_element(dictionary::PATIENT_NAME.tag),
        replace_with(b"John^Doe"),
      )],
      &input,
    )
    .unwrap();

    let tags: Vec<_> = output
      .iter()
      .filter_map(|part| match part {
        DicomPart::Header(header) => Some(header.tag),
        _ => None,
      })
      .collect();

    assert_eq!(tags, vec![dictionary::PATIENT_NAME.tag, high_bit_tag]);
  }

  #[test]
  fn insert_with_element_present_replaces_test() {
    let input = test_support::element_le(
      dictionary::PATIENT_NAME.tag,
      ValueRepresentation::PersonName,
      b"John^Doe",
    );

    let output = modify(
      vec![TagModification::insert(
        TagPath::from_element(dictionary::PATIENT_NAME.tag),
        replace_with(b"Mike"),
      )],
      &input,
    )
    .unwrap();

    let expected = test_support::element_le(
      dictionary::PATIENT_NAME.tag,
      ValueRepresentation::PersonName,
      b"Mike",
    );

    assert_eq!(test_support::concat_bytes(&output), expected);
  }

  #[test]
  fn insert_into_every_item_test() {
    let mut input = test_support::sequence_undefined_le(
      dictionary::DERIVATION_CODE_SEQUENCE.tag,
    );
    for date in [b"20240101", b"20240202"] {
      input.extend(test_support::item_undefined_le());
      input.extend(test_support::element_le(
        dictionary::STUDY_DATE.tag,
        ValueRepresentation::Date,
        date,
      ));
      input.extend(test_support::item_delimitation_le());
    }
    input.extend(test_support::sequence_delimitation_le());

    let output = modify(
      vec![TagModification::insert(
        TagPath::from_item_wildcard(dictionary::DERIVATION_CODE_SEQUENCE.tag)
          .then_element(dictionary::PATIENT_NAME.tag),
        replace_with(b"John^Doe"),
      )],
      &input,
    )
    .unwrap();

    let inserted_count = output
      .iter()
      .filter(|part| {
        matches!(
          part,
          DicomPart::Header(header)
            if header.tag == dictionary::PATIENT_NAME.tag
        )
      })
      .count();

    assert_eq!(inserted_count, 2);

    let mut expected = test_support::sequence_undefined_le(
      dictionary::DERIVATION_CODE_SEQUENCE.tag,
    );
    for date in [b"20240101", b"20240202"] {
      expected.extend(test_support::item_undefined_le());
      expected.extend(test_support::element_le(
        dictionary::STUDY_DATE.tag,
        ValueRepresentation::Date,
        date,
      ));
      expected.extend(test_support::element_le(
        dictionary::PATIENT_NAME.tag,
        ValueRepresentation::PersonName,
        b"John^Doe",
      ));
      expected.extend(test_support::item_delimitation_le());
    }
    expected.extend(test_support::sequence_delimitation_le());

    assert_eq!(test_support::concat_bytes(&output), expected);
  }

  #[test]
  fn insert_into_defined_length_item_test() {
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

    let output = modify(
      vec![TagModification::insert(
        TagPath::from_item_wildcard(dictionary::DERIVATION_CODE_SEQUENCE.tag)
          .then_element(dictionary::PATIENT_NAME.tag),
        replace_with(b"John^Doe"),
      )],
      &input,
    )
    .unwrap();

    // The insert fires at the item's implicit end, ahead of its zero-byte
    // delimitation marker
    let kinds: Vec<String> =
      output.iter().map(|part| part.to_string()).collect();

    let patient_name_position = output
      .iter()
      .position(|part| {
        matches!(
          part,
          DicomPart::Header(header)
            if header.tag == dictionary::PATIENT_NAME.tag
        )
      })
      .unwrap_or_else(|| panic!("No insert in: {:?}", kinds));

    let item_delimitation_position = output
      .iter()
      .position(|part| matches!(part, DicomPart::ItemDelimitation { .. }))
      .unwrap();

    assert!(patient_name_position < item_delimitation_position);
  }

  #[test]
  fn replace_ending_with_matches_at_depth_test() {
    let mut input = test_support::element_le(
      dictionary::STUDY_DATE.tag,
      ValueRepresentation::Date,
      b"20240101",
    );
    input.extend(test_support::sequence_undefined_le(
      dictionary::DERIVATION_CODE_SEQUENCE.tag,
    ));
    input.extend(test_support::item_undefined_le());
    input.extend(test_support::element_le(
      dictionary::STUDY_DATE.tag,
      ValueRepresentation::Date,
      b"20240202",
    ));
    input.extend(test_support::item_delimitation_le());
    input.extend(test_support::sequence_delimitation_le());

    let output = modify(
      vec![TagModification::replace_ending_with(
        TagPath::from_element(dictionary::STUDY_DATE.tag),
        replace_with(b"19990909"),
      )],
      &input,
    )
    .unwrap();

    let values: Vec<Vec<u8>> = output
      .iter()
      .filter_map(|part| match part {
        DicomPart::ValueChunk { bytes, .. } if !bytes.is_empty() => {
          Some(bytes.to_vec())
        }
        _ => None,
      })
      .collect();

    assert_eq!(
      values,
      vec![b"19990909".to_vec(), b"19990909".to_vec()]
    );
  }

  #[test]
  fn insert_guards_reject_unknown_and_sequence_tags_test() {
    assert!(matches!(
      ModifyTransform::new(
        vec![TagModification::insert(
          TagPath::from_element(DataElementTag::new(0x0009, 0x0010)),
          Box::new(|_: &[u8]| vec![]),
        )],
        ModifyConfig::default(),
      ),
      Err(StreamError::UnknownTagForInsertion { .. })
    ));

    assert!(matches!(
      ModifyTransform::new(
        vec![TagModification::insert(
          TagPath::from_element(dictionary::DERIVATION_CODE_SEQUENCE.tag),
          Box::new(|_: &[u8]| vec![]),
        )],
        ModifyConfig::default(),
      ),
      Err(StreamError::CannotInsertSequence { .. })
    ));
  }
}
