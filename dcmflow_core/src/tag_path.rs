//! Paths that identify the precise location of a data element in a possibly
//! nested data set.
//!
//! A tag path is a list of steps from the root data set down to a single data
//! element: zero or more sequence-item steps, optionally terminated by a final
//! element step. Sequence-item steps carry a 1-based item index that can also
//! be a wildcard, which is used by matchers that apply to every item of a
//! sequence.
//!
//! Examples when formatted as strings:
//!
//! - `""`: the root data set itself.
//! - `"00100010"`: the *'(0010,0010) Patient Name'* data element.
//! - `"00089215[1]/00080020"`: the *'(0008,0020) Study Date'* data element in
//!   the first item of the *'(0008,9215) Derivation Code Sequence'*.
//! - `"00089215[*]/00080020"`: the same data element in every item of that
//!   sequence.

use crate::DataElementTag;

/// The item index carried by a sequence-item step. `Any` is the wildcard that
/// matches every item of the sequence.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ItemIndex {
  Exact(u32),
  Any,
}

impl ItemIndex {
  /// Returns whether this index, used in a matcher, accepts the given index
  /// from a tracked path. The wildcard accepts every index.
  ///
  pub fn accepts(&self, other: &ItemIndex) -> bool {
    match (self, other) {
      (ItemIndex::Any, _) | (_, ItemIndex::Any) => true,
      (ItemIndex::Exact(a), ItemIndex::Exact(b)) => a == b,
    }
  }
}

/// A single step in a [`TagPath`].
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TagPathStep {
  /// A step into one item of a sequence data element.
  SequenceItem {
    tag: DataElementTag,
    index: ItemIndex,
  },

  /// The final step naming a data element. Only valid as the last step of a
  /// path.
  Element { tag: DataElementTag },
}

impl TagPathStep {
  /// Returns the tag for this step.
  ///
  pub fn tag(&self) -> DataElementTag {
    match self {
      TagPathStep::SequenceItem { tag, .. } => *tag,
      TagPathStep::Element { tag } => *tag,
    }
  }

  /// Returns whether this step, used in a matcher, accepts the given step
  /// from a tracked path. Tags must be equal, and item indices must agree
  /// with wildcards accepting everything.
  ///
  fn accepts(&self, other: &TagPathStep) -> bool {
    match (self, other) {
      (
        TagPathStep::SequenceItem { tag, index },
        TagPathStep::SequenceItem {
          tag: other_tag,
          index: other_index,
        },
      ) => tag == other_tag && index.accepts(other_index),

      (
        TagPathStep::Element { tag },
        TagPathStep::Element { tag: other_tag },
      ) => tag == other_tag,

      _ => false,
    }
  }
}

/// A path from the root data set to a data element or sequence item.
///
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TagPath {
  steps: Vec<TagPathStep>,
}

impl TagPath {
  /// The path to the root data set, which has no steps.
  ///
  pub fn root() -> Self {
    Self { steps: vec![] }
  }

  /// Creates a path to a data element in the root data set.
  ///
  pub fn from_element(tag: DataElementTag) -> Self {
    Self {
      steps: vec![TagPathStep::Element { tag }],
    }
  }

  /// Creates a path to one item of a sequence in the root data set. Item
  /// indices are 1-based.
  ///
  pub fn from_item(tag: DataElementTag, item: u32) -> Self {
    Self {
      steps: vec![TagPathStep::SequenceItem {
        tag,
        index: ItemIndex::Exact(item),
      }],
    }
  }

  /// Creates a path into every item of a sequence in the root data set.
  ///
  pub fn from_item_wildcard(tag: DataElementTag) -> Self {
    Self {
      steps: vec![TagPathStep::SequenceItem {
        tag,
        index: ItemIndex::Any,
      }],
    }
  }

  /// Extends a path with a final element step. Invalid if the path already
  /// ends in an element step.
  ///
  pub fn then_element(mut self, tag: DataElementTag) -> Self {
    assert!(
      !matches!(self.steps.last(), Some(TagPathStep::Element { .. })),
      "Tag path already ends in an element"
    );

    self.steps.push(TagPathStep::Element { tag });
    self
  }

  /// Extends a path with a sequence-item step. Invalid if the path already
  /// ends in an element step.
  ///
  pub fn then_item(mut self, tag: DataElementTag, item: u32) -> Self {
    assert!(
      !matches!(self.steps.last(), Some(TagPathStep::Element { .. })),
      "Tag path already ends in an element"
    );

    self.steps.push(TagPathStep::SequenceItem {
      tag,
      index: ItemIndex::Exact(item),
    });
    self
  }

  /// Extends a path with a wildcard sequence-item step.
  ///
  pub fn then_item_wildcard(mut self, tag: DataElementTag) -> Self {
    assert!(
      !matches!(self.steps.last(), Some(TagPathStep::Element { .. })),
      "Tag path already ends in an element"
    );

    self.steps.push(TagPathStep::SequenceItem {
      tag,
      index: ItemIndex::Any,
    });
    self
  }

  /// Returns the steps of this path.
  ///
  pub fn steps(&self) -> &[TagPathStep] {
    &self.steps
  }

  /// Returns whether this is the path to the root data set.
  ///
  pub fn is_root(&self) -> bool {
    self.steps.is_empty()
  }

  /// Returns the number of steps in this path.
  ///
  pub fn depth(&self) -> usize {
    self.steps.len()
  }

  /// Returns the tag of the first step, if any.
  ///
  pub fn head_tag(&self) -> Option<DataElementTag> {
    self.steps.first().map(|step| step.tag())
  }

  /// Returns the tag of the last step, if any.
  ///
  pub fn last_tag(&self) -> Option<DataElementTag> {
    self.steps.last().map(|step| step.tag())
  }

  /// Returns the path to the enclosing scope, i.e. this path with its last
  /// step removed.
  ///
  pub fn parent(&self) -> TagPath {
    let mut steps = self.steps.clone();
    steps.pop();

    TagPath { steps }
  }

  /// Returns whether this path starts with all of the given prefix's steps.
  /// Wildcard item indices in the prefix accept every item index.
  ///
  pub fn starts_with(&self, prefix: &TagPath) -> bool {
    prefix.steps.len() <= self.steps.len()
      && prefix
        .steps
        .iter()
        .zip(self.steps.iter())
        .all(|(a, b)| a.accepts(b))
  }

  /// Returns whether this path starts with the given prefix when item
  /// indices are ignored entirely, i.e. only the tags along the path are
  /// compared. A prefix step naming a sequence therefore matches both the
  /// sequence element itself and any item within it.
  ///
  pub fn starts_with_ignoring_items(&self, prefix: &TagPath) -> bool {
    prefix.steps.len() <= self.steps.len()
      && prefix
        .steps
        .iter()
        .zip(self.steps.iter())
        .all(|(a, b)| a.tag() == b.tag())
  }

  /// Returns whether this path ends with all of the given suffix's steps.
  /// Wildcard item indices in the suffix accept every item index.
  ///
  pub fn ends_with(&self, suffix: &TagPath) -> bool {
    suffix.steps.len() <= self.steps.len()
      && suffix
        .steps
        .iter()
        .rev()
        .zip(self.steps.iter().rev())
        .all(|(a, b)| a.accepts(b))
  }

  /// Returns whether a matcher path accepts a tracked path exactly, i.e.
  /// both have the same steps, with wildcard item indices in the matcher
  /// accepting every item index.
  ///
  pub fn accepts(&self, other: &TagPath) -> bool {
    self.steps.len() == other.steps.len() && other.starts_with(self)
  }

  /// Parses a tag path from a string of `/`-separated steps, where each step
  /// is eight hex digits optionally followed by an item index in square
  /// brackets, e.g. `"00089215[1]/00080020"`. The item index `*` is the
  /// wildcard.
  ///
  pub fn from_string(s: &str) -> Result<Self, String> {
    let mut path = Self::root();

    if s.is_empty() {
      return Ok(path);
    }

    for step in s.split('/') {
      if matches!(path.steps.last(), Some(TagPathStep::Element { .. })) {
        return Err(format!("Tag path step after an element: {}", step));
      }

      let (tag, item) = match step.find('[') {
        Some(open) => {
          if !step.ends_with(']') {
            return Err(format!("Invalid tag path step: {}", step));
          }

          (&step[..open], Some(&step[open + 1..step.len() - 1]))
        }
        None => (step, None),
      };

      let tag = DataElementTag::from_hex_string(tag)
        .map_err(|_| format!("Invalid tag path step: {}", step))?;

      match item {
        None => path.steps.push(TagPathStep::Element { tag }),

        Some("*") => {
          path.steps.push(TagPathStep::SequenceItem {
            tag,
            index: ItemIndex::Any,
          });
        }

        Some(index) => {
          let index = index
            .parse::<u32>()
            .map_err(|_| format!("Invalid tag path step: {}", step))?;

          path.steps.push(TagPathStep::SequenceItem {
            tag,
            index: ItemIndex::Exact(index),
          });
        }
      }
    }

    Ok(path)
  }
}

impl Ord for TagPath {
  /// Orders tag paths consistently with the order their elements appear in a
  /// well-formed part stream: step by step, comparing tags as unsigned
  /// values, then item indices, with a strict prefix ordering before any
  /// longer path. The wildcard index orders before all exact indices.
  ///
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    for (a, b) in self.steps.iter().zip(other.steps.iter()) {
      match a.tag().cmp(&b.tag()) {
        Ordering::Equal => (),
        ordering => return ordering,
      }

      if let (
        TagPathStep::SequenceItem { index: a, .. },
        TagPathStep::SequenceItem { index: b, .. },
      ) = (a, b)
      {
        let ordering = match (a, b) {
          (ItemIndex::Any, ItemIndex::Any) => Ordering::Equal,
          (ItemIndex::Any, ItemIndex::Exact(_)) => Ordering::Less,
          (ItemIndex::Exact(_), ItemIndex::Any) => Ordering::Greater,
          (ItemIndex::Exact(a), ItemIndex::Exact(b)) => a.cmp(b),
        };

        if ordering != Ordering::Equal {
          return ordering;
        }
      }
    }

    self.steps.len().cmp(&other.steps.len())
  }
}

impl PartialOrd for TagPath {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl std::fmt::Display for TagPath {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    let path = self
      .steps
      .iter()
      .map(|step| match step {
        TagPathStep::SequenceItem {
          tag,
          index: ItemIndex::Exact(index),
        } => format!("{}[{}]", tag.to_hex_string(), index),

        TagPathStep::SequenceItem {
          tag,
          index: ItemIndex::Any,
        } => format!("{}[*]", tag.to_hex_string()),

        TagPathStep::Element { tag } => tag.to_hex_string(),
      })
      .collect::<Vec<_>>()
      .join("/");

    f.write_str(&path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tag(group: u16, element: u16) -> DataElementTag {
    DataElementTag::new(group, element)
  }

  #[test]
  fn to_string_test() {
    assert_eq!(&TagPath::root().to_string(), "");

    assert_eq!(
      &TagPath::from_element(tag(0x0010, 0x0010)).to_string(),
      "00100010"
    );

    assert_eq!(
      &TagPath::from_item(tag(0x0008, 0x9215), 2)
        .then_element(tag(0x0008, 0x0020))
        .to_string(),
      "00089215[2]/00080020"
    );

    assert_eq!(
      &TagPath::from_item_wildcard(tag(0x0008, 0x9215))
        .then_element(tag(0x0008, 0x0020))
        .to_string(),
      "00089215[*]/00080020"
    );
  }

  #[test]
  fn from_string_test() {
    assert_eq!(TagPath::from_string(""), Ok(TagPath::root()));

    assert_eq!(
      TagPath::from_string("00089215[2]/00080020"),
      Ok(
        TagPath::from_item(tag(0x0008, 0x9215), 2)
          .then_element(tag(0x0008, 0x0020))
      )
    );

    assert_eq!(
      TagPath::from_string("00089215[*]/00080020"),
      Ok(
        TagPath::from_item_wildcard(tag(0x0008, 0x9215))
          .then_element(tag(0x0008, 0x0020))
      )
    );

    assert!(TagPath::from_string("00100010/00100020").is_err());
    assert!(TagPath::from_string("0010001").is_err());
  }

  #[test]
  fn starts_with_test() {
    let path = TagPath::from_item(tag(0x0008, 0x9215), 3)
      .then_element(tag(0x0010, 0x0010));

    assert!(path.starts_with(&TagPath::root()));
    assert!(path.starts_with(&TagPath::from_item(tag(0x0008, 0x9215), 3)));
    assert!(path.starts_with(&TagPath::from_item_wildcard(tag(0x0008, 0x9215))));
    assert!(path.starts_with(&path.clone()));

    assert!(!path.starts_with(&TagPath::from_item(tag(0x0008, 0x9215), 2)));
    assert!(!path.starts_with(&TagPath::from_element(tag(0x0008, 0x9215))));
  }

  #[test]
  fn starts_with_ignoring_items_test() {
    let path = TagPath::from_item(tag(0x0008, 0x9215), 3)
      .then_element(tag(0x0010, 0x0010));

    assert!(
      path.starts_with_ignoring_items(
        &TagPath::from_item(tag(0x0008, 0x9215), 7)
      )
    );
  }

  #[test]
  fn ends_with_test() {
    let path = TagPath::from_item(tag(0x0008, 0x9215), 1)
      .then_element(tag(0x0008, 0x0020));

    assert!(path.ends_with(&TagPath::from_element(tag(0x0008, 0x0020))));
    assert!(path.ends_with(&path.clone()));
    assert!(!path.ends_with(&TagPath::from_element(tag(0x0008, 0x9215))));
  }

  #[test]
  fn ordering_test() {
    let a = TagPath::from_element(tag(0x0008, 0x0020));
    let b = TagPath::from_element(tag(0x0010, 0x0010));
    let c = TagPath::from_element(tag(0xFFFB, 0x0001));

    assert!(a < b);
    assert!(b < c);

    let item_one = TagPath::from_item(tag(0x0008, 0x9215), 1)
      .then_element(tag(0x0008, 0x0020));
    let item_two = TagPath::from_item(tag(0x0008, 0x9215), 2)
      .then_element(tag(0x0008, 0x0020));

    assert!(item_one < item_two);

    // A sequence path is a strict prefix of the paths inside it
    assert!(TagPath::from_item(tag(0x0008, 0x9215), 1) < item_one);
  }

  #[test]
  fn accepts_test() {
    let matcher = TagPath::from_item_wildcard(tag(0x0008, 0x9215))
      .then_element(tag(0x0008, 0x0020));

    let path = TagPath::from_item(tag(0x0008, 0x9215), 4)
      .then_element(tag(0x0008, 0x0020));

    assert!(matcher.accepts(&path));
    assert!(!matcher.accepts(&path.parent()));
  }
}
