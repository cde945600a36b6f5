//! Tracks the tag path of the current position in a stream of DICOM parts.
//!
//! The tracker is a pass-through helper: parts are fed to [`TagPathTracker::update`]
//! in stream order and are not altered, and the path of the part most
//! recently seen is available from [`TagPathTracker::path`]. The transforms
//! that need to know where in the data set hierarchy they are, e.g. the
//! modify and collect stages, each own one of these.

use dcmflow_core::TagPath;

use crate::DicomPart;

/// Maintains the current [`TagPath`] as parts fly by.
///
pub struct TagPathTracker {
  // The enclosing scope: the root data set or a nested sequence item. Only
  // sequence-item steps appear here; a sequence whose first item has not
  // arrived yet is represented with item index 0.
  scope: TagPath,

  // The path of the most recently seen part, which extends the scope with an
  // element step while an element's header and value chunks pass through
  current: TagPath,
}

impl TagPathTracker {
  /// Creates a new tracker positioned at the root data set.
  ///
  pub fn new() -> Self {
    Self {
      scope: TagPath::root(),
      current: TagPath::root(),
    }
  }

  /// Returns the tag path of the most recently seen part.
  ///
  pub fn path(&self) -> &TagPath {
    &self.current
  }

  /// Returns the path of the enclosing scope: the root data set or the
  /// sequence item currently being traversed.
  ///
  pub fn scope(&self) -> &TagPath {
    &self.scope
  }

  /// Returns whether the current position is in the root data set, i.e. not
  /// inside any sequence.
  ///
  pub fn is_at_root(&self) -> bool {
    self.scope.is_root()
  }

  /// Advances the tracker over the next part in the stream.
  ///
  pub fn update(&mut self, part: &DicomPart) {
    match part {
      DicomPart::Header(header) => {
        self.current = self.scope.clone().then_element(header.tag);
      }

      DicomPart::ValueChunk { last: true, .. } => {
        self.current = self.scope.clone();
      }

      DicomPart::Sequence { tag, .. } | DicomPart::Fragments { tag, .. } => {
        self.scope = self.scope.clone().then_item(*tag, 0);
        self.current = self.scope.clone();
      }

      DicomPart::Item { index, .. } => {
        if let Some(tag) = self.scope.last_tag() {
          self.scope = self.scope.parent().then_item(tag, *index);
        }

        self.current = self.scope.clone();
      }

      DicomPart::ItemDelimitation { .. } => {
        self.current = self.scope.clone();
      }

      DicomPart::SequenceDelimitation { .. } => {
        self.scope = self.scope.parent();
        self.current = self.scope.clone();
      }

      _ => (),
    }
  }
}

impl Default for TagPathTracker {
  fn default() -> Self {
    Self::new()
  }
}
