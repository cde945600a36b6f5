//! Transform that filters data elements out of a stream of DICOM parts.

use dcmflow_core::TagPath;

use crate::tag_path_tracker::TagPathTracker;
use crate::{DicomPart, PartTransform, StreamError};

/// Transform that applies a predicate to each data element in a stream of
/// parts and drops those that are rejected. Rejecting a sequence or
/// fragments drops its entire subtree: items, nested elements, and the
/// closing delimitation.
///
/// The preamble and the File Meta Information always pass through; the
/// predicate only sees data set elements.
///
pub struct FilterTransform {
  predicate: Box<dyn FnMut(&TagPath) -> bool>,
  tracker: TagPathTracker,

  // Filter results for the currently open sequences and fragments
  container_results: Vec<bool>,

  // Filter result for the element whose value chunks are passing through
  element_result: bool,
}

impl FilterTransform {
  /// Creates a new filter transform keeping only the data elements whose
  /// tag path is accepted by the predicate.
  ///
  pub fn new(predicate: Box<dyn FnMut(&TagPath) -> bool>) -> Self {
    Self {
      predicate,
      tracker: TagPathTracker::new(),
      container_results: vec![],
      element_result: true,
    }
  }

  /// Creates a filter that keeps only elements on the given paths, along
  /// with the sequences that enclose them.
  ///
  pub fn whitelist(paths: Vec<TagPath>) -> Self {
    Self::new(Box::new(move |path| {
      paths.iter().any(|p| {
        path.starts_with_ignoring_items(p)
          || p.starts_with_ignoring_items(path)
      })
    }))
  }

  /// Creates a filter that removes the elements on the given paths,
  /// including everything beneath them.
  ///
  pub fn blacklist(paths: Vec<TagPath>) -> Self {
    Self::new(Box::new(move |path| {
      !paths.iter().any(|p| path.starts_with_ignoring_items(p))
    }))
  }

  fn containers_allow(&self) -> bool {
    *self.container_results.last().unwrap_or(&true)
  }
}

impl PartTransform for FilterTransform {
  fn add_part(
    &mut self,
    part: DicomPart,
  ) -> Result<Vec<DicomPart>, StreamError> {
    self.tracker.update(&part);

    let keep = match &part {
      DicomPart::Header(header) => {
        self.element_result = if header.is_fmi {
          true
        } else {
          self.containers_allow()
            && (self.predicate)(self.tracker.path())
        };

        self.element_result
      }

      DicomPart::ValueChunk { .. } => self.element_result,

      DicomPart::Sequence { .. } | DicomPart::Fragments { .. } => {
        let result =
          self.containers_allow() && (self.predicate)(self.tracker.path());

        self.container_results.push(result);

        result
      }

      DicomPart::SequenceDelimitation { .. } => {
        self.container_results.pop().unwrap_or(true)
      }

      DicomPart::Item { .. } | DicomPart::ItemDelimitation { .. } => {
        self.containers_allow()
      }

      _ => true,
    };

    if keep {
      Ok(vec![part])
    } else {
      Ok(vec![])
    }
  }
}
