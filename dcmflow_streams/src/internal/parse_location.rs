//! Tracks where in the hierarchy of sequences and items a parse is up to,
//! along with the data needed to close defined-length sequences and items at
//! the right byte offsets.
//!
//! Sequences and items of defined length have no delimiters on the wire.
//! Their end offsets are recorded here when they open, and when the parse
//! position reaches an end offset a delimitation part with empty bytes is
//! emitted so that downstream stages always see explicit scope ends,
//! whichever length form the stream uses.

use std::rc::Rc;

use dcmflow_core::dictionary;

use crate::DicomPart;

/// A parse location is a stack of entries, with the root data set always at
/// the bottom and the current innermost scope at the top.
///
pub struct ParseLocation {
  entries: Vec<LocationEntry>,
}

enum LocationEntry {
  RootDataSet,
  Sequence {
    is_implicit_vr: bool,
    ends_at: Option<u64>,
    item_count: u32,
  },
  Item {
    index: u32,
    ends_at: Option<u64>,
  },
  Fragments {
    item_count: u32,
  },
}

impl ParseLocation {
  /// Creates a new location with an entry for the root data set.
  ///
  pub fn new() -> Self {
    Self {
      entries: vec![LocationEntry::RootDataSet],
    }
  }

  /// Returns whether a sequence in the location has forced the use of
  /// implicit VRs for its content. This occurs for sequences read from an
  /// explicit VR of `UN` with undefined length, whose content must be read
  /// as 'Implicit VR Little Endian'. Ref: DICOM Correction Proposal CP-246.
  ///
  pub fn is_implicit_vr_forced(&self) -> bool {
    self.entries.iter().any(|entry| {
      matches!(
        entry,
        LocationEntry::Sequence {
          is_implicit_vr: true,
          ..
        }
      )
    })
  }

  /// If the entry at the top of the location is a defined-length sequence or
  /// item whose end offset has been reached, pops it and returns the
  /// delimitation part that closes it. The returned part carries empty bytes
  /// as there is no delimiter on the wire.
  ///
  pub fn next_delimiter_part(
    &mut self,
    bytes_read: u64,
    big_endian: bool,
  ) -> Option<DicomPart> {
    match self.entries.last() {
      Some(LocationEntry::Sequence {
        ends_at: Some(ends_at),
        ..
      }) if *ends_at <= bytes_read => {
        self.entries.pop();

        Some(DicomPart::SequenceDelimitation {
          big_endian,
          bytes: Rc::new(vec![]),
        })
      }

      Some(LocationEntry::Item {
        index,
        ends_at: Some(ends_at),
      }) if *ends_at <= bytes_read => {
        let index = *index;
        self.entries.pop();

        Some(DicomPart::ItemDelimitation {
          index,
          big_endian,
          bytes: Rc::new(vec![]),
        })
      }

      _ => None,
    }
  }

  /// Returns the parts required to end all active sequences and items,
  /// regardless of whether their end offsets have been reached, finishing
  /// with the part for the end of the stream. The ended entries are removed
  /// so that a repeated call returns only the end-of-stream part.
  ///
  pub fn pending_delimiter_parts(
    &mut self,
    big_endian: bool,
  ) -> Vec<DicomPart> {
    let parts = self
      .entries
      .iter()
      .rev()
      .map(|entry| match entry {
        LocationEntry::Sequence { .. } | LocationEntry::Fragments { .. } => {
          DicomPart::SequenceDelimitation {
            big_endian,
            bytes: Rc::new(vec![]),
          }
        }

        LocationEntry::Item { index, .. } => DicomPart::ItemDelimitation {
          index: *index,
          big_endian,
          bytes: Rc::new(vec![]),
        },

        LocationEntry::RootDataSet => DicomPart::End,
      })
      .collect();

    self.entries.truncate(1);

    parts
  }

  /// Adds a new sequence to the location.
  ///
  pub fn add_sequence(
    &mut self,
    is_implicit_vr: bool,
    ends_at: Option<u64>,
  ) -> Result<(), String> {
    match self.entries.last() {
      Some(LocationEntry::RootDataSet) | Some(LocationEntry::Item { .. }) => {
        self.entries.push(LocationEntry::Sequence {
          is_implicit_vr,
          ends_at,
          item_count: 0,
        });

        Ok(())
      }

      _ => Err(
        "Sequence encountered outside of the root data set or an item"
          .to_string(),
      ),
    }
  }

  /// Ends the current sequence or fragments.
  ///
  pub fn end_sequence(&mut self) -> Result<(), String> {
    match self.entries.last() {
      Some(LocationEntry::Sequence { .. })
      | Some(LocationEntry::Fragments { .. }) => {
        self.entries.pop();
        Ok(())
      }

      _ => Err(
        format!(
          "{} encountered outside of a sequence",
          dictionary::SEQUENCE_DELIMITATION_ITEM.name
        ),
      ),
    }
  }

  /// Adds a new item to the current sequence and returns its 1-based index.
  ///
  pub fn add_item(&mut self, ends_at: Option<u64>) -> Result<u32, String> {
    match self.entries.last_mut() {
      Some(LocationEntry::Sequence { item_count, .. }) => {
        *item_count += 1;
        let index = *item_count;

        self.entries.push(LocationEntry::Item { index, ends_at });

        Ok(index)
      }

      _ => Err("Item encountered outside of a sequence".to_string()),
    }
  }

  /// Ends the current item and returns its 1-based index.
  ///
  pub fn end_item(&mut self) -> Result<u32, String> {
    match self.entries.last() {
      Some(LocationEntry::Item { index, .. }) => {
        let index = *index;
        self.entries.pop();

        Ok(index)
      }

      _ => Err(
        format!(
          "{} encountered outside of an item",
          dictionary::ITEM_DELIMITATION_ITEM.name
        ),
      ),
    }
  }

  /// Adds encapsulated pixel data fragments to the location.
  ///
  pub fn add_fragments(&mut self) -> Result<(), String> {
    match self.entries.last() {
      Some(LocationEntry::RootDataSet) => {
        self.entries.push(LocationEntry::Fragments { item_count: 0 });
        Ok(())
      }

      _ => {
        Err("Fragments encountered outside of the root data set".to_string())
      }
    }
  }

  /// Records a new fragment item and returns its 1-based index.
  ///
  pub fn add_fragment_item(&mut self) -> Result<u32, String> {
    match self.entries.last_mut() {
      Some(LocationEntry::Fragments { item_count }) => {
        *item_count += 1;
        Ok(*item_count)
      }

      _ => Err("Fragment item encountered outside of fragments".to_string()),
    }
  }
}
