//! A static dictionary of the registered DICOM data elements, mapping tags to
//! their name and allowed value representations.
//!
//! The table is constructed at compile time and is read-only. It covers the
//! structural tags the streaming engine dispatches on, the File Meta
//! Information group, and the common patient/study/series/image module
//! attributes. Lookups for tags outside the table return an error, which for
//! parsing purposes means the `UN` VR, and for element insertion means the
//! insertion is rejected.

use crate::{DataElementTag, ValueRepresentation};

/// A single dictionary entry: the tag, its name, and the value
/// representations it is allowed to use.
///
#[derive(Debug, PartialEq)]
pub struct Item {
  pub tag: DataElementTag,
  pub name: &'static str,
  pub vrs: &'static [ValueRepresentation],
}

const fn item(
  group: u16,
  element: u16,
  name: &'static str,
  vrs: &'static [ValueRepresentation],
) -> Item {
  Item {
    tag: DataElementTag::new(group, element),
    name,
    vrs,
  }
}

use crate::value_representation::ValueRepresentation::*;

pub const FILE_META_INFORMATION_GROUP_LENGTH: Item =
  item(0x0002, 0x0000, "File Meta Information Group Length", &[UnsignedLong]);
pub const FILE_META_INFORMATION_VERSION: Item =
  item(0x0002, 0x0001, "File Meta Information Version", &[OtherByteString]);
pub const MEDIA_STORAGE_SOP_CLASS_UID: Item =
  item(0x0002, 0x0002, "Media Storage SOP Class UID", &[UniqueIdentifier]);
pub const MEDIA_STORAGE_SOP_INSTANCE_UID: Item =
  item(0x0002, 0x0003, "Media Storage SOP Instance UID", &[UniqueIdentifier]);
pub const TRANSFER_SYNTAX_UID: Item =
  item(0x0002, 0x0010, "Transfer Syntax UID", &[UniqueIdentifier]);
pub const IMPLEMENTATION_CLASS_UID: Item =
  item(0x0002, 0x0012, "Implementation Class UID", &[UniqueIdentifier]);
pub const IMPLEMENTATION_VERSION_NAME: Item =
  item(0x0002, 0x0013, "Implementation Version Name", &[ShortString]);

pub const SPECIFIC_CHARACTER_SET: Item =
  item(0x0008, 0x0005, "Specific Character Set", &[CodeString]);
pub const IMAGE_TYPE: Item = item(0x0008, 0x0008, "Image Type", &[CodeString]);
pub const INSTANCE_CREATOR_UID: Item =
  item(0x0008, 0x0014, "Instance Creator UID", &[UniqueIdentifier]);
pub const SOP_CLASS_UID: Item =
  item(0x0008, 0x0016, "SOP Class UID", &[UniqueIdentifier]);
pub const SOP_INSTANCE_UID: Item =
  item(0x0008, 0x0018, "SOP Instance UID", &[UniqueIdentifier]);
pub const STUDY_DATE: Item = item(0x0008, 0x0020, "Study Date", &[Date]);
pub const SERIES_DATE: Item = item(0x0008, 0x0021, "Series Date", &[Date]);
pub const ACQUISITION_DATE: Item =
  item(0x0008, 0x0022, "Acquisition Date", &[Date]);
pub const STUDY_TIME: Item = item(0x0008, 0x0030, "Study Time", &[Time]);
pub const ACCESSION_NUMBER: Item =
  item(0x0008, 0x0050, "Accession Number", &[ShortString]);
pub const MODALITY: Item = item(0x0008, 0x0060, "Modality", &[CodeString]);
pub const MANUFACTURER: Item =
  item(0x0008, 0x0070, "Manufacturer", &[LongString]);
pub const INSTITUTION_NAME: Item =
  item(0x0008, 0x0080, "Institution Name", &[LongString]);
pub const REFERRING_PHYSICIAN_NAME: Item =
  item(0x0008, 0x0090, "Referring Physician's Name", &[PersonName]);
pub const STUDY_DESCRIPTION: Item =
  item(0x0008, 0x1030, "Study Description", &[LongString]);
pub const SERIES_DESCRIPTION: Item =
  item(0x0008, 0x103E, "Series Description", &[LongString]);
pub const REFERENCED_IMAGE_SEQUENCE: Item =
  item(0x0008, 0x1140, "Referenced Image Sequence", &[Sequence]);
pub const DERIVATION_CODE_SEQUENCE: Item =
  item(0x0008, 0x9215, "Derivation Code Sequence", &[Sequence]);

pub const PATIENT_NAME: Item =
  item(0x0010, 0x0010, "Patient's Name", &[PersonName]);
pub const PATIENT_ID: Item =
  item(0x0010, 0x0020, "Patient ID", &[LongString]);
pub const PATIENT_BIRTH_DATE: Item =
  item(0x0010, 0x0030, "Patient's Birth Date", &[Date]);
pub const PATIENT_SEX: Item =
  item(0x0010, 0x0040, "Patient's Sex", &[CodeString]);
pub const PATIENT_AGE: Item =
  item(0x0010, 0x1010, "Patient's Age", &[AgeString]);

pub const BODY_PART_EXAMINED: Item =
  item(0x0018, 0x0015, "Body Part Examined", &[CodeString]);
pub const SLICE_THICKNESS: Item =
  item(0x0018, 0x0050, "Slice Thickness", &[DecimalString]);
pub const PATIENT_POSITION: Item =
  item(0x0018, 0x5100, "Patient Position", &[CodeString]);

pub const STUDY_INSTANCE_UID: Item =
  item(0x0020, 0x000D, "Study Instance UID", &[UniqueIdentifier]);
pub const SERIES_INSTANCE_UID: Item =
  item(0x0020, 0x000E, "Series Instance UID", &[UniqueIdentifier]);
pub const STUDY_ID: Item = item(0x0020, 0x0010, "Study ID", &[ShortString]);
pub const SERIES_NUMBER: Item =
  item(0x0020, 0x0011, "Series Number", &[IntegerString]);
pub const INSTANCE_NUMBER: Item =
  item(0x0020, 0x0013, "Instance Number", &[IntegerString]);
pub const IMAGE_POSITION_PATIENT: Item =
  item(0x0020, 0x0032, "Image Position (Patient)", &[DecimalString]);
pub const IMAGE_ORIENTATION_PATIENT: Item =
  item(0x0020, 0x0037, "Image Orientation (Patient)", &[DecimalString]);
pub const FRAME_OF_REFERENCE_UID: Item =
  item(0x0020, 0x0052, "Frame of Reference UID", &[UniqueIdentifier]);

pub const SAMPLES_PER_PIXEL: Item =
  item(0x0028, 0x0002, "Samples per Pixel", &[UnsignedShort]);
pub const PHOTOMETRIC_INTERPRETATION: Item =
  item(0x0028, 0x0004, "Photometric Interpretation", &[CodeString]);
pub const NUMBER_OF_FRAMES: Item =
  item(0x0028, 0x0008, "Number of Frames", &[IntegerString]);
pub const ROWS: Item = item(0x0028, 0x0010, "Rows", &[UnsignedShort]);
pub const COLUMNS: Item = item(0x0028, 0x0011, "Columns", &[UnsignedShort]);
pub const BITS_ALLOCATED: Item =
  item(0x0028, 0x0100, "Bits Allocated", &[UnsignedShort]);
pub const BITS_STORED: Item =
  item(0x0028, 0x0101, "Bits Stored", &[UnsignedShort]);
pub const HIGH_BIT: Item = item(0x0028, 0x0102, "High Bit", &[UnsignedShort]);
pub const PIXEL_REPRESENTATION: Item =
  item(0x0028, 0x0103, "Pixel Representation", &[UnsignedShort]);
pub const SMALLEST_IMAGE_PIXEL_VALUE: Item = item(
  0x0028,
  0x0106,
  "Smallest Image Pixel Value",
  &[UnsignedShort, SignedShort],
);
pub const LARGEST_IMAGE_PIXEL_VALUE: Item = item(
  0x0028,
  0x0107,
  "Largest Image Pixel Value",
  &[UnsignedShort, SignedShort],
);
pub const WINDOW_CENTER: Item =
  item(0x0028, 0x1050, "Window Center", &[DecimalString]);
pub const WINDOW_WIDTH: Item =
  item(0x0028, 0x1051, "Window Width", &[DecimalString]);
pub const RESCALE_INTERCEPT: Item =
  item(0x0028, 0x1052, "Rescale Intercept", &[DecimalString]);
pub const RESCALE_SLOPE: Item =
  item(0x0028, 0x1053, "Rescale Slope", &[DecimalString]);

pub const REQUEST_ATTRIBUTES_SEQUENCE: Item =
  item(0x0040, 0x0275, "Request Attributes Sequence", &[Sequence]);

pub const PIXEL_DATA: Item = item(
  0x7FE0,
  0x0010,
  "Pixel Data",
  &[OtherByteString, OtherWordString],
);

pub const DATA_SET_TRAILING_PADDING: Item =
  item(0xFFFC, 0xFFFC, "Data Set Trailing Padding", &[OtherByteString]);
pub const ITEM: Item = item(0xFFFE, 0xE000, "Item", &[]);
pub const ITEM_DELIMITATION_ITEM: Item =
  item(0xFFFE, 0xE00D, "Item Delimitation Item", &[]);
pub const SEQUENCE_DELIMITATION_ITEM: Item =
  item(0xFFFE, 0xE0DD, "Sequence Delimitation Item", &[]);

/// All dictionary entries, sorted by tag so that lookups can binary search.
///
static TABLE: [&Item; 62] = [
  &FILE_META_INFORMATION_GROUP_LENGTH,
  &FILE_META_INFORMATION_VERSION,
  &MEDIA_STORAGE_SOP_CLASS_UID,
  &MEDIA_STORAGE_SOP_INSTANCE_UID,
  &TRANSFER_SYNTAX_UID,
  &IMPLEMENTATION_CLASS_UID,
  &IMPLEMENTATION_VERSION_NAME,
  &SPECIFIC_CHARACTER_SET,
  &IMAGE_TYPE,
  &INSTANCE_CREATOR_UID,
  &SOP_CLASS_UID,
  &SOP_INSTANCE_UID,
  &STUDY_DATE,
  &SERIES_DATE,
  &ACQUISITION_DATE,
  &STUDY_TIME,
  &ACCESSION_NUMBER,
  &MODALITY,
  &MANUFACTURER,
  &INSTITUTION_NAME,
  &REFERRING_PHYSICIAN_NAME,
  &STUDY_DESCRIPTION,
  &SERIES_DESCRIPTION,
  &REFERENCED_IMAGE_SEQUENCE,
  &DERIVATION_CODE_SEQUENCE,
  &PATIENT_NAME,
  &PATIENT_ID,
  &PATIENT_BIRTH_DATE,
  &PATIENT_SEX,
  &PATIENT_AGE,
  &BODY_PART_EXAMINED,
  &SLICE_THICKNESS,
  &PATIENT_POSITION,
  &STUDY_INSTANCE_UID,
  &SERIES_INSTANCE_UID,
  &STUDY_ID,
  &SERIES_NUMBER,
  &INSTANCE_NUMBER,
  &IMAGE_POSITION_PATIENT,
  &IMAGE_ORIENTATION_PATIENT,
  &FRAME_OF_REFERENCE_UID,
  &SAMPLES_PER_PIXEL,
  &PHOTOMETRIC_INTERPRETATION,
  &NUMBER_OF_FRAMES,
  &ROWS,
  &COLUMNS,
  &BITS_ALLOCATED,
  &BITS_STORED,
  &HIGH_BIT,
  &PIXEL_REPRESENTATION,
  &SMALLEST_IMAGE_PIXEL_VALUE,
  &LARGEST_IMAGE_PIXEL_VALUE,
  &WINDOW_CENTER,
  &WINDOW_WIDTH,
  &RESCALE_INTERCEPT,
  &RESCALE_SLOPE,
  &REQUEST_ATTRIBUTES_SEQUENCE,
  &PIXEL_DATA,
  &DATA_SET_TRAILING_PADDING,
  &ITEM,
  &ITEM_DELIMITATION_ITEM,
  &SEQUENCE_DELIMITATION_ITEM,
];

/// Looks up the dictionary entry for a tag.
///
#[allow(clippy::result_unit_err)]
pub fn find(tag: DataElementTag) -> Result<&'static Item, ()> {
  TABLE
    .binary_search_by(|entry| entry.tag.cmp(&tag))
    .map(|index| TABLE[index])
    .map_err(|_| ())
}

/// Returns the name of a tag, or `"Unknown"` for tags not in the dictionary.
///
pub fn tag_name(tag: DataElementTag) -> &'static str {
  match find(tag) {
    Ok(entry) => entry.name,
    Err(()) => "Unknown",
  }
}

/// Formats a tag together with its name, e.g. `"(0008,0020) Study Date"`.
///
pub fn tag_with_name(tag: DataElementTag) -> String {
  format!("{} {}", tag, tag_name(tag))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn table_is_sorted_test() {
    for window in TABLE.windows(2) {
      assert!(
        window[0].tag < window[1].tag,
        "Dictionary entries out of order at {}",
        window[1].tag
      );
    }
  }

  #[test]
  fn find_test() {
    assert_eq!(
      find(DataElementTag::new(0x0010, 0x0010)),
      Ok(&PATIENT_NAME)
    );

    assert!(find(DataElementTag::new(0x0009, 0x0001)).is_err());
  }

  #[test]
  fn tag_with_name_test() {
    assert_eq!(
      tag_with_name(DataElementTag::new(0x0008, 0x0020)),
      "(0008,0020) Study Date"
    );

    assert_eq!(
      tag_with_name(DataElementTag::new(0x0009, 0x0001)),
      "(0009,0001) Unknown"
    );
  }
}
