//! UIDs of the storage SOP classes commonly used in validation contexts.
//! Transfer syntax UIDs live with their descriptors in
//! [`dcmflow_core::transfer_syntax`].

pub const COMPUTED_RADIOGRAPHY_IMAGE_STORAGE: &str =
  "1.2.840.10008.5.1.4.1.1.1";

pub const CT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2";

pub const MR_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.4";

pub const ULTRASOUND_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.6.1";

pub const SECONDARY_CAPTURE_IMAGE_STORAGE: &str =
  "1.2.840.10008.5.1.4.1.1.7";

pub const DIGITAL_X_RAY_IMAGE_STORAGE_FOR_PRESENTATION: &str =
  "1.2.840.10008.5.1.4.1.1.1.1";

pub const ENHANCED_CT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2.1";

pub const ENHANCED_MR_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.4.1";
