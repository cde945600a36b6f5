//! Streaming parsing and transformation of DICOM data.
//!
//! Raw DICOM bytes are parsed into a stream of [`DicomPart`]s by a
//! [`ParseContext`] without ever materializing the whole object, so
//! arbitrarily large data sets can be inspected and rewritten with bounded
//! memory. Part transforms compose behind the parser to modify, validate,
//! filter, and collect data elements as they stream past, and every
//! wire-derived part carries its exact on-the-wire bytes so that an
//! untransformed stream reproduces its input byte for byte.

pub mod error;
pub mod flow;
pub mod parse;
pub mod part;
pub mod tag_path_tracker;
pub mod transforms;
pub mod uids;

mod internal;

#[cfg(test)]
mod test_support;

pub use error::StreamError;
pub use flow::{
  read_all_parts, read_parts_from_stream, PartTransform, Pipeline,
};
pub use internal::value_length::UNDEFINED_LENGTH;
pub use parse::{ParseConfig, ParseContext};
pub use part::{CollectedElement, DicomPart, HeaderPart};
pub use tag_path_tracker::TagPathTracker;
pub use transforms::collect::CollectTransform;
pub use transforms::filter::FilterTransform;
pub use transforms::modify::{
  ModifyConfig, ModifyTransform, TagModification,
};
pub use transforms::undefined_lengths::UndefinedLengthsTransform;
pub use transforms::validate::{ValidateTransform, ValidationContext};
