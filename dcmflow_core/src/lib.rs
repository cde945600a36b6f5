//! Core DICOM types shared by the dcmflow crates: data element tags, value
//! representations, tag paths, the data element dictionary, and transfer
//! syntaxes.

pub mod data_element_tag;
pub mod dictionary;
pub mod error;
pub mod tag_path;
pub mod transfer_syntax;
pub mod utils;
pub mod value_representation;

pub use data_element_tag::DataElementTag;
pub use error::DcmflowError;
pub use tag_path::{ItemIndex, TagPath, TagPathStep};
pub use transfer_syntax::TransferSyntax;
pub use value_representation::ValueRepresentation;
