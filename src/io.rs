pub mod agilent;
pub mod xml;

pub use crate::io::agilent::{extract_metadata, is_datafile, AgilentMetadata, MetadataEntry, MetadataFile};
pub use crate::io::xml::{Element, FromXml, LeafKind};
