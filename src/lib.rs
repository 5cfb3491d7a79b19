//! `mzdata-agilent` reads the XML metadata stored inside Agilent MassHunter `.d` datafile
//! directories into typed, versioned records.
//!
//! ```no_run
//! use mzdata_agilent::extract_metadata;
//!
//! # fn main() -> Result<(), mzdata_agilent::MetadataError> {
//! let metadata = extract_metadata("./test/data/QC1.d")?;
//! let contents = metadata.contents();
//! println!("Acquired on {:?} by {:?}", contents.acquired_time, contents.instrument_name);
//! #    Ok(())
//! # }
//! ```
//!
//! Anything that is not a path is rejected when the program is compiled:
//!
//! ```compile_fail
//! let metadata = mzdata_agilent::extract_metadata(1234);
//! ```
pub mod error;
pub mod io;
pub mod meta;
pub mod params;

pub use crate::error::{MetadataError, MetadataResult};
pub use crate::io::agilent::{extract_metadata, is_datafile, AgilentMetadata, MetadataFile};
pub use crate::io::xml::FromXml;
pub use crate::meta::VersionedList;
pub use crate::params::{FieldMap, KeyTransform, Value};
