//! Metadata extraction for Agilent MassHunter `.d` datafile directories, [`extract_metadata`].
//!
//! A `.d` directory keeps its acquisition metadata as a fixed set of XML documents under
//! `AcqData/`. All eight are read and parsed into one [`AgilentMetadata`]; a missing or
//! malformed document fails the whole extraction.
//!
//! ```no_run
//! use mzdata_agilent::io::agilent::extract_metadata;
//!
//! # fn main() -> Result<(), mzdata_agilent::MetadataError> {
//! let metadata = extract_metadata("./test/data/QC1.d")?;
//! println!("{:?}", metadata.sample_info().sample_name());
//! for device in metadata.devices().iter() {
//!     println!("{} {}", device.device_id, device.device_type);
//! }
//! #    Ok(())
//! # }
//! ```
mod metadata;

pub use metadata::{
    extract_metadata, is_datafile, AgilentMetadata, MetadataEntry, MetadataFile, ACQ_DATA_DIR,
};
