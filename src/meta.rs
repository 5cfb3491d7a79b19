//! Typed records for each of the metadata documents of an Agilent datafile.
#[macro_use]
pub mod enums;
pub mod acquisition;
pub mod versioned;

pub mod acq_method;
pub mod contents;
pub mod default_mass_cal;
pub mod device_config_info;
pub mod devices;
pub mod ms_actual_defs;
pub mod ms_time_segments;
pub mod sample_info;

pub use crate::meta::enums::{
    decode_any, decode_int, decode_text, resolve, CalibrationTechnique, CodedEnum, DeviceType,
    EnumCode, EnumInput, IonizationMode, MSLevel, MSScanType, MSStorageMode, MeasurementType,
    SeparationTechnique, StoredDataType,
};
pub use crate::meta::acquisition::{
    polarity_from_code, range_from_element, ranges_from_element, Range, ScanPolarity,
};
pub use crate::meta::versioned::{read_version, VersionedList};

pub use crate::meta::acq_method::{AcqMethod, MethodDevice, MethodRecord, ScanSegment};
pub use crate::meta::contents::Contents;
pub use crate::meta::default_mass_cal::{Calibration, CalibrationList, CalibrationStep};
pub use crate::meta::device_config_info::{DeviceConfigInfo, Parameter};
pub use crate::meta::devices::{Device, DeviceList};
pub use crate::meta::ms_actual_defs::{ActualDef, ActualsDef};
pub use crate::meta::ms_time_segments::{MSTimeSegments, TimeSegment};
pub use crate::meta::sample_info::{SampleInfo, SampleInfoField};
