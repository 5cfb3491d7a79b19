//! The acquisition method in `AcqMethod.xml`: the devices the method drives and the MS settings
//! for each time segment.
use std::collections::HashMap;

use log::debug;

use crate::error::{MetadataError, MetadataResult};
use crate::io::xml::{Element, FromXml};
use crate::meta::acquisition::{polarity_from_code, ranges_from_element, Range, ScanPolarity};
use crate::meta::enums::{
    decode_any, DeviceType, IonizationMode, MSLevel, MSScanType, MSStorageMode,
};
use crate::meta::versioned::VersionedList;
use crate::params::{FieldMap, FieldReader};

/// A device as it is referenced by the method
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodDevice {
    pub device_id: String,
    pub name: String,
    pub device_type: DeviceType,
    pub ordinal_number: Option<i64>,
    pub extra: FieldMap,
}

impl FromXml for MethodDevice {
    fn from_xml(element: &Element) -> MetadataResult<Self> {
        let mut fields = FieldReader::new(element);
        let device_id = match fields.attribute_or_text("DeviceID", "device_id") {
            Some(id) => id.to_string(),
            None => fields.require_text("device_id")?.to_string(),
        };
        Ok(Self {
            device_id,
            name: fields.require_text("name")?.to_string(),
            device_type: fields.require_enumeration("type", decode_any)?,
            ordinal_number: fields.int("ordinal_number")?,
            extra: fields.finish(),
        })
    }
}

/**
The MS acquisition settings for one time segment.

`device_id` names a [`MethodDevice`] in the same method; use [`AcqMethod::device_for`]
to follow it. Vendor flags whose meaning is undocumented (e.g. `CycleSummed`) are
left in `extra` as they were read.
*/
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanSegment {
    pub time_segment_id: i64,
    pub device_id: Option<String>,
    pub start_time: Option<f64>,
    pub polarity: ScanPolarity,
    pub ionization_mode: Option<IonizationMode>,
    pub ms_level: Option<MSLevel>,
    pub scan_type: Option<MSScanType>,
    pub storage_mode: Option<MSStorageMode>,
    pub acquired_time_ranges: Vec<Range>,
    pub measured_mass_ranges: Vec<Range>,
    pub mz_of_interest: Vec<Range>,
    pub fragmentor_voltage: Option<f64>,
    pub collision_energy: Option<f64>,
    pub threshold: Option<f64>,
    pub abundance_limit: Option<f64>,
    pub sampling_period: Option<f64>,
    pub extra: FieldMap,
}

impl FromXml for ScanSegment {
    fn from_xml(element: &Element) -> MetadataResult<Self> {
        let mut fields = FieldReader::new(element);
        let time_segment_id = match fields.attribute_or_text("Number", "time_segment_id") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| MetadataError::malformed("TimeSegment/TimeSegmentID", raw, "an integer"))?,
            None => fields.require_int("time_segment_id")?,
        };
        let polarity = match fields.text("ion_polarity") {
            Some(code) => polarity_from_code(code)?,
            None => ScanPolarity::Unknown,
        };
        Ok(Self {
            time_segment_id,
            device_id: fields.string("device_id"),
            start_time: fields.float("start_time")?,
            polarity,
            ionization_mode: fields.enumeration("ionization_mode", decode_any)?,
            ms_level: fields.enumeration("ms_level", decode_any)?,
            scan_type: fields.enumeration("scan_type", decode_any)?,
            storage_mode: fields.enumeration("storage_mode", decode_any)?,
            acquired_time_ranges: ranges_from_element(fields.node("acquired_time_ranges"))?,
            measured_mass_ranges: ranges_from_element(fields.node("measured_mass_ranges"))?,
            mz_of_interest: ranges_from_element(fields.node("mz_of_interest"))?,
            fragmentor_voltage: fields.float("fragmentor_voltage")?,
            collision_energy: fields.float("collision_energy")?,
            threshold: fields.float("threshold")?,
            abundance_limit: fields.float("abundance_limit")?,
            sampling_period: fields.float("sampling_period")?,
            extra: fields.finish(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MethodRecord {
    Device(MethodDevice),
    ScanSegment(ScanSegment),
}

impl From<MethodDevice> for MethodRecord {
    fn from(value: MethodDevice) -> Self {
        Self::Device(value)
    }
}

impl From<ScanSegment> for MethodRecord {
    fn from(value: ScanSegment) -> Self {
        Self::ScanSegment(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AcqMethod {
    /// Devices first, then scan segments, each in document order
    pub records: VersionedList<MethodRecord>,
    /// Top-level scalars such as `method_name`
    pub fields: FieldMap,
}

impl FromXml for AcqMethod {
    fn from_xml(element: &Element) -> MetadataResult<Self> {
        let mut records: VersionedList<MethodRecord> = VersionedList::from_xml_root(element)?;
        records
            .extend_from_element::<MethodDevice>(element, "Device")?
            .extend_from_element::<ScanSegment>(element, "TimeSegment")?;

        let mut fields = FieldReader::new(element);
        for key in ["version", "device", "time_segment"] {
            fields.skip(key);
        }
        let fields = fields.finish();

        let device_index = index_devices(&records)?;
        let mut n_segments = 0;
        for record in records.iter() {
            if let MethodRecord::ScanSegment(segment) = record {
                n_segments += 1;
                if let Some(id) = segment.device_id.as_deref() {
                    if !device_index.contains_key(id) {
                        return Err(MetadataError::DanglingReference {
                            kind: "Device",
                            id: id.to_string(),
                        });
                    }
                }
            }
        }
        debug!(
            "Resolved {n_segments} scan segments against {} devices",
            device_index.len()
        );

        Ok(Self { records, fields })
    }
}

/// Map each `DeviceID` to its record position. Identifiers must be unique within a method.
fn index_devices(records: &[MethodRecord]) -> MetadataResult<HashMap<&str, usize>> {
    let mut index = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        if let MethodRecord::Device(device) = record {
            if index.insert(device.device_id.as_str(), i).is_some() {
                return Err(MetadataError::DuplicateIdentifier {
                    kind: "Device",
                    id: device.device_id.clone(),
                });
            }
        }
    }
    Ok(index)
}

impl AcqMethod {
    pub fn version(&self) -> u32 {
        self.records.version()
    }

    pub fn method_name(&self) -> Option<String> {
        self.fields.get("method_name").map(|v| v.as_str().into_owned())
    }

    pub fn devices(&self) -> impl Iterator<Item = &MethodDevice> {
        self.records.iter().filter_map(|r| match r {
            MethodRecord::Device(d) => Some(d),
            MethodRecord::ScanSegment(_) => None,
        })
    }

    pub fn scan_segments(&self) -> impl Iterator<Item = &ScanSegment> {
        self.records.iter().filter_map(|r| match r {
            MethodRecord::ScanSegment(s) => Some(s),
            MethodRecord::Device(_) => None,
        })
    }

    pub fn device(&self, device_id: &str) -> Option<&MethodDevice> {
        self.devices().find(|d| d.device_id == device_id)
    }

    /// The device that acquired `segment`, if it names one
    pub fn device_for(&self, segment: &ScanSegment) -> Option<&MethodDevice> {
        segment.device_id.as_deref().and_then(|id| self.device(id))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::params::Value;

    #[test_log::test]
    fn test_acq_method() -> MetadataResult<()> {
        let method = AcqMethod::from_xml_file("test/data/QC1.d/AcqData/AcqMethod.xml")?;
        assert_eq!(method.version(), 2);
        assert_eq!(method.method_name().as_deref(), Some("GCQTOF_Propellant.m"));
        assert_eq!(method.records.len(), 3);
        assert!(matches!(method.records[0], MethodRecord::Device(_)));
        assert!(matches!(method.records[2], MethodRecord::ScanSegment(_)));

        let devices: Vec<_> = method.devices().collect();
        assert_eq!(devices[0].device_type, DeviceType::GCDetector);
        assert_eq!(devices[1].device_type, DeviceType::QTOF);

        let segment = method.scan_segments().next().unwrap();
        assert_eq!(segment.time_segment_id, 1);
        assert_eq!(segment.polarity, ScanPolarity::Positive);
        assert_eq!(segment.ionization_mode, Some(IonizationMode::EI));
        assert_eq!(segment.ms_level, Some(MSLevel::MS));
        assert_eq!(segment.scan_type, Some(MSScanType::Scan));
        assert_eq!(segment.storage_mode, Some(MSStorageMode::ProfileSpectrum));
        assert_eq!(segment.acquired_time_ranges, [Range::new(0.047, 14.998)]);
        assert_eq!(segment.measured_mass_ranges, [Range::new(40.0, 1000.0)]);
        assert!(segment.mz_of_interest.is_empty());
        assert_eq!(segment.abundance_limit, Some(1.5e7));
        assert_eq!(segment.extra.get("cycle_summed"), Some(&Value::Raw("False".into())));
        assert!(segment.extra.contains_key("mz_regions_excluded"));

        let device = method.device_for(segment).unwrap();
        assert_eq!(device.name, "QTOF");
        assert!(method.device("9").is_none());
        Ok(())
    }

    #[test_log::test]
    fn test_dangling_device() {
        let err = AcqMethod::from_xml_str(
            "<AcqMethod><Version>1</Version>\
             <Device><DeviceID>1</DeviceID><Name>GC</Name><Type>GCDetector</Type></Device>\
             <TimeSegment><TimeSegmentID>1</TimeSegmentID><DeviceID>7</DeviceID></TimeSegment>\
             </AcqMethod>",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MetadataError::DanglingReference { kind: "Device", ref id } if id == "7"
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_round_trip() -> MetadataResult<()> {
        let method = AcqMethod::from_xml_file("test/data/QC1.d/AcqData/AcqMethod.xml")?;
        let json = serde_json::to_value(&method).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert!(object.contains_key("records") && object.contains_key("fields"));
        let restored: AcqMethod = serde_json::from_value(json).unwrap();
        let segment = restored.scan_segments().next().unwrap();
        assert_eq!(restored.device_for(segment).unwrap().name, "QTOF");
        Ok(())
    }

    #[test_log::test]
    fn test_duplicate_device_id() {
        let err = AcqMethod::from_xml_str(
            "<AcqMethod><Version>1</Version>\
             <Device><DeviceID>1</DeviceID><Name>GC</Name><Type>GCDetector</Type></Device>\
             <Device><DeviceID>1</DeviceID><Name>QTOF</Name><Type>QTOF</Type></Device>\
             <TimeSegment><TimeSegmentID>1</TimeSegmentID><DeviceID>1</DeviceID></TimeSegment>\
             </AcqMethod>",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MetadataError::DuplicateIdentifier { kind: "Device", ref id } if id == "1"
        ));
    }

    #[test]
    fn test_polarity_codes_in_segment() -> MetadataResult<()> {
        let segment = ScanSegment::from_xml_str(
            "<TimeSegment><TimeSegmentID>3</TimeSegmentID><IonPolarity>1</IonPolarity>\
             <MzOfInterest><Range><Value>195.08</Value></Range><Range Min=\"300\" Max=\"301\"/></MzOfInterest>\
             </TimeSegment>",
        )?;
        assert_eq!(segment.polarity, ScanPolarity::Negative);
        assert_eq!(segment.device_id, None);
        assert_eq!(segment.mz_of_interest, [Range::point(195.08), Range::new(300.0, 301.0)]);

        let err = ScanSegment::from_xml_str(
            "<TimeSegment><TimeSegmentID>3</TimeSegmentID><IonPolarity>Sideways</IonPolarity></TimeSegment>",
        )
        .unwrap_err();
        assert!(matches!(err, MetadataError::UnknownPolarity(_)));
        Ok(())
    }
}
