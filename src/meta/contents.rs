use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};

use crate::error::{MetadataError, MetadataResult};
use crate::io::xml::{Element, FromXml};
use crate::meta::enums::{decode_any, MeasurementType, SeparationTechnique};
use crate::meta::versioned::read_version;
use crate::params::{FieldMap, FieldReader};

/// The acquisition manifest in `Contents.xml`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Contents {
    version: u32,
    pub acquired_time: Option<DateTime<FixedOffset>>,
    pub acq_status: Option<i64>,
    pub instrument_name: Option<String>,
    pub locked_mode: Option<bool>,
    pub measurement_type: Option<MeasurementType>,
    pub separation_technique: Option<SeparationTechnique>,
    /// Every other top-level scalar, keyed by its snake_case name
    pub fields: FieldMap,
}

impl Contents {
    pub fn version(&self) -> u32 {
        self.version
    }
}

/// Parse an acquisition timestamp. Timestamps without an offset are taken to be UTC.
pub(crate) fn parse_timestamp(raw: &str) -> MetadataResult<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt);
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|_| MetadataError::malformed("AcquiredTime", raw, "an ISO 8601 timestamp"))?;
    let utc = FixedOffset::east_opt(0)
        .ok_or_else(|| MetadataError::malformed("AcquiredTime", raw, "an ISO 8601 timestamp"))?;
    Ok(utc.from_utc_datetime(&naive))
}

impl FromXml for Contents {
    fn from_xml(element: &Element) -> MetadataResult<Self> {
        let version = read_version(element)?;
        let mut fields = FieldReader::new(element);
        fields.skip("version");
        let acquired_time = match fields.text("acquired_time") {
            Some(raw) if !raw.is_empty() => Some(parse_timestamp(raw)?),
            _ => None,
        };
        Ok(Self {
            version,
            acquired_time,
            acq_status: fields.int("acq_status")?,
            instrument_name: fields.string("instrument_name"),
            locked_mode: fields.bool("locked_mode")?,
            measurement_type: fields.enumeration("measurement_type", decode_any)?,
            separation_technique: fields.enumeration("separation_technique", decode_any)?,
            fields: fields.finish(),
        })
    }
}
