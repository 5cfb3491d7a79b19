use crate::error::{MetadataError, MetadataResult};
use crate::io::xml::{Element, FromXml};
use crate::meta::acquisition::Range;
use crate::meta::versioned::VersionedList;
use crate::params::{FieldMap, FieldReader};

/// A span of the run acquired with one set of MS settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeSegment {
    pub number: i64,
    /// Minutes
    pub start_time: f64,
    /// Minutes
    pub end_time: f64,
    pub num_of_scans: Option<i64>,
    pub fixed_cycle_length: Option<i64>,
    pub extra: FieldMap,
}

impl TimeSegment {
    pub fn time_range(&self) -> Range {
        Range::new(self.start_time, self.end_time)
    }
}

impl FromXml for TimeSegment {
    fn from_xml(element: &Element) -> MetadataResult<Self> {
        let mut fields = FieldReader::new(element);
        let number = match fields.attribute_or_text("Number", "time_segment_id") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| MetadataError::malformed("TimeSegment/Number", raw, "an integer"))?,
            None => fields.require_int("number")?,
        };
        let start_time = fields.require_float("start_time")?;
        let end_time = fields.require_float("end_time")?;
        if start_time.is_nan() || end_time.is_nan() || end_time < start_time {
            return Err(MetadataError::malformed(
                "TimeSegment",
                format!("{start_time}-{end_time}"),
                "a segment ending after it starts",
            ));
        }
        Ok(Self {
            number,
            start_time,
            end_time,
            num_of_scans: fields.int("num_of_scans")?,
            fixed_cycle_length: fields.int("fixed_cycle_length")?,
            extra: fields.finish(),
        })
    }
}

/// The MS time segments in `MSTS.xml`
pub type MSTimeSegments = VersionedList<TimeSegment>;

impl FromXml for MSTimeSegments {
    fn from_xml(element: &Element) -> MetadataResult<Self> {
        let mut segments = Self::from_xml_root(element)?;
        segments.extend_from_element::<TimeSegment>(element, "TimeSegment")?;
        Ok(segments)
    }
}

impl MSTimeSegments {
    pub fn segment(&self, number: i64) -> Option<&TimeSegment> {
        self.iter().find(|s| s.number == number)
    }

    pub fn total_scans(&self) -> i64 {
        self.iter().filter_map(|s| s.num_of_scans).sum()
    }

    /// The time span covered by all segments, or `None` if there are no segments
    pub fn acquired_time_range(&self) -> Option<Range> {
        self.iter()
            .map(|s| s.time_range())
            .reduce(|acc, r| acc.span(&r))
    }
}
