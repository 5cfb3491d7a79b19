use crate::error::MetadataResult;
use crate::io::xml::{Element, FromXml};
use crate::meta::versioned::VersionedList;
use crate::params::{FieldMap, FieldReader};

/// One user-entered sample attribute
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleInfoField {
    pub name: String,
    pub display_name: Option<String>,
    /// Kept as entered; sample positions and identifiers often have significant leading zeros
    pub value: Option<String>,
    pub data_type: Option<i64>,
    pub units: Option<String>,
    pub field_type: Option<String>,
    pub overridden: Option<bool>,
    pub extra: FieldMap,
}

impl FromXml for SampleInfoField {
    fn from_xml(element: &Element) -> MetadataResult<Self> {
        let mut fields = FieldReader::new(element);
        Ok(Self {
            name: fields.require_text("name")?.to_string(),
            display_name: fields.string("display_name"),
            value: fields.string("value"),
            data_type: fields.int("data_type")?,
            units: fields.string("units"),
            field_type: fields.string("field_type"),
            overridden: fields.bool("overridden")?,
            extra: fields.finish(),
        })
    }
}

/// The sample description in `sample_info.xml`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleInfo {
    pub entries: VersionedList<SampleInfoField>,
    /// Top-level scalars such as `sample_name`
    pub fields: FieldMap,
}

impl FromXml for SampleInfo {
    fn from_xml(element: &Element) -> MetadataResult<Self> {
        let mut entries: VersionedList<SampleInfoField> = VersionedList::from_xml_root(element)?;
        entries.extend_from_element::<SampleInfoField>(element, "Field")?;

        let mut fields = FieldReader::new(element);
        fields.skip("version");
        fields.skip("field");
        Ok(Self {
            entries,
            fields: fields.finish(),
        })
    }
}

impl SampleInfo {
    pub fn version(&self) -> u32 {
        self.entries.version()
    }

    /// Find a field by its name or display name
    pub fn get(&self, name: &str) -> Option<&SampleInfoField> {
        self.entries
            .iter()
            .find(|f| f.name == name || f.display_name.as_deref() == Some(name))
    }

    pub fn sample_name(&self) -> Option<String> {
        match self.fields.get("sample_name") {
            Some(v) if !v.is_empty() => Some(v.as_str().into_owned()),
            _ => self.get("Sample Name").and_then(|f| f.value.clone()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::params::Value;

    #[test]
    fn test_minimal_sample_info() -> MetadataResult<()> {
        let info = SampleInfo::from_xml_str(
            r#"<SampleInfo Version="1"><SampleName>QC1</SampleName></SampleInfo>"#,
        )?;
        assert_eq!(info.version(), 1);
        assert_eq!(info.fields.get("sample_name"), Some(&Value::Text("QC1".into())));
        assert_eq!(info.sample_name().as_deref(), Some("QC1"));
        assert!(info.entries.is_empty());
        Ok(())
    }

    #[test]
    fn test_sample_info_file() -> MetadataResult<()> {
        let info = SampleInfo::from_xml_file("test/data/QC1.d/AcqData/sample_info.xml")?;
        assert_eq!(info.version(), 1);
        assert_eq!(info.entries.len(), 3);
        assert_eq!(info.fields.keys().collect::<Vec<_>>(), ["sample_name"]);

        let vial = info.get("Vial").unwrap();
        assert_eq!(vial.name, "Sample Position");
        assert_eq!(vial.value.as_deref(), Some("0012"));
        assert_eq!(vial.units, None);

        let dilution = info.get("Dilution").unwrap();
        assert_eq!(dilution.overridden, Some(true));
        assert_eq!(dilution.data_type, Some(4));
        Ok(())
    }

    #[test]
    fn test_sample_name_fallback() -> MetadataResult<()> {
        let info = SampleInfo::from_xml_str(
            "<SampleInfo><Version>2</Version>\
             <Field><Name>Sample Name</Name><Value>Blank_03</Value></Field>\
             </SampleInfo>",
        )?;
        assert_eq!(info.version(), 2);
        assert_eq!(info.sample_name().as_deref(), Some("Blank_03"));
        Ok(())
    }
}
