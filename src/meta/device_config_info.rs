use crate::error::MetadataResult;
use crate::io::xml::{Element, FromXml};
use crate::meta::versioned::VersionedList;
use crate::params::{FieldMap, FieldReader, Value};

/// One configuration setting of a device
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameter {
    /// The `DeviceID` of the device in `Devices.xml` this setting belongs to
    pub device_id: Option<String>,
    pub display_name: String,
    pub resource_id: Option<String>,
    pub value: Option<Value>,
    pub units: Option<String>,
    pub category: Option<String>,
    pub extra: FieldMap,
}

impl FromXml for Parameter {
    fn from_xml(element: &Element) -> MetadataResult<Self> {
        let mut fields = FieldReader::new(element);
        let device_id = fields
            .attribute_or_text("DeviceID", "device_id")
            .map(String::from);
        Ok(Self {
            device_id,
            display_name: fields.require_text("display_name")?.to_string(),
            resource_id: fields.string("resource_id"),
            value: fields.value("value"),
            units: fields.string("units"),
            category: fields.string("category"),
            extra: fields.finish(),
        })
    }
}

/// The device configuration settings in `DeviceConfigInfo.xml`
pub type DeviceConfigInfo = VersionedList<Parameter>;

impl FromXml for DeviceConfigInfo {
    fn from_xml(element: &Element) -> MetadataResult<Self> {
        let mut parameters = Self::from_xml_root(element)?;
        parameters.extend_from_element::<Parameter>(element, "Parameter")?;
        Ok(parameters)
    }
}

impl DeviceConfigInfo {
    /// Find a setting by its display name or resource identifier
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.iter()
            .find(|p| p.display_name == name || p.resource_id.as_deref() == Some(name))
    }

    pub fn for_device<'a>(&'a self, device_id: &'a str) -> impl Iterator<Item = &'a Parameter> + 'a {
        self.iter()
            .filter(move |p| p.device_id.as_deref() == Some(device_id))
    }
}
