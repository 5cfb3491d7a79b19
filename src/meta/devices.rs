use crate::error::MetadataResult;
use crate::io::xml::{Element, FromXml};
use crate::meta::enums::{decode_any, DeviceType, StoredDataType};
use crate::meta::versioned::VersionedList;
use crate::params::{FieldMap, FieldReader};

/// A module of the instrument stack, as listed in `Devices.xml`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Device {
    pub device_id: String,
    pub name: String,
    pub display_name: Option<String>,
    pub device_type: DeviceType,
    pub ordinal_number: Option<i64>,
    pub serial_number: Option<String>,
    pub model_number: Option<String>,
    pub driver_version: Option<String>,
    pub firmware_version: Option<String>,
    pub stored_data_type: StoredDataType,
    pub delay: Option<f64>,
    pub vendor: Option<i64>,
    pub extra: FieldMap,
}

impl Device {
    pub fn is_mass_spectrometer(&self) -> bool {
        self.device_type.is_mass_spectrometer()
    }
}

impl FromXml for Device {
    fn from_xml(element: &Element) -> MetadataResult<Self> {
        let mut fields = FieldReader::new(element);
        let device_id = match fields.attribute_or_text("DeviceID", "device_id") {
            Some(id) => id.to_string(),
            None => fields.require_text("device_id")?.to_string(),
        };
        let name = fields.require_text("name")?.to_string();
        let device_type = fields.require_enumeration("type", decode_any)?;
        let stored_data_type = match fields.text("stored_data_type") {
            Some(raw) => StoredDataType::from_code(raw)?,
            None => StoredDataType::empty(),
        };
        Ok(Self {
            device_id,
            name,
            display_name: fields.string("display_name"),
            device_type,
            ordinal_number: fields.int("ordinal_number")?,
            serial_number: fields.string("serial_number"),
            model_number: fields.string("model_number"),
            driver_version: fields.string("driver_version"),
            firmware_version: fields.string("firmware_version"),
            stored_data_type,
            delay: fields.float("delay")?,
            vendor: fields.int("vendor")?,
            extra: fields.finish(),
        })
    }
}

/// The modules in `Devices.xml`
pub type DeviceList = VersionedList<Device>;

impl FromXml for DeviceList {
    fn from_xml(element: &Element) -> MetadataResult<Self> {
        let mut devices = Self::from_xml_root(element)?;
        devices.extend_from_element::<Device>(element, "Device")?;
        Ok(devices)
    }
}

impl DeviceList {
    pub fn by_id(&self, device_id: &str) -> Option<&Device> {
        self.iter().find(|d| d.device_id == device_id)
    }

    pub fn of_type(&self, device_type: DeviceType) -> impl Iterator<Item = &Device> {
        self.iter().filter(move |d| d.device_type == device_type)
    }

    /// The first mass spectrometer in the stack
    pub fn mass_spectrometer(&self) -> Option<&Device> {
        self.iter().find(|d| d.is_mass_spectrometer())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::MetadataError;

    #[test]
    fn test_devices() -> MetadataResult<()> {
        let devices = DeviceList::from_xml_file("test/data/QC1.d/AcqData/Devices.xml")?;
        assert_eq!(devices.version(), 1);
        assert_eq!(devices.len(), 2);

        let gc = devices.by_id("1").unwrap();
        assert_eq!(gc.name, "GC");
        assert_eq!(gc.device_type, DeviceType::GCDetector);
        assert_eq!(gc.serial_number.as_deref(), Some("0012345"));
        assert_eq!(
            gc.stored_data_type,
            StoredDataType::CHROMATOGRAMS | StoredDataType::INSTRUMENT_CURVES
        );
        assert!(gc.extra.is_empty());

        let ms = devices.mass_spectrometer().unwrap();
        assert_eq!(ms.device_id, "2");
        assert_eq!(ms.device_type, DeviceType::QTOF);
        assert_eq!(ms.stored_data_type, StoredDataType::all());
        assert_eq!(ms.delay, Some(0.1));
        assert_eq!(devices.of_type(DeviceType::QTOF).count(), 1);
        assert!(devices.by_id("3").is_none());
        Ok(())
    }

    #[test]
    fn test_device_id_from_child() -> MetadataResult<()> {
        let device = Device::from_xml_str(
            "<Device><DeviceID>4</DeviceID><Name>DAD</Name><Type>DiodeArrayDetector</Type><Location>Stack</Location></Device>",
        )?;
        assert_eq!(device.device_id, "4");
        assert_eq!(device.device_type, DeviceType::DiodeArrayDetector);
        assert_eq!(device.extra.keys().collect::<Vec<_>>(), ["location"]);
        Ok(())
    }

    #[test]
    fn test_unknown_device_type() {
        let err = DeviceList::from_xml_str(
            "<Devices><Version>1</Version><Device DeviceID=\"1\"><Name>X</Name><Type>99</Type></Device></Devices>",
        )
        .unwrap_err();
        assert!(matches!(err, MetadataError::UnknownEnumCode { enumeration: "DeviceType", .. }));
    }
}
