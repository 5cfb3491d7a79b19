use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{MetadataError, MetadataResult};
use crate::io::xml::FromXml;
use crate::meta::{
    AcqMethod, ActualsDef, CalibrationList, Contents, Device, DeviceConfigInfo, DeviceList,
    MSTimeSegments, Parameter, SampleInfo,
};

/// The sub-directory of a datafile holding the metadata documents
pub const ACQ_DATA_DIR: &str = "AcqData";

/// The metadata documents of a datafile, in the order they are read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataFile {
    AcqMethod,
    Contents,
    DefaultMassCal,
    DeviceConfigInfo,
    Devices,
    MSActualDefs,
    MSTS,
    SampleInfo,
}

impl MetadataFile {
    pub const ALL: [MetadataFile; 8] = [
        Self::AcqMethod,
        Self::Contents,
        Self::DefaultMassCal,
        Self::DeviceConfigInfo,
        Self::Devices,
        Self::MSActualDefs,
        Self::MSTS,
        Self::SampleInfo,
    ];

    /// The logical name this document is keyed by
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AcqMethod => "AcqMethod",
            Self::Contents => "Contents",
            Self::DefaultMassCal => "DefaultMassCal",
            Self::DeviceConfigInfo => "DeviceConfigInfo",
            Self::Devices => "Devices",
            Self::MSActualDefs => "MSActualDefs",
            Self::MSTS => "MSTS",
            Self::SampleInfo => "sample_info",
        }
    }

    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::AcqMethod => "AcqMethod.xml",
            Self::Contents => "Contents.xml",
            Self::DefaultMassCal => "DefaultMassCal.xml",
            Self::DeviceConfigInfo => "DeviceConfigInfo.xml",
            Self::Devices => "Devices.xml",
            Self::MSActualDefs => "MSActualDefs.xml",
            Self::MSTS => "MSTS.xml",
            Self::SampleInfo => "sample_info.xml",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl Display for MetadataFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A borrowed view of one parsed document, as returned by [`AgilentMetadata::get`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetadataEntry<'a> {
    AcqMethod(&'a AcqMethod),
    Contents(&'a Contents),
    DefaultMassCal(&'a CalibrationList),
    DeviceConfigInfo(&'a DeviceConfigInfo),
    Devices(&'a DeviceList),
    MSActualDefs(&'a ActualsDef),
    MSTS(&'a MSTimeSegments),
    SampleInfo(&'a SampleInfo),
}

impl<'a> MetadataEntry<'a> {
    pub fn file(&self) -> MetadataFile {
        match self {
            Self::AcqMethod(_) => MetadataFile::AcqMethod,
            Self::Contents(_) => MetadataFile::Contents,
            Self::DefaultMassCal(_) => MetadataFile::DefaultMassCal,
            Self::DeviceConfigInfo(_) => MetadataFile::DeviceConfigInfo,
            Self::Devices(_) => MetadataFile::Devices,
            Self::MSActualDefs(_) => MetadataFile::MSActualDefs,
            Self::MSTS(_) => MetadataFile::MSTS,
            Self::SampleInfo(_) => MetadataFile::SampleInfo,
        }
    }

    /// The schema version of the underlying document
    pub fn version(&self) -> u32 {
        match self {
            Self::AcqMethod(m) => m.version(),
            Self::Contents(c) => c.version(),
            Self::DefaultMassCal(c) => c.version(),
            Self::DeviceConfigInfo(c) => c.version(),
            Self::Devices(d) => d.version(),
            Self::MSActualDefs(a) => a.version(),
            Self::MSTS(t) => t.version(),
            Self::SampleInfo(s) => s.version(),
        }
    }
}

/**
All of the metadata of one datafile, one parsed value per [`MetadataFile`].

Built only by [`extract_metadata`] and read-only afterwards.
*/
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgilentMetadata {
    #[cfg_attr(feature = "serde", serde(rename = "AcqMethod"))]
    acq_method: AcqMethod,
    #[cfg_attr(feature = "serde", serde(rename = "Contents"))]
    contents: Contents,
    #[cfg_attr(feature = "serde", serde(rename = "DefaultMassCal"))]
    default_mass_cal: CalibrationList,
    #[cfg_attr(feature = "serde", serde(rename = "DeviceConfigInfo"))]
    device_config_info: DeviceConfigInfo,
    #[cfg_attr(feature = "serde", serde(rename = "Devices"))]
    devices: DeviceList,
    #[cfg_attr(feature = "serde", serde(rename = "MSActualDefs"))]
    ms_actual_defs: ActualsDef,
    #[cfg_attr(feature = "serde", serde(rename = "MSTS"))]
    ms_time_segments: MSTimeSegments,
    sample_info: SampleInfo,
}

impl AgilentMetadata {
    pub fn acq_method(&self) -> &AcqMethod {
        &self.acq_method
    }

    pub fn contents(&self) -> &Contents {
        &self.contents
    }

    pub fn default_mass_cal(&self) -> &CalibrationList {
        &self.default_mass_cal
    }

    pub fn device_config_info(&self) -> &DeviceConfigInfo {
        &self.device_config_info
    }

    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    pub fn ms_actual_defs(&self) -> &ActualsDef {
        &self.ms_actual_defs
    }

    pub fn ms_time_segments(&self) -> &MSTimeSegments {
        &self.ms_time_segments
    }

    pub fn sample_info(&self) -> &SampleInfo {
        &self.sample_info
    }

    pub fn entry(&self, file: MetadataFile) -> MetadataEntry<'_> {
        match file {
            MetadataFile::AcqMethod => MetadataEntry::AcqMethod(&self.acq_method),
            MetadataFile::Contents => MetadataEntry::Contents(&self.contents),
            MetadataFile::DefaultMassCal => MetadataEntry::DefaultMassCal(&self.default_mass_cal),
            MetadataFile::DeviceConfigInfo => MetadataEntry::DeviceConfigInfo(&self.device_config_info),
            MetadataFile::Devices => MetadataEntry::Devices(&self.devices),
            MetadataFile::MSActualDefs => MetadataEntry::MSActualDefs(&self.ms_actual_defs),
            MetadataFile::MSTS => MetadataEntry::MSTS(&self.ms_time_segments),
            MetadataFile::SampleInfo => MetadataEntry::SampleInfo(&self.sample_info),
        }
    }

    /// Look up a document by its logical name, e.g. `"AcqMethod"` or `"sample_info"`
    pub fn get(&self, name: &str) -> Option<MetadataEntry<'_>> {
        MetadataFile::from_name(name).map(|f| self.entry(f))
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> {
        MetadataFile::ALL.into_iter().map(|f| f.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, MetadataEntry<'_>)> + '_ {
        MetadataFile::ALL
            .into_iter()
            .map(move |f| (f.name(), self.entry(f)))
    }

    /// The entry in `Devices.xml` a configuration parameter refers to
    pub fn device_for_parameter(&self, parameter: &Parameter) -> Option<&Device> {
        parameter
            .device_id
            .as_deref()
            .and_then(|id| self.devices.by_id(id))
    }
}

/// Test if `path` looks like an Agilent datafile: an existing directory with a `.d` extension
pub fn is_datafile<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    if !path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("d"))
        .unwrap_or_default()
    {
        return false;
    }
    path.is_dir()
}

fn validate_path(path: &Path) -> MetadataResult<()> {
    let text = path.to_string_lossy();
    if text.is_empty() || text.contains('\0') {
        return Err(MetadataError::InvalidPath(text.into_owned()));
    }
    if !is_datafile(path) {
        return Err(MetadataError::NotADatafile(path.to_path_buf()));
    }
    Ok(())
}

/// The files directly inside the metadata directory. A missing directory lists as empty so
/// that the first expected document is reported as missing.
fn list_metadata_dir(dir: &Path) -> MetadataResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(MetadataError::IOError {
                path: dir.to_path_buf(),
                source: e,
            })
        }
    };
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| MetadataError::IOError {
            path: dir.to_path_buf(),
            source: e,
        })?;
        files.push(entry.path());
    }
    Ok(files)
}

fn locate(dir: &Path, listing: &[PathBuf], file: MetadataFile) -> MetadataResult<PathBuf> {
    listing
        .iter()
        .find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.eq_ignore_ascii_case(file.file_name()))
                .unwrap_or_default()
        })
        .cloned()
        .ok_or_else(|| MetadataError::MissingFile {
            name: file.name(),
            path: dir.join(file.file_name()),
        })
}

fn parse_document<T: FromXml>(dir: &Path, listing: &[PathBuf], file: MetadataFile) -> MetadataResult<T> {
    let path = locate(dir, listing, file)?;
    debug!("Reading {file} from {}", path.display());
    T::from_xml_file(&path)
}

/**
Read and parse every metadata document of the datafile at `path`.

The path is checked before anything is opened: an empty path is an
[`InvalidPath`](MetadataError::InvalidPath) error, and anything other than an existing
`.d` directory is a [`NotADatafile`](MetadataError::NotADatafile) error. Documents are
found in `AcqData/` regardless of the case of their file names. The first missing
or malformed document aborts the extraction.
*/
pub fn extract_metadata<P: AsRef<Path>>(path: P) -> MetadataResult<AgilentMetadata> {
    let path = path.as_ref();
    validate_path(path)?;
    let dir = path.join(ACQ_DATA_DIR);
    let listing = list_metadata_dir(&dir)?;
    debug!("Found {} files in {}", listing.len(), dir.display());

    let metadata = AgilentMetadata {
        acq_method: parse_document(&dir, &listing, MetadataFile::AcqMethod)?,
        contents: parse_document(&dir, &listing, MetadataFile::Contents)?,
        default_mass_cal: parse_document(&dir, &listing, MetadataFile::DefaultMassCal)?,
        device_config_info: parse_document(&dir, &listing, MetadataFile::DeviceConfigInfo)?,
        devices: parse_document(&dir, &listing, MetadataFile::Devices)?,
        ms_actual_defs: parse_document(&dir, &listing, MetadataFile::MSActualDefs)?,
        ms_time_segments: parse_document(&dir, &listing, MetadataFile::MSTS)?,
        sample_info: parse_document(&dir, &listing, MetadataFile::SampleInfo)?,
    };
    debug!("Extracted metadata from {}", path.display());
    Ok(metadata)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::meta::{DeviceType, ScanPolarity};

    const FIXTURE: &str = "./test/data/QC1.d";

    /// Copy the fixture into a fresh `.d` directory, leaving out `skip` and renaming files with `rename`
    fn copy_fixture(
        root: &Path,
        skip: Option<&str>,
        rename: impl Fn(&str) -> String,
    ) -> io::Result<PathBuf> {
        let target = root.join("Copy.d");
        let acq = target.join(ACQ_DATA_DIR);
        fs::create_dir_all(&acq)?;
        for entry in fs::read_dir(Path::new(FIXTURE).join(ACQ_DATA_DIR))? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if Some(name.as_str()) == skip {
                continue;
            }
            fs::copy(entry.path(), acq.join(rename(&name)))?;
        }
        Ok(target)
    }

    #[test_log::test]
    fn test_extract_metadata() -> MetadataResult<()> {
        assert!(is_datafile(FIXTURE));
        let metadata = extract_metadata(FIXTURE)?;

        assert_eq!(
            metadata.keys().collect::<Vec<_>>(),
            [
                "AcqMethod",
                "Contents",
                "DefaultMassCal",
                "DeviceConfigInfo",
                "Devices",
                "MSActualDefs",
                "MSTS",
                "sample_info"
            ]
        );
        assert_eq!(metadata.iter().count(), 8);
        for (name, entry) in metadata.iter() {
            assert_eq!(entry.file().name(), name);
        }

        assert_eq!(metadata.contents().instrument_name.as_deref(), Some("GCQTOF"));
        assert_eq!(metadata.sample_info().sample_name().as_deref(), Some("QC1"));
        assert_eq!(metadata.ms_time_segments().total_scans(), 1333);
        assert_eq!(metadata.default_mass_cal().len(), 2);
        assert_eq!(metadata.ms_actual_defs().len(), 2);

        let segment = metadata.acq_method().scan_segments().next().unwrap();
        assert_eq!(segment.polarity, ScanPolarity::Positive);

        let model = metadata.device_config_info().get("Instrument Model").unwrap();
        let device = metadata.device_for_parameter(model).unwrap();
        assert_eq!(device.device_type, DeviceType::QTOF);

        match metadata.get("Contents") {
            Some(MetadataEntry::Contents(c)) => assert_eq!(c.version(), 3),
            other => panic!("Expected Contents, got {other:?}"),
        }
        assert_eq!(metadata.get("AcqMethod").map(|e| e.version()), Some(2));
        assert!(metadata.get("acq_method").is_none());
        Ok(())
    }

    #[test_log::test]
    fn test_missing_device_config() -> io::Result<()> {
        let tmp = tempfile::tempdir()?;
        let datafile = copy_fixture(tmp.path(), Some("DeviceConfigInfo.xml"), str::to_string)?;
        match extract_metadata(&datafile) {
            Err(MetadataError::MissingFile { name, path }) => {
                assert_eq!(name, "DeviceConfigInfo");
                assert!(path.ends_with("AcqData/DeviceConfigInfo.xml"));
            }
            other => panic!("Expected a missing file error, got {other:?}"),
        }
        Ok(())
    }

    #[test_log::test]
    fn test_case_insensitive_names() -> io::Result<()> {
        let tmp = tempfile::tempdir()?;
        let datafile = copy_fixture(tmp.path(), None, |name| name.to_uppercase())?;
        let metadata = extract_metadata(&datafile)?;
        assert_eq!(metadata.devices().len(), 2);
        Ok(())
    }

    #[test_log::test]
    fn test_malformed_document() -> io::Result<()> {
        let tmp = tempfile::tempdir()?;
        let datafile = copy_fixture(tmp.path(), None, str::to_string)?;
        let devices = datafile.join(ACQ_DATA_DIR).join("Devices.xml");
        fs::write(
            &devices,
            "<Devices><Version>1</Version><Device DeviceID=\"1\"><Name>X</Name><Type>Toaster</Type></Device></Devices>",
        )?;
        let err = extract_metadata(&datafile).unwrap_err();
        assert!(matches!(err, MetadataError::InFile { ref path, .. } if path == &devices));
        assert!(matches!(err.root_cause(), MetadataError::UnknownEnumCode { .. }));
        Ok(())
    }

    #[test_log::test]
    fn test_not_a_datafile() -> io::Result<()> {
        let tmp = tempfile::tempdir()?;

        let plain_dir = tmp.path().join("run");
        fs::create_dir(&plain_dir)?;
        assert!(matches!(
            extract_metadata(&plain_dir),
            Err(MetadataError::NotADatafile(_))
        ));

        let file = tmp.path().join("run.d");
        fs::write(&file, "not a directory")?;
        assert!(!is_datafile(&file));
        assert!(matches!(extract_metadata(&file), Err(MetadataError::NotADatafile(_))));

        assert!(matches!(
            extract_metadata(tmp.path().join("absent.d")),
            Err(MetadataError::NotADatafile(_))
        ));
        Ok(())
    }

    #[test]
    fn test_invalid_path() {
        assert!(matches!(extract_metadata(""), Err(MetadataError::InvalidPath(_))));
        assert!(matches!(
            extract_metadata("bad\0name.d"),
            Err(MetadataError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_metadata_file_names() {
        for file in MetadataFile::ALL {
            assert_eq!(MetadataFile::from_name(file.name()), Some(file));
            assert!(file.file_name().ends_with(".xml"));
        }
        assert_eq!(MetadataFile::SampleInfo.to_string(), "sample_info");
    }
}
