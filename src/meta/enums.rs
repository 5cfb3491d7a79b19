//! Closed vendor code tables and the single entry point, [`resolve`], for turning a raw code into one.
//!
//! The integer codes follow the values used by Agilent's MassHunter data access layer. Most
//! documents write the member name instead, so every table accepts both spellings.
use std::fmt::Display;

use bitflags::bitflags;

use crate::error::{MetadataError, MetadataResult};

/// A raw code as read from a document, after a decoder has decided how to interpret it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EnumCode {
    Int(i64),
    Text(String),
}

/// A closed enumeration with integer codes and member names
pub trait CodedEnum: Sized + Copy + PartialEq + 'static {
    /// The enumeration's name, used in error messages
    const ENUMERATION: &'static str;

    fn members() -> &'static [Self];

    fn code(&self) -> i64;

    fn name(&self) -> &'static str;

    fn from_code(code: &EnumCode) -> Option<Self> {
        match code {
            EnumCode::Int(i) => Self::members().iter().copied().find(|m| m.code() == *i),
            EnumCode::Text(s) => Self::members().iter().copied().find(|m| m.name() == s),
        }
    }
}

/// Either a member that has already been resolved, or the raw text to resolve
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnumInput<'a, E> {
    Member(E),
    Raw(&'a str),
}

/// Read raw text as an integer code
pub fn decode_int(raw: &str) -> Option<EnumCode> {
    raw.trim().parse().ok().map(EnumCode::Int)
}

/// Read raw text as a member name
pub fn decode_text(raw: &str) -> Option<EnumCode> {
    Some(EnumCode::Text(raw.trim().to_string()))
}

/// Read raw text as an integer code when it is numeric, and as a member name otherwise
pub fn decode_any(raw: &str) -> Option<EnumCode> {
    decode_int(raw).or_else(|| decode_text(raw))
}

/**
Resolve `input` to a member of `E`.

A [`EnumInput::Member`] is returned unchanged. Raw text is passed through `decoder` and
looked up in `E`; a code with no member is an [`MetadataError::UnknownEnumCode`], never a
default member.
*/
pub fn resolve<E, D>(input: EnumInput<'_, E>, decoder: D) -> MetadataResult<E>
where
    E: CodedEnum,
    D: Fn(&str) -> Option<EnumCode>,
{
    match input {
        EnumInput::Member(member) => Ok(member),
        EnumInput::Raw(raw) => decoder(raw)
            .and_then(|code| E::from_code(&code))
            .ok_or_else(|| MetadataError::UnknownEnumCode {
                enumeration: E::ENUMERATION,
                value: raw.to_string(),
            }),
    }
}

/// Declare a fieldless enum with explicit integer codes and implement [`CodedEnum`],
/// [`Display`] and [`FromStr`](std::str::FromStr) for it.
#[macro_export]
macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis enum $name {
            $($(#[$vmeta])* $variant = $code),+
        }

        impl $crate::meta::enums::CodedEnum for $name {
            const ENUMERATION: &'static str = stringify!($name);

            fn members() -> &'static [Self] {
                &[$(Self::$variant),+]
            }

            fn code(&self) -> i64 {
                *self as i64
            }

            fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::meta::enums::CodedEnum::name(self))
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::MetadataError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $crate::meta::enums::resolve(
                    $crate::meta::enums::EnumInput::Raw(s),
                    $crate::meta::enums::decode_any,
                )
            }
        }
    };
}

coded_enum! {
    /// The kind of module a device record describes
    pub enum DeviceType {
        Unknown = 0,
        Mixed = 1,
        Quadrupole = 2,
        IonTrap = 3,
        TimeOfFlight = 4,
        TandemQuadrupole = 5,
        QTOF = 6,
        FlameIonizationDetector = 10,
        ThermalConductivityDetector = 11,
        RefractiveIndexDetector = 12,
        MultiWavelengthDetector = 13,
        ElectronCaptureDetector = 14,
        VariableWavelengthDetector = 15,
        AnalogDigitalConverter = 16,
        EvaporativeLightScatteringDetector = 17,
        GCDetector = 18,
        FluorescenceDetector = 19,
        ALS = 20,
        WellPlateSampler = 21,
        MicroWellPlateSampler = 22,
        DiodeArrayDetector = 23,
        CANValves = 30,
        QuaternaryPump = 31,
        ChipCube = 32,
        Nanopump = 33,
        ThermostattedColumnCompartment = 40,
        CE = 41,
        CapillaryPump = 42,
        IsocraticPump = 50,
        BinaryPump = 51,
    }
}

impl DeviceType {
    pub fn is_mass_spectrometer(&self) -> bool {
        matches!(
            self,
            Self::Quadrupole
                | Self::IonTrap
                | Self::TimeOfFlight
                | Self::TandemQuadrupole
                | Self::QTOF
        )
    }
}

coded_enum! {
    pub enum IonizationMode {
        Unspecified = 0,
        Mixed = 1,
        EI = 2,
        CI = 4,
        Maldi = 8,
        Appi = 16,
        Apci = 32,
        Esi = 64,
        NanoEsi = 128,
        MsChip = 512,
        ICP = 1024,
        JetStream = 2048,
    }
}

coded_enum! {
    pub enum MSLevel {
        All = 0,
        MS = 1,
        MSMS = 2,
    }
}

coded_enum! {
    pub enum MSScanType {
        Unspecified = 0,
        Scan = 1,
        SelectedIon = 2,
        HighResolutionScan = 4,
        TotalIon = 8,
        AllMS = 15,
        MultipleReaction = 256,
        ProductIon = 512,
        PrecursorIon = 1024,
        NeutralLoss = 2048,
        NeutralGain = 4096,
        AllMSN = 7936,
        All = 7951,
    }
}

coded_enum! {
    /// How spectra were written to disk
    pub enum MSStorageMode {
        Unspecified = 0,
        Mixed = 1,
        ProfileSpectrum = 2,
        PeakDetectedSpectrum = 3,
    }
}

coded_enum! {
    pub enum MeasurementType {
        Unspecified = 0,
        Sample = 1,
        Blank = 2,
        DoubleBlank = 3,
        Calibration = 4,
        QualityControl = 5,
        Matrix = 6,
    }
}

coded_enum! {
    pub enum SeparationTechnique {
        Unspecified = 0,
        None = 1,
        GC = 2,
        LC = 3,
        CE = 4,
        DirectInfusion = 5,
        FlowInjectionAnalysis = 6,
    }
}

coded_enum! {
    /// The functional form of one mass calibration step
    pub enum CalibrationTechnique {
        Undefined = 0,
        Traditional = 1,
        Polynomial = 2,
    }
}

bitflags! {
    /// The kinds of data a device stores in the datafile
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct StoredDataType: u32 {
        const CHROMATOGRAMS = 1;
        const INSTRUMENT_CURVES = 2;
        const SPECTRA = 4;
        const MASS_SPECTRA = 8;
    }
}

impl StoredDataType {
    /// Parse either the integer bit pattern or a `,`/`|` separated list of flag names
    pub fn from_code(raw: &str) -> MetadataResult<Self> {
        let unknown = || MetadataError::UnknownEnumCode {
            enumeration: "StoredDataType",
            value: raw.to_string(),
        };
        let raw_trimmed = raw.trim();
        if let Ok(bits) = raw_trimmed.parse::<u32>() {
            return Self::from_bits(bits).ok_or_else(unknown);
        }
        let mut flags = Self::empty();
        for name in raw_trimmed.split([',', '|']).map(str::trim) {
            flags |= match name {
                "" | "None" => Self::empty(),
                "All" => Self::all(),
                "Chromatograms" => Self::CHROMATOGRAMS,
                "InstrumentCurves" => Self::INSTRUMENT_CURVES,
                "Spectra" => Self::SPECTRA,
                "MassSpectra" => Self::MASS_SPECTRA,
                _ => return Err(unknown()),
            };
        }
        Ok(flags)
    }
}

impl Display for StoredDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        bitflags::parser::to_writer(self, f)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_resolve() -> MetadataResult<()> {
        let qtof: DeviceType = resolve(EnumInput::Raw("6"), decode_int)?;
        assert_eq!(qtof, DeviceType::QTOF);
        assert_eq!(resolve::<DeviceType, _>(EnumInput::Raw("QTOF"), decode_text)?, qtof);
        assert_eq!(resolve::<DeviceType, _>(EnumInput::Raw(" 6 "), decode_any)?, qtof);
        assert_eq!(resolve(EnumInput::Member(qtof), decode_int)?, qtof);
        assert!(qtof.is_mass_spectrometer());
        assert_eq!(qtof.to_string(), "QTOF");
        assert_eq!("GCDetector".parse::<DeviceType>()?, DeviceType::GCDetector);
        Ok(())
    }

    #[test]
    fn test_resolve_idempotent() -> MetadataResult<()> {
        for raw in ["0", "2", "64", "Esi", "JetStream"] {
            let once: IonizationMode = resolve(EnumInput::Raw(raw), decode_any)?;
            let twice = resolve(EnumInput::Member(once), decode_any)?;
            assert_eq!(once, twice);
        }
        Ok(())
    }

    #[test]
    fn test_unknown_code() {
        for raw in ["99", "Orbitrap", ""] {
            let err = resolve::<DeviceType, _>(EnumInput::Raw(raw), decode_any).unwrap_err();
            match err {
                MetadataError::UnknownEnumCode { enumeration, value } => {
                    assert_eq!(enumeration, "DeviceType");
                    assert_eq!(value, raw);
                }
                other => panic!("Unexpected error {other}"),
            }
        }
        // The integer decoder never falls back to names
        assert!(resolve::<MSLevel, _>(EnumInput::Raw("MS"), decode_int).is_err());
    }

    #[test]
    fn test_members() {
        for member in MSScanType::members() {
            assert_eq!(MSScanType::from_code(&EnumCode::Int(member.code())), Some(*member));
            assert_eq!(
                MSScanType::from_code(&EnumCode::Text(member.name().to_string())),
                Some(*member)
            );
        }
        assert_eq!(SeparationTechnique::None.code(), 1);
    }

    #[test]
    fn test_stored_data_type() -> MetadataResult<()> {
        assert_eq!(StoredDataType::from_code("3")?, StoredDataType::CHROMATOGRAMS | StoredDataType::INSTRUMENT_CURVES);
        assert_eq!(StoredDataType::from_code("Spectra, MassSpectra")?, StoredDataType::SPECTRA | StoredDataType::MASS_SPECTRA);
        assert_eq!(StoredDataType::from_code("All")?, StoredDataType::all());
        assert_eq!(StoredDataType::from_code("0")?, StoredDataType::empty());
        assert!(StoredDataType::from_code("32").is_err());
        assert!(StoredDataType::from_code("Bogus").is_err());
        Ok(())
    }
}
