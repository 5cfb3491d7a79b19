use std::io;
use std::path::PathBuf;

use thiserror::Error;

/**
All the ways that reading Agilent metadata can go wrong.

Input validation errors ([`InvalidPath`](Self::InvalidPath), [`NotADatafile`](Self::NotADatafile))
are raised before any file is opened. Everything else is a malformed-schema condition that
aborts the whole extraction; no variant is ever suppressed to produce partial results.
*/
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("{0:?} is not a usable file system path")]
    InvalidPath(String),
    #[error("{0} is not a recognized Agilent datafile")]
    NotADatafile(PathBuf),
    #[error("The {name} metadata file was not found at {path}")]
    MissingFile { name: &'static str, path: PathBuf },
    #[error("An IO error was encountered reading {path}: {source}")]
    IOError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("An XML error was encountered: {0}")]
    XMLError(#[from] quick_xml::Error),
    #[error("The XML document is malformed: {0}")]
    MalformedDocument(String),
    #[error("Expected a numeric Version, found {0:?}")]
    MalformedVersion(String),
    #[error("Could not read {value:?} in <{tag}> as {expected}")]
    MalformedValue {
        tag: String,
        value: String,
        expected: &'static str,
    },
    #[error("<{parent}> is missing the required element <{name}>")]
    MissingElement { parent: String, name: String },
    #[error("{value:?} is not a member of {enumeration}")]
    UnknownEnumCode {
        enumeration: &'static str,
        value: String,
    },
    #[error("{0:?} is not a recognized polarity code")]
    UnknownPolarity(String),
    #[error("No {kind} with identifier {id:?} is defined")]
    DanglingReference { kind: &'static str, id: String },
    #[error("The {kind} identifier {id:?} is defined more than once")]
    DuplicateIdentifier { kind: &'static str, id: String },
    #[error("Elements are nested more than {0} levels deep")]
    NestingTooDeep(usize),
    #[error("Failed to parse {path}: {source}")]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<MetadataError>,
    },
}

impl MetadataError {
    pub(crate) fn malformed(tag: impl Into<String>, value: impl Into<String>, expected: &'static str) -> Self {
        Self::MalformedValue {
            tag: tag.into(),
            value: value.into(),
            expected,
        }
    }

    pub(crate) fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            Self::InFile { .. } | Self::IOError { .. } | Self::MissingFile { .. } => self,
            _ => Self::InFile {
                path: path.into(),
                source: Box::new(self),
            },
        }
    }

    /// Strip any [`InFile`](Self::InFile) context and return the error that started it all
    pub fn root_cause(&self) -> &MetadataError {
        match self {
            Self::InFile { source, .. } => source.root_cause(),
            _ => self,
        }
    }
}

impl From<MetadataError> for io::Error {
    fn from(value: MetadataError) -> Self {
        match value {
            MetadataError::IOError { ref source, .. } => io::Error::new(source.kind(), value),
            MetadataError::InvalidPath(_) => io::Error::new(io::ErrorKind::InvalidInput, value),
            MetadataError::NotADatafile(_) | MetadataError::MissingFile { .. } => {
                io::Error::new(io::ErrorKind::NotFound, value)
            }
            _ => io::Error::new(io::ErrorKind::InvalidData, value),
        }
    }
}

pub type MetadataResult<T> = Result<T, MetadataError>;
