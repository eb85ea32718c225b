use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EepromError {
    #[error("Address out of range: {len} byte(s) at {start} exceed device size {size}")]
    OutOfRange { start: usize, len: usize, size: usize },

    #[error("Write endurance exhausted at address(es) {addresses:?}")]
    EnduranceExhausted { addresses: Vec<usize> },

    #[error("Storage I/O error on {}: {source}", path.display())]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Audit log write failed on {}: {source}{}", path.display(), unaudited_suffix(unaudited))]
    LogWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        /// Failure of the operation whose entry could not be written
        unaudited: Option<Box<EepromError>>,
    },

    #[error("Corrupted backing file {}: {reason}", path.display())]
    Corrupted { path: PathBuf, reason: String },

    #[error("Invalid device configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Configuration serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record codec error: {0}")]
    Codec(#[from] bincode::Error),
}

impl EepromError {
    /// Stable tag recorded in audit outcomes
    pub fn kind(&self) -> &'static str {
        match self {
            EepromError::OutOfRange { .. } => "out_of_range",
            EepromError::EnduranceExhausted { .. } => "endurance_exhausted",
            EepromError::StorageIo { .. } => "storage_io",
            EepromError::LogWrite { .. } => "log_write",
            EepromError::Corrupted { .. } => "corrupted",
            EepromError::InvalidConfig(_) => "invalid_config",
            EepromError::InvalidPayload(_) => "invalid_payload",
            EepromError::ConfigParse(_) => "config_parse",
            EepromError::ConfigSerialize(_) => "config_serialize",
            EepromError::Serialization(_) => "serialization",
            EepromError::Codec(_) => "codec",
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| EepromError::StorageIo { path, source }
    }

    pub(crate) fn log_write(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| EepromError::LogWrite {
            path,
            source,
            unaudited: None,
        }
    }

    /// Attach the operation's own failure to a `LogWrite`
    pub(crate) fn with_unaudited(self, failure: EepromError) -> Self {
        match self {
            EepromError::LogWrite { path, source, .. } => EepromError::LogWrite {
                path,
                source,
                unaudited: Some(Box::new(failure)),
            },
            other => other,
        }
    }
}

fn unaudited_suffix(unaudited: &Option<Box<EepromError>>) -> String {
    match unaudited {
        Some(err) => format!(" (unaudited {} failure: {})", err.kind(), err),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, EepromError>;
