use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop the process before any probing happens.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config TOML {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to parse config YAML {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Missing or invalid required configuration keys: {0}")]
    Invalid(String),

    #[error("lang must be one of: ({supported}), got {language:?}")]
    UnsupportedLanguage { language: String, supported: String },

    #[error("no email subject configured for language {0:?}")]
    MissingSubject(String),
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("cannot stat {path:?}: {reason}")]
    Query { path: String, reason: String },

    #[error("inconsistent disk statistics for {path:?}: free {free} or available {available} exceeds total {total}")]
    Inconsistent {
        path: String,
        free: u64,
        available: u64,
        total: u64,
    },
}

#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("total space reported for {0:?} is zero, cannot compute percentages")]
    ZeroTotal(String),
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("no mail template registered for language {0:?}")]
    NotFound(String),

    #[error("malformed template for language {language:?}: {reason}")]
    Malformed { language: String, reason: String },

    #[error("malformed subjects mapping: {0}")]
    Subjects(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid email address '{address}': {source}")]
    Address {
        address: String,
        source: lettre::address::AddressError,
    },

    #[error("Failed to build email message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Everything a single check-and-notify run can fail with.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Composition(#[from] CompositionError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl Error {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 2,
            Error::Template(TemplateError::Malformed { .. } | TemplateError::Subjects(_)) => 2,
            _ => 1,
        }
    }
}
