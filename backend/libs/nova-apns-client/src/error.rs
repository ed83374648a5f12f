//! Error types for certificate loading, client construction and configuration

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which piece of credential material failed to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Material {
    /// PKCS#12 archive structure
    Archive,
    /// PEM block framing or base64 body
    Pem,
    /// X.509 certificate (or certificate/key pairing)
    Certificate,
    /// Private key encoding
    PrivateKey,
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Material::Archive => "PKCS#12 archive",
            Material::Pem => "PEM data",
            Material::Certificate => "certificate",
            Material::PrivateKey => "private key",
        };
        f.write_str(name)
    }
}

/// Certificate loader errors
///
/// Both container formats report through this one enum so callers can tell
/// "wrong password" from "corrupt data" from "missing material".
#[derive(Error, Debug)]
pub enum CertificateError {
    #[error("Failed to read certificate file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decrypt certificate material: password incorrect")]
    Decryption,

    #[error("Failed to parse {material}: {reason}")]
    Parse { material: Material, reason: String },

    #[error("No private key found")]
    NoPrivateKey,

    #[error("No certificate found")]
    NoCertificate,
}

/// Fieldless mirror of [`CertificateError`] for branching and comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateErrorKind {
    Io,
    Decryption,
    Parse,
    NoPrivateKey,
    NoCertificate,
}

impl CertificateError {
    pub(crate) fn parse(material: Material, reason: impl fmt::Display) -> Self {
        CertificateError::Parse {
            material,
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> CertificateErrorKind {
        match self {
            CertificateError::Io { .. } => CertificateErrorKind::Io,
            CertificateError::Decryption => CertificateErrorKind::Decryption,
            CertificateError::Parse { .. } => CertificateErrorKind::Parse,
            CertificateError::NoPrivateKey => CertificateErrorKind::NoPrivateKey,
            CertificateError::NoCertificate => CertificateErrorKind::NoCertificate,
        }
    }
}

/// Errors raised while building the default network client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to encode certificate as TLS identity: {0}")]
    Identity(String),

    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable {var_name} not set: {hint}")]
    MissingEnvVar { var_name: String, hint: String },

    #[error(transparent)]
    Certificate(#[from] CertificateError),
}
