//! Canonical certificate bundle and the loaders for the two credential containers
//!
//! - PKCS#12 archives (`.p12` / `.pfx`), see [`from_p12_bytes`] / [`from_p12_file`]
//! - PEM bundles holding certificate blocks and one (optionally encrypted) private key,
//!   see [`from_pem_bytes`] / [`from_pem_file`]
//!
//! Every loader either returns a fully usable [`Certificate`] or a [`CertificateError`].
//! Passwords are plain strings; an empty string means "no password".

mod pem_bundle;
mod pkcs12;

pub use pem_bundle::{from_pem_bytes, from_pem_file};
pub use pkcs12::{from_p12_bytes, from_p12_file};

use std::ffi::c_int;
use std::fmt;
use std::fs;
use std::path::Path;

use openssl::error::ErrorStack;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use sha2::{Digest, Sha256};

use crate::error::{CertificateError, Material};

/// Identity of a certificate, derived from the raw bytes of its leaf
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CertificateId([u8; 32]);

impl CertificateId {
    /// SHA-256 of the DER encoded leaf certificate
    pub fn of_leaf(leaf_der: &[u8]) -> Self {
        Self(Sha256::digest(leaf_der).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CertificateId({})", &hex::encode(self.0)[..16])
    }
}

/// A certificate chain (leaf first) together with the private key of the leaf
///
/// Cloning is cheap: the key is reference counted by OpenSSL and the chain is
/// a handful of DER blobs.
#[derive(Clone)]
pub struct Certificate {
    chain: Vec<Vec<u8>>,
    private_key: PKey<Private>,
    id: CertificateId,
}

impl Certificate {
    /// Assemble a certificate from a DER chain and a private key
    ///
    /// The leaf must be valid X.509 and its public key must belong to `private_key`.
    pub fn new(chain: Vec<Vec<u8>>, private_key: PKey<Private>) -> Result<Self, CertificateError> {
        let leaf = chain.first().ok_or(CertificateError::NoCertificate)?;

        let leaf_x509 =
            X509::from_der(leaf).map_err(|e| CertificateError::parse(Material::Certificate, e))?;
        let public_key = leaf_x509
            .public_key()
            .map_err(|e| CertificateError::parse(Material::Certificate, e))?;

        if !public_key.public_eq(&*private_key) {
            return Err(CertificateError::parse(
                Material::Certificate,
                "private key does not match the leaf certificate",
            ));
        }

        let id = CertificateId::of_leaf(leaf);

        Ok(Self {
            chain,
            private_key,
            id,
        })
    }

    /// Load a certificate from disk, choosing the container format by file extension
    pub fn from_file(path: impl AsRef<Path>, password: &str) -> Result<Self, CertificateError> {
        let path = path.as_ref();
        match CertificateFormat::from_path(path) {
            CertificateFormat::Pkcs12 => from_p12_file(path, password),
            CertificateFormat::Pem => from_pem_file(path, password),
        }
    }

    /// DER encoded certificates, leaf first
    pub fn chain(&self) -> &[Vec<u8>] {
        &self.chain
    }

    /// DER encoded leaf certificate
    pub fn leaf(&self) -> &[u8] {
        // `new` rejects empty chains
        &self.chain[0]
    }

    pub fn private_key(&self) -> &PKey<Private> {
        &self.private_key
    }

    pub fn id(&self) -> CertificateId {
        self.id
    }

    /// PEM encoded chain and PKCS#8 PEM encoded key, as TLS stacks expect them
    pub fn to_pem_identity(&self) -> Result<(Vec<u8>, Vec<u8>), ErrorStack> {
        let mut chain_pem = Vec::new();
        for der in &self.chain {
            chain_pem.extend_from_slice(&X509::from_der(der)?.to_pem()?);
        }
        let key_pem = self.private_key.private_key_to_pem_pkcs8()?;

        Ok((chain_pem, key_pem))
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("id", &self.id)
            .field("chain_len", &self.chain.len())
            .finish_non_exhaustive()
    }
}

/// Credential container formats understood by the loaders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateFormat {
    Pkcs12,
    Pem,
}

impl CertificateFormat {
    /// `.p12` and `.pfx` files are archives, anything else is treated as PEM
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("p12") || ext.eq_ignore_ascii_case("pfx") => {
                CertificateFormat::Pkcs12
            }
            _ => CertificateFormat::Pem,
        }
    }
}

/// OpenSSL library code shared by PKCS#12 parsing and PKCS#8 decryption
const ERR_LIB_PKCS12: c_int = 35;

fn read_file(path: &Path) -> Result<Vec<u8>, CertificateError> {
    fs::read(path).map_err(|source| CertificateError::Io {
        path: path.to_path_buf(),
        source,
    })
}
