use std::ffi::c_int;
use std::path::Path;
use std::sync::OnceLock;

use openssl::error::ErrorStack;
use openssl::pkcs12::Pkcs12;
use openssl::provider::Provider;
use tracing::{debug, warn};

use super::{read_file, Certificate, ERR_LIB_PKCS12};
use crate::error::{CertificateError, Material};

/// Reason code raised by `PKCS12_parse` for a bad password
const PKCS12_R_MAC_VERIFY_FAILURE: c_int = 113;

static LEGACY_PROVIDER: OnceLock<Option<Provider>> = OnceLock::new();

/// Load OpenSSL's legacy provider once, keeping the default provider active
///
/// Keychain exports and `openssl pkcs12 -legacy` protect the certificate bag
/// with RC2-40, which OpenSSL 3 only ships in that provider.
pub(crate) fn load_legacy_provider() -> bool {
    LEGACY_PROVIDER
        .get_or_init(|| match Provider::try_load(None, "legacy", true) {
            Ok(provider) => Some(provider),
            Err(e) => {
                warn!(error = %e, "OpenSSL legacy provider unavailable");
                None
            }
        })
        .is_some()
}

/// Load a certificate from a PKCS#12 file
pub fn from_p12_file(path: impl AsRef<Path>, password: &str) -> Result<Certificate, CertificateError> {
    let bytes = read_file(path.as_ref())?;
    from_p12_bytes(&bytes, password)
}

/// Load a certificate from an in-memory PKCS#12 archive
///
/// An empty password also opens archives that were exported without one.
pub fn from_p12_bytes(bytes: &[u8], password: &str) -> Result<Certificate, CertificateError> {
    load_legacy_provider();

    let archive =
        Pkcs12::from_der(bytes).map_err(|e| CertificateError::parse(Material::Archive, e))?;

    let parsed = archive.parse2(password).map_err(classify_parse_error)?;

    let leaf = parsed.cert.ok_or(CertificateError::NoCertificate)?;
    let private_key = parsed.pkey.ok_or(CertificateError::NoPrivateKey)?;

    let leaf_der = leaf
        .to_der()
        .map_err(|e| CertificateError::parse(Material::Certificate, e))?;

    let certificate = Certificate::new(vec![leaf_der], private_key)?;

    debug!(
        certificate_id = %certificate.id(),
        "Loaded certificate from PKCS#12 archive"
    );

    Ok(certificate)
}

/// A failed MAC check is the only signal OpenSSL gives for a wrong password
fn classify_parse_error(errors: ErrorStack) -> CertificateError {
    let wrong_password = errors.errors().iter().any(|e| {
        (e.library_code() == ERR_LIB_PKCS12 && e.reason_code() == PKCS12_R_MAC_VERIFY_FAILURE)
            || e.reason() == Some("mac verify failure")
    });

    if wrong_password {
        CertificateError::Decryption
    } else {
        CertificateError::parse(Material::Archive, errors)
    }
}
