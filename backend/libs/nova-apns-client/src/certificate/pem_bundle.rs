use std::ffi::c_int;
use std::path::Path;

use ::pem::Pem;
use openssl::ec::EcKey;
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::pkcs5;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::symm::{self, Cipher};
use tracing::{debug, warn};

use super::{read_file, Certificate, ERR_LIB_PKCS12};
use crate::error::{CertificateError, Material};

const CERTIFICATE_TAG: &str = "CERTIFICATE";
const PRIVATE_KEY_TAG_SUFFIX: &str = "PRIVATE KEY";
const ENCRYPTED_PKCS8_TAG: &str = "ENCRYPTED PRIVATE KEY";

const ERR_LIB_EVP: c_int = 6;
const EVP_R_BAD_DECRYPT: c_int = 100;

/// Load a certificate from a PEM file
pub fn from_pem_file(path: impl AsRef<Path>, password: &str) -> Result<Certificate, CertificateError> {
    let bytes = read_file(path.as_ref())?;
    from_pem_bytes(&bytes, password)
}

/// Load a certificate from PEM data
///
/// Certificate blocks form the chain in file order, so the leaf has to come first.
/// The last private key block wins; it may be PKCS#1, SEC1 or PKCS#8, and
/// either legacy encrypted (`Proc-Type: 4,ENCRYPTED`) or an encrypted PKCS#8 block.
pub fn from_pem_bytes(bytes: &[u8], password: &str) -> Result<Certificate, CertificateError> {
    let blocks = ::pem::parse_many(bytes).map_err(|e| CertificateError::parse(Material::Pem, e))?;

    let mut chain = Vec::new();
    let mut private_key = None;

    for block in &blocks {
        let tag = block.tag();
        if tag == CERTIFICATE_TAG {
            chain.push(block.contents().to_vec());
        } else if tag.ends_with(PRIVATE_KEY_TAG_SUFFIX) {
            let key = decode_private_key(block, password)?;
            if private_key.replace(key).is_some() {
                warn!(tag = %tag, "Replacing earlier private key block in PEM data");
            }
        }
    }

    if chain.is_empty() {
        return Err(CertificateError::NoCertificate);
    }
    let private_key = private_key.ok_or(CertificateError::NoPrivateKey)?;

    let certificate = Certificate::new(chain, private_key)?;

    debug!(
        certificate_id = %certificate.id(),
        chain_len = certificate.chain().len(),
        "Loaded certificate from PEM data"
    );

    Ok(certificate)
}

fn decode_private_key(block: &Pem, password: &str) -> Result<PKey<Private>, CertificateError> {
    if block.tag() == ENCRYPTED_PKCS8_TAG {
        return PKey::private_key_from_pkcs8_passphrase(block.contents(), password.as_bytes())
            .map_err(classify_pkcs8_error);
    }

    if is_legacy_encrypted(block) {
        let der = decrypt_legacy_block(block, password)?;
        // CBC padding is the only integrity check, so a wrong password can
        // still yield "plaintext" that is not a key.
        return parse_private_key(&der).map_err(|_| CertificateError::Decryption);
    }

    parse_private_key(block.contents())
}

/// Decryption runs inside the PKCS12 library; a malformed outer structure only
/// raises ASN1 errors
fn classify_pkcs8_error(errors: ErrorStack) -> CertificateError {
    let decryption_failed = errors.errors().iter().any(|e| {
        e.library_code() == ERR_LIB_PKCS12
            || (e.library_code() == ERR_LIB_EVP && e.reason_code() == EVP_R_BAD_DECRYPT)
            || e.reason() == Some("bad decrypt")
    });

    if decryption_failed {
        CertificateError::Decryption
    } else {
        CertificateError::parse(Material::PrivateKey, errors)
    }
}

fn is_legacy_encrypted(block: &Pem) -> bool {
    block
        .headers()
        .get("Proc-Type")
        .is_some_and(|value| value.contains("ENCRYPTED"))
}

/// Traditional encodings (PKCS#1 RSA, SEC1 EC) first, then PKCS#8
fn parse_private_key(der: &[u8]) -> Result<PKey<Private>, CertificateError> {
    if let Ok(rsa) = Rsa::private_key_from_der(der) {
        return PKey::from_rsa(rsa).map_err(|e| CertificateError::parse(Material::PrivateKey, e));
    }

    if let Ok(ec) = EcKey::private_key_from_der(der) {
        return PKey::from_ec_key(ec).map_err(|e| CertificateError::parse(Material::PrivateKey, e));
    }

    PKey::private_key_from_pkcs8(der).map_err(|e| CertificateError::parse(Material::PrivateKey, e))
}

/// Decrypt a `DEK-Info` protected block (OpenSSL's `EVP_BytesToKey` with MD5, one round)
fn decrypt_legacy_block(block: &Pem, password: &str) -> Result<Vec<u8>, CertificateError> {
    let dek_info = block.headers().get("DEK-Info").ok_or_else(|| {
        CertificateError::parse(Material::PrivateKey, "encrypted block has no DEK-Info header")
    })?;

    let (algorithm, iv_hex) = dek_info.split_once(',').ok_or_else(|| {
        CertificateError::parse(
            Material::PrivateKey,
            format!("malformed DEK-Info header {dek_info:?}"),
        )
    })?;

    let cipher = legacy_cipher(algorithm.trim())?;

    let iv = hex::decode(iv_hex.trim()).map_err(|e| {
        CertificateError::parse(Material::PrivateKey, format!("malformed DEK-Info IV: {e}"))
    })?;
    if iv.len() < 8 || Some(iv.len()) != cipher.iv_len() {
        return Err(CertificateError::parse(
            Material::PrivateKey,
            format!("DEK-Info IV has wrong length {}", iv.len()),
        ));
    }

    let derived = pkcs5::bytes_to_key(
        cipher,
        MessageDigest::md5(),
        password.as_bytes(),
        Some(&iv[..8]),
        1,
    )
    .map_err(|e| CertificateError::parse(Material::PrivateKey, e))?;

    symm::decrypt(cipher, &derived.key, Some(&iv), block.contents())
        .map_err(|_| CertificateError::Decryption)
}

fn legacy_cipher(name: &str) -> Result<Cipher, CertificateError> {
    match name {
        "DES-CBC" => Ok(Cipher::des_cbc()),
        "DES-EDE3-CBC" => Ok(Cipher::des_ede3_cbc()),
        "AES-128-CBC" => Ok(Cipher::aes_128_cbc()),
        "AES-192-CBC" => Ok(Cipher::aes_192_cbc()),
        "AES-256-CBC" => Ok(Cipher::aes_256_cbc()),
        other => Err(CertificateError::parse(
            Material::PrivateKey,
            format!("unsupported DEK-Info cipher {other}"),
        )),
    }
}
