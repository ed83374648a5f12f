//! Credential fixtures shared by the integration tests
//!
//! Every fixture is generated at test time and written into a temporary
//! directory, so no key material is checked into the repository.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::provider::Provider;
use openssl::rsa::Rsa;
use openssl::symm::Cipher;
use openssl::x509::{X509NameBuilder, X509};
use tempfile::TempDir;

pub const PASSWORD: &str = "password";

/// A generated identity plus every on-disk encoding the loaders accept
pub struct CredentialSet {
    pub dir: TempDir,
    pub rsa: Rsa<Private>,
    pub key: PKey<Private>,
    pub cert: X509,
}

impl CredentialSet {
    pub fn generate(common_name: &str) -> Self {
        let rsa = Rsa::generate(2048).unwrap();
        let key = PKey::from_rsa(rsa.clone()).unwrap();
        let cert = self_signed(&key, common_name, 1);

        Self {
            dir: TempDir::new().unwrap(),
            rsa,
            key,
            cert,
        }
    }

    pub fn leaf_der(&self) -> Vec<u8> {
        self.cert.to_der().unwrap()
    }

    fn write(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn p12_bytes(&self, password: &str) -> Vec<u8> {
        let mut builder = Pkcs12::builder();
        builder.name("nova-apns-test");
        builder.pkey(&self.key);
        builder.cert(&self.cert);
        builder.build2(password).unwrap().to_der().unwrap()
    }

    /// Archive in the `openssl pkcs12 -legacy` layout: RC2-40 certificate bag,
    /// 3DES key bag
    pub fn p12_legacy_file(&self, password: &str) -> PathBuf {
        static LEGACY: OnceLock<Provider> = OnceLock::new();
        LEGACY.get_or_init(|| Provider::try_load(None, "legacy", true).unwrap());

        let mut builder = Pkcs12::builder();
        builder.name("nova-apns-legacy");
        builder.pkey(&self.key);
        builder.cert(&self.cert);
        builder.cert_algorithm(Nid::PBE_WITHSHA1AND40BITRC2_CBC);
        builder.key_algorithm(Nid::PBE_WITHSHA1AND3_KEY_TRIPLEDES_CBC);
        let der = builder.build2(password).unwrap().to_der().unwrap();
        self.write("certificate-legacy.p12", &der)
    }

    pub fn p12_file(&self, password: &str) -> PathBuf {
        let name = if password.is_empty() {
            "certificate-valid.p12"
        } else {
            "certificate-valid-encrypted.p12"
        };
        self.write(name, &self.p12_bytes(password))
    }

    /// Certificate followed by a PKCS#1 `RSA PRIVATE KEY` block
    pub fn pem_bytes(&self) -> Vec<u8> {
        let mut out = self.cert.to_pem().unwrap();
        out.extend(self.rsa.private_key_to_pem().unwrap());
        out
    }

    /// Certificate followed by a PKCS#8 `PRIVATE KEY` block
    pub fn pem_pkcs8_bytes(&self) -> Vec<u8> {
        let mut out = self.cert.to_pem().unwrap();
        out.extend(self.key.private_key_to_pem_pkcs8().unwrap());
        out
    }

    /// Certificate followed by a legacy `Proc-Type: 4,ENCRYPTED` key block
    pub fn pem_encrypted_bytes(&self, password: &str) -> Vec<u8> {
        let mut out = self.cert.to_pem().unwrap();
        out.extend(
            self.rsa
                .private_key_to_pem_passphrase(Cipher::aes_256_cbc(), password.as_bytes())
                .unwrap(),
        );
        out
    }

    /// Certificate followed by an `ENCRYPTED PRIVATE KEY` block
    pub fn pem_encrypted_pkcs8_bytes(&self, password: &str) -> Vec<u8> {
        let mut out = self.cert.to_pem().unwrap();
        out.extend(
            self.key
                .private_key_to_pem_pkcs8_passphrase(Cipher::aes_256_cbc(), password.as_bytes())
                .unwrap(),
        );
        out
    }

    pub fn pem_file(&self) -> PathBuf {
        self.write("certificate-valid.pem", &self.pem_bytes())
    }

    pub fn pem_encrypted_file(&self, password: &str) -> PathBuf {
        self.write(
            "certificate-valid-encrypted.pem",
            &self.pem_encrypted_bytes(password),
        )
    }

    pub fn pem_key_only_file(&self) -> PathBuf {
        self.write("key-only.pem", &self.rsa.private_key_to_pem().unwrap())
    }

    pub fn pem_cert_only_file(&self) -> PathBuf {
        self.write("cert-only.pem", &self.cert.to_pem().unwrap())
    }

    pub fn garbage_file(&self, name: &str) -> PathBuf {
        self.write(name, b"this is not key material\n")
    }

    pub fn missing_file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

pub fn self_signed(key: &PKey<Private>, common_name: &str, serial: u32) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", common_name).unwrap();
    let name = name.build();

    let serial = BigNum::from_u32(serial).unwrap().to_asn1_integer().unwrap();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(365).unwrap())
        .unwrap();
    builder.sign(key, MessageDigest::sha256()).unwrap();
    builder.build()
}

/// Route library logs to the test harness output
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("nova_apns_client=debug")
        .with_test_writer()
        .try_init();
}
