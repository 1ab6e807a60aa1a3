//! Certificates with optional private keys.

use std::{fmt, fs};
use std::path::Path;
use bytes::Bytes;
use log::debug;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use crate::error::Error;
use crate::key::KeyMaterialSource;
use crate::subject::Subject;


//------------ Cert ----------------------------------------------------------

/// A certificate and, possibly, its private key.
///
/// A CA certificate needs its key to sign anything. A certificate without
/// a key is still useful for inspecting a CA’s configuration.
#[derive(Clone)]
pub struct Cert {
    x509: X509,
    key: Option<PKey<Private>>,
}

impl Cert {
    /// Creates a new value from a certificate and an optional key.
    ///
    /// If a key is given, its public part must match the certificate’s
    /// public key.
    pub fn new(x509: X509, key: Option<PKey<Private>>) -> Result<Self, Error> {
        if let Some(ref key) = key {
            if !x509.public_key()?.public_eq(&**key) {
                return Err(Error::config(
                    "private key does not match certificate"
                ))
            }
        }
        Ok(Cert { x509, key })
    }

    /// Creates a new value from PEM encoded certificate and key.
    pub fn from_pem(cert: &[u8], key: Option<&[u8]>) -> Result<Self, Error> {
        let key = match key {
            Some(key) => Some(PKey::private_key_from_pem(key)?),
            None => None
        };
        Self::new(X509::from_pem(cert)?, key)
    }

    /// Loads certificate and key from a resolved source.
    ///
    /// All files are read completely and closed before returning.
    pub fn load(source: &KeyMaterialSource) -> Result<Self, Error> {
        match *source {
            KeyMaterialSource::PlainKey {
                ref cert, ref key, ref password
            } => {
                let x509 = read_cert(cert)?;
                let key = read_key(key, password.as_deref())?;
                Self::new(x509, Some(key))
            }
            KeyMaterialSource::Pkcs12 { ref path, ref password } => {
                let data = read_file(path)?;
                let parsed = Pkcs12::from_der(&data)?.parse2(
                    password.as_deref().unwrap_or("")
                )?;
                let x509 = parsed.cert.ok_or_else(|| {
                    Error::config(format!(
                        "{}: PKCS#12 bundle contains no certificate",
                        path.display()
                    ))
                })?;
                Self::new(x509, parsed.pkey)
            }
            KeyMaterialSource::Engine {
                ref cert, ref engine, ref key_name
            } => {
                let x509 = read_cert(cert)?;
                let key = engine.load_private_key(key_name).map_err(|err| {
                    Error::config(format!(
                        "engine failed to load key '{}': {}", key_name, err
                    ))
                })?;
                debug!("Loaded key '{}' from engine", key_name);
                Self::new(x509, Some(key))
            }
            KeyMaterialSource::CertOnly { ref cert } => {
                Self::new(read_cert(cert)?, None)
            }
        }
    }

    pub fn x509(&self) -> &X509 {
        &self.x509
    }

    pub fn key(&self) -> Option<&PKey<Private>> {
        self.key.as_ref()
    }

    pub fn has_private_key(&self) -> bool {
        self.key.is_some()
    }

    /// Returns the certificate’s subject.
    pub fn subject(&self) -> Result<Subject, Error> {
        Subject::from_x509_name(self.x509.subject_name())
    }

    pub fn to_pem(&self) -> Result<Bytes, Error> {
        Ok(self.x509.to_pem()?.into())
    }

    pub fn to_der(&self) -> Result<Bytes, Error> {
        Ok(self.x509.to_der()?.into())
    }

    /// Returns the PKCS#8 PEM encoding of the private key, if present.
    ///
    /// Keys held by a hardware engine usually cannot be exported.
    pub fn key_to_pem(&self) -> Result<Option<Bytes>, Error> {
        match self.key {
            Some(ref key) => {
                Ok(Some(key.private_key_to_pem_pkcs8()?.into()))
            }
            None => Ok(None)
        }
    }
}


//--- PartialEq and Eq

impl PartialEq for Cert {
    fn eq(&self, other: &Self) -> bool {
        self.has_private_key() == other.has_private_key()
            && self.x509.to_der().ok() == other.x509.to_der().ok()
    }
}

impl Eq for Cert { }


//--- Debug

impl fmt::Debug for Cert {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Cert")
            .field("subject", &self.x509.subject_name())
            .field("has_private_key", &self.has_private_key())
            .finish()
    }
}


//------------ Helper Functions ----------------------------------------------

/// Reads all certificates from a file.
///
/// The file can hold any number of PEM encoded certificates or a single
/// DER encoded one.
pub fn read_certs(path: &Path) -> Result<Vec<X509>, Error> {
    let data = read_file(path)?;
    if is_pem(&data) {
        Ok(X509::stack_from_pem(&data)?)
    }
    else {
        Ok(vec![X509::from_der(&data)?])
    }
}

fn read_cert(path: &Path) -> Result<X509, Error> {
    let data = read_file(path)?;
    if is_pem(&data) {
        Ok(X509::from_pem(&data)?)
    }
    else {
        Ok(X509::from_der(&data)?)
    }
}

fn read_key(
    path: &Path, password: Option<&str>
) -> Result<PKey<Private>, Error> {
    let data = read_file(path)?;
    let res = match (is_pem(&data), password) {
        (true, Some(password)) => {
            PKey::private_key_from_pem_passphrase(&data, password.as_bytes())
        }
        (true, None) => PKey::private_key_from_pem(&data),
        (false, Some(password)) => {
            PKey::private_key_from_pkcs8_passphrase(&data, password.as_bytes())
        }
        (false, None) => PKey::private_key_from_der(&data),
    };
    res.map_err(Into::into)
}

fn read_file(path: &Path) -> Result<Vec<u8>, Error> {
    debug!("Reading {}", path.display());
    fs::read(path).map_err(|err| Error::io(path, err))
}

fn is_pem(data: &[u8]) -> bool {
    let start = data.iter().position(|ch| !ch.is_ascii_whitespace());
    match start {
        Some(start) => data[start..].starts_with(b"-----BEGIN"),
        None => false
    }
}


//------------ Tests ---------------------------------------------------------

#[cfg(test)]
mod test {
    use std::path::PathBuf;
    use std::sync::Arc;
    use crate::key::test::TestEngine;
    use super::*;

    const TEST_CA_CERT: &[u8] = include_bytes!("../test-data/test_ca.cer");
    const TEST_CA_KEY: &[u8] = include_bytes!("../test-data/test_ca.key");
    const OCSP_KEY: &[u8] = include_bytes!("../test-data/ocsp_signer.key");

    fn test_data(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("test-data").join(name)
    }

    #[test]
    fn from_pem_with_key() {
        let cert = Cert::from_pem(TEST_CA_CERT, Some(TEST_CA_KEY)).unwrap();
        assert!(cert.has_private_key());
        assert_eq!(
            cert.subject().unwrap().get("CN"), Some("Example Test CA")
        );
        let key = PKey::private_key_from_pem(TEST_CA_KEY).unwrap();
        assert_eq!(
            cert.key_to_pem().unwrap().unwrap().as_ref(),
            key.private_key_to_pem_pkcs8().unwrap().as_slice()
        );
    }

    #[test]
    fn without_key() {
        let cert = Cert::from_pem(TEST_CA_CERT, None).unwrap();
        assert!(!cert.has_private_key());
        assert!(cert.key_to_pem().unwrap().is_none());
        assert_ne!(
            cert, Cert::from_pem(TEST_CA_CERT, Some(TEST_CA_KEY)).unwrap()
        );
        assert_eq!(cert, Cert::from_pem(TEST_CA_CERT, None).unwrap());
    }

    #[test]
    fn rejects_mismatched_key() {
        let err = Cert::from_pem(TEST_CA_CERT, Some(OCSP_KEY)).unwrap_err();
        assert_eq!(err.to_string(), "private key does not match certificate");
    }

    #[test]
    fn load_plain_key() {
        let cert = Cert::load(&KeyMaterialSource::PlainKey {
            cert: test_data("test_ca.cer"),
            key: test_data("test_ca.key"),
            password: None,
        }).unwrap();
        assert_eq!(
            cert, Cert::from_pem(TEST_CA_CERT, Some(TEST_CA_KEY)).unwrap()
        );
    }

    #[test]
    fn load_encrypted_key() {
        let source = KeyMaterialSource::PlainKey {
            cert: test_data("test_ca.cer"),
            key: test_data("test_ca_password.key"),
            password: Some("whatever".into()),
        };
        assert!(Cert::load(&source).unwrap().has_private_key());
        let source = KeyMaterialSource::PlainKey {
            cert: test_data("test_ca.cer"),
            key: test_data("test_ca_password.key"),
            password: Some("wrong".into()),
        };
        assert!(matches!(Cert::load(&source), Err(Error::Crypto(_))));
    }

    #[test]
    fn load_pkcs12() {
        let cert = Cert::load(&KeyMaterialSource::Pkcs12 {
            path: test_data("test_ca.p12"),
            password: Some("whatever".into()),
        }).unwrap();
        assert_eq!(
            cert, Cert::from_pem(TEST_CA_CERT, Some(TEST_CA_KEY)).unwrap()
        );
    }

    #[test]
    fn load_engine_key() {
        let engine = TestEngine::default().with_key("ca", TEST_CA_KEY);
        let source = KeyMaterialSource::Engine {
            cert: test_data("test_ca.cer"),
            engine: Arc::new(engine),
            key_name: "ca".into(),
        };
        assert!(Cert::load(&source).unwrap().has_private_key());

        let source = KeyMaterialSource::Engine {
            cert: test_data("test_ca.cer"),
            engine: Arc::new(TestEngine::default()),
            key_name: "ca".into(),
        };
        assert_eq!(
            Cert::load(&source).unwrap_err().to_string(),
            "engine failed to load key 'ca': no such key"
        );
    }

    #[test]
    fn load_missing_file() {
        let path = test_data("no_such_file.cer");
        match Cert::load(&KeyMaterialSource::CertOnly { cert: path.clone() }) {
            Err(Error::Io { path: err_path, .. }) => {
                assert_eq!(err_path, path)
            }
            other => panic!("unexpected {:?}", other)
        }
    }

    #[test]
    fn read_pem_bundle() {
        let certs = read_certs(&test_data("ocsp_chain.pem")).unwrap();
        assert_eq!(certs.len(), 2);
        let der = X509::from_pem(TEST_CA_CERT).unwrap().to_der().unwrap();
        let path = std::env::temp_dir().join("caconfig-read-der-test.cer");
        fs::write(&path, &der).unwrap();
        let certs = read_certs(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].to_der().unwrap(), der);
    }
}
