//! Where a certificate’s private key comes from.
//!
//! A certificate entry in a configuration document may name a plain key
//! file, a PKCS#12 bundle, or a key held by an engine. Which combinations
//! of fields make sense is decided once, when the entry is resolved into a
//! [`KeyMaterialSource`]. Nothing after that looks at the raw fields again.

use std::{fmt, io};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use openssl::pkey::{PKey, Private};
use serde::Deserialize;
use crate::config::LoadOptions;
use crate::error::Error;


//------------ KeyLoader -----------------------------------------------------

/// A collaborator that holds private keys and hands them out by name.
///
/// This is the capability a hardware or software engine has to provide.
/// The crate only ever asks for a key. Opening, initializing, and shutting
/// down the engine is the caller’s business.
pub trait KeyLoader: fmt::Debug + Send + Sync {
    /// Loads the private key with the given name.
    ///
    /// For hardware engines the returned key is usually a handle; the
    /// public half has to be available so it can be matched against the
    /// certificate.
    fn load_private_key(
        &self, key_name: &str
    ) -> Result<PKey<Private>, io::Error>;
}


//------------ CertEntry -----------------------------------------------------

/// A certificate entry as it appears in a configuration document.
///
/// Paths are relative to the CA root path unless absolute. The `engine`
/// field names a key loader registered with the [`LoadOptions`].
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct CertEntry {
    #[serde(default)]
    pub cert: Option<PathBuf>,

    #[serde(default)]
    pub key: Option<PathBuf>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub pkcs12: Option<PathBuf>,

    #[serde(default)]
    pub engine: Option<String>,

    #[serde(default)]
    pub key_name: Option<String>,
}


//------------ KeyMaterialSource ---------------------------------------------

/// The resolved source of a certificate and its private key.
#[derive(Clone, Debug)]
pub enum KeyMaterialSource {
    /// A certificate file and a key file, possibly password protected.
    PlainKey {
        cert: PathBuf,
        key: PathBuf,
        password: Option<String>,
    },

    /// A PKCS#12 bundle holding both certificate and key.
    Pkcs12 {
        path: PathBuf,
        password: Option<String>,
    },

    /// A certificate file with the key held by an engine.
    Engine {
        cert: PathBuf,
        engine: Arc<dyn KeyLoader>,
        key_name: String,
    },

    /// Only a certificate.
    ///
    /// Such a certificate can be inspected but not used for signing.
    CertOnly {
        cert: PathBuf,
    },
}

impl KeyMaterialSource {
    /// Resolves a certificate entry.
    ///
    /// Conflicting combinations are checked in a fixed order: first those
    /// involving `pkcs12`, then those involving `engine`. Only a
    /// conflict-free entry is turned into a source. Paths are resolved
    /// against the root path of `options`.
    pub fn resolve(
        entry: &CertEntry, options: &LoadOptions
    ) -> Result<Self, Error> {
        if entry.pkcs12.is_some() {
            if entry.engine.is_some() {
                return Err(Error::config(
                    "You can't specify both engine and pkcs12"
                ))
            }
            if entry.key.is_some() {
                return Err(Error::config(
                    "You can't specify both pkcs12 and key"
                ))
            }
            if entry.cert.is_some() {
                return Err(Error::config(
                    "You can't specify both pkcs12 and cert"
                ))
            }
        }
        if entry.engine.is_some() {
            if entry.key.is_some() {
                return Err(Error::config(
                    "You can't specify both key and engine"
                ))
            }
            if entry.key_name.is_none() {
                return Err(Error::config(
                    "You must supply a key_name with an engine"
                ))
            }
        }

        if let Some(ref path) = entry.pkcs12 {
            return Ok(KeyMaterialSource::Pkcs12 {
                path: options.resolve_path(path),
                password: entry.password.clone(),
            })
        }
        let cert = match entry.cert {
            Some(ref cert) => options.resolve_path(cert),
            None => {
                return Err(Error::invalid(
                    "You must supply either cert or pkcs12"
                ))
            }
        };
        match (entry.engine.as_ref(), entry.key_name.as_ref()) {
            (Some(engine), Some(key_name)) => {
                Ok(KeyMaterialSource::Engine {
                    cert,
                    engine: options.engine(engine)?,
                    key_name: key_name.clone(),
                })
            }
            _ => match entry.key {
                Some(ref key) => Ok(KeyMaterialSource::PlainKey {
                    cert,
                    key: options.resolve_path(key),
                    password: entry.password.clone(),
                }),
                None => Ok(KeyMaterialSource::CertOnly { cert })
            }
        }
    }

    /// Returns whether this source provides a private key.
    pub fn has_private_key(&self) -> bool {
        !matches!(*self, KeyMaterialSource::CertOnly { .. })
    }

    /// Returns the path of the file the certificate is read from.
    pub fn cert_path(&self) -> &Path {
        match *self {
            KeyMaterialSource::PlainKey { ref cert, .. } => cert,
            KeyMaterialSource::Pkcs12 { ref path, .. } => path,
            KeyMaterialSource::Engine { ref cert, .. } => cert,
            KeyMaterialSource::CertOnly { ref cert } => cert,
        }
    }
}


//------------ Tests ---------------------------------------------------------

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// An engine handing out keys from a list.
    #[derive(Debug, Default)]
    pub struct TestEngine {
        keys: Vec<(String, PKey<Private>)>,
    }

    impl TestEngine {
        pub fn with_key(mut self, name: &str, pem: &[u8]) -> Self {
            self.keys.push(
                (name.into(), PKey::private_key_from_pem(pem).unwrap())
            );
            self
        }
    }

    impl KeyLoader for TestEngine {
        fn load_private_key(
            &self, key_name: &str
        ) -> Result<PKey<Private>, io::Error> {
            self.keys.iter().find(|item| item.0 == key_name).map(|item| {
                item.1.clone()
            }).ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "no such key")
            })
        }
    }

    fn options() -> LoadOptions {
        LoadOptions::new("/ca").with_engine("hsm", TestEngine::default())
    }

    fn entry(
        cert: bool, key: bool, pkcs12: bool, engine: bool, key_name: bool
    ) -> CertEntry {
        CertEntry {
            cert: if cert { Some("ca.cer".into()) } else { None },
            key: if key { Some("ca.key".into()) } else { None },
            password: None,
            pkcs12: if pkcs12 { Some("ca.p12".into()) } else { None },
            engine: if engine { Some("hsm".into()) } else { None },
            key_name: if key_name { Some("ca".into()) } else { None },
        }
    }

    fn resolve_err(entry: CertEntry) -> String {
        KeyMaterialSource::resolve(&entry, &options()).unwrap_err()
            .to_string()
    }

    #[test]
    fn pkcs12_conflicts() {
        assert_eq!(
            resolve_err(entry(false, true, true, true, true)),
            "You can't specify both engine and pkcs12"
        );
        assert_eq!(
            resolve_err(entry(true, true, true, false, false)),
            "You can't specify both pkcs12 and key"
        );
        assert_eq!(
            resolve_err(entry(true, false, true, false, false)),
            "You can't specify both pkcs12 and cert"
        );
    }

    #[test]
    fn engine_conflicts() {
        assert_eq!(
            resolve_err(entry(true, true, false, true, true)),
            "You can't specify both key and engine"
        );
        assert_eq!(
            resolve_err(entry(true, true, false, true, false)),
            "You can't specify both key and engine"
        );
        assert_eq!(
            resolve_err(entry(true, false, false, true, false)),
            "You must supply a key_name with an engine"
        );
    }

    #[test]
    fn resolves_each_variant() {
        let options = options();
        match KeyMaterialSource::resolve(
            &entry(false, false, true, false, false), &options
        ).unwrap() {
            KeyMaterialSource::Pkcs12 { path, password } => {
                assert_eq!(path, Path::new("/ca/ca.p12"));
                assert_eq!(password, None);
            }
            other => panic!("unexpected {:?}", other)
        }
        match KeyMaterialSource::resolve(
            &entry(true, false, false, true, true), &options
        ).unwrap() {
            KeyMaterialSource::Engine { cert, key_name, .. } => {
                assert_eq!(cert, Path::new("/ca/ca.cer"));
                assert_eq!(key_name, "ca");
            }
            other => panic!("unexpected {:?}", other)
        }
        match KeyMaterialSource::resolve(
            &entry(true, true, false, false, false), &options
        ).unwrap() {
            KeyMaterialSource::PlainKey { cert, key, .. } => {
                assert_eq!(cert, Path::new("/ca/ca.cer"));
                assert_eq!(key, Path::new("/ca/ca.key"));
            }
            other => panic!("unexpected {:?}", other)
        }
        let source = KeyMaterialSource::resolve(
            &entry(true, false, false, false, false), &options
        ).unwrap();
        assert!(!source.has_private_key());
        assert_eq!(source.cert_path(), Path::new("/ca/ca.cer"));
    }

    #[test]
    fn key_name_without_engine_is_ignored() {
        let source = KeyMaterialSource::resolve(
            &entry(true, true, false, false, true), &options()
        ).unwrap();
        assert!(matches!(source, KeyMaterialSource::PlainKey { .. }));
    }

    #[test]
    fn needs_cert_or_pkcs12() {
        let err = KeyMaterialSource::resolve(
            &entry(false, true, false, false, false), &options()
        ).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn unknown_engine() {
        let mut entry = entry(true, false, false, true, true);
        entry.engine = Some("nonexistent".into());
        let err = KeyMaterialSource::resolve(&entry, &options()).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(
            err.to_string(),
            "engine 'nonexistent' is not a registered key loader"
        );
    }
}
