//! The configuration of a single certificate authority.
//!
//! A [`CaConfig`] holds everything a CA needs to issue certificates, CRLs,
//! and OCSP responses: its certificate and key, an optional OCSP delegate,
//! timing parameters, and the profiles it offers. It is either put together
//! through a [`CaConfigBuilder`] or loaded from a configuration document.
//! Either way it is validated completely when created and doesn’t change
//! afterwards, except through [`CaConfig::set_profile`].
//!
//! A configuration document is a tree of mappings, lists, and scalars. It
//! is represented as a [`serde_json::Value`] no matter which format it was
//! written in. A CA’s entry looks like this in YAML:
//!
//! ```text
//! test_ca:
//!   ca_cert:
//!     cert: test_ca.cer
//!     key: test_ca.key
//!   ocsp_cert:
//!     pkcs12: ocsp_signer.p12
//!     password: secret
//!   ocsp_chain:
//!     - ocsp_signer.cer
//!     - test_ca.cer
//!   crl_validity_hours: 72
//!   profiles:
//!     server:
//!       subject_item_policy:
//!         CN: required
//!         O: optional
//! ```

use std::fs;
use std::collections::{hash_map, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use chrono::Duration;
use log::debug;
use openssl::hash::MessageDigest;
use openssl::x509::X509;
use serde::Deserialize;
use serde_json::{Map, Value};
use crate::cert::{read_certs, Cert};
use crate::error::Error;
use crate::key::{CertEntry, KeyLoader, KeyMaterialSource};
use crate::profile::CaProfile;


//------------ Defaults ------------------------------------------------------

/// The message digest used if none is configured.
pub const DEFAULT_MESSAGE_DIGEST: &str = "SHA1";

/// The CRL validity used if none is configured, one week.
pub const DEFAULT_CRL_VALIDITY_HOURS: u32 = 168;

/// The OCSP response validity used if none is configured, one week.
pub const DEFAULT_OCSP_VALIDITY_HOURS: u32 = 168;

/// How far back an OCSP response’s validity starts by default.
pub const DEFAULT_OCSP_START_SKEW_SECONDS: u32 = 3600;


//------------ CaConfig ------------------------------------------------------

#[derive(Clone, Debug)]
pub struct CaConfig {
    ca_cert: Arc<Cert>,
    key_material_source: Option<KeyMaterialSource>,
    ocsp_cert: Arc<Cert>,
    ocsp_key_material_source: Option<KeyMaterialSource>,
    ocsp_chain: Vec<X509>,
    message_digest: String,
    crl_validity_hours: u32,
    ocsp_validity_hours: u32,
    ocsp_start_skew_seconds: u32,
    cdp_location: Option<String>,
    ocsp_location: Option<String>,
    crl_number_file: Option<PathBuf>,
    crl_list_file: Option<PathBuf>,
    profiles: HashMap<String, CaProfile>,
}

impl CaConfig {
    /// Returns a builder for a new configuration.
    pub fn builder() -> CaConfigBuilder {
        CaConfigBuilder::new()
    }

    /// Loads the configuration for the CA `name` from a document.
    ///
    /// The CA’s entry is the value of the key `name` at the top level of
    /// the document. Relative paths are resolved against the root path of
    /// `options`, which has to be an existing directory.
    pub fn from_value(
        name: &str, doc: &Value, options: &LoadOptions
    ) -> Result<Self, Error> {
        options.check_root()?;
        Self::from_entry(name, doc.get(name).unwrap_or(&Value::Null), options)
    }

    /// Loads the configuration for the CA `name` from a YAML document.
    #[cfg(feature = "yaml")]
    pub fn from_yaml(
        name: &str, yaml: &str, options: &LoadOptions
    ) -> Result<Self, Error> {
        let doc: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(name, &doc, options)
    }

    /// Loads the configuration for the CA `name` from a YAML file.
    #[cfg(feature = "yaml")]
    pub fn load_yaml(
        name: &str, path: impl AsRef<Path>, options: &LoadOptions
    ) -> Result<Self, Error> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|err| {
            Error::io(path, err)
        })?;
        Self::from_yaml(name, &yaml, options)
    }

    /// Loads the configuration for the CA `name` from a JSON document.
    pub fn from_json(
        name: &str, json: &str, options: &LoadOptions
    ) -> Result<Self, Error> {
        let doc: Value = serde_json::from_str(json)?;
        Self::from_value(name, &doc, options)
    }

    /// Creates a configuration from a single CA entry.
    ///
    /// Does not check the root path.
    pub(crate) fn from_entry(
        name: &str, entry: &Value, options: &LoadOptions
    ) -> Result<Self, Error> {
        match *entry {
            Value::Object(_) => { }
            Value::Null => {
                return Err(Error::invalid(format!(
                    "no configuration for CA '{}'", name
                )))
            }
            _ => {
                return Err(Error::invalid(format!(
                    "configuration for CA '{}' must be a mapping", name
                )))
            }
        }
        let entry = CaEntry::deserialize(entry).map_err(|err| {
            Error::invalid(format!(
                "invalid configuration for CA '{}': {}", name, err
            ))
        })?;

        let mut builder = CaConfigBuilder::new();

        let ca_entry = match entry.ca_cert {
            Some(ref value) if !value.is_null() => {
                cert_entry(value, "ca_cert must be of type Cert")?
            }
            _ => {
                return Err(Error::invalid(
                    "Config object requires that you pass ca_cert"
                ))
            }
        };
        let source = KeyMaterialSource::resolve(&ca_entry, options)?;
        builder.ca_cert(Cert::load(&source)?);
        builder.key_material_source(source);

        if let Some(ref value) = entry.ocsp_cert {
            if !value.is_null() {
                let ocsp_entry = cert_entry(
                    value, "ocsp_cert, if provided, must be of type Cert"
                )?;
                let source = KeyMaterialSource::resolve(&ocsp_entry, options)?;
                builder.ocsp_cert(Cert::load(&source)?);
                builder.ocsp_key_material_source(source);
            }
        }

        if let Some(chain) = entry.ocsp_chain {
            for path in chain.into_paths() {
                for cert in read_certs(&options.resolve_path(&path))? {
                    builder.push_ocsp_chain(cert);
                }
            }
        }

        if let Some(profiles) = entry.profiles {
            for (profile_name, value) in &profiles {
                builder.profile(
                    profile_name.clone(), CaProfile::from_value(value)?
                );
            }
        }

        if let Some(digest) = entry.message_digest {
            builder.message_digest(digest);
        }
        if let Some(hours) = entry.crl_validity_hours {
            builder.crl_validity_hours(hours);
        }
        if let Some(hours) = entry.ocsp_validity_hours {
            builder.ocsp_validity_hours(hours);
        }
        if let Some(seconds) = entry.ocsp_start_skew_seconds {
            builder.ocsp_start_skew_seconds(seconds);
        }
        if let Some(location) = entry.cdp_location {
            builder.cdp_location(location);
        }
        if let Some(location) = entry.ocsp_location {
            builder.ocsp_location(location);
        }
        if let Some(path) = entry.crl_number_file {
            builder.crl_number_file(options.resolve_path(&path));
        }
        if let Some(path) = entry.crl_list_file {
            builder.crl_list_file(options.resolve_path(&path));
        }

        let res = builder.build()?;
        debug!(
            "Loaded configuration for CA '{}' with {} profile(s)",
            name, res.num_profiles()
        );
        Ok(res)
    }
}

impl CaConfig {
    /// Returns the CA certificate.
    pub fn ca_cert(&self) -> &Cert {
        &self.ca_cert
    }

    /// Returns where the CA certificate and key were loaded from.
    ///
    /// This is `None` if the certificate was handed in already loaded.
    pub fn key_material_source(&self) -> Option<&KeyMaterialSource> {
        self.key_material_source.as_ref()
    }

    /// Returns the certificate used to sign OCSP responses.
    ///
    /// Unless a delegate was configured, this is the CA certificate.
    pub fn ocsp_cert(&self) -> &Cert {
        &self.ocsp_cert
    }

    /// Returns whether OCSP responses are signed by the CA certificate.
    pub fn ocsp_cert_is_ca_cert(&self) -> bool {
        Arc::ptr_eq(&self.ca_cert, &self.ocsp_cert)
    }

    pub fn ocsp_key_material_source(&self) -> Option<&KeyMaterialSource> {
        self.ocsp_key_material_source.as_ref()
    }

    /// Returns the certificates to include with OCSP responses.
    pub fn ocsp_chain(&self) -> &[X509] {
        &self.ocsp_chain
    }

    /// Returns the name of the configured message digest.
    pub fn message_digest(&self) -> &str {
        &self.message_digest
    }

    /// Returns the configured message digest.
    pub fn digest(&self) -> Result<MessageDigest, Error> {
        MessageDigest::from_name(&self.message_digest).ok_or_else(|| {
            Error::config(format!(
                "unknown message digest '{}'", self.message_digest
            ))
        })
    }

    pub fn crl_validity_hours(&self) -> u32 {
        self.crl_validity_hours
    }

    pub fn crl_validity(&self) -> Duration {
        Duration::hours(self.crl_validity_hours.into())
    }

    pub fn ocsp_validity_hours(&self) -> u32 {
        self.ocsp_validity_hours
    }

    pub fn ocsp_validity(&self) -> Duration {
        Duration::hours(self.ocsp_validity_hours.into())
    }

    pub fn ocsp_start_skew_seconds(&self) -> u32 {
        self.ocsp_start_skew_seconds
    }

    pub fn ocsp_start_skew(&self) -> Duration {
        Duration::seconds(self.ocsp_start_skew_seconds.into())
    }

    /// Returns the URI of the CRL distribution point.
    pub fn cdp_location(&self) -> Option<&str> {
        self.cdp_location.as_deref()
    }

    /// Returns the URI of the OCSP responder.
    pub fn ocsp_location(&self) -> Option<&str> {
        self.ocsp_location.as_deref()
    }

    /// Returns the file the CRL number is kept in.
    pub fn crl_number_file(&self) -> Option<&Path> {
        self.crl_number_file.as_deref()
    }

    /// Returns the file the list of revoked certificates is kept in.
    pub fn crl_list_file(&self) -> Option<&Path> {
        self.crl_list_file.as_deref()
    }

    /// Returns the profile with the given name.
    pub fn profile(&self, name: &str) -> Result<&CaProfile, Error> {
        self.profiles.get(name).ok_or_else(|| {
            Error::config(format!("unknown profile '{}'", name))
        })
    }

    pub fn num_profiles(&self) -> usize {
        self.profiles.len()
    }

    pub fn profiles(&self) -> hash_map::Iter<String, CaProfile> {
        self.profiles.iter()
    }

    /// Adds a profile, replacing any existing profile of the same name.
    ///
    /// Profiles should only be added while setting up the configuration,
    /// before it is shared.
    pub fn set_profile(&mut self, name: impl Into<String>, profile: CaProfile) {
        self.profiles.insert(name.into(), profile);
    }
}


//------------ CaConfigBuilder -----------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct CaConfigBuilder {
    ca_cert: Option<Cert>,
    key_material_source: Option<KeyMaterialSource>,
    ocsp_cert: Option<Cert>,
    ocsp_key_material_source: Option<KeyMaterialSource>,
    ocsp_chain: Vec<X509>,
    message_digest: Option<String>,
    crl_validity_hours: Option<u32>,
    ocsp_validity_hours: Option<u32>,
    ocsp_start_skew_seconds: Option<u32>,
    cdp_location: Option<String>,
    ocsp_location: Option<String>,
    crl_number_file: Option<PathBuf>,
    crl_list_file: Option<PathBuf>,
    profiles: HashMap<String, CaProfile>,
}

impl CaConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ca_cert(&mut self, cert: Cert) -> &mut Self {
        self.ca_cert = Some(cert);
        self
    }

    pub fn key_material_source(
        &mut self, source: KeyMaterialSource
    ) -> &mut Self {
        self.key_material_source = Some(source);
        self
    }

    /// Sets a delegate for signing OCSP responses.
    ///
    /// The certificate has to come with a private key.
    pub fn ocsp_cert(&mut self, cert: Cert) -> &mut Self {
        self.ocsp_cert = Some(cert);
        self
    }

    pub fn ocsp_key_material_source(
        &mut self, source: KeyMaterialSource
    ) -> &mut Self {
        self.ocsp_key_material_source = Some(source);
        self
    }

    pub fn push_ocsp_chain(&mut self, cert: X509) -> &mut Self {
        self.ocsp_chain.push(cert);
        self
    }

    pub fn message_digest(&mut self, digest: impl Into<String>) -> &mut Self {
        self.message_digest = Some(digest.into());
        self
    }

    pub fn crl_validity_hours(&mut self, hours: u32) -> &mut Self {
        self.crl_validity_hours = Some(hours);
        self
    }

    pub fn ocsp_validity_hours(&mut self, hours: u32) -> &mut Self {
        self.ocsp_validity_hours = Some(hours);
        self
    }

    pub fn ocsp_start_skew_seconds(&mut self, seconds: u32) -> &mut Self {
        self.ocsp_start_skew_seconds = Some(seconds);
        self
    }

    pub fn cdp_location(&mut self, uri: impl Into<String>) -> &mut Self {
        self.cdp_location = Some(uri.into());
        self
    }

    pub fn ocsp_location(&mut self, uri: impl Into<String>) -> &mut Self {
        self.ocsp_location = Some(uri.into());
        self
    }

    pub fn crl_number_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.crl_number_file = Some(path.into());
        self
    }

    pub fn crl_list_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.crl_list_file = Some(path.into());
        self
    }

    pub fn profile(
        &mut self, name: impl Into<String>, profile: CaProfile
    ) -> &mut Self {
        self.profiles.insert(name.into(), profile);
        self
    }

    /// Validates the settings and creates the configuration.
    pub fn build(self) -> Result<CaConfig, Error> {
        let ca_cert = match self.ca_cert {
            Some(cert) => Arc::new(cert),
            None => {
                return Err(Error::invalid(
                    "Config object requires that you pass ca_cert"
                ))
            }
        };
        let ocsp_cert = match self.ocsp_cert {
            Some(cert) => {
                if !cert.has_private_key() {
                    return Err(Error::invalid(
                        "ocsp_cert must contain a private key, \
                         not just a certificate"
                    ))
                }
                Arc::new(cert)
            }
            None => ca_cert.clone(),
        };
        Ok(CaConfig {
            ca_cert,
            key_material_source: self.key_material_source,
            ocsp_cert,
            ocsp_key_material_source: self.ocsp_key_material_source,
            ocsp_chain: self.ocsp_chain,
            message_digest: self.message_digest.unwrap_or_else(|| {
                DEFAULT_MESSAGE_DIGEST.into()
            }),
            crl_validity_hours: self.crl_validity_hours.unwrap_or(
                DEFAULT_CRL_VALIDITY_HOURS
            ),
            ocsp_validity_hours: self.ocsp_validity_hours.unwrap_or(
                DEFAULT_OCSP_VALIDITY_HOURS
            ),
            ocsp_start_skew_seconds: self.ocsp_start_skew_seconds.unwrap_or(
                DEFAULT_OCSP_START_SKEW_SECONDS
            ),
            cdp_location: self.cdp_location,
            ocsp_location: self.ocsp_location,
            crl_number_file: self.crl_number_file,
            crl_list_file: self.crl_list_file,
            profiles: self.profiles,
        })
    }
}


//------------ LoadOptions ---------------------------------------------------

/// Settings for loading configuration documents.
#[derive(Clone, Debug)]
pub struct LoadOptions {
    /// The directory relative paths are resolved against.
    ca_root_path: PathBuf,

    /// The engines documents may refer to by name.
    engines: HashMap<String, Arc<dyn KeyLoader>>,
}

impl LoadOptions {
    pub fn new(ca_root_path: impl Into<PathBuf>) -> Self {
        LoadOptions {
            ca_root_path: ca_root_path.into(),
            engines: HashMap::new(),
        }
    }

    /// Registers an engine under the given name.
    pub fn with_engine(
        self, name: impl Into<String>, engine: impl KeyLoader + 'static
    ) -> Self {
        self.with_shared_engine(name, Arc::new(engine))
    }

    /// Registers an engine that is shared with others under a name.
    pub fn with_shared_engine(
        mut self, name: impl Into<String>, engine: Arc<dyn KeyLoader>
    ) -> Self {
        self.engines.insert(name.into(), engine);
        self
    }

    pub fn ca_root_path(&self) -> &Path {
        &self.ca_root_path
    }

    /// Resolves a path from a document against the root path.
    ///
    /// Absolute paths are returned unchanged.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        self.ca_root_path.join(path)
    }

    /// Returns the engine registered under `name`.
    pub fn engine(&self, name: &str) -> Result<Arc<dyn KeyLoader>, Error> {
        self.engines.get(name).cloned().ok_or_else(|| {
            Error::invalid(format!(
                "engine '{}' is not a registered key loader", name
            ))
        })
    }

    pub(crate) fn check_root(&self) -> Result<(), Error> {
        if self.ca_root_path.is_dir() {
            Ok(())
        }
        else {
            Err(Error::config(format!(
                "ca_root_path must be a directory: {}",
                self.ca_root_path.display()
            )))
        }
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions::new(".")
    }
}


//------------ CaEntry -------------------------------------------------------

/// A CA as it appears in a configuration document.
///
/// The certificate entries are kept as raw values so that a value of the
/// wrong kind can be reported as such.
#[derive(Debug, Deserialize)]
struct CaEntry {
    ca_cert: Option<Value>,
    ocsp_cert: Option<Value>,
    ocsp_chain: Option<ChainEntry>,
    message_digest: Option<String>,
    crl_validity_hours: Option<u32>,
    ocsp_validity_hours: Option<u32>,
    ocsp_start_skew_seconds: Option<u32>,
    cdp_location: Option<String>,
    ocsp_location: Option<String>,
    crl_number_file: Option<PathBuf>,
    crl_list_file: Option<PathBuf>,
    profiles: Option<Map<String, Value>>,
}

/// The OCSP chain is either a single file or a list of files.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChainEntry {
    One(PathBuf),
    Many(Vec<PathBuf>),
}

impl ChainEntry {
    fn into_paths(self) -> Vec<PathBuf> {
        match self {
            ChainEntry::One(path) => vec![path],
            ChainEntry::Many(paths) => paths,
        }
    }
}

fn cert_entry(value: &Value, msg: &str) -> Result<CertEntry, Error> {
    if !value.is_object() {
        return Err(Error::invalid(msg))
    }
    CertEntry::deserialize(value).map_err(|err| {
        Error::invalid(format!("{}: {}", msg, err))
    })
}



//------------ Tests ---------------------------------------------------------
