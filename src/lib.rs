//! Configuration for certificate authorities.
//!
//! A certificate authority needs a fair amount of configuration before it
//! can issue anything: its certificate and private key, possibly a
//! delegate for signing OCSP responses, validity periods for CRLs and OCSP
//! responses, and a set of profiles describing what it is willing to
//! issue. This crate provides the types holding that configuration and
//! the logic to validate it when it is loaded.
//!
//! The [`CaConfigPool`] keeps the configurations of all CAs by name. Each
//! [`CaConfig`] resolves where its keys come from (plain key files,
//! PKCS#12 bundles, or an engine implementing [`KeyLoader`]) and refuses
//! contradictory settings. Its [`CaProfile`]s may carry a
//! [`SubjectItemPolicy`] which filters the subject of a certificate
//! request down to the attributes the profile allows and insists on the
//! ones it requires.
//!
//! Certificates, keys, and object identifiers are handled by OpenSSL. The
//! [`oid`] module registers custom object identifiers with OpenSSL’s
//! global table and should be used once at start-up.
//!
//! The crate logs through the `log` facade but never installs a logger.

pub use self::cert::Cert;
pub use self::config::{CaConfig, CaConfigBuilder, LoadOptions};
pub use self::error::Error;
pub use self::key::{CertEntry, KeyLoader, KeyMaterialSource};
pub use self::policy::{ItemRequirement, SubjectItemPolicy};
pub use self::pool::CaConfigPool;
pub use self::profile::CaProfile;
pub use self::subject::{Subject, SubjectItem};

pub mod cert;
pub mod config;
pub mod error;
pub mod key;
pub mod oid;
pub mod policy;
pub mod pool;
pub mod profile;
pub mod subject;
