//! Registration of custom object identifiers.
//!
//! OpenSSL keeps a process-wide table mapping object identifiers to short
//! and long names. Subject attributes and extensions that use private OIDs
//! only show up under a friendly name once their OID has been added to
//! that table.
//!
//! The table is global state owned by OpenSSL. Registration should happen
//! once at start-up, before any threads start inspecting or signing
//! certificates. Registering the same or conflicting identifiers from
//! several threads at once is not supported.

use log::debug;
use openssl::nid::Nid;
use serde::{Deserialize, Serialize};
use crate::error::Error;


//------------ register ------------------------------------------------------

/// Registers a single object identifier with OpenSSL.
///
/// The `oid` is given in dotted notation, e.g. `"1.2.3.4.5"`. If
/// `long_name` is `None`, the short name is used for both. Returns the
/// numeric identifier OpenSSL assigned.
///
/// Whether registering an already known identifier succeeds is up to
/// OpenSSL. A failure leaves whatever was registered before in place.
pub fn register(
    oid: &str,
    short_name: &str,
    long_name: Option<&str>,
) -> Result<Nid, Error> {
    let long_name = long_name.unwrap_or(short_name);
    let nid = Nid::create(oid, short_name, long_name)?;
    debug!("Registered OID {} as {} ({})", oid, short_name, long_name);
    Ok(nid)
}

/// Registers a list of object identifiers in order.
///
/// Stops at the first entry OpenSSL refuses and returns that error. Entries
/// before it stay registered.
pub fn batch_register(oids: &[OidEntry]) -> Result<(), Error> {
    for entry in oids {
        entry.register()?;
    }
    Ok(())
}


//------------ OidEntry ------------------------------------------------------

/// An object identifier together with its friendly names.
///
/// The type can be deserialized so that a table of custom identifiers can
/// live in the same document as the CA configuration.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct OidEntry {
    /// The identifier in dotted notation.
    pub oid: String,

    /// The short name, e.g. `"CN"`.
    pub short_name: String,

    /// The long name. Defaults to the short name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
}

impl OidEntry {
    pub fn new(
        oid: impl Into<String>,
        short_name: impl Into<String>,
        long_name: Option<String>,
    ) -> Self {
        OidEntry {
            oid: oid.into(),
            short_name: short_name.into(),
            long_name,
        }
    }

    /// Registers this entry with OpenSSL.
    pub fn register(&self) -> Result<Nid, Error> {
        register(&self.oid, &self.short_name, self.long_name.as_deref())
    }
}


//------------ Tests ---------------------------------------------------------
