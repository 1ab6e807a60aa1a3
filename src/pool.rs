//! A collection of CA configurations.

use std::collections::{hash_map, HashMap, HashSet};
use std::iter::FromIterator;
use std::path::Path;
use std::sync::Arc;
use log::info;
use serde_json::Value;
use crate::config::{CaConfig, LoadOptions};
use crate::error::Error;


//------------ CaConfigPool --------------------------------------------------

/// The configurations of all CAs known to an application, by name.
///
/// The pool is created once and not changed afterwards. The configurations
/// are kept behind an [`Arc`] so they can be handed to signing workers
/// without copying or locking.
#[derive(Clone, Debug, Default)]
pub struct CaConfigPool {
    configs: HashMap<String, Arc<CaConfig>>,
}

impl CaConfigPool {
    /// Creates a pool from configurations by name.
    pub fn new(configs: HashMap<String, CaConfig>) -> Self {
        configs.into_iter().collect()
    }

    /// Loads a pool from a configuration document.
    ///
    /// The value of the top-level key `pool_name` must be a mapping from
    /// CA names to CA entries. If any entry fails to load, so does the
    /// whole pool.
    pub fn from_value(
        pool_name: &str, doc: &Value, options: &LoadOptions
    ) -> Result<Self, Error> {
        options.check_root()?;
        let entries = match doc.get(pool_name) {
            Some(Value::Object(entries)) => entries,
            Some(_) => {
                return Err(Error::invalid(format!(
                    "CA pool '{}' must be a mapping", pool_name
                )))
            }
            None => {
                return Err(Error::invalid(format!(
                    "no CA pool '{}' in configuration", pool_name
                )))
            }
        };
        let mut configs = HashMap::with_capacity(entries.len());
        for (name, entry) in entries {
            let config = CaConfig::from_entry(name, entry, options)?;
            configs.insert(name.clone(), Arc::new(config));
        }
        info!(
            "Loaded {} CA configuration(s) from '{}'",
            configs.len(), pool_name
        );
        Ok(CaConfigPool { configs })
    }

    /// Loads a pool from a YAML document.
    #[cfg(feature = "yaml")]
    pub fn from_yaml(
        pool_name: &str, yaml: &str, options: &LoadOptions
    ) -> Result<Self, Error> {
        let doc: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(pool_name, &doc, options)
    }

    /// Loads a pool from a YAML file.
    #[cfg(feature = "yaml")]
    pub fn load_yaml(
        pool_name: &str, path: impl AsRef<Path>, options: &LoadOptions
    ) -> Result<Self, Error> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|err| {
            Error::io(path, err)
        })?;
        Self::from_yaml(pool_name, &yaml, options)
    }

    /// Loads a pool from a JSON document.
    pub fn from_json(
        pool_name: &str, json: &str, options: &LoadOptions
    ) -> Result<Self, Error> {
        let doc: Value = serde_json::from_str(json)?;
        Self::from_value(pool_name, &doc, options)
    }

    /// Returns the configuration of the CA with the given name.
    pub fn lookup(&self, name: &str) -> Option<&Arc<CaConfig>> {
        self.configs.get(name)
    }

    /// Returns all configurations in no particular order.
    pub fn all(&self) -> Vec<&Arc<CaConfig>> {
        self.configs.values().collect()
    }

    /// Returns the names of all CAs.
    pub fn names(&self) -> HashSet<&str> {
        self.configs.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.configs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<String, Arc<CaConfig>> {
        self.configs.iter()
    }
}


//--- FromIterator

impl<N: Into<String>> FromIterator<(N, CaConfig)> for CaConfigPool {
    fn from_iter<I: IntoIterator<Item = (N, CaConfig)>>(iter: I) -> Self {
        CaConfigPool {
            configs: iter.into_iter().map(|(name, config)| {
                (name.into(), Arc::new(config))
            }).collect()
        }
    }
}


//------------ Tests ---------------------------------------------------------

#[cfg(test)]
mod test {
    use crate::cert::Cert;
    use crate::profile::CaProfile;
    use super::*;

    fn config() -> CaConfig {
        let mut builder = CaConfig::builder();
        builder.ca_cert(Cert::from_pem(
            include_bytes!("../test-data/test_ca.cer"),
            Some(&include_bytes!("../test-data/test_ca.key")[..]),
        ).unwrap());
        builder.profile("first_profile", CaProfile::new());
        builder.build().unwrap()
    }

    #[test]
    fn empty_pool() {
        let pool = CaConfigPool::new(HashMap::new());
        assert!(pool.lookup("first").is_none());
        assert!(pool.all().is_empty());
        assert!(pool.names().is_empty());
        assert!(pool.is_empty());
    }

    #[test]
    fn one_config() {
        let mut configs = HashMap::new();
        configs.insert("first".to_string(), config());
        let pool = CaConfigPool::new(configs);
        let first = pool.lookup("first").unwrap();
        assert_eq!(first.num_profiles(), 1);
        assert_eq!(pool.all().len(), 1);
        assert!(Arc::ptr_eq(pool.all()[0], first));
        assert!(pool.lookup("second").is_none());
    }

    #[test]
    fn two_configs() {
        let pool: CaConfigPool = vec![
            ("first", config()), ("second", config())
        ].into_iter().collect();
        assert_eq!(pool.len(), 2);
        let names = pool.names();
        assert!(names.contains("first"));
        assert!(names.contains("second"));
        let first = pool.lookup("first").unwrap();
        let second = pool.lookup("second").unwrap();
        assert!(!Arc::ptr_eq(first, second));
        let all = pool.all();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|item| Arc::ptr_eq(*item, first)));
        assert!(all.iter().any(|item| Arc::ptr_eq(*item, second)));
    }
}
