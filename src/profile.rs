//! Certificate profiles.

use serde::Deserialize;
use serde_json::Value;
use crate::error::Error;
use crate::policy::SubjectItemPolicy;


//------------ CaProfile -----------------------------------------------------

/// A named issuance template offered by a CA.
///
/// The profile bundles the extension defaults for certificates issued
/// under it with an optional subject item policy. The extension values are
/// kept in the textual form OpenSSL’s configuration uses and are not
/// interpreted here.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CaProfile {
    basic_constraints: Option<String>,
    key_usage: Vec<String>,
    extended_key_usage: Vec<String>,
    certificate_policies: Vec<Vec<String>>,
    ocsp_no_check: bool,
    subject_item_policy: Option<SubjectItemPolicy>,
}

impl CaProfile {
    /// Creates a profile without any defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a profile from a configuration document value.
    ///
    /// The value has to be a mapping. Unknown keys are ignored.
    pub fn from_value(value: &Value) -> Result<Self, Error> {
        if !value.is_object() {
            return Err(Error::TypeMismatch(
                "profiles must be of type CaProfile".into()
            ))
        }
        let entry = ProfileEntry::deserialize(value).map_err(|err| {
            Error::invalid(format!("invalid profile: {}", err))
        })?;
        let subject_item_policy = match entry.subject_item_policy {
            Some(ref policy) => Some(SubjectItemPolicy::from_value(policy)?),
            None => None
        };
        Ok(CaProfile {
            basic_constraints: entry.basic_constraints,
            key_usage: entry.key_usage,
            extended_key_usage: entry.extended_key_usage,
            certificate_policies: entry.certificate_policies,
            ocsp_no_check: entry.ocsp_no_check,
            subject_item_policy,
        })
    }

    pub fn with_basic_constraints(mut self, value: impl Into<String>) -> Self {
        self.basic_constraints = Some(value.into());
        self
    }

    pub fn with_key_usage(mut self, value: Vec<String>) -> Self {
        self.key_usage = value;
        self
    }

    pub fn with_extended_key_usage(mut self, value: Vec<String>) -> Self {
        self.extended_key_usage = value;
        self
    }

    pub fn with_certificate_policies(
        mut self, value: Vec<Vec<String>>
    ) -> Self {
        self.certificate_policies = value;
        self
    }

    pub fn with_ocsp_no_check(mut self, value: bool) -> Self {
        self.ocsp_no_check = value;
        self
    }

    pub fn with_subject_item_policy(
        mut self, policy: SubjectItemPolicy
    ) -> Self {
        self.subject_item_policy = Some(policy);
        self
    }
}

impl CaProfile {
    pub fn basic_constraints(&self) -> Option<&str> {
        self.basic_constraints.as_deref()
    }

    pub fn key_usage(&self) -> &[String] {
        &self.key_usage
    }

    pub fn extended_key_usage(&self) -> &[String] {
        &self.extended_key_usage
    }

    /// Returns the certificate policies.
    ///
    /// Each policy is a list of OpenSSL policy statements such as
    /// `policyIdentifier=1.2.3.4` or `CPS.1=http://example.com/cps`.
    pub fn certificate_policies(&self) -> &[Vec<String>] {
        &self.certificate_policies
    }

    /// Whether issued certificates carry the OCSP no-check extension.
    pub fn ocsp_no_check(&self) -> bool {
        self.ocsp_no_check
    }

    pub fn subject_item_policy(&self) -> Option<&SubjectItemPolicy> {
        self.subject_item_policy.as_ref()
    }
}


//------------ ProfileEntry --------------------------------------------------

/// The profile as it appears in a configuration document.
#[derive(Debug, Deserialize)]
struct ProfileEntry {
    #[serde(default)]
    basic_constraints: Option<String>,

    #[serde(default)]
    key_usage: Vec<String>,

    #[serde(default)]
    extended_key_usage: Vec<String>,

    #[serde(default)]
    certificate_policies: Vec<Vec<String>>,

    #[serde(default)]
    ocsp_no_check: bool,

    #[serde(default)]
    subject_item_policy: Option<Value>,
}


//------------ Tests ---------------------------------------------------------
