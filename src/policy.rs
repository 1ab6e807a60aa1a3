//! Subject item policies.
//!
//! A [`SubjectItemPolicy`] declares which subject attributes a profile
//! accepts and which of those it insists on. Validating a subject against
//! it drops every attribute the policy doesn’t mention and fails if a
//! required attribute is missing. Attribute names are compared exactly, so
//! a policy for `cn` doesn’t match a subject’s `CN`.

use std::collections::{BTreeSet, HashMap};
use std::convert::TryFrom;
use std::str::FromStr;
use std::fmt;
use log::debug;
use serde_json::Value;
use crate::error::Error;
use crate::subject::Subject;


//------------ SubjectItemPolicy ---------------------------------------------

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubjectItemPolicy {
    policy: HashMap<String, ItemRequirement>,
}

impl SubjectItemPolicy {
    /// Creates a policy from short names and their requirement strings.
    ///
    /// Each value must be exactly `"required"` or `"optional"`.
    pub fn new<I, K, V>(items: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut policy = HashMap::new();
        for (name, value) in items {
            let requirement: ItemRequirement = value.as_ref().parse()?;
            policy.insert(name.into(), requirement);
        }
        Ok(SubjectItemPolicy { policy })
    }

    /// Creates a policy from a configuration document value.
    ///
    /// The value has to be a mapping from short names to requirement
    /// strings.
    pub fn from_value(value: &Value) -> Result<Self, Error> {
        let map = value.as_object().ok_or_else(|| Error::invalid(
            "Must supply a mapping in form shortname: required/optional"
        ))?;
        let mut policy = HashMap::new();
        for (name, value) in map {
            let requirement: ItemRequirement = value.as_str().ok_or_else(|| {
                Error::invalid(ItemRequirement::UNKNOWN)
            })?.parse()?;
            policy.insert(name.clone(), requirement);
        }
        Ok(SubjectItemPolicy { policy })
    }

    /// Returns the requirement for the given short name, if any.
    pub fn requirement(&self, name: &str) -> Option<ItemRequirement> {
        self.policy.get(name).copied()
    }

    /// Returns the names of all required items.
    pub fn required(&self) -> BTreeSet<&str> {
        self.names_with(ItemRequirement::Required)
    }

    /// Returns the names of all optional items.
    pub fn optional(&self) -> BTreeSet<&str> {
        self.names_with(ItemRequirement::Optional)
    }

    fn names_with(&self, requirement: ItemRequirement) -> BTreeSet<&str> {
        self.policy.iter().filter_map(|(name, value)| {
            if *value == requirement { Some(name.as_str()) }
            else { None }
        }).collect()
    }

    /// Validates a subject and returns the part of it the policy allows.
    ///
    /// The returned subject contains, in their original order, exactly
    /// those attributes of `subject` whose name appears in the policy. If
    /// any required name is missing from `subject`, a policy violation
    /// listing all missing names is returned instead.
    pub fn validate_subject(
        &self, subject: &Subject
    ) -> Result<Subject, Error> {
        let mut res = Subject::new();
        for item in subject {
            if self.policy.contains_key(item.name()) {
                res.push(item.name(), item.value());
            }
            else {
                debug!(
                    "Dropping subject item {} not allowed by policy",
                    item.name()
                );
            }
        }

        let missing: Vec<_> = self.required().into_iter().filter(|name| {
            !subject.contains(name)
        }).collect();
        if !missing.is_empty() {
            return Err(Error::PolicyViolation(format!(
                "This profile requires you supply {}", missing.join(", ")
            )))
        }
        Ok(res)
    }
}


//------------ ItemRequirement -----------------------------------------------

/// Whether a subject item must be present.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ItemRequirement {
    Required,
    Optional,
}

impl ItemRequirement {
    const UNKNOWN: &'static str =
        "Unknown subject item policy value. \
         Allowed values are required and optional";
}

impl FromStr for ItemRequirement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "required" => Ok(ItemRequirement::Required),
            "optional" => Ok(ItemRequirement::Optional),
            _ => Err(Error::invalid(ItemRequirement::UNKNOWN))
        }
    }
}

impl<'a> TryFrom<&'a str> for ItemRequirement {
    type Error = Error;

    fn try_from(s: &'a str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for ItemRequirement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            ItemRequirement::Required => "required",
            ItemRequirement::Optional => "optional",
        })
    }
}


//------------ Tests ---------------------------------------------------------
