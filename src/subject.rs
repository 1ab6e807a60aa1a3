//! Certificate subject names.
//!
//! A subject is an ordered sequence of attributes, each a short name such
//! as `CN` or `OU` and a value. The order is significant to consumers of
//! X.509 names and is retained by everything in this crate.

use std::{fmt, slice};
use std::iter::FromIterator;
use openssl::nid::Nid;
use openssl::x509::{X509Name, X509NameRef};
use crate::error::Error;


//------------ Subject -------------------------------------------------------

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Subject {
    items: Vec<SubjectItem>,
}

impl Subject {
    /// Creates a new, empty subject.
    pub fn new() -> Self {
        Subject { items: Vec::new() }
    }

    /// Creates a subject from the entries of an X.509 name.
    ///
    /// Attribute types are named by their short name from OpenSSL’s object
    /// table. Types OpenSSL doesn’t know are given in dotted notation.
    pub fn from_x509_name(name: &X509NameRef) -> Result<Self, Error> {
        let mut res = Subject::new();
        for entry in name.entries() {
            let object = entry.object();
            let key = match object.nid() {
                Nid::UNDEF => object.to_string(),
                nid => match nid.short_name() {
                    Ok(short) => short.to_string(),
                    Err(_) => object.to_string(),
                }
            };
            let value = entry.data().as_utf8()?;
            res.push(key, value.to_string());
        }
        Ok(res)
    }

    /// Converts the subject into an X.509 name.
    ///
    /// Fails if OpenSSL doesn’t know one of the attribute short names.
    pub fn to_x509_name(&self) -> Result<X509Name, Error> {
        let mut builder = X509Name::builder()?;
        for item in &self.items {
            builder.append_entry_by_text(&item.name, &item.value)?;
        }
        Ok(builder.build())
    }

    /// Appends an attribute.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.items.push(SubjectItem::new(name, value))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns whether an attribute with exactly this short name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|item| item.name == name)
    }

    /// Returns the value of the first attribute with the given short name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.items.iter().find(|item| item.name == name).map(|item| {
            item.value.as_str()
        })
    }

    pub fn iter(&self) -> slice::Iter<SubjectItem> {
        self.items.iter()
    }
}


//--- FromIterator and IntoIterator

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Subject {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Subject {
            items: iter.into_iter().map(|(name, value)| {
                SubjectItem::new(name, value)
            }).collect()
        }
    }
}

impl<'a> IntoIterator for &'a Subject {
    type Item = &'a SubjectItem;
    type IntoIter = slice::Iter<'a, SubjectItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}


//--- Display

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for item in &self.items {
            write!(f, "/{}={}", item.name, item.value)?;
        }
        Ok(())
    }
}


//------------ SubjectItem ---------------------------------------------------

/// A single attribute of a subject.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SubjectItem {
    name: String,
    value: String,
}

impl SubjectItem {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        SubjectItem { name: name.into(), value: value.into() }
    }

    /// Returns the attribute’s short name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}


//------------ Tests ---------------------------------------------------------

#[cfg(test)]
mod test {
    use openssl::x509::X509;
    use super::*;

    #[test]
    fn display_keeps_order() {
        let subject: Subject = vec![
            ("L", "Chicago"), ("CN", "langui.sh"), ("O", "Org")
        ].into_iter().collect();
        assert_eq!(subject.to_string(), "/L=Chicago/CN=langui.sh/O=Org");
        assert_eq!(Subject::new().to_string(), "");
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let mut subject = Subject::new();
        subject.push("CN", "langui.sh");
        subject.push("OU", "first");
        subject.push("OU", "second");
        assert!(subject.contains("CN"));
        assert!(!subject.contains("cn"));
        assert_eq!(subject.get("OU"), Some("first"));
        assert_eq!(subject.get("O"), None);
        assert_eq!(subject.len(), 3);
    }

    #[test]
    fn from_certificate() {
        let cert = X509::from_pem(
            include_bytes!("../test-data/test_ca.cer")
        ).unwrap();
        let subject = Subject::from_x509_name(cert.subject_name()).unwrap();
        assert_eq!(
            subject.to_string(),
            "/C=US/ST=Illinois/L=Chicago/O=Example LLC/CN=Example Test CA"
        );
    }

    #[test]
    fn x509_name_round_trip() {
        let subject: Subject = vec![
            ("CN", "langui.sh"), ("OU", "Org Unit"), ("O", "Org")
        ].into_iter().collect();
        let name = subject.to_x509_name().unwrap();
        assert_eq!(Subject::from_x509_name(&name).unwrap(), subject);
    }

    #[test]
    fn unknown_short_name_fails_conversion() {
        let subject: Subject = vec![("NOPE", "x")].into_iter().collect();
        assert!(subject.to_x509_name().is_err());
    }
}
