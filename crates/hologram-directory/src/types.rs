//! Request and result types at the directory boundary.

use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// One directory entry: a DN plus multi-valued attributes.
///
/// Attribute names compare case-insensitively, as they do in LDAP.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    pub dn: String,
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl Entry {
    /// Creates an entry with no attributes.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style: appends `value` to `attribute`.
    pub fn with(mut self, attribute: &str, value: impl Into<String>) -> Self {
        self.add_values(attribute, [value.into()]);
        self
    }

    /// Appends values to an attribute, creating it if needed.
    pub fn add_values(&mut self, attribute: &str, values: impl IntoIterator<Item = String>) {
        let key = self
            .attribute_key(attribute)
            .map(str::to_string)
            .unwrap_or_else(|| attribute.to_string());
        self.attributes.entry(key).or_default().extend(values);
    }

    /// All values of an attribute. Empty if the attribute is absent.
    pub fn attribute_values(&self, attribute: &str) -> &[String] {
        self.attribute_key(attribute)
            .and_then(|key| self.attributes.get(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First value of an attribute, if any.
    pub fn attribute_value(&self, attribute: &str) -> Option<&str> {
        self.attribute_values(attribute).first().map(String::as_str)
    }

    /// Keeps only the listed attributes. An empty list keeps everything.
    pub(crate) fn project(&self, attributes: &[String]) -> Entry {
        if attributes.is_empty() {
            return self.clone();
        }
        let attributes = self
            .attributes
            .iter()
            .filter(|(name, _)| attributes.iter().any(|a| a.eq_ignore_ascii_case(name)))
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect();
        Entry {
            dn: self.dn.clone(),
            attributes,
        }
    }

    fn attribute_key(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .keys()
            .find(|k| k.eq_ignore_ascii_case(attribute))
            .map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// The subset of LDAP search filters Hologram issues.
///
/// `Display` renders RFC 4515 text with assertion values escaped, so a
/// username like `bob)(cn=*` cannot widen a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `(attribute=value)`
    Equality { attribute: String, value: String },
    /// `(attribute=*)`
    Present { attribute: String },
}

impl Filter {
    pub fn equality(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equality {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn present(attribute: impl Into<String>) -> Self {
        Self::Present {
            attribute: attribute.into(),
        }
    }

    /// Evaluates the filter against an entry.
    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            Self::Equality { attribute, value } => entry
                .attribute_values(attribute)
                .iter()
                .any(|v| v == value),
            Self::Present { attribute } => !entry.attribute_values(attribute).is_empty(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equality { attribute, value } => {
                write!(f, "({attribute}=")?;
                for c in value.chars() {
                    match c {
                        '*' => f.write_str("\\2a")?,
                        '(' => f.write_str("\\28")?,
                        ')' => f.write_str("\\29")?,
                        '\\' => f.write_str("\\5c")?,
                        '\0' => f.write_str("\\00")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str(")")
            }
            Self::Present { attribute } => write!(f, "({attribute}=*)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A whole-subtree search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub base_dn: String,
    pub filter: Filter,
    /// Attributes to return. Empty means all of them.
    pub attributes: Vec<String>,
}

impl SearchRequest {
    pub fn new(base_dn: impl Into<String>, filter: Filter) -> Self {
        Self {
            base_dn: base_dn.into(),
            filter,
            attributes: Vec::new(),
        }
    }

    /// Builder-style: adds an attribute to return.
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(name.into());
        self
    }
}

/// Adds values to attributes of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyRequest {
    pub dn: String,
    pub adds: Vec<(String, Vec<String>)>,
}

impl ModifyRequest {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            adds: Vec::new(),
        }
    }

    /// Builder-style: queues `values` to be added to `attribute`.
    pub fn add(mut self, attribute: impl Into<String>, values: Vec<String>) -> Self {
        self.adds.push((attribute.into(), values));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_display_present() {
        assert_eq!(Filter::present("sshPublicKey").to_string(), "(sshPublicKey=*)");
    }

    #[test]
    fn test_filter_display_escapes_special_characters() {
        let filter = Filter::equality("cn", "bob)(cn=*");
        assert_eq!(filter.to_string(), "(cn=bob\\29\\28cn=\\2a)");

        let filter = Filter::equality("cn", "a\\b");
        assert_eq!(filter.to_string(), "(cn=a\\5cb)");
    }

    #[test]
    fn test_filter_display_plain_value_unchanged() {
        assert_eq!(Filter::equality("objectClass", "groupOfNames").to_string(), "(objectClass=groupOfNames)");
    }

    #[test]
    fn test_entry_attribute_lookup_is_case_insensitive() {
        let entry = Entry::new("cn=alice,dc=example,dc=com")
            .with("sshPublicKey", "key-1")
            .with("SSHPUBLICKEY", "key-2");

        assert_eq!(entry.attribute_values("sshpublickey"), ["key-1", "key-2"]);
        assert_eq!(entry.attribute_value("sshPublicKey"), Some("key-1"));
        assert!(entry.attribute_values("memberOf").is_empty());
        assert_eq!(entry.attribute_value("memberOf"), None);
    }

    #[test]
    fn test_filter_matches() {
        let entry = Entry::new("cn=alice").with("cn", "alice").with("objectClass", "person");

        assert!(Filter::equality("cn", "alice").matches(&entry));
        assert!(!Filter::equality("cn", "bob").matches(&entry));
        assert!(Filter::present("objectClass").matches(&entry));
        assert!(!Filter::present("sshPublicKey").matches(&entry));
    }

    #[test]
    fn test_entry_project_keeps_requested_attributes() {
        let entry = Entry::new("cn=alice")
            .with("cn", "alice")
            .with("userPassword", "secret")
            .with("sshPublicKey", "key");

        let projected = entry.project(&["cn".to_string(), "sshpublickey".to_string()]);
        assert_eq!(projected.attribute_value("cn"), Some("alice"));
        assert_eq!(projected.attribute_value("sshPublicKey"), Some("key"));
        assert_eq!(projected.attribute_value("userPassword"), None);
        assert_eq!(entry.project(&[]), entry);
    }
}
