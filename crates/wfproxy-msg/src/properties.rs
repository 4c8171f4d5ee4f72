//! ---
//! wfp_section: "02-messaging-ipc-data-model"
//! wfp_subsection: "module"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "String-keyed property storage underneath every proxy message."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Raised when stored property text cannot be read back as the requested type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    /// The stored text is not a valid rendering of the requested type.
    #[error("property `{key}` holds {value:?}, which is not a valid {expected}")]
    Format {
        /// Property key.
        key: String,
        /// Name of the requested logical type.
        expected: &'static str,
        /// Offending stored text.
        value: String,
    },
}

/// Renders a value into its canonical property text.
pub trait ToProperty {
    /// Canonical text representation stored in the bag.
    fn to_property(&self) -> String;
}

/// Parses a value back out of its canonical property text.
pub trait FromProperty: Sized {
    /// Logical type name reported in format errors.
    const TYPE_NAME: &'static str;

    /// Parse the canonical text. `None` signals a format error.
    fn from_property(text: &str) -> Option<Self>;
}

impl ToProperty for str {
    fn to_property(&self) -> String {
        self.to_owned()
    }
}

impl ToProperty for String {
    fn to_property(&self) -> String {
        self.clone()
    }
}

impl FromProperty for String {
    const TYPE_NAME: &'static str = "string";

    fn from_property(text: &str) -> Option<Self> {
        Some(text.to_owned())
    }
}

impl ToProperty for bool {
    fn to_property(&self) -> String {
        let text = if *self { "true" } else { "false" };
        text.to_owned()
    }
}

impl FromProperty for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn from_property(text: &str) -> Option<Self> {
        match text {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }
}

impl ToProperty for i64 {
    fn to_property(&self) -> String {
        self.to_string()
    }
}

impl FromProperty for i64 {
    const TYPE_NAME: &'static str = "64-bit integer";

    fn from_property(text: &str) -> Option<Self> {
        text.parse().ok()
    }
}

// Durations travel as whole nanoseconds.
impl ToProperty for Duration {
    fn to_property(&self) -> String {
        self.as_nanos().to_string()
    }
}

impl FromProperty for Duration {
    const TYPE_NAME: &'static str = "duration";

    fn from_property(text: &str) -> Option<Self> {
        let nanos: u128 = text.parse().ok()?;
        let secs = u64::try_from(nanos / 1_000_000_000).ok()?;
        let subsec = (nanos % 1_000_000_000) as u32;
        Some(Duration::new(secs, subsec))
    }
}

impl ToProperty for [u8] {
    fn to_property(&self) -> String {
        STANDARD.encode(self)
    }
}

impl ToProperty for Vec<u8> {
    fn to_property(&self) -> String {
        STANDARD.encode(self)
    }
}

impl FromProperty for Vec<u8> {
    const TYPE_NAME: &'static str = "byte array";

    fn from_property(text: &str) -> Option<Self> {
        STANDARD.decode(text).ok()
    }
}

/// Mapping from property key to canonical text.
///
/// A key is either present with a value or absent; setting `None` removes
/// the key, so "not configured" never collapses into "configured to the
/// zero value". Keys iterate in lexicographic order, which keeps the wire
/// encoding canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyBag {
    values: BTreeMap<String, String>,
}

impl PropertyBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a typed property. Unset keys yield `Ok(None)`, never a default.
    pub fn get<T: FromProperty>(&self, key: &str) -> Result<Option<T>, PropertyError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(text) => T::from_property(text)
                .map(Some)
                .ok_or_else(|| PropertyError::Format {
                    key: key.to_owned(),
                    expected: T::TYPE_NAME,
                    value: text.clone(),
                }),
        }
    }

    /// Write a typed property; `None` clears the key.
    pub fn set<T: ToProperty + ?Sized>(&mut self, key: &str, value: Option<&T>) {
        match value {
            Some(value) => {
                self.values.insert(key.to_owned(), value.to_property());
            }
            None => {
                self.values.remove(key);
            }
        }
    }

    /// Borrow the raw stored text for a key.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Store raw text without going through a typed setter. Used by the decoder.
    pub fn insert_text(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.values.insert(key.into(), text.into());
    }

    /// Whether the key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Copy `key` into `target` exactly as stored, or remove it from
    /// `target` when absent here. Unparsable text is carried unchanged.
    pub fn copy_key(&self, key: &str, target: &mut PropertyBag) {
        match self.values.get(key) {
            Some(text) => {
                target.values.insert(key.to_owned(), text.clone());
            }
            None => {
                target.values.remove(key);
            }
        }
    }

    /// Number of present keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no key is present.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate present entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.values.iter()
    }
}

impl<'a> IntoIterator for &'a PropertyBag {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.values {
            writeln!(f, "    {key}: {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_empty_are_distinct() {
        let mut bag = PropertyBag::new();
        assert_eq!(bag.get::<String>("Name").unwrap(), None);

        bag.set("Name", Some(""));
        assert_eq!(bag.get::<String>("Name").unwrap(), Some(String::new()));
        assert!(bag.contains("Name"));

        bag.set::<str>("Name", None);
        assert_eq!(bag.get::<String>("Name").unwrap(), None);
        assert!(!bag.contains("Name"));
    }

    #[test]
    fn zero_values_stay_present() {
        let mut bag = PropertyBag::new();
        bag.set("Count", Some(&0i64));
        bag.set("Flag", Some(&false));
        bag.set("Wait", Some(&Duration::ZERO));
        assert_eq!(bag.get::<i64>("Count").unwrap(), Some(0));
        assert_eq!(bag.get::<bool>("Flag").unwrap(), Some(false));
        assert_eq!(bag.get::<Duration>("Wait").unwrap(), Some(Duration::ZERO));
    }

    #[test]
    fn typed_values_use_canonical_text() {
        let mut bag = PropertyBag::new();
        bag.set("Timeout", Some(&Duration::from_millis(1500)));
        bag.set("Payload", Some(&b"hi"[..]));
        bag.set("Id", Some(&-42i64));
        assert_eq!(bag.text("Timeout"), Some("1500000000"));
        assert_eq!(bag.text("Payload"), Some("aGk="));
        assert_eq!(bag.text("Id"), Some("-42"));
        assert_eq!(
            bag.get::<Duration>("Timeout").unwrap(),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(bag.get::<Vec<u8>>("Payload").unwrap(), Some(b"hi".to_vec()));
    }

    #[test]
    fn unparsable_text_is_a_format_error_for_that_key_only() {
        let mut bag = PropertyBag::new();
        bag.insert_text("Port", "seventy");
        bag.insert_text("Flag", "true");

        let err = bag.get::<i64>("Port").unwrap_err();
        assert_eq!(
            err,
            PropertyError::Format {
                key: "Port".into(),
                expected: "64-bit integer",
                value: "seventy".into(),
            }
        );
        assert_eq!(bag.get::<bool>("Flag").unwrap(), Some(true));
        assert!(bag.get::<bool>("Port").is_err());
        assert!(bag.get::<Vec<u8>>("Port").is_err());
    }

    #[test]
    fn iteration_is_sorted_by_key() {
        let mut bag = PropertyBag::new();
        bag.set("b", Some("2"));
        bag.set("a", Some("1"));
        bag.set("c", Some("3"));
        let keys: Vec<_> = bag.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["a", "b", "c"]);
    }

    #[test]
    fn copy_key_carries_raw_text_and_absence() {
        let mut source = PropertyBag::new();
        source.insert_text("Port", "seventy");
        let mut target = PropertyBag::new();
        target.set("Port", Some(&7i64));
        target.set("Flag", Some(&true));

        source.copy_key("Port", &mut target);
        source.copy_key("Flag", &mut target);
        assert_eq!(target.text("Port"), Some("seventy"));
        assert_eq!(target.get::<i64>("Port"), source.get::<i64>("Port"));
        assert!(!target.contains("Flag"));
    }
}
