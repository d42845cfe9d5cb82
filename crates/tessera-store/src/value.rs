//! Field values and the delimited string-set representation.

use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::FieldKind;

/// Element separator in the stored form of a [`StringSet`].
const DELIMITER: char = ',';

/// Escape character; prefixes a literal delimiter or escape inside an element.
const ESCAPE: char = '\\';

/// A set of strings persisted as one delimited text column.
///
/// Elements are held sorted, so the stored form is canonical: equal sets
/// always serialize to identical text. Within an element the delimiter and
/// the escape character are backslash-escaped, which keeps the round trip
/// lossless for any element content. The empty string has no stored
/// representation and is rejected by [`StringSet::insert`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringSet {
    elements: BTreeSet<String>,
}

impl StringSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an element. Returns false for the empty string or an element
    /// already present.
    pub fn insert(&mut self, element: impl Into<String>) -> bool {
        let element = element.into();
        if element.is_empty() {
            return false;
        }
        self.elements.insert(element)
    }

    pub fn contains(&self, element: &str) -> bool {
        self.elements.contains(element)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterates elements in sorted order.
    pub fn iter(&self) -> btree_set::Iter<'_, String> {
        self.elements.iter()
    }

    /// Renders the canonical stored form: sorted elements, escaped, joined
    /// with the delimiter. The empty set renders as the empty string.
    pub fn to_delimited(&self) -> String {
        let mut out = String::new();
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                out.push(DELIMITER);
            }
            for c in element.chars() {
                if c == DELIMITER || c == ESCAPE {
                    out.push(ESCAPE);
                }
                out.push(c);
            }
        }
        out
    }

    /// Parses the stored form back into a set. Parsing is total: an escape
    /// takes the next character literally, a trailing escape stands for
    /// itself, and empty segments are dropped.
    pub fn from_delimited(text: &str) -> Self {
        let mut elements = BTreeSet::new();
        let mut current = String::new();
        let mut chars = text.chars();

        while let Some(c) = chars.next() {
            match c {
                ESCAPE => match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => current.push(ESCAPE),
                },
                DELIMITER => {
                    if !current.is_empty() {
                        elements.insert(std::mem::take(&mut current));
                    }
                }
                other => current.push(other),
            }
        }
        if !current.is_empty() {
            elements.insert(current);
        }

        Self { elements }
    }
}

impl fmt::Display for StringSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_delimited())
    }
}

impl<S: Into<String>> FromIterator<S> for StringSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for element in iter {
            set.insert(element);
        }
        set
    }
}

impl<'a> IntoIterator for &'a StringSet {
    type Item = &'a String;
    type IntoIter = btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

/// A single field's value in transit between an object and a row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i32),
    Long(i64),
    Boolean(bool),
    StringSet(StringSet),
}

impl FieldValue {
    /// The kind this value belongs to; checked against the declared column
    /// kind during encoding.
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Integer(_) => FieldKind::Integer,
            FieldValue::Long(_) => FieldKind::Long,
            FieldValue::Boolean(_) => FieldKind::Boolean,
            FieldValue::StringSet(_) => FieldKind::StringSet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_set_round_trips_through_empty_text() {
        let set = StringSet::new();
        assert_eq!(set.to_delimited(), "");
        assert_eq!(StringSet::from_delimited(""), set);
    }

    #[test]
    fn serialization_is_canonical() {
        let a: StringSet = ["y", "x"].into_iter().collect();
        let b: StringSet = ["x", "y"].into_iter().collect();
        assert_eq!(a.to_delimited(), "x,y");
        assert_eq!(a.to_delimited(), b.to_delimited());
    }

    #[test]
    fn delimiter_and_escape_characters_survive() {
        let set: StringSet = ["a,b", "c\\d", "\\,"].into_iter().collect();
        let text = set.to_delimited();
        assert_eq!(StringSet::from_delimited(&text), set);
    }

    #[test]
    fn escaped_text_parses_back_to_elements() {
        let parsed = StringSet::from_delimited("a\\,b,plain");
        assert!(parsed.contains("a,b"));
        assert!(parsed.contains("plain"));
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn empty_elements_are_rejected() {
        let mut set = StringSet::new();
        assert!(!set.insert(""));
        assert!(set.insert("x"));
        assert!(!set.insert("x"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn display_matches_stored_form() {
        let set: StringSet = ["x", "y"].into_iter().collect();
        assert_eq!(set.to_string(), set.to_delimited());
    }

    #[test]
    fn field_value_reports_its_kind() {
        assert_eq!(FieldValue::Text(String::new()).kind(), FieldKind::Text);
        assert_eq!(FieldValue::Integer(0).kind(), FieldKind::Integer);
        assert_eq!(FieldValue::Long(0).kind(), FieldKind::Long);
        assert_eq!(FieldValue::Boolean(false).kind(), FieldKind::Boolean);
        assert_eq!(
            FieldValue::StringSet(StringSet::new()).kind(),
            FieldKind::StringSet
        );
    }

    proptest! {
        #[test]
        fn round_trip_is_lossless(elements in prop::collection::btree_set("[a-z,\\\\]{1,8}", 0..8)) {
            let set: StringSet = elements.iter().cloned().collect();
            let text = set.to_delimited();
            prop_assert_eq!(StringSet::from_delimited(&text), set);
        }
    }
}
