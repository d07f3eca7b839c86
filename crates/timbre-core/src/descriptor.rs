use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;

/// A single descriptor value as reported by an analysis engine.
///
/// Most descriptors are numeric (tempo, energy, ...). A few are categorical,
/// such as the detected key ("A") or scale ("minor").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DescriptorValue {
    Number(f64),
    Text(String),
}

impl DescriptorValue {
    /// The numeric reading of this value, if it has one.
    ///
    /// Text values that look like a number ("120.5") are parsed. Non-finite
    /// numbers are treated as having no numeric reading.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value).filter(|v| v.is_finite()),
            Self::Text(text) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Text(text) => Some(text),
        }
    }
}

impl fmt::Display for DescriptorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for DescriptorValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<f32> for DescriptorValue {
    fn from(value: f32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for DescriptorValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DescriptorValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Named measurements describing one audio item.
///
/// Produced by an analysis engine. A set may be incomplete or carry
/// descriptors that the feature vector ignores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DescriptorSet(BTreeMap<String, DescriptorValue>);

impl DescriptorSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a descriptor set from a JSON object such as
    /// `{"tempo": 120.0, "key": "A"}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<DescriptorValue>) {
        self.0.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<DescriptorValue>) -> Self {
        self.insert(name, value);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DescriptorValue> {
        self.0.get(name)
    }

    /// The numeric reading of a descriptor, if present and numeric.
    #[must_use]
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(DescriptorValue::as_number)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DescriptorValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Keep only the named descriptors.
    pub fn retain_names<S: AsRef<str>>(&mut self, names: &[S]) {
        self.0
            .retain(|name, _| names.iter().any(|wanted| wanted.as_ref() == name));
    }

    /// Render every value as a string, the shape remote callers receive.
    #[must_use]
    pub fn to_string_map(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for DescriptorSet
where
    K: Into<String>,
    V: Into<DescriptorValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

impl IntoIterator for DescriptorSet {
    type Item = (String, DescriptorValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, DescriptorValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_value() {
        let value = DescriptorValue::from(120.0);
        assert_eq!(value.as_number(), Some(120.0));
        assert!(value.as_text().is_none());
    }

    #[test]
    fn test_numeric_text_value() {
        assert_eq!(DescriptorValue::from("0.75").as_number(), Some(0.75));
        assert_eq!(DescriptorValue::from(" 128 ").as_number(), Some(128.0));
        assert_eq!(DescriptorValue::from("1e-05").as_number(), Some(1e-5));
        assert_eq!(DescriptorValue::from("+3").as_number(), Some(3.0));
    }

    #[test]
    fn test_categorical_text_value() {
        let value = DescriptorValue::from("A minor");
        assert!(value.as_number().is_none());
        assert_eq!(value.as_text(), Some("A minor"));
    }

    #[test]
    fn test_non_finite_values_have_no_number() {
        assert!(DescriptorValue::from(f64::NAN).as_number().is_none());
        assert!(DescriptorValue::from(f64::INFINITY).as_number().is_none());
        assert!(DescriptorValue::from("inf").as_number().is_none());
        assert!(DescriptorValue::from("NaN").as_number().is_none());
    }

    #[test]
    fn test_from_json_mixed_values() {
        let set =
            DescriptorSet::from_json_str(r#"{"tempo": 120, "key": "A", "energy": "0.5"}"#).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.number("tempo"), Some(120.0));
        assert_eq!(set.number("energy"), Some(0.5));
        assert!(set.number("key").is_none());
        assert_eq!(set.get("key").and_then(DescriptorValue::as_text), Some("A"));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(DescriptorSet::from_json_str("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_retain_names() {
        let mut set = DescriptorSet::new()
            .with("tempo", 120.0)
            .with("energy", 0.7)
            .with("key", "C");
        set.retain_names(&["tempo", "key"]);
        assert_eq!(set.len(), 2);
        assert!(set.get("energy").is_none());
    }

    #[test]
    fn test_to_string_map() {
        let set = DescriptorSet::new().with("tempo", 120.5).with("scale", "major");
        let map = set.to_string_map();
        assert_eq!(map.get("tempo").map(String::as_str), Some("120.5"));
        assert_eq!(map.get("scale").map(String::as_str), Some("major"));
    }

    #[test]
    fn test_collect_from_pairs() {
        let set: DescriptorSet = vec![("tempo", 90.0), ("energy", 0.2)].into_iter().collect();
        assert_eq!(set.number("tempo"), Some(90.0));
        assert_eq!(set.len(), 2);
    }
}
