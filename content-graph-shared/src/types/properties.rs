use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ids::PropertyName;

/// A property value as it was serialized upstream, together with its type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedPropertyValue {
    pub value: serde_json::Value,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl SerializedPropertyValue {
    pub fn new(value: serde_json::Value, type_name: impl Into<String>) -> Self {
        Self {
            value,
            type_name: type_name.into(),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(serde_json::Value::String(value.into()), "string")
    }
}

/// The property bag of a node record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerializedPropertyValues(BTreeMap<PropertyName, SerializedPropertyValue>);

impl SerializedPropertyValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<PropertyName>, value: SerializedPropertyValue) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&SerializedPropertyValue> {
        self.0.get(&PropertyName::new(name))
    }

    /// Overwrites existing values with the ones in `other`; untouched
    /// properties are kept.
    pub fn merge(&mut self, other: &SerializedPropertyValues) {
        for (name, value) in &other.0 {
            self.0.insert(name.clone(), value.clone());
        }
    }

    pub fn unset<'a, I>(&mut self, names: I)
    where
        I: IntoIterator<Item = &'a PropertyName>,
    {
        for name in names {
            self.0.remove(name);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyName, &SerializedPropertyValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overwrites_and_keeps_untouched() {
        let mut values = SerializedPropertyValues::new()
            .with("title", SerializedPropertyValue::string("Old"))
            .with("text", SerializedPropertyValue::string("Body"));

        values.merge(
            &SerializedPropertyValues::new()
                .with("title", SerializedPropertyValue::string("New"))
                .with("uriPathSegment", SerializedPropertyValue::string("new")),
        );

        assert_eq!(values.len(), 3);
        assert_eq!(values.get("title").unwrap().value, "New");
        assert_eq!(values.get("text").unwrap().value, "Body");
    }

    #[test]
    fn test_unset_removes_named_properties() {
        let mut values = SerializedPropertyValues::new()
            .with("title", SerializedPropertyValue::string("Title"))
            .with("text", SerializedPropertyValue::string("Body"));

        values.unset(&[PropertyName::new("text"), PropertyName::new("missing")]);

        assert_eq!(values.len(), 1);
        assert!(values.get("text").is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let values = SerializedPropertyValues::new()
            .with("title", SerializedPropertyValue::string("Hello"));
        assert_eq!(
            serde_json::to_value(&values).unwrap(),
            serde_json::json!({"title": {"value": "Hello", "type": "string"}})
        );
    }
}
