// Resource Descriptor Domain Model
//
// Wire format: JSON array of {"id": string, "value": string, "multiple": bool}

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::error::{DomainError, Result};

/// Resource identifier (not unique across descriptor entries)
pub type ResourceId = String;

const DESCRIPTOR_KEYS: [&str; 3] = ["id", "value", "multiple"];

/// One row of the descriptor wire protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub id: ResourceId,
    pub value: String,
    pub multiple: bool,
}

impl ResourceEntry {
    pub fn new(id: impl Into<String>, value: impl Into<String>, multiple: bool) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
            multiple,
        }
    }
}

/// Identifiers with platform-defined meaning, never handed to user code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaticResourceId {
    Opener,
    Datasamples,
    Chainkeys,
    Rank,
}

impl StaticResourceId {
    pub const ALL: [StaticResourceId; 4] = [
        StaticResourceId::Opener,
        StaticResourceId::Datasamples,
        StaticResourceId::Chainkeys,
        StaticResourceId::Rank,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StaticResourceId::Opener => "opener",
            StaticResourceId::Datasamples => "datasamples",
            StaticResourceId::Chainkeys => "chainkeys",
            StaticResourceId::Rank => "rank",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == id)
    }

    pub fn is_static(id: &str) -> bool {
        Self::from_id(id).is_some()
    }
}

impl fmt::Display for StaticResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lookup result: a single path for non-multiple ids, the ordered list otherwise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceValue {
    Single(String),
    Multiple(Vec<String>),
}

impl ResourceValue {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            ResourceValue::Single(value) => Some(value),
            ResourceValue::Multiple(_) => None,
        }
    }

    /// All bound values in descriptor order
    pub fn values(&self) -> &[String] {
        match self {
            ResourceValue::Single(value) => std::slice::from_ref(value),
            ResourceValue::Multiple(values) => values,
        }
    }
}

/// Accumulated values for one id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedResource {
    pub values: Vec<String>,
    pub multiple: bool,
}

impl AggregatedResource {
    pub fn value(&self) -> ResourceValue {
        if self.multiple {
            ResourceValue::Multiple(self.values.clone())
        } else {
            ResourceValue::Single(self.values.first().cloned().unwrap_or_default())
        }
    }
}

/// Parsed and validated descriptor, keyed by id in order of first appearance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskResources {
    order: Vec<ResourceId>,
    resources: HashMap<ResourceId, AggregatedResource>,
}

impl TaskResources {
    /// Parse a raw descriptor payload
    ///
    /// Backslashes are normalized to forward slashes before decoding. Shape
    /// validation covers the whole array before any resource is extracted.
    ///
    /// # Errors
    /// - `DomainError::MalformedDescriptor` if the payload is not an array of
    ///   `{id, value, multiple}` objects
    /// - `DomainError::MultiplicityViolation` if a non-multiple id is bound
    ///   more than once
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.replace('\\', "/");
        let document: Value = serde_json::from_str(&normalized)
            .map_err(|e| malformed(format!("invalid JSON: {}", e)))?;
        let entries = entries_from_value(&document)?;
        Self::from_entries(entries)
    }

    /// Accumulate entries by id, then check multiplicity over the full set
    pub fn from_entries(entries: impl IntoIterator<Item = ResourceEntry>) -> Result<Self> {
        let mut order: Vec<ResourceId> = Vec::new();
        let mut resources: HashMap<ResourceId, AggregatedResource> = HashMap::new();
        let mut conflicting: Vec<ResourceId> = Vec::new();

        for entry in entries {
            match resources.get_mut(&entry.id) {
                Some(existing) => {
                    if existing.multiple != entry.multiple && !conflicting.contains(&entry.id) {
                        conflicting.push(entry.id.clone());
                    }
                    existing.values.push(entry.value);
                }
                None => {
                    order.push(entry.id.clone());
                    resources.insert(
                        entry.id,
                        AggregatedResource {
                            values: vec![entry.value],
                            multiple: entry.multiple,
                        },
                    );
                }
            }
        }

        let violations: Vec<ResourceId> = order
            .iter()
            .filter(|id| {
                let resource = &resources[*id];
                conflicting.contains(*id) || (!resource.multiple && resource.values.len() != 1)
            })
            .cloned()
            .collect();

        if !violations.is_empty() {
            return Err(DomainError::MultiplicityViolation { ids: violations });
        }

        Ok(Self { order, resources })
    }

    pub fn get(&self, id: &str) -> Option<ResourceValue> {
        self.resources.get(id).map(AggregatedResource::value)
    }

    pub fn get_static(&self, id: StaticResourceId) -> Option<ResourceValue> {
        self.get(id.as_str())
    }

    /// Resources handed to user code: everything except the static ids
    pub fn dynamic_resources(&self) -> BTreeMap<String, ResourceValue> {
        self.iter()
            .filter(|(id, _)| !StaticResourceId::is_static(id))
            .map(|(id, resource)| (id.to_string(), resource.value()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AggregatedResource)> + '_ {
        self.order
            .iter()
            .map(move |id| (id.as_str(), &self.resources[id]))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Flatten back to wire entries, grouped by id in first-appearance order
    pub fn to_entries(&self) -> Vec<ResourceEntry> {
        self.iter()
            .flat_map(|(id, resource)| {
                resource
                    .values
                    .iter()
                    .map(move |value| ResourceEntry::new(id, value.clone(), resource.multiple))
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_entries())
    }
}

fn malformed(message: String) -> DomainError {
    DomainError::MalformedDescriptor(message)
}

fn entries_from_value(document: &Value) -> Result<Vec<ResourceEntry>> {
    let items = document.as_array().ok_or_else(|| {
        malformed(format!("expected a JSON array, found {}", kind_of(document)))
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| entry_from_value(index, item))
        .collect()
}

fn entry_from_value(index: usize, item: &Value) -> Result<ResourceEntry> {
    let object = item.as_object().ok_or_else(|| {
        malformed(format!(
            "entry {}: expected an object, found {}",
            index,
            kind_of(item)
        ))
    })?;

    if let Some(extra) = object
        .keys()
        .find(|key| !DESCRIPTOR_KEYS.contains(&key.as_str()))
    {
        return Err(malformed(format!("entry {}: unexpected key '{}'", index, extra)));
    }

    let id = string_field(index, object, "id")?;
    let value = string_field(index, object, "value")?;
    let multiple = match object.get("multiple") {
        Some(Value::Bool(flag)) => *flag,
        Some(other) => {
            return Err(malformed(format!(
                "entry {}: 'multiple' must be a boolean, found {}",
                index,
                kind_of(other)
            )))
        }
        None => return Err(malformed(format!("entry {}: missing key 'multiple'", index))),
    };

    Ok(ResourceEntry { id, value, multiple })
}

fn string_field(index: usize, object: &Map<String, Value>, key: &str) -> Result<String> {
    match object.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(malformed(format!(
            "entry {}: '{}' must be a string, found {}",
            index,
            key,
            kind_of(other)
        ))),
        None => Err(malformed(format!("entry {}: missing key '{}'", index, key))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_parse_accumulates_multiple_values_in_order() {
        let resources = TaskResources::parse(
            r#"[
                {"id": "datasamples", "value": "/data/b", "multiple": true},
                {"id": "model", "value": "/models/m.bin", "multiple": false},
                {"id": "datasamples", "value": "/data/a", "multiple": true}
            ]"#,
        )
        .unwrap();

        assert_eq!(resources.len(), 2);
        assert_eq!(resources.ids().collect::<Vec<_>>(), vec!["datasamples", "model"]);
        assert_eq!(
            resources.get("datasamples"),
            Some(ResourceValue::Multiple(vec![
                "/data/b".to_string(),
                "/data/a".to_string()
            ]))
        );
        assert_eq!(
            resources.get("model"),
            Some(ResourceValue::Single("/models/m.bin".to_string()))
        );
        assert_eq!(resources.get("missing"), None);
    }

    #[test]
    fn test_parse_empty_array() {
        let resources = TaskResources::parse("[]").unwrap();
        assert!(resources.is_empty());
        assert!(resources.dynamic_resources().is_empty());
    }

    #[test]
    fn test_backslashes_are_normalized() {
        let resources =
            TaskResources::parse(r#"[{"id": "model", "value": "C:\\models\\m", "multiple": false}]"#)
                .unwrap();

        assert_eq!(
            resources.get("model").unwrap().as_single(),
            Some("C://models//m")
        );
    }

    #[test]
    fn test_multiplicity_violation_lists_every_offending_id() {
        let err = TaskResources::parse(
            r#"[
                {"id": "model", "value": "a", "multiple": false},
                {"id": "model", "value": "b", "multiple": false},
                {"id": "ok", "value": "c", "multiple": true},
                {"id": "ok", "value": "d", "multiple": true},
                {"id": "perf", "value": "e", "multiple": false},
                {"id": "perf", "value": "f", "multiple": false}
            ]"#,
        )
        .unwrap_err();

        assert_eq!(
            err,
            DomainError::MultiplicityViolation {
                ids: vec!["model".to_string(), "perf".to_string()]
            }
        );
    }

    #[test]
    fn test_conflicting_multiplicity_flags_are_rejected() {
        let err = TaskResources::from_entries(vec![
            ResourceEntry::new("shared", "a", true),
            ResourceEntry::new("shared", "b", false),
        ])
        .unwrap_err();

        assert!(matches!(err, DomainError::MultiplicityViolation { ids } if ids == ["shared"]));
    }

    #[test]
    fn test_malformed_shapes() {
        let cases = [
            (r#"{"id": "a"}"#, "expected a JSON array"),
            (r#"["a"]"#, "entry 0: expected an object"),
            (r#"[{"id": "a", "value": "b"}]"#, "missing key 'multiple'"),
            (r#"[{"value": "b", "multiple": false}]"#, "missing key 'id'"),
            (r#"[{"id": 1, "value": "b", "multiple": false}]"#, "'id' must be a string"),
            (r#"[{"id": "a", "value": "b", "multiple": "yes"}]"#, "'multiple' must be a boolean"),
            (
                r#"[{"id": "a", "value": "b", "multiple": false, "extra": 1}]"#,
                "unexpected key 'extra'",
            ),
            ("not json", "invalid JSON"),
        ];

        for (raw, expected) in cases {
            let err = TaskResources::parse(raw).unwrap_err();
            assert!(
                matches!(&err, DomainError::MalformedDescriptor(msg) if msg.contains(expected)),
                "payload {} gave {:?}",
                raw,
                err
            );
        }
    }

    #[test]
    fn test_malformed_entry_fails_before_multiplicity_check() {
        let err = TaskResources::parse(
            r#"[
                {"id": "model", "value": "a", "multiple": false},
                {"id": "model", "value": "b", "multiple": false},
                {"id": "broken"}
            ]"#,
        )
        .unwrap_err();

        assert!(matches!(err, DomainError::MalformedDescriptor(_)));
    }

    #[test]
    fn test_dynamic_resources_exclude_static_ids() {
        let resources = TaskResources::from_entries(vec![
            ResourceEntry::new("opener", "/op/opener.rs", false),
            ResourceEntry::new("datasamples", "/data/1", true),
            ResourceEntry::new("chainkeys", "/keys", false),
            ResourceEntry::new("rank", "0", false),
            ResourceEntry::new("model", "/m", false),
            ResourceEntry::new("shared", "/s1", true),
        ])
        .unwrap();

        let dynamic = resources.dynamic_resources();
        assert_eq!(dynamic.keys().collect::<Vec<_>>(), vec!["model", "shared"]);
        assert_eq!(
            resources.get_static(StaticResourceId::Opener),
            Some(ResourceValue::Single("/op/opener.rs".to_string()))
        );
    }

    #[test]
    fn test_static_ids() {
        assert_eq!(
            StaticResourceId::from_id("datasamples"),
            Some(StaticResourceId::Datasamples)
        );
        assert!(StaticResourceId::is_static("rank"));
        assert!(!StaticResourceId::is_static("model"));
        assert_eq!(StaticResourceId::Chainkeys.to_string(), "chainkeys");
    }

    fn valid_entries() -> impl Strategy<Value = Vec<ResourceEntry>> {
        prop::collection::btree_map(
            "[a-f]{1,3}",
            (any::<bool>(), prop::collection::vec("[a-z0-9/._-]{1,12}", 1..4)),
            0..6,
        )
        .prop_map(|ids| {
            ids.into_iter()
                .flat_map(|(id, (multiple, values))| {
                    let keep = if multiple { values.len() } else { 1 };
                    values
                        .into_iter()
                        .take(keep)
                        .map(move |value| ResourceEntry::new(id.clone(), value, multiple))
                        .collect::<Vec<_>>()
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_serialize_then_parse_is_identity(entries in valid_entries()) {
            let resources = TaskResources::from_entries(entries).unwrap();
            let reparsed = TaskResources::parse(&resources.to_json().unwrap()).unwrap();
            prop_assert_eq!(reparsed, resources);
        }

        #[test]
        fn prop_repeated_single_id_always_violates(
            entries in valid_entries(),
            first in "[a-z]{1,6}",
            second in "[a-z]{1,6}",
        ) {
            let mut all = entries;
            all.push(ResourceEntry::new("zz_single", first, false));
            all.push(ResourceEntry::new("zz_single", second, false));

            let err = TaskResources::from_entries(all).unwrap_err();
            prop_assert!(
                matches!(err, DomainError::MultiplicityViolation { ref ids } if ids.contains(&"zz_single".to_string())),
                "expected MultiplicityViolation containing zz_single"
            );
        }
    }
}
