//! Resource instances.
//!
//! A [`Resource`] is an ordered field bag: field name to a JSON value. The
//! only fields the engine interprets are `type`, `name`, and whatever a
//! derivation rule or the type registry points it at; everything else is
//! carried through untouched and in input order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field holding a resource's registry type.
pub const TYPE_FIELD: &str = "type";
/// Field holding a resource's name.
pub const NAME_FIELD: &str = "name";
/// Control field consumed by count expansion.
pub const COUNT_FIELD: &str = "count";
/// Computed canonical identifier.
pub const SELF_LINK_FIELD: &str = "selfLink";

/// Collection keys with a well-known element kind.
///
/// Untyped items in these collections are still indexed under this kind so
/// that references and derivation rules can find them.
const COLLECTION_KINDS: &[(&str, &str)] = &[
    ("vpc", "vpc"),
    ("subnets", "subnetwork"),
    ("routers", "router"),
    ("firewalls", "firewall_rule"),
    ("addresses", "address"),
    ("forwardingRules", "forwardingrule"),
];

/// Default kind for untyped items of a project collection.
pub fn default_kind_for_collection(collection: &str) -> Option<&'static str> {
    COLLECTION_KINDS
        .iter()
        .find(|(key, _)| *key == collection)
        .map(|(_, kind)| *kind)
}

/// Strip a self-link down to the bare resource name.
///
/// `projects/p/global/networks/net` becomes `net`; bare names pass through.
pub fn bare_name(value: &str) -> &str {
    value.rsplit('/').next().unwrap_or(value)
}

/// A single resource instance inside a project collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(Map<String, Value>);

impl Resource {
    /// Create an empty resource.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Create a resource of the given type and name.
    pub fn typed(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        let mut resource = Self::new();
        resource.insert(TYPE_FIELD, type_name.into());
        resource.insert(NAME_FIELD, name.into());
        resource
    }

    /// Borrow the underlying field bag.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Mutably borrow the underlying field bag.
    pub fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// Consume the resource, returning its field bag.
    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    /// Registry type of this resource, if declared.
    pub fn type_name(&self) -> Option<&str> {
        self.str_field(TYPE_FIELD)
    }

    /// Name of this resource, if declared.
    pub fn name(&self) -> Option<&str> {
        self.str_field(NAME_FIELD)
    }

    /// Kind used for indexing: the declared type, else the collection default.
    pub fn kind<'a>(&'a self, collection: &str) -> Option<&'a str> {
        self.type_name()
            .or_else(|| default_kind_for_collection(collection))
    }

    /// Get a raw field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get a raw field mutably.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Whether the field exists (even when null).
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Non-empty string field.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// True only when the field is the JSON literal `true`.
    pub fn bool_field(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(Value::Bool(true)))
    }

    /// Whether the field is absent or null.
    pub fn is_unset(&self, key: &str) -> bool {
        matches!(self.0.get(key), None | Some(Value::Null))
    }

    /// String items of a list field; non-string items are ignored.
    pub fn string_list(&self, key: &str) -> Vec<String> {
        string_items(self.0.get(key))
    }

    /// String items of a list reached through nested objects, e.g. `tags.items`.
    pub fn nested_string_list(&self, path: &[&str]) -> Vec<String> {
        let Some((first, rest)) = path.split_first() else {
            return Vec::new();
        };
        let mut current = self.0.get(*first);
        for segment in rest {
            current = current.and_then(|v| v.get(*segment));
        }
        string_items(current)
    }

    /// Insert or overwrite a field, keeping its position if it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove a field, preserving the order of the remaining fields.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    /// Get (creating if needed) an object-valued field.
    ///
    /// A field holding anything other than an object is replaced.
    pub fn object_entry(&mut self, key: &str) -> &mut Map<String, Value> {
        object_entry(&mut self.0, key)
    }
}

impl From<Map<String, Value>> for Resource {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl From<Resource> for Value {
    fn from(resource: Resource) -> Self {
        Value::Object(resource.0)
    }
}

/// Get (creating if needed) an object-valued entry of a map.
pub(crate) fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(inner) => inner,
        _ => unreachable!("slot was just replaced with an object"),
    }
}

fn string_items(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}
