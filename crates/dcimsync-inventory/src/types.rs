//! Types exchanged with the remote inventory.

use dcimsync_core::{ComponentKind, EntityKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::InventoryError;

/// A collection on the remote inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Manufacturers,
    Tags,
    Entity(EntityKind),
    Component(ComponentKind),
}

impl Endpoint {
    /// API path relative to the API root, e.g. `dcim/device-types`.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Manufacturers => "dcim/manufacturers",
            Self::Tags => "extras/tags",
            Self::Entity(EntityKind::DeviceType) => "dcim/device-types",
            Self::Entity(EntityKind::ModuleType) => "dcim/module-types",
            Self::Entity(EntityKind::RackType) => "dcim/rack-types",
            Self::Component(kind) => match kind {
                ComponentKind::ConsolePorts => "dcim/console-port-templates",
                ComponentKind::ConsoleServerPorts => "dcim/console-server-port-templates",
                ComponentKind::PowerPorts => "dcim/power-port-templates",
                ComponentKind::PowerOutlets => "dcim/power-outlet-templates",
                ComponentKind::Interfaces => "dcim/interface-templates",
                ComponentKind::RearPorts => "dcim/rear-port-templates",
                ComponentKind::FrontPorts => "dcim/front-port-templates",
                ComponentKind::ModuleBays => "dcim/module-bay-templates",
                ComponentKind::DeviceBays => "dcim/device-bay-templates",
                ComponentKind::InventoryItems => "dcim/inventory-item-templates",
            },
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Query criteria, sent as `key=value` pairs in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    pub pairs: Vec<(String, String)>,
}

impl Criteria {
    /// Creates empty criteria.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `key=value` condition.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.pairs.push((key.into(), value.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{}", rendered.join("&"))
    }
}

/// A record as seen through the inventory API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEntity {
    pub id: u64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RemoteEntity {
    pub fn new(id: u64, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    /// Build from a JSON record that carries a numeric `id`.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::InvalidResponse` if the value is not an object
    /// with an unsigned integer `id`.
    pub fn from_value(value: Value) -> Result<Self, InventoryError> {
        let Value::Object(mut fields) = value else {
            return Err(InventoryError::invalid_response("record is not an object"));
        };
        let id = fields
            .remove("id")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| InventoryError::invalid_response("record has no numeric id"))?;
        Ok(Self { id, fields })
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Field value with nested objects collapsed to their identity: a
    /// related record becomes its `id`, a choice becomes its `value`.
    pub fn scalar(&self, name: &str) -> Option<Value> {
        if name == "id" {
            return Some(Value::from(self.id));
        }
        self.fields.get(name).map(collapse)
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    pub fn slug(&self) -> Option<&str> {
        self.str_field("slug")
    }

    /// Id of a related record stored under `field`, nested or flat.
    pub fn reference_id(&self, field: &str) -> Option<u64> {
        self.scalar(field).and_then(|v| v.as_u64())
    }

    /// Ids of the attached tags. Tags may be listed as nested records or ids.
    pub fn tag_ids(&self) -> Vec<u64> {
        self.fields
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(|t| collapse(t).as_u64()).collect())
            .unwrap_or_default()
    }

    pub fn to_value(&self) -> Value {
        let mut map = self.fields.clone();
        map.insert("id".to_string(), Value::from(self.id));
        Value::Object(map)
    }
}

/// Collapse a nested related record or choice to its identity.
pub fn collapse(value: &Value) -> Value {
    match value {
        Value::Object(map) => map
            .get("id")
            .or_else(|| map.get("value"))
            .cloned()
            .unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

/// Outcome of a lookup: found, confirmed absent, or unknown because the
/// lookup itself failed. Only `NotFound` licenses a create.
#[derive(Debug, Clone)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Failed(InventoryError),
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// # Errors
    ///
    /// Returns the lookup failure, if any.
    pub fn into_result(self) -> Result<Option<T>, InventoryError> {
        match self {
            Self::Found(value) => Ok(Some(value)),
            Self::NotFound => Ok(None),
            Self::Failed(err) => Err(err),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Found(value) => Lookup::Found(f(value)),
            Self::NotFound => Lookup::NotFound,
            Self::Failed(err) => Lookup::Failed(err),
        }
    }
}

impl<T> From<Result<Option<T>, InventoryError>> for Lookup<T> {
    fn from(result: Result<Option<T>, InventoryError>) -> Self {
        match result {
            Ok(Some(value)) => Self::Found(value),
            Ok(None) => Self::NotFound,
            Err(err) => Self::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(
            Endpoint::Entity(EntityKind::RackType).path(),
            "dcim/rack-types"
        );
        assert_eq!(
            Endpoint::Component(ComponentKind::FrontPorts).path(),
            "dcim/front-port-templates"
        );
        assert_eq!(Endpoint::Tags.to_string(), "extras/tags");
    }

    #[test]
    fn test_criteria_display() {
        let criteria = Criteria::new().with("name", "eth0").with("device_type_id", 7);
        assert_eq!(criteria.to_string(), "name=eth0&device_type_id=7");
    }

    #[test]
    fn test_remote_entity_from_value() {
        let entity = RemoteEntity::from_value(json!({
            "id": 12,
            "model": "C9300",
            "manufacturer": {"id": 3, "name": "Cisco", "slug": "cisco"},
            "airflow": {"value": "front-to-rear", "label": "Front to rear"},
            "tags": [{"id": 1, "slug": "valid"}, 5]
        }))
        .unwrap();
        assert_eq!(entity.id, 12);
        assert_eq!(entity.reference_id("manufacturer"), Some(3));
        assert_eq!(entity.scalar("airflow"), Some(json!("front-to-rear")));
        assert_eq!(entity.tag_ids(), vec![1, 5]);
        assert_eq!(entity.scalar("id"), Some(json!(12)));

        assert!(RemoteEntity::from_value(json!({"model": "x"})).is_err());
        assert!(RemoteEntity::from_value(json!([1])).is_err());
    }

    #[test]
    fn test_lookup_from_result() {
        let found: Lookup<u64> = Ok(Some(1)).into();
        assert!(found.is_found());
        let absent: Lookup<u64> = Ok(None).into();
        assert!(absent.is_not_found());
        let failed: Lookup<u64> = Err(InventoryError::connection("down")).into();
        assert!(failed.into_result().is_err());
    }
}
