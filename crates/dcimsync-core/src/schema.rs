//! Field schemas for every entity and component kind.
//!
//! A schema is the allow-list of fields forwarded to the inventory for one
//! kind. Each field carries whether it is required, how its value is
//! normalized and an optional default. Fields outside the schema are dropped
//! when a payload is built.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::kind::{ComponentKind, EntityKind};

/// How a raw document value is turned into a payload value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    /// Forwarded unchanged.
    Verbatim,
    /// `true`/`yes`/`1` (any case) and non-zero numbers become `true`,
    /// everything else `false`.
    Boolean,
    /// Scalars are rendered as strings (`1` becomes `"1"`).
    Text,
}

/// Value used when the document omits a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    Integer(i64),
    Bool(bool),
    Text(&'static str),
}

impl FieldDefault {
    fn to_value(self) -> Value {
        match self {
            Self::Integer(n) => Value::from(n),
            Self::Bool(b) => Value::Bool(b),
            Self::Text(s) => Value::String(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub normalizer: Normalizer,
    pub default: Option<FieldDefault>,
}

const fn field(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        required: false,
        normalizer: Normalizer::Verbatim,
        default: None,
    }
}

const fn required(name: &'static str, normalizer: Normalizer) -> FieldSpec {
    FieldSpec {
        name,
        required: true,
        normalizer,
        default: None,
    }
}

const fn boolean(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        required: false,
        normalizer: Normalizer::Boolean,
        default: None,
    }
}

const fn text(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        required: false,
        normalizer: Normalizer::Text,
        default: None,
    }
}

const fn defaulted(name: &'static str, default: FieldDefault) -> FieldSpec {
    FieldSpec {
        name,
        required: false,
        normalizer: Normalizer::Verbatim,
        default: Some(default),
    }
}

/// Where a named cross-reference inside a component template points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefTarget {
    Component(ComponentKind),
    Manufacturer,
}

#[derive(Debug, Clone, Copy)]
pub struct ReferenceSpec {
    pub field: &'static str,
    pub target: RefTarget,
    /// Unresolvable required references fail the template; optional ones are
    /// dropped from the payload.
    pub required: bool,
}

/// Allow-list for one kind.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub kind: &'static str,
    pub fields: &'static [FieldSpec],
    pub references: &'static [ReferenceSpec],
}

const DEVICE_TYPE_FIELDS: &[FieldSpec] = &[
    field("manufacturer"),
    required("model", Normalizer::Text),
    field("slug"),
    field("u_height"),
    field("part_number"),
    boolean("exclude_from_utilization"),
    boolean("is_full_depth"),
    field("subdevice_role"),
    field("airflow"),
    field("description"),
    field("weight"),
    field("weight_unit"),
    field("comments"),
];

const MODULE_TYPE_FIELDS: &[FieldSpec] = &[
    field("manufacturer"),
    required("model", Normalizer::Text),
    field("part_number"),
    field("airflow"),
    field("description"),
    field("weight"),
    field("weight_unit"),
    field("comments"),
];

const RACK_TYPE_FIELDS: &[FieldSpec] = &[
    field("id"),
    field("manufacturer"),
    required("model", Normalizer::Text),
    field("slug"),
    field("width"),
    field("u_height"),
    field("form_factor"),
    field("starting_unit"),
    boolean("desc_units"),
    field("outer_width"),
    field("outer_height"),
    field("outer_depth"),
    field("outer_unit"),
    field("mounting_depth"),
    field("weight"),
    field("max_weight"),
    field("weight_unit"),
    field("description"),
    field("comments"),
    field("tags"),
];

const NAMED_FIELDS: &[FieldSpec] = &[
    required("name", Normalizer::Text),
    field("label"),
    field("type"),
];

const POWER_PORT_FIELDS: &[FieldSpec] = &[
    required("name", Normalizer::Text),
    field("label"),
    field("type"),
    field("maximum_draw"),
    field("allocated_draw"),
];

const POWER_OUTLET_FIELDS: &[FieldSpec] = &[
    required("name", Normalizer::Text),
    field("label"),
    field("type"),
    text("power_port"),
    field("feed_leg"),
];

const INTERFACE_FIELDS: &[FieldSpec] = &[
    required("name", Normalizer::Text),
    field("label"),
    field("type"),
    boolean("mgmt_only"),
    field("poe_mode"),
    field("poe_type"),
];

const REAR_PORT_FIELDS: &[FieldSpec] = &[
    required("name", Normalizer::Text),
    field("label"),
    field("type"),
    field("positions"),
];

const FRONT_PORT_FIELDS: &[FieldSpec] = &[
    required("name", Normalizer::Text),
    field("label"),
    field("type"),
    text("rear_port"),
    defaulted("rear_port_position", FieldDefault::Integer(1)),
];

const BAY_FIELDS: &[FieldSpec] = &[
    required("name", Normalizer::Text),
    field("label"),
    text("position"),
];

const INVENTORY_ITEM_FIELDS: &[FieldSpec] = &[
    required("name", Normalizer::Text),
    field("label"),
    field("manufacturer"),
    field("part_id"),
];

const NO_REFS: &[ReferenceSpec] = &[];

const POWER_OUTLET_REFS: &[ReferenceSpec] = &[ReferenceSpec {
    field: "power_port",
    target: RefTarget::Component(ComponentKind::PowerPorts),
    required: false,
}];

const FRONT_PORT_REFS: &[ReferenceSpec] = &[ReferenceSpec {
    field: "rear_port",
    target: RefTarget::Component(ComponentKind::RearPorts),
    required: true,
}];

const INVENTORY_ITEM_REFS: &[ReferenceSpec] = &[ReferenceSpec {
    field: "manufacturer",
    target: RefTarget::Manufacturer,
    required: false,
}];

impl EntityKind {
    pub fn schema(&self) -> Schema {
        let fields = match self {
            Self::DeviceType => DEVICE_TYPE_FIELDS,
            Self::ModuleType => MODULE_TYPE_FIELDS,
            Self::RackType => RACK_TYPE_FIELDS,
        };
        Schema {
            kind: self.as_str(),
            fields,
            references: NO_REFS,
        }
    }
}

impl ComponentKind {
    pub fn schema(&self) -> Schema {
        let (fields, references) = match self {
            Self::ConsolePorts | Self::ConsoleServerPorts => (NAMED_FIELDS, NO_REFS),
            Self::PowerPorts => (POWER_PORT_FIELDS, NO_REFS),
            Self::PowerOutlets => (POWER_OUTLET_FIELDS, POWER_OUTLET_REFS),
            Self::Interfaces => (INTERFACE_FIELDS, NO_REFS),
            Self::RearPorts => (REAR_PORT_FIELDS, NO_REFS),
            Self::FrontPorts => (FRONT_PORT_FIELDS, FRONT_PORT_REFS),
            Self::ModuleBays | Self::DeviceBays => (BAY_FIELDS, NO_REFS),
            Self::InventoryItems => (INVENTORY_ITEM_FIELDS, INVENTORY_ITEM_REFS),
        };
        Schema {
            kind: self.section(),
            fields,
            references,
        }
    }

    /// Component kinds this kind refers to by name.
    pub fn referenced_kinds(&self) -> Vec<ComponentKind> {
        self.schema()
            .references
            .iter()
            .filter_map(|r| match r.target {
                RefTarget::Component(kind) => Some(kind),
                RefTarget::Manufacturer => None,
            })
            .collect()
    }
}

impl Schema {
    pub fn allows(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.name == field)
    }

    /// Build the allow-listed payload for a raw document mapping.
    ///
    /// Unknown keys and `null` values are dropped, values pass through their
    /// field's normalizer and defaults fill omitted fields.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::MissingField` when a required field is absent.
    pub fn normalize(&self, raw: &Map<String, Value>) -> Result<NormalizedPayload> {
        let mut payload = Map::new();
        for spec in self.fields {
            match raw.get(spec.name).filter(|v| !v.is_null()) {
                Some(value) => {
                    let normalized = normalize_value(spec, value)?;
                    payload.insert(spec.name.to_string(), normalized);
                }
                None if spec.required => {
                    return Err(CoreError::missing_field(self.kind, spec.name));
                }
                None => {
                    if let Some(default) = spec.default {
                        payload.insert(spec.name.to_string(), default.to_value());
                    }
                }
            }
        }
        Ok(NormalizedPayload(payload))
    }
}

fn normalize_value(spec: &FieldSpec, value: &Value) -> Result<Value> {
    match spec.normalizer {
        Normalizer::Verbatim => Ok(value.clone()),
        Normalizer::Boolean => Ok(Value::Bool(parse_bool(value))),
        Normalizer::Text => match value {
            Value::String(s) => Ok(Value::String(s.clone())),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            other => Err(CoreError::invalid_field(
                spec.name,
                format!("expected a scalar, got {other}"),
            )),
        },
    }
}

/// Interpret a loosely typed boolean from a definition document.
pub fn parse_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
        _ => false,
    }
}

/// A payload restricted to one kind's allow-list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedPayload(Map<String, Value>);

impl NormalizedPayload {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for NormalizedPayload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
