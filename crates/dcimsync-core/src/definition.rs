//! Parsed definition documents and their component templates.

use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::kind::{ComponentKind, EntityKind};
use crate::schema::NormalizedPayload;
use crate::slug::model_slug;

/// Identifying metadata recorded by the progress ledger for a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionMeta {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub slug: Option<String>,
}

/// One hardware-type definition taken from a document.
#[derive(Debug, Clone)]
pub struct Definition {
    pub kind: EntityKind,
    pub fields: Map<String, Value>,
    /// Manufacturer used when the document names none, normally the
    /// library folder the document lives in.
    pub fallback_manufacturer: Option<String>,
    /// Where the definition came from, for log lines.
    pub source: String,
}

impl Definition {
    pub fn new(
        kind: EntityKind,
        fields: Map<String, Value>,
        source: impl Into<String>,
        fallback_manufacturer: Option<String>,
    ) -> Self {
        Self {
            kind,
            fields,
            fallback_manufacturer,
            source: source.into(),
        }
    }

    /// Split a parsed document into definitions. A document is either one
    /// mapping or a list of mappings; non-mapping list entries are ignored.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::EmptyDocument` for a null document or one without
    /// any mapping, `CoreError::InvalidDocument` for a scalar document.
    pub fn from_document(
        kind: EntityKind,
        document: Value,
        source: &str,
        fallback_manufacturer: Option<&str>,
    ) -> Result<Vec<Definition>> {
        let maps: Vec<Map<String, Value>> = match document {
            Value::Null => Vec::new(),
            Value::Object(map) => vec![map],
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect(),
            other => {
                return Err(CoreError::invalid_document(format!(
                    "{source}: expected a mapping, got {other}"
                )));
            }
        };

        if maps.is_empty() {
            return Err(CoreError::empty_document(source));
        }

        Ok(maps
            .into_iter()
            .map(|fields| {
                Definition::new(
                    kind,
                    fields,
                    source,
                    fallback_manufacturer.map(str::to_string),
                )
            })
            .collect())
    }

    /// Manufacturer named by the document, falling back to the folder name.
    pub fn manufacturer_name(&self) -> Option<String> {
        self.fields
            .get("manufacturer")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| self.fallback_manufacturer.clone())
    }

    pub fn model(&self) -> Option<String> {
        match self.fields.get("model")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Slug from the document, or one derived from manufacturer and model
    /// for kinds whose remote model carries a slug.
    pub fn slug(&self) -> Option<String> {
        if let Some(slug) = self
            .fields
            .get("slug")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
        {
            return Some(slug.to_string());
        }
        if !self.kind.has_slug() {
            return None;
        }
        Some(model_slug(&self.manufacturer_name()?, &self.model()?))
    }

    pub fn meta(&self) -> DefinitionMeta {
        DefinitionMeta {
            manufacturer: self.manufacturer_name(),
            model: self.model(),
            slug: self.slug(),
        }
    }

    /// Allow-listed payload for the parent entity. The manufacturer is still
    /// a name here; resolving it to an id is up to the caller.
    ///
    /// # Errors
    ///
    /// Propagates schema validation failures.
    pub fn payload(&self) -> Result<NormalizedPayload> {
        let mut payload = self.kind.schema().normalize(&self.fields)?;
        if self.kind.has_slug() && !payload.contains("slug") {
            if let Some(slug) = self.slug() {
                payload.insert("slug", Value::String(slug));
            }
        }
        Ok(payload)
    }

    /// Tag slugs declared by the document, as a list or a comma-separated string.
    pub fn declared_tags(&self) -> Vec<String> {
        match self.fields.get("tags") {
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|t| !t.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Component templates grouped by kind, in processing order regardless of
    /// the order sections appear in the document.
    pub fn components(&self) -> Vec<(ComponentKind, Vec<ComponentTemplate>)> {
        ComponentKind::PROCESSING_ORDER
            .into_iter()
            .filter_map(|kind| {
                let items = match self.fields.get(kind.section())? {
                    Value::Array(items) => items
                        .iter()
                        .filter_map(Value::as_object)
                        .cloned()
                        .collect::<Vec<_>>(),
                    Value::Object(map) => vec![map.clone()],
                    _ => Vec::new(),
                };
                if items.is_empty() {
                    return None;
                }
                let templates = items
                    .into_iter()
                    .map(|fields| ComponentTemplate { kind, fields })
                    .collect();
                Some((kind, templates))
            })
            .collect()
    }
}

/// One sub-template of a composite definition.
#[derive(Debug, Clone)]
pub struct ComponentTemplate {
    pub kind: ComponentKind,
    pub fields: Map<String, Value>,
}

impl ComponentTemplate {
    pub fn name(&self) -> Option<String> {
        match self.fields.get("name")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.fields.get("label").and_then(Value::as_str)
    }

    /// # Errors
    ///
    /// Propagates schema validation failures.
    pub fn payload(&self) -> Result<NormalizedPayload> {
        self.kind.schema().normalize(&self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_document_list_and_single() {
        let docs = Definition::from_document(
            EntityKind::DeviceType,
            json!([{"model": "A"}, "noise", {"model": "B"}]),
            "cisco/a.yaml",
            Some("Cisco"),
        )
        .unwrap();
        assert_eq!(docs.len(), 2);

        let docs =
            Definition::from_document(EntityKind::DeviceType, json!({"model": "A"}), "x", None)
                .unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn test_empty_document_is_validation_error() {
        let err = Definition::from_document(EntityKind::ModuleType, Value::Null, "empty.yaml", None)
            .unwrap_err();
        assert!(err.is_validation_error());

        let err = Definition::from_document(EntityKind::ModuleType, json!(42), "num.yaml", None)
            .unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_manufacturer_falls_back_to_folder() {
        let defs = Definition::from_document(
            EntityKind::ModuleType,
            json!({"model": "X"}),
            "Juniper/x.yaml",
            Some("Juniper"),
        )
        .unwrap();
        assert_eq!(defs[0].manufacturer_name().as_deref(), Some("Juniper"));

        let defs = Definition::from_document(
            EntityKind::ModuleType,
            json!({"model": "X", "manufacturer": "Juniper Networks"}),
            "Juniper/x.yaml",
            Some("Juniper"),
        )
        .unwrap();
        assert_eq!(
            defs[0].manufacturer_name().as_deref(),
            Some("Juniper Networks")
        );
    }

    #[test]
    fn test_slug_derivation() {
        let def = Definition::new(
            EntityKind::DeviceType,
            json!({"manufacturer": "Arista", "model": "DCS-7050SX-64"})
                .as_object()
                .cloned()
                .unwrap(),
            "arista.yaml",
            None,
        );
        assert_eq!(def.slug().as_deref(), Some("arista-dcs-7050sx-64"));
        assert_eq!(
            def.payload().unwrap().get_str("slug"),
            Some("arista-dcs-7050sx-64")
        );

        let module = Definition::new(
            EntityKind::ModuleType,
            json!({"manufacturer": "Arista", "model": "PWR-500"})
                .as_object()
                .cloned()
                .unwrap(),
            "arista.yaml",
            None,
        );
        assert_eq!(module.slug(), None);
        assert!(!module.payload().unwrap().contains("slug"));
    }

    #[test]
    fn test_components_follow_processing_order() {
        let def = Definition::new(
            EntityKind::DeviceType,
            json!({
                "model": "Patch Panel",
                "front-ports": [{"name": "F1", "rear_port": "R1", "type": "8p8c"}],
                "rear-ports": [{"name": "R1", "type": "8p8c"}],
                "interfaces": {"name": "mgmt0"}
            })
            .as_object()
            .cloned()
            .unwrap(),
            "panel.yaml",
            None,
        );
        let kinds: Vec<_> = def.components().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![
                ComponentKind::RearPorts,
                ComponentKind::Interfaces,
                ComponentKind::FrontPorts
            ]
        );
    }

    #[test]
    fn test_declared_tags() {
        let def = Definition::new(
            EntityKind::RackType,
            json!({"model": "R", "tags": "lab, core ,"}).as_object().cloned().unwrap(),
            "r.yaml",
            None,
        );
        assert_eq!(def.declared_tags(), vec!["lab", "core"]);
    }
}
