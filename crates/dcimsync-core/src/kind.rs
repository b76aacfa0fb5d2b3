use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Top-level hardware type reconciled against the inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    DeviceType,
    ModuleType,
    RackType,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [Self::DeviceType, Self::ModuleType, Self::RackType];

    /// Library directory and CLI name, e.g. `device-types`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeviceType => "device-types",
            Self::ModuleType => "module-types",
            Self::RackType => "rack-types",
        }
    }

    /// Key under which the progress ledger stores its items.
    pub fn ledger_key(&self) -> &'static str {
        match self {
            Self::DeviceType => "device_types",
            Self::ModuleType => "module_types",
            Self::RackType => "rack_types",
        }
    }

    /// Human label used in log lines and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DeviceType => "DeviceType",
            Self::ModuleType => "ModuleType",
            Self::RackType => "RackType",
        }
    }

    /// Field that ties a component template to its parent of this kind.
    /// Rack types carry no component templates.
    pub fn parent_field(&self) -> Option<&'static str> {
        match self {
            Self::DeviceType => Some("device_type"),
            Self::ModuleType => Some("module_type"),
            Self::RackType => None,
        }
    }

    /// Whether the remote model has a `slug` field.
    pub fn has_slug(&self) -> bool {
        !matches!(self, Self::ModuleType)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "device-types" | "device-type" | "device_types" => Ok(Self::DeviceType),
            "module-types" | "module-type" | "module_types" => Ok(Self::ModuleType),
            "rack-types" | "rack-type" | "rack_types" => Ok(Self::RackType),
            other => Err(CoreError::unknown_entity_kind(other)),
        }
    }
}

/// Sub-template section of a composite definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    ConsolePorts,
    ConsoleServerPorts,
    PowerPorts,
    PowerOutlets,
    Interfaces,
    RearPorts,
    FrontPorts,
    ModuleBays,
    DeviceBays,
    InventoryItems,
}

impl ComponentKind {
    /// Order in which sections are synchronized. Every kind that another
    /// kind can reference appears before the referencing kind.
    pub const PROCESSING_ORDER: [ComponentKind; 10] = [
        Self::RearPorts,
        Self::PowerPorts,
        Self::ConsolePorts,
        Self::ConsoleServerPorts,
        Self::PowerOutlets,
        Self::Interfaces,
        Self::FrontPorts,
        Self::ModuleBays,
        Self::DeviceBays,
        Self::InventoryItems,
    ];

    /// Section key in a definition document.
    pub fn section(&self) -> &'static str {
        match self {
            Self::ConsolePorts => "console-ports",
            Self::ConsoleServerPorts => "console-server-ports",
            Self::PowerPorts => "power-ports",
            Self::PowerOutlets => "power-outlets",
            Self::Interfaces => "interfaces",
            Self::RearPorts => "rear-ports",
            Self::FrontPorts => "front-ports",
            Self::ModuleBays => "module-bays",
            Self::DeviceBays => "device-bays",
            Self::InventoryItems => "inventory-items",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ConsolePorts => "ConsolePortTemplate",
            Self::ConsoleServerPorts => "ConsoleServerPortTemplate",
            Self::PowerPorts => "PowerPortTemplate",
            Self::PowerOutlets => "PowerOutletTemplate",
            Self::Interfaces => "InterfaceTemplate",
            Self::RearPorts => "RearPortTemplate",
            Self::FrontPorts => "FrontPortTemplate",
            Self::ModuleBays => "ModuleBayTemplate",
            Self::DeviceBays => "DeviceBayTemplate",
            Self::InventoryItems => "InventoryItemTemplate",
        }
    }

    pub fn from_section(section: &str) -> Option<Self> {
        Self::PROCESSING_ORDER
            .into_iter()
            .find(|kind| kind.section() == section)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

impl FromStr for ComponentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_section(s).ok_or_else(|| CoreError::unknown_component_kind(s))
    }
}
