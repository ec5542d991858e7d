use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use stockroom_core::{Entity, UnitId, ValueObject};

/// A unit of measure (e.g. "Lon", "Thùng", "Kg").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
}

impl Entity for Unit {
    type Id = UnitId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Lookup form of a unit label: trimmed, lowercased, inner whitespace collapsed.
pub fn normalize_unit_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Case-insensitive unit label comparison.
pub fn same_unit(a: &str, b: &str) -> bool {
    normalize_unit_name(a) == normalize_unit_name(b)
}

/// Unit name → id map. Exact match on the normalized name, no fuzzy matching.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnitCatalog {
    by_name: HashMap<String, UnitId>,
    names: HashMap<UnitId, String>,
}

impl UnitCatalog {
    /// Build the catalog. When two units share a normalized name, the later one wins.
    pub fn from_units(units: impl IntoIterator<Item = Unit>) -> Self {
        let mut by_name = HashMap::new();
        let mut names = HashMap::new();
        for unit in units {
            by_name.insert(normalize_unit_name(&unit.name), unit.id);
            names.insert(unit.id, unit.name);
        }
        Self { by_name, names }
    }

    pub fn resolve_unit_id(&self, name: &str) -> Option<UnitId> {
        self.by_name.get(&normalize_unit_name(name)).copied()
    }

    /// Display name of a unit id.
    pub fn unit_name(&self, id: UnitId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl ValueObject for UnitCatalog {}
