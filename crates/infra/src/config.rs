//! Runtime configuration.

use serde::{Deserialize, Serialize};

use stockroom_inventory::DEFAULT_UNIT_LABEL;
use stockroom_units::DEFAULT_KILOGRAM_SYNONYMS;

/// Label meaning "every warehouse" in warehouse filters.
pub const DEFAULT_ALL_WAREHOUSES_LABEL: &str = "Tất cả";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockroomConfig {
    /// Unit label for lot lines that name no unit.
    pub default_unit: String,
    /// Unit names treated as kilograms, in lookup order.
    pub kilogram_synonyms: Vec<String>,
    /// Order-type tag stamped on synthesized conversion orders.
    pub conversion_order_type: Option<String>,
    pub all_warehouses_label: String,
    /// Name the order-code prefix is derived from.
    pub system_name: String,
    pub database_url: Option<String>,
}

impl Default for StockroomConfig {
    fn default() -> Self {
        Self {
            default_unit: DEFAULT_UNIT_LABEL.to_string(),
            kilogram_synonyms: DEFAULT_KILOGRAM_SYNONYMS.iter().map(|s| s.to_string()).collect(),
            conversion_order_type: None,
            all_warehouses_label: DEFAULT_ALL_WAREHOUSES_LABEL.to_string(),
            system_name: String::new(),
            database_url: None,
        }
    }
}

impl StockroomConfig {
    /// Load from `STOCKROOM_*` variables and `DATABASE_URL`, keeping defaults
    /// for anything unset or invalid.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(unit) = var("STOCKROOM_DEFAULT_UNIT") {
            config.default_unit = unit;
        }

        if let Some(raw) = var("STOCKROOM_KG_SYNONYMS") {
            match parse_list(&raw) {
                Some(list) => config.kilogram_synonyms = list,
                None => tracing::warn!(value = %raw, "STOCKROOM_KG_SYNONYMS is empty or invalid, using defaults"),
            }
        }

        config.conversion_order_type = var("STOCKROOM_CONVERSION_ORDER_TYPE");

        if let Some(label) = var("STOCKROOM_ALL_WAREHOUSES_LABEL") {
            config.all_warehouses_label = label;
        }

        if let Some(name) = var("STOCKROOM_SYSTEM_NAME") {
            config.system_name = name;
        }

        config.database_url = var("DATABASE_URL");
        if config.database_url.is_none() {
            tracing::warn!("DATABASE_URL not set, only in-memory stores are available");
        }

        config
    }

    /// `None` when the label means every warehouse.
    pub fn warehouse_filter<'a>(&self, warehouse: Option<&'a str>) -> Option<&'a str> {
        let all = self.all_warehouses_label.trim().to_lowercase();
        warehouse
            .map(str::trim)
            .filter(|w| !w.is_empty() && w.to_lowercase() != all)
    }
}

/// A JSON string array or a comma-separated list.
fn parse_list(raw: &str) -> Option<Vec<String>> {
    let items: Vec<String> = if raw.starts_with('[') {
        serde_json::from_str::<Vec<String>>(raw).ok()?
    } else {
        raw.split(',').map(str::to_string).collect()
    };

    let items: Vec<String> = items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    (!items.is_empty()).then_some(items)
}
