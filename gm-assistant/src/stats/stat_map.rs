// League stat-id -> stat-name mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::category::{canonical_stat, CanonicalStat};

/// Maps league stat ids ("7", "26", ...) to league stat names ("Runs",
/// "Earned Run Average", ...).
///
/// Deserialization tolerates every shape the stat-map puller has produced:
/// a `{"stat_map": {...}}` wrapper, a flat `{id: name}` map, and a map of
/// stat definitions (`{id: {"name": ..., "display_name": ...}}`). Entries
/// that fit none of these are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatMap(BTreeMap<String, String>);

impl StatMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize any supported JSON shape into a stat map.
    pub fn from_value(value: &Value) -> Self {
        let Value::Object(obj) = value else {
            return Self::default();
        };
        if let Some(inner @ Value::Object(_)) = obj.get("stat_map") {
            return Self::from_value(inner);
        }

        let mut map = BTreeMap::new();
        for (id, entry) in obj {
            let name = match entry {
                Value::String(name) => Some(name.clone()),
                Value::Object(def) => def
                    .get("name")
                    .or_else(|| def.get("display_name"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            };
            if let Some(name) = name {
                map.insert(id.clone(), name);
            }
        }
        StatMap(map)
    }

    pub fn name(&self, stat_id: &str) -> Option<&str> {
        self.0.get(stat_id).map(String::as_str)
    }

    /// Resolve a stat id all the way to a canonical stat.
    pub fn canonical(&self, stat_id: &str) -> Option<CanonicalStat> {
        self.name(stat_id).and_then(canonical_stat)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<'de> Deserialize<'de> for StatMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(StatMap::from_value(&value))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StatMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        StatMap(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Category;
    use serde_json::json;

    #[test]
    fn flat_map_shape() {
        let map = StatMap::from_value(&json!({"7": "Runs", "26": "Earned Run Average"}));
        assert_eq!(map.len(), 2);
        assert_eq!(map.name("7"), Some("Runs"));
        assert_eq!(
            map.canonical("26"),
            Some(CanonicalStat::Category(Category::ERA))
        );
    }

    #[test]
    fn wrapped_map_shape() {
        let map = StatMap::from_value(&json!({"stat_map": {"12": "Home Runs"}}));
        assert_eq!(map.name("12"), Some("Home Runs"));
    }

    #[test]
    fn definition_map_shape_prefers_name() {
        let map = StatMap::from_value(&json!({
            "32": {"name": "Saves", "display_name": "SV", "group": "pitching"},
            "42": {"display_name": "K"},
            "99": 17
        }));
        assert_eq!(map.name("32"), Some("Saves"));
        assert_eq!(map.name("42"), Some("K"));
        assert_eq!(map.name("99"), None);
    }

    #[test]
    fn non_object_is_empty() {
        assert!(StatMap::from_value(&json!(["Runs"])).is_empty());
    }

    #[test]
    fn deserializes_via_serde() {
        let map: StatMap = serde_json::from_str(r#"{"stat_map": {"50": "Innings Pitched"}}"#).unwrap();
        assert_eq!(map.canonical("50"), Some(CanonicalStat::Category(Category::IP)));
        let out = serde_json::to_value(&map).unwrap();
        assert_eq!(out, json!({"50": "Innings Pitched"}));
    }
}
