// tether_sim/src/simulation/config/resolver.rs

use super::catalog::PrefabCatalog;
use super::error::ConfigError;
use figment::value::{Dict, Tag, Value};

pub fn resolve_entity_value(
    entity_value: &Value,
    catalog: &PrefabCatalog,
) -> Result<Value, ConfigError> {
    resolve_value_recursively(entity_value, catalog, &mut Vec::new())
}

/// Merges the contents of `override_dict` into `base`. Nested tables merge
/// key by key, everything else replaces.
fn deep_merge(base: &mut Dict, override_dict: &Dict) {
    for (key, override_val) in override_dict {
        // A nested `from` reference replaces the whole subtree.
        if let Some(d) = override_val.as_dict() {
            if d.contains_key("from") {
                base.insert(key.clone(), override_val.clone());
                continue;
            }
        }

        if let Some(base_val) = base.get_mut(key) {
            if let (Some(base_sub_dict), Some(override_sub_dict)) =
                (base_val.as_dict(), override_val.as_dict())
            {
                let mut new_sub_dict = base_sub_dict.clone();
                deep_merge(&mut new_sub_dict, override_sub_dict);
                *base_val = Value::Dict(Tag::Default, new_sub_dict);
                continue;
            }
        }
        base.insert(key.clone(), override_val.clone());
    }
}

/// Pre-order: the current node is resolved first, then its children.
fn resolve_value_recursively(
    value: &Value,
    catalog: &PrefabCatalog,
    visiting: &mut Vec<String>,
) -> Result<Value, ConfigError> {
    let current_node = match value.as_dict() {
        Some(dict) => match dict.get("from").and_then(|v| v.as_str()) {
            Some(from_key) => {
                if visiting.iter().any(|k| k == from_key) {
                    return Err(ConfigError::PrefabCycle(from_key.to_string()));
                }
                let base_prefab_data = catalog
                    .0
                    .get(from_key)
                    .ok_or_else(|| ConfigError::MissingPrefab(from_key.to_string()))?;

                visiting.push(from_key.to_string());
                let resolved_base = resolve_value_recursively(base_prefab_data, catalog, visiting);
                visiting.pop();

                let mut final_dict = resolved_base?
                    .into_dict()
                    .ok_or_else(|| ConfigError::NotATable(from_key.to_string()))?;

                // `dict` holds the `from` key and the sibling overrides.
                deep_merge(&mut final_dict, dict);
                Value::Dict(Tag::Default, final_dict)
            }
            None => value.clone(),
        },
        None => value.clone(),
    };

    match &current_node {
        Value::Dict(tag, dict) => {
            let mut new_dict = Dict::new();
            for (key, val) in dict.iter() {
                // Already processed, stripped from the output.
                if key == "from" {
                    continue;
                }
                new_dict.insert(
                    key.clone(),
                    resolve_value_recursively(val, catalog, visiting)?,
                );
            }
            Ok(Value::Dict(*tag, new_dict))
        }
        Value::Array(tag, arr) => {
            let mut resolved_arr = Vec::with_capacity(arr.len());
            for item in arr {
                resolved_arr.push(resolve_value_recursively(item, catalog, visiting)?);
            }
            Ok(Value::Array(*tag, resolved_arr))
        }
        _ => Ok(current_node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::config::structs::{EntityConfig, KindConfig};
    use figment::providers::{Format, Toml};
    use figment::Figment;

    fn value(toml_src: &str) -> Value {
        Figment::from(Toml::string(toml_src)).extract().unwrap()
    }

    fn catalog() -> PrefabCatalog {
        let mut catalog = PrefabCatalog::default();
        catalog.0.insert(
            "vehicles.rover".into(),
            value(
                r#"
                name = "rover"
                mass = 25.0
                kind = { type = "Vehicle", wheel_count = 4, vehicle_type = "ground" }
                bridge = { min_frequency = 2.0, max_frequency = 20.0 }
                "#,
            ),
        );
        catalog.0.insert(
            "vehicles.big_rover".into(),
            value(
                r#"
                from = "vehicles.rover"
                mass = 80.0
                kind = { wheel_count = 6 }
                "#,
            ),
        );
        catalog
    }

    #[test]
    fn overrides_deep_merge_into_prefab() {
        let raw = value(
            r#"
            from = "vehicles.rover"
            name = "rover_1"
            bridge = { timeout = 0.25 }
            "#,
        );
        let resolved = resolve_entity_value(&raw, &catalog()).unwrap();
        let entity: EntityConfig = resolved.deserialize().unwrap();

        assert_eq!(entity.name, "rover_1");
        assert_eq!(entity.mass, 25.0);
        assert_eq!(entity.bridge.min_frequency, Some(2.0));
        assert_eq!(entity.bridge.timeout, Some(0.25));
    }

    #[test]
    fn prefabs_can_chain() {
        let raw = value(r#"from = "vehicles.big_rover""#);
        let entity: EntityConfig = resolve_entity_value(&raw, &catalog())
            .unwrap()
            .deserialize()
            .unwrap();

        assert_eq!(entity.mass, 80.0);
        assert!(matches!(
            entity.kind,
            KindConfig::Vehicle { wheel_count: 6, .. }
        ));
    }

    #[test]
    fn missing_prefab_is_an_error() {
        let raw = value(r#"from = "vehicles.hovercraft""#);
        assert!(matches!(
            resolve_entity_value(&raw, &catalog()),
            Err(ConfigError::MissingPrefab(key)) if key == "vehicles.hovercraft"
        ));
    }

    #[test]
    fn self_reference_is_detected() {
        let mut catalog = PrefabCatalog::default();
        catalog
            .0
            .insert("loop.a".into(), value(r#"from = "loop.b""#));
        catalog
            .0
            .insert("loop.b".into(), value(r#"from = "loop.a""#));

        let raw = value(r#"from = "loop.a""#);
        assert!(matches!(
            resolve_entity_value(&raw, &catalog),
            Err(ConfigError::PrefabCycle(_))
        ));
    }

    #[test]
    fn plain_entities_pass_through() {
        let raw = value(r#"name = "box""#);
        let resolved = resolve_entity_value(&raw, &PrefabCatalog::default()).unwrap();
        assert_eq!(resolved, raw);
    }
}
