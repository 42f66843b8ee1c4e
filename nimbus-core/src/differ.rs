//! Differ - Compare desired state with current state
//!
//! Compares the "desired state" declared by the caller with the "current state"
//! fetched from the Provider and reports which attributes need to change.

use std::collections::HashMap;

use crate::resource::{Resource, State, Value};

/// Find changed attributes between desired and current state
///
/// Only attributes present in `desired` are compared: an attribute the caller
/// leaves out keeps whatever the remote side computed.
pub fn changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        // Skip internal attributes (starting with _) and lifecycle settings
        if key.starts_with('_') || key == "timeouts" {
            continue;
        }

        match current.get(key) {
            Some(current_value) if current_value == desired_value => {}
            _ => changed.push(key.clone()),
        }
    }

    changed.sort();
    changed
}

/// Returns true when any of `keys` differs between `from` and `to`
pub fn has_changes(from: &State, to: &Resource, keys: &[&str]) -> bool {
    changed_attributes(&to.attributes, &from.attributes)
        .iter()
        .any(|k| keys.contains(&k.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceId;

    fn existing(attrs: &[(&str, Value)]) -> State {
        let attrs = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        State::existing(ResourceId::new("secgroup", "test"), attrs)
    }

    #[test]
    fn omitted_computed_attribute_is_not_a_change() {
        let desired = Resource::new("secgroup", "test").with_attribute("name", "web");
        let current = existing(&[
            ("name", Value::from("web")),
            ("description", Value::from("set remotely")),
        ]);

        assert!(!has_changes(&current, &desired, &["name", "description"]));
    }

    #[test]
    fn has_changes_ignores_unlisted_keys() {
        let desired = Resource::new("secgroup", "test")
            .with_attribute("name", "web")
            .with_attribute("region", "ru-moscow-1");
        let current = existing(&[
            ("name", Value::from("web")),
            ("region", Value::from("ru-moscow-2")),
        ]);

        assert!(!has_changes(&current, &desired, &["name", "description"]));
        assert!(has_changes(&current, &desired, &["region"]));
    }
}
