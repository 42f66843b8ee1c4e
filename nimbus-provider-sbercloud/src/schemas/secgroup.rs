//! networking_secgroup schema definition

use nimbus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::resources::SECGROUP;

/// Schema of one entry of the computed `rules` list
pub fn rule_type() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new("id", AttributeType::String).computed(),
        AttributeSchema::new("direction", AttributeType::String).computed(),
        AttributeSchema::new("ethertype", AttributeType::String).computed(),
        AttributeSchema::new("protocol", AttributeType::String).computed(),
        AttributeSchema::new("port_range_min", types::port_number()).computed(),
        AttributeSchema::new("port_range_max", types::port_number()).computed(),
        AttributeSchema::new("remote_ip_prefix", AttributeType::String).computed(),
        AttributeSchema::new("remote_group_id", AttributeType::String).computed(),
        AttributeSchema::new("description", AttributeType::String).computed(),
    ])
}

/// Returns the schema for sbercloud_networking_secgroup
pub fn secgroup_schema() -> ResourceSchema {
    ResourceSchema::new(SECGROUP)
        .with_description("Networking security group and its default rule set")
        .attribute(
            AttributeSchema::new("region", AttributeType::String)
                .optional()
                .computed()
                .force_new()
                .with_description("Region of the security group; defaults to the provider region"),
        )
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .with_description("Name of the security group"),
        )
        .attribute(
            AttributeSchema::new("description", AttributeType::String)
                .optional()
                .computed()
                .with_description("Description of the security group"),
        )
        .attribute(
            AttributeSchema::new("enterprise_project_id", AttributeType::String)
                .optional()
                .computed()
                .force_new()
                .with_description("Enterprise project; defaults to the provider setting"),
        )
        .attribute(
            AttributeSchema::new("delete_default_rules", AttributeType::Bool)
                .optional()
                .force_new()
                .with_description("Remove the rules created together with the group"),
        )
        .attribute(
            AttributeSchema::new("rules", AttributeType::List(Box::new(rule_type())))
                .computed()
                .with_description("Rules currently attached to the group (read-only)"),
        )
        .attribute(
            AttributeSchema::new("tenant_id", AttributeType::String)
                .optional()
                .computed()
                .force_new()
                .deprecated("tenant_id is deprecated"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_core::resource::Value;
    use nimbus_core::schema::TypeError;
    use std::collections::HashMap;

    #[test]
    fn name_is_the_only_required_attribute() {
        let schema = secgroup_schema();
        let required: Vec<&str> = schema
            .attributes
            .values()
            .filter(|a| a.required)
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(required, vec!["name"]);
    }

    #[test]
    fn force_new_attributes() {
        let schema = secgroup_schema();
        let mut force_new: Vec<&str> = schema
            .attributes
            .values()
            .filter(|a| a.force_new)
            .map(|a| a.name.as_str())
            .collect();
        force_new.sort();
        assert_eq!(
            force_new,
            vec![
                "delete_default_rules",
                "enterprise_project_id",
                "region",
                "tenant_id"
            ]
        );
    }

    #[test]
    fn rules_cannot_be_declared() {
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::from("web"));
        attrs.insert("rules".to_string(), Value::List(vec![]));

        let errors = secgroup_schema().validate(&attrs).unwrap_err();
        assert!(matches!(&errors[0], TypeError::ComputedOnly { name } if name == "rules"));
    }

    #[test]
    fn rule_fields_accept_empty_strings() {
        let mut rule = HashMap::new();
        rule.insert("id".to_string(), Value::from("r-1"));
        rule.insert("direction".to_string(), Value::from("ingress"));
        rule.insert("ethertype".to_string(), Value::from(""));
        assert!(rule_type().validate(&Value::Map(rule)).is_ok());
    }

    #[test]
    fn tenant_id_is_deprecated() {
        let schema = secgroup_schema();
        assert!(schema.attributes["tenant_id"].deprecated.is_some());
    }
}
