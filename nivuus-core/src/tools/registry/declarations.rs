use super::arguments::{ParamKind, TOOL_SPECS, ToolSpec};
use crate::config::constants::tools;
use crate::llm::provider::ToolDefinition;
use serde_json::{Map, Value, json};

/// Function declarations sent with every model request, generated from the
/// same table the dispatcher validates against
pub fn build_tool_definitions(web_search_enabled: bool) -> Vec<ToolDefinition> {
    TOOL_SPECS
        .iter()
        .filter(|spec| web_search_enabled || spec.name != tools::WEB_SEARCH)
        .map(tool_definition)
        .collect()
}

fn tool_definition(spec: &ToolSpec) -> ToolDefinition {
    let mut properties = Map::new();
    for param in spec.params {
        let mut schema = match param.kind {
            ParamKind::String => json!({ "type": "string" }),
            ParamKind::Integer => json!({ "type": "integer" }),
            ParamKind::Json => json!({}),
        };
        if let Value::Object(schema) = &mut schema {
            schema.insert("description".to_string(), json!(param.description));
        }
        properties.insert(param.name.to_string(), schema);
    }

    let required: Vec<&str> = spec.required_params().collect();
    ToolDefinition::function(
        spec.name.to_string(),
        spec.description.to_string(),
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_mirror_the_argument_table() {
        let definitions = build_tool_definitions(true);
        assert_eq!(definitions.len(), TOOL_SPECS.len());

        let bash = definitions
            .iter()
            .find(|definition| definition.function.name == tools::RUN_BASH_COMMAND)
            .unwrap();
        assert_eq!(bash.tool_type, "function");
        assert_eq!(
            bash.function.parameters["required"],
            json!(["command", "purpose"])
        );
        assert_eq!(
            bash.function.parameters["properties"]["timeoutMs"]["type"],
            "integer"
        );

        let set_value = definitions
            .iter()
            .find(|definition| definition.function.name == tools::SET_MEMORY_VALUE)
            .unwrap();
        assert!(set_value.function.parameters["properties"]["value"]
            .get("type")
            .is_none());
    }

    #[test]
    fn web_search_is_hidden_when_disabled() {
        let definitions = build_tool_definitions(false);
        assert!(definitions
            .iter()
            .all(|definition| definition.function.name != tools::WEB_SEARCH));
        assert_eq!(definitions.len(), TOOL_SPECS.len() - 1);
    }
}
