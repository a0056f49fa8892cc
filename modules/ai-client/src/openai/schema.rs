use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Types the model can be constrained to return.
///
/// Implemented for anything that is `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// JSON schema in the shape strict structured-output endpoints accept:
    /// every object closed with `additionalProperties: false`, every property
    /// listed in `required` (nullable ones included), and no `$ref`s.
    fn response_schema() -> Value {
        let mut value = serde_json::to_value(schema_for!(Self)).unwrap_or_default();

        let definitions = match &mut value {
            Value::Object(map) => {
                map.remove("$schema");
                map.remove("definitions")
            }
            _ => None,
        }
        .unwrap_or(Value::Null);

        normalize(&mut value, &definitions);
        value
    }

    /// Schema name sent alongside the response format.
    fn schema_name() -> String {
        let name = <Self as JsonSchema>::schema_name();
        let mut out = String::with_capacity(name.len() + 4);
        for (i, c) in name.chars().enumerate() {
            if c.is_ascii_uppercase() {
                if i > 0 {
                    out.push('_');
                }
                out.push(c.to_ascii_lowercase());
            } else if c.is_ascii_alphanumeric() {
                out.push(c);
            } else {
                out.push('_');
            }
        }
        out
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn normalize(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(resolved) = resolve_ref(map, definitions) {
                *value = resolved;
                normalize(value, definitions);
                return;
            }

            if let Some(Value::Array(all_of)) = map.get("allOf") {
                if all_of.len() == 1 {
                    *value = all_of[0].clone();
                    normalize(value, definitions);
                    return;
                }
            }

            if map.get("type").and_then(Value::as_str) == Some("object") {
                close_object(map);
            }

            for child in map.values_mut() {
                normalize(child, definitions);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                normalize(item, definitions);
            }
        }
        _ => {}
    }
}

fn resolve_ref(map: &Map<String, Value>, definitions: &Value) -> Option<Value> {
    let path = map.get("$ref")?.as_str()?;
    let name = path.strip_prefix("#/definitions/")?;
    definitions.get(name).cloned()
}

fn close_object(map: &mut Map<String, Value>) {
    map.insert("additionalProperties".to_string(), Value::Bool(false));

    let keys: Vec<Value> = match map.get("properties") {
        Some(Value::Object(props)) => props.keys().cloned().map(Value::String).collect(),
        _ => Vec::new(),
    };
    map.insert("required".to_string(), Value::Array(keys));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct SearchParams {
        /// Free-text term.
        query: Option<String>,
        filter_by: Option<String>,
        sort_by: Option<String>,
    }

    #[test]
    fn nullable_fields_are_all_required() {
        let schema = SearchParams::response_schema();
        let obj = schema.as_object().unwrap();

        assert!(!obj.contains_key("$schema"));
        assert_eq!(obj.get("additionalProperties"), Some(&Value::Bool(false)));

        let required: Vec<&str> = obj["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(required.len(), 3);
        assert!(required.contains(&"query"));
        assert!(required.contains(&"filter_by"));
        assert!(required.contains(&"sort_by"));
    }

    #[test]
    fn doc_comments_become_descriptions() {
        let schema = SearchParams::response_schema();
        assert_eq!(
            schema["properties"]["query"]["description"],
            Value::String("Free-text term.".to_string())
        );
    }

    #[test]
    fn nested_definitions_are_inlined() {
        #[derive(Deserialize, JsonSchema)]
        #[allow(dead_code)]
        struct Range {
            min: Option<i64>,
            max: Option<i64>,
        }

        #[derive(Deserialize, JsonSchema)]
        #[allow(dead_code)]
        struct PriceQuery {
            price: Range,
            make: String,
        }

        let schema = PriceQuery::response_schema();
        let obj = schema.as_object().unwrap();
        assert!(!obj.contains_key("definitions"));

        let price = obj["properties"]["price"].as_object().unwrap();
        assert!(!price.contains_key("$ref"));
        assert_eq!(price.get("type"), Some(&Value::String("object".to_string())));
        assert_eq!(price.get("additionalProperties"), Some(&Value::Bool(false)));
    }

    #[test]
    fn schema_name_is_snake_case() {
        assert_eq!(<SearchParams as StructuredOutput>::schema_name(), "search_params");
    }
}
