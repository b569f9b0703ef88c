use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    pub fn json_type(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamType,
    pub description: Option<String>,
    pub required: bool,
}

/// Parameter schema of a tool: parameter name to expected type, in
/// declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolSchema {
    params: Vec<ParamSpec>,
}

impl ToolSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required parameter.
    pub fn param(self, name: &str, kind: ParamType, description: &str) -> Self {
        self.push(name, kind, description, true)
    }

    /// Adds a parameter callers may omit.
    pub fn optional(self, name: &str, kind: ParamType, description: &str) -> Self {
        self.push(name, kind, description, false)
    }

    fn push(mut self, name: &str, kind: ParamType, description: &str, required: bool) -> Self {
        self.params.retain(|p| p.name != name);
        self.params.push(ParamSpec {
            name: name.to_string(),
            kind,
            description: if description.is_empty() {
                None
            } else {
                Some(description.to_string())
            },
            required,
        });
        self
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Renders the schema as a JSON Schema object. Unknown parameters are
    /// rejected.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            let mut property = json!({ "type": param.kind.json_type() });
            if let Some(description) = &param.description {
                property["description"] = Value::String(description.clone());
            }
            properties.insert(param.name.clone(), property);
        }

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false
        })
    }
}
