use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What the model is told about a tool. Built once, never mutated after
/// being handed to the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

/// JSON-schema object describing the tool's arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: BTreeMap<String, PropertySchema>,
    pub required: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ParameterSchema {
                kind: "object".into(),
                properties: BTreeMap::new(),
                required: Vec::new(),
            },
        }
    }

    /// Declare an argument. `kind` is a JSON-schema type name.
    pub fn param(
        mut self,
        name: impl Into<String>,
        kind: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let name = name.into();
        if required && !self.parameters.required.contains(&name) {
            self.parameters.required.push(name.clone());
        }
        self.parameters.properties.insert(
            name,
            PropertySchema {
                kind: kind.into(),
                description: description.into(),
            },
        );
        self
    }
}
