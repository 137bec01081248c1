//! Tool descriptors and chat options.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Schema advertised to the model for one invocable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: serde_json::Value,
}

/// Wire wrapper that advertises a descriptor as a callable function.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionTool<'a> {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    pub function: &'a ToolDescriptor,
}

impl<'a> From<&'a ToolDescriptor> for FunctionTool<'a> {
    fn from(descriptor: &'a ToolDescriptor) -> Self {
        Self {
            tool_type: "function",
            function: descriptor,
        }
    }
}

/// Normalized result of a tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolCallResult {
    pub content: String,
}

/// How the model may choose among the advertised tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    None,
    Auto,
    /// Force a call to the named function.
    Function(String),
}

impl Serialize for ToolChoice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ToolChoice::None => serializer.serialize_str("none"),
            ToolChoice::Auto => serializer.serialize_str("auto"),
            ToolChoice::Function(name) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "function")?;
                map.serialize_entry("function", &serde_json::json!({ "name": name }))?;
                map.end()
            }
        }
    }
}

/// Optional parameters for a single chat call.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub tools: Option<Vec<ToolDescriptor>>,
    pub tool_choice: Option<ToolChoice>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}
