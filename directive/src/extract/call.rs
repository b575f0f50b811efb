use std::ops::Range;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::diagnostic::Issue;

/// A named request recovered from generated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl DirectiveCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        DirectiveCall {
            name: name.into(),
            arguments,
        }
    }

    /// Interpret a parsed payload as a call.
    ///
    /// `arguments` may be missing or null (no arguments), an object, or a
    /// string holding a JSON object, which some producers emit. Any other
    /// `arguments` value is replaced by an empty map and returned as an
    /// [`Issue::InvalidArguments`] alongside the call.
    pub(crate) fn from_value(value: Value) -> Result<(Self, Option<Issue>), Issue> {
        let mut object = match value {
            Value::Object(object) => object,
            other => return Err(Issue::NotAnObject(kind(&other))),
        };

        let name = match object.remove("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name,
            _ => return Err(Issue::MissingName),
        };

        let arguments = match object.remove("arguments") {
            None | Some(Value::Null) => Ok(Map::new()),
            Some(Value::Object(arguments)) => Ok(arguments),
            Some(Value::String(encoded)) => match serde_json::from_str::<Value>(&encoded) {
                Ok(Value::Object(arguments)) => Ok(arguments),
                Ok(_) | Err(_) => Err(Issue::InvalidArguments("string")),
            },
            Some(other) => Err(Issue::InvalidArguments(kind(&other))),
        };

        Ok(match arguments {
            Ok(arguments) => (DirectiveCall { name, arguments }, None),
            Err(issue) => (DirectiveCall::new(name, Map::new()), Some(issue)),
        })
    }
}

/// Outcome of scanning a buffer. All fields are `None` when nothing was found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub call: Option<DirectiveCall>,
    /// Trimmed text before the begin delimiter; only present with a call and
    /// only when non-empty.
    pub prefix: Option<String>,
    /// Byte range of the whole delimited block, both delimiters included.
    pub block: Option<Range<usize>>,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.call.is_none()
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
