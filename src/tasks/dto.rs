use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// Field values are kept as raw JSON so that a wrong type is reported as a
// field error instead of rejecting the whole body. An absent field is `None`;
// an explicit `null` is `Some(Value::Null)` and fails the type rules.

fn present<'de, D>(d: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(d).map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateTaskRequest {
    #[serde(deserialize_with = "present")]
    pub title: Option<Value>,
    #[serde(deserialize_with = "present")]
    pub description: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateTaskRequest {
    #[serde(deserialize_with = "present")]
    pub title: Option<Value>,
    #[serde(deserialize_with = "present")]
    pub description: Option<Value>,
    #[serde(deserialize_with = "present")]
    pub completed: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
