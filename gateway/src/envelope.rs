use serde::Serialize;
use serde_json::{Map, Value};

/// Render-ready result of one action: the EC2 response type, the template
/// the renderer should use, and the payload fields.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    response_type: &'static str,
    template: &'static str,
    payload: Map<String, Value>,
}

impl ResponseEnvelope {
    pub fn new(response_type: &'static str, template: &'static str) -> Self {
        ResponseEnvelope {
            response_type,
            template,
            payload: Map::new(),
        }
    }

    /// Adds a payload field. Only used while the handler assembles its
    /// response.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    pub fn response_type(&self) -> &'static str {
        self.response_type
    }

    pub fn template(&self) -> &'static str {
        self.template
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }
}
