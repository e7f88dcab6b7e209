//! Serialization of response envelopes and errors.
//!
//! Rendering is a collaborator of the gateway: the dispatcher produces a
//! [`ResponseEnvelope`] or a [`GatewayError`] and a [`Renderer`] turns it into
//! bytes. [`JsonRenderer`] is the built-in implementation.

use crate::envelope::ResponseEnvelope;
use crate::errors::GatewayError;
use hyper::body::Bytes;
use serde_json::{Value, json};

pub struct RenderedBody {
    pub content_type: &'static str,
    pub body: Bytes,
}

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("could not serialize response: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub trait Renderer: Send + Sync {
    fn render(
        &self,
        envelope: &ResponseEnvelope,
        request_id: &str,
    ) -> Result<RenderedBody, RenderError>;

    fn render_error(
        &self,
        error: &GatewayError,
        request_id: &str,
    ) -> Result<RenderedBody, RenderError>;
}

/// Renders `{"<ResponseType>": {"requestId": ..., <payload>}}` and the EC2
/// error document.
pub struct JsonRenderer;

const JSON_CONTENT_TYPE: &str = "application/json";

impl Renderer for JsonRenderer {
    fn render(
        &self,
        envelope: &ResponseEnvelope,
        request_id: &str,
    ) -> Result<RenderedBody, RenderError> {
        let mut body = envelope.payload().clone();
        body.insert("requestId".into(), Value::String(request_id.to_string()));

        let document = json!({ envelope.response_type(): body });
        Ok(RenderedBody {
            content_type: JSON_CONTENT_TYPE,
            body: serde_json::to_vec(&document)?.into(),
        })
    }

    fn render_error(
        &self,
        error: &GatewayError,
        request_id: &str,
    ) -> Result<RenderedBody, RenderError> {
        let document = json!({
            "Response": {
                "Errors": {
                    "Error": {
                        "Code": error.code(),
                        "Message": error.to_string(),
                    }
                },
                "RequestID": request_id,
            }
        });
        Ok(RenderedBody {
            content_type: JSON_CONTENT_TYPE,
            body: serde_json::to_vec(&document)?.into(),
        })
    }
}
