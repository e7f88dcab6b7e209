use crate::backend::{BackendCall, ItemLookup};
use crate::dispatcher::{ActionContext, ActionHandler};
use crate::envelope::ResponseEnvelope;
use crate::errors::{GatewayError, Result, invalid_image_id};
use crate::translation::{ErrorTable, Matcher};
use async_trait::async_trait;

pub const IMAGE_ERRORS: ErrorTable = ErrorTable::new(&[
    (Matcher::Text("Invalid parameter id"), invalid_image_id),
    (Matcher::Text("Unable to find template"), invalid_image_id),
]);

const IMAGES: ItemLookup = ItemLookup {
    item_key: "template",
    noun: "image",
    not_found: invalid_image_id,
};

/// Only templates the caller can launch are exposed as images.
fn list_templates() -> BackendCall {
    BackendCall::new("listTemplates").arg("templatefilter", "executable")
}

pub struct DescribeImages;

#[async_trait]
impl ActionHandler for DescribeImages {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<ResponseEnvelope> {
        let ids = ctx.params().get_list("ImageId");
        let images = ctx
            .backend
            .describe(list_templates(), &IMAGES, &ids)
            .await
            .map_err(|e| IMAGE_ERRORS.translate_error(e))?;

        Ok(ResponseEnvelope::new("DescribeImagesResponse", "images.xml").with("items", images))
    }
}

pub struct DescribeImageAttribute;

#[async_trait]
impl ActionHandler for DescribeImageAttribute {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<ResponseEnvelope> {
        let params = ctx.params();
        params.require_parameters(&["ImageId", "Attribute"])?;
        let image_id = params.get("ImageId")?;
        let attribute = params.get("Attribute")?;

        let mut image = ctx
            .backend
            .describe(list_templates(), &IMAGES, &[image_id])
            .await
            .map_err(|e| IMAGE_ERRORS.translate_error(e))?
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::InternalError("image lookup returned nothing".into()))?;

        let value = image
            .get_mut(attribute)
            .map(|value| value.take())
            .ok_or_else(|| {
                GatewayError::InvalidParameterValue(format!(
                    "Invalid attribute '{attribute}' for image {image_id}"
                ))
            })?;

        Ok(
            ResponseEnvelope::new("DescribeImageAttributeResponse", "image_attribute.xml")
                .with("attribute", attribute)
                .with("id", image_id)
                .with("value", value),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::testutils::{dispatcher, signed_request};
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_templates(server: &MockServer) {
        Mock::given(method("GET"))
            .and(query_param("command", "listTemplates"))
            .and(query_param("templatefilter", "executable"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "listtemplatesresponse": {"count": 2, "template": [
                    {"id": "img-1", "name": "debian", "ostypename": "Debian GNU/Linux 12"},
                    {"id": "img-2", "name": "ubuntu", "ostypename": "Ubuntu 24.04"}
                ]}
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_describe_images() {
        let server = MockServer::start().await;
        mock_templates(&server).await;

        let envelope = dispatcher(&server)
            .dispatch(&signed_request("DescribeImages", &[]))
            .await
            .unwrap();
        assert_eq!(envelope.template(), "images.xml");
        assert_eq!(envelope.payload()["items"].as_array().unwrap().len(), 2);

        let error = dispatcher(&server)
            .dispatch(&signed_request("DescribeImages", &[("ImageId.1", "img-5")]))
            .await
            .unwrap_err();
        assert_eq!(error.code(), "InvalidAMIID.NotFound");
    }

    #[tokio::test]
    async fn test_describe_image_attribute() {
        let server = MockServer::start().await;
        mock_templates(&server).await;

        let envelope = dispatcher(&server)
            .dispatch(&signed_request(
                "DescribeImageAttribute",
                &[("ImageId", "img-2"), ("Attribute", "ostypename")],
            ))
            .await
            .unwrap();
        assert_eq!(envelope.response_type(), "DescribeImageAttributeResponse");
        assert_eq!(envelope.template(), "image_attribute.xml");
        assert_eq!(
            serde_json::Value::Object(envelope.payload().clone()),
            json!({"attribute": "ostypename", "id": "img-2", "value": "Ubuntu 24.04"})
        );
    }

    #[tokio::test]
    async fn test_describe_unknown_image_attribute() {
        let server = MockServer::start().await;
        mock_templates(&server).await;

        let error = dispatcher(&server)
            .dispatch(&signed_request(
                "DescribeImageAttribute",
                &[("ImageId", "img-1"), ("Attribute", "kernel")],
            ))
            .await
            .unwrap_err();
        assert_eq!(error.code(), "InvalidParameterValue");
    }
}
