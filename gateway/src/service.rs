//! HTTP surface of the gateway.
//!
//! Accepts EC2 Query requests as GET (query string) or POST (form body) on
//! any path, hands them to the [`Dispatcher`] and renders the outcome.

use crate::GatewayServerError;
use crate::dispatcher::Dispatcher;
use crate::envelope::ResponseEnvelope;
use crate::errors::GatewayError;
use crate::metrics_defs::REQUEST_DURATION;
use crate::params::{Params, RequestContext};
use crate::render::Renderer;
use http::header::HOST;
use http::{Method, StatusCode};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response};
use shared::histogram;
use shared::http::{make_error_response, make_response};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Largest accepted form body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct GatewayService {
    dispatcher: Dispatcher,
    renderer: Arc<dyn Renderer>,
}

impl GatewayService {
    pub fn new(dispatcher: Dispatcher, renderer: Arc<dyn Renderer>) -> Self {
        GatewayService {
            dispatcher,
            renderer,
        }
    }
}

impl Service<Request<Incoming>> for GatewayService {
    type Response = Response<BoxBody<Bytes, Self::Error>>;
    type Error = GatewayServerError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

impl GatewayService {
    /// Metric tag for the request's action. Unregistered actions and failed
    /// authentication share one tag.
    fn action_tag(
        &self,
        action: &str,
        outcome: &Result<ResponseEnvelope, GatewayError>,
    ) -> &'static str {
        let authenticated = !matches!(outcome, Err(GatewayError::AuthFailure(_)));
        match self.dispatcher.actions().known_action(action) {
            Some(known) if authenticated => known,
            _ => "invalid",
        }
    }

    /// Produces exactly one response per request: the rendered envelope on
    /// success, the rendered error otherwise.
    pub async fn handle<B, E>(&self, req: Request<B>) -> Response<BoxBody<Bytes, E>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
        E: 'static,
    {
        let started = Instant::now();
        let request_id = Uuid::new_v4().to_string();

        if req.method() != Method::GET && req.method() != Method::POST {
            return make_error_response(StatusCode::METHOD_NOT_ALLOWED);
        }

        let (action, outcome) = match request_context(req).await {
            Ok(ctx) => {
                let action = ctx.params().get_optional("Action").unwrap_or("").to_string();
                let outcome = self.dispatcher.dispatch(&ctx).await;
                (action, outcome)
            }
            Err(e) => (String::new(), Err(e)),
        };

        let (status, rendered) = match &outcome {
            Ok(envelope) => (StatusCode::OK, self.renderer.render(envelope, &request_id)),
            Err(error) => {
                let code = error.code();
                if error.is_client_error() {
                    tracing::warn!(%action, %request_id, code, "Request rejected: {error}");
                } else {
                    tracing::error!(%action, %request_id, code, "Request failed: {error}");
                }
                (error.status(), self.renderer.render_error(error, &request_id))
            }
        };

        histogram!(
            REQUEST_DURATION,
            "action" => self.action_tag(&action, &outcome),
            "status" => status.as_str().to_string()
        )
        .record(started.elapsed().as_secs_f64());

        match rendered {
            Ok(body) => make_response(status, body.content_type, body.body),
            Err(e) => {
                tracing::error!(request_id = %request_id, "Could not render response: {e}");
                make_error_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

/// Collects the request parameters. A name repeated within the query string
/// or within the form body is rejected. POST form fields override query
/// string fields of the same name.
async fn request_context<B>(req: Request<B>) -> Result<RequestContext, GatewayError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();

    let host = parts
        .headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| parts.uri.authority().map(|authority| authority.as_str()))
        .unwrap_or_default()
        .to_string();

    let mut params = match parts.uri.query() {
        Some(query) => Params::from_urlencoded(query.as_bytes())?,
        None => Params::default(),
    };

    if parts.method == Method::POST {
        let body = Limited::new(body, MAX_BODY_BYTES)
            .collect()
            .await
            .map_err(|e| {
                GatewayError::InvalidParameterValue(format!("Unreadable request body: {e}"))
            })?
            .to_bytes();
        params.extend(Params::from_urlencoded(&body)?);
    }

    Ok(RequestContext::new(parts.method, host, parts.uri.path(), params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::JsonRenderer;
    use crate::signature::{SignatureMethod, compute_signature};
    use crate::testutils::{SECRET_KEY, dispatcher, mock_command, signed_params};
    use http_body_util::Full;
    use serde_json::{Value, json};
    use std::convert::Infallible;
    use wiremock::MockServer;

    fn service(server: &MockServer) -> GatewayService {
        GatewayService::new(dispatcher(server), Arc::new(JsonRenderer))
    }

    fn form(params: &Params) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter())
            .finish()
    }

    async fn body_json(response: Response<BoxBody<Bytes, Infallible>>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_post_form() {
        let server = MockServer::start().await;
        mock_command(
            &server,
            "deleteVolume",
            200,
            json!({"deletevolumeresponse": {"success": "true"}}),
        )
        .await;

        let params = signed_params("DeleteVolume", &[("VolumeId", "v1")]);
        let req = Request::post("/")
            .header(HOST, "localhost")
            .body(Full::new(Bytes::from(form(&params))))
            .unwrap();

        let response = service(&server).handle::<_, Infallible>(req).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/json");

        let body = body_json(response).await;
        assert_eq!(body["DeleteVolumeResponse"]["return"], "true");
        assert!(body["DeleteVolumeResponse"]["requestId"].is_string());
    }

    #[tokio::test]
    async fn test_get_query_signed_for_get() {
        let server = MockServer::start().await;
        mock_command(&server, "listVolumes", 200, json!({"listvolumesresponse": {}})).await;

        let mut params = signed_params("DescribeVolumes", &[]);
        // signed for POST
        let req = Request::get(format!("/?{}", form(&params)))
            .header(HOST, "localhost")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = service(&server).handle::<_, Infallible>(req).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["Response"]["Errors"]["Error"]["Code"], "AuthFailure");

        let signature = compute_signature(
            SECRET_KEY,
            SignatureMethod::HmacSha256,
            "GET",
            "localhost",
            "/",
            &params,
        );
        params.insert("Signature", signature);
        let req = Request::get(format!("/?{}", form(&params)))
            .header(HOST, "localhost")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = service(&server).handle::<_, Infallible>(req).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["DescribeVolumesResponse"]["items"], json!([]));
    }

    #[tokio::test]
    async fn test_error_document() {
        let server = MockServer::start().await;
        let req = Request::post("/")
            .header(HOST, "localhost")
            .body(Full::new(Bytes::from("Version=2013-10-15")))
            .unwrap();

        let response = service(&server).handle::<_, Infallible>(req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["Response"]["Errors"]["Error"]["Code"], "MissingParameter");
        assert_eq!(
            body["Response"]["Errors"]["Error"]["Message"],
            "The request must contain the parameter Action"
        );
        assert!(body["Response"]["RequestID"].is_string());
    }

    #[tokio::test]
    async fn test_form_overrides_query() {
        let params = signed_params("DescribeVolumes", &[]);
        let req = Request::post("/?Action=RunInstances")
            .header(HOST, "localhost")
            .body(Full::new(Bytes::from(form(&params))))
            .unwrap();

        let ctx = request_context(req).await.unwrap();
        assert_eq!(ctx.params().get("Action").unwrap(), "DescribeVolumes");
        assert_eq!(ctx.host(), "localhost");
        assert_eq!(ctx.path(), "/");
    }

    #[tokio::test]
    async fn test_action_tag() {
        let server = MockServer::start().await;
        let service = service(&server);
        let ok = Ok(ResponseEnvelope::new("DescribeVolumesResponse", "volumes.xml"));
        let denied = Err(GatewayError::AuthFailure("bad signature".into()));

        assert_eq!(service.action_tag("DescribeVolumes", &ok), "DescribeVolumes");
        assert_eq!(service.action_tag("DescribeVolumes", &denied), "invalid");
        assert_eq!(service.action_tag("x9f3-random", &denied), "invalid");
        let unknown = Err(GatewayError::InvalidAction("RunInstances".into()));
        assert_eq!(service.action_tag("RunInstances", &unknown), "invalid");
        let missing = Err(GatewayError::MissingParameter("Action".into()));
        assert_eq!(service.action_tag("", &missing), "invalid");
    }

    #[tokio::test]
    async fn test_repeated_parameter_rejected() {
        let server = MockServer::start().await;
        let params = signed_params("DeleteVolume", &[("VolumeId", "v1")]);
        let body = format!("{}&VolumeId=v2", form(&params));
        let req = Request::post("/")
            .header(HOST, "localhost")
            .body(Full::new(Bytes::from(body)))
            .unwrap();

        let response = service(&server).handle::<_, Infallible>(req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["Response"]["Errors"]["Error"]["Code"], "InvalidParameterValue");
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let server = MockServer::start().await;
        let req = Request::delete("/")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = service(&server).handle::<_, Infallible>(req).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_oversized_body() {
        let server = MockServer::start().await;
        let req = Request::post("/")
            .header(HOST, "localhost")
            .body(Full::new(Bytes::from(vec![b'a'; MAX_BODY_BYTES + 1])))
            .unwrap();
        let response = service(&server).handle::<_, Infallible>(req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
