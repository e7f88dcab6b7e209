//! Action dispatch.
//!
//! A request moves through `Unauthenticated -> Authenticated -> Dispatched ->
//! Responded`. Any failure on the way ends it with that error:
//!
//! 1. `Action` must be present.
//! 2. The [`Authenticator`] verifies the signature. This happens for every
//!    action, handlers never check authentication themselves.
//! 3. The action is looked up in the [`ActionTable`] built at startup.
//! 4. The handler runs and its envelope is returned as is.

use crate::backend::BackendClient;
use crate::config::ResourceSettings;
use crate::credentials::{Credential, CredentialStore};
use crate::envelope::ResponseEnvelope;
use crate::errors::{GatewayError, Result};
use crate::params::{Params, RequestContext};
use crate::resources::{images, snapshots, volumes, zones};
use crate::signature::Authenticator;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Everything a handler can use while serving one authenticated request.
pub struct ActionContext<'a> {
    pub request: &'a RequestContext,
    pub caller: &'a Credential,
    pub backend: &'a BackendClient,
    pub settings: &'a ResourceSettings,
}

impl ActionContext<'_> {
    pub fn params(&self) -> &Params {
        self.request.params()
    }
}

/// Implements one EC2 action.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<ResponseEnvelope>;
}

/// Action name to handler. Built once and never modified while serving.
#[derive(Clone, Default)]
pub struct ActionTable {
    handlers: HashMap<&'static str, Arc<dyn ActionHandler>>,
}

impl ActionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, action: &'static str, handler: impl ActionHandler + 'static) -> Self {
        self.handlers.insert(action, Arc::new(handler));
        self
    }

    /// Every action the gateway supports.
    pub fn standard() -> Self {
        ActionTable::new()
            .register("DescribeVolumes", volumes::DescribeVolumes)
            .register("CreateVolume", volumes::CreateVolume)
            .register("AttachVolume", volumes::AttachVolume)
            .register("DetachVolume", volumes::DetachVolume)
            .register("DeleteVolume", volumes::DeleteVolume)
            .register("DescribeSnapshots", snapshots::DescribeSnapshots)
            .register("CreateSnapshot", snapshots::CreateSnapshot)
            .register("DeleteSnapshot", snapshots::DeleteSnapshot)
            .register("DescribeImages", images::DescribeImages)
            .register("DescribeImageAttribute", images::DescribeImageAttribute)
            .register("DescribeAvailabilityZones", zones::DescribeAvailabilityZones)
    }

    pub fn get(&self, action: &str) -> Option<&Arc<dyn ActionHandler>> {
        self.handlers.get(action)
    }

    /// The registered spelling of `action`, if it is one.
    pub fn known_action(&self, action: &str) -> Option<&'static str> {
        self.handlers.get_key_value(action).map(|(name, _)| *name)
    }

    pub fn actions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }
}

struct DispatcherInner {
    actions: ActionTable,
    authenticator: Authenticator,
    backend: BackendClient,
    settings: ResourceSettings,
}

#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    pub fn new(
        actions: ActionTable,
        credentials: Arc<dyn CredentialStore>,
        backend: BackendClient,
        settings: ResourceSettings,
    ) -> Self {
        Dispatcher {
            inner: Arc::new(DispatcherInner {
                actions,
                authenticator: Authenticator::new(credentials),
                backend,
                settings,
            }),
        }
    }

    pub fn actions(&self) -> &ActionTable {
        &self.inner.actions
    }

    pub async fn dispatch(&self, request: &RequestContext) -> Result<ResponseEnvelope> {
        let action = request.params().get("Action")?;

        let caller = self.inner.authenticator.authenticate(request)?;

        let handler = self
            .inner
            .actions
            .get(action)
            .ok_or_else(|| GatewayError::InvalidAction(action.to_string()))?;

        tracing::debug!(action, access_key = %caller.access_key, "Dispatching action");

        let ctx = ActionContext {
            request,
            caller: &caller,
            backend: &self.inner.backend,
            settings: &self.inner.settings,
        };
        handler.handle(&ctx).await
    }
}
