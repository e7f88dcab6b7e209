use crate::backend::{BackendCall, BackendClient, ItemLookup};
use crate::dispatcher::{ActionContext, ActionHandler};
use crate::envelope::ResponseEnvelope;
use crate::errors::{Result, invalid_zone};
use async_trait::async_trait;
use serde_json::Value;

const ZONES: ItemLookup = ItemLookup {
    item_key: "zone",
    noun: "zone",
    not_found: invalid_zone,
};

/// Resolves an availability zone by name.
pub async fn get_zone(backend: &BackendClient, name: &str) -> Result<Value> {
    backend.find_by_name(BackendCall::new("listZones"), &ZONES, name).await
}

pub struct DescribeAvailabilityZones;

#[async_trait]
impl ActionHandler for DescribeAvailabilityZones {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<ResponseEnvelope> {
        let names = ctx.params().get_list("ZoneName");

        let zones = if names.is_empty() {
            ctx.backend.describe(BackendCall::new("listZones"), &ZONES, &[]).await?
        } else {
            let mut zones = Vec::with_capacity(names.len());
            for name in names {
                zones.push(get_zone(ctx.backend, name).await?);
            }
            zones
        };

        Ok(ResponseEnvelope::new("DescribeAvailabilityZonesResponse", "zones.xml")
            .with("items", zones))
    }
}
