use crate::backend::{BackendCall, ItemLookup};
use crate::dispatcher::{ActionContext, ActionHandler};
use crate::envelope::ResponseEnvelope;
use crate::errors::{GatewayError, Result, invalid_snapshot_id, invalid_volume_id};
use crate::resources::job_result_field;
use crate::translation::{ErrorTable, Matcher};
use async_trait::async_trait;

pub const SNAPSHOT_ERRORS: ErrorTable = ErrorTable::new(&[
    (Matcher::Text("unable to find a snapshot"), invalid_snapshot_id),
    (Matcher::Text("Invalid parameter id"), invalid_snapshot_id),
    (Matcher::Text("Unable to aquire volume with ID"), invalid_volume_id),
    (Matcher::Text("Invalid parameter volumeid"), invalid_volume_id),
]);

const SNAPSHOTS: ItemLookup = ItemLookup {
    item_key: "snapshot",
    noun: "snapshot",
    not_found: invalid_snapshot_id,
};

fn translate(error: GatewayError) -> GatewayError {
    SNAPSHOT_ERRORS.translate_error(error)
}

pub struct DescribeSnapshots;

#[async_trait]
impl ActionHandler for DescribeSnapshots {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<ResponseEnvelope> {
        let ids = ctx.params().get_list("SnapshotId");
        let snapshots = ctx
            .backend
            .describe(BackendCall::new("listSnapshots"), &SNAPSHOTS, &ids)
            .await
            .map_err(translate)?;

        Ok(ResponseEnvelope::new("DescribeSnapshotsResponse", "snapshots.xml")
            .with("items", snapshots))
    }
}

pub struct CreateSnapshot;

#[async_trait]
impl ActionHandler for CreateSnapshot {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<ResponseEnvelope> {
        let volume_id = ctx.params().get("VolumeId")?;
        tracing::info!(access_key = %ctx.caller.access_key, volume_id, "Creating snapshot");

        let call = BackendCall::new("createSnapshot").arg("volumeid", volume_id);

        let result = ctx.backend.execute_async(call).await.map_err(translate)?;
        let snapshot = job_result_field(result, "snapshot")?;

        Ok(ResponseEnvelope::new("CreateSnapshotResponse", "create_snapshot.xml")
            .with("snapshot", snapshot))
    }
}

pub struct DeleteSnapshot;

#[async_trait]
impl ActionHandler for DeleteSnapshot {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<ResponseEnvelope> {
        let snapshot_id = ctx.params().get("SnapshotId")?;
        tracing::info!(access_key = %ctx.caller.access_key, snapshot_id, "Deleting snapshot");

        let call = BackendCall::new("deleteSnapshot").arg("id", snapshot_id);
        ctx.backend.execute_async(call).await.map_err(translate)?;

        Ok(ResponseEnvelope::new("DeleteSnapshotResponse", "status.xml").with("return", "true"))
    }
}
