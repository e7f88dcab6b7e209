use crate::backend::{BackendCall, ItemLookup};
use crate::dispatcher::{ActionContext, ActionHandler};
use crate::envelope::ResponseEnvelope;
use crate::errors::{
    GatewayError, Result, invalid_instance_id, invalid_snapshot_id, invalid_volume_id,
    volume_attached, volume_detached,
};
use crate::resources::disk_offerings::get_disk_offering;
use crate::resources::zones::get_zone;
use crate::resources::{item_id, job_result_field};
use crate::translation::{ErrorTable, Matcher};
use async_trait::async_trait;
use uuid::Uuid;

pub const VOLUME_ERRORS: ErrorTable = ErrorTable::new(&[
    (Matcher::Text("unable to find a snapshot"), invalid_snapshot_id),
    (Matcher::Text("Unable to aquire volume with ID"), invalid_volume_id),
    (
        Matcher::Text("Please specify a volume that is not attached"),
        volume_attached,
    ),
    (
        Matcher::Text("The specified volume is not attached"),
        volume_detached,
    ),
    (
        Matcher::Text("Invalid parameter virtualmachineid"),
        invalid_instance_id,
    ),
    (Matcher::Text("Invalid parameter id"), invalid_volume_id),
]);

const VOLUMES: ItemLookup = ItemLookup {
    item_key: "volume",
    noun: "volume",
    not_found: invalid_volume_id,
};

fn translate(error: GatewayError) -> GatewayError {
    VOLUME_ERRORS.translate_error(error)
}

pub struct DescribeVolumes;

#[async_trait]
impl ActionHandler for DescribeVolumes {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<ResponseEnvelope> {
        let ids = ctx.params().get_list("VolumeId");
        let volumes = ctx
            .backend
            .describe(BackendCall::new("listVolumes"), &VOLUMES, &ids)
            .await
            .map_err(translate)?;

        Ok(ResponseEnvelope::new("DescribeVolumesResponse", "volumes.xml").with("items", volumes))
    }
}

pub struct CreateVolume;

#[async_trait]
impl ActionHandler for CreateVolume {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<ResponseEnvelope> {
        let params = ctx.params();
        params.require_at_least_one(&["SnapshotId", "Size"])?;
        let zone_name = params.get("AvailabilityZone")?;

        let mut call = BackendCall::new("createVolume");
        match params.get_optional("SnapshotId") {
            Some(snapshot_id) => call.set("snapshotid", snapshot_id),
            None => {
                let size = params.get("Size")?;
                if !size.parse::<u64>().is_ok_and(|gib| gib > 0) {
                    return Err(GatewayError::InvalidParameterValue(format!(
                        "Invalid value '{size}' for Size"
                    )));
                }
                let offering =
                    get_disk_offering(ctx.backend, &ctx.settings.custom_disk_offering).await?;
                call.set("size", size);
                call.set("diskofferingid", item_id(&offering)?);
            }
        }

        let zone = get_zone(ctx.backend, zone_name).await?;
        call.set("zoneid", item_id(&zone)?);
        call.set("name", Uuid::new_v4().to_string());

        tracing::info!(access_key = %ctx.caller.access_key, zone = zone_name, "Creating volume");
        let result = ctx.backend.execute_async(call).await.map_err(translate)?;
        let volume = job_result_field(result, "volume")?;

        Ok(ResponseEnvelope::new("CreateVolumeResponse", "create_volume.xml")
            .with("volume", volume))
    }
}

pub struct AttachVolume;

#[async_trait]
impl ActionHandler for AttachVolume {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<ResponseEnvelope> {
        let params = ctx.params();
        params.require_parameters(&["VolumeId", "InstanceId", "Device"])?;

        let call = BackendCall::new("attachVolume")
            .arg("id", params.get("VolumeId")?)
            .arg("virtualmachineid", params.get("InstanceId")?)
            .arg("deviceid", params.get("Device")?);

        let result = ctx.backend.execute_async(call).await.map_err(translate)?;
        let volume = job_result_field(result, "volume")?;

        Ok(ResponseEnvelope::new("AttachVolumeResponse", "volume_attachment.xml")
            .with("volume", volume))
    }
}

pub struct DetachVolume;

#[async_trait]
impl ActionHandler for DetachVolume {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<ResponseEnvelope> {
        let params = ctx.params();
        let mut call = BackendCall::new("detachVolume").arg("id", params.get("VolumeId")?);
        if let Some(instance_id) = params.get_optional("InstanceId") {
            call.set("virtualmachineid", instance_id);
        }
        if let Some(device) = params.get_optional("Device") {
            call.set("deviceid", device);
        }

        let result = ctx.backend.execute_async(call).await.map_err(translate)?;
        let volume = job_result_field(result, "volume")?;

        Ok(ResponseEnvelope::new("DetachVolumeResponse", "volume_attachment.xml")
            .with("volume", volume))
    }
}

pub struct DeleteVolume;

#[async_trait]
impl ActionHandler for DeleteVolume {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<ResponseEnvelope> {
        let volume_id = ctx.params().get("VolumeId")?;
        tracing::info!(access_key = %ctx.caller.access_key, volume_id, "Deleting volume");

        let call = BackendCall::new("deleteVolume").arg("id", volume_id);
        ctx.backend.execute(call).await.map_err(translate)?;

        Ok(ResponseEnvelope::new("DeleteVolumeResponse", "status.xml").with("return", "true"))
    }
}
