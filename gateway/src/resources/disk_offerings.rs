use crate::backend::{BackendCall, BackendClient, ItemLookup};
use crate::errors::{Result, invalid_disk_offering};
use serde_json::Value;

const DISK_OFFERINGS: ItemLookup = ItemLookup {
    item_key: "diskoffering",
    noun: "disk offering",
    not_found: invalid_disk_offering,
};

/// Resolves a disk offering by name. Volumes created by size use the
/// configured custom offering.
pub async fn get_disk_offering(backend: &BackendClient, name: &str) -> Result<Value> {
    backend
        .find_by_name(BackendCall::new("listDiskOfferings"), &DISK_OFFERINGS, name)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{backend_config, mock_command, mock_zone_and_offering};
    use serde_json::json;
    use wiremock::MockServer;

    #[tokio::test]
    async fn test_get_disk_offering() {
        let server = MockServer::start().await;
        mock_zone_and_offering(&server).await;
        let backend = BackendClient::new(backend_config(&server)).unwrap();

        let offering = get_disk_offering(&backend, "Custom").await.unwrap();
        assert_eq!(offering["id"], "offering-1");
    }

    #[tokio::test]
    async fn test_missing_disk_offering() {
        let server = MockServer::start().await;
        mock_command(
            &server,
            "listDiskOfferings",
            200,
            json!({"listdiskofferingsresponse": {}}),
        )
        .await;
        let backend = BackendClient::new(backend_config(&server)).unwrap();

        let error = get_disk_offering(&backend, "Custom").await.unwrap_err();
        assert_eq!(error.code(), "InvalidDiskOffering.NotFound");
    }
}
