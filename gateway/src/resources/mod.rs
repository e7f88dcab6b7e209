//! EC2 action handlers, one module per resource family.
//!
//! Handlers validate their parameters before any backend call, build a
//! [`BackendCall`](crate::backend::BackendCall), run it and translate
//! backend failures through the family's error table.

pub mod disk_offerings;
pub mod images;
pub mod snapshots;
pub mod volumes;
pub mod zones;

use crate::errors::{GatewayError, Result};
use serde_json::Value;

/// Takes `key` out of an async job result.
pub(crate) fn job_result_field(mut result: Value, key: &str) -> Result<Value> {
    match result.get_mut(key) {
        Some(value) => Ok(value.take()),
        None => Err(GatewayError::InternalError(format!(
            "job result is missing '{key}'"
        ))),
    }
}

/// Id of a resolved backend item.
pub(crate) fn item_id(item: &Value) -> Result<String> {
    crate::backend::field(item, "id")
        .ok_or_else(|| GatewayError::InternalError("backend item has no id".into()))
}
