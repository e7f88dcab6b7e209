use http::StatusCode;
use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

/// Every failure a request can end in. Each variant maps to a stable EC2
/// error code and an HTTP status, see [`GatewayError::code`] and
/// [`GatewayError::status`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("The request must contain the parameter {0}")]
    MissingParameter(String),

    #[error("{0}")]
    InvalidParameterValue(String),

    #[error("The action {0} is not valid for this web service.")]
    InvalidAction(String),

    #[error("{0}")]
    AuthFailure(String),

    /// A translated, client-attributable failure such as `InvalidVolume.NotFound`.
    #[error("{message}")]
    Client { code: &'static str, message: String },

    /// Raw backend failure. Handlers run it through an error table before it
    /// reaches the caller; if one escapes it is reported as an internal error.
    #[error("backend error: {text}")]
    BackendError { text: String, code: Option<i64> },

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("backend timed out: {0}")]
    BackendTimeout(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::MissingParameter(_) => "MissingParameter",
            GatewayError::InvalidParameterValue(_) => "InvalidParameterValue",
            GatewayError::InvalidAction(_) => "InvalidAction",
            GatewayError::AuthFailure(_) => "AuthFailure",
            GatewayError::Client { code, .. } => code,
            GatewayError::BackendError { .. } | GatewayError::InternalError(_) => "InternalError",
            GatewayError::BackendUnavailable(_) => "Unavailable",
            GatewayError::BackendTimeout(_) => "RequestTimeout",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingParameter(_)
            | GatewayError::InvalidParameterValue(_)
            | GatewayError::InvalidAction(_)
            | GatewayError::Client { .. } => StatusCode::BAD_REQUEST,
            GatewayError::AuthFailure(_) => StatusCode::FORBIDDEN,
            GatewayError::BackendError { .. }
            | GatewayError::BackendUnavailable(_)
            | GatewayError::BackendTimeout(_)
            | GatewayError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

/// Signature shared by every front-facing error constructor used in the
/// translation tables.
pub type ErrorConstructor = fn(String) -> GatewayError;

fn client(code: &'static str, message: String) -> GatewayError {
    GatewayError::Client { code, message }
}

pub fn invalid_volume_id(message: String) -> GatewayError {
    client("InvalidVolume.NotFound", message)
}

pub fn invalid_snapshot_id(message: String) -> GatewayError {
    client("InvalidSnapshot.NotFound", message)
}

pub fn invalid_instance_id(message: String) -> GatewayError {
    client("InvalidInstanceID.NotFound", message)
}

pub fn invalid_image_id(message: String) -> GatewayError {
    client("InvalidAMIID.NotFound", message)
}

pub fn invalid_zone(message: String) -> GatewayError {
    client("InvalidZone.NotFound", message)
}

pub fn invalid_disk_offering(message: String) -> GatewayError {
    client("InvalidDiskOffering.NotFound", message)
}

pub fn volume_attached(message: String) -> GatewayError {
    client("VolumeInUse", message)
}

pub fn volume_detached(message: String) -> GatewayError {
    client("IncorrectState", message)
}
