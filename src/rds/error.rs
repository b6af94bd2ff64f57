// ABOUTME: RDS control-plane error types with SNAFU pattern.
// ABOUTME: Separates "nothing matched" from failures reported by the API itself.

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RdsError {
    #[snafu(display("RDS cannot find instance '{instance}'"))]
    InstanceNotFound { instance: String },

    #[snafu(display("RDS cannot find snapshot '{snapshot}'"))]
    SnapshotNotFound { snapshot: String },

    #[snafu(display("{operation} returned no {what}"))]
    EmptyResponse {
        operation: &'static str,
        what: &'static str,
    },

    #[snafu(display("{operation} failed: {message}"))]
    Api {
        operation: &'static str,
        message: String,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdsErrorKind {
    NotFound,
    EmptyResponse,
    Api,
}

impl RdsError {
    pub fn kind(&self) -> RdsErrorKind {
        match self {
            RdsError::InstanceNotFound { .. } | RdsError::SnapshotNotFound { .. } => {
                RdsErrorKind::NotFound
            }
            RdsError::EmptyResponse { .. } => RdsErrorKind::EmptyResponse,
            RdsError::Api { .. } => RdsErrorKind::Api,
        }
    }
}
