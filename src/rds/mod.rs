// ABOUTME: RDS control-plane client: raw API seam, timed copier, and progress checkers.
// ABOUTME: Used by the database snapshot/restore task to stage a copy of the live database.

mod api;
mod copier;
mod error;
mod progress;
mod types;

pub use api::{AwsRds, RdsApi};
pub use copier::RdsCopier;
pub use error::{RdsError, RdsErrorKind};
pub use progress::{RdsInstanceProgressChecker, RdsSnapshotProgressChecker};
pub use types::{DbInstance, DbParameterGroup, DbSnapshot, Endpoint, STATUS_AVAILABLE};
