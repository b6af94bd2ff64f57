// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to prevent identity confusion at compile time.

mod env_name;
mod id;

pub use env_name::{EnvName, EnvNameError};
pub use id::{
    ApplicationId, EntityId, EnvironmentId, LogicalDatabaseId, PhysicalDatabaseId, VmId,
};
