// ABOUTME: Environment persistence: stores, the transactional boundary, and the per-environment lock.
// ABOUTME: Everything that reads or writes environment state goes through this module.

mod lock;
mod store;
mod tx;

pub use lock::{EnvironmentLock, LockError, LockInfo};
pub use store::{EnvironmentStore, FileStore, MemoryStore, StoreError};
pub use tx::{EnvironmentTx, Missing};
