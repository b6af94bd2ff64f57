// ABOUTME: Transactional boundary for reading and persisting environment aggregates.
// ABOUTME: Work on a copy, commit only on success, discard the copy on any error.

use std::sync::Arc;

use super::store::{EnvironmentStore, StoreError};
use crate::model::Environment;
use crate::types::EnvName;

/// Whether `with_environment` may start from an empty environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Create,
    Fail,
}

#[derive(Clone)]
pub struct EnvironmentTx {
    store: Arc<dyn EnvironmentStore>,
}

impl std::fmt::Debug for EnvironmentTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentTx").finish_non_exhaustive()
    }
}

impl EnvironmentTx {
    pub fn new(store: Arc<dyn EnvironmentStore>) -> Self {
        Self { store }
    }

    pub fn find_environment(&self, name: &EnvName) -> Result<Environment, StoreError> {
        self.store
            .load(name)?
            .ok_or_else(|| StoreError::NotFound(name.clone()))
    }

    pub fn find_or_new(&self, name: &EnvName) -> Result<Environment, StoreError> {
        Ok(self
            .store
            .load(name)?
            .unwrap_or_else(|| Environment::new(name.clone())))
    }

    /// Persist the aggregate, cascading to newly attached children.
    ///
    /// On success `environment` is replaced by the saved copy (identities
    /// assigned). On failure it is left exactly as it was.
    pub fn update_environment(&self, environment: &mut Environment) -> Result<(), StoreError> {
        *environment = self.store.save(environment)?;
        Ok(())
    }

    /// Load a working copy of `name`, let `mutate` change it, then commit.
    ///
    /// If `mutate` or the commit fails the working copy is dropped and the
    /// stored aggregate is untouched. Returns the committed aggregate.
    pub fn with_environment<E, F>(
        &self,
        name: &EnvName,
        missing: Missing,
        mutate: F,
    ) -> Result<Environment, E>
    where
        F: FnOnce(&mut Environment) -> Result<(), E>,
        E: From<StoreError>,
    {
        let mut working = match (self.store.load(name)?, missing) {
            (Some(environment), _) => environment,
            (None, Missing::Create) => Environment::new(name.clone()),
            (None, Missing::Fail) => return Err(StoreError::NotFound(name.clone()).into()),
        };
        mutate(&mut working)?;
        self.update_environment(&mut working)?;
        Ok(working)
    }
}
