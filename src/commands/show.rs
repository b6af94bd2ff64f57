// ABOUTME: Show command implementation.
// ABOUTME: Prints the persisted environment aggregate as JSON.

use bluegreen::config::Config;
use bluegreen::env::{EnvironmentTx, FileStore};
use bluegreen::error::Result;
use bluegreen::output::Output;
use bluegreen::types::EnvName;
use std::sync::Arc;

pub fn show(config: &Config, env_name: &EnvName, output: &Output) -> Result<()> {
    let tx = EnvironmentTx::new(Arc::new(FileStore::new(&config.store.path)));
    let environment = tx.find_environment(env_name)?;
    output.result(&format!("Environment '{env_name}'"), &environment);
    Ok(())
}
