// ABOUTME: Init command implementation.
// ABOUTME: Writes a template configuration into the current directory.

use bluegreen::config;
use bluegreen::error::Result;
use bluegreen::output::Output;
use std::env;

pub fn init(force: bool, output: &Output) -> Result<()> {
    let cwd = env::current_dir()?;
    let path = config::init_config(&cwd, force)?;
    output.success(&format!("Wrote {}", path.display()));
    Ok(())
}
