// ABOUTME: Command module aggregator for the bluegreen CLI.
// ABOUTME: Re-exports init, jobs, run, and show command handlers.

mod init;
mod jobs;
mod run;
mod show;

pub use init::init;
pub use jobs::jobs;
pub use run::run_job;
pub use show::show;
