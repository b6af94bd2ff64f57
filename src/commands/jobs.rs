// ABOUTME: Jobs command implementation.
// ABOUTME: Prints every job with its required arguments.

use bluegreen::jobs::explain_valid_jobs;

pub fn jobs() {
    print!("{}", explain_valid_jobs());
}
