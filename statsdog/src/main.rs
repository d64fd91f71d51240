//! The statsdog binary, which exports aggregated statsd metrics to Datadog.
//!
//! Run `statsdog --help` for a list of commands.

mod cli;
mod setup;

use std::process;

pub fn main() {
    let exit_code = match cli::execute() {
        Ok(()) => 0,
        Err(err) => {
            statsdog_log::ensure_error(&err);
            1
        }
    };

    process::exit(exit_code);
}
