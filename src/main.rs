//! Main entry point for the zipup CLI application.

use std::process::ExitCode;

fn main() -> ExitCode {
    zipup::logs::from_env();
    zipup::run(std::env::args_os().skip(1))
}
