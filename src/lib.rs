//! # zipup
//!
//! A small command-line archiver that packs files and directories into ZIP
//! archives.
//!
//! Sources are either combined into one archive (`-o out.zip`) or archived
//! one by one into `<name>.zip` files (`-separate`). Directories are walked
//! recursively unless `-nr` is given, and `-content` drops the directory's
//! own name from the stored paths.
//!
//! ## Features
//!
//! - Shared or per-source archives
//! - Recursive or flat directory traversal
//! - DEFLATE compression through a streaming, seek-free ZIP writer
//! - Missing sources are reported and skipped, not fatal
//!
//! ## Example
//!
//! ```no_run
//! use zipup::{Output, Planner, RunPlan, write_archive, write_shared_archive};
//!
//! fn main() -> anyhow::Result<()> {
//!     let plan = RunPlan::from_args(["-separate", "src", "README.md"])?;
//!     let mut planner = Planner::new(&plan, |w| eprintln!("{w}"));
//!     match &plan.output {
//!         Output::Shared(path) => write_shared_archive(path, &plan.sources, &mut planner)?,
//!         Output::Separate => {
//!             for source in &plan.sources {
//!                 if let Some(target) = planner.separate_target(source) {
//!                     write_archive(&target)?;
//!                 }
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod emit;
pub mod error;
pub mod logs;
pub mod plan;
pub mod walk;
pub mod zip;

use std::ffi::OsString;
use std::process::ExitCode;

pub use cli::Cli;
pub use emit::{ArchiveWriter, write_archive, write_shared_archive};
pub use error::{SourceWarning, UsageError};
pub use plan::{Output, RunPlan};
pub use walk::{ArchiveTarget, Member, Planner};
pub use crate::zip::ZipWriter;

/// Run one invocation with the arguments following the program name.
///
/// Usage errors print their message to stderr and the usage text to stdout.
/// Skipped sources are reported on stderr without failing the run. The first
/// error while writing an archive ends the run.
pub fn run<I>(args: I) -> ExitCode
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let plan = match RunPlan::from_args(args) {
        Ok(plan) => plan,
        Err(err) => {
            if let Some(message) = err.message() {
                eprintln!("{message}");
            }
            cli::print_usage();
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(?plan, "parsed arguments");

    let mut planner = Planner::new(&plan, |warning| eprintln!("{warning}"));
    let written = match &plan.output {
        Output::Shared(path) => write_shared_archive(path, &plan.sources, &mut planner),
        Output::Separate => plan
            .sources
            .iter()
            .filter_map(|source| planner.separate_target(source))
            .try_for_each(|target| write_archive(&target)),
    };

    match written {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error during zipping: {err:#}");
            ExitCode::FAILURE
        }
    }
}
