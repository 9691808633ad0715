use std::ffi::OsString;
use std::path::PathBuf;

use crate::cli::Cli;
use crate::error::UsageError;

/// Where members end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Every source goes into one archive at this path.
    Shared(PathBuf),
    /// Each source gets its own `<basename>.zip` in the working directory.
    Separate,
}

/// A validated invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    /// Input paths in command-line order, never empty.
    pub sources: Vec<PathBuf>,
    pub output: Output,
    pub recursive: bool,
    /// Leave a directory source's own name out of its entry names.
    pub content_only: bool,
}

impl RunPlan {
    /// Parse and validate the arguments following the program name.
    pub fn from_args<I>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator,
        I::Item: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            return Err(UsageError::NoArguments);
        }
        Cli::try_parse_args(args)?.try_into()
    }

    pub fn is_separate(&self) -> bool {
        self.output == Output::Separate
    }
}

impl TryFrom<Cli> for RunPlan {
    type Error = UsageError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        if cli.sources.is_empty() {
            return Err(UsageError::NoSources);
        }
        let output = match (cli.separate, cli.output) {
            (false, None) => return Err(UsageError::MissingOutput),
            (true, Some(_)) => return Err(UsageError::OutputWithSeparate),
            (false, Some(path)) => Output::Shared(PathBuf::from(path)),
            (true, None) => Output::Separate,
        };
        Ok(RunPlan {
            sources: cli.sources.into_iter().map(PathBuf::from).collect(),
            output,
            recursive: !cli.no_recurse,
            content_only: cli.content_only,
        })
    }
}
