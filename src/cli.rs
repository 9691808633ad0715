use clap::Parser;
use clap::builder::OsStringValueParser;
use std::ffi::{OsStr, OsString};

use crate::error::UsageError;

pub const USAGE: &str = "\
Usage: zipup [options] source1 [source2 ...]
Options:
  -o output.zip    : Specify the output zip file (required if not -separate)
  -separate        : Zip each source separately to source.zip
  -nr              : Do not recurse into subfolders (default: recurse)
  -content         : For directories, zip only the contents without the folder name";

/// Print the usage text to standard output.
pub fn print_usage() {
    println!("{USAGE}");
}

#[derive(Parser, Debug, Default, PartialEq, Eq)]
#[command(name = "zipup")]
#[command(no_binary_name = true)]
#[command(disable_help_flag = true, disable_version_flag = true)]
#[command(args_override_self = true)]
pub struct Cli {
    /// Output archive path
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        allow_hyphen_values = true,
        value_parser = OsStringValueParser::new()
    )]
    pub output: Option<OsString>,

    /// Archive each source into <basename>.zip
    #[arg(long = "separate")]
    pub separate: bool,

    /// Do not recurse into subdirectories
    #[arg(long = "nr")]
    pub no_recurse: bool,

    /// Omit the source directory's own name from entry paths
    #[arg(long = "content")]
    pub content_only: bool,

    /// Files and directories to archive
    #[arg(value_name = "SOURCE", value_parser = OsStringValueParser::new())]
    pub sources: Vec<OsString>,
}

impl Cli {
    /// Parse the arguments following the program name.
    pub fn try_parse_args<I>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator,
        I::Item: Into<OsString>,
    {
        let normalized = normalize(args)?;
        Ok(Cli::try_parse_from(normalized)?)
    }
}

fn is_option(token: &OsStr) -> bool {
    token.as_encoded_bytes().first() == Some(&b'-')
}

/// Rewrite the single-dash grammar into something clap understands.
///
/// Word options become long flags and `-o` keeps its next token verbatim as
/// an attached `--output=` value. Every positional source is moved behind a
/// `--` so clap never reads it as an option. Source order is preserved.
pub fn normalize<I>(args: I) -> Result<Vec<OsString>, UsageError>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let mut options: Vec<OsString> = Vec::new();
    let mut sources: Vec<OsString> = Vec::new();

    let mut args = args.into_iter().map(Into::into);
    while let Some(token) = args.next() {
        if !is_option(&token) {
            sources.push(token);
            continue;
        }
        match token.to_str() {
            Some("-nr") => options.push("--nr".into()),
            Some("-content") => options.push("--content".into()),
            Some("-separate") => options.push("--separate".into()),
            Some("-o") => {
                let value = args.next().ok_or(UsageError::MissingOutputArgument)?;
                let mut output = OsString::from("--output=");
                output.push(value);
                options.push(output);
            }
            _ => {
                return Err(UsageError::UnknownOption(
                    token.to_string_lossy().into_owned(),
                ));
            }
        }
    }

    options.push("--".into());
    options.extend(sources);
    Ok(options)
}
