//! Command-line options.

use std::fmt;
use std::path::PathBuf;

pub const USAGE: &str = "\
usage: nvhttpd [-c /path/to/nvhttpd.conf] [-h] [-v]
  -c <file>  Specify /full/path/and/filename of config file
  -h         Show this help text
  -v         Show program version and exit
";

/// Validated command-line options.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Options {
    pub config_file: Option<PathBuf>,
    pub show_help: bool,
    pub show_version: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum OptionsError {
    MissingArgument(&'static str),
    Unknown(String),
}

impl fmt::Display for OptionsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionsError::MissingArgument(flag) => {
                write!(f, "option {flag} requires an argument")
            }
            OptionsError::Unknown(arg) => write!(f, "unknown option: {arg}"),
        }
    }
}

impl std::error::Error for OptionsError {}

impl Options {
    /// Parses the arguments following the program name.
    pub fn parse<I>(args: I) -> Result<Self, OptionsError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" => match args.next() {
                    Some(path) => options.config_file = Some(PathBuf::from(path)),
                    None => return Err(OptionsError::MissingArgument("-c")),
                },
                "-h" => options.show_help = true,
                "-v" => options.show_version = true,
                other => return Err(OptionsError::Unknown(other.to_string())),
            }
        }
        Ok(options)
    }
}
