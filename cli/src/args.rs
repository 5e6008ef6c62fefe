//! Command line parsing.

use log::LevelFilter;
use std::fmt;
use std::path::PathBuf;

pub const USAGE: &str = "\
Usage: fatinject [OPTIONS]

Inject the boot manifest into a pre-formatted FAT12 image.

Options:
  -i, --image <PATH>      Image to modify in place [default: os.img]
  -r, --root <DIR>        Directory manifest sources are relative to [default: .]
  -m, --manifest <FILE>   Text manifest to use instead of the built-in one
  -v                      More output (-vv for trace)
  -q                      Only warnings and errors
  -h, --help              Print this help

The FATINJECT_LOG environment variable (off, error, warn, info, debug, trace)
overrides -v and -q.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub image: PathBuf,
    pub root: PathBuf,
    pub manifest: Option<PathBuf>,
    pub level: LevelFilter,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            image: PathBuf::from("os.img"),
            root: PathBuf::from("."),
            manifest: None,
            level: LevelFilter::Info,
        }
    }
}

/// Parse outcome that does not lead to an injection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgsError {
    Help,
    MissingValue(String),
    Unknown(String),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Help => f.write_str(USAGE),
            Self::MissingValue(flag) => write!(f, "{} needs a value", flag),
            Self::Unknown(arg) => write!(f, "unexpected argument '{}'", arg),
        }
    }
}

impl Args {
    /// Parse arguments, not including the program name.
    pub fn parse<I>(args: I) -> Result<Self, ArgsError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut parsed = Self::default();
        let mut verbosity = 0u8;
        let mut quiet = false;
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) if flag.starts_with("--") => {
                    (flag.to_string(), Some(value.to_string()))
                }
                _ => (arg, None),
            };

            match flag.as_str() {
                "-h" | "--help" => return Err(ArgsError::Help),
                "-v" => verbosity += 1,
                "-vv" => verbosity += 2,
                "-q" | "--quiet" => quiet = true,
                "-i" | "--image" | "-r" | "--root" | "-m" | "--manifest" => {
                    let value = inline
                        .or_else(|| args.next())
                        .ok_or_else(|| ArgsError::MissingValue(flag.clone()))?;
                    let value = PathBuf::from(value);
                    match flag.as_str() {
                        "-i" | "--image" => parsed.image = value,
                        "-r" | "--root" => parsed.root = value,
                        _ => parsed.manifest = Some(value),
                    }
                }
                _ => return Err(ArgsError::Unknown(flag)),
            }
        }

        parsed.level = match (quiet, verbosity) {
            (true, _) => LevelFilter::Warn,
            (false, 0) => LevelFilter::Info,
            (false, 1) => LevelFilter::Debug,
            (false, _) => LevelFilter::Trace,
        };
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse(Vec::<String>::new()).unwrap();
        assert_eq!(args, Args::default());
        assert_eq!(args.image, PathBuf::from("os.img"));
    }

    #[test]
    fn short_and_long_flags() {
        let args = Args::parse(["-i", "build/disk.img", "--root=out", "-m", "boot.list", "-v"]).unwrap();
        assert_eq!(args.image, PathBuf::from("build/disk.img"));
        assert_eq!(args.root, PathBuf::from("out"));
        assert_eq!(args.manifest, Some(PathBuf::from("boot.list")));
        assert_eq!(args.level, LevelFilter::Debug);
    }

    #[test]
    fn verbosity() {
        assert_eq!(Args::parse(["-vv"]).unwrap().level, LevelFilter::Trace);
        assert_eq!(Args::parse(["-v", "-v"]).unwrap().level, LevelFilter::Trace);
        assert_eq!(Args::parse(["-q", "-v"]).unwrap().level, LevelFilter::Warn);
    }

    #[test]
    fn usage_errors() {
        assert_eq!(Args::parse(["--help"]), Err(ArgsError::Help));
        assert_eq!(
            Args::parse(["--image"]),
            Err(ArgsError::MissingValue("--image".into()))
        );
        assert_eq!(
            Args::parse(["os.img"]),
            Err(ArgsError::Unknown("os.img".into()))
        );
    }
}
