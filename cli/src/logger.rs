use log::{Level, LevelFilter, Log};
use owo_colors::OwoColorize;
use std::fmt::Display;
use std::io::{self, IsTerminal, Write};

/// Overrides the level chosen on the command line
pub const LEVEL_ENV: &str = "FATINJECT_LOG";

struct StderrLogger {
    color: bool,
}

impl StderrLogger {
    fn write_with_color(&self, out: &mut impl Write, color: Color, string: impl Display) {
        let _ = match (self.color, color) {
            (false, _) | (true, Color::Default) => write!(out, "{string}"),
            (true, Color::Gray) => write!(out, "{}", string.dimmed()),
            (true, Color::BrightRed) => write!(out, "{}", string.bright_red()),
            (true, Color::BrightYellow) => write!(out, "{}", string.bright_yellow()),
            (true, Color::BrightBlue) => write!(out, "{}", string.bright_blue()),
            (true, Color::BrightCyan) => write!(out, "{}", string.bright_cyan()),
            (true, Color::BrightMagenta) => write!(out, "{}", string.bright_magenta()),
        };
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut out = io::stderr().lock();
        let level = record.level();
        self.write_with_color(&mut out, level_color(level), format_args!("{level:5} "));
        if level >= Level::Debug {
            self.write_with_color(&mut out, Color::Gray, format_args!("[{}] ", record.target()));
        }
        self.write_with_color(&mut out, Color::Default, record.args());
        let _ = writeln!(out);
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Error => Color::BrightRed,
        Level::Warn => Color::BrightYellow,
        Level::Info => Color::BrightBlue,
        Level::Debug => Color::BrightCyan,
        Level::Trace => Color::BrightMagenta,
    }
}

enum Color {
    Default,
    Gray,
    BrightRed,
    BrightYellow,
    BrightBlue,
    BrightCyan,
    BrightMagenta,
}

/// Parse a `FATINJECT_LOG` value.
pub fn parse_level(value: &str) -> Option<LevelFilter> {
    value.trim().parse().ok()
}

/// Install the stderr logger at `level`, unless `FATINJECT_LOG` says otherwise.
pub fn init(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let level = match std::env::var(LEVEL_ENV) {
        Ok(value) => parse_level(&value).unwrap_or(level),
        Err(_) => level,
    };
    let logger = StderrLogger {
        color: io::stderr().is_terminal(),
    };
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_levels() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level(" WARN "), Some(LevelFilter::Warn));
        assert_eq!(parse_level("off"), Some(LevelFilter::Off));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn plain_output_without_terminal() {
        let logger = StderrLogger { color: false };
        let mut out = Vec::new();
        logger.write_with_color(&mut out, Color::BrightRed, "ERROR ");
        logger.write_with_color(&mut out, Color::Default, format_args!("{} file(s)", 3));
        assert_eq!(out, b"ERROR 3 file(s)");
    }
}
