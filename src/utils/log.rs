//! Leveled, colored logging to stderr.
//!
//! Use through the [`info!`](crate::info), [`warn!`](crate::warn) and
//! [`error!`](crate::error) macros. Output is silenced under `cargo test`.

use std::io::Write as _;
use std::time::{SystemTime, UNIX_EPOCH};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    fn color(self) -> Color {
        match self {
            Level::Info => Color::Cyan,
            Level::Warn => Color::Yellow,
            Level::Error => Color::Red,
        }
    }
}

/// Writes one log line. Prefer the macros over calling this directly.
pub fn write(level: Level, message: std::fmt::Arguments<'_>) {
    let mut stream = StandardStream::stderr(ColorChoice::Auto);
    let _ = write!(stream, "{} ", clock());
    let _ = stream.set_color(ColorSpec::new().set_fg(Some(level.color())).set_bold(true));
    let _ = write!(stream, "{:>5}", level.tag());
    let _ = stream.reset();
    let _ = writeln!(stream, " {message}");
}

/// Wall-clock time of day, UTC, `HH:MM:SS`.
fn clock() -> String {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let of_day = seconds % 86_400;
    format!(
        "{:02}:{:02}:{:02}",
        of_day / 3_600,
        of_day % 3_600 / 60,
        of_day % 60
    )
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        if cfg!(not(test)) {
            $crate::utils::log::write($crate::utils::log::Level::Info, format_args!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        if cfg!(not(test)) {
            $crate::utils::log::write($crate::utils::log::Level::Warn, format_args!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        if cfg!(not(test)) {
            $crate::utils::log::write($crate::utils::log::Level::Error, format_args!($($arg)*));
        }
    };
}
