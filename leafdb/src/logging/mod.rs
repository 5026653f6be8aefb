use log::{Level, LevelFilter};
use std::fmt;

/// A leveled log sink handed to each query at construction.
///
/// Records go through the `log` facade under `target`, after being checked
/// against `max_level`. A store configured with `LevelFilter::Off` stays
/// silent no matter what logger the application installs.
#[derive(Debug, Clone)]
pub struct Logger {
    target: String,
    max_level: LevelFilter,
}

impl Default for Logger {
    fn default() -> Self {
        Logger::new("leafdb", LevelFilter::Trace)
    }
}

impl Logger {
    pub fn new(target: impl Into<String>, max_level: LevelFilter) -> Self {
        Logger {
            target: target.into(),
            max_level,
        }
    }

    /// A logger for a sub-component, e.g. `leafdb` scoped to `object` logs
    /// under `leafdb::object`.
    pub fn scoped(&self, component: &str) -> Self {
        Logger {
            target: format!("{}::{component}", self.target),
            max_level: self.max_level,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn max_level(&self) -> LevelFilter {
        self.max_level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level <= self.max_level
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if self.enabled(level) {
            log::log!(target: self.target.as_str(), level, "{}", args);
        }
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }

    /// Unexpected failures the store cannot classify. `log` has nothing
    /// above `Error`, so these are errors tagged `fault`.
    pub fn fault(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, format_args!("fault: {args}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_target() {
        let logger = Logger::default().scoped("collection");
        assert_eq!(logger.target(), "leafdb::collection");
        assert_eq!(logger.max_level(), LevelFilter::Trace);
    }

    #[test]
    fn test_level_filtering() {
        let logger = Logger::new("leafdb", LevelFilter::Warn);
        assert!(logger.enabled(Level::Error));
        assert!(logger.enabled(Level::Warn));
        assert!(!logger.enabled(Level::Info));

        let silent = Logger::new("leafdb", LevelFilter::Off);
        assert!(!silent.enabled(Level::Error));
    }
}
