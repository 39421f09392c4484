use std::{fmt, str::FromStr};

use ferrumq_error::ConfigError;
use serde::{Deserialize, Serialize};

/// Severity threshold of the broker's own log output.
///
/// Ordered from most to least verbose, so `a <= b` means `a` lets `b`
/// through.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Parses the textual level. `verbose` forces [`LogLevel::Debug`]
    /// regardless of `text`.
    ///
    /// # Returns
    /// [`ConfigError::InvalidLogLevel`] for anything other than `debug`,
    /// `info`, `warn`, `error` or `fatal` (case insensitive).
    pub fn parse(
        text: &str,
        verbose: bool,
    ) -> Result<Self, ConfigError> {
        if verbose {
            return Ok(Self::Debug);
        }
        text.parse()
    }

    /// Whether a message of `level` passes this threshold.
    pub fn allows(
        &self,
        level: LogLevel,
    ) -> bool {
        level >= *self
    }

    /// `EnvFilter` directive for this level. There is no fatal level in
    /// `tracing`, fatal maps onto `error`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error | Self::Fatal => "error",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            _ => Err(ConfigError::InvalidLogLevel {
                level: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("debug", LogLevel::Debug)]
    #[case("INFO", LogLevel::Info)]
    #[case("warn", LogLevel::Warn)]
    #[case("Error", LogLevel::Error)]
    #[case(" fatal ", LogLevel::Fatal)]
    fn test_parse_known_levels(
        #[case] text: &str,
        #[case] expected: LogLevel,
    ) {
        assert_eq!(LogLevel::parse(text, false).unwrap(), expected);
    }

    /// `verbose` wins over whatever the text says, even invalid text.
    #[test]
    fn test_verbose_forces_debug() {
        assert_eq!(LogLevel::parse("error", true).unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::parse("nonsense", true).unwrap(), LogLevel::Debug);
    }

    #[test]
    fn test_unknown_level_is_rejected() {
        let err = LogLevel::parse("loud", false).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel { level } if level == "loud"));
    }

    #[test]
    fn test_threshold_ordering() {
        assert!(LogLevel::Info.allows(LogLevel::Warn));
        assert!(LogLevel::Info.allows(LogLevel::Info));
        assert!(!LogLevel::Warn.allows(LogLevel::Debug));
        assert_eq!(LogLevel::Fatal.as_directive(), "error");
    }
}
