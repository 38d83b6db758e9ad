use std::env;

use log::LevelFilter;

use crate::error::FatalError;

pub(crate) const LOG_VAR: &str = "TINYSH_LOG";
pub(crate) const MAX_ARGS_VAR: &str = "TINYSH_MAX_ARGS";

// 64 argument slots, one of them reserved for the terminating null pointer
pub(crate) const DEFAULT_MAX_ARGS: usize = 63;

#[derive(Debug, PartialEq)]
pub(crate) struct Config {
    pub(crate) log_level: LevelFilter,
    pub(crate) max_args: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: LevelFilter::Warn,
            max_args: DEFAULT_MAX_ARGS,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub(crate) fn from_env() -> Result<Self, FatalError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, FatalError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(level) = lookup(LOG_VAR) {
            config.log_level = level.trim().parse().map_err(|_| {
                FatalError::Config(format!("{}: unknown log level {:?}", LOG_VAR, level))
            })?;
        }

        if let Some(max_args) = lookup(MAX_ARGS_VAR) {
            config.max_args = match max_args.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(FatalError::Config(format!(
                        "{}: expected a positive number, got {:?}",
                        MAX_ARGS_VAR, max_args
                    )))
                }
            };
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use log::LevelFilter;

    use super::Config;
    use crate::error::FatalError;

    fn lookup(vars: &[(&str, &str)]) -> Result<Config, FatalError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(lookup(&[]), Ok(Config::default()));
        assert_eq!(Config::default().max_args, 63);
        assert_eq!(Config::default().log_level, LevelFilter::Warn);
    }

    #[test]
    fn test_overrides() {
        assert_eq!(
            lookup(&[("TINYSH_LOG", "Debug"), ("TINYSH_MAX_ARGS", " 8 ")]),
            Ok(Config {
                log_level: LevelFilter::Debug,
                max_args: 8
            })
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            lookup(&[("TINYSH_LOG", "loud")]),
            Err(FatalError::Config(_))
        ));
        assert!(matches!(
            lookup(&[("TINYSH_MAX_ARGS", "0")]),
            Err(FatalError::Config(_))
        ));
        assert!(matches!(
            lookup(&[("TINYSH_MAX_ARGS", "many")]),
            Err(FatalError::Config(_))
        ));
    }
}
