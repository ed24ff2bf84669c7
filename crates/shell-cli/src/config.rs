use anyhow::{Context, Result, bail};
use log::LevelFilter;
use std::env;

pub const LOG_VAR: &str = "UM_LOG";
pub const MAX_STEPS_VAR: &str = "UM_MAX_STEPS";

/// Runtime settings. The command line carries only the image path, so
/// everything else comes from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_level: LevelFilter,
    /// Instruction budget; exhausting it is fatal.
    pub max_steps: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::Warn,
            max_steps: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(env::var(LOG_VAR).ok(), env::var(MAX_STEPS_VAR).ok())
    }

    fn from_vars(log: Option<String>, max_steps: Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(level) = log.filter(|v| !v.trim().is_empty()) {
            config.log_level = level
                .trim()
                .parse()
                .with_context(|| format!("{LOG_VAR}={level:?} is not a log level"))?;
        }

        if let Some(steps) = max_steps.filter(|v| !v.trim().is_empty()) {
            let steps: u64 = steps
                .trim()
                .parse()
                .with_context(|| format!("{MAX_STEPS_VAR}={steps:?} is not a number"))?;
            if steps == 0 {
                bail!("{MAX_STEPS_VAR} must be positive");
            }
            config.max_steps = Some(steps);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(log: Option<&str>, steps: Option<&str>) -> Result<Config> {
        Config::from_vars(log.map(String::from), steps.map(String::from))
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(vars(None, None).unwrap(), Config::default());
        assert_eq!(vars(Some(""), Some("  ")).unwrap(), Config::default());
    }

    #[test]
    fn parses_levels_case_insensitively() {
        assert_eq!(vars(Some("TRACE"), None).unwrap().log_level, LevelFilter::Trace);
        assert_eq!(vars(Some("off"), None).unwrap().log_level, LevelFilter::Off);
    }

    #[test]
    fn parses_step_budget() {
        assert_eq!(vars(None, Some("5000")).unwrap().max_steps, Some(5000));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(vars(Some("loud"), None).is_err());
        assert!(vars(None, Some("many")).is_err());
        assert!(vars(None, Some("0")).is_err());
    }
}
