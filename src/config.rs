use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_SIMILARITY_THRESHOLD};
use crate::error::{PipelineError, Result};

/// Optional TOML configuration file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// The `[pipeline]` table; every key may also come from the command line
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub threshold: Option<u8>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        toml::from_str(&config_content).map_err(|e| {
            PipelineError::Config(format!(
                "Invalid config file '{}': {}",
                config_path.display(),
                e
            ))
        })
    }
}

/// Fully resolved settings for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub input: PathBuf,
    pub output: PathBuf,
    pub batch_size: usize,
    pub threshold: u8,
}

impl Settings {
    /// Layer command-line values over file values over defaults, then validate
    pub fn resolve(file: PipelineConfig, cli: PipelineConfig) -> Result<Self> {
        let input = cli
            .input
            .or(file.input)
            .ok_or_else(|| PipelineError::Config("no input path given".to_string()))?;
        let output = cli
            .output
            .or(file.output)
            .ok_or_else(|| PipelineError::Config("no output path given".to_string()))?;
        let batch_size = cli.batch_size.or(file.batch_size).unwrap_or(DEFAULT_BATCH_SIZE);
        let threshold = cli
            .threshold
            .or(file.threshold)
            .unwrap_or(DEFAULT_SIMILARITY_THRESHOLD);

        let settings = Settings {
            input,
            output,
            batch_size,
            threshold,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(PipelineError::Config("batch size must be at least 1".to_string()));
        }
        if self.threshold > 100 {
            return Err(PipelineError::Config(format!(
                "similarity threshold must be between 0 and 100, got {}",
                self.threshold
            )));
        }
        if self.input == self.output {
            return Err(PipelineError::Config(
                "input and output must be different files".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(input: Option<&str>, output: Option<&str>) -> PipelineConfig {
        PipelineConfig {
            input: input.map(PathBuf::from),
            output: output.map(PathBuf::from),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings =
            Settings::resolve(PipelineConfig::default(), cli(Some("in.jsonl"), Some("out.parquet"))).unwrap();
        assert_eq!(settings.batch_size, 100_000);
        assert_eq!(settings.threshold, 92);
    }

    #[test]
    fn command_line_overrides_file() {
        let file: Config = toml::from_str(
            r#"
            [pipeline]
            input = "data/raw/companies.jsonl"
            output = "data/curated/companies_scd2.parquet"
            batch_size = 500
            threshold = 88
            "#,
        )
        .unwrap();
        let overrides = PipelineConfig {
            threshold: Some(95),
            ..cli(None, Some("elsewhere.parquet"))
        };

        let settings = Settings::resolve(file.pipeline, overrides).unwrap();
        assert_eq!(settings.input, PathBuf::from("data/raw/companies.jsonl"));
        assert_eq!(settings.output, PathBuf::from("elsewhere.parquet"));
        assert_eq!(settings.batch_size, 500);
        assert_eq!(settings.threshold, 95);
    }

    #[test]
    fn missing_input_is_a_config_error() {
        let err = Settings::resolve(PipelineConfig::default(), cli(None, Some("out.parquet"))).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn rejects_zero_batch_and_out_of_range_threshold() {
        let zero = PipelineConfig {
            batch_size: Some(0),
            ..cli(Some("a"), Some("b"))
        };
        assert!(Settings::resolve(PipelineConfig::default(), zero).is_err());

        let high = PipelineConfig {
            threshold: Some(101),
            ..cli(Some("a"), Some("b"))
        };
        assert!(Settings::resolve(PipelineConfig::default(), high).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("[pipeline]\nchunk = 5\n");
        assert!(result.is_err());
    }

    #[test]
    fn load_reports_invalid_toml_as_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        fs::write(&path, "[pipeline]\nbatch_size = \"many\"\n").unwrap();

        match Config::load(&path) {
            Err(PipelineError::Config(message)) => assert!(message.contains("Invalid config file")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
