use std::path::PathBuf;

use anyhow::Result;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::{plasma::Address, utils::logger::TracingMode};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Json,
}

#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Conf {
    pub data_directory: PathBuf,
    /// Receives the aggregated fee of every block.
    #[serde_as(as = "DisplayFromStr")]
    pub operator_address: Address,
    pub log_format: LogFormat,
}

impl Conf {
    pub fn new(
        config_file: Option<String>,
        data_directory: Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(File::from_str(
            include_str!("conf_defaults.toml"),
            FileFormat::Toml,
        ));
        if let Some(config_file) = config_file {
            builder = builder.add_source(File::with_name(config_file.as_str()));
        }
        let s = builder
            // Priority order: defaults, config file, then environment variables, then CLI
            .add_source(
                Environment::with_prefix("plasma")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("data_directory", data_directory)?
            .build()?;

        s.try_deserialize()
    }

    pub fn tracing_mode(&self) -> TracingMode {
        match self.log_format {
            LogFormat::Full => TracingMode::Full,
            LogFormat::Compact => TracingMode::Compact,
            LogFormat::Json => TracingMode::Json,
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_directory.join("ledger.db")
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults() {
        let conf = Conf::new(None, None).unwrap();
        assert_eq!(conf.data_directory, PathBuf::from("data_node"));
        assert_eq!(conf.log_format, LogFormat::Full);
        assert!(conf.operator_address.is_zero());
        assert_eq!(conf.ledger_path(), PathBuf::from("data_node/ledger.db"));
    }

    #[test]
    fn file_then_cli_override() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(
            file,
            "operator_address = \"0x00000000000000000000000000000000000000aa\"\nlog_format = \"json\"\ndata_directory = \"from_file\""
        )?;

        let path = file.path().to_string_lossy().to_string();
        let conf = Conf::new(Some(path), Some("from_cli".to_string()))?;
        assert_eq!(conf.operator_address.0[19], 0xaa);
        assert_eq!(conf.log_format, LogFormat::Json);
        assert_eq!(conf.data_directory, PathBuf::from("from_cli"));
        assert!(matches!(conf.tracing_mode(), TracingMode::Json));
        Ok(())
    }

    #[test]
    fn compact_and_unknown_log_formats() -> Result<()> {
        let conf: Conf = Config::builder()
            .add_source(File::from_str(
                include_str!("conf_defaults.toml"),
                FileFormat::Toml,
            ))
            .set_override("log_format", "compact")?
            .build()?
            .try_deserialize()?;
        assert_eq!(conf.tracing_mode(), TracingMode::Compact);

        let unknown = Config::builder()
            .add_source(File::from_str(
                include_str!("conf_defaults.toml"),
                FileFormat::Toml,
            ))
            .set_override("log_format", "pretty")?
            .build()?
            .try_deserialize::<Conf>();
        assert!(unknown.is_err());
        Ok(())
    }
}
