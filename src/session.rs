use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::asm::PrinterConfig;
use crate::codegen::LoweringConfig;

/// Contents of an `llvm-ops.toml` file. Every table is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub printer: PrinterConfig,
    pub lowering: LoweringConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// A `tracing_subscriber::EnvFilter` directive, `RUST_LOG` wins over it.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// What the tool writes to stdout after a successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum EmitKind {
    /// The module printed back in its textual form.
    #[default]
    Asm,
    /// The listing of the recorded host module.
    Host,
    /// The host module replayed into MLIR, needs the `mlir` feature.
    Mlir,
}

/// Everything one run works with.
#[derive(Debug, Clone)]
pub struct Session {
    /// The textual module to read.
    pub input: PathBuf,
    pub emit: EmitKind,
    /// Stop after verification.
    pub verify_only: bool,
    pub config: Config,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_tables_use_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[lowering]\njobs = 4").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.lowering.jobs, 4);
        assert_eq!(config.printer, PrinterConfig::default());
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[printer]\nindent = 4\nrenumber = true\n[lowering]\njobs = 2\n[log]\nfilter = \"llvm_ops=debug\""
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.printer.indent, 4);
        assert!(config.printer.renumber);
        assert_eq!(config.log.filter, "llvm_ops=debug");
    }

    #[test]
    fn reports_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("llvm-ops.toml");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Io { .. })));

        std::fs::write(&missing, "[lowering]\njobs = \"many\"\n").unwrap();
        assert!(matches!(Config::load(&missing), Err(ConfigError::Toml { .. })));
    }
}
