//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

use crate::batch::BatchConfig;
use crate::registry::{DEFAULT_DIPLOMA_XSD, DEFAULT_FISCAL_XSD};

#[derive(Parser, Debug)]
#[command(
    name = "diploma-fiscal",
    version,
    about = "Validação e extração de arquivos XML de fiscalização de diplomas digitais"
)]
pub struct Cli {
    /// Address to bind the HTTP server on
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 5005)]
    pub port: u16,

    /// Directory holding the XSD schema files
    #[arg(long, default_value = "xsd")]
    pub xsd_dir: PathBuf,

    /// Fiscalization (primary) schema file, overriding the default
    /// inside the schema directory
    #[arg(long)]
    pub fiscal_xsd: Option<PathBuf>,

    /// Diploma (secondary) schema file, overriding the default inside
    /// the schema directory
    #[arg(long)]
    pub diploma_xsd: Option<PathBuf>,

    /// Per-fetch timeout for remote diploma documents, in seconds
    #[arg(long, default_value_t = 20)]
    pub fetch_timeout: u64,

    /// Concurrent files processed per batch (default: number of CPUs)
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Concurrent remote fetches per file
    #[arg(long, default_value_t = 8)]
    pub max_fetches: usize,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.fetch_timeout == 0 {
            return Err("fetch timeout must be at least 1 second".to_string());
        }
        if let Some(0) = self.workers {
            return Err("worker count must be at least 1".to_string());
        }
        if self.max_fetches == 0 {
            return Err("fetch concurrency must be at least 1".to_string());
        }
        Ok(())
    }

    /// Path of the fiscal schema, explicit override or default name
    /// under the schema directory.
    pub fn fiscal_xsd_path(&self) -> PathBuf {
        self.fiscal_xsd
            .clone()
            .unwrap_or_else(|| self.xsd_dir.join(DEFAULT_FISCAL_XSD))
    }

    /// Path of the diploma schema, same resolution rules.
    pub fn diploma_xsd_path(&self) -> PathBuf {
        self.diploma_xsd
            .clone()
            .unwrap_or_else(|| self.xsd_dir.join(DEFAULT_DIPLOMA_XSD))
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            max_concurrent_files: self.workers.unwrap_or_else(num_cpus::get),
            max_concurrent_fetches: self.max_fetches,
            fetch_timeout_seconds: self.fetch_timeout,
        }
    }
}
