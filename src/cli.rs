//! Interface de linha de comando do tmsync baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (export, import, status)
//! e flags globais (--config, --check-interval, --max-execution-time, --json,
//! --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tmsync::tms::Direction;

/// tmsync: envia e recebe traduções através da API de jobs do TMS.
#[derive(Debug, Parser)]
#[command(name = "tmsync", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./tms.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Segundos entre consultas de estado do job.
    #[arg(long, global = true)]
    pub check_interval: Option<u64>,

    /// Segundos máximos de espera por um job.
    #[arg(long, global = true)]
    pub max_execution_time: Option<u64>,

    /// Imprime o relatório final em JSON.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Direção de um job aceita pela CLI.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DirectionArg {
    Export,
    Import,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Export => Direction::Export,
            DirectionArg::Import => Direction::Import,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Exports the local catalog to the TMS.
    Export {
        /// Local translation catalog (JSON).
        #[arg(long)]
        catalog: PathBuf,

        /// Staging file written before upload.
        #[arg(long)]
        staging: PathBuf,
    },

    /// Imports translations from the TMS into the local catalog.
    Import {
        /// Local translation catalog (JSON); entries are merged into it.
        #[arg(long)]
        catalog: PathBuf,

        /// Staging file for the download; must not exist.
        #[arg(long)]
        staging: PathBuf,

        /// Languages to request, comma-separated. Overrides `languages` in the config.
        #[arg(long, value_delimiter = ',')]
        languages: Option<Vec<String>>,
    },

    /// Shows the current state of a job.
    Status {
        direction: DirectionArg,

        id: i64,
    },
}
