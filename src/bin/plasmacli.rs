use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use plasma_ledger::{
    query::Querier,
    store::{DataStore, SledKv},
    utils::{
        conf::Conf,
        crypto::EthCrypto,
        logger::{setup_tracing, LogMe},
    },
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    command: Commands,

    #[arg(long)]
    pub config_file: Option<String>,

    #[arg(long)]
    pub data_directory: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reads the local ledger, e.g. `query balance/0x..` or `query blocks/latest`
    Query { path: String },
    /// Prints the development address derived from a seed
    Address { seed: String },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let conf = Conf::new(args.config_file, args.data_directory).context("reading config file")?;
    setup_tracing(&conf).context("setting up tracing")?;

    match args.command {
        Commands::Query { path } => {
            debug!("opening ledger at {}", conf.ledger_path().display());
            let kv = SledKv::open(&conf.ledger_path(), "ledger").log_error("opening ledger")?;
            let querier = Querier::new(DataStore::new(kv));
            let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
            let body = querier
                .query(&segments)
                .with_context(|| format!("querying {path}"))?;
            println!("{}", String::from_utf8_lossy(&body));
        }
        Commands::Address { seed } => {
            println!("{}", EthCrypto::new(&seed)?.address());
        }
    }
    Ok(())
}
