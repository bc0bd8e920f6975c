use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::info;

use crate::record::FieldSet;
use crate::server;
use crate::service::ScrapeService;
use crate::Config;

#[derive(Parser)]
#[command(name = "sekolah-scraper")]
#[command(about = "Concurrent school-data scraper for the kemendikdasmen portal")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Detail worker count")]
    pub workers: Option<usize>,

    #[arg(long, help = "Page-load timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Chrome executable path")]
    pub chrome_path: Option<String>,

    #[arg(long, help = "Region registry JSON file")]
    pub registry: Option<String>,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scrape one region and print (or save) the records as JSON
    Scrape {
        #[arg(short, long, help = "Region (kecamatan) display name")]
        region: String,

        #[arg(
            short,
            long,
            help = "Comma-separated field names, e.g. \"Nama Sekolah,NPSN,Email\""
        )]
        fields: String,

        #[arg(short, long, help = "Output file (stdout when omitted)")]
        output: Option<PathBuf>,
    },

    /// Start the REST API server
    Serve {
        #[arg(short, long, default_value = "8000", help = "Server port")]
        port: u16,

        #[arg(long, default_value = "0.0.0.0", help = "Bind address")]
        bind: String,
    },

    /// List the region names known to the registry
    Regions,
}

pub struct CliRunner {
    pub config: Config,
    pub service: Arc<ScrapeService>,
}

impl CliRunner {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let service = Arc::new(ScrapeService::new(config.clone())?);
        Ok(Self { config, service })
    }

    pub async fn run(&self, command: Commands) -> anyhow::Result<()> {
        match command {
            Commands::Scrape {
                region,
                fields,
                output,
            } => self.run_scrape(region, fields, output).await,
            Commands::Serve { port, bind } => {
                server::serve(self.service.clone(), &bind, port).await?;
                Ok(())
            }
            Commands::Regions => {
                for name in self.service.region_names() {
                    println!("{name}");
                }
                Ok(())
            }
        }
    }

    async fn run_scrape(
        &self,
        region: String,
        fields: String,
        output: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        let names: Vec<&str> = fields.split(',').map(str::trim).collect();
        let field_set = FieldSet::parse(&names)?;

        let records = self.service.scrape(&region, &field_set).await?;
        let json = serde_json::to_string_pretty(&records)?;

        match output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).await?;
                }
                fs::write(&path, &json).await?;
                info!("Wrote {} records to {}", records.len(), path.display());
            }
            None => println!("{json}"),
        }
        Ok(())
    }
}

pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}
