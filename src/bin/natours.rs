use clap::{Parser, Subcommand};
use natours::cli::{self as prog_cli, Command};
use natours::config::AppConfig;
use natours::logger;
use natours::params::QueryPreset;
use natours::resources::Resource;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "natours", version, about = "Natours resource handlers over an in-memory store", long_about = None)]
struct Cli {
    #[arg(long, help = "Path to a config file (TOML). Defaults to ./natours.toml when present.")]
    config: Option<PathBuf>,
    #[arg(long, help = "Log level (error|warn|info|debug|trace). Overrides config/env.")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

fn parse_preset(name: &str) -> Result<QueryPreset, String> {
    QueryPreset::by_name(name).ok_or_else(|| format!("unknown preset: {name} (try top-5-cheap)"))
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "List documents (filter, sort, select fields, paginate)")]
    List {
        #[arg(help = "Resource: tour or review")]
        resource: Resource,
        #[arg(long, help = "JSON array or NDJSON file with the documents to load")]
        data: Option<PathBuf>,
        #[arg(long, help = "Query string, e.g. 'duration[gte]=5&sort=-price&page=2'")]
        query: Option<String>,
        #[arg(long, value_parser = parse_preset, help = "Named query preset, e.g. top-5-cheap")]
        preset: Option<QueryPreset>,
    },
    #[command(about = "Fetch one document by id")]
    Get {
        resource: Resource,
        id: String,
        #[arg(long)]
        data: Option<PathBuf>,
    },
    #[command(about = "Create a document from a JSON body")]
    Create {
        resource: Resource,
        #[arg(long, help = "JSON object")]
        body: String,
        #[arg(long)]
        data: Option<PathBuf>,
    },
    #[command(about = "Update a document by id with a JSON body")]
    Update {
        resource: Resource,
        id: String,
        #[arg(long, help = "JSON object with the fields to change")]
        body: String,
        #[arg(long)]
        data: Option<PathBuf>,
    },
    #[command(about = "Delete a document by id")]
    Delete {
        resource: Resource,
        id: String,
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

impl From<Commands> for Command {
    fn from(c: Commands) -> Self {
        match c {
            Commands::List { resource, data, query, preset } => {
                Self::List { resource, data, query, preset }
            }
            Commands::Get { resource, id, data } => Self::Get { resource, id, data },
            Commands::Create { resource, body, data } => Self::Create { resource, body, data },
            Commands::Update { resource, id, body, data } => {
                Self::Update { resource, id, body, data }
            }
            Commands::Delete { resource, id, data } => Self::Delete { resource, id, data },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("config error: {e}");
            return ExitCode::from(2);
        }
    };
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }
    let logging = if config.log.dir.is_some() {
        logger::configure_from_config(&config.log)
    } else {
        logger::init_console(&config.log.level)
    };
    if let Err(e) = logging {
        eprintln!("logging disabled: {e}");
    }

    match prog_cli::run(cli.command.into(), &config).await {
        Ok(reply) => {
            match reply.to_json_pretty() {
                Ok(body) if !body.is_empty() => println!("{body}"),
                Ok(_) => log::info!("{} (no content)", reply.status_code),
                Err(e) => {
                    eprintln!("error: {e}");
                    return ExitCode::FAILURE;
                }
            }
            if reply.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE }
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
