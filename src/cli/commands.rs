use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use http::Method;

use crate::dispatcher::{Dispatcher, HandlerRequest};
use crate::logging::init_logging;
use crate::router::Router;
use crate::runtime_config::RouterConfig;
use crate::table::RouteTable;

/// Command-line interface for segroute
///
/// Loads a TOML route table and inspects or exercises it.
#[derive(Parser)]
#[command(name = "segroute")]
#[command(about = "segroute route table tool", long_about = None)]
pub struct Cli {
    /// Router config file (TOML); environment variables override it
    #[arg(short, long, global = true, env = "SEGROUTE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Install a tracing subscriber using the config's `[log]` settings
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the routing table in match order
    Routes {
        /// Route table file (TOML)
        #[arg(short, long)]
        table: PathBuf,
    },
    /// Dispatch a synthetic request and print the response
    Match {
        /// Route table file (TOML)
        #[arg(short, long)]
        table: PathBuf,

        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request target, may include a query string
        #[arg(short, long)]
        path: String,

        /// Request headers as `name: value`
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
}

/// Parse the process arguments and run the selected command against stdout
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&cli, &mut out)
}

/// Run a parsed command, writing its output to `out`
pub fn execute(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let config = match &cli.config {
        Some(path) => RouterConfig::load(path)?,
        None => RouterConfig::from_env(),
    };
    if cli.verbose {
        init_logging(&config.log)?;
    }

    match &cli.command {
        Commands::Routes { table } => {
            let router = load_router(table, &config)?;
            router.prepare_all();
            writeln!(out, "[routes] count={}", router.len())?;
            for line in router.describe_routes() {
                writeln!(out, "{line}")?;
            }
        }
        Commands::Match {
            table,
            method,
            path,
            headers,
        } => {
            let router = Arc::new(load_router(table, &config)?);
            let method = Method::from_bytes(method.as_bytes())
                .with_context(|| format!("Invalid method '{}'", method))?;

            let mut req = HandlerRequest::new(method, path);
            for header in headers {
                let (name, value) = header
                    .split_once(':')
                    .with_context(|| format!("Header '{}' is not 'name: value'", header))?;
                req = req.with_header(name.trim(), value.trim());
            }

            let dispatcher = Dispatcher::with_config(router, &config);
            let res = dispatcher.dispatch(req);
            writeln!(out, "status: {}", res.status)?;
            for (name, value) in &res.headers {
                writeln!(out, "{}: {}", name, value)?;
            }
            writeln!(out, "{}", serde_json::to_string_pretty(&res.body)?)?;
        }
    }
    Ok(())
}

fn load_router(table: &Path, config: &RouterConfig) -> Result<Router> {
    let table = RouteTable::load(table)?;
    let router = Router::with_config(config);
    table.register(&router)?;
    Ok(router)
}
