use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use super::demo::{demo_router, MemorySessions};
use crate::config::RouterConfig;
use crate::logging::{init_logging_with_config, LogConfig};
use crate::router::Router;
use crate::server::HttpServer;
use crate::session::spawn_gc;

/// Command-line interface for routemux
#[derive(Parser)]
#[command(name = "routemux")]
#[command(version, about = "routemux demo server", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the demo application
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,

        /// Router configuration file (YAML)
        #[arg(short, long, env = "ROUTEMUX_CONFIG")]
        config: Option<PathBuf>,

        /// Number of may worker threads
        #[arg(long)]
        workers: Option<usize>,

        /// Human-readable logs
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Print the demo routing table
    Routes {
        #[arg(short, long, env = "ROUTEMUX_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Build the URL of a named demo route from name/value pairs
    Url {
        name: String,
        pairs: Vec<String>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<RouterConfig> {
    let cfg = match path {
        Some(p) => RouterConfig::load(p)
            .with_context(|| format!("failed to load config from {}", p.display()))?,
        None => RouterConfig::from_env().context("invalid router environment")?,
    };
    Ok(cfg)
}

/// One line per route: index, name, template, methods, handler kind.
#[must_use]
pub(crate) fn route_table(router: &Router) -> Vec<String> {
    router
        .routes()
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let methods: Vec<&str> = r.get_methods().iter().map(|m| m.as_str()).collect();
            let methods = if methods.is_empty() {
                "*".to_string()
            } else {
                methods.join(",")
            };
            format!(
                "{i:>3}  {:<10} {:<32} {:<12} {}",
                r.get_name().unwrap_or("-"),
                r.describe_template(),
                methods,
                r.handler_kind().map(|h| h.kind()).unwrap_or("build-only"),
            )
        })
        .collect()
}

pub(crate) fn build_url(router: &Router, name: &str, pairs: &[String]) -> Result<String> {
    let pairs: Vec<&str> = pairs.iter().map(String::as_str).collect();
    let url = router
        .url(name, &pairs)
        .map_err(|e| anyhow!("cannot build url for {name}: {e}"))?;
    Ok(url.to_string())
}

pub fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve {
            addr,
            config,
            workers,
            pretty,
        } => {
            let log_config = if pretty {
                LogConfig::dev()
            } else {
                LogConfig::from_env()
            };
            let _log_guard = init_logging_with_config(&log_config)?;

            if let Some(w) = workers {
                may::config().set_workers(w);
            }

            let cfg = load_config(config.as_ref())?;
            let gc_interval = cfg.session_gc_interval();
            let sessions = Arc::new(MemorySessions::new(gc_interval));
            let router = demo_router(cfg, Arc::clone(&sessions));
            if let Some((i, e)) = router.errors().into_iter().next() {
                return Err(anyhow!("route {i} is misconfigured: {e}"));
            }
            router.dump_routes();

            let _gc = spawn_gc(sessions, gc_interval).context("failed to start session gc")?;
            let handle = HttpServer::new(Arc::new(router))
                .start(addr.as_str())
                .with_context(|| format!("failed to bind {addr}"))?;
            info!(addr = %handle.addr(), "routemux demo ready");
            handle
                .join()
                .map_err(|e| anyhow!("server coroutine panicked: {e:?}"))?;
            Ok(())
        }
        Commands::Routes { config } => {
            let cfg = load_config(config.as_ref())?;
            let router = demo_router(cfg.clone(), Arc::new(MemorySessions::new(cfg.session_gc_interval())));
            for line in route_table(&router) {
                println!("{line}");
            }
            Ok(())
        }
        Commands::Url { name, pairs } => {
            let cfg = RouterConfig::default();
            let router = demo_router(cfg.clone(), Arc::new(MemorySessions::new(cfg.session_gc_interval())));
            println!("{}", build_url(&router, &name, &pairs)?);
            Ok(())
        }
    }
}
