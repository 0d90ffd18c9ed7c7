use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_rustls::TlsAcceptor;

use nvhttpd::cache::ContentCache;
use nvhttpd::config::{LogSink, ServerConfig};
use nvhttpd::options::{Options, USAGE};
use nvhttpd::server::{listener, signals, tls};

const PRIMARY_CONFIG_PATH: &str = "/etc/nvhttpd/nvhttpd.conf";

#[tokio::main]
async fn main() -> Result<()> {
    let options = match Options::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{e}");
            eprint!("{USAGE}");
            std::process::exit(2);
        }
    };
    if options.show_version {
        println!("nvhttpd {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    if options.show_help {
        print!("{USAGE}");
        return Ok(());
    }

    let config = load_config(options.config_file.as_deref())?;
    init_logging(&config)?;

    write_pid_file(&config.pid_file)?;
    let result = run(&config).await;
    if let Err(e) = std::fs::remove_file(&config.pid_file) {
        tracing::warn!("unable to remove pid file {}: {e}", config.pid_file.display());
    }
    tracing::info!("shutting down server");
    result
}

async fn run(config: &ServerConfig) -> Result<()> {
    tracing::info!(name = %config.server_name, "starting up server");

    let cache = Arc::new(ContentCache::new());
    let count = cache
        .load(&config.html_root)
        .await
        .context("cache load failed")?;
    tracing::info!(files = count, "content cache loaded");

    let acceptor = if config.tls.enabled {
        let cert = config
            .tls
            .certificate
            .as_deref()
            .context("ssl certificate filename not specified")?;
        let key = config
            .tls
            .key
            .as_deref()
            .context("ssl key filename not specified")?;
        tracing::info!("ssl enabled");
        Some(TlsAcceptor::from(tls::server_context(cert, key)?))
    } else {
        tracing::info!("ssl disabled");
        None
    };

    signals::spawn_reload_watcher()?;

    tokio::select! {
        res = listener::run(config, Arc::clone(&cache), acceptor) => res,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            Ok(())
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<ServerConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let primary = PathBuf::from(PRIMARY_CONFIG_PATH);
            primary.exists().then_some(primary)
        }
    };
    match path {
        Some(path) => ServerConfig::load(&path)
            .with_context(|| format!("error reading config file {}", path.display())),
        None => {
            eprintln!("no config file specified and none found, using defaults");
            Ok(ServerConfig::default())
        }
    }
}

fn init_logging(config: &ServerConfig) -> Result<()> {
    let level = config.log_level.as_tracing();
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(level);
    match &config.log_sink {
        LogSink::Stdout => builder.init(),
        LogSink::Stderr => builder.with_writer(std::io::stderr).init(),
        LogSink::File(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("unable to open log file {}", path.display()))?;
            builder.with_writer(Arc::new(file)).with_ansi(false).init();
        }
    }
    Ok(())
}

fn write_pid_file(path: &Path) -> Result<()> {
    std::fs::write(path, format!("{}\n", std::process::id()))
        .with_context(|| format!("unable to write pid file {}", path.display()))
}
