//! `rv`: a single binary that runs the reconciliation cycle loop, the
//! JSON-RPC server, or both, depending on the mode flags.

use anyhow::{Context, Result};
use clap::Parser;
use rv_config::AppConfig;
use rv_manager::ManagerService;
use rv_plugin::PluginRunner;
use rv_remote::{ClientManager, RemoteRepo};
use rv_rpc::RpcHandler;
use rv_store::Store;
use rv_worktree::WorktreeManager;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "rv", about = "Code review workstation: sync engine and RPC server")]
struct Cli {
    /// Run as a stdin/stdout JSON-RPC server only; no reconciliation loop.
    #[arg(long)]
    server: bool,

    /// Run exactly one reconciliation cycle, then exit.
    #[arg(long)]
    oneoff: bool,

    /// Path to a config file, overriding the default search order.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start the async runtime: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("startup failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    let db_path = config.resolve_db_path().context("resolving the Store's database path")?;
    let store = Store::open(&db_path).with_context(|| format!("opening the Store at {}", db_path.display()))?;

    let mut client_manager = ClientManager::new();
    let client = client_manager
        .get_client(None)
        .await
        .context("building the remote client")?;
    let remote: Arc<dyn RemoteRepo> = client;

    let worktrees = WorktreeManager::new(config.repo_location.clone(), store.clone());
    let plugins = PluginRunner::new(store.clone(), config.plugins.clone());

    if cli.oneoff {
        return run_oneoff(config, store, remote, worktrees, plugins).await;
    }

    if cli.server {
        return run_server_only(config, store, remote, plugins).await;
    }

    run_service(config, store, remote, worktrees, plugins).await
}

fn load_config(path: Option<&std::path::Path>) -> Result<AppConfig> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            AppConfig::load_from_str(&content).with_context(|| format!("parsing config file {}", path.display()))
        }
        None => Ok(AppConfig::load()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_bare_binary_name_with_no_flags() {
        let cli = Cli::parse_from(["rv"]);
        assert!(!cli.server);
        assert!(!cli.oneoff);
        assert!(cli.config.is_none());
    }

    #[test]
    fn parses_server_and_config_flags_together() {
        let cli = Cli::parse_from(["rv", "--server", "--config", "/tmp/rv.toml", "-vv"]);
        assert!(cli.server);
        assert!(!cli.oneoff);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/rv.toml")));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn missing_config_file_is_a_load_error_not_a_panic() {
        let missing = std::path::Path::new("/nonexistent/rv-cli-test-config.toml");
        assert!(load_config(Some(missing)).is_err());
    }
}

async fn run_oneoff(
    config: AppConfig,
    store: Store,
    remote: Arc<dyn RemoteRepo>,
    worktrees: WorktreeManager,
    plugins: PluginRunner,
) -> Result<()> {
    let lock_path = rv_config::paths::sync_lock_path().context("resolving the sync lock path")?;
    match ManagerService::try_new(config, store, remote, worktrees, plugins, &lock_path) {
        Some(service) => {
            let report = service.run_oneoff().await;
            log::info!(
                "oneoff cycle complete: {} added, {} updated, {} deleted, {} unchanged",
                report.result.added, report.result.updated, report.result.deleted, report.result.skipped
            );
            Ok(())
        }
        None => {
            log::warn!("sync lock already held by another process; skipping this oneoff cycle");
            Ok(())
        }
    }
}

/// Pure RPC mode: serves stdin/stdout until stdin closes or a shutdown
/// signal arrives. No reconciliation loop runs in this process.
async fn run_server_only(config: AppConfig, store: Store, remote: Arc<dyn RemoteRepo>, plugins: PluginRunner) -> Result<()> {
    let handler = RpcHandler::new(remote, store, plugins, &config);
    serve_until_shutdown(&handler).await
}

/// Default mode: attempts the advisory sync lock and, if acquired,
/// runs the cycle loop alongside the RPC server. If the lock is held
/// by another process, this process degrades to RPC-only, per
/// `spec.md` §5's cross-process exclusion rule.
async fn run_service(
    config: AppConfig,
    store: Store,
    remote: Arc<dyn RemoteRepo>,
    worktrees: WorktreeManager,
    plugins: PluginRunner,
) -> Result<()> {
    let handler = RpcHandler::new(Arc::clone(&remote), store.clone(), plugins.clone(), &config);

    let lock_path = rv_config::paths::sync_lock_path().context("resolving the sync lock path")?;
    let manager = ManagerService::try_new(config, store, remote, worktrees, plugins, &lock_path);

    match manager {
        Some(manager) => {
            let cycle_loop = async move { manager.run_service().await };
            tokio::select! {
                _ = cycle_loop => Ok(()),
                result = serve_until_shutdown(&handler) => result,
            }
        }
        None => {
            log::warn!("sync lock already held by another process; running the RPC server only");
            serve_until_shutdown(&handler).await
        }
    }
}

async fn serve_until_shutdown(handler: &RpcHandler) -> Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    tokio::select! {
        result = rv_rpc::serve(handler, stdin, stdout) => {
            result.context("JSON-RPC server loop failed")
        }
        _ = shutdown_signal() => {
            log::info!("shutdown signal received, exiting");
            Ok(())
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            log::warn!("failed to install SIGTERM handler: {err}");
            std::future::pending::<()>().await;
            unreachable!()
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
