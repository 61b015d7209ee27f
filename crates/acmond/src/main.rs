use std::io::Write;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};

use acm_auth::{AuthClient, FileVault, SessionManager};
use acm_balance::BalanceFetcher;
use acm_config::{ConfigPaths, MonitorConfig};
use acm_monitor::{
    MarkerFileReloader, Notifier, RefreshOutcome, RefreshScheduler, TimelineReloader,
    VaultBalanceSource,
};
use acm_store::{SharedStore, WidgetSnapshot};
use acmond::{
    format_balance_lines, humanize_age, is_process_alive, read_pid_file, remove_pid_file,
    write_pid_file, DAEMON_VERSION,
};

#[derive(Parser)]
#[command(
    name = "acmond",
    version = DAEMON_VERSION,
    about = "AICodeMirror balance monitor daemon"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the monitor as a background process
    Start,
    /// Run the monitor in the foreground
    Run,
    /// Show daemon liveness and the cached account state
    Status,
    /// Terminate a running monitor
    Stop,
    /// Fetch the balance once and print it
    Once,
    /// Log in to the account site and store the session
    Login {
        /// Account email or phone number
        #[arg(long)]
        identifier: String,
        /// Password; falls back to $ACMOND_PASSWORD, then a prompt
        #[arg(long)]
        password: Option<String>,
    },
    /// Log out and clear the cached account data
    Logout,
    /// Print the daemon version
    Version,
}

fn read_pid(paths: &ConfigPaths) -> Option<u32> {
    read_pid_file(&paths.pid_path())
}

fn write_pid(paths: &ConfigPaths) -> anyhow::Result<()> {
    write_pid_file(&paths.pid_path())
}

fn remove_pid(paths: &ConfigPaths) {
    remove_pid_file(&paths.pid_path());
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: i32) -> anyhow::Result<()> {
    let pid = i32::try_from(pid).map_err(|_| anyhow::anyhow!("pid {pid} out of range"))?;
    // Safety: pid is a checked, positive process id.
    if unsafe { libc::kill(pid, signal) } != 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(())
}

fn open_store(paths: &ConfigPaths) -> anyhow::Result<Arc<SharedStore>> {
    Ok(Arc::new(SharedStore::open(&paths.store_path())?))
}

fn open_sessions(paths: &ConfigPaths) -> anyhow::Result<SessionManager> {
    let vault = Arc::new(FileVault::open(paths.vault_dir())?);
    Ok(SessionManager::new(vault))
}

#[cfg(feature = "desktop-notify")]
fn make_notifier() -> Arc<dyn Notifier> {
    Arc::new(acmond::desktop::DesktopNotifier)
}

#[cfg(not(feature = "desktop-notify"))]
fn make_notifier() -> Arc<dyn Notifier> {
    Arc::new(acm_monitor::LogNotifier)
}

fn build_scheduler(
    config: &MonitorConfig,
    paths: &ConfigPaths,
    store: Arc<SharedStore>,
) -> anyhow::Result<Arc<RefreshScheduler>> {
    let fetcher = BalanceFetcher::from_config(config)?;
    let source = Arc::new(VaultBalanceSource::new(open_sessions(paths)?, fetcher));
    let reloader = Arc::new(MarkerFileReloader::new(paths.reload_marker_path()));
    Ok(Arc::new(RefreshScheduler::new(
        source,
        store,
        make_notifier(),
        reloader,
    )))
}

fn resolve_password(flag: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = flag {
        return Ok(password);
    }
    if let Ok(password) = std::env::var("ACMOND_PASSWORD") {
        if !password.is_empty() {
            return Ok(password);
        }
    }
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("password must not be empty");
    }
    Ok(password)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "acmond=info,acm_monitor=info,acm_balance=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let paths = ConfigPaths::new()?;

    match cli.command {
        Commands::Start => {
            if let Some(pid) = read_pid(&paths) {
                if is_process_alive(pid) {
                    anyhow::bail!("acmond is already running (PID {pid}); stop it first");
                }
                tracing::warn!("PID file points at dead process {pid}; removing it");
                remove_pid(&paths);
            }

            paths.ensure_config_dir()?;

            let exe = std::env::current_exe()?;
            let out_log = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(paths.config_dir().join("acmond.out.log"))?;
            let err_log = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(paths.config_dir().join("acmond.err.log"))?;

            std::process::Command::new(&exe)
                .arg("run")
                .stdin(std::process::Stdio::null())
                .stdout(out_log)
                .stderr(err_log)
                .spawn()?;

            println!("acmond started.");
            Ok(())
        }

        Commands::Run => {
            let config = MonitorConfig::load_from(&paths)?;

            if let Some(pid) = read_pid(&paths) {
                if is_process_alive(pid) {
                    anyhow::bail!("acmond is already running (PID {pid}); stop it first");
                }
                tracing::warn!("PID file points at dead process {pid}; removing it");
                remove_pid(&paths);
            }

            paths.ensure_config_dir()?;
            write_pid(&paths)?;

            let store = open_store(&paths)?;
            let sessions = open_sessions(&paths)?;

            // Reconcile the login flag with the vault at startup; an
            // expired session reads as logged out here.
            let logged_in = sessions.load(Utc::now()).is_some();
            store.put_login_state(logged_in)?;

            let scheduler = build_scheduler(&config, &paths, store.clone())?;
            tracing::info!(
                "acmond running (logged_in={logged_in}, interval={}m, strategy={:?})",
                store.get_settings().refresh_interval_minutes,
                config.strategy
            );

            // Catch up right away if the cached snapshot is stale
            let _ = scheduler.refresh_if_stale(Utc::now()).await;

            let shutdown = async {
                #[cfg(unix)]
                {
                    let mut terminate =
                        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                            .expect("SIGTERM handler");
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = terminate.recv() => {}
                    }
                }
                #[cfg(not(unix))]
                {
                    tokio::signal::ctrl_c().await.expect("ctrl-c handler");
                }
            };

            tokio::select! {
                _ = scheduler.run() => {}
                _ = shutdown => {
                    tracing::info!("shutdown signal received; exiting");
                }
            }
            remove_pid(&paths);
            Ok(())
        }

        Commands::Status => {
            paths.ensure_config_dir()?;
            match read_pid(&paths) {
                Some(pid) if is_process_alive(pid) => {
                    println!("acmond is running (PID {pid})");
                }
                Some(pid) => {
                    println!("acmond is not running (stale PID file left by {pid})");
                    remove_pid(&paths);
                }
                None => {
                    println!("acmond is not running");
                }
            }

            let store = open_store(&paths)?;
            if store.get_login_state() {
                println!("Account: logged in");
            } else {
                println!("Account: logged out");
            }
            match store.get_balance() {
                Some(balance) => {
                    for line in format_balance_lines(&balance) {
                        println!("{line}");
                    }
                }
                None => println!("No cached balance"),
            }
            if let Some(last_update) = store.get_last_update() {
                println!("Last update: {}", humanize_age(Utc::now() - last_update));
            }
            Ok(())
        }

        Commands::Stop => {
            match read_pid(&paths) {
                Some(pid) if is_process_alive(pid) => {
                    println!("Asking acmond (PID {pid}) to stop...");
                    #[cfg(unix)]
                    send_signal(pid, libc::SIGTERM)?;
                    for _ in 0..50 {
                        if !is_process_alive(pid) {
                            break;
                        }
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    }
                    if is_process_alive(pid) {
                        println!("Still alive; sending SIGKILL.");
                        #[cfg(unix)]
                        send_signal(pid, libc::SIGKILL)?;
                    }
                    remove_pid(&paths);
                    println!("Stopped.");
                }
                Some(pid) => {
                    println!("acmond is not running; removed the stale PID file ({pid}).");
                    remove_pid(&paths);
                }
                None => {
                    println!("acmond is not running.");
                }
            }
            Ok(())
        }

        Commands::Once => {
            let config = MonitorConfig::load_from(&paths)?;
            paths.ensure_config_dir()?;
            let store = open_store(&paths)?;
            let scheduler = build_scheduler(&config, &paths, store)?;

            match scheduler.refresh().await {
                RefreshOutcome::Updated(balance) => {
                    for line in format_balance_lines(&balance) {
                        println!("{line}");
                    }
                    Ok(())
                }
                RefreshOutcome::Failed(detail) => anyhow::bail!("refresh failed: {detail}"),
                RefreshOutcome::Skipped => anyhow::bail!("a refresh is already in flight"),
            }
        }

        Commands::Login {
            identifier,
            password,
        } => {
            let config = MonitorConfig::load_from(&paths)?;
            paths.ensure_config_dir()?;
            let password = resolve_password(password)?;

            let client = AuthClient::new(&config.base_url)?;
            let cookies = client.login(&identifier, &password).await?;

            let sessions = open_sessions(&paths)?;
            let session = sessions.store_login(&cookies, Utc::now())?;

            let store = open_store(&paths)?;
            store.put_login_state(true)?;
            MarkerFileReloader::new(paths.reload_marker_path()).reload_all_timelines();

            println!("Logged in as {identifier}.");
            if let Some(expires_at) = session.expires_at {
                println!("Session expires {expires_at}.");
            }
            println!("Run 'acmond start' to begin monitoring.");
            Ok(())
        }

        Commands::Logout => {
            paths.ensure_config_dir()?;
            let sessions = open_sessions(&paths)?;
            sessions.clear();

            let store = open_store(&paths)?;
            store.clear_all()?;
            store.put_widget_snapshot(&WidgetSnapshot::logged_out(Utc::now()))?;
            MarkerFileReloader::new(paths.reload_marker_path()).reload_all_timelines();

            println!("Logged out; cached data cleared.");
            Ok(())
        }

        Commands::Version => {
            println!("acmond {}", DAEMON_VERSION);
            Ok(())
        }
    }
}
