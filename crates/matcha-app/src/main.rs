//! Matcha Launcher - console frontend over the launcher core.
//!
//! The binary wires the core's update controller and launch dispatcher to a
//! terminal frontend:
//! - update check/install against the fixed release endpoints
//! - user-mode and kernel-mode launch of the installed app
//! - settings inspection and editing
//! - automatic update check on a plain invocation, per the stored settings

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;
use matcha_core::{
    Frontend, LaunchDispatcher, LaunchMode, LauncherConfig, SettingsStore, UpdateController,
};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod console;

use console::ConsoleFrontend;

/// Matcha Launcher - keeps the Matcha app installed, updated, and running
#[derive(Parser, Debug)]
#[command(name = "matcha", version, about)]
struct Args {
    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Answer yes to every confirmation prompt
    #[arg(long, short = 'y')]
    assume_yes: bool,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Check the remote manifest and offer any available update
    Check,
    /// Check the remote manifest and install without further confirmation
    Update,
    /// Wipe the settings record and reinstall the configured package
    Reinstall,
    /// Launch the installed app
    Launch {
        /// Execution mode
        #[arg(value_enum)]
        mode: ModeArg,
    },
    /// Show or change persisted settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsCommand>,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print the current settings record
    Show,
    /// Change settings fields
    Set {
        /// Launch the app automatically after startup
        #[arg(long)]
        auto_launch: Option<bool>,
        /// Check for updates automatically on startup
        #[arg(long)]
        auto_update: Option<bool>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    User,
    Kernel,
}

impl From<ModeArg> for LaunchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::User => LaunchMode::User,
            ModeArg::Kernel => LaunchMode::Kernel,
        }
    }
}

/// Get the logs directory path.
fn logs_dir() -> Option<std::path::PathBuf> {
    ProjectDirs::from("com", "matcha", "Matcha").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging with file rotation.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("matcha={},warn", log_level)));

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("matcha")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                if args.debug {
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(std::io::stderr))
                        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                        .init();
                } else {
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                        .init();
                }

                return Some(guard);
            }
        }
    }

    // Fallback: console logging only.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::warn!("file logging unavailable, using console only");
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let _log_guard = init_logging(&args);

    let config =
        LauncherConfig::from_defaults().context("could not determine application directories")?;

    // `update` is an explicit request to install, so it implies consent.
    let assume_yes = args.assume_yes || matches!(args.command, Some(CliCommand::Update));
    let frontend: Arc<dyn Frontend> = Arc::new(ConsoleFrontend::new(assume_yes));

    run(args, config, frontend).await
}

async fn run(
    args: Args,
    config: LauncherConfig,
    frontend: Arc<dyn Frontend>,
) -> anyhow::Result<ExitCode> {
    let store = SettingsStore::new(&config.settings_path);
    let loaded = store.load();
    if loaded.corrupted {
        frontend.report_error("Settings file corrupted. Resetting to defaults.");
        store
            .save(&loaded.settings)
            .context("failed to rewrite settings")?;
    }

    let ok = match args.command {
        None => startup(&config, &loaded.settings, &frontend).await?,

        // `update` differs from `check` only through the implied consent.
        Some(CliCommand::Check) | Some(CliCommand::Update) => {
            let controller = UpdateController::new(&config, Arc::clone(&frontend))?;
            controller.check_and_offer_update().await.is_ok()
        }

        Some(CliCommand::Reinstall) => {
            let controller = UpdateController::new(&config, Arc::clone(&frontend))?;
            controller.reinstall().await.is_ok()
        }

        Some(CliCommand::Launch { mode }) => {
            let dispatcher = LaunchDispatcher::new(&config);
            match dispatcher.launch(mode.into()) {
                Ok(()) => {
                    frontend.report_info(&format!("Launched in {}.", LaunchMode::from(mode).label()));
                    true
                }
                Err(err) => {
                    frontend.report_error(&err.to_string());
                    false
                }
            }
        }

        Some(CliCommand::Settings { action }) => {
            settings_command(&store, &frontend, action)?;
            true
        }
    };

    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Plain invocation: run the startup auto-check, then report install state.
async fn startup(
    config: &LauncherConfig,
    settings: &matcha_core::Settings,
    frontend: &Arc<dyn Frontend>,
) -> anyhow::Result<bool> {
    let controller = Arc::new(UpdateController::new(config, Arc::clone(frontend))?);

    let mut ok = true;
    if settings.auto_update {
        if let Some(handle) = controller.spawn_startup_check() {
            // The console surface has nothing to do concurrently; await the
            // background check so its result is visible before we exit.
            ok = matches!(handle.await, Ok(Ok(_)));
        }
    }

    let dispatcher = LaunchDispatcher::new(config);
    if dispatcher.is_installed(LaunchMode::User) {
        frontend.report_info("Matcha is installed. Run `matcha launch user` to start it.");
    } else {
        frontend.report_info("Matcha is not installed yet. Run `matcha update` to install it.");
    }

    Ok(ok)
}

fn settings_command(
    store: &SettingsStore,
    frontend: &Arc<dyn Frontend>,
    action: Option<SettingsCommand>,
) -> anyhow::Result<()> {
    match action.unwrap_or(SettingsCommand::Show) {
        SettingsCommand::Show => {
            let settings = store.load().settings;
            let json =
                serde_json::to_string_pretty(&settings).context("failed to encode settings")?;
            frontend.report_info(&json);
        }
        SettingsCommand::Set {
            auto_launch,
            auto_update,
        } => {
            let mut settings = store.load().settings;
            if let Some(auto_launch) = auto_launch {
                settings.auto_launch = auto_launch;
            }
            if let Some(auto_update) = auto_update {
                settings.auto_update = auto_update;
            }
            store.save(&settings).context("failed to save settings")?;
            frontend.report_info("Settings saved.");
        }
    }
    Ok(())
}
