#![forbid(unsafe_code)]

//! `deck-console` — command-line client for the library manager backend.
//!
//! Each subcommand maps to one user action. Long-running actions stream the
//! backend console to stdout while they run; logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use deck_console::api::endpoints::{
    CreateShortcutData, PlatformsData, ProgramAction, ProgramsData, SetupData, ShortcutData,
    StateAction,
};
use deck_console::console::focus::ConsoleHeader;
use deck_console::console::FocusTarget;
use deck_console::console::sink::TerminalSink;
use deck_console::{ActionOutcome, App, AppError, GlobalConfig, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "deck-console",
    about = "Drive the library manager backend and follow its console",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend URL; overrides the config file and `DECK_CONSOLE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct PlatformArgs {
    /// Platform to include; repeat for several.
    #[arg(long = "platform")]
    platforms: Vec<String>,
    /// Preference flag passed through to the backend; repeatable.
    #[arg(long = "preference")]
    preferences: Vec<String>,
}

impl From<PlatformArgs> for PlatformsData {
    fn from(args: PlatformArgs) -> Self {
        Self {
            platforms: args.platforms,
            preferences: args.preferences,
        }
    }
}

#[derive(Debug, Args)]
struct ShortcutArgs {
    /// Display name.
    #[arg(long)]
    name: String,
    /// Executable to launch.
    #[arg(long)]
    executable: String,
    /// Working directory; defaults to the executable's folder.
    #[arg(long, default_value = "")]
    start_directory: String,
    /// Arguments passed to the executable.
    #[arg(long, default_value = "")]
    launch_options: String,
    /// Owning program identifier.
    #[arg(long, default_value = "")]
    program: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = "")]
    relative_path: String,
    #[arg(long, default_value = "")]
    icon_url: String,
    #[arg(long, default_value = "")]
    logo_url: String,
    #[arg(long, default_value = "")]
    cover_url: String,
    #[arg(long, default_value = "")]
    banner_url: String,
    #[arg(long, default_value = "")]
    hero_url: String,
    /// Library tag; repeatable.
    #[arg(long = "tag")]
    tags: Vec<String>,
}

impl ShortcutArgs {
    fn into_data(self, id: String) -> ShortcutData {
        ShortcutData {
            id,
            program: self.program,
            name: self.name,
            description: self.description,
            start_directory: self.start_directory,
            executable: self.executable,
            launch_options: self.launch_options,
            relative_path: self.relative_path,
            icon_url: self.icon_url,
            logo_url: self.logo_url,
            cover_url: self.cover_url,
            banner_url: self.banner_url,
            hero_url: self.hero_url,
            tags: self.tags,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the backend version.
    Version,
    /// List installable programs.
    Programs,
    /// List supported platforms.
    Platforms,
    /// List library shortcuts.
    Shortcuts,
    /// Print the current console buffer.
    Console,
    /// Empty the console buffer.
    Clear,
    /// Install programs and save the library.
    Install {
        /// Program identifiers.
        #[arg(required = true)]
        programs: Vec<String>,
    },
    /// Remove programs and save the library.
    Remove {
        /// Program identifiers.
        #[arg(required = true)]
        programs: Vec<String>,
        /// Preference flag passed through to the backend; repeatable.
        #[arg(long = "preference")]
        preferences: Vec<String>,
    },
    /// Process ROMs for the selected platforms.
    Roms(PlatformArgs),
    /// Back up emulator state.
    Backup(PlatformArgs),
    /// Restore emulator state.
    Restore(PlatformArgs),
    /// Run the initial storage setup.
    Setup {
        /// Root folder for emulation storage.
        storage_path: String,
        /// Link storage folders with symlinks.
        #[arg(long)]
        symlink: bool,
    },
    /// Open a link in the system browser.
    Open {
        /// URL to open.
        link: String,
    },
    /// Launch a shortcut.
    Launch {
        /// Shortcut identifier.
        id: String,
    },
    /// Delete a shortcut and save the library.
    Delete {
        /// Shortcut identifier.
        id: String,
    },
    /// Create a shortcut from a file, letting the backend detect it.
    Create {
        /// Executable or ROM path.
        path: String,
        /// Display name; derived from the file when omitted.
        #[arg(long, default_value = "")]
        name: String,
    },
    /// Add a shortcut described field by field.
    Add {
        /// Shortcut identifier; generated by the backend when omitted.
        #[arg(long, default_value = "")]
        id: String,
        #[command(flatten)]
        shortcut: ShortcutArgs,
    },
    /// Rewrite an existing shortcut.
    Edit {
        /// Shortcut identifier.
        id: String,
        #[command(flatten)]
        shortcut: ShortcutArgs,
    },
    /// Search artwork and metadata for a name.
    Scrape {
        /// Search term.
        term: String,
    },
    /// Sync the library with the launchers it feeds.
    Sync,
    /// Ask the backend to exit.
    Shutdown,
}

impl Command {
    fn label(&self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::Programs => "programs",
            Self::Platforms => "platforms",
            Self::Shortcuts => "shortcuts",
            Self::Console => "console",
            Self::Clear => "clear",
            Self::Install { .. } => "install",
            Self::Remove { .. } => "remove",
            Self::Roms(_) => "roms",
            Self::Backup(_) => "backup",
            Self::Restore(_) => "restore",
            Self::Setup { .. } => "setup",
            Self::Open { .. } => "open",
            Self::Launch { .. } => "launch",
            Self::Delete { .. } => "delete",
            Self::Create { .. } => "create",
            Self::Add { .. } => "add",
            Self::Edit { .. } => "edit",
            Self::Scrape { .. } => "scrape",
            Self::Sync => "sync",
            Self::Shutdown => "shutdown",
        }
    }
}

fn main() -> ExitCode {
    let args = Cli::parse();
    if let Err(err) = init_tracing(args.log_format) {
        eprintln!("Error: {err}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: failed to build tokio runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err.message());
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Cli) -> Result<GlobalConfig> {
    let mut config = match &args.config {
        Some(path) => GlobalConfig::load_from_path(path)?,
        None => GlobalConfig::default(),
    };
    config.apply_env()?;
    if let Some(url) = &args.base_url {
        config.set_base_url(url)?;
    }
    Ok(config)
}

async fn run(args: Cli) -> Result<()> {
    let config = load_config(&args)?;
    info!(base_url = %config.base_url, "configuration loaded");

    let sink = Arc::new(TerminalSink::new(std::io::stdout()));
    let app = App::from_config(&config, sink)?;
    let header = ConsoleHeader::new(args.command.label(), std::io::stdout());
    let focus = Some(&header as &dyn FocusTarget);

    let outcome = match args.command {
        Command::Version => {
            println!("{}", app.version().await?);
            return Ok(());
        }
        Command::Programs => return print_json(&app.list_programs().await?),
        Command::Platforms => return print_json(&app.list_platforms().await?),
        Command::Shortcuts => return print_json(&app.list_shortcuts().await?),
        Command::Scrape { term } => return print_json(&app.scrape(&term).await?),
        Command::Console => return app.coordinator().refresh().await,
        Command::Clear => return app.clear_console().await,
        Command::Shutdown => return app.shutdown().await,
        Command::Install { programs } => app.install(focus, programs).await?,
        Command::Remove {
            programs,
            preferences,
        } => {
            let data = ProgramsData {
                programs,
                preferences,
            };
            app.programs(focus, ProgramAction::Remove, data).await?
        }
        Command::Roms(platforms) => app.process_roms(focus, platforms.into()).await?,
        Command::Backup(platforms) => {
            app.sync_state(focus, StateAction::Backup, platforms.into())
                .await?
        }
        Command::Restore(platforms) => {
            app.sync_state(focus, StateAction::Restore, platforms.into())
                .await?
        }
        Command::Setup {
            storage_path,
            symlink,
        } => {
            let data = SetupData {
                use_symlink: symlink,
                storage_path,
            };
            app.setup(focus, data).await?
        }
        Command::Open { link } => app.open_link(&link).await?,
        Command::Launch { id } => app.launch_shortcut(focus, &id).await?,
        Command::Delete { id } => app.delete_shortcut(focus, &id).await?,
        Command::Create { path, name } => {
            app.create_shortcut(focus, CreateShortcutData { name, path })
                .await?
        }
        Command::Add { id, shortcut } => app.add_shortcut(focus, shortcut.into_data(id)).await?,
        Command::Edit { id, shortcut } => {
            app.update_shortcut(focus, shortcut.into_data(id)).await?
        }
        Command::Sync => app.sync_library(focus).await?,
    };

    if outcome == ActionOutcome::Ignored {
        error!("action ignored; another operation is still running");
    }
    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    println!("{text}");
    Ok(())
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
