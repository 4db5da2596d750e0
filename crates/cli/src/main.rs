mod install_commands;
mod market_commands;
mod mod_commands;
mod prompt;

use std::path::PathBuf;

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    lola_config::{LolaConfig, LolaHome},
    lola_installer::Installer,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "lola",
    version,
    about = "Lola: install skills, commands and agents into AI assistants"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to config.toml.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Lola home directory (default ~/.lola).
    #[arg(long, global = true, env = "LOLA_HOME")]
    home: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the module registry.
    Mod {
        #[command(subcommand)]
        action: mod_commands::ModAction,
    },
    /// Install a module into one or more assistants.
    Install(install_commands::InstallArgs),
    /// Remove installed modules.
    Uninstall(install_commands::UninstallArgs),
    /// Re-apply registered modules to their installations.
    Update(install_commands::UpdateArgs),
    /// Show installations.
    List(install_commands::ListArgs),
    /// Manage marketplaces.
    Market {
        #[command(subcommand)]
        action: market_commands::MarketAction,
    },
}

/// Shared state for one invocation.
pub(crate) struct App {
    pub home: LolaHome,
    pub config: LolaConfig,
}

impl App {
    fn open(home: Option<PathBuf>) -> anyhow::Result<Self> {
        let home = match home {
            Some(root) => LolaHome::new(root),
            None => LolaHome::discover().context("cannot locate the lola home directory")?,
        };
        let config = lola_config::discover_and_load(&home);
        Ok(Self { home, config })
    }

    pub(crate) fn installer(&self) -> anyhow::Result<Installer> {
        self.home
            .ensure_dirs()
            .with_context(|| format!("cannot create {}", self.home.root().display()))?;
        let user_home = lola_config::user_home()?;
        Ok(Installer::new(self.home.clone(), user_home)?)
    }
}

fn init_telemetry(cli: &Cli, config: &LolaConfig) {
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let app = App::open(cli.home.clone())?;
    init_telemetry(&cli, &app.config);

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        home = %app.home.root().display(),
        "lola starting"
    );

    match cli.command {
        Commands::Mod { action } => mod_commands::handle_mod(&app, action),
        Commands::Install(args) => install_commands::handle_install(&app, args),
        Commands::Uninstall(args) => install_commands::handle_uninstall(&app, args),
        Commands::Update(args) => install_commands::handle_update(&app, args),
        Commands::List(args) => install_commands::handle_list(&app, args),
        Commands::Market { action } => market_commands::handle_market(&app, action),
    }
}
