//! `lola market ...`: marketplace catalogs.

use {
    anyhow::{Result, bail},
    clap::Subcommand,
    lola_market::MarketRegistry,
};

use crate::App;

#[derive(Subcommand)]
pub enum MarketAction {
    /// Register a marketplace catalog (http(s) URL, file:// URL or path).
    Add { name: String, url: String },
    /// List registered marketplaces.
    #[command(alias = "list")]
    Ls,
    /// Re-fetch one marketplace catalog, or all of them.
    Update { name: Option<String> },
    /// Enable or disable a marketplace for module lookup.
    Set {
        name: String,
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
    },
    /// Remove a marketplace and its cached catalog.
    #[command(alias = "remove")]
    Rm { name: String },
}

pub fn handle_market(app: &App, action: MarketAction) -> Result<()> {
    let markets = MarketRegistry::new(&app.home);
    match action {
        MarketAction::Add { name, url } => {
            let market = markets.add(&name, &url)?;
            println!(
                "Added marketplace '{}' with {} module(s).",
                market.name,
                market.modules.len()
            );
        },
        MarketAction::Ls => {
            let list = markets.list()?;
            if list.is_empty() {
                println!("No marketplaces registered. Add one with `lola market add <name> <url>`.");
            }
            for market in list {
                let status = if market.enabled {
                    "enabled"
                } else {
                    "disabled"
                };
                println!(
                    "  {} ({status}): {} module(s) from {}",
                    market.name, market.module_count, market.url
                );
            }
        },
        MarketAction::Update { name } => {
            let refreshed = markets.update(name.as_deref())?;
            if refreshed.is_empty() {
                println!("No marketplaces updated.");
            }
            for name in refreshed {
                println!("Updated marketplace '{name}'.");
            }
        },
        MarketAction::Set {
            name,
            enable,
            disable,
        } => {
            if enable == disable {
                bail!("pass exactly one of --enable or --disable");
            }
            markets.set_enabled(&name, enable)?;
            println!(
                "Marketplace '{name}' {}.",
                if enable {
                    "enabled"
                } else {
                    "disabled"
                }
            );
        },
        MarketAction::Rm { name } => {
            markets.remove(&name)?;
            println!("Removed marketplace '{name}'.");
        },
    }
    Ok(())
}
