//! Registered marketplaces: one reference file and one cached catalog each.

use std::path::{Path, PathBuf};

use {
    lola_config::LolaHome,
    serde::{Serialize, de::DeserializeOwned},
};

use crate::{
    catalog::{CatalogModule, MarketRef, Marketplace, fetch_catalog},
    error::{Error, Result},
};

/// Row for `lola market ls`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketSummary {
    pub name: String,
    pub url: String,
    pub enabled: bool,
    pub module_count: usize,
}

/// A catalog entry found by [`MarketRegistry::search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketHit {
    pub market: String,
    pub module: CatalogModule,
}

#[derive(Debug, Clone)]
pub struct MarketRegistry {
    market_dir: PathBuf,
    cache_dir: PathBuf,
}

impl MarketRegistry {
    pub fn new(home: &LolaHome) -> Self {
        Self::with_dirs(home.market_dir(), home.cache_dir())
    }

    pub fn with_dirs(market_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            market_dir: market_dir.into(),
            cache_dir: cache_dir.into(),
        }
    }

    fn ref_file(&self, name: &str) -> PathBuf {
        self.market_dir.join(format!("{name}.yml"))
    }

    fn cache_file(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{name}.yml"))
    }

    /// Register a marketplace after fetching and validating its catalog.
    pub fn add(&self, name: &str, url: &str) -> Result<Marketplace> {
        lola_modules::validate_module_name(name)?;
        if self.ref_file(name).exists() {
            return Err(Error::AlreadyExists {
                name: name.to_string(),
            });
        }
        let market = self.fetch(name, url)?;
        write_yaml(&self.ref_file(name), &market.reference())?;
        write_yaml(&self.cache_file(name), &market)?;
        tracing::info!(
            market = name,
            modules = market.modules.len(),
            "marketplace added"
        );
        Ok(market)
    }

    fn fetch(&self, name: &str, url: &str) -> Result<Marketplace> {
        let text = fetch_catalog(url)?;
        let market = Marketplace::from_catalog(&text, name, url)?;
        let errors = market.validate();
        if !errors.is_empty() {
            return Err(Error::Validation {
                name: name.to_string(),
                errors,
            });
        }
        Ok(market)
    }

    /// Reference files in name order.
    pub fn references(&self) -> Result<Vec<MarketRef>> {
        let entries = match std::fs::read_dir(&self.market_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut refs = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "yml") {
                continue;
            }
            match read_yaml::<MarketRef>(&path) {
                Ok(Some(reference)) => refs.push(reference),
                Ok(None) => {},
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable marketplace reference");
                },
            }
        }
        refs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(refs)
    }

    fn reference(&self, name: &str) -> Result<MarketRef> {
        read_yaml(&self.ref_file(name))?.ok_or_else(|| Error::not_found(name))
    }

    /// The cached catalog, if one has been fetched.
    pub fn cached(&self, name: &str) -> Result<Option<Marketplace>> {
        read_yaml(&self.cache_file(name))
    }

    pub fn list(&self) -> Result<Vec<MarketSummary>> {
        self.references()?
            .into_iter()
            .map(|r| {
                let module_count = self.cached(&r.name)?.map_or(0, |m| m.modules.len());
                Ok(MarketSummary {
                    name: r.name,
                    url: r.url,
                    enabled: r.enabled,
                    module_count,
                })
            })
            .collect()
    }

    /// Re-fetch one marketplace, or all of them. Returns the names refreshed.
    ///
    /// With no name, a marketplace that fails to refresh is logged and the
    /// rest still update; a named one propagates its error.
    pub fn update(&self, name: Option<&str>) -> Result<Vec<String>> {
        let targets = match name {
            Some(name) => vec![self.reference(name)?],
            None => self.references()?,
        };
        let mut refreshed = Vec::new();
        for reference in targets {
            let result = self.fetch(&reference.name, &reference.url).and_then(|mut market| {
                market.enabled = reference.enabled;
                write_yaml(&self.cache_file(&reference.name), &market)
            });
            match result {
                Ok(()) => refreshed.push(reference.name),
                Err(e) if name.is_some() => return Err(e),
                Err(e) => {
                    tracing::warn!(market = %reference.name, error = %e, "marketplace update failed");
                },
            }
        }
        Ok(refreshed)
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        let mut reference = self.reference(name)?;
        reference.enabled = enabled;
        write_yaml(&self.ref_file(name), &reference)?;
        if let Some(mut cache) = self.cached(name)? {
            cache.enabled = enabled;
            write_yaml(&self.cache_file(name), &cache)?;
        }
        tracing::debug!(market = name, enabled, "marketplace toggled");
        Ok(())
    }

    pub fn enable(&self, name: &str) -> Result<()> {
        self.set_enabled(name, true)
    }

    pub fn disable(&self, name: &str) -> Result<()> {
        self.set_enabled(name, false)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let ref_file = self.ref_file(name);
        if !ref_file.exists() {
            return Err(Error::not_found(name));
        }
        std::fs::remove_file(ref_file)?;
        if let Err(e) = std::fs::remove_file(self.cache_file(name))
            && e.kind() != std::io::ErrorKind::NotFound
        {
            return Err(e.into());
        }
        tracing::info!(market = name, "marketplace removed");
        Ok(())
    }

    /// Every enabled marketplace offering `module`, in marketplace name order.
    pub fn search(&self, module: &str) -> Result<Vec<MarketHit>> {
        let mut hits = Vec::new();
        for reference in self.references()?.into_iter().filter(|r| r.enabled) {
            let Some(cache) = self.cached(&reference.name)? else {
                continue;
            };
            if let Some(found) = cache.find(module) {
                hits.push(MarketHit {
                    market: reference.name,
                    module: found.clone(),
                });
            }
        }
        Ok(hits)
    }

    /// Look up `module` in one marketplace, enabled or not.
    pub fn find(&self, market: &str, module: &str) -> Result<CatalogModule> {
        self.reference(market)?;
        self.cached(market)?
            .and_then(|cache| cache.find(module).cloned())
            .ok_or_else(|| Error::ModuleNotFound {
                market: market.to_string(),
                module: module.to_string(),
            })
    }
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(Some(serde_yaml::from_str(&raw)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("yml.tmp");
    std::fs::write(&tmp, serde_yaml::to_string(value)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
