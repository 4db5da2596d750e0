//! Marketplace catalogs and the two files each marketplace is stored in.

use std::{path::Path, time::Duration};

use {
    serde::{Deserialize, Serialize},
    url::Url,
};

use crate::error::{Error, Result};

const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

fn enabled_by_default() -> bool {
    true
}

/// `market/<name>.yml`: what the user registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketRef {
    pub name: String,
    pub url: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

/// One module advertised by a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogModule {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub repository: String,
}

/// `market/cache/<name>.yml`: the last fetched catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marketplace {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub modules: Vec<CatalogModule>,
}

impl Marketplace {
    /// Parse a catalog document. The local `name` and `url` replace whatever
    /// the document itself claims.
    pub fn from_catalog(text: &str, name: &str, url: &str) -> Result<Self> {
        let mut catalog: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(text)?
        };
        catalog.name = name.to_string();
        catalog.url = url.to_string();
        catalog.enabled = true;
        Ok(catalog)
    }

    /// Problems that make the catalog unusable. Empty when valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.is_empty() {
            errors.push("Missing required field: name".to_string());
        }
        if self.url.is_empty() {
            errors.push("Missing required field: url".to_string());
        }
        if !self.modules.is_empty() && self.version.is_empty() {
            errors.push("Missing version for marketplace catalog".to_string());
        }
        for (idx, module) in self.modules.iter().enumerate() {
            let label = if module.name.is_empty() {
                format!("Module #{}", idx + 1)
            } else {
                format!("Module '{}'", module.name)
            };
            for (field, value) in [
                ("name", &module.name),
                ("description", &module.description),
                ("version", &module.version),
                ("repository", &module.repository),
            ] {
                if value.is_empty() {
                    errors.push(format!("{label}: missing '{field}'"));
                }
            }
        }
        errors
    }

    pub fn reference(&self) -> MarketRef {
        MarketRef {
            name: self.name.clone(),
            url: self.url.clone(),
            enabled: self.enabled,
        }
    }

    pub fn find(&self, module: &str) -> Option<&CatalogModule> {
        self.modules.iter().find(|m| m.name == module)
    }
}

/// Read a catalog from an http(s) URL, a `file://` URL or a local path.
pub fn fetch_catalog(location: &str) -> Result<String> {
    match Url::parse(location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            let client = reqwest::blocking::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .user_agent(concat!("lola/", env!("CARGO_PKG_VERSION")))
                .build()?;
            let response = client.get(url).send()?;
            if !response.status().is_success() {
                return Err(Error::Download {
                    url: location.to_string(),
                    status: response.status().as_u16(),
                });
            }
            Ok(response.text()?)
        },
        Ok(url) if url.scheme() == "file" => {
            let path = url
                .to_file_path()
                .unwrap_or_else(|()| Path::new(url.path()).to_path_buf());
            Ok(std::fs::read_to_string(path)?)
        },
        _ => Ok(std::fs::read_to_string(location)?),
    }
}

/// Split `@market/module` into its parts.
pub fn parse_market_ref(reference: &str) -> Option<(&str, &str)> {
    let (market, module) = reference.strip_prefix('@')?.split_once('/')?;
    if market.is_empty() || module.is_empty() {
        return None;
    }
    Some((market, module))
}
