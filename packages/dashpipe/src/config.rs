use crate::engine::chart::ColorRamp;
use crate::engine::view::{DeriveOptions, DEFAULT_TOP_N};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

pub const ENV_PAGE_SIZE: &str = "DASHPIPE_PAGE_SIZE";
pub const ENV_STORE_PATH: &str = "DASHPIPE_STORE_PATH";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub page_size: usize,
    pub top_n: usize,
    pub store_path: PathBuf,
    pub color_ramp: ColorRamp,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            top_n: DEFAULT_TOP_N,
            store_path: PathBuf::from("data/dashpipe.json"),
            color_ramp: ColorRamp::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: DashboardConfig =
            serde_yaml::from_str(text).context("Failed to parse dashboard config")?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_PAGE_SIZE) {
            self.page_size = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_PAGE_SIZE} is not a number: {raw:?}"))?;
        }
        if let Some(raw) = lookup(ENV_STORE_PATH) {
            self.store_path = PathBuf::from(raw);
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        Ok(())
    }

    pub fn derive_options(&self) -> Result<DeriveOptions> {
        let page_size = NonZeroUsize::new(self.page_size).context("page_size must be at least 1")?;
        Ok(DeriveOptions {
            page_size,
            top_n: self.top_n,
            color_ramp: self.color_ramp.clone(),
        })
    }
}

/// Load the dashboard config. A missing file means defaults; environment
/// overrides are applied either way.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<DashboardConfig> {
    let config_path = path.as_ref();
    let mut config = if config_path.exists() {
        let text = fs::read_to_string(config_path)
            .context(format!("Failed to read dashboard config: {:?}", config_path))?;
        DashboardConfig::from_yaml(&text)?
    } else {
        tracing::debug!(path = ?config_path, "no config file, using defaults");
        DashboardConfig::default()
    };
    config.apply_overrides(|key| std::env::var(key).ok())?;
    Ok(config)
}
