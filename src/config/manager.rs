//! Configuration file wrangling
// (c) 2025 Ross Younger

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use figment::{
    providers::{Env, Format as _, Toml},
    Figment, Provider,
};
use serde::Deserialize;
use tracing::debug;

use super::{Configuration, ConfigurationOverrides, SystemDefault};

/// Prefix for configuration environment variables
pub(crate) const ENV_PREFIX: &str = "FTC_";

/// File name of the configuration files
const CONFIG_FILE: &str = "ftc.toml";

/// Processes and merges all possible configuration sources.
///
/// In increasing order of precedence: system defaults, the system configuration file,
/// the user configuration file, `FTC_*` environment variables, command-line options.
/// Run `ftc --config-files` to see which files apply.
#[derive(Debug, Clone)]
pub struct Manager {
    /// Configuration data
    pub(super) data: Figment,
}

impl Manager {
    /// Constructor
    pub(super) fn new(apply_config_files: bool, apply_env: bool) -> Self {
        let mut new1 = Self {
            data: Figment::from(SystemDefault {}),
        };
        if apply_config_files {
            for path in Self::config_paths() {
                new1.add_config(&path);
            }
        }
        if apply_env {
            new1.merge_provider(Env::prefixed(ENV_PREFIX));
        }
        new1
    }

    /// General constructor for production use
    ///
    /// Reads the configuration files appropriate to the platform and the current user,
    /// and the environment.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(true, true)
    }

    /// Testing constructor; reads no files and ignores the environment
    #[must_use]
    #[cfg(test)]
    pub(crate) fn without_files() -> Self {
        Self::new(false, false)
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![Path::new("/etc").join(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("ftc").join(CONFIG_FILE));
        }
        paths
    }

    fn add_config(&mut self, path: &Path) {
        if !path.exists() {
            debug!("configuration file {path:?} not present");
            return;
        }
        self.merge_toml_file(path);
    }

    /// Returns the list of configuration files we read.
    ///
    /// This is a function of platform and the current user.
    #[must_use]
    pub fn config_files() -> Vec<String> {
        Self::config_paths()
            .iter()
            .map(|p| p.as_os_str().to_string_lossy().to_string())
            .collect()
    }

    /// Merges in a data set, which is some sort of [figment::Provider](https://docs.rs/figment/latest/figment/trait.Provider.html).
    /// This uses figment's `merge` operation, which prefers to _replace_ existing items.
    pub fn merge_provider<T>(&mut self, provider: T)
    where
        T: Provider,
    {
        let f = std::mem::take(&mut self.data);
        self.data = f.merge(provider); // in the error case, this leaves the provider in a fused state
    }

    /// Merges in a TOML configuration file
    pub fn merge_toml_file<F: AsRef<Path>>(&mut self, file: F) {
        self.merge_provider(Toml::file(file.as_ref()));
    }

    /// Attempts to extract a particular struct from the data.
    ///
    /// `T` is usually [Configuration], but it isn't intrinsically required to be.
    pub(crate) fn get<'de, T>(&self) -> Result<T>
    where
        T: Deserialize<'de>,
    {
        self.data
            .extract_lossy::<T>()
            .context("invalid configuration")
    }

    /// Extracts and validates the [Configuration]
    pub fn configuration(&self) -> Result<Configuration> {
        self.get::<Configuration>()?.validate()
    }
}

impl From<&ConfigurationOverrides> for Manager {
    fn from(overrides: &ConfigurationOverrides) -> Self {
        let mut mgr = Manager::standard();
        mgr.merge_provider(overrides.clone());
        mgr
    }
}
