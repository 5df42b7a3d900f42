//! Lowering configuration
//!
//! ```toml
//! enforce_exclusivity = true
//! exclusive_modifiers = ["seq", "independent", "auto"]
//! accept_dtype_alias = true
//! ```
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    clause::{ClauseOptions, ModifierKind},
    grammar::{ClauseGrammar, LoopGrammar, PermissiveGrammar},
    utils::{Error, Result},
};

/// Environment variable overriding the location of the configuration file.
pub const ENV_CONFIG_PATH: &str = "HYACC_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoweringConfig {
    /// Reject directives where two exclusive modifiers apply to one device type.
    pub enforce_exclusivity: bool,
    /// Modifiers that are pairwise exclusive per device type.
    pub exclusive_modifiers: Vec<ModifierKind>,
    /// Accept `dtype(..)` as a spelling of `device_type(..)`.
    pub accept_dtype_alias: bool,
}

impl Default for LoweringConfig {
    fn default() -> Self {
        Self {
            enforce_exclusivity: true,
            exclusive_modifiers: vec![
                ModifierKind::Seq,
                ModifierKind::Independent,
                ModifierKind::Auto,
            ],
            accept_dtype_alias: true,
        }
    }
}

impl LoweringConfig {
    /// Get the default path of the configuration file.
    pub fn default_path() -> PathBuf {
        Self::path_from_env(|key| std::env::var(key).ok())
    }

    /// Resolve the configuration path from the variables `env` returns:
    /// [`ENV_CONFIG_PATH`] first, then the user configuration directory.
    pub fn path_from_env(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        // Check if the environment variable is set
        if let Some(config_path) = env(ENV_CONFIG_PATH) {
            return config_path.into();
        }

        let mut path = PathBuf::new();

        #[cfg(target_os = "windows")]
        {
            if let Some(appdata) = env("APPDATA") {
                path.push(appdata);
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Some(xdg_config_home) = env("XDG_CONFIG_HOME") {
                path.push(xdg_config_home);
            } else if let Some(home) = env("HOME") {
                path.push(home);
                path.push(".config");
            } else {
                // Fallback to current directory if HOME is not set
            }
        }

        path.push("hyacc");
        path.push("lowering.toml");
        path
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::ConfigParse {
            source: e,
            file: "<string>".to_string(),
        })
    }

    /// Load the configuration from a TOML file.
    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let toml_str = std::fs::read_to_string(path)?;

        toml::from_str(&toml_str).map_err(|e| Error::ConfigParse {
            source: e,
            file: path.display().to_string(),
        })
    }

    /// Load the file at [`Self::default_path`] if it exists, otherwise return
    /// the default configuration.
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_path();
        if path.is_file() {
            Self::load_from_toml(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    pub fn clause_options(&self) -> ClauseOptions {
        ClauseOptions {
            accept_dtype_alias: self.accept_dtype_alias,
        }
    }

    /// The clause grammar this configuration asks for.
    pub fn grammar(&self) -> Box<dyn ClauseGrammar + Send + Sync> {
        if self.enforce_exclusivity {
            Box::new(LoopGrammar::new(self.exclusive_modifiers.iter().copied()))
        } else {
            Box::new(PermissiveGrammar)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let config = LoweringConfig::from_toml_str("accept_dtype_alias = false").unwrap();
        assert!(!config.accept_dtype_alias);
        assert!(config.enforce_exclusivity);
        assert_eq!(config.exclusive_modifiers.len(), 3);
        assert!(!config.clause_options().accept_dtype_alias);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = LoweringConfig {
            enforce_exclusivity: false,
            exclusive_modifiers: vec![ModifierKind::Seq, ModifierKind::Auto],
            accept_dtype_alias: true,
        };
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("\"seq\""));
        assert_eq!(LoweringConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn unknown_modifier_is_a_config_error() {
        let err = LoweringConfig::from_toml_str("exclusive_modifiers = [\"gang\"]").unwrap_err();
        assert!(err.is_config_parse());
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn path_lookup_order() {
        fn env<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
            move |key: &str| {
                vars.iter()
                    .find(|(name, _)| *name == key)
                    .map(|(_, value)| value.to_string())
            }
        }

        let all = [
            (ENV_CONFIG_PATH, "/etc/hyacc.toml"),
            ("XDG_CONFIG_HOME", "/xdg"),
            ("HOME", "/home/user"),
        ];
        assert_eq!(
            LoweringConfig::path_from_env(env(&all)),
            PathBuf::from("/etc/hyacc.toml")
        );
        assert_eq!(
            LoweringConfig::path_from_env(env(&all[1..])),
            PathBuf::from("/xdg/hyacc/lowering.toml")
        );
        assert_eq!(
            LoweringConfig::path_from_env(env(&all[2..])),
            PathBuf::from("/home/user/.config/hyacc/lowering.toml")
        );
        assert_eq!(
            LoweringConfig::path_from_env(env(&[])),
            PathBuf::from("hyacc/lowering.toml")
        );
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = LoweringConfig::load_from_toml(Path::new("/nonexistent/hyacc/lowering.toml"))
            .unwrap_err();
        assert!(err.is_io());
    }
}
