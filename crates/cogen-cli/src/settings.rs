//! Optional TOML settings file. Command-line flags take precedence.

use std::path::{Path, PathBuf};

use cogen_model::SolverOptions;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub backend: String,
    pub solver: SolverOptions,
    pub revenue: Revenue,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Revenue {
    pub price_per_mwh: f64,
    pub days: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            backend: "simplex".to_string(),
            solver: SolverOptions::default(),
            revenue: Revenue::default(),
        }
    }
}

impl Default for Revenue {
    fn default() -> Self {
        Self {
            price_per_mwh: 50.0,
            days: 350.0,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Error reading {}: {}", path.display(), e))?;
        Self::parse(&text).map_err(|e| format!("Error parsing {}: {}", path.display(), e))
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_settings_parse() {
        let settings = Settings::parse(include_str!("../../../data/settings.toml")).unwrap();
        assert_eq!(settings.backend, "simplex");
        assert_eq!(settings.solver.abstol, 1e-9);
        assert_eq!(settings.solver.max_iterations, 100);
        assert_eq!(settings.revenue.days, 350.0);
    }

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings = Settings::parse("backend = \"precise\"\n[solver]\nreltol = 1e-8\n").unwrap();
        assert_eq!(settings.backend, "precise");
        assert_eq!(settings.solver.reltol, 1e-8);
        assert_eq!(settings.solver.abstol, SolverOptions::default().abstol);
        assert_eq!(settings.data_dir, PathBuf::from("data"));
        assert_eq!(settings.revenue.price_per_mwh, 50.0);
    }
}
