use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Environment variable that points at an alternative config file.
pub const CONFIG_ENV: &str = "TRANSFORMER_DASHBOARD_CONFIG";

/// Config file picked up from the working directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "dashboard.toml";

// ---------------------------------------------------------------------------
// Configuration tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data: DataConfig,
    pub thresholds: Thresholds,
    pub alerts: AlertConfig,
    pub kpi: KpiConfig,
    pub export: ExportConfig,
    pub narrative: NarrativeConfig,
}

/// Synthetic data settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub records: usize,
    pub seed: u64,
    /// Last day of the generated date window. Today when unset.
    pub anchor_date: Option<NaiveDate>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            records: 500,
            seed: 42,
            anchor_date: None,
        }
    }
}

impl DataConfig {
    pub fn anchor(&self) -> NaiveDate {
        self.anchor_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

/// Acceptance thresholds. Status derivation, out-of-spec counts and the
/// generator all read the same instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Minimum acceptable efficiency (%).
    pub efficiency_min: f64,
    /// Maximum acceptable temperature rise (°C).
    pub temperature_max: f64,
    /// Maximum acceptable total losses (kW).
    pub losses_max: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            efficiency_min: 98.0,
            temperature_max: 65.0,
            losses_max: 30.0,
        }
    }
}

/// Levels that raise a quality alert banner. Independent from [`Thresholds`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub min_approval_rate: f64,
    pub min_mean_efficiency: f64,
    pub high_temperature: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            min_approval_rate: 85.0,
            min_mean_efficiency: 98.5,
            high_temperature: 60.0,
        }
    }
}

/// Half-open efficiency band `[min, max)` counted as a custom KPI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyBand {
    pub label: String,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KpiConfig {
    pub approval_target: f64,
    pub conformance_target: f64,
    pub conformance_by_model: bool,
    pub efficiency_bands: Vec<EfficiencyBand>,
}

impl Default for KpiConfig {
    fn default() -> Self {
        let band = |label: &str, min, max| EfficiencyBand {
            label: label.to_string(),
            min,
            max,
        };
        Self {
            approval_target: 90.0,
            conformance_target: 95.0,
            conformance_by_model: true,
            efficiency_bands: vec![
                band("low", 98.0, 98.5),
                band("mid", 98.5, 99.2),
                band("high", 99.2, 100.0),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub csv_file_name: String,
    pub xlsx_file_name: String,
    pub sheet_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            csv_file_name: "filtered_transformer_tests.csv".to_string(),
            xlsx_file_name: "filtered_transformer_tests.xlsx".to_string(),
            sheet_name: "Test_Data".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl DashboardConfig {
    /// Parse a config from TOML text. Missing keys fall back to defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("parsing dashboard config")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Resolve the config: explicit path, then [`CONFIG_ENV`], then
    /// [`DEFAULT_CONFIG_FILE`] if it exists, otherwise built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let candidate: Option<PathBuf> = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        if let Some(path) = candidate {
            log::info!("Loading config from {}", path.display());
            return Self::from_file(&path);
        }

        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            log::info!("Loading config from {DEFAULT_CONFIG_FILE}");
            return Self::from_file(local);
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }
}
