use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::module::survey::{CoverageCaveat, RankOverride, SurveyCandidate};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// CSV export of the survey catalog
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Scratch directory for the media of the current post
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,

    #[serde(default = "default_fonts_dir")]
    pub fonts_dir: PathBuf,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub imagery: ImageryConfig,

    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub plots: Vec<PlotConfig>,

    #[serde(default)]
    pub outbox: OutboxConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra attempts after a transport fault or 5xx status
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// SIMBAD TAP synchronous query endpoint
    #[serde(default = "default_tap_url")]
    pub tap_url: String,

    /// Cone radius for the positional fallback lookup
    #[serde(default = "default_search_radius_arcsec")]
    pub search_radius_arcsec: f64,
}

/// What the survey selector does when a covered survey fails to deliver an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Move on to the next ranked survey
    Skip,
    /// End the run immediately
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageryConfig {
    #[serde(default = "default_moc_server_url")]
    pub moc_server_url: String,

    #[serde(default = "default_hips2fits_url")]
    pub hips2fits_url: String,

    #[serde(default = "default_image_size")]
    pub width: u32,

    #[serde(default = "default_image_size")]
    pub height: u32,

    /// Field of view across the image width
    #[serde(default = "default_fov_deg")]
    pub fov_deg: f64,

    #[serde(default = "default_projection")]
    pub projection: String,

    /// Degrade coverage maps to this order before download
    #[serde(default = "default_moc_order")]
    pub moc_order: Option<u8>,

    #[serde(default = "default_failure_policy")]
    pub failure_policy: FailurePolicy,

    /// Surveys in preference order
    #[serde(default = "default_surveys")]
    pub surveys: Vec<SurveyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    /// Short label shown on the image, e.g. "PanSTARRS"
    pub label: String,

    /// HiPS identifier, e.g. "CDS/P/DSS2/color"
    pub locator: String,

    /// Rank this survey last for declinations below this value
    #[serde(default)]
    pub demote_south_of: Option<f64>,

    /// Treat declinations below this value as not covered, whatever the coverage map says
    #[serde(default)]
    pub exclude_south_of: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_min_snr")]
    pub min_snr: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    pub name: String,

    pub program: String,

    /// Arguments; `{sobject_id}`, `{dr3_source_id}` and `{out_dir}` are substituted
    #[serde(default)]
    pub args: Vec<String>,

    /// File name the command writes into the content directory
    pub output: String,

    /// Alt text; `{name}` is substituted with the star's display name
    pub alt_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxConfig {
    #[serde(default = "default_outbox_dir")]
    pub dir: PathBuf,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/galah_dr3.csv")
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("post_content")
}

fn default_fonts_dir() -> PathBuf {
    PathBuf::from("fonts")
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retries() -> u32 {
    1
}

fn default_user_agent() -> String {
    format!("galah-bot/{}", env!("CARGO_PKG_VERSION"))
}

fn default_tap_url() -> String {
    "https://simbad.cds.unistra.fr/simbad/sim-tap/sync".to_string()
}

fn default_search_radius_arcsec() -> f64 {
    2.0
}

fn default_moc_server_url() -> String {
    "https://alasky.cds.unistra.fr/MocServer/query".to_string()
}

fn default_hips2fits_url() -> String {
    "https://alasky.cds.unistra.fr/hips-image-services/hips2fits".to_string()
}

fn default_image_size() -> u32 {
    1000
}

fn default_fov_deg() -> f64 {
    0.25
}

fn default_projection() -> String {
    "TAN".to_string()
}

fn default_moc_order() -> Option<u8> {
    Some(9)
}

fn default_failure_policy() -> FailurePolicy {
    FailurePolicy::Skip
}

fn default_surveys() -> Vec<SurveyConfig> {
    vec![
        // PanSTARRS images degrade near its southern limit and are blank beyond it
        SurveyConfig {
            label: "PanSTARRS".to_string(),
            locator: "CDS/P/PanSTARRS/DR1/color-z-zg-g".to_string(),
            demote_south_of: Some(-29.5),
            exclude_south_of: Some(-30.0),
        },
        SurveyConfig {
            label: "DES".to_string(),
            locator: "NOAO/P/DES/DR1/LIneA-color".to_string(),
            demote_south_of: None,
            exclude_south_of: None,
        },
        SurveyConfig {
            label: "DSS2".to_string(),
            locator: "CDS/P/DSS2/color".to_string(),
            demote_south_of: None,
            exclude_south_of: None,
        },
    ]
}

fn default_min_snr() -> f64 {
    30.0
}

fn default_outbox_dir() -> PathBuf {
    PathBuf::from("outbox")
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            tap_url: default_tap_url(),
            search_radius_arcsec: default_search_radius_arcsec(),
        }
    }
}

impl Default for ImageryConfig {
    fn default() -> Self {
        Self {
            moc_server_url: default_moc_server_url(),
            hips2fits_url: default_hips2fits_url(),
            width: default_image_size(),
            height: default_image_size(),
            fov_deg: default_fov_deg(),
            projection: default_projection(),
            moc_order: default_moc_order(),
            failure_policy: default_failure_policy(),
            surveys: default_surveys(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_snr: default_min_snr(),
        }
    }
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            dir: default_outbox_dir(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            catalog_path: default_catalog_path(),
            content_dir: default_content_dir(),
            fonts_dir: default_fonts_dir(),
            network: NetworkConfig::default(),
            identity: IdentityConfig::default(),
            imagery: ImageryConfig::default(),
            selection: SelectionConfig::default(),
            plots: Vec::new(),
            outbox: OutboxConfig::default(),
        }
    }
}

impl BotConfig {
    pub fn from_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: BotConfig = toml::from_str(content).context("Failed to parse config")?;
        Ok(config)
    }
}

impl ImageryConfig {
    /// Survey candidates ranked by their position in the configured list
    pub fn survey_candidates(&self) -> Vec<SurveyCandidate> {
        self.surveys
            .iter()
            .enumerate()
            .map(|(rank, survey)| SurveyCandidate {
                label: survey.label.clone(),
                locator: survey.locator.clone(),
                rank,
                rank_override: survey.demote_south_of.map(RankOverride::DemoteSouthOf),
                coverage_caveat: survey.exclude_south_of.map(CoverageCaveat::ExcludeSouthOf),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = BotConfig::from_toml("").unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.imagery.failure_policy, FailurePolicy::Skip);
        assert_eq!(config.imagery.surveys.len(), 3);
        assert_eq!(config.network.retries, 1);
        assert_eq!(config.selection.min_snr, 30.0);
    }

    #[test]
    fn test_parse_failure_policy_and_surveys() {
        let config = BotConfig::from_toml(
            r#"
            [imagery]
            failure_policy = "abort"

            [[imagery.surveys]]
            label = "DSS2"
            locator = "CDS/P/DSS2/color"

            [[imagery.surveys]]
            label = "PanSTARRS"
            locator = "CDS/P/PanSTARRS/DR1/color-z-zg-g"
            demote_south_of = -29.5
            "#,
        )
        .unwrap();

        assert_eq!(config.imagery.failure_policy, FailurePolicy::Abort);

        let candidates = config.imagery.survey_candidates();
        assert_eq!(candidates[0].label, "DSS2");
        assert_eq!(candidates[0].rank, 0);
        assert_eq!(candidates[1].rank, 1);
        assert_eq!(
            candidates[1].rank_override,
            Some(RankOverride::DemoteSouthOf(-29.5))
        );
        assert!(candidates[1].coverage_caveat.is_none());
    }

    #[test]
    fn test_default_panstarrs_caveats() {
        let candidates = ImageryConfig::default().survey_candidates();
        let panstarrs = &candidates[0];
        assert_eq!(panstarrs.label, "PanSTARRS");
        assert_eq!(
            panstarrs.coverage_caveat,
            Some(CoverageCaveat::ExcludeSouthOf(-30.0))
        );
        assert!(candidates[2].rank_override.is_none());
    }

    #[test]
    fn test_parse_plots() {
        let config = BotConfig::from_toml(
            r#"
            [[plots]]
            name = "spectra"
            program = "python3"
            args = ["plot_spectra.py", "{sobject_id}", "{out_dir}"]
            output = "spectra.png"
            alt_text = "The HERMES spectrum of {name}."
            "#,
        )
        .unwrap();
        assert_eq!(config.plots.len(), 1);
        assert_eq!(config.plots[0].args[1], "{sobject_id}");
    }

    #[test]
    fn test_example_config_parses() {
        let config = BotConfig::from_toml(include_str!("../../config.example.toml")).unwrap();
        assert_eq!(config.imagery.survey_candidates().len(), 3);
        assert_eq!(config.plots[0].output, "spectra.png");
    }
}
