///! Catalog store
///!
///! Loads the survey catalog from CSV. Rows that fail to parse are logged and
///! skipped. Missing physical estimates become NaN.

use anyhow::{anyhow, Context, Result};
use galah_common::{SkyPosition, StarRecord};
use rand::seq::IndexedRandom;
use serde::Deserialize;
use std::path::Path;

/// One catalog row as stored in the CSV file
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogRow {
    pub sobject_id: i64,
    pub dr3_source_id: i64,
    pub ra: f64,
    pub dec: f64,
    pub flag_sp: i64,
    pub flag_fe_h: i64,
    #[serde(default)]
    pub snr_c3_iraf: Option<f64>,
    pub survey_name: String,
    #[serde(default)]
    pub age_bstep: Option<f64>,
    #[serde(default)]
    pub m_act_bstep: Option<f64>,
    #[serde(default)]
    pub distance_bstep: Option<f64>,
    #[serde(default)]
    pub constellation: Option<String>,
}

impl CatalogRow {
    /// Good spectroscopic flags and signal-to-noise above `min_snr`
    pub fn is_valid(&self, min_snr: f64) -> bool {
        self.flag_sp == 0 && self.flag_fe_h == 0 && self.snr_c3_iraf.is_some_and(|snr| snr > min_snr)
    }

    pub fn to_star(&self) -> StarRecord {
        StarRecord {
            sobject_id: self.sobject_id,
            dr3_source_id: self.dr3_source_id,
            position: SkyPosition::new(self.ra, self.dec),
            survey_name: self.survey_name.trim().to_string(),
            distance_kpc: self.distance_bstep.unwrap_or(f64::NAN),
            age_gyr: self.age_bstep.unwrap_or(f64::NAN),
            mass_msun: self.m_act_bstep.unwrap_or(f64::NAN),
            constellation: self
                .constellation
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        }
    }
}

pub struct CatalogStore {
    rows: Vec<CatalogRow>,
}

impl CatalogStore {
    /// Load from CSV file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Loading catalog from: {}", path.display());

        let content = tokio::fs::read_to_string(path)
            .await
            .context(format!("Failed to read catalog: {}", path.display()))?;

        let store = Self::from_csv(&content)?;
        tracing::info!("Loaded {} catalog rows", store.rows.len());
        Ok(store)
    }

    /// Parse CSV content
    pub fn from_csv(content: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut rows = Vec::new();
        let mut error_count = 0;

        for (index, result) in reader.deserialize::<CatalogRow>().enumerate() {
            match result {
                Ok(row) => rows.push(row),
                Err(e) => {
                    error_count += 1;
                    tracing::warn!("Error parsing catalog row {}: {}", index + 1, e);
                }
            }
        }

        tracing::debug!("Parsed {} catalog rows, {} errors", rows.len(), error_count);
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn by_sobject_id(&self, sobject_id: i64) -> Result<&CatalogRow> {
        self.rows
            .iter()
            .find(|row| row.sobject_id == sobject_id)
            .ok_or_else(|| anyhow!("Not a valid sobject_id: {}", sobject_id))
    }

    pub fn by_dr3_source_id(&self, dr3_source_id: i64) -> Result<&CatalogRow> {
        self.rows
            .iter()
            .find(|row| row.dr3_source_id == dr3_source_id)
            .ok_or_else(|| anyhow!("Not a valid dr3_source_id: {}", dr3_source_id))
    }

    pub fn valid_rows(&self, min_snr: f64) -> Vec<&CatalogRow> {
        self.rows.iter().filter(|row| row.is_valid(min_snr)).collect()
    }

    /// Uniformly random star among the valid rows
    pub fn select_random(&self, min_snr: f64) -> Result<StarRecord> {
        let valid = self.valid_rows(min_snr);
        tracing::info!("{} of {} catalog rows pass the quality cuts", valid.len(), self.rows.len());

        let row = valid.choose(&mut rand::rng()).context("No valid stars in catalog")?;
        Ok(row.to_star())
    }
}
