///! Survey footprint checks
///!
///! Coverage comes from the survey's published MOC. Surveys with a
///! `CoverageCaveat` are treated as not covered inside the caveat region,
///! whatever their MOC says.

use async_trait::async_trait;
use galah_common::SkyPosition;

use super::moc::Moc;
use super::types::SurveyCandidate;
use crate::config::ImageryConfig;
use crate::error::{PipelineError, TransferFailure};
use crate::http::{build_url, HttpFetcher};

/// Source of coverage maps
#[async_trait]
pub trait CoverageSource: Send + Sync {
    async fn footprint(&self, survey: &SurveyCandidate) -> Result<Moc, TransferFailure>;
}

pub struct FootprintValidator {
    source: Box<dyn CoverageSource>,
}

impl FootprintValidator {
    pub fn new(source: Box<dyn CoverageSource>) -> Self {
        Self { source }
    }

    /// Whether `survey` has usable imagery at `position`.
    ///
    /// A coverage map that cannot be fetched is `CoverageUnknown`, never "not covered".
    pub async fn covers(&self, survey: &SurveyCandidate, position: SkyPosition) -> Result<bool, PipelineError> {
        if let Some(caveat) = survey.coverage_caveat {
            if caveat.excludes(position) {
                tracing::info!(
                    "{} excluded at Dec {:+.3} by known coverage defect {:?}",
                    survey.label,
                    position.dec_deg,
                    caveat
                );
                return Ok(false);
            }
        }

        let moc = self
            .source
            .footprint(survey)
            .await
            .map_err(|reason| PipelineError::CoverageUnknown {
                survey: survey.label.clone(),
                reason,
            })?;

        let covered = moc.contains(position);
        tracing::debug!(
            "{} coverage map ({} cells) {} {}",
            survey.label,
            moc.cell_count(),
            if covered { "contains" } else { "does not contain" },
            position
        );
        Ok(covered)
    }
}

/// Coverage maps from the CDS MocServer
pub struct MocServerClient {
    fetcher: HttpFetcher,
    url: String,
    order: Option<u8>,
}

impl MocServerClient {
    pub fn new(fetcher: HttpFetcher, config: &ImageryConfig) -> Self {
        Self {
            fetcher,
            url: config.moc_server_url.clone(),
            order: config.moc_order,
        }
    }

    fn query_params(&self, survey: &SurveyCandidate) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("ID", survey.locator.clone()),
            ("get", "moc".to_string()),
            ("fmt", "json".to_string()),
        ];
        if let Some(order) = self.order {
            params.push(("order", order.to_string()));
        }
        params
    }
}

#[async_trait]
impl CoverageSource for MocServerClient {
    async fn footprint(&self, survey: &SurveyCandidate) -> Result<Moc, TransferFailure> {
        let url = build_url(&self.url, &self.query_params(survey))
            .map_err(|e| TransferFailure::transport(&self.url, e.to_string()))?;

        tracing::debug!("Fetching coverage map for {} from {}", survey.label, url);
        let body = self.fetcher.get_bytes(&url).await?;

        Moc::from_json(&body)
            .map_err(|e| TransferFailure::transport(url.as_str(), format!("invalid MOC: {}", e)))
    }
}
