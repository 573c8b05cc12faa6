///! Cutout images from the CDS hips2fits service

use async_trait::async_trait;
use galah_common::SkyPosition;

use super::selector::ImageSource;
use super::types::SurveyCandidate;
use crate::config::ImageryConfig;
use crate::error::TransferFailure;
use crate::http::{build_url, HttpFetcher};

pub struct Hips2FitsClient {
    fetcher: HttpFetcher,
    url: String,
    width: u32,
    height: u32,
    fov_deg: f64,
    projection: String,
}

impl Hips2FitsClient {
    pub fn new(fetcher: HttpFetcher, config: &ImageryConfig) -> Self {
        Self {
            fetcher,
            url: config.hips2fits_url.clone(),
            width: config.width,
            height: config.height,
            fov_deg: config.fov_deg,
            projection: config.projection.clone(),
        }
    }

    fn query_params(&self, survey: &SurveyCandidate, position: SkyPosition) -> Vec<(&'static str, String)> {
        vec![
            ("hips", survey.locator.clone()),
            ("width", self.width.to_string()),
            ("height", self.height.to_string()),
            ("fov", self.fov_deg.to_string()),
            ("projection", self.projection.clone()),
            ("coordsys", "icrs".to_string()),
            ("ra", position.ra_deg.to_string()),
            ("dec", position.dec_deg.to_string()),
            ("format", "jpg".to_string()),
        ]
    }
}

#[async_trait]
impl ImageSource for Hips2FitsClient {
    async fn fetch_image(&self, survey: &SurveyCandidate, position: SkyPosition) -> Result<Vec<u8>, TransferFailure> {
        let url = build_url(&self.url, &self.query_params(survey, position))
            .map_err(|e| TransferFailure::transport(&self.url, e.to_string()))?;

        tracing::info!("Requesting {} cutout at {}", survey.label, position);
        self.fetcher.get_bytes(&url).await
    }
}
