///! Survey selection with deterministic fallback
///!
///! Candidates are tried in effective rank order. For each one:
///! - not covered at the position → next candidate
///! - covered → download; success ends the search
///! - download failure → next candidate (`FailurePolicy::Skip`) or end of run
///!   (`FailurePolicy::Abort`)
///!
///! Running out of candidates is `PipelineError::Exhausted`.

use async_trait::async_trait;
use galah_common::SkyPosition;

use super::footprint::FootprintValidator;
use super::types::{AcquiredImage, SurveyCandidate};
use crate::config::FailurePolicy;
use crate::error::{PipelineError, TransferFailure};

/// Start-of-image marker followed by the next segment marker
const JPEG_START: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Downloader of a cutout image from one survey
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch_image(&self, survey: &SurveyCandidate, position: SkyPosition) -> Result<Vec<u8>, TransferFailure>;
}

enum SelectorState {
    Try(usize),
    Done(AcquiredImage),
    Exhausted,
}

pub struct SurveySelector {
    validator: FootprintValidator,
    images: Box<dyn ImageSource>,
    policy: FailurePolicy,
}

impl SurveySelector {
    pub fn new(validator: FootprintValidator, images: Box<dyn ImageSource>, policy: FailurePolicy) -> Self {
        Self {
            validator,
            images,
            policy,
        }
    }

    /// Candidates in the order they are tried at `position`.
    ///
    /// Static rank, except that demoted surveys move behind all others.
    pub fn effective_order(candidates: &[SurveyCandidate], position: SkyPosition) -> Vec<&SurveyCandidate> {
        let mut order: Vec<&SurveyCandidate> = candidates.iter().collect();
        order.sort_by_key(|c| (c.is_demoted_at(position), c.rank));
        order
    }

    pub async fn select_and_fetch(
        &self,
        candidates: &[SurveyCandidate],
        position: SkyPosition,
    ) -> Result<AcquiredImage, PipelineError> {
        let order = Self::effective_order(candidates, position);
        tracing::info!(
            "Survey order at {}: {}",
            position,
            order.iter().map(|c| c.label.as_str()).collect::<Vec<_>>().join(" > ")
        );

        let mut attempted = 0;
        let mut state = if order.is_empty() {
            SelectorState::Exhausted
        } else {
            SelectorState::Try(0)
        };

        loop {
            state = match state {
                SelectorState::Try(i) => {
                    let survey = order[i];
                    let next = if i + 1 < order.len() {
                        SelectorState::Try(i + 1)
                    } else {
                        SelectorState::Exhausted
                    };

                    if !self.validator.covers(survey, position).await? {
                        tracing::info!("{} does not cover {}", survey.label, position);
                        next
                    } else {
                        attempted += 1;
                        tracing::info!("Trying {}", survey);
                        match self.download(survey, position).await {
                            Ok(image) => SelectorState::Done(image),
                            Err(reason) => match self.policy {
                                FailurePolicy::Abort => {
                                    tracing::error!("Download from {} failed, aborting: {}", survey.label, reason);
                                    return Err(PipelineError::TransferFailed {
                                        survey: survey.label.clone(),
                                        reason,
                                    });
                                }
                                FailurePolicy::Skip => {
                                    tracing::warn!("Download from {} failed, skipping: {}", survey.label, reason);
                                    next
                                }
                            },
                        }
                    }
                }
                SelectorState::Done(image) => {
                    tracing::info!("Downloaded {} bytes from {}", image.bytes.len(), image.survey.label);
                    return Ok(image);
                }
                SelectorState::Exhausted => {
                    tracing::error!("No survey delivered an image for {}", position);
                    return Err(PipelineError::Exhausted {
                        ra: position.ra_deg,
                        dec: position.dec_deg,
                        attempted,
                    });
                }
            };
        }
    }

    async fn download(&self, survey: &SurveyCandidate, position: SkyPosition) -> Result<AcquiredImage, TransferFailure> {
        let bytes = self.images.fetch_image(survey, position).await?;
        if bytes.is_empty() {
            return Err(TransferFailure::transport(&survey.locator, "empty image"));
        }
        if !bytes.starts_with(JPEG_START) {
            return Err(TransferFailure::transport(
                &survey.locator,
                format!("response is not a JPEG image ({} bytes)", bytes.len()),
            ));
        }
        Ok(AcquiredImage {
            survey: survey.clone(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::survey::footprint::CoverageSource;
    use crate::module::survey::moc::Moc;
    use crate::module::survey::types::{CoverageCaveat, RankOverride};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type CallLog = Arc<Mutex<Vec<String>>>;

    struct FakeCoverage {
        covered: HashMap<String, bool>,
        unreachable: Option<String>,
        log: CallLog,
    }

    #[async_trait]
    impl CoverageSource for FakeCoverage {
        async fn footprint(&self, survey: &SurveyCandidate) -> Result<Moc, TransferFailure> {
            self.log.lock().unwrap().push(format!("covers:{}", survey.label));
            if self.unreachable.as_deref() == Some(survey.label.as_str()) {
                return Err(TransferFailure::transport("mocserver", "timed out"));
            }
            if self.covered.get(&survey.label).copied().unwrap_or(false) {
                Ok(Moc::full_sky())
            } else {
                Ok(Moc::empty())
            }
        }
    }

    struct FakeImages {
        results: HashMap<String, Result<Vec<u8>, TransferFailure>>,
        log: CallLog,
    }

    #[async_trait]
    impl ImageSource for FakeImages {
        async fn fetch_image(&self, survey: &SurveyCandidate, _position: SkyPosition) -> Result<Vec<u8>, TransferFailure> {
            self.log.lock().unwrap().push(format!("fetch:{}", survey.label));
            self.results
                .get(&survey.label)
                .cloned()
                .unwrap_or_else(|| Ok(vec![0xFF, 0xD8, 0xFF, 0xD9]))
        }
    }

    struct Harness {
        covered: Vec<&'static str>,
        unreachable: Option<&'static str>,
        results: Vec<(&'static str, Result<Vec<u8>, TransferFailure>)>,
        policy: FailurePolicy,
    }

    impl Harness {
        fn new(covered: Vec<&'static str>) -> Self {
            Self {
                covered,
                unreachable: None,
                results: Vec::new(),
                policy: FailurePolicy::Skip,
            }
        }

        fn failing(mut self, label: &'static str, code: u16) -> Self {
            self.results.push((label, Err(TransferFailure::status(label, code))));
            self
        }

        fn policy(mut self, policy: FailurePolicy) -> Self {
            self.policy = policy;
            self
        }

        fn build(self) -> (SurveySelector, CallLog) {
            let log: CallLog = Arc::new(Mutex::new(Vec::new()));
            let coverage = FakeCoverage {
                covered: self.covered.iter().map(|l| (l.to_string(), true)).collect(),
                unreachable: self.unreachable.map(|l| l.to_string()),
                log: log.clone(),
            };
            let images = FakeImages {
                results: self.results.into_iter().map(|(l, r)| (l.to_string(), r)).collect(),
                log: log.clone(),
            };
            let selector = SurveySelector::new(
                FootprintValidator::new(Box::new(coverage)),
                Box::new(images),
                self.policy,
            );
            (selector, log)
        }
    }

    fn surveys() -> Vec<SurveyCandidate> {
        vec![
            SurveyCandidate::new("PanSTARRS", "CDS/P/PanSTARRS/DR1/color-z-zg-g", 0)
                .with_rank_override(RankOverride::DemoteSouthOf(-29.5))
                .with_coverage_caveat(CoverageCaveat::ExcludeSouthOf(-30.0)),
            SurveyCandidate::new("DES", "NOAO/P/DES/DR1/LIneA-color", 1),
            SurveyCandidate::new("DSS2", "CDS/P/DSS2/color", 2),
        ]
    }

    fn fetches(log: &CallLog) -> Vec<String> {
        log.lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with("fetch:"))
            .cloned()
            .collect()
    }

    const NORTH: SkyPosition = SkyPosition { ra_deg: 120.0, dec_deg: 20.0 };

    #[tokio::test]
    async fn test_first_success_stops_the_search() {
        let (selector, log) = Harness::new(vec!["PanSTARRS", "DES", "DSS2"]).build();
        let image = selector.select_and_fetch(&surveys(), NORTH).await.unwrap();

        assert_eq!(image.survey.label, "PanSTARRS");
        assert_eq!(*log.lock().unwrap(), vec!["covers:PanSTARRS", "fetch:PanSTARRS"]);
    }

    #[tokio::test]
    async fn test_uncovered_surveys_are_never_downloaded() {
        let (selector, log) = Harness::new(vec!["DSS2"]).build();
        let image = selector.select_and_fetch(&surveys(), NORTH).await.unwrap();

        assert_eq!(image.survey.label, "DSS2");
        assert_eq!(fetches(&log), vec!["fetch:DSS2"]);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["covers:PanSTARRS", "covers:DES", "covers:DSS2", "fetch:DSS2"]
        );
    }

    #[tokio::test]
    async fn test_call_count_matches_rank_of_success() {
        let (selector, log) = Harness::new(vec!["PanSTARRS", "DES", "DSS2"])
            .failing("PanSTARRS", 404)
            .build();
        let image = selector.select_and_fetch(&surveys(), NORTH).await.unwrap();

        assert_eq!(image.survey.rank, 1);
        assert_eq!(fetches(&log).len(), image.survey.rank + 1);
    }

    #[tokio::test]
    async fn test_skip_policy_moves_past_failures() {
        let (selector, log) = Harness::new(vec!["PanSTARRS", "DES", "DSS2"])
            .failing("PanSTARRS", 500)
            .failing("DES", 404)
            .build();
        let image = selector.select_and_fetch(&surveys(), NORTH).await.unwrap();

        assert_eq!(image.survey.label, "DSS2");
        assert_eq!(fetches(&log), vec!["fetch:PanSTARRS", "fetch:DES", "fetch:DSS2"]);
    }

    #[tokio::test]
    async fn test_abort_policy_stops_on_first_failure() {
        let (selector, log) = Harness::new(vec!["PanSTARRS", "DES", "DSS2"])
            .failing("PanSTARRS", 500)
            .policy(FailurePolicy::Abort)
            .build();
        let err = selector.select_and_fetch(&surveys(), NORTH).await.unwrap_err();

        assert!(matches!(err, PipelineError::TransferFailed { ref survey, .. } if survey == "PanSTARRS"));
        assert_eq!(fetches(&log), vec!["fetch:PanSTARRS"]);
    }

    #[tokio::test]
    async fn test_empty_image_counts_as_failure() {
        let mut harness = Harness::new(vec!["PanSTARRS", "DSS2"]);
        harness.results.push(("PanSTARRS", Ok(Vec::new())));
        let (selector, _) = harness.build();

        let image = selector.select_and_fetch(&surveys(), NORTH).await.unwrap();
        assert_eq!(image.survey.label, "DSS2");
    }

    #[tokio::test]
    async fn test_non_jpeg_answer_counts_as_failure() {
        let mut harness = Harness::new(vec!["PanSTARRS", "DSS2"]);
        harness.results.push((
            "PanSTARRS",
            Ok(b"<html>Service temporarily unavailable</html>".to_vec()),
        ));
        let (selector, log) = harness.build();

        let image = selector.select_and_fetch(&surveys(), NORTH).await.unwrap();
        assert_eq!(image.survey.label, "DSS2");
        assert_eq!(fetches(&log), vec!["fetch:PanSTARRS", "fetch:DSS2"]);
    }

    #[tokio::test]
    async fn test_non_jpeg_answer_aborts_under_abort_policy() {
        let mut harness = Harness::new(vec!["PanSTARRS", "DSS2"]).policy(FailurePolicy::Abort);
        harness.results.push(("PanSTARRS", Ok(b"GIF89a".to_vec())));
        let (selector, _) = harness.build();

        let err = selector.select_and_fetch(&surveys(), NORTH).await.unwrap_err();
        assert!(matches!(err, PipelineError::TransferFailed { ref survey, .. } if survey == "PanSTARRS"));
    }

    #[tokio::test]
    async fn test_exhausted_when_nothing_covers() {
        let (selector, log) = Harness::new(vec![]).build();
        let err = selector.select_and_fetch(&surveys(), NORTH).await.unwrap_err();

        assert!(matches!(err, PipelineError::Exhausted { attempted: 0, .. }));
        assert!(fetches(&log).is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_after_all_downloads_fail() {
        let (selector, _) = Harness::new(vec!["DES", "DSS2"])
            .failing("DES", 503)
            .failing("DSS2", 503)
            .build();
        let err = selector.select_and_fetch(&surveys(), NORTH).await.unwrap_err();
        assert!(matches!(err, PipelineError::Exhausted { attempted: 2, .. }));
    }

    #[tokio::test]
    async fn test_empty_candidate_list_is_exhausted() {
        let (selector, _) = Harness::new(vec![]).build();
        assert!(selector.select_and_fetch(&[], NORTH).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_coverage_aborts() {
        let mut harness = Harness::new(vec!["PanSTARRS", "DSS2"]);
        harness.unreachable = Some("DES");
        harness = harness.failing("PanSTARRS", 404);
        let (selector, log) = harness.build();

        let err = selector.select_and_fetch(&surveys(), NORTH).await.unwrap_err();
        assert!(matches!(err, PipelineError::CoverageUnknown { .. }));
        assert!(!log.lock().unwrap().contains(&"covers:DSS2".to_string()));
    }

    #[test]
    fn test_southern_demotion_ranks_last() {
        let candidates = surveys();

        let north = SurveySelector::effective_order(&candidates, NORTH);
        assert_eq!(north[0].label, "PanSTARRS");

        let south = SurveySelector::effective_order(&candidates, SkyPosition::new(10.0, -29.7));
        let labels: Vec<&str> = south.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["DES", "DSS2", "PanSTARRS"]);
    }

    #[tokio::test]
    async fn test_demoted_survey_not_attempted_when_alternative_succeeds() {
        let (selector, log) = Harness::new(vec!["PanSTARRS", "DES", "DSS2"]).build();
        let south = SkyPosition::new(10.0, -29.7);

        let image = selector.select_and_fetch(&surveys(), south).await.unwrap();
        assert_eq!(image.survey.label, "DES");
        assert!(!fetches(&log).contains(&"fetch:PanSTARRS".to_string()));
    }

    #[tokio::test]
    async fn test_demoted_survey_attempted_last() {
        let (selector, log) = Harness::new(vec!["PanSTARRS", "DES", "DSS2"])
            .failing("DES", 500)
            .failing("DSS2", 500)
            .build();
        let south = SkyPosition::new(10.0, -29.7);

        let image = selector.select_and_fetch(&surveys(), south).await.unwrap();
        assert_eq!(image.survey.label, "PanSTARRS");
        assert_eq!(fetches(&log), vec!["fetch:DES", "fetch:DSS2", "fetch:PanSTARRS"]);
    }
}
