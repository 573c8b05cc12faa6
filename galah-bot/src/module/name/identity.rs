///! Cross-catalog identity lookup against the SIMBAD TAP service
///!
///! A star is looked up by its Gaia DR3 identifier first, then by position.
///! An empty answer is `Lookup::NotFound`; HTTP or decoding failures are
///! `Lookup::TransferFailed`.

use async_trait::async_trait;
use galah_common::{IdentifierCandidate, SkyPosition, StarRecord};
use serde::Deserialize;

use crate::config::IdentityConfig;
use crate::error::{Lookup, PipelineError, TransferFailure};
use crate::http::{build_url, HttpFetcher};

/// Source of cross-catalog identifiers
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// All identifiers of the object known under `cross_id`
    async fn identifiers_by_id(&self, cross_id: &str) -> Lookup<Vec<IdentifierCandidate>>;

    /// All identifiers of the object nearest to `position` within `radius_arcsec`
    async fn identifiers_near(
        &self,
        position: SkyPosition,
        radius_arcsec: f64,
    ) -> Lookup<Vec<IdentifierCandidate>>;
}

/// Identifier list for `star`: by cross-catalog id, then by position.
///
/// Finding nothing yields an empty list; a transport fault ends the run.
pub async fn lookup_identifiers(
    service: &dyn IdentityLookup,
    star: &StarRecord,
    radius_arcsec: f64,
) -> Result<Vec<IdentifierCandidate>, PipelineError> {
    let cross_id = star.cross_catalog_id();
    tracing::info!("Looking up identifiers for {}", cross_id);

    match service.identifiers_by_id(&cross_id).await {
        Lookup::Found(candidates) => {
            tracing::info!("Found {} identifiers by id", candidates.len());
            return Ok(candidates);
        }
        Lookup::NotFound => {
            tracing::info!(
                "{} unknown to identity service, searching within {}\" of {}",
                cross_id,
                radius_arcsec,
                star.position
            );
        }
        Lookup::TransferFailed(reason) => return Err(PipelineError::IdentityUnavailable { reason }),
    }

    match service.identifiers_near(star.position, radius_arcsec).await {
        Lookup::Found(candidates) => {
            tracing::info!("Found {} identifiers by position", candidates.len());
            Ok(candidates)
        }
        Lookup::NotFound => {
            tracing::info!("No identifiers found for {}", cross_id);
            Ok(Vec::new())
        }
        Lookup::TransferFailed(reason) => Err(PipelineError::IdentityUnavailable { reason }),
    }
}

/// SIMBAD TAP JSON answer; only the data rows are used
#[derive(Debug, Deserialize)]
struct TapResponse {
    data: Vec<Vec<serde_json::Value>>,
}

pub struct SimbadClient {
    fetcher: HttpFetcher,
    tap_url: String,
}

impl SimbadClient {
    pub fn new(fetcher: HttpFetcher, config: &IdentityConfig) -> Self {
        Self {
            fetcher,
            tap_url: config.tap_url.clone(),
        }
    }

    async fn run_query(&self, adql: String) -> Lookup<Vec<IdentifierCandidate>> {
        let url = match build_url(
            &self.tap_url,
            &[
                ("REQUEST", "doQuery".to_string()),
                ("LANG", "ADQL".to_string()),
                ("FORMAT", "json".to_string()),
                ("QUERY", adql),
            ],
        ) {
            Ok(url) => url,
            Err(e) => return Lookup::TransferFailed(TransferFailure::transport(&self.tap_url, e.to_string())),
        };

        tracing::debug!("SIMBAD query: {}", url);

        let body = match self.fetcher.get_bytes(&url).await {
            Ok(body) => body,
            Err(failure) => return Lookup::TransferFailed(failure),
        };

        match parse_tap_identifiers(&body) {
            Ok(candidates) if candidates.is_empty() => Lookup::NotFound,
            Ok(candidates) => Lookup::Found(candidates),
            Err(e) => Lookup::TransferFailed(TransferFailure::transport(
                url.as_str(),
                format!("invalid TAP response: {}", e),
            )),
        }
    }
}

#[async_trait]
impl IdentityLookup for SimbadClient {
    async fn identifiers_by_id(&self, cross_id: &str) -> Lookup<Vec<IdentifierCandidate>> {
        self.run_query(query_by_id(cross_id)).await
    }

    async fn identifiers_near(
        &self,
        position: SkyPosition,
        radius_arcsec: f64,
    ) -> Lookup<Vec<IdentifierCandidate>> {
        self.run_query(query_near(position, radius_arcsec)).await
    }
}

/// ADQL string literal
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn query_by_id(cross_id: &str) -> String {
    format!(
        "SELECT id2.id FROM ident AS id1 JOIN ident AS id2 USING(oidref) WHERE id1.id = {}",
        quote(cross_id)
    )
}

fn query_near(position: SkyPosition, radius_arcsec: f64) -> String {
    let (ra, dec) = (position.ra_deg, position.dec_deg);
    format!(
        "SELECT ident.id FROM ident JOIN (\
         SELECT TOP 1 oid FROM basic \
         WHERE CONTAINS(POINT('ICRS', ra, dec), CIRCLE('ICRS', {ra}, {dec}, {radius})) = 1 \
         ORDER BY DISTANCE(POINT('ICRS', ra, dec), POINT('ICRS', {ra}, {dec})) ASC\
         ) AS nearest ON ident.oidref = nearest.oid",
        ra = ra,
        dec = dec,
        radius = radius_arcsec / 3600.0,
    )
}

/// Decode a TAP JSON answer into candidates, keeping the service's row order
fn parse_tap_identifiers(body: &[u8]) -> Result<Vec<IdentifierCandidate>, serde_json::Error> {
    let response: TapResponse = serde_json::from_slice(body)?;

    Ok(response
        .data
        .iter()
        .filter_map(|row| row.first().and_then(|v| v.as_str()))
        .filter(|raw| !raw.trim().is_empty())
        .map(IdentifierCandidate::parse)
        .collect())
}
