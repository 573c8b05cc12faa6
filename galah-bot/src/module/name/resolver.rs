///! Display-name resolution
///!
///! Turns the identifier list of one star into a single display name.
///!
///! # Priority
///! 1. Remember the first common name ("NAME ...")
///! 2. Bayer/Flamsteed designations, reverse lexicographic order of their text;
///!    merged with the common name when one was seen
///! 3. Variable-star designation (the common name is not merged here)
///! 4. Catalog designations by prefix preference, verbatim
///! 5. Nothing: the caller's fallback name

use galah_common::{DisplayName, DisplayNameKind, IdentifierCandidate, NameScheme, StarRecord};
use regex::Regex;
use std::sync::OnceLock;

use super::normalizer::StringNormalizer;
use crate::error::NormalizeError;

/// Catalog prefixes in preference order: HD, HIP, the declination-zone
/// surveys, then 2MASS.
pub const DEFAULT_CATALOG_PREFIXES: &[&str] = &["HD ", "HIP ", "BD", "CD", "CPD", "2MASS "];

fn letter_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?P<letter>[A-Za-z]+\.?)(?P<index>\d*)$").unwrap())
}

/// Which step of the cascade produced the name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionBranch {
    BayerFlamsteed,
    VariableStar,
    Catalog(String),
    Unresolved,
}

/// Outcome of the cascade, before any fallback is applied
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub name: Option<DisplayName>,
    pub branch: ResolutionBranch,
    /// Table misses met on the way; each one was skipped like a non-match
    pub gaps: Vec<NormalizeError>,
}

pub struct NameResolver {
    normalizer: StringNormalizer,
    catalog_prefixes: Vec<String>,
}

impl NameResolver {
    pub fn new(normalizer: StringNormalizer) -> Self {
        Self::with_catalog_prefixes(normalizer, DEFAULT_CATALOG_PREFIXES)
    }

    pub fn with_catalog_prefixes(normalizer: StringNormalizer, prefixes: &[&str]) -> Self {
        Self {
            normalizer,
            catalog_prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Resolve the name shown for `star`, falling back to its survey name.
    ///
    /// Never fails: configuration gaps are logged and skipped.
    pub fn resolve_display_name(
        &self,
        star: &StarRecord,
        candidates: &[IdentifierCandidate],
        constellation: &str,
    ) -> DisplayName {
        let resolution = self.resolve(candidates, constellation);

        for gap in &resolution.gaps {
            tracing::warn!("Name normalization gap for sobject_id {}: {}", star.sobject_id, gap);
        }

        match resolution.name {
            Some(name) => {
                tracing::info!("Resolved display name '{}' via {:?}", name, resolution.branch);
                name
            }
            None => {
                let fallback = star.fallback_name();
                tracing::info!("No usable identifier, using fallback name '{}'", fallback);
                fallback
            }
        }
    }

    /// Run the priority cascade over `candidates`.
    pub fn resolve(&self, candidates: &[IdentifierCandidate], constellation: &str) -> Resolution {
        let mut gaps = Vec::new();

        let common_name = candidates
            .iter()
            .find(|c| c.scheme == NameScheme::CommonName)
            .map(|c| c.text.as_str());
        if let Some(common) = common_name {
            tracing::debug!("Common name candidate: {}", common);
        }

        // Reverse lexicographic order of the raw text
        let mut bayer: Vec<&IdentifierCandidate> = candidates
            .iter()
            .filter(|c| c.scheme == NameScheme::BayerFlamsteed)
            .collect();
        bayer.sort_by(|a, b| b.text.cmp(&a.text));

        for candidate in bayer {
            match self.normalize_bayer(&candidate.text) {
                Ok(designation) => {
                    tracing::debug!("Bayer/Flamsteed branch: '{}' -> '{}'", candidate.text, designation);
                    check_constellation(&candidate.text, constellation);

                    let (text, kind) = match common_name {
                        Some(common) => (
                            format!("{} ({})", common, designation),
                            DisplayNameKind::CommonWithDesignation,
                        ),
                        None => (designation, DisplayNameKind::Designation),
                    };
                    return Resolution {
                        name: DisplayName::new(text, kind),
                        branch: ResolutionBranch::BayerFlamsteed,
                        gaps,
                    };
                }
                Err(gap) => gaps.push(gap),
            }
        }

        for candidate in candidates.iter().filter(|c| c.scheme == NameScheme::VariableStar) {
            match self.normalize_variable(&candidate.text) {
                Ok(designation) => {
                    tracing::debug!("Variable-star branch: '{}' -> '{}'", candidate.text, designation);
                    return Resolution {
                        name: DisplayName::new(designation, DisplayNameKind::VariableStar),
                        branch: ResolutionBranch::VariableStar,
                        gaps,
                    };
                }
                Err(gap) => gaps.push(gap),
            }
        }

        for prefix in &self.catalog_prefixes {
            let hit = candidates
                .iter()
                .filter(|c| c.scheme == NameScheme::Designation)
                .find(|c| c.text.starts_with(prefix.as_str()));

            if let Some(candidate) = hit {
                tracing::debug!("Catalog branch '{}': {}", prefix.trim(), candidate.text);
                return Resolution {
                    name: DisplayName::new(candidate.text.clone(), DisplayNameKind::Catalog),
                    branch: ResolutionBranch::Catalog(prefix.trim().to_string()),
                    gaps,
                };
            }
        }

        tracing::debug!("No branch matched {} candidates", candidates.len());
        Resolution {
            name: None,
            branch: ResolutionBranch::Unresolved,
            gaps,
        }
    }

    /// "alf02 Cap A" → "α² Capricorni A", "61 Cyg" → "61 Cygni"
    pub fn normalize_bayer(&self, text: &str) -> Result<String, NormalizeError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let [letter_token, code, components @ ..] = tokens.as_slice() else {
            return Err(NormalizeError::MalformedDesignation(text.to_string()));
        };

        let letter = if letter_token.chars().all(|c| c.is_ascii_digit()) {
            // Flamsteed number
            letter_token.to_string()
        } else {
            let caps = letter_token_regex()
                .captures(letter_token)
                .ok_or_else(|| NormalizeError::MalformedDesignation(text.to_string()))?;
            let raw_letter = &caps["letter"];

            let letter = match self.normalizer.greek_letter(raw_letter) {
                Ok(greek) => greek.to_string(),
                // Latin Bayer letters ("b Per", "A Car") are kept as written
                Err(_) if raw_letter.len() == 1 => raw_letter.to_string(),
                Err(e) => return Err(e),
            };
            format!("{}{}", letter, self.normalizer.superscript(&caps["index"])?)
        };

        let genitive = self.normalizer.constellation_genitive(code)?;

        let mut parts = vec![letter, genitive.to_string()];
        parts.extend(components.iter().map(|c| c.to_string()));
        Ok(parts.join(" "))
    }

    /// "RR Lyr" → "RR Lyrae"
    pub fn normalize_variable(&self, text: &str) -> Result<String, NormalizeError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let [head @ .., code] = tokens.as_slice() else {
            return Err(NormalizeError::MalformedDesignation(text.to_string()));
        };
        if head.is_empty() {
            return Err(NormalizeError::MalformedDesignation(text.to_string()));
        }

        let genitive = self.normalizer.constellation_genitive(code)?;
        Ok(format!("{} {}", head.join(" "), genitive))
    }
}

impl Default for NameResolver {
    fn default() -> Self {
        Self::new(StringNormalizer::standard())
    }
}

/// Flag designations whose constellation disagrees with the star's own
fn check_constellation(designation: &str, constellation: &str) {
    if constellation.is_empty() {
        return;
    }
    let code = designation.split_whitespace().nth(1).unwrap_or_default();
    if code != constellation {
        tracing::warn!(
            "Designation '{}' names constellation {} but the star lies in {}",
            designation,
            code,
            constellation
        );
    }
}
