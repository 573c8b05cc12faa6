use serde::{Deserialize, Serialize};

/// ICRS sky position, both angles in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyPosition {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

impl SkyPosition {
    pub fn new(ra_deg: f64, dec_deg: f64) -> Self {
        Self { ra_deg, dec_deg }
    }

    /// Polar angle measured from the north pole, in radians
    pub fn colatitude_rad(&self) -> f64 {
        (90.0 - self.dec_deg).to_radians()
    }

    /// Right ascension wrapped into [0, 2π)
    pub fn longitude_rad(&self) -> f64 {
        self.ra_deg.rem_euclid(360.0).to_radians()
    }
}

impl std::fmt::Display for SkyPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(RA {:.5}°, Dec {:+.5}°)", self.ra_deg, self.dec_deg)
    }
}

/// One observed object from the survey catalog.
///
/// Physical attributes are NaN when the catalog has no estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarRecord {
    /// Survey-internal object id (YYMMDD prefix is the observing night)
    pub sobject_id: i64,
    /// Gaia DR3 source id, used to query identity services
    pub dr3_source_id: i64,
    pub position: SkyPosition,
    /// Survey programme the star was observed in, e.g. "galah_main"
    pub survey_name: String,
    pub distance_kpc: f64,
    pub age_gyr: f64,
    pub mass_msun: f64,
    /// IAU constellation abbreviation, when the catalog carries one
    pub constellation: Option<String>,
}

impl StarRecord {
    /// Identifier of this star in the Gaia DR3 catalog, as identity services spell it
    pub fn cross_catalog_id(&self) -> String {
        format!("Gaia DR3 {}", self.dr3_source_id)
    }

    /// The name used when no catalog designation can be resolved.
    ///
    /// Built from the survey's own id, so it is always available.
    pub fn fallback_name(&self) -> DisplayName {
        DisplayName {
            text: format!("GALAH {}", self.sobject_id),
            kind: DisplayNameKind::Fallback,
        }
    }

    pub fn distance(&self) -> Option<f64> {
        finite(self.distance_kpc)
    }

    pub fn age(&self) -> Option<f64> {
        finite(self.age_gyr)
    }

    pub fn mass(&self) -> Option<f64> {
        finite(self.mass_msun)
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Naming scheme of a cross-catalog identifier, taken from its prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameScheme {
    /// "NAME Polaris"
    CommonName,
    /// "* alf UMi", "* 61 Cyg"
    BayerFlamsteed,
    /// "V* RR Lyr"
    VariableStar,
    /// Any catalog-number designation: "HD 8890", "TYC 4628-237-1", ...
    Designation,
}

impl NameScheme {
    pub fn prefix(&self) -> &'static str {
        match self {
            NameScheme::CommonName => "NAME ",
            NameScheme::BayerFlamsteed => "* ",
            NameScheme::VariableStar => "V* ",
            NameScheme::Designation => "",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NameScheme::CommonName => "common_name",
            NameScheme::BayerFlamsteed => "bayer_flamsteed",
            NameScheme::VariableStar => "variable_star",
            NameScheme::Designation => "designation",
        }
    }
}

impl std::fmt::Display for NameScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One identifier returned by an identity lookup.
///
/// `text` has the scheme prefix removed for the prefixed schemes and
/// whitespace collapsed; designations keep their full text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierCandidate {
    pub scheme: NameScheme,
    pub text: String,
}

impl IdentifierCandidate {
    pub fn new(scheme: NameScheme, text: impl Into<String>) -> Self {
        Self {
            scheme,
            text: text.into(),
        }
    }

    /// Classify a raw identifier string such as `"*  alf Cas"` or `"HD 3712"`.
    pub fn parse(raw: &str) -> Self {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

        for scheme in [
            NameScheme::CommonName,
            NameScheme::VariableStar,
            NameScheme::BayerFlamsteed,
        ] {
            if let Some(rest) = collapsed.strip_prefix(scheme.prefix()) {
                return Self::new(scheme, rest);
            }
        }

        Self::new(NameScheme::Designation, collapsed)
    }
}

/// What kind of name a [`DisplayName`] holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayNameKind {
    /// Normalized Bayer/Flamsteed designation, "γ Cassiopeiae"
    Designation,
    /// "Polaris (α Ursae Minoris)"
    CommonWithDesignation,
    /// Variable-star designation with expanded constellation, "RR Lyrae"
    VariableStar,
    /// Catalog designation returned verbatim, "HD 8890"
    Catalog,
    /// Synthetic name built from the survey id
    Fallback,
}

/// The single resolved name used in all user-facing text. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayName {
    text: String,
    kind: DisplayNameKind,
}

impl DisplayName {
    /// Returns `None` when `text` is blank.
    pub fn new(text: impl Into<String>, kind: DisplayNameKind) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return None;
        }
        Some(Self { text, kind })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> DisplayNameKind {
        self.kind
    }

    pub fn is_fallback(&self) -> bool {
        self.kind == DisplayNameKind::Fallback
    }
}

impl std::fmt::Display for DisplayName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn star() -> StarRecord {
        StarRecord {
            sobject_id: 170508002601001,
            dr3_source_id: 6262617148451706752,
            position: SkyPosition::new(224.2, -21.5),
            survey_name: "galah_main".to_string(),
            distance_kpc: f64::NAN,
            age_gyr: 4.5,
            mass_msun: 1.02,
            constellation: Some("Lib".to_string()),
        }
    }

    #[test]
    fn test_parse_prefixed_schemes() {
        assert_eq!(
            IdentifierCandidate::parse("NAME Polaris"),
            IdentifierCandidate::new(NameScheme::CommonName, "Polaris")
        );
        assert_eq!(
            IdentifierCandidate::parse("*  alf UMi"),
            IdentifierCandidate::new(NameScheme::BayerFlamsteed, "alf UMi")
        );
        assert_eq!(
            IdentifierCandidate::parse("V* RR Lyr"),
            IdentifierCandidate::new(NameScheme::VariableStar, "RR Lyr")
        );
    }

    #[test]
    fn test_parse_designations_keep_full_text() {
        let hd = IdentifierCandidate::parse("HD   8890");
        assert_eq!(hd.scheme, NameScheme::Designation);
        assert_eq!(hd.text, "HD 8890");

        // Double-star prefix is not the Bayer scheme
        let wds = IdentifierCandidate::parse("** STF   93A");
        assert_eq!(wds.scheme, NameScheme::Designation);
        assert_eq!(wds.text, "** STF 93A");
    }

    #[test]
    fn test_fallback_name_uses_survey_id() {
        let name = star().fallback_name();
        assert_eq!(name.as_str(), "GALAH 170508002601001");
        assert!(name.is_fallback());
    }

    #[test]
    fn test_display_name_rejects_blank() {
        assert!(DisplayName::new("   ", DisplayNameKind::Catalog).is_none());
        assert!(DisplayName::new("HD 1", DisplayNameKind::Catalog).is_some());
    }

    #[test]
    fn test_missing_physical_values() {
        let s = star();
        assert_eq!(s.distance(), None);
        assert_eq!(s.age(), Some(4.5));
        assert_eq!(s.cross_catalog_id(), "Gaia DR3 6262617148451706752");
    }

    #[test]
    fn test_star_record_serializes() {
        let json = serde_json::to_string(&star().position).unwrap();
        assert!(json.contains("ra_deg"));
    }
}
