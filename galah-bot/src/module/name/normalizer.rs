///! Display normalization of catalog tokens
///!
///! Greek-letter abbreviations, superscript component indices and IAU
///! constellation abbreviations are mapped through immutable tables.
///! A token missing from a table is reported as `NormalizeError`.

use std::collections::HashMap;

use crate::error::NormalizeError;

/// SIMBAD Greek-letter abbreviations and full names
pub const GREEK_LETTERS: &[(&str, &str)] = &[
    ("alf", "α"), ("alp", "α"), ("alpha", "α"),
    ("bet", "β"), ("beta", "β"),
    ("gam", "γ"), ("gamma", "γ"),
    ("del", "δ"), ("delta", "δ"),
    ("eps", "ε"), ("epsilon", "ε"),
    ("zet", "ζ"), ("zeta", "ζ"),
    ("eta", "η"),
    ("tet", "θ"), ("theta", "θ"),
    ("iot", "ι"), ("iota", "ι"),
    ("kap", "κ"), ("kappa", "κ"),
    ("lam", "λ"), ("lambda", "λ"),
    ("mu", "μ"),
    ("nu", "ν"),
    ("ksi", "ξ"), ("xi", "ξ"),
    ("omi", "ο"), ("omicron", "ο"),
    ("pi", "π"),
    ("rho", "ρ"),
    ("sig", "σ"), ("sigma", "σ"),
    ("tau", "τ"),
    ("ups", "υ"), ("upsilon", "υ"),
    ("phi", "φ"),
    ("chi", "χ"),
    ("psi", "ψ"),
    ("ome", "ω"), ("omega", "ω"),
];

pub const SUPERSCRIPT_DIGITS: [char; 10] = ['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];

/// IAU abbreviation → genitive Latin name
pub const CONSTELLATIONS: &[(&str, &str)] = &[
    ("And", "Andromedae"),
    ("Ant", "Antliae"),
    ("Aps", "Apodis"),
    ("Aqr", "Aquarii"),
    ("Aql", "Aquilae"),
    ("Ara", "Arae"),
    ("Ari", "Arietis"),
    ("Aur", "Aurigae"),
    ("Boo", "Boötis"),
    ("Cae", "Caeli"),
    ("Cam", "Camelopardalis"),
    ("Cnc", "Cancri"),
    ("CVn", "Canum Venaticorum"),
    ("CMa", "Canis Majoris"),
    ("CMi", "Canis Minoris"),
    ("Cap", "Capricorni"),
    ("Car", "Carinae"),
    ("Cas", "Cassiopeiae"),
    ("Cen", "Centauri"),
    ("Cep", "Cephei"),
    ("Cet", "Ceti"),
    ("Cha", "Chamaeleontis"),
    ("Cir", "Circini"),
    ("Col", "Columbae"),
    ("Com", "Comae Berenices"),
    ("CrA", "Coronae Australis"),
    ("CrB", "Coronae Borealis"),
    ("Crv", "Corvi"),
    ("Crt", "Crateris"),
    ("Cru", "Crucis"),
    ("Cyg", "Cygni"),
    ("Del", "Delphini"),
    ("Dor", "Doradus"),
    ("Dra", "Draconis"),
    ("Equ", "Equulei"),
    ("Eri", "Eridani"),
    ("For", "Fornacis"),
    ("Gem", "Geminorum"),
    ("Gru", "Gruis"),
    ("Her", "Herculis"),
    ("Hor", "Horologii"),
    ("Hya", "Hydrae"),
    ("Hyi", "Hydri"),
    ("Ind", "Indi"),
    ("Lac", "Lacertae"),
    ("Leo", "Leonis"),
    ("LMi", "Leonis Minoris"),
    ("Lep", "Leporis"),
    ("Lib", "Librae"),
    ("Lup", "Lupi"),
    ("Lyn", "Lyncis"),
    ("Lyr", "Lyrae"),
    ("Men", "Mensae"),
    ("Mic", "Microscopii"),
    ("Mon", "Monocerotis"),
    ("Mus", "Muscae"),
    ("Nor", "Normae"),
    ("Oct", "Octantis"),
    ("Oph", "Ophiuchi"),
    ("Ori", "Orionis"),
    ("Pav", "Pavonis"),
    ("Peg", "Pegasi"),
    ("Per", "Persei"),
    ("Phe", "Phoenicis"),
    ("Pic", "Pictoris"),
    ("Psc", "Piscium"),
    ("PsA", "Piscis Austrini"),
    ("Pup", "Puppis"),
    ("Pyx", "Pyxidis"),
    ("Ret", "Reticuli"),
    ("Sge", "Sagittae"),
    ("Sgr", "Sagittarii"),
    ("Sco", "Scorpii"),
    ("Scl", "Sculptoris"),
    ("Sct", "Scuti"),
    ("Ser", "Serpentis"),
    ("Sex", "Sextantis"),
    ("Tau", "Tauri"),
    ("Tel", "Telescopii"),
    ("Tri", "Trianguli"),
    ("TrA", "Trianguli Australis"),
    ("Tuc", "Tucanae"),
    ("UMa", "Ursae Majoris"),
    ("UMi", "Ursae Minoris"),
    ("Vel", "Velorum"),
    ("Vir", "Virginis"),
    ("Vol", "Volantis"),
    ("Vul", "Vulpeculae"),
];

/// Pure table-driven token transforms
#[derive(Debug, Clone)]
pub struct StringNormalizer {
    greek: HashMap<&'static str, &'static str>,
    constellations: HashMap<&'static str, &'static str>,
}

impl StringNormalizer {
    /// Build from explicit tables
    pub fn new(
        greek: &[(&'static str, &'static str)],
        constellations: &[(&'static str, &'static str)],
    ) -> Self {
        Self {
            greek: greek.iter().copied().collect(),
            constellations: constellations.iter().copied().collect(),
        }
    }

    /// Full Greek alphabet and all 88 IAU constellations
    pub fn standard() -> Self {
        Self::new(GREEK_LETTERS, CONSTELLATIONS)
    }

    /// "alf" / "mu." / "alpha" → "α". Case-insensitive, trailing '.' ignored.
    pub fn greek_letter(&self, token: &str) -> Result<&'static str, NormalizeError> {
        let key = token.trim_end_matches('.').to_lowercase();
        self.greek
            .get(key.as_str())
            .copied()
            .ok_or_else(|| NormalizeError::UnknownGreekLetter(token.to_string()))
    }

    /// "02" → "²", "10" → "¹⁰". Leading zeros are dropped.
    pub fn superscript(&self, digits: &str) -> Result<String, NormalizeError> {
        let trimmed = digits.trim_start_matches('0');
        let trimmed = if trimmed.is_empty() && !digits.is_empty() { "0" } else { trimmed };

        trimmed
            .chars()
            .map(|c| {
                c.to_digit(10)
                    .map(|d| SUPERSCRIPT_DIGITS[d as usize])
                    .ok_or_else(|| NormalizeError::MalformedDesignation(digits.to_string()))
            })
            .collect()
    }

    /// "Cas" → "Cassiopeiae". Case-sensitive, as IAU abbreviations are.
    pub fn constellation_genitive(&self, code: &str) -> Result<&'static str, NormalizeError> {
        self.constellations
            .get(code)
            .copied()
            .ok_or_else(|| NormalizeError::UnknownConstellation(code.to_string()))
    }
}

impl Default for StringNormalizer {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constellation_table_is_complete() {
        assert_eq!(CONSTELLATIONS.len(), 88);
        let normalizer = StringNormalizer::standard();
        assert_eq!(normalizer.constellations.len(), 88);
    }

    #[test]
    fn test_greek_letters() {
        let n = StringNormalizer::standard();
        assert_eq!(n.greek_letter("alf").unwrap(), "α");
        assert_eq!(n.greek_letter("mu.").unwrap(), "μ");
        assert_eq!(n.greek_letter("Gamma").unwrap(), "γ");
        assert_eq!(
            n.greek_letter("foo"),
            Err(NormalizeError::UnknownGreekLetter("foo".to_string()))
        );
    }

    #[test]
    fn test_superscripts() {
        let n = StringNormalizer::standard();
        assert_eq!(n.superscript("02").unwrap(), "²");
        assert_eq!(n.superscript("10").unwrap(), "¹⁰");
        assert_eq!(n.superscript("00").unwrap(), "⁰");
        assert_eq!(n.superscript("").unwrap(), "");
        assert!(n.superscript("1a").is_err());
    }

    #[test]
    fn test_constellation_genitive() {
        let n = StringNormalizer::standard();
        assert_eq!(n.constellation_genitive("Cas").unwrap(), "Cassiopeiae");
        assert_eq!(n.constellation_genitive("CrA").unwrap(), "Coronae Australis");
        assert!(matches!(
            n.constellation_genitive("cas"),
            Err(NormalizeError::UnknownConstellation(_))
        ));
    }

    #[test]
    fn test_injected_tables_expose_gaps() {
        let n = StringNormalizer::new(&[("alf", "α")], &[("Cas", "Cassiopeiae")]);
        assert!(n.greek_letter("bet").is_err());
        assert!(n.constellation_genitive("Cen").is_err());
    }
}
