///! Imagery source selection: survey ranking, footprint checks, downloads

pub mod footprint;
pub mod hips2fits;
pub mod moc;
pub mod selector;
pub mod types;

pub use footprint::{CoverageSource, FootprintValidator, MocServerClient};
pub use hips2fits::Hips2FitsClient;
pub use moc::Moc;
pub use selector::{ImageSource, SurveySelector};
pub use types::{AcquiredImage, CoverageCaveat, RankOverride, SurveyCandidate};
