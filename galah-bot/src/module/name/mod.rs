///! Star identity: cross-catalog lookup and display-name resolution

pub mod identity;
pub mod normalizer;
pub mod resolver;

pub use identity::{lookup_identifiers, IdentityLookup, SimbadClient};
pub use normalizer::StringNormalizer;
pub use resolver::{NameResolver, Resolution, ResolutionBranch};
