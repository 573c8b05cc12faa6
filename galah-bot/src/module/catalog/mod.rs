///! Survey catalog: CSV loading, row lookup and star selection

pub mod store;

pub use store::{CatalogRow, CatalogStore};
