pub mod clock;
pub mod config;
pub mod model;
pub mod validation;
pub mod filter;
pub mod transfer;
pub mod pagination;
pub mod db;
pub mod resource;
pub mod import;
pub mod error;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::CatalogConfig;
pub use error::{CatalogError, Result};
pub use pagination::Page;
pub use resource::Catalog;
pub use transfer::{AuthorRepr, BookRepr};
