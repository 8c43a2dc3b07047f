//! Checklist catalog for DevStatus
//!
//! Reference data describing what gets tracked and where:
//!
//! - **Environments**: deployment tiers (local, dev, staging, prod) that act
//!   as the partition key for status tracking
//! - **Categories**: groups of checklist items shown together
//! - **Subcategories**: the checklist items themselves, each scoped to the
//!   stages where it is relevant
//! - **Projects**: the repositories being tracked
//!
//! # Key Components
//!
//! - [`Catalog`]: validated, immutable catalog shared by reference
//! - [`StageProvider`]: per-stage default content used to assemble the
//!   built-in catalog
//!
//! # Example
//!
//! ```
//! use checklist::{Catalog, EnvName};
//!
//! let catalog = Catalog::builtin();
//! let docker = catalog.resolve_slug("docker-basics", EnvName::Dev).unwrap();
//! assert_eq!(docker.title, "Docker Basics & DevContainers");
//! assert!(catalog.resolve_slug("docker-basics", EnvName::Prod).is_none());
//! ```

pub mod catalog;
pub mod stages;
pub mod types;

pub use catalog::{Catalog, CatalogDocument, CatalogError};
pub use stages::StageProvider;
pub use types::*;
