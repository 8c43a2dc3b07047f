//! Per-stage checklist definitions.
//!
//! Each stage contributes the categories and items that make sense at that
//! tier. The built-in catalog is the union of all providers.

pub mod dev;
pub mod prod;
pub mod staging;

pub use dev::DevStage;
pub use prod::ProdStage;
pub use staging::StagingStage;

use std::collections::BTreeSet;

use crate::types::{Category, EnvName, Subcategory};

/// Trait for stage-specific checklist content.
pub trait StageProvider: Send + Sync {
    /// The stage this provider covers
    fn stage(&self) -> EnvName;

    /// Categories shown for this stage
    fn categories(&self) -> Vec<Category>;

    /// Checklist items tracked in this stage
    fn subcategories(&self) -> Vec<Subcategory>;
}

/// Providers for the built-in catalog, in display order.
pub fn builtin_providers() -> Vec<Box<dyn StageProvider>> {
    vec![Box::new(DevStage), Box::new(StagingStage), Box::new(ProdStage)]
}

pub(crate) fn category(
    id: &str,
    slug: &str,
    title: &str,
    description: &str,
    order: u32,
    stage: EnvName,
) -> Category {
    Category {
        id: id.to_string(),
        slug: slug.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        order,
        stages: BTreeSet::from([stage]),
    }
}

pub(crate) fn item(
    id: &str,
    category_id: &str,
    slug: &str,
    title: &str,
    required: bool,
    stage: EnvName,
) -> Subcategory {
    Subcategory {
        id: id.to_string(),
        category_id: category_id.to_string(),
        slug: slug.to_string(),
        title: title.to_string(),
        required,
        stages: BTreeSet::from([stage]),
    }
}
