//! Catalog assembly, validation, and lookup.
//!
//! A [`Catalog`] is built once (from the stage providers or from a YAML
//! document), validated, and then shared read-only for the whole session.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::stages::builtin_providers;
use crate::types::*;

/// Error types for catalog construction.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Two entries of the same kind share an ID
    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    /// Two items in the same stage share a slug
    #[error("Duplicate slug '{slug}' in stage {stage}")]
    DuplicateSlug { slug: String, stage: EnvName },

    /// Item points at a category that does not exist
    #[error("Subcategory {subcategory} references unknown category {category}")]
    UnknownCategory { subcategory: String, category: String },

    /// Item or category applies to no stage at all
    #[error("{0} has an empty stage set")]
    EmptyStages(String),

    /// Catalog has no environments or no projects
    #[error("Catalog is missing {0}")]
    Missing(&'static str),

    /// Catalog document could not be parsed
    #[error("Invalid catalog document: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Serializable form of a catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    pub projects: Vec<Project>,
    pub environments: Vec<Environment>,
    pub categories: Vec<Category>,
    pub subcategories: Vec<Subcategory>,
}

/// Validated checklist catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    projects: Vec<Project>,
    environments: Vec<Environment>,
    categories: Vec<Category>,
    subcategories: Vec<Subcategory>,
    fingerprint: String,
}

impl Catalog {
    /// The built-in catalog: three environments, one project, and the
    /// default items of every stage provider.
    pub fn builtin() -> Self {
        let mut doc = CatalogDocument {
            projects: vec![Project {
                id: "p1".to_string(),
                name: "DevStatus Core".to_string(),
                repo_url: "github.com/org/devstatus".to_string(),
                default_branch: "main".to_string(),
            }],
            environments: vec![
                Environment::new("e1", EnvName::Dev),
                Environment::new("e2", EnvName::Staging),
                Environment::new("e3", EnvName::Prod),
            ],
            ..Default::default()
        };

        for provider in builtin_providers() {
            doc.categories.extend(provider.categories());
            doc.subcategories.extend(provider.subcategories());
        }

        Self::assemble(doc)
    }

    /// Build a catalog from a document, validating it first.
    pub fn from_document(doc: CatalogDocument) -> Result<Self, CatalogError> {
        validate(&doc)?;
        Ok(Self::assemble(doc))
    }

    /// Parse and validate a YAML catalog document.
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_yaml::from_str(yaml)?;
        Self::from_document(doc)
    }

    /// Serialize back to the document form.
    pub fn to_document(&self) -> CatalogDocument {
        CatalogDocument {
            projects: self.projects.clone(),
            environments: self.environments.clone(),
            categories: self.categories.clone(),
            subcategories: self.subcategories.clone(),
        }
    }

    fn assemble(doc: CatalogDocument) -> Self {
        let fingerprint = fingerprint(&doc);
        debug!(
            subcategories = doc.subcategories.len(),
            environments = doc.environments.len(),
            fingerprint = %fingerprint,
            "Catalog assembled"
        );
        Self {
            projects: doc.projects,
            environments: doc.environments,
            categories: doc.categories,
            subcategories: doc.subcategories,
            fingerprint,
        }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// First project; catalogs always carry at least one.
    pub fn default_project(&self) -> Option<&Project> {
        self.projects.first()
    }

    pub fn environments(&self) -> &[Environment] {
        &self.environments
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn subcategories(&self) -> &[Subcategory] {
        &self.subcategories
    }

    /// SHA-256 of the catalog content, hex encoded.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn environment(&self, env_id: &str) -> Option<&Environment> {
        self.environments.iter().find(|e| e.id == env_id)
    }

    pub fn environment_by_name(&self, name: EnvName) -> Option<&Environment> {
        self.environments.iter().find(|e| e.name == name)
    }

    pub fn category(&self, category_id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == category_id)
    }

    pub fn subcategory(&self, subcategory_id: &str) -> Option<&Subcategory> {
        self.subcategories.iter().find(|s| s.id == subcategory_id)
    }

    /// Find the item with this slug that is tracked in the given stage.
    pub fn resolve_slug(&self, slug: &str, stage: EnvName) -> Option<&Subcategory> {
        self.subcategories
            .iter()
            .find(|s| s.slug == slug && s.applies_to(stage))
    }

    /// Items tracked in the given stage, in catalog order.
    pub fn applicable(&self, stage: EnvName) -> impl Iterator<Item = &Subcategory> {
        self.subcategories.iter().filter(move |s| s.applies_to(stage))
    }

    /// Categories shown for the given stage, sorted by display order.
    pub fn categories_for(&self, stage: EnvName) -> Vec<&Category> {
        let mut categories: Vec<&Category> = self
            .categories
            .iter()
            .filter(|c| c.stages.contains(&stage))
            .collect();
        categories.sort_by_key(|c| c.order);
        categories
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn validate(doc: &CatalogDocument) -> Result<(), CatalogError> {
    if doc.projects.is_empty() {
        return Err(CatalogError::Missing("projects"));
    }
    if doc.environments.is_empty() {
        return Err(CatalogError::Missing("environments"));
    }

    unique_ids("project", doc.projects.iter().map(|p| p.id.as_str()))?;
    unique_ids("environment", doc.environments.iter().map(|e| e.id.as_str()))?;
    unique_ids("category", doc.categories.iter().map(|c| c.id.as_str()))?;
    unique_ids("subcategory", doc.subcategories.iter().map(|s| s.id.as_str()))?;

    for category in &doc.categories {
        if category.stages.is_empty() {
            return Err(CatalogError::EmptyStages(category.id.clone()));
        }
    }

    let mut slugs: HashSet<(EnvName, &str)> = HashSet::new();
    for sub in &doc.subcategories {
        if sub.stages.is_empty() {
            return Err(CatalogError::EmptyStages(sub.id.clone()));
        }
        if !doc.categories.iter().any(|c| c.id == sub.category_id) {
            return Err(CatalogError::UnknownCategory {
                subcategory: sub.id.clone(),
                category: sub.category_id.clone(),
            });
        }
        for stage in &sub.stages {
            if !slugs.insert((*stage, sub.slug.as_str())) {
                return Err(CatalogError::DuplicateSlug {
                    slug: sub.slug.clone(),
                    stage: *stage,
                });
            }
        }
    }

    Ok(())
}

fn unique_ids<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CatalogError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

fn fingerprint(doc: &CatalogDocument) -> String {
    let json = serde_json::to_string(doc).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    hex::encode(hasher.finalize())
}
