//! Local / dev stage.
//!
//! Covers what an engineer sets up on their own machine: local services,
//! the everyday workflow, and security basics.

use crate::stages::{category, item, StageProvider};
use crate::types::{Category, EnvName, Subcategory};

/// Provider for the dev stage.
pub struct DevStage;

impl StageProvider for DevStage {
    fn stage(&self) -> EnvName {
        EnvName::Dev
    }

    fn categories(&self) -> Vec<Category> {
        let stage = self.stage();
        vec![
            category(
                "c_dev_infra",
                "dev-infra",
                "Architecture & Infrastructure (Dev)",
                "Local env, Database, Caching, Docker",
                1,
                stage,
            ),
            category(
                "c_dev_workflow",
                "dev-workflow",
                "Development Workflow",
                "Git, Code Review, Testing, TDD",
                2,
                stage,
            ),
            category(
                "c_dev_advanced",
                "dev-advanced",
                "Advanced Practices",
                "Security (local), Auth, Clean Code",
                3,
                stage,
            ),
        ]
    }

    fn subcategories(&self) -> Vec<Subcategory> {
        let stage = self.stage();
        vec![
            item("s_dev_febe", "c_dev_infra", "fe-be-sep", "Frontend/Backend Separation", true, stage),
            item("s_dev_db", "c_dev_infra", "db-local", "Database (Local Postgres/Supabase)", true, stage),
            item("s_dev_docker", "c_dev_infra", "docker-basics", "Docker Basics & DevContainers", true, stage),
            item("s_dev_env", "c_dev_infra", "env-vars", "Env Vars & Secrets (.env)", true, stage),
            item("s_dev_git", "c_dev_workflow", "git-flow", "Version Control (Branching)", true, stage),
            item("s_dev_unit", "c_dev_workflow", "unit-tests", "Unit Tests (Local)", true, stage),
            item("s_dev_mig", "c_dev_workflow", "db-mig", "DB Migrations (Local)", true, stage),
            item("s_dev_cov", "c_dev_workflow", "test-cov", "Test Coverage Analysis", false, stage),
            item("s_dev_owasp", "c_dev_advanced", "owasp", "OWASP Top 10 Scanning", true, stage),
            item("s_dev_auth", "c_dev_advanced", "auth-local", "Auth Implementation (JWT/OAuth)", true, stage),
        ]
    }
}
