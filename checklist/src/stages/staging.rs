//! Staging stage: pipelines, infrastructure as code, and pre-release ops.

use crate::stages::{category, item, StageProvider};
use crate::types::{Category, EnvName, Subcategory};

/// Provider for the staging stage.
pub struct StagingStage;

impl StageProvider for StagingStage {
    fn stage(&self) -> EnvName {
        EnvName::Staging
    }

    fn categories(&self) -> Vec<Category> {
        let stage = self.stage();
        vec![
            category(
                "c_stg_cicd",
                "stg-cicd",
                "CI/CD & Deployment",
                "Pipelines, Automation, Deploy to Staging",
                1,
                stage,
            ),
            category(
                "c_stg_iac",
                "stg-iac",
                "Infrastructure as Code",
                "Terraform, K8s, Drift Detection",
                2,
                stage,
            ),
            category(
                "c_stg_ops",
                "stg-ops",
                "Advanced DevOps",
                "Orchestration, Load Testing, Chaos",
                3,
                stage,
            ),
        ]
    }

    fn subcategories(&self) -> Vec<Subcategory> {
        let stage = self.stage();
        vec![
            item("s_stg_pipe", "c_stg_cicd", "gh-actions", "Full CI Pipeline (GitHub Actions)", true, stage),
            item("s_stg_auto", "c_stg_cicd", "auto-test-ci", "Automated Testing in CI", true, stage),
            item("s_stg_bg", "c_stg_cicd", "blue-green-stg", "Blue-Green Deployment Test", false, stage),
            item("s_stg_tf", "c_stg_iac", "terraform", "Terraform/Pulumi Apply", true, stage),
            item("s_stg_k8s", "c_stg_iac", "k8s-stg", "Kubernetes Cluster (Staging)", true, stage),
            item("s_stg_load", "c_stg_ops", "load-test", "Load Testing (k6/JMeter)", true, stage),
            item("s_stg_pen", "c_stg_ops", "pentest", "Security Penetration Test", true, stage),
        ]
    }
}
