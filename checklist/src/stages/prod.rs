//! Production stage.
//!
//! Live infrastructure, release mechanics, monitoring, and the business
//! instrumentation that only matters once real users arrive.

use crate::stages::{category, item, StageProvider};
use crate::types::{Category, EnvName, Subcategory};

/// Provider for the production stage.
pub struct ProdStage;

impl StageProvider for ProdStage {
    fn stage(&self) -> EnvName {
        EnvName::Prod
    }

    fn categories(&self) -> Vec<Category> {
        let stage = self.stage();
        vec![
            category(
                "c_prod_infra",
                "prod-infra",
                "Infrastructure (Live)",
                "Cloud, CDN, Sharding, Replication",
                1,
                stage,
            ),
            category(
                "c_prod_cicd",
                "prod-cicd",
                "Deployment & Release",
                "Zero-downtime, Blue-Green, GitOps",
                2,
                stage,
            ),
            category(
                "c_prod_monitor",
                "prod-monitor",
                "Monitoring & Maintenance",
                "APM, Alerting, SLOs, Incident Response",
                3,
                stage,
            ),
            category(
                "c_prod_biz",
                "prod-biz",
                "Business & Product",
                "Analytics, A/B Testing, User Feedback",
                4,
                stage,
            ),
        ]
    }

    fn subcategories(&self) -> Vec<Subcategory> {
        let stage = self.stage();
        vec![
            item("s_prod_cloud", "c_prod_infra", "aws-prod", "Cloud Hosting (AWS/GCP)", true, stage),
            item("s_prod_cdn", "c_prod_infra", "cdn", "CDN (CloudFront)", true, stage),
            item("s_prod_db", "c_prod_infra", "db-scale", "DB Sharding & Replication", true, stage),
            item("s_prod_zero", "c_prod_cicd", "zero-down", "Zero-downtime Deployment", true, stage),
            item("s_prod_flags", "c_prod_cicd", "feat-flags", "Feature Flags (Live)", true, stage),
            item("s_prod_logs", "c_prod_monitor", "logs-live", "Log Aggregation (ELK)", true, stage),
            item("s_prod_apm", "c_prod_monitor", "apm", "APM (Datadog/New Relic)", true, stage),
            item("s_prod_alert", "c_prod_monitor", "pagerduty", "Alerting & On-call", true, stage),
            item("s_prod_analytics", "c_prod_biz", "mixpanel", "User Analytics (Mixpanel)", true, stage),
        ]
    }
}
