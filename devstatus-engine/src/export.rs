//! Report export: one row per record of an environment.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use checklist::{Catalog, StatusEnum};

use crate::types::{EngineError, Result, StatusRecord};

const CSV_HEADER: [&str; 6] = [
    "Category",
    "Subcategory",
    "Status",
    "Updated At",
    "Updated By",
    "Evidence Count",
];

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    /// Upper-case label used in the activity feed.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Csv => "CSV",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

/// One exported row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub category: String,
    pub subcategory: String,
    pub status: StatusEnum,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
    pub evidence_count: usize,
}

/// Rows for the given records, resolved against the catalog.
pub fn snapshot_rows<'a>(
    catalog: &Catalog,
    records: impl IntoIterator<Item = &'a StatusRecord>,
) -> Vec<ExportRow> {
    records
        .into_iter()
        .map(|record| {
            let sub = catalog.subcategory(&record.subcategory_id);
            let category = sub
                .and_then(|s| catalog.category(&s.category_id))
                .map(|c| c.title.clone())
                .unwrap_or_default();
            ExportRow {
                category,
                subcategory: sub.map(|s| s.title.clone()).unwrap_or_default(),
                status: record.status,
                updated_at: record.last_updated_at,
                updated_by: record.last_updated_by.clone(),
                evidence_count: record.evidence.len(),
            }
        })
        .collect()
}

/// Render rows in the requested format.
pub fn render(rows: &[ExportRow], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => {
            serde_json::to_string_pretty(rows).map_err(|e| EngineError::Export(e.to_string()))
        }
        ExportFormat::Csv => Ok(render_csv(rows)),
    }
}

fn render_csv(rows: &[ExportRow]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(CSV_HEADER.join(","));
    for row in rows {
        let fields = [
            csv_field(&row.category),
            csv_field(&row.subcategory),
            csv_field(row.status.as_str()),
            csv_field(&row.updated_at.to_rfc3339()),
            csv_field(&row.updated_by),
            row.evidence_count.to_string(),
        ];
        lines.push(fields.join(","));
    }
    lines.join("\n")
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StatusStore;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn rows() -> Vec<ExportRow> {
        let catalog = Arc::new(Catalog::builtin());
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let store = StatusStore::initial(catalog.clone(), "p1", now);
        snapshot_rows(&catalog, store.list("e1"))
    }

    #[test]
    fn test_rows_resolve_titles() {
        let rows = rows();
        assert_eq!(rows.len(), 10);
        let docker = rows
            .iter()
            .find(|r| r.subcategory == "Docker Basics & DevContainers")
            .unwrap();
        assert!(!docker.category.is_empty());
        assert_eq!(docker.status, StatusEnum::NotStarted);
        assert_eq!(docker.evidence_count, 0);
    }

    #[test]
    fn test_json_export() {
        let json = render(&rows(), ExportFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 10);
        assert_eq!(parsed[0]["status"], "not_started");
        assert!(parsed[0].get("evidenceCount").is_some());
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_csv_export_quotes() {
        let csv = render(&rows(), ExportFormat::Csv).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "Category,Subcategory,Status,Updated At,Updated By,Evidence Count");
        assert_eq!(lines.len(), 11);

        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("Database (Local Postgres/Supabase)"), "Database (Local Postgres/Supabase)");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert!("xml".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Json.label(), "JSON");
    }
}
