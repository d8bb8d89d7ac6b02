//! Rendering of listings and deploy results for the terminal.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

use crate::error::TemplateResult;
use crate::manifest::TemplateManifest;

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(format!("Unknown output format '{}' (expected table or json)", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[derive(Tabled, Serialize)]
struct TemplateRow {
    #[tabled(rename = "DisplayName")]
    display: String,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Name")]
    id: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Type")]
    #[serde(rename = "type")]
    template_type: String,
    #[tabled(skip)]
    path: String,
}

impl From<&TemplateManifest> for TemplateRow {
    fn from(manifest: &TemplateManifest) -> Self {
        Self {
            display: manifest.template.display.clone(),
            author: manifest.author().to_string(),
            id: manifest.id().to_string(),
            version: manifest.version().to_string(),
            template_type: manifest.template_type().to_string(),
            path: manifest.path.to_string_lossy().into_owned(),
        }
    }
}

#[derive(Tabled)]
struct DeployedRow {
    #[tabled(rename = "Deployed")]
    path: String,
}

/// Format installed templates.
pub fn format_templates(templates: &[TemplateManifest], format: OutputFormat) -> TemplateResult<String> {
    let rows: Vec<TemplateRow> = templates.iter().map(TemplateRow::from).collect();
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&rows)?),
        OutputFormat::Table if rows.is_empty() => Ok("No templates installed.".to_string()),
        OutputFormat::Table => Ok(table(&rows)),
    }
}

/// Format the files written by a deployment.
pub fn format_deployed(paths: &[PathBuf], format: OutputFormat) -> TemplateResult<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(paths)?),
        OutputFormat::Table if paths.is_empty() => Ok("No files deployed.".to_string()),
        OutputFormat::Table => {
            let rows: Vec<DeployedRow> = paths
                .iter()
                .map(|p| DeployedRow {
                    path: p.to_string_lossy().into_owned(),
                })
                .collect();
            Ok(table(&rows))
        }
    }
}

fn table<T: Tabled>(rows: &[T]) -> String {
    Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn manifest(id: &str, display: &str) -> TemplateManifest {
        let mut manifest = TemplateManifest::from_yaml(&format!(
            "template:\n  id: {id}\n  author: acme\n  version: 1.2.0\n  type: item\n  display: {display}\n"
        ))
        .unwrap();
        manifest.path = Path::new("/catalog/acme").join(id).join("1.2.0");
        manifest
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_table_has_columns() {
        let out = format_templates(&[manifest("class", "Puppet class")], OutputFormat::Table).unwrap();
        for column in ["DisplayName", "Author", "Name", "Version", "Type"] {
            assert!(out.contains(column), "missing column {column}");
        }
        assert!(out.contains("Puppet class"));
        assert!(out.contains("item"));
        assert!(!out.contains("/catalog/acme"));
    }

    #[test]
    fn test_json_rows() {
        let out = format_templates(&[manifest("class", "Puppet class")], OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["id"], "class");
        assert_eq!(value[0]["type"], "item");
        assert_eq!(value[0]["path"], "/catalog/acme/class/1.2.0");
    }

    #[test]
    fn test_empty_lists() {
        assert_eq!(format_templates(&[], OutputFormat::Table).unwrap(), "No templates installed.");
        assert_eq!(format_templates(&[], OutputFormat::Json).unwrap(), "[]");
        assert_eq!(format_deployed(&[], OutputFormat::Json).unwrap(), "[]");
    }

    #[test]
    fn test_deployed_table() {
        let out = format_deployed(&[PathBuf::from("/out/woo/README.md")], OutputFormat::Table).unwrap();
        assert!(out.contains("Deployed"));
        assert!(out.contains("/out/woo/README.md"));
    }
}
