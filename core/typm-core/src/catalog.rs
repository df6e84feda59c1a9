//! Font catalog input (made by FontLab https://www.fontlab.com/)
//!
//! The catalog is produced by an external resolution step and consumed
//! here read-only: an ordered mapping from stable font key to the
//! resources needed to render that font. Validation is fail-fast; a
//! malformed catalog aborts before any rendering starts.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One catalog entry: everything the measurement engine needs to load
/// and name a font inside a rendered document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontDescriptor {
    /// Stylesheet URL that makes the font available to the document.
    #[serde(rename = "importUrl")]
    pub import_url: String,
    /// CSS `font-family` value naming the font, fallbacks included,
    /// e.g. `'Roboto', sans-serif`.
    #[serde(rename = "cssFamily")]
    pub css_family: String,
    /// Human-readable name, when the catalog provides one.
    #[serde(
        rename = "displayName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
}

/// Ordered font catalog; iteration order is catalog order.
pub type FontCatalog = IndexMap<String, FontDescriptor>;

/// Catalog problems are fatal to the whole run.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("cannot read catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("catalog {path} is not valid JSON: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("font {key} is missing required property {field}")]
    MissingField { key: String, field: &'static str },
}

/// Load and validate a catalog file. Every entry must carry a non-empty
/// `importUrl` and `cssFamily`; the first offender fails the load.
pub fn load_catalog(path: &Path) -> Result<FontCatalog, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let catalog: FontCatalog =
        serde_json::from_str(&text).map_err(|source| CatalogError::Json {
            path: path.display().to_string(),
            source,
        })?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

/// Validate an already-parsed catalog.
pub fn validate_catalog(catalog: &FontCatalog) -> Result<(), CatalogError> {
    for (key, font) in catalog {
        if font.import_url.trim().is_empty() {
            return Err(CatalogError::MissingField {
                key: key.clone(),
                field: "importUrl",
            });
        }
        if font.css_family.trim().is_empty() {
            return Err(CatalogError::MissingField {
                key: key.clone(),
                field: "cssFamily",
            });
        }
    }
    Ok(())
}

/// The baseline font all scale measurements are normalized against.
pub fn baseline_descriptor() -> FontDescriptor {
    FontDescriptor {
        import_url: "https://fonts.googleapis.com/css2?family=Roboto&display=swap".to_string(),
        css_family: "'Roboto', sans-serif".to_string(),
        display_name: Some("Roboto".to_string()),
    }
}

/// First family name from a CSS family list, quotes stripped. This is
/// the name the engine's font-readiness poll understands.
pub fn primary_family(css_family: &str) -> String {
    css_family
        .split(',')
        .next()
        .unwrap_or(css_family)
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_family_strips_quotes_and_fallbacks() {
        assert_eq!(primary_family("'Roboto', sans-serif"), "Roboto");
        assert_eq!(primary_family("\"Open Sans\", sans-serif"), "Open Sans");
        assert_eq!(primary_family("monospace"), "monospace");
    }

    #[test]
    fn validate_rejects_empty_css_family() {
        let mut catalog = FontCatalog::new();
        catalog.insert(
            "bad".to_string(),
            FontDescriptor {
                import_url: "https://example.com/css".to_string(),
                css_family: "  ".to_string(),
                display_name: None,
            },
        );

        let err = validate_catalog(&catalog).expect_err("must fail");
        assert!(err.to_string().contains("cssFamily"));
    }

    #[test]
    fn descriptor_round_trips_original_field_names() {
        let json = r#"{"importUrl":"https://x/css","cssFamily":"'X', serif"}"#;
        let font: FontDescriptor = serde_json::from_str(json).expect("parse");
        assert_eq!(font.import_url, "https://x/css");

        let back = serde_json::to_value(&font).expect("serialize");
        assert!(back.get("importUrl").is_some());
        assert!(back.get("displayName").is_none());
    }
}
