//! Catalog descriptor files.
//!
//! Every file in the catalog directory describes one OPDS catalog:
//!
//! ```toml
//! title = "Feedbooks"
//! site_name = "feedbooks.com"
//! summary = "Public domain and original books"
//!
//! [links]
//! catalog = "http://www.feedbooks.com/catalog.atom"
//! search = "http://www.feedbooks.com/books/search.atom?query=%s"
//!
//! [[rewrite]]
//! scope = "external"
//! parameter = "utm_source"
//! value = "shelfnet"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("Failed to read descriptor {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse descriptor {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid descriptor {path}: {message}")]
    Invalid { path: String, message: String },
}

/// Description of one OPDS catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDescriptor {
    pub title: String,
    pub site_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub links: DescriptorLinks,
    #[serde(default, rename = "rewrite")]
    pub rewrite_rules: Vec<UrlRewritingRule>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorLinks {
    /// Root feed of the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    /// Search template, the terms replace `%s` or `{searchTerms}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

/// Which links a rewriting rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    /// Links shown outside the application (browser, sharing).
    External,
    /// Links the application fetches itself.
    Internal,
    Always,
}

/// Appends `parameter=value` to matching links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRewritingRule {
    pub scope: RuleScope,
    pub parameter: String,
    pub value: String,
}

impl UrlRewritingRule {
    pub fn applies(&self, external: bool) -> bool {
        match self.scope {
            RuleScope::Always => true,
            RuleScope::External => external,
            RuleScope::Internal => !external,
        }
    }

    pub fn apply(&self, url: &str, external: bool) -> String {
        if !self.applies(external) {
            return url.to_string();
        }
        append_parameter(url, &self.parameter, &self.value)
    }
}

/// Append a query parameter, keeping any `#fragment` at the end.
pub(crate) fn append_parameter(url: &str, name: &str, value: &str) -> String {
    if name.is_empty() || value.is_empty() {
        return url.to_string();
    }
    let (base, fragment) = match url.find('#') {
        Some(i) => url.split_at(i),
        None => (url, ""),
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    format!(
        "{}{}{}={}{}",
        base,
        separator,
        urlencoding::encode(name),
        urlencoding::encode(value),
        fragment
    )
}

/// Turns a descriptor file into a [`CatalogDescriptor`].
pub trait DescriptorReader: Send + Sync {
    fn read_descriptor(&self, path: &Path) -> Result<CatalogDescriptor, DescriptorError>;
}

/// Reads TOML descriptors.
#[derive(Debug, Default)]
pub struct TomlDescriptorReader;

impl TomlDescriptorReader {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(path: &str, content: &str) -> Result<CatalogDescriptor, DescriptorError> {
        let descriptor: CatalogDescriptor =
            toml::from_str(content).map_err(|e| DescriptorError::Parse {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        let invalid = |message: &str| DescriptorError::Invalid {
            path: path.to_string(),
            message: message.to_string(),
        };
        if descriptor.title.trim().is_empty() {
            return Err(invalid("title is empty"));
        }
        if descriptor.site_name.trim().is_empty() {
            return Err(invalid("site_name is empty"));
        }
        if descriptor.links.catalog.is_none() && descriptor.links.search.is_none() {
            return Err(invalid("no catalog or search link"));
        }

        Ok(descriptor)
    }
}

impl DescriptorReader for TomlDescriptorReader {
    fn read_descriptor(&self, path: &Path) -> Result<CatalogDescriptor, DescriptorError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| DescriptorError::Read {
            path: display.clone(),
            message: e.to_string(),
        })?;
        Self::parse(&display, &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FEEDBOOKS: &str = r#"
title = "Feedbooks"
site_name = "feedbooks.com"

[links]
search = "http://www.feedbooks.com/books/search.atom?query=%s"

[[rewrite]]
scope = "external"
parameter = "utm_source"
value = "shelfnet"
"#;

    #[test]
    fn test_parse_descriptor() {
        let descriptor = TomlDescriptorReader::parse("feedbooks.toml", FEEDBOOKS).unwrap();
        assert_eq!(descriptor.title, "Feedbooks");
        assert!(descriptor.enabled);
        assert!(descriptor.links.catalog.is_none());
        assert_eq!(descriptor.rewrite_rules.len(), 1);
        assert_eq!(descriptor.rewrite_rules[0].scope, RuleScope::External);
    }

    #[test]
    fn test_parse_rejects_missing_links() {
        let result = TomlDescriptorReader::parse(
            "empty.toml",
            "title = \"Empty\"\nsite_name = \"empty.org\"\n",
        );
        assert!(matches!(result, Err(DescriptorError::Invalid { .. })));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let result = TomlDescriptorReader::parse("junk.xml", "<opds:catalog/>");
        assert!(matches!(result, Err(DescriptorError::Parse { .. })));
    }

    #[test]
    fn test_read_descriptor_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", FEEDBOOKS).unwrap();
        let descriptor = TomlDescriptorReader::new()
            .read_descriptor(file.path())
            .unwrap();
        assert_eq!(descriptor.site_name, "feedbooks.com");
    }

    #[test]
    fn test_read_missing_file() {
        let result = TomlDescriptorReader::new().read_descriptor(Path::new("/nonexistent.toml"));
        assert!(matches!(result, Err(DescriptorError::Read { .. })));
    }

    #[test]
    fn test_rule_scopes() {
        let rule = UrlRewritingRule {
            scope: RuleScope::External,
            parameter: "ref".to_string(),
            value: "shelf net".to_string(),
        };
        assert_eq!(
            rule.apply("http://example.com/book/1", true),
            "http://example.com/book/1?ref=shelf%20net"
        );
        assert_eq!(
            rule.apply("http://example.com/book/1", false),
            "http://example.com/book/1"
        );
    }

    #[test]
    fn test_append_parameter_keeps_fragment() {
        assert_eq!(
            append_parameter("http://example.com/a?x=1#top", "lfrom", "8076"),
            "http://example.com/a?x=1&lfrom=8076#top"
        );
        assert_eq!(
            append_parameter("http://example.com/a", "lfrom", ""),
            "http://example.com/a"
        );
    }
}
