//! Types describing catalog entries and search input.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Downloadable representation of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookFormat {
    Epub,
    Mobipocket,
    Fb2Zip,
    /// Free excerpt of a store book.
    TrialFb2Zip,
    /// Anything else (HTML pages, unknown types). No extension is forced.
    Other,
}

impl BookFormat {
    /// Download preference, best first.
    pub const PREFERENCE: [BookFormat; 5] = [
        BookFormat::Epub,
        BookFormat::Mobipocket,
        BookFormat::Fb2Zip,
        BookFormat::TrialFb2Zip,
        BookFormat::Other,
    ];

    /// Extension forced onto downloaded files of this format.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            BookFormat::Epub => Some(".epub"),
            BookFormat::Mobipocket => Some(".mobi"),
            BookFormat::Fb2Zip | BookFormat::TrialFb2Zip => Some(".fb2.zip"),
            BookFormat::Other => None,
        }
    }

    /// Marker inserted between the base name and the extension.
    pub fn infix(self) -> &'static str {
        match self {
            BookFormat::TrialFb2Zip => ".trial",
            _ => "",
        }
    }
}

impl fmt::Display for BookFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookFormat::Epub => "ePub",
            BookFormat::Mobipocket => "Mobipocket",
            BookFormat::Fb2Zip => "zipped FB2",
            BookFormat::TrialFb2Zip => "trial zipped FB2",
            BookFormat::Other => "other",
        };
        f.write_str(name)
    }
}

/// A candidate download link of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookUrl {
    pub format: BookFormat,
    pub url: String,
}

/// A book discovered in a remote catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Catalog-assigned identifier.
    pub id: String,
    /// Site name of the catalog that produced this entry.
    #[serde(default)]
    pub site_name: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub urls: Vec<BookUrl>,
    /// Whether the full book must be bought before it can be downloaded.
    #[serde(default)]
    pub purchase_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

impl CatalogEntry {
    pub fn url_for(&self, format: BookFormat) -> Option<&str> {
        self.urls
            .iter()
            .find(|u| u.format == format)
            .map(|u| u.url.as_str())
    }

    /// Best available link according to [`BookFormat::PREFERENCE`].
    pub fn preferred_url(&self) -> Option<&BookUrl> {
        BookFormat::PREFERENCE
            .iter()
            .find_map(|f| self.urls.iter().find(|u| u.format == *f))
    }
}

/// Page of entries a feed reader extracted from one response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedPage {
    #[serde(default)]
    pub entries: Vec<CatalogEntry>,
    /// Link to the next page of the same result set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_url: Option<String>,
}

/// Field search input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedQuery {
    #[serde(default)]
    pub title_and_series: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub annotation: String,
}

impl AdvancedQuery {
    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|f| f.trim().is_empty())
    }

    /// Non-empty fields joined with spaces, for catalogs with a single search box.
    pub fn terms(&self) -> String {
        self.fields()
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn fields(&self) -> [&str; 4] {
        [
            self.title_and_series.as_str(),
            self.author.as_str(),
            self.tag.as_str(),
            self.annotation.as_str(),
        ]
    }
}

/// What a backend can do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub simple_search: bool,
    pub advanced_search: bool,
    pub authentication: bool,
    pub purchase: bool,
    pub registration: bool,
    pub password_recovery: bool,
}
