//! Desired-Label Sources
//!
//! Builds the desired label set from the canonical label document and the
//! dynamic API catalog. All catalog-record validation happens here, before
//! any record becomes a [`Label`].

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::config::Label;
use crate::error::Result;

/// Color assigned to every catalog-derived `api:` label
pub const API_LABEL_COLOR: &str = "c5def5";

/// The canonical desired-label document (`{"labels": [...]}`)
#[derive(Debug, Clone, Deserialize)]
pub struct LabelDocument {
    pub labels: Vec<Label>,
}

/// One entry from the dynamic API catalog
///
/// `api_shortname` is absent on malformed upstream records; such entries are
/// dropped during derivation rather than failing the run.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiCatalogEntry {
    pub display_name: String,

    #[serde(default)]
    pub github_label: String,

    #[serde(default)]
    pub api_shortname: Option<String>,
}

/// The dynamic API catalog document (`{"apis": [...]}`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiCatalog {
    #[serde(default)]
    pub apis: Vec<ApiCatalogEntry>,
}

/// Source of the dynamic API catalog
///
/// The catalog fetch is a replaceable seam: callers and tests substitute
/// their own implementation without touching the HTTP layer. A fetch failure
/// propagates fatally; a partial desired set is unsafe to apply.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_catalog(&self) -> Result<ApiCatalog>;
}

/// Production catalog source: a plain GET of a JSON document
pub struct HttpCatalogSource {
    http: reqwest::Client,
    url: Url,
}

impl HttpCatalogSource {
    pub fn new(http: reqwest::Client, url: Url) -> Self {
        Self { http, url }
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_catalog(&self) -> Result<ApiCatalog> {
        let catalog = self
            .http
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .json::<ApiCatalog>()
            .await?;

        Ok(catalog)
    }
}

/// Fetch and validate the desired-label document
///
/// # Errors
/// Returns an error if the document is unreachable, is not valid JSON, or
/// contains an invalid label. The run cannot proceed without it.
pub async fn fetch_label_document(http: &reqwest::Client, url: &Url) -> Result<Vec<Label>> {
    let document = http
        .get(url.clone())
        .send()
        .await?
        .error_for_status()?
        .json::<LabelDocument>()
        .await?;

    for label in &document.labels {
        label.validate()?;
    }

    Ok(document.labels)
}

/// Derive `api:` labels from the dynamic catalog
///
/// Entries missing `api_shortname` are dropped here; one malformed record
/// must not fail the whole run.
pub fn dynamic_labels(catalog: &ApiCatalog) -> Vec<Label> {
    catalog
        .apis
        .iter()
        .filter_map(|entry| match &entry.api_shortname {
            Some(shortname) => Some(Label {
                name: format!("api: {shortname}"),
                color: API_LABEL_COLOR.to_string(),
                description: None,
            }),
            None => {
                warn!(
                    api = %entry.display_name,
                    "catalog entry missing api_shortname, skipping"
                );
                None
            }
        })
        .collect()
}

/// Build the desired label set: static labels first, then dynamic labels,
/// de-duplicated by name keeping the first occurrence
pub fn desired_labels(static_labels: Vec<Label>, dynamic: Vec<Label>) -> Vec<Label> {
    let mut seen = HashSet::new();
    static_labels
        .into_iter()
        .chain(dynamic)
        .filter(|label| seen.insert(label.name.clone()))
        .collect()
}
