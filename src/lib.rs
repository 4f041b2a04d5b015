//! # label-sync
//!
//! GitHub label reconciliation engine for repository automation bots
//!
//! ## Features
//! - Desired-label set built from a canonical document plus a dynamic API catalog
//! - Pure, order-stable reconciliation into create/update/delete intents
//! - Best-effort mutation batches that tolerate individual failures
//! - Event dispatch for repository-created and label-deleted triggers

pub mod config;
pub mod error;
pub mod github;
pub mod handler;
pub mod source;
pub mod sync;

pub use config::{BotConfig, Label};
pub use error::{Error, Result};
pub use github::GitHubClient;
pub use handler::{Event, EventHandler};
pub use source::{CatalogSource, HttpCatalogSource};
pub use sync::{reconcile, MutationIntent, SyncReport};

/// Run one full label reconciliation for a repository
///
/// Convenience wrapper for hosts that drive runs themselves instead of
/// going through the event dispatcher.
///
/// # Examples
///
/// ```rust,no_run
/// use label_sync::{BotConfig, HttpCatalogSource};
/// use url::Url;
///
/// #[tokio::main]
/// async fn main() -> label_sync::Result<()> {
///     let config = BotConfig {
///         access_token: "your_github_token".to_string(),
///         label_document_url: Url::parse("https://example.com/labels.json").unwrap(),
///         catalog_url: Url::parse("https://example.com/apis.json").unwrap(),
///         github_api_url: None,
///     };
///     let http = reqwest::Client::new();
///     let catalog = HttpCatalogSource::new(http.clone(), config.catalog_url.clone());
///
///     let report = label_sync::sync_repository_labels(&config, &catalog, "owner", "repo").await?;
///     println!("created {}, deleted {}", report.created, report.deleted);
///     Ok(())
/// }
/// ```
pub async fn sync_repository_labels(
    config: &BotConfig,
    catalog: &impl CatalogSource,
    owner: &str,
    repo: &str,
) -> Result<SyncReport> {
    config.validate()?;

    let client = GitHubClient::new(
        &config.access_token,
        owner,
        repo,
        config.github_api_url.as_ref(),
    )
    .await?;
    let http = reqwest::Client::new();

    sync::LabelSyncer::new(client, &http, config, catalog).run().await
}
