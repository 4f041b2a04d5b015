//! Event Dispatching
//!
//! Maps inbound repository lifecycle events to reconciliation runs. The
//! webhook transport itself lives in the hosting framework; this module only
//! consumes its decoded payloads.

use anyhow::Context as _;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::BotConfig;
use crate::error::Result;
use crate::github::GitHubClient;
use crate::source::CatalogSource;
use crate::sync::{LabelSyncer, SyncReport};

/// Owner half of a webhook repository payload
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
}

/// Repository addressing shared by all handled events
#[derive(Debug, Clone, Deserialize)]
pub struct EventRepository {
    pub name: String,
    pub owner: RepositoryOwner,
}

/// A `repository` webhook event
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryEvent {
    pub action: String,
    pub repository: EventRepository,
}

/// A `label` webhook event
#[derive(Debug, Clone, Deserialize)]
pub struct LabelEvent {
    pub action: String,
    pub repository: EventRepository,
}

/// Inbound events this bot reacts to
#[derive(Debug, Clone)]
pub enum Event {
    Repository(RepositoryEvent),
    Label(LabelEvent),
}

impl Event {
    /// Decode an event from its webhook name and JSON payload
    ///
    /// Returns `Ok(None)` for event names outside this bot's scope, so
    /// framework adapters can forward everything without filtering first.
    ///
    /// # Errors
    /// Returns an error if a relevant payload does not match the expected
    /// shape
    pub fn from_payload(event_name: &str, payload: serde_json::Value) -> Result<Option<Self>> {
        let event = match event_name {
            "repository" => Some(Event::Repository(serde_json::from_value(payload)?)),
            "label" => Some(Event::Label(serde_json::from_value(payload)?)),
            _ => None,
        };

        Ok(event)
    }

    fn repository(&self) -> &EventRepository {
        match self {
            Event::Repository(e) => &e.repository,
            Event::Label(e) => &e.repository,
        }
    }
}

/// Event Handler
///
/// Owns the run-independent pieces (configuration, HTTP client, catalog
/// seam) and starts one reconciliation per triggering event. Runs for
/// different repositories share nothing; concurrent runs for the same
/// repository are not serialized here.
pub struct EventHandler<C> {
    config: BotConfig,
    http: reqwest::Client,
    catalog: C,
}

impl<C: CatalogSource> EventHandler<C> {
    /// Create a new event handler
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid
    pub fn new(config: BotConfig, catalog: C) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            http: reqwest::Client::new(),
            catalog,
        })
    }

    /// Handle one inbound event
    ///
    /// A created repository and a deleted label both trigger a full sync of
    /// the affected repository; the label deletion is taken as a cue that an
    /// external actor diverged the state. Every other action is skipped.
    ///
    /// # Errors
    /// Surfaces fatal fetch and authentication failures as run failures for
    /// the hosting framework's error reporting
    pub async fn handle(&self, event: &Event) -> anyhow::Result<Option<SyncReport>> {
        match event {
            Event::Repository(e) if e.action == "created" => {}
            Event::Label(e) if e.action == "deleted" => {}
            Event::Repository(e) => {
                debug!(action = %e.action, "skipping repository event");
                return Ok(None);
            }
            Event::Label(e) => {
                debug!(action = %e.action, "skipping label event");
                return Ok(None);
            }
        }

        let repository = event.repository();
        let owner = repository.owner.login.as_str();
        let repo = repository.name.as_str();
        info!(owner, repo, "syncing labels");

        let report = self
            .run_sync(owner, repo)
            .await
            .with_context(|| format!("label sync failed for {owner}/{repo}"))?;

        Ok(Some(report))
    }

    async fn run_sync(&self, owner: &str, repo: &str) -> Result<SyncReport> {
        let client = GitHubClient::new(
            &self.config.access_token,
            owner,
            repo,
            self.config.github_api_url.as_ref(),
        )
        .await?;

        LabelSyncer::new(client, &self.http, &self.config, &self.catalog)
            .run()
            .await
    }
}
