//! GitHub API Client
//!
//! Module for managing interactions with the repository label API

use octocrab::Octocrab;
use url::Url;

use crate::config::{normalize_color, Label};
use crate::error::{Error, Result};

/// Labels are listed 100 at a time, following pagination to completion
const LABELS_PER_PAGE: u8 = 100;

/// Encode a string for use in URL path segments (RFC 3986 with UTF-8 support)
///
/// Label names may contain spaces, colons, and non-ASCII characters; only
/// unreserved characters (A-Z, a-z, 0-9, -, ., _, ~) are left unencoded.
fn encode_path_segment(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            // RFC 3986 unreserved characters
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '.' | '_' | '~' => c.to_string(),
            // Everything else gets percent-encoded as UTF-8 bytes
            _ => c
                .to_string()
                .bytes()
                .map(|b| format!("%{:02X}", b))
                .collect::<String>(),
        })
        .collect()
}

/// Extract the HTTP status of a GitHub API error, if it carries one
fn error_status(err: &octocrab::Error) -> Option<u16> {
    match err {
        octocrab::Error::GitHub { source, .. } => Some(source.status_code.as_u16()),
        _ => None,
    }
}

/// Whether a GitHub API error is a 404 Not Found
pub(crate) fn is_not_found(err: &octocrab::Error) -> bool {
    error_status(err) == Some(404)
}

/// Whether a GitHub API error is a validation conflict (e.g. label exists)
pub(crate) fn is_conflict(err: &octocrab::Error) -> bool {
    error_status(err) == Some(422)
}

/// GitHub API Client
///
/// Client responsible for label operations against one target repository
pub struct GitHubClient {
    octocrab: Octocrab,
    owner: String,
    repo: String,
}

impl GitHubClient {
    /// Create a new GitHub client and verify authentication
    ///
    /// # Arguments
    /// - `access_token`: GitHub access token
    /// - `owner`: Repository owner
    /// - `repo`: Repository name
    /// - `api_base`: Optional API base override (GitHub Enterprise, tests)
    ///
    /// # Errors
    /// Returns [`Error::AuthenticationFailed`] if the token is rejected; a
    /// run never reaches the mutation phase with bad credentials.
    pub async fn new(
        access_token: &str,
        owner: &str,
        repo: &str,
        api_base: Option<&Url>,
    ) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(access_token.to_string());
        if let Some(base) = api_base {
            builder = builder.base_uri(base.as_str()).map_err(Error::GitHubApi)?;
        }
        let octocrab = builder.build().map_err(Error::GitHubApi)?;

        // Authentication test
        let _user = octocrab
            .current()
            .user()
            .await
            .map_err(|_| Error::AuthenticationFailed)?;

        Ok(Self::with_client(octocrab, owner, repo))
    }

    /// Wrap a pre-built octocrab instance without an authentication probe
    pub fn with_client(octocrab: Octocrab, owner: &str, repo: &str) -> Self {
        Self {
            octocrab,
            owner: owner.to_string(),
            repo: repo.to_string(),
        }
    }

    /// List all labels currently on the repository
    ///
    /// A 404 means the repository has no reachable labels endpoint (deleted,
    /// or brand new); that is reported as an empty set so a first sync can
    /// still create every desired label.
    ///
    /// # Errors
    /// Any non-404 listing failure is fatal for the run
    pub async fn list_labels(&self) -> Result<Vec<Label>> {
        let mut labels = Vec::new();
        let mut page = 1u32;

        loop {
            let response = match self
                .octocrab
                .issues(&self.owner, &self.repo)
                .list_labels_for_repo()
                .page(page)
                .per_page(LABELS_PER_PAGE)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) if is_not_found(&e) => return Ok(Vec::new()),
                Err(e) => return Err(Error::GitHubApi(e)),
            };

            if response.items.is_empty() {
                break;
            }

            for label in response.items {
                labels.push(Label {
                    name: label.name,
                    color: label.color,
                    description: label.description,
                });
            }

            page += 1;
        }

        Ok(labels)
    }

    /// Create a new label
    ///
    /// # Errors
    /// Returns an error if the API call fails; a 422 conflict means the
    /// label already exists (e.g. a concurrent sync won the race)
    pub async fn create_label(&self, label: &Label) -> Result<()> {
        self.octocrab
            .issues(&self.owner, &self.repo)
            .create_label(
                &label.name,
                &normalize_color(&label.color),
                label.description.as_deref().unwrap_or(""),
            )
            .await
            .map_err(Error::GitHubApi)?;

        Ok(())
    }

    /// Update the color of an existing label, keyed by its current name
    ///
    /// # Errors
    /// Returns an error if the API call fails; a 404 means the label was
    /// deleted concurrently
    pub async fn update_label_color(&self, name: &str, color: &str) -> Result<()> {
        let route = format!(
            "/repos/{}/{}/labels/{}",
            self.owner,
            self.repo,
            encode_path_segment(name)
        );
        let body = serde_json::json!({ "color": normalize_color(color) });

        let _updated: octocrab::models::Label = self
            .octocrab
            .patch(route, Some(&body))
            .await
            .map_err(Error::GitHubApi)?;

        Ok(())
    }

    /// Delete a label by name
    ///
    /// # Errors
    /// Returns an error if the API call fails; a 404 means the label is
    /// already gone
    pub async fn delete_label(&self, name: &str) -> Result<()> {
        let encoded_name = encode_path_segment(name);
        self.octocrab
            .issues(&self.owner, &self.repo)
            .delete_label(&encoded_name)
            .await
            .map_err(Error::GitHubApi)?;

        Ok(())
    }
}
