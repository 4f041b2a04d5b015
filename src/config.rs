//! Configuration Management
//!
//! Label records and bot configuration

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Label Definition
///
/// A single label as it appears in the desired-label document and in the
/// repository label API. Name is the natural key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Label {
    /// Label name
    pub name: String,

    /// Label color (6-digit hexadecimal, without #)
    pub color: String,

    /// Label description (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Label {
    /// Create a new label
    ///
    /// # Errors
    /// Returns an error if the name is empty or the color format is invalid
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Result<Self> {
        let label = Self {
            name: name.into(),
            color: color.into(),
            description: None,
        };

        label.validate()?;
        Ok(label)
    }

    /// Validate the label
    ///
    /// # Errors
    /// - If the name is empty
    /// - If the color is not a 6-digit hex code
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::label_validation("Label name cannot be empty"));
        }

        if !is_valid_hex_color(&normalize_color(&self.color)) {
            return Err(Error::InvalidLabelColor(self.color.clone()));
        }

        Ok(())
    }

    /// Whether this label's color matches another color value
    ///
    /// Comparison is case-insensitive and tolerates a leading `#`.
    pub fn color_matches(&self, other: &str) -> bool {
        normalize_color(&self.color) == normalize_color(other)
    }
}

/// Normalize a color value (strip a leading # and lowercase)
pub fn normalize_color(color: &str) -> String {
    color.trim_start_matches('#').to_lowercase()
}

/// Check whether a normalized color value is a 6-digit hex code
fn is_valid_hex_color(color: &str) -> bool {
    color.len() == 6 && color.chars().all(|c| c.is_ascii_hexdigit())
}

/// Bot Configuration
///
/// Everything a reconciliation run needs that is not carried by the
/// triggering event. Both documents are externally supplied URLs; there is
/// no local configuration file.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// GitHub access token used for all repository label calls
    pub access_token: String,

    /// Location of the desired-label document (`{"labels": [...]}`)
    pub label_document_url: Url,

    /// Location of the dynamic API catalog (`{"apis": [...]}`)
    pub catalog_url: Url,

    /// Override for the GitHub API base (GitHub Enterprise or test servers)
    pub github_api_url: Option<Url>,
}

impl BotConfig {
    /// Validate the configuration
    ///
    /// # Errors
    /// If the access token is empty
    pub fn validate(&self) -> Result<()> {
        if self.access_token.trim().is_empty() {
            return Err(Error::config_validation("Access token is required"));
        }

        Ok(())
    }
}
