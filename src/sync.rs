//! Label Reconciliation
//!
//! The diff engine that turns a desired and an actual label set into an
//! ordered list of mutation intents, and the best-effort applier that
//! executes them against the repository.

use std::collections::{HashMap, HashSet};

use futures::future;
use tracing::{debug, info, warn};

use crate::config::{BotConfig, Label};
use crate::error::{Error, Result};
use crate::github::{is_conflict, is_not_found, GitHubClient};
use crate::source::{self, CatalogSource};

/// A planned mutation, computed before any network call is made
#[derive(Debug, Clone, PartialEq)]
pub enum MutationIntent {
    /// Create a label missing from the repository
    Create(Label),

    /// Update the color of an existing label, keyed by its current name
    UpdateColor { name: String, color: String },

    /// Delete a label not present in the desired set
    Delete { name: String },
}

/// Compute the mutations needed to converge `actual` to `desired`
///
/// Pure and deterministic: no I/O, no retries, and a stable order for a
/// given pair of inputs. All create/update intents (in desired order) come
/// before all delete intents (in actual order), so a renamed label never
/// disappears from the repository before its replacement exists.
///
/// Name changes are not inferred: a rename in the desired set presents as an
/// unmatched delete plus an unmatched create.
pub fn reconcile(desired: &[Label], actual: &[Label]) -> Vec<MutationIntent> {
    let actual_by_name: HashMap<&str, &Label> =
        actual.iter().map(|label| (label.name.as_str(), label)).collect();

    let mut intents = Vec::new();
    let mut desired_names = HashSet::new();

    for label in desired {
        // Duplicate names should not survive de-duplication upstream, but
        // if one does, only the first occurrence governs.
        if !desired_names.insert(label.name.as_str()) {
            continue;
        }

        match actual_by_name.get(label.name.as_str()) {
            None => intents.push(MutationIntent::Create(label.clone())),
            Some(existing) if !existing.color_matches(&label.color) => {
                intents.push(MutationIntent::UpdateColor {
                    name: label.name.clone(),
                    color: label.color.clone(),
                });
            }
            Some(_) => debug!(label = %label.name, "label already correct"),
        }
    }

    for label in actual {
        if !desired_names.contains(label.name.as_str()) {
            intents.push(MutationIntent::Delete {
                name: label.name.clone(),
            });
        }
    }

    intents
}

/// Outcome of applying a batch of mutation intents
///
/// Individual failures are collected here rather than raised; the batch
/// always runs to completion.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Number of labels created
    pub created: u32,

    /// Number of labels whose color was updated
    pub updated: u32,

    /// Number of labels deleted
    pub deleted: u32,

    /// Number of failed create requests
    pub failed_creates: u32,

    /// Number of failed update requests
    pub failed_updates: u32,

    /// Number of failed delete requests
    pub failed_deletes: u32,

    /// Human-readable descriptions of the failures
    pub failures: Vec<String>,
}

impl SyncReport {
    /// Record a successfully applied intent
    pub fn record_success(&mut self, intent: &MutationIntent) {
        match intent {
            MutationIntent::Create(_) => self.created += 1,
            MutationIntent::UpdateColor { .. } => self.updated += 1,
            MutationIntent::Delete { .. } => self.deleted += 1,
        }
    }

    /// Record a failed intent
    pub fn record_failure(&mut self, intent: &MutationIntent, message: String) {
        match intent {
            MutationIntent::Create(_) => self.failed_creates += 1,
            MutationIntent::UpdateColor { .. } => self.failed_updates += 1,
            MutationIntent::Delete { .. } => self.failed_deletes += 1,
        }
        self.failures.push(message);
    }

    /// Total number of successfully applied mutations
    pub fn total_applied(&self) -> u32 {
        self.created + self.updated + self.deleted
    }

    /// Whether any intent failed
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Apply mutation intents best-effort: one outbound request per intent, and
/// one failing request never prevents the rest from being attempted
///
/// A create conflict (concurrent sync already created the label) and an
/// update against a concurrently deleted label are recorded as failures; a
/// delete against an already-deleted label counts as success, since the
/// desired end state is reached either way.
pub async fn apply(client: &GitHubClient, intents: &[MutationIntent]) -> SyncReport {
    let mut report = SyncReport::default();

    for intent in intents {
        let outcome = match intent {
            MutationIntent::Create(label) => client.create_label(label).await,
            MutationIntent::UpdateColor { name, color } => {
                client.update_label_color(name, color).await
            }
            MutationIntent::Delete { name } => match client.delete_label(name).await {
                Err(Error::GitHubApi(ref e)) if is_not_found(e) => {
                    debug!(label = %name, "label already deleted");
                    Ok(())
                }
                other => other,
            },
        };

        match outcome {
            Ok(()) => report.record_success(intent),
            Err(Error::GitHubApi(ref e)) if is_conflict(e) => {
                warn!(?intent, "label mutation conflicted, continuing");
                report.record_failure(intent, format!("{intent:?}: {e}"));
            }
            Err(e) => {
                warn!(?intent, error = %e, "label mutation failed, continuing");
                report.record_failure(intent, format!("{intent:?}: {e}"));
            }
        }
    }

    report
}

/// Label Synchronization Engine
///
/// One engine instance runs one reconciliation for one repository: fetch the
/// desired and actual label sets concurrently, diff them, apply the result.
pub struct LabelSyncer<'a, C> {
    client: GitHubClient,
    http: &'a reqwest::Client,
    config: &'a BotConfig,
    catalog: &'a C,
}

impl<'a, C: CatalogSource> LabelSyncer<'a, C> {
    pub fn new(
        client: GitHubClient,
        http: &'a reqwest::Client,
        config: &'a BotConfig,
        catalog: &'a C,
    ) -> Self {
        Self {
            client,
            http,
            config,
            catalog,
        }
    }

    /// Run a full reconciliation
    ///
    /// # Errors
    /// Fails fatally if either the desired-label document, the dynamic
    /// catalog, or the (non-404) label listing cannot be fetched; no
    /// mutations are attempted in that case.
    pub async fn run(&self) -> Result<SyncReport> {
        let desired = async {
            let (static_labels, catalog) = future::try_join(
                source::fetch_label_document(self.http, &self.config.label_document_url),
                self.catalog.fetch_catalog(),
            )
            .await?;

            Ok::<_, Error>(source::desired_labels(
                static_labels,
                source::dynamic_labels(&catalog),
            ))
        };

        let (desired, actual) = future::try_join(desired, self.client.list_labels()).await?;

        let intents = reconcile(&desired, &actual);
        info!(
            desired = desired.len(),
            actual = actual.len(),
            mutations = intents.len(),
            "reconciliation planned"
        );

        let report = apply(&self.client, &intents).await;
        info!(
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            failed = report.failures.len(),
            "reconciliation applied"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::tests::{client_for, label_json};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn label(name: &str, color: &str) -> Label {
        Label {
            name: name.to_string(),
            color: color.to_string(),
            description: None,
        }
    }

    fn intent_names(intents: &[MutationIntent]) -> Vec<&str> {
        intents
            .iter()
            .map(|intent| match intent {
                MutationIntent::Create(l) => l.name.as_str(),
                MutationIntent::UpdateColor { name, .. } => name.as_str(),
                MutationIntent::Delete { name } => name.as_str(),
            })
            .collect()
    }

    #[test]
    fn test_bootstrap_creates_everything() {
        let desired = vec![label("bug", "d73a4a"), label("type: docs", "0075ca")];

        let intents = reconcile(&desired, &[]);
        assert_eq!(intents.len(), 2);
        assert!(intents
            .iter()
            .all(|i| matches!(i, MutationIntent::Create(_))));
        assert_eq!(intent_names(&intents), vec!["bug", "type: docs"]);
    }

    #[test]
    fn test_matching_sets_produce_no_intents() {
        let desired = vec![label("bug", "d73a4a")];
        let actual = vec![label("bug", "d73a4a")];

        assert!(reconcile(&desired, &actual).is_empty());
    }

    #[test]
    fn test_color_comparison_is_case_insensitive() {
        let desired = vec![label("bug", "d73a4a")];
        let actual = vec![label("bug", "D73A4A")];

        assert!(reconcile(&desired, &actual).is_empty());
    }

    #[test]
    fn test_color_drift_produces_single_update() {
        let desired = vec![label("type: bug", "d73a4a")];
        let actual = vec![label("type: bug", "000000")];

        let intents = reconcile(&desired, &actual);
        assert_eq!(
            intents,
            vec![MutationIntent::UpdateColor {
                name: "type: bug".to_string(),
                color: "d73a4a".to_string(),
            }]
        );
    }

    #[test]
    fn test_unmatched_actual_labels_are_deleted() {
        let desired = vec![label("enhancement", "a2eeef")];
        let actual = vec![label("bug", "d73a4a")];

        let intents = reconcile(&desired, &actual);
        assert_eq!(
            intents,
            vec![
                MutationIntent::Create(label("enhancement", "a2eeef")),
                MutationIntent::Delete {
                    name: "bug".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_deletes_come_after_creates_and_updates() {
        let desired = vec![
            label("api: new", "c5def5"),
            label("type: bug", "d73a4a"),
        ];
        let actual = vec![
            label("api: old", "c5def5"),
            label("type: bug", "000000"),
            label("stale", "ededed"),
        ];

        let intents = reconcile(&desired, &actual);
        let first_delete = intents
            .iter()
            .position(|i| matches!(i, MutationIntent::Delete { .. }))
            .unwrap();
        let last_non_delete = intents
            .iter()
            .rposition(|i| !matches!(i, MutationIntent::Delete { .. }))
            .unwrap();
        assert!(last_non_delete < first_delete);
        // A rename is never inferred: old name deleted, new name created
        assert!(intent_names(&intents).contains(&"api: old"));
        assert!(intent_names(&intents).contains(&"api: new"));
    }

    #[test]
    fn test_duplicate_desired_names_first_occurrence_governs() {
        let desired = vec![label("bug", "d73a4a"), label("bug", "000000")];
        let actual = vec![label("bug", "d73a4a")];

        // The first occurrence matches the actual color, so no intent
        assert!(reconcile(&desired, &actual).is_empty());
    }

    #[test]
    fn test_reconcile_is_a_fixed_point() {
        let desired = vec![label("bug", "d73a4a"), label("api: sprockets", "c5def5")];
        let actual = vec![label("stale", "ededed"), label("bug", "000000")];

        // Simulate applying the intents to the actual set
        let mut converged: Vec<Label> = Vec::new();
        for intent in reconcile(&desired, &actual) {
            match intent {
                MutationIntent::Create(l) => converged.push(l),
                MutationIntent::UpdateColor { name, color } => {
                    converged.push(label(&name, &color));
                }
                MutationIntent::Delete { .. } => {}
            }
        }

        assert!(reconcile(&desired, &converged).is_empty());
    }

    #[test]
    fn test_report_counters() {
        let mut report = SyncReport::default();
        report.record_success(&MutationIntent::Create(label("bug", "d73a4a")));
        report.record_success(&MutationIntent::Delete {
            name: "stale".to_string(),
        });
        report.record_failure(
            &MutationIntent::UpdateColor {
                name: "bug".to_string(),
                color: "000000".to_string(),
            },
            "boom".to_string(),
        );

        assert_eq!(report.created, 1);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.failed_updates, 1);
        assert_eq!(report.total_applied(), 2);
        assert!(report.has_failures());
    }

    #[tokio::test]
    async fn test_apply_continues_past_individual_failures() {
        let server = MockServer::start().await;
        // First create conflicts, second create succeeds
        Mock::given(method("POST"))
            .and(path("/repos/Codertocat/Hello-World/labels"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "message": "Validation Failed",
                "errors": [{"resource": "Label", "code": "already_exists", "field": "name"}]
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/Codertocat/Hello-World/labels"))
            .respond_with(ResponseTemplate::new(201).set_body_json(label_json("bug", "d73a4a")))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/repos/Codertocat/Hello-World/labels/stale"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let intents = vec![
            MutationIntent::Create(label("taken", "000000")),
            MutationIntent::Create(label("bug", "d73a4a")),
            MutationIntent::Delete {
                name: "stale".to_string(),
            },
        ];

        let report = apply(&client, &intents).await;
        assert_eq!(report.created, 1);
        assert_eq!(report.failed_creates, 1);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_treats_delete_not_found_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/repos/Codertocat/Hello-World/labels/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "message": "Not Found"
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/repos/Codertocat/Hello-World/labels/stale"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let intents = vec![
            MutationIntent::Delete {
                name: "gone".to_string(),
            },
            MutationIntent::Delete {
                name: "stale".to_string(),
            },
        ];

        let report = apply(&client, &intents).await;
        // Already deleted still counts: the desired end state was reached
        assert_eq!(report.deleted, 2);
        assert!(!report.has_failures());
    }
}
