// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Convergence States
//!
//! Shared pieces of the `present`/`absent` states: the options a run is executed
//! with, the result reported per entity and the three-step convergence itself
//! (check existence, skip when already converged, otherwise apply exactly one
//! add or delete unless running in test mode).

use crate::{client::AdminResponse, errors::AdminError};
use serde::{Deserialize, Serialize, Serializer};
use std::future::Future;
use tracing::{debug, warn};

/// Desired state of an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
}

/// Options every state is executed with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateOptions {
    /// Report what would change without changing anything
    pub test: bool,
}

impl StateOptions {
    /// Enables or disables test mode.
    pub fn test(mut self, test: bool) -> Self {
        self.test = test;
        self
    }
}

/// Name before and after a change. An empty string stands for absence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Changes {
    pub old: String,
    pub new: String,
}

impl Changes {
    pub fn created(name: &str) -> Self {
        Changes {
            old: String::new(),
            new: name.to_owned(),
        }
    }

    pub fn removed(name: &str) -> Self {
        Changes {
            old: name.to_owned(),
            new: String::new(),
        }
    }
}

/// Outcome of one state invocation.
///
/// `result` is `None` only in test mode when a change would be made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateResult {
    pub name: String,
    pub result: Option<bool>,
    pub comment: String,
    #[serde(serialize_with = "serialize_changes")]
    pub changes: Option<Changes>,
}

impl StateResult {
    fn unchanged(name: &str, comment: String) -> Self {
        StateResult {
            name: name.to_owned(),
            result: Some(true),
            comment,
            changes: None,
        }
    }

    /// True unless the state reported a failure.
    pub fn is_ok(&self) -> bool {
        self.result != Some(false)
    }
}

// no changes are rendered as `{}`
fn serialize_changes<S>(changes: &Option<Changes>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match changes {
        Some(changes) => changes.serialize(serializer),
        None => serde_json::Map::new().serialize(serializer),
    }
}

/// The entity a state converges, used for comments and logs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Target<'a> {
    kind: &'static str,
    name: &'a str,
    vhost: &'a str,
}

impl<'a> Target<'a> {
    pub(crate) fn new(kind: &'static str, name: &'a str, vhost: &'a str) -> Self {
        Target { kind, name, vhost }
    }
}

/// Runs the convergence decision for an entity whose existence is `exists`.
///
/// `apply` is the add call when `ensure` is present and the delete call when it
/// is absent; it is invoked at most once and never in test mode.
pub(crate) async fn converge<F, Fut>(
    target: Target<'_>,
    ensure: Ensure,
    exists: bool,
    opts: &StateOptions,
    apply: F,
) -> Result<StateResult, AdminError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<AdminResponse, AdminError>>,
{
    let Target { kind, name, vhost } = target;

    match (ensure, exists) {
        (Ensure::Present, true) => {
            return Ok(StateResult::unchanged(
                name,
                format!("{} '{}' for vhost '{}' already exists.", kind, name, vhost),
            ))
        }
        (Ensure::Absent, false) => {
            return Ok(StateResult::unchanged(
                name,
                format!("{} '{}' for vhost '{}' does not exist.", kind, name, vhost),
            ))
        }
        _ => {}
    }

    let changes = match ensure {
        Ensure::Present => Changes::created(name),
        Ensure::Absent => Changes::removed(name),
    };

    if opts.test {
        let comment = match ensure {
            Ensure::Present => format!("{} '{}' for vhost '{}' will be created.", kind, name, vhost),
            Ensure::Absent => format!("{} '{}' will be removed from vhost '{}'.", kind, name, vhost),
        };
        debug!(kind, name, vhost, "test mode, change not applied");

        return Ok(StateResult {
            name: name.to_owned(),
            result: None,
            comment,
            changes: Some(changes),
        });
    }

    match apply().await? {
        AdminResponse::Ok { status, message } => {
            debug!(kind, name, vhost, status = status.as_str(), "state applied");
            Ok(StateResult {
                name: name.to_owned(),
                result: Some(true),
                comment: message,
                changes: Some(changes),
            })
        }
        AdminResponse::Failed(message) => {
            warn!(kind, name, vhost, error = message.as_str(), "state failed");
            Ok(StateResult {
                name: name.to_owned(),
                result: Some(false),
                comment: message,
                changes: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Status;
    use serde_json::json;

    const TARGET: Target<'static> = Target {
        kind: "Queue",
        name: "orders",
        vhost: "/",
    };

    async fn never_called() -> Result<AdminResponse, AdminError> {
        panic!("mutation must not run")
    }

    #[tokio::test]
    async fn absent_entity_needs_no_delete() {
        let ret = converge(TARGET, Ensure::Absent, false, &StateOptions::default(), never_called)
            .await
            .unwrap();

        assert_eq!(ret.result, Some(true));
        assert_eq!(ret.changes, None);
        assert_eq!(ret.comment, "Queue 'orders' for vhost '/' does not exist.");
    }

    #[tokio::test]
    async fn test_mode_predicts_a_removal() {
        let opts = StateOptions::default().test(true);
        let ret = converge(TARGET, Ensure::Absent, true, &opts, never_called)
            .await
            .unwrap();

        assert_eq!(ret.result, None);
        assert_eq!(ret.changes, Some(Changes::removed("orders")));
        assert_eq!(ret.comment, "Queue 'orders' will be removed from vhost '/'.");
    }

    #[tokio::test]
    async fn test_mode_without_changes_is_still_true() {
        let opts = StateOptions::default().test(true);
        let ret = converge(TARGET, Ensure::Present, true, &opts, never_called)
            .await
            .unwrap();

        assert_eq!(ret.result, Some(true));
        assert_eq!(ret.changes, None);
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let err = converge(TARGET, Ensure::Present, false, &StateOptions::default(), || async {
            Err::<AdminResponse, _>(AdminError::CommandExecutionError(
                "Could not connect".to_owned(),
            ))
        })
        .await
        .unwrap_err();

        assert_eq!(
            err,
            AdminError::CommandExecutionError("Could not connect".to_owned())
        );
    }

    #[tokio::test]
    async fn applied_change_carries_the_tool_message() {
        let ret = converge(TARGET, Ensure::Present, false, &StateOptions::default(), || async {
            Ok::<_, AdminError>(AdminResponse::Ok {
                status: Status::Added,
                message: "queue declared".to_owned(),
            })
        })
        .await
        .unwrap();

        assert!(ret.is_ok());
        assert_eq!(ret.comment, "queue declared");
        assert_eq!(ret.changes, Some(Changes::created("orders")));
    }

    #[test]
    fn serializes_missing_changes_as_an_empty_object() {
        let ret = StateResult::unchanged("orders", "already exists".to_owned());

        assert_eq!(
            serde_json::to_value(&ret).unwrap(),
            json!({
                "name": "orders",
                "result": true,
                "comment": "already exists",
                "changes": {}
            })
        );
    }
}
