//! The request body sent to the optimizer.

use serde::Serialize;

use crate::workflow::{InvocationContext, Repository, RunIds};

/// Identifies this client to the optimizer service.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    /// The client name.
    pub name: &'static str,
    /// The client version.
    pub version: &'static str,
}

/// The caller identity, taken from the package metadata at build time.
pub const CALLER: Caller = Caller {
    name: env!("CARGO_PKG_NAME"),
    version: env!("CARGO_PKG_VERSION"),
};

/// The kind of CI system the context describes.
#[non_exhaustive]
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContextKind {
    /// A GitHub Actions workflow run.
    GithubActions,
}

/// Describes the run being gated.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// The CI system.
    pub kind: ContextKind,
    /// The repository the run belongs to.
    pub repository: Repository,
    /// The pull request number. Omitted when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr: Option<u64>,
    /// The commit being built.
    pub sha: String,
    /// The git ref being built, serialized as `ref`.
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// The source branch of the pull request. Omitted when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_ref: Option<String>,
    /// Identifies the workflow, job and run.
    pub run: RunIds,
}

/// The JSON body of an optimizer request.
#[derive(Serialize, Clone, PartialEq, Eq)]
pub struct RequestPayload {
    /// The optimizer token. Redacted in [`Debug`](std::fmt::Debug).
    pub token: String,
    /// Who is asking.
    pub caller: Caller,
    /// What is being asked about.
    pub context: RequestContext,
}

impl std::fmt::Debug for RequestPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPayload")
            .field("token", &"<redacted>")
            .field("caller", &self.caller)
            .field("context", &self.context)
            .finish()
    }
}

impl RequestPayload {
    /// Builds the payload for an invocation. Deterministic and free of I/O.
    pub fn new(token: &str, context: &InvocationContext) -> Self {
        Self {
            token: token.to_owned(),
            caller: CALLER,
            context: RequestContext {
                kind: ContextKind::GithubActions,
                repository: context.repository.clone(),
                pr: context.pull_request,
                sha: context.sha.clone(),
                git_ref: context.git_ref.clone(),
                head_ref: context.head_ref.clone(),
                run: context.run.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn context() -> InvocationContext {
        InvocationContext {
            event_name: "pull_request".to_owned(),
            pull_request: Some(42),
            sha: "abc123".to_owned(),
            git_ref: "refs/pull/42/merge".to_owned(),
            head_ref: Some("feature/stack".to_owned()),
            run: RunIds {
                workflow: "CI".to_owned(),
                job: "build".to_owned(),
                run: 987,
            },
            repository: Repository {
                owner: "acme".to_owned(),
                name: "widgets".to_owned(),
            },
        }
    }

    #[test]
    fn serializes_wire_format() {
        let payload = RequestPayload::new("secret", &context());
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "token": "secret",
                "caller": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                },
                "context": {
                    "kind": "GITHUB_ACTIONS",
                    "repository": { "owner": "acme", "name": "widgets" },
                    "pr": 42,
                    "sha": "abc123",
                    "ref": "refs/pull/42/merge",
                    "head_ref": "feature/stack",
                    "run": { "workflow": "CI", "job": "build", "run": 987 },
                },
            })
        );
    }

    #[test]
    fn omits_absent_optional_fields() {
        let mut context = context();
        context.pull_request = None;
        context.head_ref = None;

        let value = serde_json::to_value(RequestPayload::new("secret", &context)).unwrap();
        let object = value["context"].as_object().unwrap();
        assert!(!object.contains_key("pr"));
        assert!(!object.contains_key("head_ref"));
    }

    #[test]
    fn identical_inputs_give_identical_bytes() {
        let first = serde_json::to_vec(&RequestPayload::new("secret", &context())).unwrap();
        let second = serde_json::to_vec(&RequestPayload::new("secret", &context())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn debug_output_hides_the_token() {
        let payload = RequestPayload::new("secret", &context());
        assert!(!format!("{payload:?}").contains("secret"));
    }
}
