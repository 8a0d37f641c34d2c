use super::*;
use crate::test_support::{
    greenkeeper_pull_request, pull_request_from, Call, MockGitHub, HEAD_REF, HEAD_SHA,
};
use github_client::MergeMethod;
use serde_json::{json, Value};
use tracing_test::traced_test;

const GREENKEEPER: &str = "https://github.com/apps/greenkeeper";

fn dispatcher(client: &Arc<MockGitHub>) -> Dispatcher {
    Dispatcher::new(
        client.clone(),
        Arc::new(Settings::new("test-token", MergeMethod::Squash)),
    )
}

fn repository_json() -> Value {
    json!({
        "name": "test-repo",
        "default_branch": "main",
        "owner": { "login": "test-owner" }
    })
}

fn pull_request_payload(action: &str, sender: &str) -> Value {
    json!({
        "action": action,
        "number": 7,
        "pull_request": {
            "number": 7,
            "head": { "ref": HEAD_REF, "sha": HEAD_SHA }
        },
        "repository": repository_json(),
        "sender": { "login": "someone", "html_url": sender }
    })
}

fn status_payload(state: &str, branches: &[&str]) -> Value {
    json!({
        "sha": HEAD_SHA,
        "state": state,
        "context": "ci/circleci",
        "branches": branches.iter().map(|b| json!({ "name": b })).collect::<Vec<_>>(),
        "repository": repository_json()
    })
}

fn check_run_payload(status: &str, conclusion: Option<&str>, branch: &str, prs: &[u64]) -> Value {
    json!({
        "action": "completed",
        "check_run": {
            "name": "build",
            "status": status,
            "conclusion": conclusion,
            "head_sha": HEAD_SHA,
            "check_suite": { "head_branch": branch },
            "pull_requests": prs.iter().map(|n| json!({ "number": n })).collect::<Vec<_>>()
        },
        "repository": repository_json()
    })
}

async fn deliver(dispatcher: &Dispatcher, event_name: &str, payload: Value) -> Decision {
    dispatcher
        .handle_delivery(event_name, payload.to_string().as_bytes())
        .await
        .wait()
        .await
}

#[tokio::test]
async fn test_ping_with_json_content_type_is_configured() {
    let client = Arc::new(MockGitHub::new());

    let decision = deliver(
        &dispatcher(&client),
        "ping",
        json!({ "hook": { "config": { "content_type": "json" } } }),
    )
    .await;

    assert_eq!(decision, Decision::Configured);
    assert!(client.calls().is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_ping_with_form_content_type_is_mismatch() {
    let client = Arc::new(MockGitHub::new());

    let decision = deliver(
        &dispatcher(&client),
        "ping",
        json!({ "hook": { "config": { "content_type": "form" } } }),
    )
    .await;

    assert_eq!(
        decision,
        Decision::ContentTypeMismatch {
            content_type: Some("form".to_string())
        }
    );
    assert!(logs_contain("skipping"));
}

#[tokio::test]
async fn test_ping_without_hook_is_mismatch() {
    let client = Arc::new(MockGitHub::new());

    let decision = deliver(&dispatcher(&client), "ping", json!({ "zen": "Speak like a human." })).await;

    assert_eq!(
        decision,
        Decision::ContentTypeMismatch { content_type: None }
    );
}

#[tokio::test]
#[traced_test]
async fn test_unhandled_event_is_skipped() {
    let client = Arc::new(MockGitHub::new());

    let decision = deliver(&dispatcher(&client), "issues", json!({ "action": "opened" })).await;

    assert_eq!(
        decision,
        Decision::Skipped(SkipReason::UnhandledEvent("issues".to_string()))
    );
    assert!(logs_contain("skipping"));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_payload_is_skipped() {
    let client = Arc::new(MockGitHub::new());

    let dispatch = dispatcher(&client)
        .handle_delivery("pull_request", b"{\"action\": 5}")
        .await;

    assert!(matches!(
        dispatch.decision,
        Decision::Skipped(SkipReason::MalformedPayload(_))
    ));
    assert!(dispatch.tasks.is_empty());
}

#[tokio::test]
async fn test_opened_pull_request_from_greenkeeper_is_merged() {
    let client = Arc::new(MockGitHub::new());

    let decision = deliver(
        &dispatcher(&client),
        "pull_request",
        pull_request_payload("opened", GREENKEEPER),
    )
    .await;

    assert_eq!(
        decision,
        Decision::Accepted {
            pull_requests: vec![7]
        }
    );
    assert_eq!(
        client.calls(),
        vec![
            Call::CombinedStatus {
                sha: HEAD_SHA.to_string()
            },
            Call::Merge {
                number: 7,
                sha: HEAD_SHA.to_string(),
                method: MergeMethod::Squash,
            },
        ]
    );
}

#[tokio::test]
async fn test_opened_pull_request_from_marketplace_listing_is_accepted() {
    let client = Arc::new(MockGitHub::new());

    let decision = deliver(
        &dispatcher(&client),
        "pull_request",
        pull_request_payload("opened", "https://github.com/marketplace/greenkeeper"),
    )
    .await;

    assert!(matches!(decision, Decision::Accepted { .. }));
}

#[tokio::test]
#[traced_test]
async fn test_pull_request_from_other_sender_is_rejected() {
    let client = Arc::new(MockGitHub::new());

    let decision = deliver(
        &dispatcher(&client),
        "pull_request",
        pull_request_payload("opened", "https://github.com/octocat"),
    )
    .await;

    assert_eq!(
        decision,
        Decision::UntrustedSender {
            sender: "https://github.com/octocat".to_string()
        }
    );
    assert!(logs_contain("PR is not from greenkeeper, but from https://github.com/octocat"));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_pull_request_other_action_is_skipped() {
    let client = Arc::new(MockGitHub::new());

    let decision = deliver(
        &dispatcher(&client),
        "pull_request",
        pull_request_payload("closed", GREENKEEPER),
    )
    .await;

    assert_eq!(
        decision,
        Decision::Skipped(SkipReason::IrrelevantAction("closed".to_string()))
    );
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_unsuccessful_status_is_skipped() {
    let client = Arc::new(MockGitHub::new());

    for state in ["pending", "failure", "error"] {
        let decision = deliver(&dispatcher(&client), "status", status_payload(state, &[HEAD_REF])).await;

        assert_eq!(
            decision,
            Decision::Skipped(SkipReason::StatusNotSuccessful(state.to_string()))
        );
    }
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_status_without_branches_is_skipped() {
    let client = Arc::new(MockGitHub::new());

    let decision = deliver(&dispatcher(&client), "status", status_payload("success", &[])).await;

    assert_eq!(
        decision,
        Decision::Skipped(SkipReason::AmbiguousTarget(Vec::new()))
    );
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_status_on_multiple_branches_is_skipped() {
    let client = Arc::new(MockGitHub::new());

    let decision = deliver(
        &dispatcher(&client),
        "status",
        status_payload("success", &[HEAD_REF, "feature/other"]),
    )
    .await;

    assert!(matches!(
        decision,
        Decision::Skipped(SkipReason::AmbiguousTarget(ref names)) if names.len() == 2
    ));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_status_on_default_branches_is_skipped() {
    let client = Arc::new(MockGitHub::new());

    for branch in ["master", "main"] {
        let decision = deliver(&dispatcher(&client), "status", status_payload("success", &[branch])).await;

        assert_eq!(
            decision,
            Decision::Skipped(SkipReason::DefaultBranch(branch.to_string()))
        );
    }
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_status_search_failure_is_lookup_failed() {
    let client = Arc::new(MockGitHub::new().with_search_failure("error from search in test"));

    let decision = deliver(&dispatcher(&client), "status", status_payload("success", &[HEAD_REF])).await;

    assert_eq!(
        decision,
        Decision::LookupFailed {
            cause: "error from search in test".to_string()
        }
    );
}

#[tokio::test]
#[traced_test]
async fn test_status_without_matching_pull_requests() {
    let client = Arc::new(MockGitHub::new());

    let decision = deliver(&dispatcher(&client), "status", status_payload("success", &[HEAD_REF])).await;

    assert_eq!(decision, Decision::NoPullRequests);
    assert_eq!(
        client.calls(),
        vec![Call::Search {
            git_ref: HEAD_REF.to_string()
        }]
    );
    assert!(logs_contain("no PRs for this commit"));
}

#[tokio::test]
async fn test_status_merges_matching_pull_request() {
    let client = Arc::new(
        MockGitHub::new()
            .with_search_results(&[42])
            .with_pull_request(greenkeeper_pull_request(42)),
    );

    let decision = deliver(&dispatcher(&client), "status", status_payload("success", &[HEAD_REF])).await;

    assert_eq!(
        decision,
        Decision::Accepted {
            pull_requests: vec![42]
        }
    );
    assert_eq!(
        client.calls(),
        vec![
            Call::Search {
                git_ref: HEAD_REF.to_string()
            },
            Call::GetPullRequest { number: 42 },
            Call::CombinedStatus {
                sha: HEAD_SHA.to_string()
            },
            Call::Merge {
                number: 42,
                sha: HEAD_SHA.to_string(),
                method: MergeMethod::Squash,
            },
        ]
    );
}

#[tokio::test]
async fn test_status_starts_one_task_per_matching_pull_request() {
    let client = Arc::new(
        MockGitHub::new()
            .with_search_results(&[42, 43])
            .with_pull_request(greenkeeper_pull_request(42)),
    );

    let dispatch = dispatcher(&client)
        .handle_delivery(
            "status",
            status_payload("success", &[HEAD_REF]).to_string().as_bytes(),
        )
        .await;

    assert_eq!(dispatch.tasks.len(), 2);
    assert_eq!(
        dispatch.wait().await,
        Decision::Accepted {
            pull_requests: vec![42, 43]
        }
    );
}

#[tokio::test]
async fn test_status_does_not_merge_pull_request_from_other_author() {
    let client = Arc::new(
        MockGitHub::new()
            .with_search_results(&[42])
            .with_pull_request(pull_request_from(42, "https://github.com/octocat")),
    );

    let decision = deliver(&dispatcher(&client), "status", status_payload("success", &[HEAD_REF])).await;

    assert!(matches!(decision, Decision::Accepted { .. }));
    assert_eq!(client.merge_calls(), 0);
}

#[tokio::test]
async fn test_incomplete_check_run_is_skipped() {
    let client = Arc::new(MockGitHub::new());

    let decision = deliver(
        &dispatcher(&client),
        "check_run",
        check_run_payload("in_progress", None, HEAD_REF, &[42]),
    )
    .await;

    assert_eq!(
        decision,
        Decision::Skipped(SkipReason::CheckRunIncomplete("in_progress".to_string()))
    );
}

#[tokio::test]
async fn test_unsuccessful_check_run_is_skipped() {
    let client = Arc::new(MockGitHub::new());

    let decision = deliver(
        &dispatcher(&client),
        "check_run",
        check_run_payload("completed", Some("failure"), HEAD_REF, &[42]),
    )
    .await;

    assert_eq!(
        decision,
        Decision::Skipped(SkipReason::CheckRunNotSuccessful(Some("failure".to_string())))
    );
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_check_run_on_default_branch_is_skipped() {
    let client = Arc::new(MockGitHub::new());

    let decision = deliver(
        &dispatcher(&client),
        "check_run",
        check_run_payload("completed", Some("success"), "master", &[42]),
    )
    .await;

    assert_eq!(
        decision,
        Decision::Skipped(SkipReason::DefaultBranch("master".to_string()))
    );
}

#[tokio::test]
async fn test_check_run_without_pull_requests() {
    let client = Arc::new(MockGitHub::new());

    let decision = deliver(
        &dispatcher(&client),
        "check_run",
        check_run_payload("completed", Some("success"), HEAD_REF, &[]),
    )
    .await;

    assert_eq!(decision, Decision::NoPullRequests);
}

#[tokio::test]
async fn test_check_run_with_several_pull_requests_is_skipped() {
    let client = Arc::new(MockGitHub::new());

    let decision = deliver(
        &dispatcher(&client),
        "check_run",
        check_run_payload("completed", Some("success"), HEAD_REF, &[1, 2]),
    )
    .await;

    assert_eq!(
        decision,
        Decision::Skipped(SkipReason::AmbiguousTarget(vec![
            "#1".to_string(),
            "#2".to_string()
        ]))
    );
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_successful_check_run_merges_its_pull_request() {
    let client = Arc::new(MockGitHub::new().with_pull_request(greenkeeper_pull_request(42)));

    let decision = deliver(
        &dispatcher(&client),
        "check_run",
        check_run_payload("completed", Some("success"), HEAD_REF, &[42]),
    )
    .await;

    assert_eq!(
        decision,
        Decision::Accepted {
            pull_requests: vec![42]
        }
    );
    assert_eq!(client.calls()[0], Call::GetPullRequest { number: 42 });
    assert_eq!(client.merge_calls(), 1);
}

#[test]
fn test_decision_display_for_logs() {
    assert_eq!(
        Decision::Skipped(SkipReason::StatusNotSuccessful("failure".to_string())).to_string(),
        "skipping: commit status is 'failure'"
    );
    assert_eq!(Decision::NoPullRequests.to_string(), "no PRs for this commit");
}
