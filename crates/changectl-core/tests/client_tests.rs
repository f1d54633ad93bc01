//! Wire-level tests for ServerClient and the workflows running over it

use std::time::Duration;

use changectl_core::workflows::{self, CreateRequest, UpdateRequest, WaitOptions};
use changectl_core::{
    ActionType, ChangesetApi, ContentDirectives, ContentViewRef, CoreError, Resolver, ServerClient,
    TaskOutcome,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::matchers::{basic_auth, body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FAST: WaitOptions = WaitOptions {
    timeout: Duration::from_secs(10),
    interval: Duration::from_millis(5),
};

fn client(server: &MockServer) -> ServerClient {
    ServerClient::builder()
        .base_url(server.uri())
        .username("admin")
        .password("changeme")
        .build()
        .unwrap()
}

fn environment(id: u64, name: &str, prior: Option<&str>) -> Value {
    json!({"id": id, "name": name, "prior": prior, "library": prior.is_none()})
}

fn changeset(id: u64, name: &str, action_type: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": format!("{} description", name),
        "action_type": action_type,
        "state": "new",
        "environment_id": 7,
        "updated_at": "2024-03-01T10:15:30Z",
        "content_views": [{"id": 101, "name": "CV1", "label": "cv1"}]
    })
}

/// Organization ACME: Library (1) -> Dev (7), changesets CS1 (50, promotion)
/// and Cleanup (51, deletion) in Dev
async fn mount_standard(server: &MockServer) {
    for (id, name, prior) in [(1, "Library", None), (7, "Dev", Some("Library"))] {
        Mock::given(method("GET"))
            .and(path("/api/organizations/ACME/environments"))
            .and(query_param("name", name))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([environment(id, name, prior)])),
            )
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/api/organizations/ACME/environments"))
        .and(query_param("name", "Prod"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;

    for (id, name, kind) in [(50, "CS1", "promotion"), (51, "Cleanup", "deletion")] {
        Mock::given(method("GET"))
            .and(path("/api/organizations/ACME/environments/7/changesets"))
            .and(query_param("name", name))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([changeset(id, name, kind)])),
            )
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/api/changesets/{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(changeset(id, name, kind)))
            .mount(server)
            .await;
    }
}

async fn mount_view(server: &MockServer, env_id: u64, key: &str, value: &str, id: u64) {
    Mock::given(method("GET"))
        .and(path("/api/organizations/ACME/content_views"))
        .and(query_param("environment_id", env_id.to_string()))
        .and(query_param(key, value))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{
                "id": id,
                "name": format!("CV{}", id % 100),
                "label": format!("cv{}", id % 100)
            }]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_requests_carry_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/organizations/ACME/environments"))
        .and(basic_auth("admin", "changeme"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([environment(7, "Dev", None)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let env = client(&server).environment("ACME", "Dev").await.unwrap();
    assert_eq!(env.id, 7);
}

#[tokio::test]
async fn test_unknown_environment_is_not_found() {
    let server = MockServer::start().await;
    mount_standard(&server).await;

    let err = client(&server).environment("ACME", "Prod").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Could not find environment [ Prod ] within organization [ ACME ]"
    );
}

#[tokio::test]
async fn test_api_error_uses_display_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/organizations/ACME/environments/7/changesets"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"displayMessage": "Access denied"})),
        )
        .mount(&server)
        .await;

    let err = client(&server).changesets("ACME", 7).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(matches!(err, CoreError::Api { ref message, .. } if message == "Access denied"));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client(&server).task("abc").await.unwrap_err();
    assert!(matches!(err, CoreError::Decode { .. }));
}

#[tokio::test]
async fn test_list_changesets() {
    let server = MockServer::start().await;
    mount_standard(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/organizations/ACME/environments/7/changesets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            changeset(50, "CS1", "promotion"),
            changeset(51, "Cleanup", "deletion"),
        ])))
        .mount(&server)
        .await;

    let listing = workflows::list_changesets(&client(&server), "ACME", "Dev")
        .await
        .unwrap();
    let names: Vec<_> = listing.changesets.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["CS1", "Cleanup"]);
    assert_eq!(listing.changesets[1].action_type, ActionType::Deletion);
}

#[tokio::test]
async fn test_info_with_dependencies() {
    let server = MockServer::start().await;
    mount_standard(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/changesets/50/dependencies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"display_name": "glibc-2.17", "dependency_of": "CV1"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let details = workflows::changeset_info(&client(&server), "ACME", "Dev", "CS1", true)
        .await
        .unwrap();
    assert_eq!(details.changeset.environment_name.as_deref(), Some("Dev"));
    assert_eq!(details.dependencies.unwrap()[0].display_name, "glibc-2.17");
}

#[tokio::test]
async fn test_create_sends_type_and_description() {
    let server = MockServer::start().await;
    mount_standard(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/organizations/ACME/environments/7/changesets"))
        .and(body_json(json!({
            "changeset": {"name": "Q3", "description": "quarterly"},
            "type": "deletion"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(changeset(60, "Q3", "deletion")))
        .expect(1)
        .mount(&server)
        .await;

    let request = CreateRequest {
        org: "ACME".to_string(),
        environment: "Dev".to_string(),
        name: "Q3".to_string(),
        description: Some("quarterly".to_string()),
        action_type: ActionType::Deletion,
    };
    let outcome = workflows::create_changeset(&client(&server), &request)
        .await
        .unwrap();
    assert_eq!(outcome.changeset.unwrap().id, 60);
}

#[tokio::test]
async fn test_create_with_empty_response() {
    let server = MockServer::start().await;
    mount_standard(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/organizations/ACME/environments/7/changesets"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let request = CreateRequest {
        org: "ACME".to_string(),
        environment: "Dev".to_string(),
        name: "Q3".to_string(),
        description: None,
        action_type: ActionType::Promotion,
    };
    let outcome = workflows::create_changeset(&client(&server), &request)
        .await
        .unwrap();
    assert!(outcome.changeset.is_none());
}

#[tokio::test]
async fn test_update_deletion_changeset_wire_calls() {
    let server = MockServer::start().await;
    mount_standard(&server).await;
    mount_view(&server, 7, "name", "CV1", 101).await;
    mount_view(&server, 7, "id", "102", 102).await;

    Mock::given(method("PUT"))
        .and(path("/api/changesets/51"))
        .and(body_json(json!({"changeset": {"name": "Cleanup-2"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/changesets/51/content_views"))
        .and(body_json(json!({"content_view_id": 101})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/changesets/51/content_views/102"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let request = UpdateRequest {
        org: "ACME".to_string(),
        environment: "Dev".to_string(),
        name: "Cleanup".to_string(),
        new_name: Some("Cleanup-2".to_string()),
        description: None,
        content: ContentDirectives {
            add: vec![ContentViewRef::ByName("CV1".to_string())],
            remove: vec![ContentViewRef::ById("102".to_string())],
        },
    };
    let summary = workflows::update_changeset(&client(&server), &request)
        .await
        .unwrap();
    assert!(summary.renamed);
    assert_eq!((summary.added, summary.removed), (1, 1));
}

#[tokio::test]
async fn test_update_promotion_resolves_in_prior_environment() {
    let server = MockServer::start().await;
    mount_standard(&server).await;
    mount_view(&server, 1, "label", "cv2", 2).await;
    Mock::given(method("POST"))
        .and(path("/api/changesets/50/content_views"))
        .and(body_json(json!({"content_view_id": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let request = UpdateRequest {
        org: "ACME".to_string(),
        environment: "Dev".to_string(),
        name: "CS1".to_string(),
        new_name: None,
        description: None,
        content: ContentDirectives {
            add: vec![ContentViewRef::ByLabel("cv2".to_string())],
            remove: Vec::new(),
        },
    };
    workflows::update_changeset(&client(&server), &request)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_zero_padded_view_id_resolves() {
    let server = MockServer::start().await;
    mount_standard(&server).await;
    mount_view(&server, 7, "id", "102", 102).await;
    Mock::given(method("DELETE"))
        .and(path("/api/changesets/51/content_views/102"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let request = UpdateRequest {
        org: "ACME".to_string(),
        environment: "Dev".to_string(),
        name: "Cleanup".to_string(),
        new_name: None,
        description: None,
        content: ContentDirectives {
            add: Vec::new(),
            remove: vec![ContentViewRef::ById("0102".to_string())],
        },
    };
    let summary = workflows::update_changeset(&client(&server), &request)
        .await
        .unwrap();
    assert_eq!(summary.removed, 1);
}

#[tokio::test]
async fn test_delete_returns_server_message() {
    let server = MockServer::start().await;
    mount_standard(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/api/changesets/50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("Deleted changeset '50'")))
        .expect(1)
        .mount(&server)
        .await;

    let message = workflows::delete_changeset(&client(&server), "ACME", "Dev", "CS1")
        .await
        .unwrap();
    assert_eq!(message, "Deleted changeset '50'");
}

#[tokio::test]
async fn test_apply_polls_task_until_finished() {
    let server = MockServer::start().await;
    mount_standard(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/changesets/50/apply"))
        .respond_with(
            ResponseTemplate::new(202).set_body_json(json!({"uuid": "t-1", "state": "waiting"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/t-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"uuid": "t-1", "state": "running"})),
        )
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/t-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"uuid": "t-1", "state": "finished"})),
        )
        .mount(&server)
        .await;

    let outcome = workflows::apply_changeset(&client(&server), "ACME", "Dev", "CS1", FAST, None)
        .await
        .unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.task().uuid, "t-1");
}

#[tokio::test]
async fn test_apply_failed_task_reports_errors() {
    let server = MockServer::start().await;
    mount_standard(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/changesets/50/apply"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "uuid": "t-2",
            "state": "error",
            "result": {"errors": ["package conflict"]}
        })))
        .mount(&server)
        .await;

    let outcome = workflows::apply_changeset(&client(&server), "ACME", "Dev", "CS1", FAST, None)
        .await
        .unwrap();
    match outcome {
        TaskOutcome::Failed { errors, .. } => assert_eq!(errors, vec!["package conflict"]),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_promote_deletion_changeset_sends_nothing() {
    let server = MockServer::start().await;
    mount_standard(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/changesets/51/apply"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let found = workflows::promotable_changeset(&client(&server), "ACME", "Dev", "Cleanup")
        .await
        .unwrap();
    assert!(found.is_none());
}
