use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nimbus_core::clock::ManualClock;
use nimbus_core::provider::{Provider, Timeouts};
use nimbus_core::resource::{Resource, ResourceId, State};
use nimbus_provider_sbercloud::client::types::{CreateOpts, UpdateOpts};
use nimbus_provider_sbercloud::resources::SECGROUP;
use nimbus_provider_sbercloud::{
    ApiError, Connector, HttpConnector, ProviderConfig, SbercloudProvider, SecurityGroupApi,
};

fn config(server: &MockServer) -> ProviderConfig {
    ProviderConfig::new("ru-moscow-1", "proj", "secret-token").with_vpc_endpoint(server.uri())
}

fn api(server: &MockServer) -> Arc<dyn SecurityGroupApi> {
    HttpConnector::new(config(server))
        .connect("ru-moscow-1")
        .unwrap()
}

fn group_body(id: &str, name: &str, description: &str) -> serde_json::Value {
    json!({
        "security_group": {
            "id": id,
            "name": name,
            "description": description,
            "enterprise_project_id": "0",
            "security_group_rules": [
                {
                    "id": "rule-1",
                    "security_group_id": id,
                    "direction": "egress",
                    "ethertype": "IPv4",
                    "protocol": null,
                    "port_range_min": null,
                    "port_range_max": null,
                    "remote_ip_prefix": null,
                    "remote_group_id": null
                }
            ]
        }
    })
}

#[tokio::test]
async fn create_posts_to_v1_with_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/proj/security-groups"))
        .and(header("X-Auth-Token", "secret-token"))
        .and(body_json(json!({"security_group": {"name": "web", "enterprise_project_id": "0"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(group_body("sg-1", "web", "")))
        .expect(1)
        .mount(&server)
        .await;

    let opts = CreateOpts {
        name: "web".to_string(),
        enterprise_project_id: Some("0".to_string()),
    };
    let group = api(&server).create_security_group(&opts).await.unwrap();

    assert_eq!(group.id, "sg-1");
    assert_eq!(group.rules.len(), 1);
    assert_eq!(group.rules[0].protocol, "");
}

#[tokio::test]
async fn get_maps_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/proj/security-groups/sg-404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "VPC.0602",
            "message": "Security group does not exist"
        })))
        .mount(&server)
        .await;

    let err = api(&server).get_security_group("sg-404").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        err.to_string(),
        "resource not found: Security group does not exist"
    );
}

#[tokio::test]
async fn delete_maps_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/proj/security-groups/sg-1"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "NeutronError": {"message": "Security group sg-1 in use", "type": "SecurityGroupInUse"}
        })))
        .mount(&server)
        .await;

    let err = api(&server).delete_security_group("sg-1").await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict { .. }));
}

#[tokio::test]
async fn update_puts_to_v2() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v2.0/security-groups/sg-1"))
        .and(body_json(json!({"security_group": {"name": "web", "description": ""}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "security_group": {"id": "sg-1", "name": "web", "description": ""}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let updated = api(&server)
        .update_security_group("sg-1", &UpdateOpts::name_and_description("web", ""))
        .await
        .unwrap();
    assert_eq!(updated.name, "web");
}

#[tokio::test]
async fn rule_delete_accepts_no_content_or_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v2.0/security-group-rules/rule-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v2.0/security-group-rules/rule-2"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v2.0/security-group-rules/rule-3"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let api = api(&server);
    api.delete_rule("rule-1").await.unwrap();
    api.delete_rule("rule-2").await.unwrap();
    let err = api.delete_rule("rule-3").await.unwrap_err();
    assert!(matches!(err, ApiError::UnexpectedStatus { status: 200, .. }));
}

#[tokio::test]
async fn group_delete_accepts_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/proj/security-groups/sg-1"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    api(&server).delete_security_group("sg-1").await.unwrap();
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/proj/security-groups/sg-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = api(&server).get_security_group("sg-1").await.unwrap_err();
    assert!(matches!(err, ApiError::Decode { .. }));
}

#[tokio::test]
async fn provider_creates_and_deletes_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/proj/security-groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(group_body("sg-1", "web", "")))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v2.0/security-groups/sg-1"))
        .and(body_json(json!({"security_group": {"description": "frontend"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "security_group": {"id": "sg-1", "name": "web", "description": "frontend"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    // first read after create, then the existence check of the delete poll
    Mock::given(method("GET"))
        .and(path("/v1/proj/security-groups/sg-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(group_body("sg-1", "web", "frontend")),
        )
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/proj/security-groups/sg-1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/proj/security-groups/sg-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let provider = SbercloudProvider::new(config(&server)).with_clock(Arc::new(ManualClock::new()));
    let resource = Resource::new(SECGROUP, "web")
        .with_attribute("name", "web")
        .with_attribute("description", "frontend");

    let state = provider.create(&resource).await.unwrap();
    assert_eq!(state.identifier.as_deref(), Some("sg-1"));
    assert_eq!(state.get_string("description"), Some("frontend"));

    let deleted = provider.delete(&state, &Timeouts::default()).await.unwrap();
    assert!(!deleted.exists);
}

#[tokio::test]
async fn provider_read_of_missing_group_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/proj/security-groups/sg-gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let provider = SbercloudProvider::new(config(&server));
    let current = State::existing(ResourceId::new(SECGROUP, "web"), Default::default())
        .with_identifier("sg-gone");

    let state = provider.read(&current).await.unwrap();
    assert!(!state.exists);
}
