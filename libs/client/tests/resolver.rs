//! Resolver tests: namespace discovery, ambiguity policy, identifier fields.

mod support;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cirrus_client::resolver::{AmbiguityPolicy, Provider, ResourceKind};
use cirrus_client::ClientError;

use support::authenticated_client;

async fn mount_providers(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/providers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resources": [
            {"id": 1, "name": "OpenStack",
             "type": "Cirrus::Providers::Openstack::CloudManager"},
            {"id": 2, "name": "OpenStack Network Manager",
             "type": "Cirrus::Providers::Openstack::NetworkManager"},
            {"id": 3, "name": "Amazon EC2",
             "type": "Cirrus::Providers::Amazon::CloudManager"},
        ]})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn discovers_cloud_and_network_namespaces() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let client = authenticated_client(&server, &dir).await;
    mount_providers(&server).await;

    let provider = Provider::discover(&client, "OpenStack", AmbiguityPolicy::FirstMatch)
        .await
        .unwrap();

    assert_eq!(
        provider.cloud_type(),
        "Cirrus::Providers::Openstack::CloudManager"
    );
    assert_eq!(
        provider.network_type(),
        "Cirrus::Providers::Openstack::NetworkManager"
    );
}

#[tokio::test]
async fn unregistered_provider_is_not_found() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let client = authenticated_client(&server, &dir).await;
    mount_providers(&server).await;

    let err = Provider::discover(&client, "Azure", AmbiguityPolicy::FirstMatch)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));
}

#[tokio::test]
async fn zero_matches_aborts_naming_kind_name_and_provider() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let client = authenticated_client(&server, &dir).await;
    mount_providers(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/flavors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resources": []})))
        .mount(&server)
        .await;

    let provider = Provider::discover(&client, "OpenStack", AmbiguityPolicy::FirstMatch)
        .await
        .unwrap();
    let err = provider
        .resolve(&client, ResourceKind::Flavor, "m1.small")
        .await
        .unwrap_err();

    match err {
        ClientError::NotFound(message) => {
            assert!(message.contains("Flavor"));
            assert!(message.contains("m1.small"));
            assert!(message.contains("OpenStack"));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn ambiguous_match_takes_first_in_server_order_by_default() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let client = authenticated_client(&server, &dir).await;
    mount_providers(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/flavors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resources": [
            {"id": 10, "name": "m1.small"},
            {"id": 11, "name": "m1.small"},
        ]})))
        .mount(&server)
        .await;

    let provider = Provider::discover(&client, "OpenStack", AmbiguityPolicy::FirstMatch)
        .await
        .unwrap();
    let id = provider
        .resolve(&client, ResourceKind::Flavor, "m1.small")
        .await
        .unwrap();

    assert_eq!(id, "10");
}

#[tokio::test]
async fn ambiguous_first_match_warns_exactly_once() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let client = authenticated_client(&server, &dir).await;
    mount_providers(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/flavors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resources": [
            {"id": 10, "name": "m1.small"},
            {"id": 11, "name": "m1.small"},
        ]})))
        .mount(&server)
        .await;

    let provider = Provider::discover(&client, "OpenStack", AmbiguityPolicy::FirstMatch)
        .await
        .unwrap();

    let (log, _guard) = support::capture_warnings();
    let id = provider
        .resolve(&client, ResourceKind::Flavor, "m1.small")
        .await
        .unwrap();

    assert_eq!(id, "10");
    assert_eq!(log.occurrences("multiple resources match"), 1);
}

#[tokio::test]
async fn ambiguous_match_fails_hard_under_abort_policy() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let client = authenticated_client(&server, &dir).await;
    mount_providers(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/flavors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resources": [
            {"id": 10, "name": "m1.small"},
            {"id": 11, "name": "m1.small"},
        ]})))
        .mount(&server)
        .await;

    let provider = Provider::discover(&client, "OpenStack", AmbiguityPolicy::Abort)
        .await
        .unwrap();
    let err = provider
        .resolve(&client, ResourceKind::Flavor, "m1.small")
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Ambiguous(_)));
}

#[tokio::test]
async fn templates_resolve_to_guid_not_id() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let client = authenticated_client(&server, &dir).await;
    mount_providers(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/templates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resources": [
            {"id": 5, "guid": "4f7e-8a2b", "name": "rhel-9"},
        ]})))
        .mount(&server)
        .await;

    let provider = Provider::discover(&client, "OpenStack", AmbiguityPolicy::FirstMatch)
        .await
        .unwrap();
    let id = provider
        .resolve(&client, ResourceKind::Template, "rhel-9")
        .await
        .unwrap();

    assert_eq!(id, "4f7e-8a2b");
}

#[tokio::test]
async fn subnet_resolves_by_name_from_network_attribute() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let client = authenticated_client(&server, &dir).await;
    mount_providers(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/cloud_networks/30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 30,
            "cloud_subnets": [
                {"id": 301, "name": "lab-a"},
                {"id": 302, "name": "lab-b"},
            ]
        })))
        .mount(&server)
        .await;

    let provider = Provider::discover(&client, "Amazon", AmbiguityPolicy::FirstMatch)
        .await
        .unwrap();
    let id = provider.subnet_id(&client, "30", "lab-b").await.unwrap();
    assert_eq!(id, "302");

    let err = provider
        .subnet_id(&client, "30", "lab-z")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));
}
