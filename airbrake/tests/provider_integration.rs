use airbrake::AirbrakeProvider;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use serial_test::serial;
use tfplug::data_source::{ConfigureDataSourceRequest, ReadDataSourceRequest};
use tfplug::provider::{ConfigureProviderRequest, ConfigureProviderResponse};
use tfplug::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, ResourceWithConfigure, UpdateResourceRequest,
};
use tfplug::{
    AttributePath, DataSource, DataSourceWithConfigure, Dynamic, DynamicValue, Provider, Resource,
};

const TOKEN: &str = "session-token";

fn clear_env() {
    for var in [
        "AIRBRAKE_BASE_URL",
        "AIRBRAKE_EMAIL",
        "AIRBRAKE_PASSWORD",
        "AIRBRAKE_API_KEY",
    ] {
        std::env::remove_var(var);
    }
}

fn value(document: serde_json::Value) -> DynamicValue {
    DynamicValue::new(Dynamic::from(document))
}

fn attr(state: &DynamicValue, name: &str) -> String {
    state.get_string(&AttributePath::new(name)).unwrap()
}

async fn listing(server: &mut ServerGuard, projects: serde_json::Value) -> Mock {
    server
        .mock("GET", "/projects")
        .match_query(Matcher::UrlEncoded("key".into(), TOKEN.into()))
        .with_body(json!({ "projects": projects }).to_string())
        .create_async()
        .await
}

async fn configure_with_login(
    server: &mut ServerGuard,
    provider: &mut AirbrakeProvider,
) -> ConfigureProviderResponse {
    let _login = server
        .mock("GET", "/sessions")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("email".into(), "dev@example.com".into()),
            Matcher::UrlEncoded("password".into(), "hunter2".into()),
        ]))
        .with_body(json!({ "token": TOKEN }).to_string())
        .create_async()
        .await;

    provider
        .configure(ConfigureProviderRequest {
            terraform_version: "1.9.0".to_string(),
            config: value(json!({
                "base_url": server.url(),
                "email": "dev@example.com",
                "password": "hunter2",
                "api_key": ""
            })),
        })
        .await
}

async fn project_resource(
    provider: &AirbrakeProvider,
    configured: &ConfigureProviderResponse,
) -> Box<dyn ResourceWithConfigure> {
    let factory = provider.resources()["airbrake_project"];
    let mut resource = factory();
    let response = resource
        .configure(ConfigureResourceRequest {
            provider_data: configured.provider_data.clone(),
        })
        .await;
    assert!(response.diagnostics.is_empty());
    resource
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn project_lifecycle_through_provider() {
    clear_env();
    let mut server = Server::new_async().await;
    let mut provider = AirbrakeProvider::new();

    let configured = configure_with_login(&mut server, &mut provider).await;
    assert!(configured.diagnostics.is_empty());
    let resource = project_resource(&provider, &configured).await;

    // create
    let create = server
        .mock("POST", "/projects")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("name".into(), "checkout".into()),
            Matcher::UrlEncoded("key".into(), TOKEN.into()),
        ]))
        .with_status(201)
        .with_body(r#"{"id":42,"name":"checkout","api_key":"notifier-key"}"#)
        .create_async()
        .await;
    let set_ruby = server
        .mock("PUT", "/projects/42")
        .match_query(Matcher::UrlEncoded("key".into(), TOKEN.into()))
        .match_body(Matcher::Json(json!({"language": "ruby"})))
        .create_async()
        .await;

    let planned = value(json!({"name": "checkout", "language": "ruby"}));
    let created = resource
        .create(CreateResourceRequest {
            type_name: "airbrake_project".to_string(),
            planned_state: planned.clone(),
            config: planned,
        })
        .await;
    assert!(created.diagnostics.is_empty());
    assert_eq!(attr(&created.new_state, "id"), "42");
    assert_eq!(attr(&created.new_state, "api_key"), "notifier-key");
    create.assert_async().await;
    set_ruby.assert_async().await;

    // read
    let before = listing(
        &mut server,
        json!([{"id": 42, "name": "checkout", "api_key": "notifier-key", "language": "ruby"}]),
    )
    .await;
    let read = resource
        .read(ReadResourceRequest {
            type_name: "airbrake_project".to_string(),
            current_state: created.new_state.clone(),
        })
        .await;
    assert!(read.diagnostics.is_empty());
    assert_eq!(read.new_state.as_ref(), Some(&created.new_state));

    // update
    let set_go = server
        .mock("PUT", "/projects/42")
        .match_query(Matcher::UrlEncoded("key".into(), TOKEN.into()))
        .match_body(Matcher::Json(json!({"language": "go"})))
        .create_async()
        .await;
    let mut planned = created.new_state.clone();
    planned
        .set_string(&AttributePath::new("language"), "go")
        .unwrap();
    let updated = resource
        .update(UpdateResourceRequest {
            type_name: "airbrake_project".to_string(),
            prior_state: created.new_state.clone(),
            planned_state: planned.clone(),
            config: planned,
        })
        .await;
    assert!(updated.diagnostics.is_empty());
    assert_eq!(attr(&updated.new_state, "language"), "go");
    set_go.assert_async().await;

    before.remove_async().await;
    let _after = listing(
        &mut server,
        json!([{"id": 42, "name": "checkout", "api_key": "notifier-key", "language": "go"}]),
    )
    .await;

    // import by name
    let imported = resource
        .import_state(ImportResourceStateRequest {
            type_name: "airbrake_project".to_string(),
            id: "checkout".to_string(),
        })
        .await;
    assert!(imported.diagnostics.is_empty());
    assert_eq!(attr(&imported.imported_resources[0].state, "language"), "go");

    // delete
    let delete = server
        .mock("DELETE", "/projects/42")
        .match_query(Matcher::UrlEncoded("key".into(), TOKEN.into()))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let deleted = resource
        .delete(DeleteResourceRequest {
            type_name: "airbrake_project".to_string(),
            prior_state: updated.new_state,
        })
        .await;
    assert!(deleted.diagnostics.is_empty());
    delete.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn data_source_reads_project_through_provider() {
    clear_env();
    let mut server = Server::new_async().await;
    let mut provider = AirbrakeProvider::new();

    let configured = configure_with_login(&mut server, &mut provider).await;
    assert!(configured.diagnostics.is_empty());

    let _listing = listing(
        &mut server,
        json!([
            {"id": 1, "name": "web", "api_key": "k1", "language": "ruby"},
            {"id": 2, "name": "web", "api_key": "k2", "language": "go"}
        ]),
    )
    .await;

    let factory = provider.data_sources()["airbrake_project"];
    let mut data_source = factory();
    let configure = data_source
        .configure(ConfigureDataSourceRequest {
            provider_data: configured.provider_data.clone(),
        })
        .await;
    assert!(configure.diagnostics.is_empty());

    let response = data_source
        .read(ReadDataSourceRequest {
            type_name: "airbrake_project".to_string(),
            config: value(json!({"name": "web"})),
        })
        .await;

    assert!(response.diagnostics.is_empty());
    assert_eq!(attr(&response.state, "id"), "1");
    assert_eq!(attr(&response.state, "api_key"), "k1");
}

#[tokio::test]
#[serial]
async fn provider_uses_api_key_from_environment() {
    clear_env();
    let mut server = Server::new_async().await;
    let current = server
        .mock("GET", "/users/current")
        .match_query(Matcher::UrlEncoded("key".into(), "env-key".into()))
        .with_body("{}")
        .create_async()
        .await;
    let sessions = server
        .mock("GET", "/sessions")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    std::env::set_var("AIRBRAKE_BASE_URL", server.url());
    std::env::set_var("AIRBRAKE_API_KEY", "env-key");
    std::env::set_var("AIRBRAKE_EMAIL", "dev@example.com");
    std::env::set_var("AIRBRAKE_PASSWORD", "hunter2");

    let mut provider = AirbrakeProvider::new();
    let response = provider
        .configure(ConfigureProviderRequest {
            terraform_version: "1.9.0".to_string(),
            config: DynamicValue::null(),
        })
        .await;

    assert!(response.diagnostics.is_empty());
    current.assert_async().await;
    sessions.assert_async().await;

    clear_env();
}

#[tokio::test]
#[serial]
async fn provider_rejects_unknown_configuration_values() {
    clear_env();
    let mut provider = AirbrakeProvider::new();

    let mut config = value(json!({"email": "dev@example.com"}));
    config
        .set_value(&AttributePath::new("password"), Dynamic::Unknown)
        .unwrap();

    let response = provider
        .configure(ConfigureProviderRequest {
            terraform_version: "1.9.0".to_string(),
            config,
        })
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(
        response.diagnostics[0].attribute,
        Some(AttributePath::new("password"))
    );
    assert!(response.provider_data.is_none());
}
