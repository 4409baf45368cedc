//! Test helpers for the Airbrake API

pub const TEST_API_KEY: &str = "test-key";

pub fn create_test_client(url: &str) -> super::Client {
    let session = super::Session::new(url)
        .unwrap()
        .with_credential(super::Credential::ApiKey(TEST_API_KEY.to_string()));
    super::Client::new(session).unwrap()
}

/// Listing body in the shape GET projects returns
pub fn projects_body(projects: &[(u64, &str, &str)]) -> String {
    let projects: Vec<serde_json::Value> = projects
        .iter()
        .map(|(id, name, language)| {
            serde_json::json!({
                "id": id,
                "name": name,
                "api_key": format!("key-{}", id),
                "language": language,
                "account_id": 1,
                "created_at": "2024-01-01T00:00:00Z"
            })
        })
        .collect();
    let count = projects.len();
    serde_json::json!({ "projects": projects, "count": count }).to_string()
}
