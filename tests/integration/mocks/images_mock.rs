use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

/// OpenAI Images API success body with one hosted image per URL
pub fn create_images_response(urls: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "created": 1_700_000_000u64,
        "data": urls
            .iter()
            .map(|url| serde_json::json!({ "url": url, "revised_prompt": "a cat" }))
            .collect::<Vec<_>>(),
    })
}

/// Mock of `POST /v1/images/generations` that requires the given bearer key
///
/// `expected_calls` is verified when the server is dropped.
pub async fn setup_openai_images_mock(api_key: &str, urls: &[&str], expected_calls: u64) -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .and(header("authorization", format!("Bearer {}", api_key).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_images_response(urls)))
        .expect(expected_calls)
        .mount(&mock_server)
        .await;

    mock_server
}

/// Mock of an Azure deployment's image endpoint using `api-key` auth
pub async fn setup_azure_images_mock(
    deployment: &str,
    api_version: &str,
    api_key: &str,
    urls: &[&str],
) -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/openai/deployments/{}/images/generations", deployment)))
        .and(query_param("api-version", api_version))
        .and(header("api-key", api_key))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_images_response(urls)))
        .expect(1)
        .mount(&mock_server)
        .await;

    mock_server
}

/// Mock that rejects every generation with the given status and OpenAI error body
pub async fn setup_failing_images_mock(status: u16, code: &str) -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
            "error": {
                "message": "Your request was rejected as a result of our safety system.",
                "type": "invalid_request_error",
                "code": code,
            }
        })))
        .mount(&mock_server)
        .await;

    mock_server
}
