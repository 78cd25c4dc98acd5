use crate::{
    auth::{AuthMaterial, AuthResult, Authenticator},
    config::Config,
    error::{ErrorKind, ErrorResponse},
    generation::GenerationService,
    metrics,
    models::openai::ImageGenerationPayload,
    providers::{
        select_variant, AzureClientParams, ClientError, ClientFactory, ProviderClient,
        ProviderVariant,
    },
};
use axum::response::{IntoResponse, Response};
use std::time::Instant;

/// Authenticates an image request, picks the upstream variant, builds its
/// client and hands off to the generation service.
///
/// Stateless: every call is independent, and nothing built for one request is
/// kept for the next.
pub struct Dispatcher<A, F, G> {
    authenticator: A,
    factory: F,
    generator: G,
}

impl<A, F, G> Dispatcher<A, F, G>
where
    A: Authenticator,
    F: ClientFactory,
    G: GenerationService,
{
    pub fn new(authenticator: A, factory: F, generator: G) -> Self {
        Self {
            authenticator,
            factory,
            generator,
        }
    }

    /// Serve one request; failures become structured error responses
    pub async fn handle(
        &self,
        config: &Config,
        auth: &AuthMaterial,
        payload: ImageGenerationPayload,
    ) -> Response {
        match self.dispatch(config, auth, payload).await {
            Ok(response) => response,
            Err(error) => error.into_response(),
        }
    }

    /// Same as [`Dispatcher::handle`], with the short-circuit outcome left typed.
    ///
    /// `Err` is only produced by authentication or client construction;
    /// generation failures arrive inside the `Ok` response.
    pub async fn dispatch(
        &self,
        config: &Config,
        auth: &AuthMaterial,
        payload: ImageGenerationPayload,
    ) -> Result<Response, ErrorResponse> {
        if let AuthResult::Denied(reason) = self.authenticator.check_auth(&auth.credentials()) {
            tracing::warn!(
                reason = %reason,
                has_access_code = auth.access_code.is_some(),
                "Image generation request denied"
            );
            return Err(ErrorResponse::new(reason));
        }

        let variant = select_variant(auth.use_azure, config.azure.use_azure_openai);

        tracing::info!(
            model = %payload.model,
            provider = %variant,
            user_key = auth.api_key.is_some(),
            "Handling image generation request"
        );

        let client = self
            .build_client(variant, auth, &payload)
            .await
            .map_err(|e| classify_client_error(variant, e))?;

        metrics::record_request(variant.as_str());
        let start = Instant::now();

        let response = self.generator.generate(client, payload).await;

        metrics::record_duration(variant.as_str(), start.elapsed());
        Ok(response)
    }

    async fn build_client(
        &self,
        variant: ProviderVariant,
        auth: &AuthMaterial,
        payload: &ImageGenerationPayload,
    ) -> Result<ProviderClient, ClientError> {
        match variant {
            ProviderVariant::AzureOpenAI => {
                self.factory
                    .create_azure_openai(AzureClientParams {
                        endpoint: auth.endpoint.as_deref(),
                        api_version: auth.api_version.as_deref(),
                        model: &payload.model,
                        user_api_key: auth.api_key.as_deref(),
                    })
                    .await
            }
            ProviderVariant::OpenAI => {
                self.factory
                    .create_openai(auth.api_key.as_deref(), auth.endpoint.as_deref())
                    .await
            }
        }
    }
}

/// Map a construction failure to exactly one of the two caller-visible kinds
fn classify_client_error(variant: ProviderVariant, error: ClientError) -> ErrorResponse {
    match error {
        ClientError::MissingCredential(name) => {
            tracing::warn!(provider = %variant, credential = name, "No API key available");
            ErrorResponse::new(ErrorKind::NoApiKey)
        }
        other => {
            tracing::error!(provider = %variant, error = %other, "Failed to create provider client");
            ErrorResponse::new(ErrorKind::InternalServerError)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use async_trait::async_trait;
    use axum::{body::to_bytes, http::StatusCode, Json};
    use reqwest::Client;
    use serde_json::json;
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
        time::Duration,
    };
    use url::Url;

    struct FixedAuthenticator(AuthResult);

    impl Authenticator for FixedAuthenticator {
        fn check_auth(&self, _credentials: &crate::auth::Credentials<'_>) -> AuthResult {
            self.0
        }
    }

    #[derive(Clone, Copy)]
    enum FactoryOutcome {
        Succeed,
        MissingKey,
        BadEndpoint,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum FactoryCall {
        OpenAI {
            api_key: Option<String>,
            endpoint: Option<String>,
        },
        Azure {
            endpoint: Option<String>,
            api_version: Option<String>,
            model: String,
            user_api_key: Option<String>,
        },
    }

    struct RecordingFactory {
        outcome: FactoryOutcome,
        calls: Mutex<Vec<FactoryCall>>,
    }

    impl RecordingFactory {
        fn new(outcome: FactoryOutcome) -> Self {
            Self {
                outcome,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<FactoryCall> {
            self.calls.lock().unwrap().clone()
        }

        fn respond(&self, variant: ProviderVariant) -> Result<ProviderClient, ClientError> {
            match self.outcome {
                FactoryOutcome::Succeed => Ok(fake_client(variant)),
                FactoryOutcome::MissingKey => Err(ClientError::MissingCredential("TEST_KEY")),
                FactoryOutcome::BadEndpoint => Err(ClientError::InvalidEndpoint {
                    endpoint: "::secret-endpoint::".to_string(),
                    reason: "relative URL without a base".to_string(),
                }),
            }
        }
    }

    #[async_trait]
    impl ClientFactory for RecordingFactory {
        async fn create_openai(
            &self,
            api_key: Option<&str>,
            endpoint: Option<&str>,
        ) -> Result<ProviderClient, ClientError> {
            self.calls.lock().unwrap().push(FactoryCall::OpenAI {
                api_key: api_key.map(str::to_string),
                endpoint: endpoint.map(str::to_string),
            });
            self.respond(ProviderVariant::OpenAI)
        }

        async fn create_azure_openai(
            &self,
            params: AzureClientParams<'_>,
        ) -> Result<ProviderClient, ClientError> {
            self.calls.lock().unwrap().push(FactoryCall::Azure {
                endpoint: params.endpoint.map(str::to_string),
                api_version: params.api_version.map(str::to_string),
                model: params.model.to_string(),
                user_api_key: params.user_api_key.map(str::to_string),
            });
            self.respond(ProviderVariant::AzureOpenAI)
        }
    }

    #[derive(Default)]
    struct RecordingGenerator {
        count: AtomicUsize,
        seen: Mutex<Vec<(ProviderVariant, String, ImageGenerationPayload)>>,
    }

    #[async_trait]
    impl GenerationService for RecordingGenerator {
        async fn generate(
            &self,
            client: ProviderClient,
            payload: ImageGenerationPayload,
        ) -> Response {
            self.count.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push((
                client.variant(),
                client.base_url().to_string(),
                payload,
            ));
            (
                StatusCode::CREATED,
                Json(json!(["https://img.example.com/generated.png"])),
            )
                .into_response()
        }
    }

    fn fake_client(variant: ProviderVariant) -> ProviderClient {
        let base = match variant {
            ProviderVariant::OpenAI => "https://api.openai.com/v1",
            ProviderVariant::AzureOpenAI => "https://res.openai.azure.com/openai/deployments/dall-e-3",
        };
        ProviderClient::new(
            variant,
            Client::new(),
            Url::parse(base).unwrap(),
            "test-key".to_string(),
            None,
            Duration::from_secs(5),
        )
    }

    fn payload() -> ImageGenerationPayload {
        serde_json::from_value(json!({
            "model": "dall-e-3",
            "prompt": "cat",
        }))
        .unwrap()
    }

    fn dispatcher(
        auth: AuthResult,
        outcome: FactoryOutcome,
    ) -> Dispatcher<FixedAuthenticator, RecordingFactory, RecordingGenerator> {
        Dispatcher::new(
            FixedAuthenticator(auth),
            RecordingFactory::new(outcome),
            RecordingGenerator::default(),
        )
    }

    fn config_with_azure(flag: bool) -> Config {
        let mut cfg = test_config();
        cfg.azure.use_azure_openai = flag;
        cfg
    }

    #[tokio::test]
    async fn test_denied_request_short_circuits() {
        let d = dispatcher(
            AuthResult::Denied(ErrorKind::NoApiKey),
            FactoryOutcome::Succeed,
        );

        let result = d
            .dispatch(&config_with_azure(false), &AuthMaterial::default(), payload())
            .await;

        assert_eq!(result.unwrap_err(), ErrorResponse::new(ErrorKind::NoApiKey));
        assert!(d.factory.calls().is_empty());
        assert_eq!(d.generator.count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_denied_reason_is_passed_through() {
        let d = dispatcher(
            AuthResult::Denied(ErrorKind::InvalidAccessCode),
            FactoryOutcome::Succeed,
        );

        let response = d
            .handle(&config_with_azure(true), &AuthMaterial::default(), payload())
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "errorType": "InvalidAccessCode" }));
        assert!(d.factory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_config_flag_forces_azure() {
        let d = dispatcher(AuthResult::Authorized, FactoryOutcome::Succeed);
        let auth = AuthMaterial {
            api_key: Some("user-key".to_string()),
            endpoint: Some("https://res.openai.azure.com".to_string()),
            use_azure: false,
            ..Default::default()
        };

        d.dispatch(&config_with_azure(true), &auth, payload())
            .await
            .unwrap();

        assert_eq!(
            d.factory.calls(),
            vec![FactoryCall::Azure {
                endpoint: Some("https://res.openai.azure.com".to_string()),
                api_version: None,
                model: "dall-e-3".to_string(),
                user_api_key: Some("user-key".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_request_flag_selects_azure() {
        let d = dispatcher(AuthResult::Authorized, FactoryOutcome::Succeed);
        let auth = AuthMaterial {
            use_azure: true,
            api_version: Some("2024-02-01".to_string()),
            ..Default::default()
        };

        d.dispatch(&config_with_azure(false), &auth, payload())
            .await
            .unwrap();

        let calls = d.factory.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(
            &calls[0],
            FactoryCall::Azure { api_version: Some(v), .. } if v == "2024-02-01"
        ));
    }

    #[tokio::test]
    async fn test_missing_credential_maps_to_no_api_key() {
        for (request_flag, config_flag) in [(false, false), (true, false), (false, true)] {
            let d = dispatcher(AuthResult::Authorized, FactoryOutcome::MissingKey);
            let auth = AuthMaterial {
                use_azure: request_flag,
                ..Default::default()
            };

            let result = d
                .dispatch(&config_with_azure(config_flag), &auth, payload())
                .await;

            assert_eq!(result.unwrap_err(), ErrorResponse::new(ErrorKind::NoApiKey));
            assert_eq!(d.generator.count.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_other_construction_fault_is_internal_error() {
        let d = dispatcher(AuthResult::Authorized, FactoryOutcome::BadEndpoint);

        let response = d
            .handle(&config_with_azure(false), &AuthMaterial::default(), payload())
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("secret-endpoint"));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({ "errorType": "InternalServerError" }));
        assert_eq!(d.generator.count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_flow_passes_response_through() {
        let d = dispatcher(AuthResult::Authorized, FactoryOutcome::Succeed);
        let auth = AuthMaterial {
            access_code: Some("valid".to_string()),
            ..Default::default()
        };

        let response = d
            .handle(&config_with_azure(false), &auth, payload())
            .await;

        assert_eq!(
            d.factory.calls(),
            vec![FactoryCall::OpenAI {
                api_key: None,
                endpoint: None,
            }]
        );
        assert_eq!(d.generator.count.load(Ordering::SeqCst), 1);

        let seen = d.generator.seen.lock().unwrap().clone();
        assert_eq!(seen[0].0, ProviderVariant::OpenAI);
        assert_eq!(seen[0].1, "https://api.openai.com/v1");
        assert_eq!(seen[0].2, payload());

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!(["https://img.example.com/generated.png"]));
    }

    #[test]
    fn test_request_counter_has_one_series_per_variant() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let auth = AuthMaterial {
            api_key: Some("anything".to_string()),
            ..Default::default()
        };

        ::metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let d = dispatcher(AuthResult::Authorized, FactoryOutcome::Succeed);
                for i in 0..50 {
                    let mut payload = payload();
                    payload.model = format!("custom-model-{i}");
                    d.dispatch(&config_with_azure(i % 2 == 0), &auth, payload)
                        .await
                        .unwrap();
                }
            })
        });

        let rendered = handle.render();
        let series: Vec<&str> = rendered
            .lines()
            .filter(|line| line.starts_with("image_requests_total"))
            .collect();
        assert_eq!(series.len(), 2, "{rendered}");
        assert!(series.iter().any(|line| line.contains("variant=\"openai\"")));
        assert!(series.iter().any(|line| line.contains("variant=\"azure_openai\"")));
        assert!(!rendered.contains("custom-model"));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();

        let result = tracing::subscriber::with_default(subscriber, f);
        (result, logs.text())
    }

    #[test]
    fn test_construction_fault_is_logged_as_error() {
        let (response, logs) = capture_logs(|| {
            classify_client_error(
                ProviderVariant::AzureOpenAI,
                ClientError::InvalidEndpoint {
                    endpoint: "::bad::".to_string(),
                    reason: "relative URL without a base".to_string(),
                },
            )
        });

        assert_eq!(response, ErrorResponse::new(ErrorKind::InternalServerError));
        assert!(logs.contains("ERROR"), "{logs}");
        assert!(logs.contains("Failed to create provider client"), "{logs}");
        assert!(logs.contains("relative URL without a base"), "{logs}");
        assert!(logs.contains("azure_openai"), "{logs}");
    }

    #[test]
    fn test_missing_credential_is_a_warning_not_an_error() {
        let (response, logs) = capture_logs(|| {
            classify_client_error(
                ProviderVariant::OpenAI,
                ClientError::MissingCredential("OPENAI_API_KEY"),
            )
        });

        assert_eq!(response, ErrorResponse::new(ErrorKind::NoApiKey));
        assert!(logs.contains("WARN"), "{logs}");
        assert!(!logs.contains("ERROR"), "{logs}");
    }
}
