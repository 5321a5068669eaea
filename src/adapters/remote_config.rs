use crate::adapters::google::{AccessTokenSource, api_error_message};
use crate::ports::PortFuture;
use crate::ports::store::{FetchedTemplate, TemplateStore};
use crate::store::StoreError;
use crate::types::template::{RemoteConfigTemplate, Revision};

use reqwest::header::{CONTENT_TYPE, ETAG, IF_MATCH};
use reqwest::{Client, Response, StatusCode};

pub const REMOTE_CONFIG_BASE_URL: &str = "https://firebaseremoteconfig.googleapis.com";

/// Firebase Remote Config REST client. Publishes are conditional on the ETag
/// of the template they were derived from.
#[derive(Clone)]
pub struct RemoteConfigClient {
    url: String,
    http: Client,
    tokens: AccessTokenSource,
}

impl RemoteConfigClient {
    pub fn new(base_url: &str, project_id: &str, http: Client, tokens: AccessTokenSource) -> Self {
        Self {
            url: template_url(base_url, project_id),
            http,
            tokens,
        }
    }

    async fn bearer(&self) -> Result<String, StoreError> {
        self.tokens
            .access_token()
            .await
            .map_err(|err| StoreError::Credentials(err.to_string()))
    }

    async fn fetch_template(&self) -> Result<FetchedTemplate, StoreError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(&self.url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;
        let response = reject_failure(response).await?;
        let revision = etag(&response)?;
        let template = response.json().await.map_err(transport_error)?;
        Ok(FetchedTemplate { template, revision })
    }

    async fn publish_template(
        &self,
        template: RemoteConfigTemplate,
        revision: &Revision,
    ) -> Result<RemoteConfigTemplate, StoreError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .put(&self.url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json; UTF-8")
            .header(IF_MATCH, revision.as_str())
            .json(&template)
            .send()
            .await
            .map_err(transport_error)?;
        if matches!(
            response.status(),
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED
        ) {
            return Err(StoreError::PublishConflict);
        }
        let response = reject_failure(response).await?;
        response.json().await.map_err(transport_error)
    }
}

impl TemplateStore for RemoteConfigClient {
    fn fetch<'a>(&'a self) -> PortFuture<'a, FetchedTemplate, StoreError> {
        Box::pin(self.fetch_template())
    }

    fn publish<'a>(
        &'a self,
        template: RemoteConfigTemplate,
        revision: &'a Revision,
    ) -> PortFuture<'a, RemoteConfigTemplate, StoreError> {
        Box::pin(self.publish_template(template, revision))
    }
}

fn template_url(base_url: &str, project_id: &str) -> String {
    format!(
        "{}/v1/projects/{project_id}/remoteConfig",
        base_url.trim_end_matches('/')
    )
}

fn etag(response: &Response) -> Result<Revision, StoreError> {
    response
        .headers()
        .get(ETAG)
        .and_then(|value| value.to_str().ok())
        .map(Revision::new)
        .ok_or_else(|| StoreError::Transport("remote config response carried no ETag".to_string()))
}

async fn reject_failure(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::GATEWAY_TIMEOUT {
        return Err(StoreError::Timeout);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message: api_error_message(&body),
    })
}

fn transport_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Transport(err.to_string())
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::testing::{STUB_ACCESS_TOKEN, STUB_PROJECT, spawn_google_stub, stub_token_source};
    use axum::extract::State;
    use axum::http::HeaderMap;
    use axum::http::header::AUTHORIZATION;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use std::sync::{Arc, Mutex};

    struct StubTemplate {
        etag: Option<&'static str>,
        put_status: u16,
        authorization: Mutex<Option<String>>,
        if_match: Mutex<Option<String>>,
    }

    impl StubTemplate {
        fn new(etag: Option<&'static str>, put_status: u16) -> Arc<Self> {
            Arc::new(Self {
                etag,
                put_status,
                authorization: Mutex::new(None),
                if_match: Mutex::new(None),
            })
        }
    }

    fn header(headers: &HeaderMap, name: impl axum::http::header::AsHeaderName) -> Option<String> {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    async fn get_template(
        State(stub): State<Arc<StubTemplate>>,
        headers: HeaderMap,
    ) -> axum::response::Response {
        *stub.authorization.lock().expect("lock") = header(&headers, AUTHORIZATION);
        let body = Json(json!({
            "parameters": {"welcome_text": {"defaultValue": {"value": "hello"}}},
            "version": {"versionNumber": "7"}
        }));
        match stub.etag {
            Some(etag) => ([(ETAG, etag)], body).into_response(),
            None => body.into_response(),
        }
    }

    async fn put_template(
        State(stub): State<Arc<StubTemplate>>,
        headers: HeaderMap,
    ) -> axum::response::Response {
        *stub.if_match.lock().expect("lock") = header(&headers, IF_MATCH);
        let status = StatusCode::from_u16(stub.put_status).expect("status");
        if status.is_success() {
            return Json(json!({"parameters": {}, "version": {"versionNumber": "8"}})).into_response();
        }
        let body = json!({
            "error": {"code": stub.put_status, "message": "caller lacks permission", "status": "PERMISSION_DENIED"}
        });
        (status, Json(body)).into_response()
    }

    async fn client_for(stub: &Arc<StubTemplate>) -> RemoteConfigClient {
        let api = Router::new()
            .route(
                &format!("/v1/projects/{STUB_PROJECT}/remoteConfig"),
                get(get_template).put(put_template),
            )
            .with_state(stub.clone());
        let base_url = spawn_google_stub(api).await;
        let tokens = stub_token_source(&base_url);
        RemoteConfigClient::new(&base_url, STUB_PROJECT, Client::new(), tokens)
    }

    #[test]
    fn template_url__should_join_base_and_project() {
        // Then
        assert_eq!(
            template_url("https://firebaseremoteconfig.googleapis.com/", "ethiocal"),
            "https://firebaseremoteconfig.googleapis.com/v1/projects/ethiocal/remoteConfig"
        );
    }

    #[tokio::test]
    async fn fetch__should_return_template_and_etag_with_bearer_token() {
        // Given
        let stub = StubTemplate::new(Some("etag-7"), 200);
        let client = client_for(&stub).await;

        // When
        let fetched = client.fetch().await.expect("fetch");

        // Then
        assert_eq!(fetched.revision.as_str(), "etag-7");
        assert_eq!(
            fetched.template.parameters["welcome_text"]
                .default_value
                .as_ref()
                .and_then(|value| value.value.as_deref()),
            Some("hello")
        );
        assert_eq!(
            stub.authorization.lock().expect("lock").as_deref(),
            Some(format!("Bearer {STUB_ACCESS_TOKEN}").as_str())
        );
    }

    #[tokio::test]
    async fn fetch__should_fail_when_etag_missing() {
        // Given
        let stub = StubTemplate::new(None, 200);
        let client = client_for(&stub).await;

        // When
        let result = client.fetch().await;

        // Then
        assert!(matches!(result, Err(StoreError::Transport(_))));
    }

    #[tokio::test]
    async fn publish__should_send_if_match_and_return_published_template() {
        // Given
        let stub = StubTemplate::new(Some("etag-7"), 200);
        let client = client_for(&stub).await;
        let fetched = client.fetch().await.expect("fetch");

        // When
        let published = client
            .publish(fetched.template, &fetched.revision)
            .await
            .expect("publish");

        // Then
        assert_eq!(
            published.version.and_then(|version| version.version_number).as_deref(),
            Some("8")
        );
        assert_eq!(stub.if_match.lock().expect("lock").as_deref(), Some("etag-7"));
    }

    #[tokio::test]
    async fn publish__should_map_precondition_failures_to_conflict() {
        for status in [409, 412] {
            // Given
            let stub = StubTemplate::new(Some("etag-7"), status);
            let client = client_for(&stub).await;

            // When
            let result = client
                .publish(RemoteConfigTemplate::default(), &Revision::new("etag-6"))
                .await;

            // Then
            assert!(matches!(result, Err(StoreError::PublishConflict)), "status {status}");
            assert_eq!(stub.if_match.lock().expect("lock").as_deref(), Some("etag-6"));
        }
    }

    #[tokio::test]
    async fn publish__should_map_other_failures_to_rejected_with_google_message() {
        // Given
        let stub = StubTemplate::new(Some("etag-7"), 403);
        let client = client_for(&stub).await;

        // When
        let result = client
            .publish(RemoteConfigTemplate::default(), &Revision::new("etag-7"))
            .await;

        // Then
        match result {
            Err(StoreError::Rejected { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "PERMISSION_DENIED: caller lacks permission");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
