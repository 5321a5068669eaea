use crate::adapters::{AccessTokenSource, ServiceAccountKey};
use crate::auth::{AllowList, IdentityError, VerifiedToken};
use crate::config::RemoteConfigSettings;
use crate::ports::PortFuture;
use crate::ports::identity::IdentityVerifier;
use crate::ports::push::{DispatchError, PushDispatcher};
use crate::ports::store::{FetchedTemplate, TemplateStore};
use crate::ports::time::TimeProvider;
use crate::state::AppState;
use crate::store::{ConfigRepository, StoreError};
use crate::types::holiday::HolidayOffsetConfig;
use crate::types::message::NotificationPayload;
use crate::types::template::{
    Parameter, ParameterValue, RemoteConfigTemplate, Revision, TemplateVersion,
};

use axum::routing::post;
use axum::{Json, Router};
use jwt_simple::algorithms::RS256KeyPair;
use serde_json::{Map, json};
use time::OffsetDateTime;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) const ADMIN_TOKEN: &str = "admin-token";
pub(crate) const OUTSIDER_TOKEN: &str = "outsider-token";
pub(crate) const NO_EMAIL_TOKEN: &str = "no-email-token";
pub(crate) const ADMIN_EMAIL: &str = "you@gmail.com";
pub(crate) const OUTSIDER_EMAIL: &str = "stranger@gmail.com";
pub(crate) const NOW_MILLIS: i64 = 1_760_000_000_000;
pub(crate) const STUB_PROJECT: &str = "ethiocal-test";
pub(crate) const STUB_ACCESS_TOKEN: &str = "stub-access-token";

pub(crate) fn meskel_entry() -> HolidayOffsetConfig {
    serde_json::from_value(json!({
        "offset_description": "Meskel 2025",
        "offset_eid_al_adha": 1,
        "offset_eid_al_fitr": 0,
        "offset_mawlid": 2,
        "offset_greg_year": 2025,
        "offset_ethio_year": 2018,
        "offset_hirji_year": 1447,
        "offset_stage": "prod"
    }))
    .expect("meskel entry")
}

#[derive(Default)]
pub(crate) struct StaticIdentityVerifier {
    tokens: HashMap<String, VerifiedToken>,
    calls: AtomicUsize,
}

impl StaticIdentityVerifier {
    pub(crate) fn with_token(mut self, token: &str, email: Option<&str>) -> Self {
        self.tokens.insert(
            token.to_string(),
            VerifiedToken {
                subject: format!("uid-{token}"),
                email: email.map(str::to_string),
                claims: Map::new(),
            },
        );
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl IdentityVerifier for StaticIdentityVerifier {
    fn verify<'a>(&'a self, token: &'a str) -> PortFuture<'a, VerifiedToken, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = self
            .tokens
            .get(token)
            .cloned()
            .ok_or_else(|| IdentityError::invalid("unknown test token"));
        Box::pin(async move { result })
    }
}

struct StoredTemplate {
    template: RemoteConfigTemplate,
    version: u64,
}

/// Template store with ETag semantics: every publish bumps the version and
/// invalidates earlier revisions.
#[derive(Default)]
pub(crate) struct InMemoryTemplateStore {
    inner: Mutex<Option<StoredTemplate>>,
    fetches: AtomicUsize,
    publishes: AtomicUsize,
    reject_next: Mutex<bool>,
}

impl InMemoryTemplateStore {
    fn with_stored<R>(&self, f: impl FnOnce(&mut StoredTemplate) -> R) -> R {
        let mut guard = self.inner.lock().expect("template lock");
        let stored = guard.get_or_insert_with(|| StoredTemplate {
            template: RemoteConfigTemplate::default(),
            version: 0,
        });
        f(stored)
    }

    pub(crate) fn set_parameter(&self, key: &str, parameter: Parameter) {
        self.with_stored(|stored| {
            stored.template.parameters.insert(key.to_string(), parameter);
        });
    }

    pub(crate) fn set_raw_value(&self, key: &str, value: &str) {
        self.set_parameter(
            key,
            Parameter {
                default_value: Some(ParameterValue {
                    value: Some(value.to_string()),
                    other: Map::new(),
                }),
                ..Default::default()
            },
        );
    }

    pub(crate) fn set_entries(&self, key: &str, entries: &[HolidayOffsetConfig]) {
        let raw = serde_json::to_string(entries).expect("serialize entries");
        self.set_raw_value(key, &raw);
    }

    pub(crate) fn template(&self) -> RemoteConfigTemplate {
        self.with_stored(|stored| stored.template.clone())
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn publish_count(&self) -> usize {
        self.publishes.load(Ordering::SeqCst)
    }

    pub(crate) fn reject_next_publish(&self) {
        *self.reject_next.lock().expect("reject lock") = true;
    }

    fn revision(version: u64) -> Revision {
        Revision::new(format!("etag-{version}"))
    }
}

impl TemplateStore for InMemoryTemplateStore {
    fn fetch<'a>(&'a self) -> PortFuture<'a, FetchedTemplate, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let fetched = self.with_stored(|stored| FetchedTemplate {
            template: stored.template.clone(),
            revision: Self::revision(stored.version),
        });
        Box::pin(async move { Ok(fetched) })
    }

    fn publish<'a>(
        &'a self,
        mut template: RemoteConfigTemplate,
        revision: &'a Revision,
    ) -> PortFuture<'a, RemoteConfigTemplate, StoreError> {
        let rejected = std::mem::take(&mut *self.reject_next.lock().expect("reject lock"));
        let result = self.with_stored(|stored| {
            if rejected || *revision != Self::revision(stored.version) {
                return Err(StoreError::PublishConflict);
            }
            stored.version += 1;
            template.version = Some(TemplateVersion {
                version_number: Some(stored.version.to_string()),
                other: Map::new(),
            });
            stored.template = template.clone();
            Ok(template)
        });
        if result.is_ok() {
            self.publishes.fetch_add(1, Ordering::SeqCst);
        }
        Box::pin(async move { result })
    }
}

#[derive(Default)]
pub(crate) struct RecordingDispatcher {
    sent: Mutex<Vec<NotificationPayload>>,
    fail_with_status: Option<u16>,
}

impl RecordingDispatcher {
    pub(crate) fn failing(status: u16) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with_status: Some(status),
        }
    }

    pub(crate) fn sent(&self) -> Vec<NotificationPayload> {
        self.sent.lock().expect("sent lock").clone()
    }
}

impl PushDispatcher for RecordingDispatcher {
    fn send<'a>(&'a self, payload: &'a NotificationPayload) -> PortFuture<'a, String, DispatchError> {
        let result = match self.fail_with_status {
            Some(status) => Err(DispatchError::Rejected {
                status,
                message: "Requested entity was not found.".to_string(),
            }),
            None => {
                let mut sent = self.sent.lock().expect("sent lock");
                sent.push(payload.clone());
                Ok(format!("projects/test/messages/{}", sent.len()))
            }
        };
        Box::pin(async move { result })
    }
}

pub(crate) struct FixedClock(pub(crate) OffsetDateTime);

impl FixedClock {
    pub(crate) fn at_millis(millis: i64) -> Self {
        let at = OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
            .expect("fixed time");
        Self(at)
    }
}

impl TimeProvider for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

pub(crate) struct TestHarness {
    pub(crate) state: AppState,
    pub(crate) identity: Arc<StaticIdentityVerifier>,
    pub(crate) store: Arc<InMemoryTemplateStore>,
    pub(crate) dispatcher: Arc<RecordingDispatcher>,
}

impl TestHarness {
    pub(crate) fn new() -> Self {
        Self::with_dispatcher(RecordingDispatcher::default())
    }

    pub(crate) fn with_dispatcher(dispatcher: RecordingDispatcher) -> Self {
        let identity = Arc::new(
            StaticIdentityVerifier::default()
                .with_token(ADMIN_TOKEN, Some(ADMIN_EMAIL))
                .with_token(OUTSIDER_TOKEN, Some(OUTSIDER_EMAIL))
                .with_token(NO_EMAIL_TOKEN, None),
        );
        let store = Arc::new(InMemoryTemplateStore::default());
        let dispatcher = Arc::new(dispatcher);
        let state = AppState {
            allow_list: AllowList::new([ADMIN_EMAIL, "pastor@gmail.com"]),
            identity: identity.clone(),
            repository: ConfigRepository::new(store.clone(), RemoteConfigSettings::default()),
            dispatcher: dispatcher.clone(),
            clock: Arc::new(FixedClock::at_millis(NOW_MILLIS)),
        };
        Self {
            state,
            identity,
            store,
            dispatcher,
        }
    }
}

/// Serves `api` plus an OAuth token endpoint on a local port and returns the
/// base URL.
pub(crate) async fn spawn_google_stub(api: Router) -> String {
    let router = api.route(
        "/token",
        post(|| async {
            Json(json!({"access_token": STUB_ACCESS_TOKEN, "expires_in": 3600}))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server");
    });
    format!("http://{addr}")
}

pub(crate) fn stub_token_source(base_url: &str) -> AccessTokenSource {
    let key_pair = RS256KeyPair::generate(2048).expect("generate key");
    let key = ServiceAccountKey {
        project_id: Some(STUB_PROJECT.to_string()),
        private_key_id: Some("stub-key".to_string()),
        private_key: key_pair.to_pem().expect("export key"),
        client_email: format!("admin@{STUB_PROJECT}.iam.gserviceaccount.com"),
        token_uri: format!("{base_url}/token"),
    };
    AccessTokenSource::new(key, reqwest::Client::new()).expect("token source")
}
