#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode as AxumStatus},
    routing::{get, post},
    Json, Router,
};
use reqwest::StatusCode;
use serde_json::{json, Value};

use apidon_api::{
    app,
    auth::token_for,
    config::AppConfig,
    models::User,
    provider::API_KEY_HEADER,
    state::AppState,
    store::{set_as, DocPath, Document, DocumentStore, MemoryStore},
};

pub const PROVIDER_KEY: &str = "test-provider-key";

/// The API bound to a free local port, backed by a fresh in-memory store
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub config: AppConfig,
    client: reqwest::Client,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(|_| {}).await
    }

    /// Starts the server after letting the caller adjust the config
    pub async fn start_with(adjust: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut config = AppConfig::default();
        config.server.port = port;
        config.provider.api_key = PROVIDER_KEY.to_string();
        config.warmer.base_url = base_url.clone();
        adjust(&mut config);

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), config.clone())?;

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind {}", base_url))?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app(state)).await;
        });

        let server = Self {
            port,
            base_url,
            store,
            config,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn token(&self, username: &str) -> String {
        token_for(username, &self.config.security).expect("token")
    }

    /// Authenticated POST; returns the status and the parsed JSON body
    pub async fn post(&self, path: &str, username: &str, body: Value) -> Result<(StatusCode, Value)> {
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(self.token(username))
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub async fn seed_user(&self, username: &str) -> Result<()> {
        let path = DocPath::parse(&format!("users/{}", username))?;
        set_as(self.store.as_ref(), &path, &User::new(username, username.to_uppercase())).await?;
        Ok(())
    }

    pub async fn seed_users(&self, usernames: &[&str]) -> Result<()> {
        for username in usernames {
            self.seed_user(username).await?;
        }
        Ok(())
    }

    pub async fn doc(&self, path: &str) -> Result<Option<Document>> {
        Ok(self.store.get(&DocPath::parse(path)?).await?)
    }

    pub async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.doc(path).await?.is_some())
    }

    pub async fn field(&self, path: &str, field: &str) -> Result<Value> {
        let doc = self.doc(path).await?.with_context(|| format!("{} missing", path))?;
        Ok(doc.get(field).cloned().unwrap_or(Value::Null))
    }

    /// Creates a post through the API and returns its path
    pub async fn upload_post(&self, username: &str) -> Result<String> {
        let (status, body) = self
            .post(
                "/api/postUpload",
                username,
                json!({ "description": "sunset", "image": "https://img.apidon.com/sunset.png" }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "upload failed: {} {}", status, body);
        Ok(body["data"]["postDocPath"].as_str().context("postDocPath")?.to_string())
    }

    /// Makes `a` and `b` follow each other
    pub async fn befriend(&self, a: &str, b: &str) -> Result<()> {
        for (from, to) in [(a, b), (b, a)] {
            let (status, body) = self.post("/api/follow", from, json!({ "operationTo": to })).await?;
            anyhow::ensure!(status == StatusCode::OK, "follow failed: {} {}", status, body);
        }
        Ok(())
    }
}

/// What the fake provider has been asked to do
#[derive(Default)]
pub struct ProviderCalls {
    pub deals: Vec<Value>,
    pub ratings: Vec<Value>,
}

/// Stand-in for the feed provider service; rejects calls without the shared key
pub struct FakeProvider {
    pub base_url: String,
    pub calls: Arc<Mutex<ProviderCalls>>,
}

impl FakeProvider {
    pub async fn start() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let calls = Arc::new(Mutex::new(ProviderCalls::default()));

        let router = Router::new()
            .route("/client/showcase", get(showcase))
            .route("/client/deal", post(deal))
            .route("/client/rate", post(rate))
            .with_state(calls.clone());

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            calls,
        })
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) == Some(PROVIDER_KEY)
}

async fn showcase(headers: HeaderMap) -> (AxumStatus, Json<Value>) {
    if !authorized(&headers) {
        return (AxumStatus::UNAUTHORIZED, Json(json!({})));
    }
    (
        AxumStatus::OK,
        Json(json!({
            "providers": [
                { "name": "chrono", "description": "Newest first", "averageRating": 4.5 },
                { "name": "popular", "description": "Most liked" }
            ]
        })),
    )
}

async fn deal(
    State(calls): State<Arc<Mutex<ProviderCalls>>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (AxumStatus, Json<Value>) {
    if !authorized(&headers) {
        return (AxumStatus::UNAUTHORIZED, Json(json!({})));
    }
    calls.lock().unwrap().deals.push(body);
    (
        AxumStatus::OK,
        Json(json!({ "postDocPaths": ["users/carol/posts/p1", "users/dave/posts/p2"] })),
    )
}

async fn rate(
    State(calls): State<Arc<Mutex<ProviderCalls>>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (AxumStatus, Json<Value>) {
    if !authorized(&headers) {
        return (AxumStatus::UNAUTHORIZED, Json(json!({})));
    }
    calls.lock().unwrap().ratings.push(body);
    (AxumStatus::OK, Json(json!({ "ok": true })))
}
