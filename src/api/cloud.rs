use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::batch::BatchBuilder;
use super::clock::{CancelToken, Clock, SystemClock};
use super::{ApiError, BlockOptions, Location, PageOptions, RoamApi, Rows};

pub const DEFAULT_BASE_URL: &str = "https://api.roamresearch.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_RETRIES: u32 = 3;
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(10);

type PeerResolver = Box<dyn Fn(&str, &str) -> String + Send + Sync>;

fn peer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https://(peer-\d+).*?:(\d+)").expect("valid peer regex"))
}

/// Extracts `(peer, port)` from a redirect target.
pub(crate) fn parse_peer(location: &str) -> Option<(&str, &str)> {
    let captures = peer_pattern().captures(location)?;
    Some((captures.get(1)?.as_str(), captures.get(2)?.as_str()))
}

fn peer_base_url(peer: &str, port: &str) -> String {
    format!("https://{}.api.roamresearch.com:{}", peer, port)
}

/// Client for the Roam backend REST API.
///
/// A graph is served by one peer; the first request may be redirected there
/// and the peer url is remembered for the lifetime of the client.
pub struct CloudClient {
    base_url: String,
    token: String,
    graph_name: String,
    agent: ureq::Agent,
    redirect_cache: Mutex<HashMap<String, String>>,
    peer_url: PeerResolver,
    clock: Arc<dyn Clock>,
    cancel: CancelToken,
}

#[derive(Deserialize)]
struct QueryEnvelope {
    #[serde(default)]
    result: Option<Rows>,
}

#[derive(Deserialize)]
struct PullEnvelope {
    #[serde(default)]
    result: Value,
}

impl CloudClient {
    pub fn new(graph_name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
            graph_name: graph_name.into(),
            agent: build_agent(DEFAULT_TIMEOUT),
            redirect_cache: Mutex::new(HashMap::new()),
            peer_url: Box::new(peer_base_url),
            clock: Arc::new(SystemClock),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_peer_resolver(
        mut self,
        resolver: impl Fn(&str, &str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.peer_url = Box::new(resolver);
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn effective_base_url(&self) -> String {
        self.redirect_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&self.graph_name)
            .cloned()
            .unwrap_or_else(|| self.base_url.clone())
    }

    fn graph_path(&self, endpoint: &str) -> String {
        format!("/api/graph/{}/{}", self.graph_name, endpoint)
    }

    fn call(&self, path: &str, body: &Value) -> Result<String, ApiError> {
        self.call_once(path, body, true)
    }

    fn call_once(&self, path: &str, body: &Value, follow_redirect: bool) -> Result<String, ApiError> {
        self.cancel.check()?;
        let url = format!("{}{}", self.effective_base_url(), path);
        debug!(%url, "cloud request");

        let sent = self
            .agent
            .post(&url)
            .set("Content-Type", "application/json; charset=utf-8")
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("x-authorization", &format!("Bearer {}", self.token))
            .send_string(&body.to_string());
        let response = match sent {
            Ok(response) | Err(ureq::Error::Status(_, response)) => response,
            Err(err) => return Err(ApiError::transport("failed to send request", err)),
        };

        let status = response.status();
        debug!(status, "cloud response");
        if status == 307 || status == 308 {
            let location = response
                .header("Location")
                .filter(|location| !location.is_empty())
                .ok_or_else(|| ApiError::Redirect("redirect without Location header".to_string()))?
                .to_string();
            let (peer, port) = parse_peer(&location).ok_or_else(|| {
                ApiError::Redirect(format!("could not parse redirect URL: {}", location))
            })?;
            let redirected = (self.peer_url)(peer, port);
            if !follow_redirect {
                return Err(ApiError::Redirect(format!(
                    "redirected again after following {}",
                    redirected
                )));
            }
            warn!(graph = %self.graph_name, url = %redirected, "following peer redirect");
            self.redirect_cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(self.graph_name.clone(), redirected);
            return self.call_once(path, body, false);
        }

        let text = response.into_string()?;
        classify(status, text)
    }

    fn call_with_retry(&self, path: &str, body: &Value) -> Result<String, ApiError> {
        let mut backoff = INITIAL_BACKOFF;
        for attempt in 0..=MAX_RETRIES {
            match self.call(path, body) {
                Err(err) if err.is_rate_limit() => {
                    if attempt < MAX_RETRIES {
                        warn!(
                            attempt = attempt + 1,
                            backoff_secs = backoff.as_secs(),
                            "rate limited; backing off"
                        );
                        self.clock.sleep(backoff, &self.cancel)?;
                        backoff *= 2;
                    }
                }
                other => return other,
            }
        }
        Err(ApiError::RateLimit(
            "rate limit exceeded after retries".to_string(),
        ))
    }

    /// Sends `{action, ...data}` to the write endpoint. The response body is
    /// not inspected.
    pub fn write(&self, action: &str, data: Map<String, Value>) -> Result<(), ApiError> {
        let mut body = Map::new();
        body.insert("action".to_string(), Value::from(action));
        body.extend(data);
        debug!(action, "cloud write");
        self.call_with_retry(&self.graph_path("write"), &Value::Object(body))?;
        Ok(())
    }

    fn write_with<const N: usize>(
        &self,
        action: &str,
        fields: [(&str, Value); N],
    ) -> Result<(), ApiError> {
        let data = fields
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        self.write(action, data)
    }

    fn pull_endpoint(&self, endpoint: &str, body: Value) -> Result<Value, ApiError> {
        let text = self.call_with_retry(&self.graph_path(endpoint), &body)?;
        let envelope: PullEnvelope = serde_json::from_str(&text)
            .map_err(|err| ApiError::decode("pull result", err))?;
        Ok(envelope.result)
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(timeout)
        .redirects(0)
        .build()
}

fn classify(status: u16, body: String) -> Result<String, ApiError> {
    match status {
        200 => Ok(body),
        401 => Err(ApiError::Authentication("invalid API token".to_string())),
        429 => Err(ApiError::RateLimit(format!("rate limit exceeded: {}", body))),
        400 => Err(ApiError::Validation(format!("invalid request: {}", body))),
        500 => Err(ApiError::Server(body)),
        _ => Err(ApiError::Status { status, body }),
    }
}

fn uid_map(uid: &str) -> Value {
    json!({ "uid": uid })
}

impl RoamApi for CloudClient {
    fn graph_name(&self) -> &str {
        &self.graph_name
    }

    fn query(&self, query: &str, args: &[Value]) -> Result<Rows, ApiError> {
        let mut body = json!({ "query": query });
        if !args.is_empty() {
            body["args"] = Value::from(args.to_vec());
        }
        let text = self.call_with_retry(&self.graph_path("q"), &body)?;
        let envelope: QueryEnvelope = serde_json::from_str(&text)
            .map_err(|err| ApiError::decode("query result", err))?;
        Ok(envelope.result.unwrap_or_default())
    }

    fn pull(&self, eid: &Value, selector: &str) -> Result<Value, ApiError> {
        self.pull_endpoint("pull", json!({ "eid": eid, "selector": selector }))
    }

    fn pull_many(&self, eids: &[Value], selector: &str) -> Result<Value, ApiError> {
        self.pull_endpoint("pull-many", json!({ "eids": eids, "selector": selector }))
    }

    fn create_block_at_location(
        &self,
        location: &Location,
        opts: &BlockOptions,
    ) -> Result<(), ApiError> {
        self.write_with(
            "create-block",
            [
                ("location", Value::Object(location.to_map())),
                ("block", Value::Object(opts.create_map())),
            ],
        )
    }

    fn update_block_with_options(&self, uid: &str, opts: &BlockOptions) -> Result<(), ApiError> {
        self.write_with(
            "update-block",
            [("block", Value::Object(opts.update_map(Value::from(uid))))],
        )
    }

    fn move_block_to_location(&self, uid: &str, location: &Location) -> Result<(), ApiError> {
        self.write_with(
            "move-block",
            [
                ("location", Value::Object(location.to_map())),
                ("block", uid_map(uid)),
            ],
        )
    }

    fn delete_block(&self, uid: &str) -> Result<(), ApiError> {
        self.write_with("delete-block", [("block", uid_map(uid))])
    }

    fn create_page_with_options(&self, opts: &PageOptions) -> Result<(), ApiError> {
        self.write_with("create-page", [("page", Value::Object(opts.create_map()))])
    }

    fn update_page_with_options(&self, uid: &str, opts: &PageOptions) -> Result<(), ApiError> {
        self.write_with(
            "update-page",
            [("page", Value::Object(opts.update_map(Value::from(uid))))],
        )
    }

    fn delete_page(&self, uid: &str) -> Result<(), ApiError> {
        self.write_with("delete-page", [("page", uid_map(uid))])
    }

    fn execute_batch(&self, batch: &BatchBuilder) -> Result<(), ApiError> {
        let actions = batch
            .build()
            .iter()
            .cloned()
            .map(Value::Object)
            .collect::<Vec<_>>();
        debug!(actions = actions.len(), "submitting atomic batch");
        self.write_with("batch-actions", [("actions", Value::Array(actions))])
    }
}

#[cfg(test)]
#[path = "cloud_tests.rs"]
mod cloud_tests;
