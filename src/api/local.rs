use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use super::batch::BatchBuilder;
use super::clock::{CancelToken, Clock, SystemClock};
use super::replay;
use super::verify::with_timeout_verification;
use super::{ApiError, BlockOptions, Location, Order, PageOptions, RoamApi, Rows, SearchOptions};
use crate::roamdb::{daily, queries};

pub const PORT_FILE_NAME: &str = ".roam-api-port";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// Client for the desktop app's Local API, used for encrypted graphs.
///
/// The app writes its port to `~/.roam-api-port` when the Local API is
/// enabled. The file is read on every call since the app may restart on a
/// different port.
pub struct LocalClient {
    graph_name: String,
    agent: ureq::Agent,
    host: String,
    port_file: Option<PathBuf>,
    clock: Arc<dyn Clock>,
    cancel: CancelToken,
}

#[derive(Deserialize)]
struct LocalEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// A file fetched from the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub data: Vec<u8>,
    pub name: Option<String>,
    pub mime: Option<String>,
}

impl LocalClient {
    pub fn new(graph_name: impl Into<String>) -> Self {
        Self {
            graph_name: graph_name.into(),
            agent: build_agent(DEFAULT_TIMEOUT),
            host: "localhost".to_string(),
            port_file: None,
            clock: Arc::new(SystemClock),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    pub fn with_port_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.port_file = Some(path.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
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

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn port_file(&self) -> Result<PathBuf, ApiError> {
        if let Some(path) = &self.port_file {
            return Ok(path.clone());
        }
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(PORT_FILE_NAME))
            .ok_or_else(|| ApiError::Protocol("failed to get home directory".to_string()))
    }

    fn discover_port(&self) -> Result<u16, ApiError> {
        let path = self.port_file()?;
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ApiError::DesktopNotRunning(format!(
                    "Roam desktop app not running: port file {} not found. \
                     Start Roam and enable 'Encrypted local API' in settings.",
                    path.display()
                )))
            }
            Err(err) => {
                return Err(ApiError::Protocol(format!(
                    "failed to read port file {}: {}",
                    path.display(),
                    err
                )))
            }
        };
        let trimmed = raw.trim();
        trimmed.parse::<u16>().map_err(|_| {
            ApiError::Protocol(format!("invalid port in {}: {:?}", path.display(), trimmed))
        })
    }

    /// Invokes any Local API action with positional `args`.
    pub fn call(&self, action: &str, args: Vec<Value>) -> Result<Value, ApiError> {
        self.cancel.check()?;
        let port = self.discover_port()?;
        let url = format!("http://{}:{}/api/{}", self.host, port, self.graph_name);
        debug!(action, port, "local request");

        let body = json!({ "action": action, "args": args });
        let sent = self
            .agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body.to_string());
        let response = match sent {
            Ok(response) | Err(ureq::Error::Status(_, response)) => response,
            Err(err) => {
                return Err(ApiError::transport(
                    "failed to send request to Local API",
                    err,
                ))
            }
        };
        let status = response.status();
        let text = response.into_string()?;

        let envelope: LocalEnvelope = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if status != 200 => return Err(ApiError::Status { status, body: text }),
            Err(err) => return Err(ApiError::decode("Local API response", err)),
        };
        if !envelope.success {
            return Err(ApiError::LocalApi(envelope.error.unwrap_or_default()));
        }
        if status != 200 {
            return Err(match envelope.error.filter(|message| !message.is_empty()) {
                Some(message) => ApiError::LocalApi(message),
                None => ApiError::LocalApi(format!("local API error (status {})", status)),
            });
        }
        Ok(envelope.result.unwrap_or(Value::Null))
    }

    fn call_with(&self, action: &str, args: Value) -> Result<Value, ApiError> {
        self.call(action, vec![args])
    }

    fn first_string(&self, query: &str) -> Result<Option<String>, ApiError> {
        let rows = self.query(query, &[])?;
        Ok(rows
            .first()
            .and_then(|row| row.first())
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Turns a location into a parent uid, creating the target page when it
    /// is addressed by a title that does not exist yet. Two concurrent
    /// resolutions of the same title can both create the page.
    fn resolve_parent(&self, location: &Location) -> Result<String, ApiError> {
        if let Some(uid) = location.parent_uid() {
            return Ok(uid.to_string());
        }
        let title = if let Some(title) = location.page_title() {
            title.to_string()
        } else if let Some(date) = location.daily_note_date() {
            daily::title_for_wire_date(date).map_err(ApiError::InvalidArgument)?
        } else {
            return Err(ApiError::InvalidArgument(
                "location must specify parent-uid, page-title, or daily-note-date".to_string(),
            ));
        };
        self.get_or_create_page_uid(&title)
    }

    fn get_or_create_page_uid(&self, title: &str) -> Result<String, ApiError> {
        let query = queries::page_uid_by_title(title);
        if let Some(uid) = self.first_string(&query)? {
            return Ok(uid);
        }
        debug!(title, "creating missing page");
        self.create_page_with_options(&PageOptions::titled(title))?;
        self.first_string(&query)?.ok_or_else(|| {
            ApiError::Protocol(format!("could not get page UID after creating '{}'", title))
        })
    }

    /// Creates a block under `parent_uid` and returns the raw create result.
    fn create_block_raw(
        &self,
        parent_uid: &str,
        opts: &BlockOptions,
        order: Order,
    ) -> Result<Value, ApiError> {
        let args = json!({
            "location": { "parent-uid": parent_uid, "order": order },
            "block": opts.create_map(),
        });
        with_timeout_verification(
            self.clock.as_ref(),
            &self.cancel,
            "create block",
            || self.call_with("data.block.create", args),
            || match explicit_uid(opts) {
                Some(uid) => {
                    let rows = self.query(&queries::block_under_parent(uid, parent_uid), &[])?;
                    Ok((!rows.is_empty()).then(|| Value::from(uid)))
                }
                None if opts.content.is_empty() => Ok(None),
                // Confirms the write only; a same-text sibling can be older.
                None => {
                    let query = queries::child_uid_by_content(parent_uid, &opts.content);
                    Ok(self.first_string(&query)?.map(|_| Value::Null))
                }
            },
        )
    }

    /// Creates a block and returns its uid. Without an explicit uid one is
    /// generated and sent, so the uid is known even when the app returns
    /// nothing or the write times out.
    fn create_block_under(
        &self,
        parent_uid: &str,
        opts: &BlockOptions,
        order: Order,
    ) -> Result<String, ApiError> {
        let mut opts = opts.clone();
        let sent = match explicit_uid(&opts) {
            Some(uid) => uid.to_string(),
            None => {
                let uid = new_block_uid();
                opts.uid = Some(uid.clone());
                uid
            }
        };
        let result = self.create_block_raw(parent_uid, &opts, order)?;
        Ok(parse_local_create_uid(&result).unwrap_or(sent))
    }

    pub fn create_block_and_get_uid(
        &self,
        parent_uid: &str,
        content: &str,
        order: Order,
    ) -> Result<String, ApiError> {
        self.create_block_under(parent_uid, &BlockOptions::with_content(content), order)
    }

    pub fn create_block_at_location_and_get_uid(
        &self,
        location: &Location,
        opts: &BlockOptions,
    ) -> Result<String, ApiError> {
        let parent = self.resolve_parent(location)?;
        self.create_block_under(&parent, opts, location.order)
    }

    /// Creates a page and returns its uid, from the create result when the
    /// app reports it or by looking the title up otherwise.
    pub fn create_page_and_get_uid(&self, opts: &PageOptions) -> Result<String, ApiError> {
        let result = self.create_page_raw(opts)?;
        if let Some(uid) = parse_local_create_uid(&result) {
            return Ok(uid);
        }
        if let Some(uid) = opts.uid.as_deref().filter(|uid| !uid.is_empty()) {
            return Ok(uid.to_string());
        }
        self.first_string(&queries::page_uid_by_title(&opts.title))?
            .ok_or_else(|| {
                ApiError::Protocol(format!(
                    "could not get page UID after creating '{}'",
                    opts.title
                ))
            })
    }

    fn create_page_raw(&self, opts: &PageOptions) -> Result<Value, ApiError> {
        with_timeout_verification(
            self.clock.as_ref(),
            &self.cancel,
            "create page",
            || self.call_with("data.page.create", json!({ "page": opts.create_map() })),
            || {
                let uid = self.first_string(&queries::page_uid_by_title(&opts.title))?;
                Ok(uid.map(Value::from))
            },
        )
    }

    pub fn undo(&self) -> Result<(), ApiError> {
        self.call("data.undo", Vec::new()).map(drop)
    }

    pub fn redo(&self) -> Result<(), ApiError> {
        self.call("data.redo", Vec::new()).map(drop)
    }

    /// Sets the order of `block_uids` under `parent_uid`. Older app builds
    /// only know `data.block.reorder`; if both names fail the first error is
    /// returned.
    pub fn reorder_blocks(&self, parent_uid: &str, block_uids: &[String]) -> Result<(), ApiError> {
        let args = json!({ "parent-uid": parent_uid, "block-uids": block_uids });
        match self.call_with("data.block.reorderBlocks", args.clone()) {
            Ok(_) => Ok(()),
            Err(err) => {
                debug!(error = %err, "reorderBlocks failed; trying legacy reorder");
                self.call_with("data.block.reorder", args)
                    .map(drop)
                    .map_err(|_| err)
            }
        }
    }

    pub fn add_page_shortcut(&self, uid: &str, index: Option<u32>) -> Result<(), ApiError> {
        let mut args = vec![Value::from(uid)];
        if let Some(index) = index {
            args.push(Value::from(index));
        }
        self.call("data.page.addShortcut", args).map(drop)
    }

    pub fn remove_page_shortcut(&self, uid: &str) -> Result<(), ApiError> {
        self.call("data.page.removeShortcut", vec![Value::from(uid)])
            .map(drop)
    }

    pub fn upsert_user(&self, user_uid: &str, display_name: Option<&str>) -> Result<(), ApiError> {
        let mut args = Map::new();
        args.insert("user-uid".to_string(), Value::from(user_uid));
        if let Some(name) = display_name.filter(|name| !name.is_empty()) {
            args.insert("display-name".to_string(), Value::from(name));
        }
        self.call_with("data.user.upsert", Value::Object(args))
            .map(drop)
    }

    /// Uploads `data` and returns the hosted URL.
    pub fn upload_file(&self, filename: &str, data: &[u8]) -> Result<String, ApiError> {
        let result = self.call_with(
            "file.upload",
            json!({ "filename": filename, "data": BASE64.encode(data) }),
        )?;
        match &result {
            Value::String(url) => Ok(url.clone()),
            Value::Object(map) => map
                .get("url")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ApiError::Protocol("upload response has no url".to_string())),
            _ => Err(ApiError::Protocol(format!(
                "unexpected upload response: {}",
                result
            ))),
        }
    }

    pub fn delete_file(&self, url: &str) -> Result<(), ApiError> {
        self.call_with("file.delete", json!({ "url": url }))
            .map(drop)
    }

    pub fn get_file(&self, url: &str) -> Result<FileContent, ApiError> {
        let result = self.call_with("file.get", json!({ "url": url }))?;
        parse_local_file_result(&result)
    }

    /// Fetches file bytes, falling back to the legacy `file.download` action.
    /// When both fail the `file.get` error is returned.
    pub fn download_file(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let err = match self.get_file(url) {
            Ok(file) => return Ok(file.data),
            Err(err) => err,
        };
        debug!(error = %err, "file.get failed; trying legacy file.download");
        let result = match self.call_with("file.download", json!({ "url": url })) {
            Ok(result) => result,
            Err(_) => return Err(err),
        };
        let encoded = result.as_str().ok_or_else(|| {
            ApiError::Protocol("failed to parse download response: expected a string".to_string())
        })?;
        decode_base64(encoded)
    }

    /// Full-text search as the app's search box runs it.
    pub fn search(&self, text: &str, opts: &SearchOptions) -> Result<Value, ApiError> {
        self.call_with("data.search", Value::Object(opts.to_map(text)))
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

fn explicit_uid(opts: &BlockOptions) -> Option<&str> {
    opts.uid.as_deref().filter(|uid| !uid.is_empty())
}

/// A fresh block uid in the app's 9-character form.
fn new_block_uid() -> String {
    let hex = Uuid::now_v7().simple().to_string();
    hex[hex.len() - 9..].to_string()
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>, ApiError> {
    BASE64
        .decode(encoded)
        .map_err(|err| ApiError::Protocol(format!("failed to decode file data: {}", err)))
}

/// Extracts the uid of a created entity from a Local API create result.
/// App versions disagree on the shape; the first non-empty match wins.
pub fn parse_local_create_uid(result: &Value) -> Option<String> {
    let block = result.get("block");
    [
        result.as_str(),
        result.get("uid").and_then(Value::as_str),
        result.get("block/uid").and_then(Value::as_str),
        block.and_then(|block| block.get("uid")).and_then(Value::as_str),
        block
            .and_then(|block| block.get("block/uid"))
            .and_then(Value::as_str),
    ]
    .into_iter()
    .flatten()
    .find(|uid| !uid.is_empty())
    .map(str::to_string)
}

pub(crate) fn parse_local_file_result(result: &Value) -> Result<FileContent, ApiError> {
    let fields = match result {
        Value::String(encoded) => {
            return Ok(FileContent {
                data: decode_base64(encoded)?,
                name: None,
                mime: None,
            })
        }
        Value::Object(map) => match map.get("file") {
            Some(Value::Object(nested)) => nested,
            _ => map,
        },
        _ => return Err(unsupported_file_response()),
    };

    let text = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };
    let encoded = ["data", "base64", "content"]
        .iter()
        .find_map(|key| {
            fields
                .get(*key)
                .and_then(Value::as_str)
                .filter(|value| !value.is_empty())
        })
        .ok_or_else(unsupported_file_response)?;

    Ok(FileContent {
        data: decode_base64(encoded)?,
        name: text(&["name", "filename"]),
        mime: text(&["type", "mime"]),
    })
}

fn unsupported_file_response() -> ApiError {
    ApiError::Protocol("unsupported file response format".to_string())
}

fn rows_from(result: Value) -> Result<Rows, ApiError> {
    if result.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(result).map_err(|err| ApiError::decode("query result", err))
}

impl RoamApi for LocalClient {
    fn graph_name(&self) -> &str {
        &self.graph_name
    }

    fn query(&self, query: &str, args: &[Value]) -> Result<Rows, ApiError> {
        let mut call_args = Vec::with_capacity(args.len() + 1);
        call_args.push(Value::from(query));
        call_args.extend_from_slice(args);
        rows_from(self.call("data.q", call_args)?)
    }

    fn pull(&self, eid: &Value, selector: &str) -> Result<Value, ApiError> {
        self.call("data.pull", vec![Value::from(selector), eid.clone()])
    }

    /// Some app builds lack `data.pull-many`; those get one pull per eid.
    fn pull_many(&self, eids: &[Value], selector: &str) -> Result<Value, ApiError> {
        let args = vec![Value::from(selector), Value::from(eids.to_vec())];
        match self.call("data.pull-many", args) {
            Err(ApiError::LocalApi(message)) => {
                warn!(%message, "pull-many unavailable; pulling one entity at a time");
                let pulled = eids
                    .iter()
                    .map(|eid| self.pull(eid, selector))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(pulled))
            }
            other => other,
        }
    }

    fn create_block_at_location(
        &self,
        location: &Location,
        opts: &BlockOptions,
    ) -> Result<(), ApiError> {
        let parent = self.resolve_parent(location)?;
        self.create_block_raw(&parent, opts, location.order)
            .map(drop)
    }

    fn update_block_with_options(&self, uid: &str, opts: &BlockOptions) -> Result<(), ApiError> {
        let args = json!({ "block": opts.update_map(Value::from(uid)) });
        with_timeout_verification(
            self.clock.as_ref(),
            &self.cancel,
            "update block",
            || self.call_with("data.block.update", args).map(drop),
            || {
                if opts.content.is_empty() {
                    return Ok(None);
                }
                let rows = self.query(&queries::block_with_content(uid, &opts.content), &[])?;
                Ok((!rows.is_empty()).then_some(()))
            },
        )
    }

    fn move_block_to_location(&self, uid: &str, location: &Location) -> Result<(), ApiError> {
        let parent = self.resolve_parent(location)?;
        let args = json!({
            "location": { "parent-uid": parent, "order": location.order },
            "block": { "uid": uid },
        });
        with_timeout_verification(
            self.clock.as_ref(),
            &self.cancel,
            "move block",
            || self.call_with("data.block.move", args).map(drop),
            || {
                let rows = self.query(&queries::block_under_parent(uid, &parent), &[])?;
                Ok((!rows.is_empty()).then_some(()))
            },
        )
    }

    fn delete_block(&self, uid: &str) -> Result<(), ApiError> {
        self.call_with("data.block.delete", json!({ "block": { "uid": uid } }))
            .map(drop)
    }

    fn create_page_with_options(&self, opts: &PageOptions) -> Result<(), ApiError> {
        self.create_page_raw(opts).map(drop)
    }

    fn update_page_with_options(&self, uid: &str, opts: &PageOptions) -> Result<(), ApiError> {
        self.call_with(
            "data.page.update",
            json!({ "page": opts.update_map(Value::from(uid)) }),
        )
        .map(drop)
    }

    fn delete_page(&self, uid: &str) -> Result<(), ApiError> {
        self.call_with("data.page.delete", json!({ "page": { "uid": uid } }))
            .map(drop)
    }

    /// Replays the batch in order. Not atomic: see [`replay::replay`].
    fn execute_batch(&self, batch: &BatchBuilder) -> Result<(), ApiError> {
        replay::replay(self, batch.build())
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod local_tests;
