use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::ApiError;

pub const DEFAULT_APPEND_BASE_URL: &str = "https://append-api.roamresearch.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A block to append, with its nested children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppendBlock {
    pub string: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AppendBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<bool>,
    #[serde(rename = "text-align", skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
    #[serde(
        rename = "children-view-type",
        skip_serializing_if = "Option::is_none"
    )]
    pub children_view_type: Option<String>,
}

impl AppendBlock {
    pub fn text(string: impl Into<String>) -> Self {
        Self {
            string: string.into(),
            ..Self::default()
        }
    }

    /// This block plus all descendants.
    pub fn count(&self) -> usize {
        1 + count_blocks(&self.children)
    }
}

pub fn count_blocks(blocks: &[AppendBlock]) -> usize {
    blocks.iter().map(AppendBlock::count).sum()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AppendTarget {
    Page(String),
    /// `MM-DD-YYYY`
    DailyNote(String),
    Block(String),
}

/// Where appended blocks land. `nest_under` groups them beneath a block
/// with that text on the target, created if missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendLocation {
    target: AppendTarget,
    nest_under: Option<String>,
}

impl AppendLocation {
    pub fn page(title: impl Into<String>) -> Self {
        Self::at(AppendTarget::Page(title.into()))
    }

    pub fn daily_note(date: impl Into<String>) -> Self {
        Self::at(AppendTarget::DailyNote(date.into()))
    }

    pub fn block(uid: impl Into<String>) -> Self {
        Self::at(AppendTarget::Block(uid.into()))
    }

    fn at(target: AppendTarget) -> Self {
        Self {
            target,
            nest_under: None,
        }
    }

    pub fn nest_under(mut self, string: impl Into<String>) -> Self {
        self.nest_under = Some(string.into()).filter(|string| !string.is_empty());
        self
    }

    pub fn describe(&self) -> String {
        match &self.target {
            AppendTarget::Page(title) => title.clone(),
            AppendTarget::DailyNote(date) => format!("daily note {}", date),
            AppendTarget::Block(uid) => format!("block {}", uid),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        match &self.target {
            AppendTarget::Page(title) => {
                map.insert("page".to_string(), json!({ "title": title }));
            }
            AppendTarget::DailyNote(date) => {
                map.insert(
                    "page".to_string(),
                    json!({ "title": { "daily-note-page": date } }),
                );
            }
            AppendTarget::Block(uid) => {
                map.insert("block".to_string(), json!({ "uid": uid }));
            }
        }
        if let Some(string) = &self.nest_under {
            map.insert("nest-under".to_string(), json!({ "string": string }));
        }
        Value::Object(map)
    }
}

/// Client for the append-only API, which accepts writes for encrypted
/// graphs without the desktop app. There is no retry; rate limits surface
/// to the caller.
pub struct AppendClient {
    base_url: String,
    token: String,
    graph_name: String,
    agent: ureq::Agent,
}

impl AppendClient {
    pub fn new(graph_name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_APPEND_BASE_URL.to_string(),
            token: token.into(),
            graph_name: graph_name.into(),
            agent: build_agent(DEFAULT_TIMEOUT),
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

    pub fn graph_name(&self) -> &str {
        &self.graph_name
    }

    pub fn append(&self, location: &AppendLocation, blocks: &[AppendBlock]) -> Result<(), ApiError> {
        let url = format!(
            "{}/api/graph/{}/append-blocks",
            self.base_url, self.graph_name
        );
        let body = json!({ "location": location.to_value(), "append-data": blocks });
        debug!(%url, blocks = count_blocks(blocks), "append request");

        let sent = self
            .agent
            .post(&url)
            .set("Content-Type", "application/json")
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("x-authorization", &format!("Bearer {}", self.token))
            .send_string(&body.to_string());
        let response = match sent {
            Ok(response) | Err(ureq::Error::Status(_, response)) => response,
            Err(err) => return Err(ApiError::transport("failed to send request", err)),
        };
        let status = response.status();
        let text = response.into_string()?;
        match status {
            200 => Ok(()),
            401 => Err(ApiError::Authentication("invalid API token".to_string())),
            429 => Err(ApiError::RateLimit(format!("rate limit exceeded: {}", text))),
            _ => Err(ApiError::Protocol(format!(
                "append API error (status {}): {}",
                status, text
            ))),
        }
    }

    pub fn append_to_page(&self, title: &str, blocks: &[AppendBlock]) -> Result<(), ApiError> {
        self.append(&AppendLocation::page(title), blocks)
    }

    pub fn append_to_daily_note(&self, date: &str, blocks: &[AppendBlock]) -> Result<(), ApiError> {
        self.append(&AppendLocation::daily_note(date), blocks)
    }

    pub fn append_to_block(&self, uid: &str, blocks: &[AppendBlock]) -> Result<(), ApiError> {
        self.append(&AppendLocation::block(uid), blocks)
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

/// Parses an indented outline into a block tree. Two spaces or one tab is
/// one level; blank lines are skipped. A line nests under the closest
/// earlier line that is indented less.
pub fn parse_outline(text: &str) -> Vec<AppendBlock> {
    let mut roots = Vec::new();
    let mut open: Vec<(usize, AppendBlock)> = Vec::new();

    for line in text.lines() {
        let content = line.trim();
        if content.is_empty() {
            continue;
        }
        let level = indent_width(line) / 2;
        close_until(&mut open, &mut roots, level);
        open.push((level, AppendBlock::text(content)));
    }
    close_until(&mut open, &mut roots, 0);
    roots
}

/// Pops every open block at `level` or deeper into its parent.
fn close_until(open: &mut Vec<(usize, AppendBlock)>, roots: &mut Vec<AppendBlock>, level: usize) {
    while open.last().is_some_and(|(depth, _)| *depth >= level) {
        let Some((_, block)) = open.pop() else {
            break;
        };
        match open.last_mut() {
            Some((_, parent)) => parent.children.push(block),
            None => roots.push(block),
        }
    }
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .map_while(|ch| match ch {
            ' ' => Some(1),
            '\t' => Some(2),
            _ => None,
        })
        .sum()
}
