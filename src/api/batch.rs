use std::collections::HashMap;

use serde_json::{Map, Value};

use super::location::{uid_from_value, Location};
use super::options::{BlockOptions, PageOptions};
use super::ApiError;

/// One wire-ready mutation record, e.g. `{"action": "create-page", "page": {..}}`.
pub type BatchAction = Map<String, Value>;

pub const CREATE_PAGE: &str = "create-page";
pub const CREATE_BLOCK: &str = "create-block";
pub const UPDATE_BLOCK: &str = "update-block";
pub const UPDATE_PAGE: &str = "update-page";
pub const MOVE_BLOCK: &str = "move-block";
pub const DELETE_BLOCK: &str = "delete-block";
pub const DELETE_PAGE: &str = "delete-page";

/// Accumulates mutations for one batch.
///
/// Entities created without an explicit uid get a tempid (`-1`, `-2`, ...).
/// The create methods return a handle (the explicit uid, or the tempid as a
/// decimal string) that later calls accept wherever a uid is expected, so an
/// action can point at something created earlier in the same batch.
#[derive(Debug, Clone)]
pub struct BatchBuilder {
    actions: Vec<BatchAction>,
    next_tempid: i64,
}

impl Default for BatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
            next_tempid: -1,
        }
    }

    fn allocate_tempid(&mut self) -> i64 {
        let id = self.next_tempid;
        self.next_tempid -= 1;
        id
    }

    /// Explicit uids are used verbatim and do not consume a tempid.
    fn entity_uid(&mut self, explicit: Option<&str>) -> (Value, String) {
        match explicit.filter(|uid| !uid.is_empty()) {
            Some(uid) => (Value::from(uid), uid.to_string()),
            None => {
                let id = self.allocate_tempid();
                (Value::from(id), id.to_string())
            }
        }
    }

    pub fn create_page(&mut self, opts: &PageOptions) -> String {
        let (uid, handle) = self.entity_uid(opts.uid.as_deref());
        let mut page = opts.create_map();
        page.insert("uid".to_string(), uid);
        self.push(CREATE_PAGE, [("page", Value::Object(page))]);
        handle
    }

    pub fn create_block(&mut self, location: &Location, opts: &BlockOptions) -> String {
        let (uid, handle) = self.entity_uid(opts.uid.as_deref());
        let mut block = Map::new();
        block.insert("uid".to_string(), uid);
        block.insert("string".to_string(), Value::from(opts.content.as_str()));
        opts.apply_to_map(&mut block);
        self.push(
            CREATE_BLOCK,
            [
                ("location", Value::Object(location_map(location))),
                ("block", Value::Object(block)),
            ],
        );
        handle
    }

    pub fn update_block(&mut self, uid: &str, opts: &BlockOptions) {
        let block = opts.update_map(parse_uid(uid));
        self.push(UPDATE_BLOCK, [("block", Value::Object(block))]);
    }

    pub fn update_page(&mut self, uid: &str, opts: &PageOptions) {
        let page = opts.update_map(parse_uid(uid));
        self.push(UPDATE_PAGE, [("page", Value::Object(page))]);
    }

    pub fn move_block(&mut self, uid: &str, location: &Location) {
        self.push(
            MOVE_BLOCK,
            [
                ("location", Value::Object(location_map(location))),
                ("block", uid_object(uid)),
            ],
        );
    }

    pub fn delete_block(&mut self, uid: &str) {
        self.push(DELETE_BLOCK, [("block", uid_object(uid))]);
    }

    pub fn delete_page(&mut self, uid: &str) {
        self.push(DELETE_PAGE, [("page", uid_object(uid))]);
    }

    /// The accumulated actions in execution order.
    pub fn build(&self) -> &[BatchAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    fn push<const N: usize>(&mut self, action: &str, fields: [(&str, Value); N]) {
        let mut record = Map::new();
        record.insert("action".to_string(), Value::from(action));
        for (key, value) in fields {
            record.insert(key.to_string(), value);
        }
        self.actions.push(record);
    }

    /// Builds a batch from user-authored records of the same shape the
    /// builder emits. A create record whose `uid` is a negative integer is a
    /// placeholder: it gets a fresh tempid, and later records naming the same
    /// placeholder are pointed at it.
    pub fn from_records(records: &[Value]) -> Result<Self, ApiError> {
        let mut builder = Self::new();
        let mut aliases: HashMap<String, String> = HashMap::new();

        for (index, record) in records.iter().enumerate() {
            let record = record
                .as_object()
                .ok_or_else(|| ApiError::batch_record(index, "record must be an object"))?;
            let action = record
                .get("action")
                .and_then(Value::as_str)
                .ok_or_else(|| ApiError::batch_record(index, "missing or invalid action type"))?;
            let resolve = |uid: String| aliases.get(&uid).cloned().unwrap_or(uid);

            match action {
                CREATE_PAGE => {
                    let page = section(record, "page", index)?;
                    let mut opts = PageOptions::from_map(page);
                    if opts.title.is_empty() {
                        return Err(ApiError::batch_record(index, "title required in page"));
                    }
                    let placeholder = placeholder_uid(page);
                    opts.uid = explicit_uid(page);
                    let handle = builder.create_page(&opts);
                    if let Some(placeholder) = placeholder {
                        aliases.insert(placeholder, handle);
                    }
                }
                CREATE_BLOCK => {
                    let block = section(record, "block", index)?;
                    let mut location = record_location(record, index)?;
                    location.parent_uid = location.parent_uid.map(resolve);
                    let mut opts = BlockOptions::from_map(block);
                    let placeholder = placeholder_uid(block);
                    opts.uid = explicit_uid(block);
                    let handle = builder.create_block(&location, &opts);
                    if let Some(placeholder) = placeholder {
                        aliases.insert(placeholder, handle);
                    }
                }
                UPDATE_BLOCK => {
                    let block = section(record, "block", index)?;
                    let uid = resolve(required_uid(block, "block", index)?);
                    builder.update_block(&uid, &BlockOptions::from_map(block));
                }
                UPDATE_PAGE => {
                    let page = section(record, "page", index)?;
                    let uid = resolve(required_uid(page, "page", index)?);
                    builder.update_page(&uid, &PageOptions::from_map(page));
                }
                MOVE_BLOCK => {
                    let block = section(record, "block", index)?;
                    let uid = resolve(required_uid(block, "block", index)?);
                    let mut location = record_location(record, index)?;
                    location.parent_uid = location.parent_uid.map(resolve);
                    builder.move_block(&uid, &location);
                }
                DELETE_BLOCK => {
                    let block = section(record, "block", index)?;
                    let uid = resolve(required_uid(block, "block", index)?);
                    builder.delete_block(&uid);
                }
                DELETE_PAGE => {
                    let page = section(record, "page", index)?;
                    let uid = resolve(required_uid(page, "page", index)?);
                    builder.delete_page(&uid);
                }
                other => {
                    return Err(ApiError::batch_record(
                        index,
                        format!("unknown action type \"{}\"", other),
                    ))
                }
            }
        }

        Ok(builder)
    }
}

/// A negative-integer string is a tempid reference and goes on the wire as
/// an integer; anything else stays a string.
pub fn parse_uid(uid: &str) -> Value {
    match tempid(uid) {
        Some(id) => Value::from(id),
        None => Value::from(uid),
    }
}

pub(crate) fn tempid(uid: &str) -> Option<i64> {
    uid.parse::<i64>().ok().filter(|id| *id < 0)
}

fn location_map(location: &Location) -> Map<String, Value> {
    location.to_map_with(parse_uid)
}

fn uid_object(uid: &str) -> Value {
    let mut map = Map::new();
    map.insert("uid".to_string(), parse_uid(uid));
    Value::Object(map)
}

pub(crate) fn section<'a>(
    record: &'a Map<String, Value>,
    key: &str,
    index: usize,
) -> Result<&'a Map<String, Value>, ApiError> {
    record
        .get(key)
        .and_then(Value::as_object)
        .ok_or_else(|| ApiError::batch_record(index, format!("invalid {} data", key)))
}

pub(crate) fn record_location(
    record: &Map<String, Value>,
    index: usize,
) -> Result<Location, ApiError> {
    let location = section(record, "location", index)?;
    Location::from_map(location).map_err(|message| ApiError::batch_record(index, message))
}

pub(crate) fn required_uid(
    map: &Map<String, Value>,
    kind: &str,
    index: usize,
) -> Result<String, ApiError> {
    map.get("uid")
        .and_then(uid_from_value)
        .filter(|uid| !uid.is_empty())
        .ok_or_else(|| ApiError::batch_record(index, format!("missing {} uid", kind)))
}

fn placeholder_uid(map: &Map<String, Value>) -> Option<String> {
    map.get("uid")
        .and_then(uid_from_value)
        .filter(|uid| tempid(uid).is_some())
}

fn explicit_uid(map: &Map<String, Value>) -> Option<String> {
    map.get("uid")
        .and_then(uid_from_value)
        .filter(|uid| !uid.is_empty() && tempid(uid).is_none())
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod batch_tests;
