//! Ordered replay of a batch against the Local API, which has no batch
//! endpoint.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::debug;

use super::batch::{
    record_location, required_uid, section, tempid, BatchAction, CREATE_BLOCK, CREATE_PAGE,
    DELETE_BLOCK, DELETE_PAGE, MOVE_BLOCK, UPDATE_BLOCK, UPDATE_PAGE,
};
use super::local::LocalClient;
use super::location::uid_from_value;
use super::{ApiError, BlockOptions, Location, PageOptions, RoamApi};

/// Real uids of entities created earlier in the replay, keyed by tempid.
/// Only tempids that a later action refers to are tracked.
struct Tempids {
    referenced: HashSet<i64>,
    resolved: HashMap<i64, String>,
}

impl Tempids {
    fn referenced_by(actions: &[BatchAction]) -> Self {
        let mut referenced = HashSet::new();
        for record in actions {
            let creates = matches!(
                record.get("action").and_then(Value::as_str),
                Some(CREATE_PAGE | CREATE_BLOCK)
            );
            let targets = ["block", "page"]
                .into_iter()
                .filter(|_| !creates)
                .filter_map(|key| record.get(key).and_then(|body| body.get("uid")));
            let parent = record
                .get("location")
                .and_then(|location| location.get("parent-uid"));
            referenced.extend(
                targets
                    .chain(parent)
                    .filter_map(uid_from_value)
                    .filter_map(|uid| tempid(&uid)),
            );
        }
        Self {
            referenced,
            resolved: HashMap::new(),
        }
    }

    /// The tempid to record for a create, when a later action needs it.
    fn needed(&self, placeholder: Option<i64>) -> Option<i64> {
        placeholder.filter(|id| self.referenced.contains(id))
    }

    fn resolve(&self, uid: String, index: usize) -> Result<String, ApiError> {
        match tempid(&uid) {
            None => Ok(uid),
            Some(id) => self.resolved.get(&id).cloned().ok_or_else(|| {
                ApiError::batch_record(index, format!("tempid {} was not created earlier", id))
            }),
        }
    }

    fn resolve_location(&self, mut location: Location, index: usize) -> Result<Location, ApiError> {
        if let Some(parent) = location.parent_uid.take() {
            location.parent_uid = Some(self.resolve(parent, index)?);
        }
        Ok(location)
    }
}

/// Runs each action in order. The first failure stops the replay and is
/// returned with its action index; earlier actions stay applied.
pub(crate) fn replay(client: &LocalClient, actions: &[BatchAction]) -> Result<(), ApiError> {
    let mut tempids = Tempids::referenced_by(actions);
    for (index, action) in actions.iter().enumerate() {
        replay_one(client, action, index, &mut tempids).map_err(|err| match err {
            ApiError::BatchRecord { .. } | ApiError::Cancelled => err,
            other => ApiError::BatchAction {
                index,
                source: Box::new(other),
            },
        })?;
    }
    Ok(())
}

fn replay_one(
    client: &LocalClient,
    record: &Map<String, Value>,
    index: usize,
    tempids: &mut Tempids,
) -> Result<(), ApiError> {
    let action = record
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::batch_record(index, "missing or invalid action type"))?;
    debug!(index, action, "replaying batch action");

    match action {
        CREATE_PAGE => {
            let page = section(record, "page", index)?;
            let mut opts = PageOptions::from_map(page);
            let (explicit, placeholder) = split_uid(page);
            opts.uid = explicit;
            match tempids.needed(placeholder) {
                Some(id) => {
                    let uid = client.create_page_and_get_uid(&opts)?;
                    tempids.resolved.insert(id, uid);
                }
                None => client.create_page_with_options(&opts)?,
            }
        }
        CREATE_BLOCK => {
            let block = section(record, "block", index)?;
            let location = tempids.resolve_location(record_location(record, index)?, index)?;
            let mut opts = BlockOptions::from_map(block);
            let (explicit, placeholder) = split_uid(block);
            opts.uid = explicit;
            match tempids.needed(placeholder) {
                Some(id) => {
                    let uid = client.create_block_at_location_and_get_uid(&location, &opts)?;
                    tempids.resolved.insert(id, uid);
                }
                None => client.create_block_at_location(&location, &opts)?,
            }
        }
        UPDATE_BLOCK => {
            let block = section(record, "block", index)?;
            let uid = tempids.resolve(required_uid(block, "block", index)?, index)?;
            client.update_block_with_options(&uid, &BlockOptions::from_map(block))?;
        }
        UPDATE_PAGE => {
            let page = section(record, "page", index)?;
            let uid = tempids.resolve(required_uid(page, "page", index)?, index)?;
            client.update_page_with_options(&uid, &PageOptions::from_map(page))?;
        }
        MOVE_BLOCK => {
            let block = section(record, "block", index)?;
            let uid = tempids.resolve(required_uid(block, "block", index)?, index)?;
            let location = tempids.resolve_location(record_location(record, index)?, index)?;
            client.move_block_to_location(&uid, &location)?;
        }
        DELETE_BLOCK => {
            let block = section(record, "block", index)?;
            let uid = tempids.resolve(required_uid(block, "block", index)?, index)?;
            client.delete_block(&uid)?;
        }
        DELETE_PAGE => {
            let page = section(record, "page", index)?;
            let uid = tempids.resolve(required_uid(page, "page", index)?, index)?;
            client.delete_page(&uid)?;
        }
        other => {
            return Err(ApiError::batch_record(
                index,
                format!("unknown action type \"{}\"", other),
            ))
        }
    }
    Ok(())
}

/// Splits a create body's `uid` into an explicit uid to send and a tempid
/// to record. Tempids never reach the app.
fn split_uid(map: &Map<String, Value>) -> (Option<String>, Option<i64>) {
    match map.get("uid").and_then(uid_from_value) {
        Some(uid) => match tempid(&uid) {
            Some(id) => (None, Some(id)),
            None if uid.is_empty() => (None, None),
            None => (Some(uid), None),
        },
        None => (None, None),
    }
}
