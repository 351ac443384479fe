//! Protocol layer for Roam graphs.
//!
//! [`CloudClient`] speaks the token-authenticated REST API and
//! [`LocalClient`] speaks the desktop app's action protocol. Both implement
//! [`RoamApi`], so commands do not care which backend they are talking to.
//! The notable differences stay behind that trait:
//!
//! * Cloud batches are atomic on the server. Local batches are replayed one
//!   action at a time; a failure stops the replay and earlier actions stay
//!   applied.
//! * The local protocol only addresses writes by parent uid, so page titles
//!   and daily notes are resolved (and created if needed) client-side.
//! * Local writes that report "Response timeout" are checked with a query
//!   before the error is surfaced.

mod append;
mod batch;
mod clock;
mod cloud;
mod error;
mod factory;
mod local;
mod location;
mod options;
mod replay;
#[cfg(test)]
mod test_server;
mod verify;

use serde_json::Value;

use crate::roamdb::{self, SUBTREE_SELECTOR};

pub use append::{count_blocks, parse_outline, AppendBlock, AppendClient, AppendLocation};
pub use batch::{parse_uid, BatchAction, BatchBuilder};
pub use clock::{CancelToken, Clock, SystemClock};
pub use cloud::CloudClient;
pub use error::{ApiError, RESPONSE_TIMEOUT_MESSAGE};
pub use factory::{connect, Client, ClientOverrides, Credentials, Mode};
pub use local::{parse_local_create_uid, FileContent, LocalClient};
pub use location::{Location, Order};
pub use options::{BlockOptions, PageOptions, SearchOptions};
pub use verify::with_timeout_verification;

/// Query result rows as returned by `:find`.
pub type Rows = Vec<Vec<Value>>;

pub trait RoamApi {
    fn graph_name(&self) -> &str;

    fn query(&self, query: &str, args: &[Value]) -> Result<Rows, ApiError>;

    fn pull(&self, eid: &Value, selector: &str) -> Result<Value, ApiError>;

    fn pull_many(&self, eids: &[Value], selector: &str) -> Result<Value, ApiError>;

    fn create_block(&self, parent_uid: &str, content: &str, order: Order) -> Result<(), ApiError> {
        self.create_block_with_options(parent_uid, &BlockOptions::with_content(content), order)
    }

    fn create_block_with_options(
        &self,
        parent_uid: &str,
        opts: &BlockOptions,
        order: Order,
    ) -> Result<(), ApiError> {
        self.create_block_at_location(&Location::parent(parent_uid).with_order(order), opts)
    }

    fn create_block_at_location(
        &self,
        location: &Location,
        opts: &BlockOptions,
    ) -> Result<(), ApiError>;

    fn update_block(&self, uid: &str, content: &str) -> Result<(), ApiError> {
        self.update_block_with_options(uid, &BlockOptions::with_content(content))
    }

    fn update_block_with_options(&self, uid: &str, opts: &BlockOptions) -> Result<(), ApiError>;

    fn move_block(&self, uid: &str, parent_uid: &str, order: Order) -> Result<(), ApiError> {
        self.move_block_to_location(uid, &Location::parent(parent_uid).with_order(order))
    }

    fn move_block_to_location(&self, uid: &str, location: &Location) -> Result<(), ApiError>;

    fn delete_block(&self, uid: &str) -> Result<(), ApiError>;

    fn create_page(&self, title: &str) -> Result<(), ApiError> {
        self.create_page_with_options(&PageOptions::titled(title))
    }

    fn create_page_with_options(&self, opts: &PageOptions) -> Result<(), ApiError>;

    fn update_page(&self, uid: &str, title: &str) -> Result<(), ApiError> {
        self.update_page_with_options(uid, &PageOptions::titled(title))
    }

    fn update_page_with_options(&self, uid: &str, opts: &PageOptions) -> Result<(), ApiError>;

    fn delete_page(&self, uid: &str) -> Result<(), ApiError>;

    /// Runs every action in `batch`. Atomic on the cloud backend; a
    /// best-effort ordered replay on the local one.
    fn execute_batch(&self, batch: &BatchBuilder) -> Result<(), ApiError>;

    /// Pulls a page and its block tree by title.
    fn get_page_by_title(&self, title: &str) -> Result<Value, ApiError> {
        let rows = self.query(&roamdb::queries::page_by_title(title), &[])?;
        let eid = first_cell(&rows)
            .ok_or_else(|| ApiError::NotFound(format!("page not found: {}", title)))?;
        self.pull(eid, SUBTREE_SELECTOR)
    }

    fn get_block_by_uid(&self, uid: &str) -> Result<Value, ApiError> {
        let rows = self.query(&roamdb::queries::block_by_uid(uid), &[])?;
        let eid = first_cell(&rows)
            .ok_or_else(|| ApiError::NotFound(format!("block not found: {}", uid)))?;
        self.pull(eid, SUBTREE_SELECTOR)
    }

    /// Blocks whose text contains `text`, as `[uid, string, page-title]`
    /// rows. A zero limit returns everything.
    fn search_blocks(&self, text: &str, limit: usize) -> Result<Rows, ApiError> {
        let rows = self.query(&roamdb::queries::search_blocks_contains(text), &[])?;
        Ok(truncate(rows, limit))
    }

    fn list_pages(&self, modified_today: bool, limit: usize) -> Result<Rows, ApiError> {
        let cutoff = modified_today.then(roamdb::daily::start_of_today_millis);
        let rows = self.query(&roamdb::queries::list_pages(cutoff), &[])?;
        Ok(truncate(rows, limit))
    }
}

fn first_cell(rows: &Rows) -> Option<&Value> {
    rows.first().and_then(|row| row.first())
}

fn truncate(mut rows: Rows, limit: usize) -> Rows {
    if limit > 0 && rows.len() > limit {
        rows.truncate(limit);
    }
    rows
}
