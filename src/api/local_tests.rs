use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use super::{parse_local_create_uid, parse_local_file_result, LocalClient};
use crate::api::clock::RecordingClock;
use crate::api::test_server::{temp_port_file, StubResponse, StubServer};
use crate::api::{ApiError, BlockOptions, Location, Order, PageOptions, RoamApi, SearchOptions};

fn ok(result: serde_json::Value) -> StubResponse {
    StubResponse::json(200, json!({"success": true, "result": result}))
}

fn fail(message: &str) -> StubResponse {
    StubResponse::json(200, json!({"success": false, "error": message}))
}

fn client_for(server: &StubServer) -> (LocalClient, Arc<RecordingClock>) {
    let clock = Arc::new(RecordingClock::default());
    let client = LocalClient::new("vault")
        .with_host("127.0.0.1")
        .with_port_file(temp_port_file(&format!("{}\n", server.port())))
        .with_clock(clock.clone());
    (client, clock)
}

#[test]
fn query_posts_action_envelope_to_discovered_port() {
    let server = StubServer::start(vec![ok(json!([["Inbox"]]))]);
    let (client, _) = client_for(&server);

    let rows = client
        .query("[:find ?t :in $ ?x]", &[json!("x")])
        .expect("query should succeed");
    assert_eq!(rows, vec![vec![json!("Inbox")]]);

    let requests = server.requests();
    assert_eq!(requests[0].path, "/api/vault");
    assert_eq!(requests[0].header("Content-Type"), Some("application/json"));
    assert_eq!(
        requests[0].json(),
        json!({"action": "data.q", "args": ["[:find ?t :in $ ?x]", "x"]})
    );
}

#[test]
fn null_query_result_is_empty() {
    let server = StubServer::start(vec![StubResponse::json(200, json!({"success": true}))]);
    let (client, _) = client_for(&server);
    assert!(client.query("q", &[]).expect("query should succeed").is_empty());
}

#[test]
fn missing_port_file_means_desktop_not_running() {
    let path = std::env::temp_dir()
        .join(format!("roam-missing-{}", Uuid::now_v7()))
        .join(".roam-api-port");
    let client = LocalClient::new("vault").with_port_file(&path);
    let err = client.query("q", &[]).expect_err("missing port file should fail");
    assert!(matches!(err, ApiError::DesktopNotRunning(_)));
    let message = err.to_string();
    assert!(message.starts_with("Roam desktop app not running: port file"));
    assert!(message.contains("Encrypted local API"));
}

#[test]
fn garbage_port_file_is_reported() {
    let path = temp_port_file("not-a-port\n");
    let client = LocalClient::new("vault").with_port_file(&path);
    let err = client.query("q", &[]).expect_err("bad port should fail");
    assert_eq!(
        err.to_string(),
        format!("invalid port in {}: \"not-a-port\"", path.display())
    );
}

#[test]
fn envelope_failures_map_to_errors() {
    let server = StubServer::start(vec![
        fail("Block not found"),
        StubResponse::text(502, "gateway down"),
        StubResponse::text(200, "<html>"),
        StubResponse::json(500, json!({"success": true})),
        StubResponse::json(500, json!({"success": true, "error": "exploded"})),
    ]);
    let (client, _) = client_for(&server);

    let err = client.delete_block("b1").expect_err("failure should surface");
    assert!(matches!(&err, ApiError::LocalApi(message) if message == "Block not found"));

    let err = client.delete_block("b1").expect_err("non-JSON error status");
    assert!(matches!(err, ApiError::Status { status: 502, .. }));

    let err = client.delete_block("b1").expect_err("non-JSON success status");
    assert!(matches!(err, ApiError::Decode { .. }));

    let err = client.delete_block("b1").expect_err("bare error status");
    assert!(matches!(&err, ApiError::LocalApi(_)), "{err:?}");
    assert_eq!(err.to_string(), "local API error (status 500)");

    let err = client.delete_block("b1").expect_err("error status with message");
    assert!(matches!(err, ApiError::LocalApi(_)));
}

#[test]
fn page_title_location_is_resolved_to_parent_uid() {
    let server = StubServer::start(vec![
        ok(json!([["page-uid"]])),
        ok(json!({"uid": "new-block"})),
    ]);
    let (client, _) = client_for(&server);

    let uid = client
        .create_block_at_location_and_get_uid(
            &Location::page("Inbox").with_order(Order::First),
            &BlockOptions::with_content("hello"),
        )
        .expect("create should succeed");
    assert_eq!(uid, "new-block");

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].json()["action"], json!("data.q"));
    let create = requests[1].json();
    assert_eq!(create["action"], json!("data.block.create"));
    assert_eq!(
        create["args"][0]["location"],
        json!({"parent-uid": "page-uid", "order": "first"})
    );
    assert_eq!(create["args"][0]["block"]["string"], json!("hello"));
}

#[test]
fn created_block_uid_falls_back_to_the_sent_uid() {
    let server = StubServer::start(vec![ok(json!(null)), ok(json!(null))]);
    let (client, _) = client_for(&server);

    let uid = client
        .create_block_and_get_uid("p1", "quiet app", Order::Last)
        .expect("null result should not fail");
    let sent = server.requests()[0].json()["args"][0]["block"]["uid"].clone();
    assert_eq!(sent, json!(uid));
    assert_eq!(uid.len(), 9);

    let opts = BlockOptions {
        uid: Some("chosen".to_string()),
        ..BlockOptions::with_content("x")
    };
    let uid = client
        .create_block_at_location_and_get_uid(&Location::parent("p1"), &opts)
        .expect("explicit uid create");
    assert_eq!(uid, "chosen");
}

#[test]
fn missing_daily_note_page_is_created_first() {
    let server = StubServer::start(vec![
        ok(json!([])),
        ok(json!(null)),
        ok(json!([["dn-uid"]])),
        ok(json!("b9")),
    ]);
    let (client, _) = client_for(&server);

    client
        .create_block_at_location(
            &Location::daily_note("01-15-2025"),
            &BlockOptions::with_content("note"),
        )
        .expect("create should succeed");

    let requests = server.requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(
        requests[1].json(),
        json!({"action": "data.page.create", "args": [{"page": {"title": "January 15th, 2025"}}]})
    );
    assert_eq!(
        requests[3].json()["args"][0]["location"]["parent-uid"],
        json!("dn-uid")
    );
}

#[test]
fn create_page_falls_back_to_title_lookup() {
    let server = StubServer::start(vec![ok(json!(null)), ok(json!([["p-42"]]))]);
    let (client, _) = client_for(&server);
    let uid = client
        .create_page_and_get_uid(&PageOptions::titled("Fresh"))
        .expect("create should succeed");
    assert_eq!(uid, "p-42");
}

#[test]
fn timed_out_create_is_confirmed_by_query() {
    let server = StubServer::start(vec![fail("Response timeout"), ok(json!([[4021]]))]);
    let (client, clock) = client_for(&server);

    let uid = client
        .create_block_and_get_uid("parent", "slow write", Order::Last)
        .expect("verified create should succeed");
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(500)]);
    let requests = server.requests();
    assert_eq!(requests[0].json()["args"][0]["block"]["uid"], json!(uid));
    let verify = requests[1].json();
    assert_eq!(verify["action"], json!("data.q"));
    let query = verify["args"][0].as_str().expect("query string");
    assert!(query.contains(r#"[?parent :block/uid "parent"]"#), "{query}");
    assert!(query.contains(&format!(r#"[?b :block/uid "{uid}"]"#)), "{query}");
}

#[test]
fn timed_out_create_without_uid_checks_only_the_target_parent() {
    let server = StubServer::start(vec![fail("Response timeout"), ok(json!([["sibling"]]))]);
    let (client, _) = client_for(&server);

    client
        .create_block_at_location(&Location::parent("p1"), &BlockOptions::with_content("TODO"))
        .expect("a matching child confirms the write");
    let query = server.requests()[1].json()["args"][0]
        .as_str()
        .expect("query string")
        .to_string();
    assert!(
        query.contains(r#"[?p :block/uid "p1"] [?p :block/children ?b] [?b :block/string "TODO"]"#),
        "{query}"
    );
}

#[test]
fn timed_out_create_with_no_matching_child_fails() {
    let server = StubServer::start(vec![fail("Response timeout"), ok(json!([]))]);
    let (client, _) = client_for(&server);
    let err = client
        .create_block_at_location(&Location::parent("p1"), &BlockOptions::with_content("TODO"))
        .expect_err("a same-text block elsewhere must not confirm the write");
    assert!(err.is_response_timeout());
}

#[test]
fn timed_out_update_is_confirmed_by_content() {
    let server = StubServer::start(vec![fail("Response timeout"), ok(json!([[77]]))]);
    let (client, clock) = client_for(&server);

    client
        .update_block_with_options("b1", &BlockOptions::with_content("edited"))
        .expect("verified update should succeed");
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(500)]);
    let query = server.requests()[1].json()["args"][0]
        .as_str()
        .expect("query string")
        .to_string();
    assert!(
        query.contains(r#"[?b :block/uid "b1"] [?b :block/string "edited"]"#),
        "{query}"
    );
}

#[test]
fn timed_out_update_without_content_stays_an_error() {
    let server = StubServer::start(vec![fail("Response timeout")]);
    let (client, _) = client_for(&server);
    let opts = BlockOptions {
        heading: Some(2),
        ..BlockOptions::default()
    };
    let err = client
        .update_block_with_options("b1", &opts)
        .expect_err("nothing to verify");
    assert!(err.is_response_timeout());
    assert_eq!(server.requests().len(), 1, "no verification query is sent");
}

#[test]
fn timed_out_page_create_is_confirmed_by_title() {
    let server = StubServer::start(vec![fail("Response timeout"), ok(json!([["p-late"]]))]);
    let (client, _) = client_for(&server);

    let uid = client
        .create_page_and_get_uid(&PageOptions::titled("Slow Page"))
        .expect("verified page create should succeed");
    assert_eq!(uid, "p-late");
    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].json()["args"][0]
        .as_str()
        .expect("query string")
        .contains(r#"[?p :node/title "Slow Page"]"#));
}

#[test]
fn timed_out_move_without_confirmation_fails() {
    let server = StubServer::start(vec![fail("Response timeout"), ok(json!([]))]);
    let (client, _) = client_for(&server);
    let err = client
        .move_block("b1", "p1", Order::Last)
        .expect_err("unconfirmed move should fail");
    assert!(err.is_response_timeout());
}

#[test]
fn pull_many_falls_back_to_single_pulls() {
    let server = StubServer::start(vec![
        fail("Unknown action"),
        ok(json!({":block/uid": "a"})),
        ok(json!({":block/uid": "b"})),
    ]);
    let (client, _) = client_for(&server);

    let pulled = client
        .pull_many(&[json!(1), json!(2)], "[:block/uid]")
        .expect("fallback should succeed");
    assert_eq!(pulled, json!([{":block/uid": "a"}, {":block/uid": "b"}]));

    let requests = server.requests();
    assert_eq!(
        requests[0].json(),
        json!({"action": "data.pull-many", "args": ["[:block/uid]", [1, 2]]})
    );
    assert_eq!(
        requests[2].json(),
        json!({"action": "data.pull", "args": ["[:block/uid]", 2]})
    );
}

#[test]
fn reorder_falls_back_to_legacy_action_and_keeps_first_error() {
    let server = StubServer::start(vec![
        fail("Unknown action"),
        ok(json!(null)),
        fail("first failure"),
        fail("second failure"),
    ]);
    let (client, _) = client_for(&server);
    let uids = vec!["b2".to_string(), "b1".to_string()];

    client
        .reorder_blocks("p1", &uids)
        .expect("legacy reorder should succeed");
    let err = client
        .reorder_blocks("p1", &uids)
        .expect_err("both actions failing should fail");
    assert_eq!(err.to_string(), "first failure");

    let requests = server.requests();
    assert_eq!(requests[0].json()["action"], json!("data.block.reorderBlocks"));
    assert_eq!(
        requests[1].json(),
        json!({
            "action": "data.block.reorder",
            "args": [{"parent-uid": "p1", "block-uids": ["b2", "b1"]}]
        })
    );
}

#[test]
fn desktop_only_actions_send_expected_args() {
    let server = StubServer::start(vec![
        ok(json!(null)),
        ok(json!(null)),
        ok(json!(null)),
        ok(json!(null)),
        ok(json!(null)),
        ok(json!({"url": "https://files/x.png"})),
        ok(json!([])),
    ]);
    let (client, _) = client_for(&server);

    client.undo().expect("undo");
    client.add_page_shortcut("p1", Some(2)).expect("shortcut");
    client.remove_page_shortcut("p1").expect("unshortcut");
    client.upsert_user("u1", Some("Ada")).expect("upsert");
    client.delete_file("https://files/old.png").expect("delete file");
    let url = client.upload_file("x.png", b"png").expect("upload");
    assert_eq!(url, "https://files/x.png");
    client
        .search(
            "needle",
            &SearchOptions {
                limit: Some(3),
                ..SearchOptions::default()
            },
        )
        .expect("search");

    let bodies = server
        .requests()
        .iter()
        .map(|request| request.json())
        .collect::<Vec<_>>();
    assert_eq!(bodies[0], json!({"action": "data.undo", "args": []}));
    assert_eq!(bodies[1], json!({"action": "data.page.addShortcut", "args": ["p1", 2]}));
    assert_eq!(bodies[2], json!({"action": "data.page.removeShortcut", "args": ["p1"]}));
    assert_eq!(
        bodies[3],
        json!({"action": "data.user.upsert", "args": [{"user-uid": "u1", "display-name": "Ada"}]})
    );
    assert_eq!(
        bodies[4],
        json!({"action": "file.delete", "args": [{"url": "https://files/old.png"}]})
    );
    assert_eq!(
        bodies[5],
        json!({"action": "file.upload", "args": [{"filename": "x.png", "data": "cG5n"}]})
    );
    assert_eq!(bodies[6]["action"], json!("data.search"));
    assert_eq!(bodies[6]["args"][0]["search-str"], json!("needle"));
    assert_eq!(bodies[6]["args"][0]["limit"], json!(3));
}

#[test]
fn download_falls_back_to_legacy_action() {
    let server = StubServer::start(vec![fail("Unknown action"), ok(json!("aGVsbG8="))]);
    let (client, _) = client_for(&server);
    let bytes = client
        .download_file("https://files/a.txt")
        .expect("fallback download should succeed");
    assert_eq!(bytes, b"hello");
    assert_eq!(server.requests()[1].json()["action"], json!("file.download"));
}

#[test]
fn file_results_accept_every_known_shape() {
    let bare = parse_local_file_result(&json!("aGk=")).expect("bare string");
    assert_eq!(bare.data, b"hi");
    assert_eq!(bare.name, None);

    let flat = parse_local_file_result(&json!({
        "base64": "aGk=",
        "filename": "hi.txt",
        "mime": "text/plain"
    }))
    .expect("flat map");
    assert_eq!(flat.name.as_deref(), Some("hi.txt"));
    assert_eq!(flat.mime.as_deref(), Some("text/plain"));

    let nested = parse_local_file_result(&json!({
        "file": {"content": "aGk=", "name": "n.txt", "type": "text/plain"}
    }))
    .expect("nested map");
    assert_eq!(nested.data, b"hi");
    assert_eq!(nested.name.as_deref(), Some("n.txt"));

    assert!(parse_local_file_result(&json!({"name": "empty"})).is_err());
    assert!(parse_local_file_result(&json!(7)).is_err());
    assert!(parse_local_file_result(&json!("%%%")).is_err());
}

#[test]
fn create_uid_is_found_in_any_result_shape() {
    assert_eq!(parse_local_create_uid(&json!("abc")), Some("abc".to_string()));
    assert_eq!(parse_local_create_uid(&json!({"uid": "u1"})), Some("u1".to_string()));
    assert_eq!(
        parse_local_create_uid(&json!({"block/uid": "u2"})),
        Some("u2".to_string())
    );
    assert_eq!(
        parse_local_create_uid(&json!({"block": {"uid": "u3"}})),
        Some("u3".to_string())
    );
    assert_eq!(
        parse_local_create_uid(&json!({"block": {"block/uid": "u4"}})),
        Some("u4".to_string())
    );
    assert_eq!(parse_local_create_uid(&json!({"uid": ""})), None);
    assert_eq!(parse_local_create_uid(&json!(null)), None);
}
