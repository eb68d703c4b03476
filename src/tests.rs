//! End-to-end tests driving the composables against a loopback HTTP server.

use crate::{
    use_async_data, use_fetch, use_pagination, AsyncDataOptions, FetchError, FetchOptions,
    FetchPreset, FetchStatus, PaginationOptions, PaginationPreset, QueryMap, Signal,
};
use serde_json::{json, Value};
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tiny_http::{Header, Request, Response, Server};

// Test fixture: a loopback server with the routes the composables exercise.
fn spawn_server() -> String {
    let server = Server::http("127.0.0.1:0").expect("bind loopback server");
    let addr = server.server_addr().to_ip().expect("ip listener");
    let base = format!("http://{addr}");
    thread::spawn(move || {
        for request in server.incoming_requests() {
            handle(request);
        }
    });
    base
}

fn handle(mut request: Request) {
    let url = request.url().to_owned();
    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path.to_owned(), query.to_owned()),
        None => (url, String::new()),
    };

    match path.as_str() {
        "/ok" => {
            let _ = request.respond(Response::from_string("ok"));
        }
        "/params" => {
            let _ = request.respond(json_response(query_object(&query)));
        }
        "/post" => {
            let content_type = header_value(&request, "content-type").unwrap_or_default();
            let mut body = String::new();
            let _ = request.as_reader().read_to_string(&mut body);
            let response = if content_type.contains("application/json") {
                json_response(serde_json::from_str(&body).unwrap_or(Value::Null))
            } else {
                Response::from_string(body)
            };
            let _ = request.respond(response);
        }
        "/getByPage" => {
            let current: usize = query_get(&query, "current")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            let page_size: usize = query_get(&query, "pageSize")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10);

            let total = 100usize;
            let start = (current - 1) * page_size;
            let end = (start + page_size).min(total);
            let data: Vec<Value> = (start..end)
                .map(|i| json!({"id": i + 1, "name": format!("data-{}", i + 1)}))
                .collect();

            let _ = request.respond(json_response(json!({
                "total": total,
                "pageSize": page_size,
                "current": current,
                "data": data,
            })));
        }
        _ => {
            let _ = request.respond(Response::from_string("not found").with_status_code(404));
        }
    }
}

fn json_response(value: Value) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(value.to_string()).with_header(
        Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).expect("header"),
    )
}

fn header_value(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str().to_owned())
}

fn query_get(query: &str, key: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then(|| v.to_owned())
    })
}

fn query_object(query: &str) -> Value {
    let mut map = serde_json::Map::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        if let Some((k, v)) = pair.split_once('=') {
            map.insert(k.to_owned(), Value::String(v.to_owned()));
        }
    }
    Value::Object(map)
}

fn wait_until(condition: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn counting_options(times: &Arc<AtomicUsize>) -> FetchOptions {
    let times = times.clone();
    FetchOptions::default().on_request(move |_| {
        times.fetch_add(1, Ordering::Relaxed);
        Ok(())
    })
}

#[test]
fn basic_fetch_resolves_text_payload() {
    let base = spawn_server();
    let state = use_fetch(format!("{base}/ok"), FetchOptions::default());

    assert!(wait_until(
        || state.data.get() == Some(json!("ok")) && !state.pending.get(),
        Duration::from_secs(3)
    ));
    assert_eq!(state.status.get(), FetchStatus::Success);
}

#[test]
fn query_parameters_reach_the_server() {
    let base = spawn_server();
    let state = use_fetch(
        format!("{base}/params"),
        FetchOptions::default()
            .immediate(false)
            .query(QueryMap::from([("one".to_owned(), json!("1"))])),
    );

    state.execute().wait().unwrap();
    assert_eq!(state.data.get(), Some(json!({"one": "1"})));
}

#[test]
fn base_url_joins_relative_targets() {
    let base = spawn_server();
    let state = use_fetch(
        "ok",
        FetchOptions::default().immediate(false).base_url(base),
    );

    state.execute().wait().unwrap();
    assert_eq!(state.data.get(), Some(json!("ok")));
}

#[test]
fn post_body_roundtrips_as_json() {
    let base = spawn_server();
    let state = use_fetch(
        format!("{base}/post"),
        FetchOptions::default()
            .immediate(false)
            .method(crate::Method::Post)
            .body(json!({"one": 1})),
    );

    state.execute().wait().unwrap();
    assert_eq!(state.data.get(), Some(json!({"one": 1})));
}

#[test]
fn form_content_type_sends_urlencoded_body() {
    let base = spawn_server();
    let state = use_fetch(
        format!("{base}/post"),
        FetchOptions::default()
            .immediate(false)
            .method(crate::Method::Post)
            .headers(crate::HeaderMap::from([(
                "content-type".to_owned(),
                "application/x-www-form-urlencoded".to_owned(),
            )]))
            .body(json!({"one": "1"})),
    );

    state.execute().wait().unwrap();
    assert_eq!(state.data.get(), Some(json!("one=1")));
}

#[test]
fn reactive_target_refetches_on_change() {
    let base = spawn_server();
    let target = Signal::new(format!("{base}/ok"));
    let state = use_fetch(target.clone(), FetchOptions::default());

    assert!(wait_until(
        || state.data.get() == Some(json!("ok")),
        Duration::from_secs(3)
    ));

    target.set(format!("{base}/params?a=1"));
    assert!(wait_until(
        || state.data.get() == Some(json!({"a": "1"})),
        Duration::from_secs(3)
    ));
}

#[test]
fn watch_sources_trigger_execution() {
    let base = spawn_server();
    let source = Signal::new(false);
    let times = Arc::new(AtomicUsize::new(0));
    let _state = use_fetch(
        format!("{base}/ok"),
        counting_options(&times)
            .immediate(false)
            .watch(vec![source.source()]),
    );

    thread::sleep(Duration::from_millis(50));
    assert_eq!(times.load(Ordering::Relaxed), 0);

    source.set(true);
    assert!(wait_until(
        || times.load(Ordering::Relaxed) == 1,
        Duration::from_secs(3)
    ));
}

#[test]
fn ready_gate_blocks_until_true() {
    let base = spawn_server();
    let ready = Signal::new(false);
    let state = use_fetch(
        format!("{base}/ok"),
        FetchOptions::default()
            .immediate(false)
            .ready(ready.clone()),
    );

    state.execute().wait().unwrap();
    assert_eq!(state.data.get(), None);
    assert_eq!(state.status.get(), FetchStatus::Idle);

    ready.set(true);
    state.execute().wait().unwrap();
    assert_eq!(state.data.get(), Some(json!("ok")));
}

#[test]
fn polling_stops_at_scope_teardown() {
    let base = spawn_server();
    let times = Arc::new(AtomicUsize::new(0));
    let state = use_fetch(
        format!("{base}/ok"),
        counting_options(&times).polling_interval(Duration::from_millis(50)),
    );

    assert!(wait_until(
        || times.load(Ordering::Relaxed) == 1,
        Duration::from_secs(3)
    ));
    thread::sleep(Duration::from_millis(80));
    assert_eq!(times.load(Ordering::Relaxed), 2);

    state.scope().dispose();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(times.load(Ordering::Relaxed), 2);
}

#[test]
fn debounce_coalesces_rapid_executes() {
    let base = spawn_server();
    let times = Arc::new(AtomicUsize::new(0));
    let state = use_fetch(
        format!("{base}/ok"),
        counting_options(&times)
            .immediate(false)
            .debounce_interval(Duration::from_millis(50)),
    );

    state.execute().wait().unwrap();
    assert_eq!(times.load(Ordering::Relaxed), 1);

    state.execute();
    state.execute();
    state.execute();

    thread::sleep(Duration::from_millis(100));
    state.execute().wait().unwrap();
    assert_eq!(times.load(Ordering::Relaxed), 3);
}

#[test]
fn throttle_drops_calls_inside_the_window() {
    let base = spawn_server();
    let times = Arc::new(AtomicUsize::new(0));
    let state = use_fetch(
        format!("{base}/ok"),
        counting_options(&times)
            .immediate(false)
            .throttle_interval(Duration::from_millis(100)),
    );

    state.execute().wait().unwrap();
    assert_eq!(times.load(Ordering::Relaxed), 1);

    state.execute();
    state.execute();
    state.execute();

    thread::sleep(Duration::from_millis(150));
    state.execute().wait().unwrap();
    assert_eq!(times.load(Ordering::Relaxed), 2);
}

#[test]
fn not_found_rejects_and_stores_error() {
    let base = spawn_server();
    let state = use_fetch(
        format!("{base}/missing"),
        FetchOptions::default().immediate(false),
    );

    let outcome = state.execute().wait();
    assert!(outcome.is_err());
    assert_eq!(state.status.get(), FetchStatus::Error);

    let error = state.error.get().expect("error stored");
    assert!(
        error.to_string().contains("404"),
        "expected 404 in {error}"
    );
    assert_eq!(error.status(), Some(404));
}

#[test]
fn caught_error_equals_stored_error() {
    let base = spawn_server();
    let state = use_fetch(
        format!("{base}/missing"),
        FetchOptions::default().immediate(false),
    );

    match state.execute().wait() {
        Err(caught) => assert_eq!(state.error.get(), Some(caught)),
        Ok(()) => panic!("expected a rejection"),
    }
}

#[test]
fn ignored_response_errors_resolve_with_the_body() {
    let base = spawn_server();
    let state = use_fetch(
        format!("{base}/missing"),
        FetchOptions::default()
            .immediate(false)
            .ignore_response_error(true),
    );

    state.execute().wait().unwrap();
    assert_eq!(state.status.get(), FetchStatus::Success);
    assert_eq!(state.data.get(), Some(json!("not found")));
}

#[test]
fn preset_create_chains_defaults() {
    let base = spawn_server();
    let api = FetchPreset::default()
        .create(FetchOptions::default().base_url(base))
        .create(FetchOptions::default().immediate(false));

    let state = api.fetch("ok", FetchOptions::default());
    state.execute().wait().unwrap();
    assert_eq!(state.data.get(), Some(json!("ok")));
}

#[test]
fn preset_hooks_customize_every_call_site() {
    let base = spawn_server();
    let api = FetchPreset::default().create(
        FetchOptions::default()
            .immediate(false)
            .on_request(|ctx| {
                ctx.query.insert("one".to_owned(), json!("1"));
                Ok(())
            }),
    );

    let state = api.fetch(format!("{base}/params"), FetchOptions::default());
    state.execute().wait().unwrap();
    assert_eq!(state.data.get(), Some(json!({"one": "1"})));
}

#[test]
fn async_data_wraps_arbitrary_producers() {
    let base = spawn_server();
    let client = FetchPreset::default().client();
    let url = format!("{base}/ok");

    let state = use_async_data(
        move || {
            let request = crate::HttpRequest {
                method: crate::Method::Get,
                url: url.clone(),
                headers: crate::HeaderMap::new(),
                body: None,
                timeout: None,
            };
            let raw = client.send(&request)?;
            Ok(String::from_utf8_lossy(&raw.body).into_owned())
        },
        AsyncDataOptions::default().immediate(false),
    );

    state.execute().wait().unwrap();
    assert_eq!(state.data.get(), Some("ok".to_owned()));
}

#[test]
fn pagination_navigates_pages_and_derives_totals() {
    let base = spawn_server();
    let page = use_pagination(format!("{base}/getByPage"), PaginationOptions::default());

    assert!(wait_until(
        || page.data.get().is_some(),
        Duration::from_secs(3)
    ));
    let payload = page.data.get().unwrap();
    assert_eq!(payload["total"], json!(100));
    assert_eq!(payload["current"], json!(1));
    assert_eq!(payload["data"].as_array().unwrap().len(), 10);
    assert_eq!(payload["data"][0]["id"], json!(1));
    assert_eq!(page.total.get(), 100);
    assert_eq!(page.page_size.get(), 10);
    assert_eq!(page.page_total.get(), 10);

    page.page_size.set(20);
    assert!(wait_until(
        || page.data.get().is_some_and(|d| d["pageSize"] == json!(20)),
        Duration::from_secs(3)
    ));
    let payload = page.data.get().unwrap();
    assert_eq!(payload["data"].as_array().unwrap().len(), 20);
    assert_eq!(payload["data"][0]["id"], json!(1));
    assert_eq!(page.page_total.get(), 5);

    page.page_current.set(2);
    assert!(wait_until(
        || page.data.get().is_some_and(|d| d["current"] == json!(2)),
        Duration::from_secs(3)
    ));
    let payload = page.data.get().unwrap();
    assert_eq!(payload["data"].as_array().unwrap().len(), 20);
    assert_eq!(payload["data"][0]["id"], json!(21));
    assert_eq!(payload["data"][19]["id"], json!(40));
}

#[test]
fn pagination_key_override_and_caller_precedence() {
    let base = spawn_server();
    let seen = Arc::new(parking_lot::Mutex::new(String::new()));
    let seen_clone = seen.clone();

    let page = use_pagination(
        format!("{base}/getByPage"),
        PaginationOptions::default()
            .page_current_key("pageCurrent")
            .fetch(FetchOptions::default().on_request(move |ctx| {
                *seen_clone.lock() = ctx.query["pageCurrent"].to_string();
                Ok(())
            })),
    );

    assert!(wait_until(
        || page.data.get().is_some(),
        Duration::from_secs(3)
    ));
    assert_eq!(*seen.lock(), "1");

    page.page_current.set(2);
    assert!(wait_until(
        || *seen.lock() == "2",
        Duration::from_secs(3)
    ));
}

#[test]
fn pagination_preset_carries_fetch_defaults() {
    let base = spawn_server();
    let api = PaginationPreset::new(
        FetchPreset::default().create(FetchOptions::default().base_url(base)),
    )
    .create(PaginationOptions::default().default_page_size(20));

    let page = api.paginate("getByPage", PaginationOptions::default());
    assert!(wait_until(
        || page.data.get().is_some(),
        Duration::from_secs(3)
    ));
    assert_eq!(page.page_size.get(), 20);
    assert_eq!(page.data.get().unwrap()["pageSize"], json!(20));
}

#[test]
fn explicit_query_value_wins_over_injection() {
    let base = spawn_server();
    let page = use_pagination(
        format!("{base}/getByPage"),
        PaginationOptions::default().fetch(
            FetchOptions::default()
                .query(QueryMap::from([("current".to_owned(), json!(3))])),
        ),
    );

    assert!(wait_until(
        || page.data.get().is_some(),
        Duration::from_secs(3)
    ));
    assert_eq!(page.data.get().unwrap()["current"], json!(3));
}

#[test]
fn transport_failure_maps_to_transport_error() {
    // nothing listens on this port
    let state = use_fetch(
        "http://127.0.0.1:9/unreachable",
        FetchOptions::default().immediate(false).timeout(Duration::from_millis(500)),
    );

    let outcome = state.execute().wait();
    assert!(matches!(outcome, Err(FetchError::Transport(_))));
    assert_eq!(state.status.get(), FetchStatus::Error);
}
