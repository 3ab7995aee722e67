//! In-memory transports for exercising clients and the driver without a
//! network.
//!
//! [`InMemoryHub`] behaves like the API Hub REST surface closely enough for
//! reconciliation: resource ids are unique (duplicate creates return 409),
//! nested resources need their parent, versions may only reference existing
//! deployments, `updateMask` limits which fields a patch touches, and deleting
//! a resource with children needs `force=true`. Every call is recorded.

use crate::error::Result;
use crate::transport::{Method, RawResponse, Transport, Url};
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

pub const TEST_BASE_URL: &str = "http://hub.test/v1";

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    /// Path and query relative to the base URL.
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
struct Rejection {
    method: Method,
    name: String,
    status: u16,
}

#[derive(Debug, Default)]
struct HubState {
    resources: BTreeMap<String, Value>,
    calls: Vec<RecordedCall>,
    rejections: Vec<Rejection>,
}

#[derive(Debug, Default)]
pub struct InMemoryHub {
    state: RefCell<HubState>,
}

impl InMemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method` on the resource or collection `name` with `status`
    /// instead of handling it.
    pub fn reject(&self, method: Method, name: impl Into<String>, status: u16) {
        self.state.borrow_mut().rejections.push(Rejection {
            method,
            name: name.into(),
            status,
        });
    }

    /// Seed a resource directly, bypassing every check.
    pub fn insert(&self, name: &str, mut doc: Value) {
        doc["name"] = json!(name);
        self.state.borrow_mut().resources.insert(name.to_string(), doc);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.state.borrow().resources.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.state.borrow().resources.keys().cloned().collect()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.state.borrow().resources.clone()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.borrow().calls.clone()
    }

    pub fn calls_with(&self, method: &Method) -> Vec<RecordedCall> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| &c.method == method)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    fn handle(&self, method: &Method, path: &str, query: &[(String, String)], body: Option<&Value>) -> RawResponse {
        let mut state = self.state.borrow_mut();
        let target = path.strip_suffix(":contents").unwrap_or(path);
        let created = query
            .iter()
            .find(|(k, _)| k.ends_with("Id"))
            .map(|(_, id)| format!("{path}/{id}"));
        if let Some(r) = state.rejections.iter().find(|r| {
            &r.method == method && (r.name == target || Some(&r.name) == created.as_ref())
        }) {
            return error(r.status, "rejected by test");
        }

        let is_collection = segments(path) % 2 == 1;
        match (method.as_str(), is_collection) {
            ("GET", true) => list(&state.resources, path),
            ("GET", false) => match path.strip_suffix(":contents") {
                Some(spec) => match state.resources.get(spec) {
                    Some(doc) => ok(doc.get("contents").cloned().unwrap_or_else(|| json!({}))),
                    None => not_found(spec),
                },
                None => match state.resources.get(path) {
                    Some(doc) => ok(doc.clone()),
                    None => not_found(path),
                },
            },
            ("POST", true) => {
                let Some(id) = query.iter().find(|(k, _)| k.ends_with("Id")).map(|(_, v)| v) else {
                    return error(400, "missing resource id");
                };
                let name = format!("{path}/{id}");
                if state.resources.contains_key(&name) {
                    return error(409, &format!("{name} already exists"));
                }
                if let Some(parent) = parent_of(path) {
                    if !state.resources.contains_key(parent) {
                        return not_found(parent);
                    }
                }
                let mut doc = body.cloned().unwrap_or_else(|| json!({}));
                if let Err(missing) = check_references(&state.resources, &doc) {
                    return error(400, &format!("unknown deployment {missing}"));
                }
                doc["name"] = json!(name);
                state.resources.insert(name, doc.clone());
                ok(doc)
            }
            ("PATCH", false) => {
                let mask: Vec<String> = query
                    .iter()
                    .filter(|(k, _)| k == "updateMask")
                    .flat_map(|(_, v)| v.split(',').map(str::to_string).collect::<Vec<_>>())
                    .collect();
                let patch = body.cloned().unwrap_or_else(|| json!({}));
                if let Err(missing) = check_references(&state.resources, &patch) {
                    return error(400, &format!("unknown deployment {missing}"));
                }
                let Some(doc) = state.resources.get_mut(path) else {
                    return not_found(path);
                };
                for field in &mask {
                    match patch.get(field) {
                        Some(value) => doc[field.as_str()] = value.clone(),
                        None => {
                            if let Some(obj) = doc.as_object_mut() {
                                obj.remove(field);
                            }
                        }
                    }
                }
                ok(doc.clone())
            }
            ("DELETE", false) => {
                if !state.resources.contains_key(path) {
                    return not_found(path);
                }
                let prefix = format!("{path}/");
                let children: Vec<String> = state
                    .resources
                    .keys()
                    .filter(|k| k.starts_with(&prefix))
                    .cloned()
                    .collect();
                let force = query.iter().any(|(k, v)| k == "force" && v == "true");
                if !children.is_empty() && !force {
                    return error(400, "resource has children; use force");
                }
                for child in children {
                    state.resources.remove(&child);
                }
                state.resources.remove(path);
                ok(json!({}))
            }
            _ => error(405, "method not allowed"),
        }
    }
}

impl Transport for InMemoryHub {
    fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<RawResponse> {
        let relative = url
            .strip_prefix(TEST_BASE_URL)
            .unwrap_or(url)
            .trim_start_matches('/');
        let (path, query) = split_query(relative);
        self.state.borrow_mut().calls.push(RecordedCall {
            method: method.clone(),
            path: relative.to_string(),
            body: body.cloned(),
        });
        Ok(self.handle(&method, path, &query, body))
    }
}

/// Replays canned responses in order and records every request. Used for
/// services whose semantics do not need a full fake.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<RawResponse>>,
    calls: RefCell<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: Value) -> Self {
        self.responses
            .borrow_mut()
            .push_back(RawResponse::new(status, body.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<RawResponse> {
        self.calls.borrow_mut().push(RecordedCall {
            method,
            path: url.to_string(),
            body: body.cloned(),
        });
        Ok(self
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| RawResponse::new(200, "{}")))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn segments(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

fn split_query(relative: &str) -> (&str, Vec<(String, String)>) {
    match relative.split_once('?') {
        None => (relative, Vec::new()),
        Some((path, query)) => {
            let pairs = Url::parse(&format!("{TEST_BASE_URL}?{query}"))
                .map(|url| {
                    url.query_pairs()
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default();
            (path, pairs)
        }
    }
}

/// Owning resource of a nested collection; `None` for top-level collections
/// directly under a location.
fn parent_of(collection: &str) -> Option<&str> {
    let (parent, _) = collection.rsplit_once('/')?;
    if segments(parent) <= 4 {
        None
    } else {
        Some(parent)
    }
}

fn check_references(resources: &BTreeMap<String, Value>, doc: &Value) -> std::result::Result<(), String> {
    let Some(deployments) = doc.get("deployments").and_then(Value::as_array) else {
        return Ok(());
    };
    for d in deployments.iter().filter_map(Value::as_str) {
        if !resources.contains_key(d) {
            return Err(d.to_string());
        }
    }
    Ok(())
}

fn list(resources: &BTreeMap<String, Value>, collection: &str) -> RawResponse {
    let prefix = format!("{collection}/");
    let depth = segments(collection) + 1;
    let items: Vec<Value> = resources
        .iter()
        .filter(|(name, _)| name.starts_with(&prefix) && segments(name) == depth)
        .map(|(_, doc)| doc.clone())
        .collect();
    let field = collection.rsplit('/').next().unwrap_or(collection);
    if items.is_empty() {
        return ok(json!({}));
    }
    let mut body = Map::new();
    body.insert(field.to_string(), Value::Array(items));
    ok(Value::Object(body))
}

fn ok(body: Value) -> RawResponse {
    RawResponse::new(200, body.to_string())
}

fn not_found(name: &str) -> RawResponse {
    error(404, &format!("{name} not found"))
}

fn error(status: u16, message: &str) -> RawResponse {
    RawResponse::new(
        status,
        json!({"error": {"code": status, "message": message}}).to_string(),
    )
}
