//! An in-memory control plane for tests.
//!
//! [`MockControlPlane`] implements [`Transport`] and enforces the rules the
//! orchestration layer depends on: revisions are checked on every mutation,
//! state changes are applied only after a configurable number of polls,
//! connections cannot be changed while an endpoint runs, and a connection
//! with queued data cannot be deleted.

use std::collections::HashMap;

use async_trait::async_trait;
use flowplane_client::{Method, Response, Result as TransportResult, Transport};
use flowplane_core::{ComponentId, ResourceKind};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use crate::lifecycle::{is_single_step, RunState};

/// One request received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// HTTP method.
    pub method: Method,
    /// Path including any query string.
    pub path: String,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl RecordedCall {
    /// The state requested, if this was a state-only transition request.
    #[must_use]
    pub fn requested_state(&self) -> Option<&str> {
        let component = self.body.as_ref()?.get("component")?.as_object()?;
        if is_state_change(component) {
            component.get("state")?.as_str()
        } else {
            None
        }
    }
}

#[derive(Debug)]
struct StoredEntity {
    revision: u64,
    component: Map<String, Value>,
    pending: Option<PendingState>,
}

impl StoredEntity {
    fn state(&self) -> &str {
        self.component
            .get("state")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    fn advance_pending(&mut self) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        if pending.remaining > 0 {
            pending.remaining -= 1;
            return;
        }
        let target = pending.target.clone();
        self.pending = None;
        self.component.insert("state".into(), Value::String(target));
    }

    fn to_json(&self, id: &str) -> Value {
        json!({
            "revision": { "version": self.revision },
            "id": id,
            "component": Value::Object(self.component.clone()),
        })
    }
}

#[derive(Debug)]
struct PendingState {
    target: String,
    remaining: u32,
}

#[derive(Debug)]
struct DropRequestState {
    connection_id: String,
    remaining: u32,
    finished: bool,
}

#[derive(Debug)]
struct InjectedFailure {
    method: Method,
    path: String,
    status: u16,
    remaining: u32,
}

#[derive(Debug, Default)]
struct MockState {
    convergence_polls: u32,
    drain_polls: u32,
    revision_bump_on_drain: bool,
    next_id: u64,
    next_drop_id: u64,
    entities: HashMap<(ResourceKind, String), StoredEntity>,
    queued: HashMap<String, u64>,
    drop_requests: HashMap<String, DropRequestState>,
    remote_ports: HashMap<String, String>,
    failures: Vec<InjectedFailure>,
    calls: Vec<RecordedCall>,
}

/// A control plane that keeps everything in memory.
#[derive(Debug)]
pub struct MockControlPlane {
    state: Mutex<MockState>,
}

impl Default for MockControlPlane {
    fn default() -> Self {
        Self {
            state: Mutex::new(MockState {
                convergence_polls: 1,
                drain_polls: 1,
                ..MockState::default()
            }),
        }
    }
}

impl MockControlPlane {
    /// Create a mock that applies state changes and purges after one poll.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of polls that still observe the old state after a transition.
    #[must_use]
    pub fn with_convergence_polls(mut self, polls: u32) -> Self {
        self.state.get_mut().convergence_polls = polls;
        self
    }

    /// Number of status polls that report a purge as unfinished.
    #[must_use]
    pub fn with_drain_polls(mut self, polls: u32) -> Self {
        self.state.get_mut().drain_polls = polls;
        self
    }

    /// Bump a connection's revision when a purge request is created.
    #[must_use]
    pub fn with_revision_bump_on_drain(mut self) -> Self {
        self.state.get_mut().revision_bump_on_drain = true;
        self
    }

    /// Every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Answer the next `times` calls of `method` on `path` with `status`.
    ///
    /// `path` is matched without its query string.
    pub fn fail(&self, method: Method, path: &str, status: u16, times: u32) {
        self.state.lock().failures.push(InjectedFailure {
            method,
            path: path.to_string(),
            status,
            remaining: times,
        });
    }

    /// Insert a component directly, as if created in `parent`.
    ///
    /// # Panics
    ///
    /// Never in practice: generated ids are always valid.
    pub fn seed(&self, kind: ResourceKind, parent: &str, component: Value) -> ComponentId {
        let body = json!({ "revision": { "version": 0 }, "component": component });
        let response = self.state.lock().create(kind, Some(parent), Some(&body));
        let created: Value = serde_json::from_slice(&response.body).unwrap_or_default();
        created["id"]
            .as_str()
            .and_then(|id| ComponentId::parse(id).ok())
            .expect("mock ids are valid component ids")
    }

    /// Insert a processor in the given run state.
    pub fn seed_processor(&self, parent: &str, state: &str) -> ComponentId {
        self.seed(
            ResourceKind::Processor,
            parent,
            json!({ "name": "mock", "type": "org.example.Mock", "state": state }),
        )
    }

    /// Insert a connection between two processors.
    pub fn seed_connection(
        &self,
        parent: &str,
        source: &ComponentId,
        destination: &ComponentId,
    ) -> ComponentId {
        self.seed(
            ResourceKind::Connection,
            parent,
            json!({
                "source": { "id": source, "groupId": parent, "type": "PROCESSOR" },
                "destination": { "id": destination, "groupId": parent, "type": "PROCESSOR" },
                "selectedRelationships": ["success"],
                "backPressureObjectThreshold": 10000,
                "backPressureDataSizeThreshold": "1 GB",
            }),
        )
    }

    /// Force the state of a component, cancelling any pending transition.
    pub fn set_state(&self, kind: ResourceKind, id: &ComponentId, state: &str) {
        if let Some(entity) = self.state.lock().entities.get_mut(&key(kind, id)) {
            entity.pending = None;
            entity.component.insert("state".into(), json!(state));
        }
    }

    /// The applied state of a component.
    #[must_use]
    pub fn state_of(&self, kind: ResourceKind, id: &ComponentId) -> Option<String> {
        self.state
            .lock()
            .entities
            .get(&key(kind, id))
            .map(|e| e.state().to_string())
    }

    /// The current revision of a component.
    #[must_use]
    pub fn revision_of(&self, kind: ResourceKind, id: &ComponentId) -> Option<u64> {
        self.state
            .lock()
            .entities
            .get(&key(kind, id))
            .map(|e| e.revision)
    }

    /// The stored representation of a component.
    #[must_use]
    pub fn component(&self, kind: ResourceKind, id: &ComponentId) -> Option<Value> {
        self.state
            .lock()
            .entities
            .get(&key(kind, id))
            .map(|e| Value::Object(e.component.clone()))
    }

    /// Set the number of flowfiles queued on a connection.
    pub fn set_queued(&self, connection_id: &ComponentId, count: u64) {
        self.state
            .lock()
            .queued
            .insert(connection_id.to_string(), count);
    }

    /// The number of flowfiles queued on a connection.
    #[must_use]
    pub fn queued(&self, connection_id: &ComponentId) -> u64 {
        self.state
            .lock()
            .queued
            .get(connection_id.as_str())
            .copied()
            .unwrap_or_default()
    }

    /// Purge requests created and not yet deleted.
    #[must_use]
    pub fn pending_drop_requests(&self) -> usize {
        self.state.lock().drop_requests.len()
    }

    /// The last run status set on a remote port.
    #[must_use]
    pub fn remote_port_state(&self, port_id: &ComponentId) -> Option<String> {
        self.state.lock().remote_ports.get(port_id.as_str()).cloned()
    }
}

#[async_trait]
impl Transport for MockControlPlane {
    async fn invoke(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> TransportResult<Response> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall {
            method: method.clone(),
            path: path.to_string(),
            body: body.cloned(),
        });

        let (route, query) = path.split_once('?').unwrap_or((path, ""));
        if let Some(status) = state.take_failure(&method, route) {
            return Ok(text(status, "injected failure"));
        }

        Ok(state.route(&method, route, query, body))
    }
}

impl MockState {
    fn take_failure(&mut self, method: &Method, path: &str) -> Option<u16> {
        let failure = self
            .failures
            .iter_mut()
            .find(|f| f.remaining > 0 && f.method == *method && f.path == path)?;
        failure.remaining -= 1;
        Some(failure.status)
    }

    fn route(&mut self, method: &Method, route: &str, query: &str, body: Option<&Value>) -> Response {
        let segments: Vec<&str> = route.trim_start_matches('/').split('/').collect();

        match (method.as_str(), segments.as_slice()) {
            ("POST", ["access", "token"]) => text(201, "mock-token"),
            ("POST", ["process-groups", parent, collection]) => {
                match ResourceKind::from_collection(collection) {
                    Some(kind) if kind.is_group_scoped() => self.create(kind, Some(parent), body),
                    _ => text(404, "unknown collection"),
                }
            }
            ("POST", ["controller", "reporting-tasks"]) => {
                self.create(ResourceKind::ReportingTask, None, body)
            }
            ("POST", ["tenants", collection]) => match ResourceKind::from_collection(collection) {
                Some(kind) if kind.is_tenant() => self.create(kind, None, body),
                _ => text(404, "unknown collection"),
            },
            ("POST", ["flowfile-queues", connection, "drop-requests"]) => {
                self.create_drop_request(connection)
            }
            ("GET", ["flowfile-queues", _, "drop-requests", id]) => self.poll_drop_request(id),
            ("DELETE", ["flowfile-queues", _, "drop-requests", id]) => {
                match self.drop_requests.remove(*id) {
                    Some(request) => ok(&json!({
                        "dropRequest": { "id": id, "finished": request.finished }
                    })),
                    None => text(404, "no such drop request"),
                }
            }
            ("PUT", ["remote-process-groups", group, "input-ports" | "output-ports", port, "run-status"]) => {
                self.set_remote_port(group, port, body)
            }
            (verb, [collection, id]) => match ResourceKind::from_collection(collection) {
                Some(kind) if !kind.is_tenant() => self.dispatch(verb, kind, id, query, body),
                _ => text(404, "unknown collection"),
            },
            (verb, ["tenants", collection, id]) => match ResourceKind::from_collection(collection) {
                Some(kind) if kind.is_tenant() => self.dispatch(verb, kind, id, query, body),
                _ => text(404, "unknown collection"),
            },
            _ => text(404, "not found"),
        }
    }

    fn dispatch(
        &mut self,
        verb: &str,
        kind: ResourceKind,
        id: &str,
        query: &str,
        body: Option<&Value>,
    ) -> Response {
        match verb {
            "GET" => self.get(kind, id),
            "PUT" => self.update(kind, id, body),
            "DELETE" => self.delete(kind, id, query),
            _ => text(405, "method not allowed"),
        }
    }

    fn create(&mut self, kind: ResourceKind, parent: Option<&str>, body: Option<&Value>) -> Response {
        self.next_id += 1;
        let id = format!("{}-{}", kind.collection(), self.next_id);

        let mut component = body
            .and_then(|b| b.get("component"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        component.insert("id".into(), json!(id));
        if let Some(parent) = parent {
            component.insert("parentGroupId".into(), json!(parent));
        }

        match kind {
            ResourceKind::Processor | ResourceKind::ReportingTask => {
                component.entry("state").or_insert(json!("STOPPED"));
            }
            ResourceKind::InputPort => {
                component.entry("state").or_insert(json!("STOPPED"));
                component.entry("type").or_insert(json!("INPUT_PORT"));
            }
            ResourceKind::OutputPort => {
                component.entry("state").or_insert(json!("STOPPED"));
                component.entry("type").or_insert(json!("OUTPUT_PORT"));
            }
            ResourceKind::ControllerService => {
                component.entry("state").or_insert(json!("DISABLED"));
            }
            ResourceKind::Connection => {
                self.queued.insert(id.clone(), 0);
            }
            _ => {}
        }

        let entity = StoredEntity {
            revision: 1,
            component,
            pending: None,
        };
        let response = entity.to_json(&id);
        self.entities.insert((kind, id), entity);
        json_response(201, &response)
    }

    fn get(&mut self, kind: ResourceKind, id: &str) -> Response {
        match self.entities.get_mut(&(kind, id.to_string())) {
            Some(entity) => {
                entity.advance_pending();
                ok(&entity.to_json(id))
            }
            None => text(404, "not found"),
        }
    }

    fn update(&mut self, kind: ResourceKind, id: &str, body: Option<&Value>) -> Response {
        let Some(body) = body else {
            return text(400, "missing body");
        };
        let version = body.pointer("/revision/version").and_then(Value::as_u64);
        let component = body
            .get("component")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let entity_key = (kind, id.to_string());

        let Some(current) = self.entities.get(&entity_key) else {
            return text(404, "not found");
        };
        if version != Some(current.revision) {
            return stale(version, current.revision);
        }

        if is_state_change(&component) {
            let desired = component
                .get("state")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return self.request_state(&entity_key, desired);
        }

        if kind == ResourceKind::Connection {
            let running = self
                .running_endpoint(&current.component)
                .or_else(|| self.running_endpoint(&component));
            if let Some(running) = running {
                return text(409, &format!("{running} is running"));
            }
        }

        let Some(entity) = self.entities.get_mut(&entity_key) else {
            return text(404, "not found");
        };
        for (field, value) in component {
            if field != "id" {
                entity.component.insert(field, value);
            }
        }
        entity.revision += 1;
        ok(&entity.to_json(id))
    }

    fn request_state(&mut self, entity_key: &(ResourceKind, String), desired: String) -> Response {
        let polls = self.convergence_polls;
        let kind = entity_key.0;
        let Some(entity) = self.entities.get_mut(entity_key) else {
            return text(404, "not found");
        };

        let current = entity
            .pending
            .as_ref()
            .map_or_else(|| entity.state().to_string(), |p| p.target.clone());
        if current == desired {
            return text(409, &format!("already {desired}"));
        }

        match kind {
            ResourceKind::Processor
            | ResourceKind::InputPort
            | ResourceKind::OutputPort
            | ResourceKind::ReportingTask => {
                let from = parse_run_state(&current);
                let to = parse_run_state(&desired);
                if !is_single_step(from, to) {
                    return text(409, &format!("cannot transition from {current} to {desired}"));
                }
            }
            ResourceKind::ControllerService => {
                let transitional = match desired.as_str() {
                    "ENABLED" => "ENABLING",
                    "DISABLED" => "DISABLING",
                    _ => return text(400, &format!("invalid service state {desired}")),
                };
                entity.component.insert("state".into(), json!(transitional));
            }
            _ => return text(400, "component has no state"),
        }

        entity.pending = Some(PendingState {
            target: desired,
            remaining: polls,
        });
        entity.revision += 1;
        ok(&entity.to_json(&entity_key.1))
    }

    fn delete(&mut self, kind: ResourceKind, id: &str, query: &str) -> Response {
        let version = query
            .split('&')
            .find_map(|pair| pair.strip_prefix("version="))
            .and_then(|v| v.parse::<u64>().ok());
        let Some(version) = version else {
            return text(400, "version is required");
        };
        let entity_key = (kind, id.to_string());

        let Some(current) = self.entities.get(&entity_key) else {
            return text(404, "not found");
        };
        if version != current.revision {
            return stale(Some(version), current.revision);
        }

        if kind == ResourceKind::Connection {
            if let Some(running) = self.running_endpoint(&current.component) {
                return text(409, &format!("{running} is running"));
            }
            let queued = self.queued.get(id).copied().unwrap_or_default();
            if queued > 0 {
                return text(409, &format!("queue holds {queued} flowfiles"));
            }
        }

        self.queued.remove(id);
        match self.entities.remove(&entity_key) {
            Some(removed) => ok(&removed.to_json(id)),
            None => text(404, "not found"),
        }
    }

    fn running_endpoint(&self, component: &Map<String, Value>) -> Option<String> {
        ["source", "destination"]
            .into_iter()
            .filter_map(|field| component.get(field))
            .find_map(|handle| {
                let id = handle.get("id")?.as_str()?;
                let kind = match handle.get("type")?.as_str()? {
                    "PROCESSOR" => ResourceKind::Processor,
                    "INPUT_PORT" => ResourceKind::InputPort,
                    "OUTPUT_PORT" => ResourceKind::OutputPort,
                    "REMOTE_INPUT_PORT" | "REMOTE_OUTPUT_PORT" => {
                        let transmitting = self.remote_ports.get(id).map(String::as_str)
                            == Some("TRANSMITTING");
                        return transmitting.then(|| format!("remote port {id}"));
                    }
                    _ => return None,
                };
                let entity = self.entities.get(&(kind, id.to_string()))?;
                (entity.state() == "RUNNING").then(|| format!("{kind} {id}"))
            })
    }

    fn create_drop_request(&mut self, connection_id: &str) -> Response {
        let connection_key = (ResourceKind::Connection, connection_id.to_string());
        let Some(connection) = self.entities.get_mut(&connection_key) else {
            return text(404, "not found");
        };
        if self.revision_bump_on_drain {
            connection.revision += 1;
        }

        self.next_drop_id += 1;
        let id = format!("drop-{}", self.next_drop_id);
        self.drop_requests.insert(
            id.clone(),
            DropRequestState {
                connection_id: connection_id.to_string(),
                remaining: self.drain_polls,
                finished: false,
            },
        );

        json_response(202, &json!({ "dropRequest": { "id": id, "finished": false } }))
    }

    fn poll_drop_request(&mut self, id: &str) -> Response {
        let Some(request) = self.drop_requests.get_mut(id) else {
            return text(404, "no such drop request");
        };

        if !request.finished {
            if request.remaining == 0 {
                request.finished = true;
                self.queued.insert(request.connection_id.clone(), 0);
            } else {
                request.remaining -= 1;
            }
        }

        ok(&json!({ "dropRequest": { "id": id, "finished": request.finished } }))
    }

    fn set_remote_port(&mut self, group: &str, port: &str, body: Option<&Value>) -> Response {
        let group_key = (ResourceKind::RemoteProcessGroup, group.to_string());
        if !self.entities.contains_key(&group_key) {
            return text(404, "not found");
        }
        let Some(state) = body.and_then(|b| b.get("state")).and_then(Value::as_str) else {
            return text(400, "state is required");
        };

        self.remote_ports.insert(port.to_string(), state.to_string());
        ok(&json!({ "id": port, "state": state }))
    }
}

fn key(kind: ResourceKind, id: &ComponentId) -> (ResourceKind, String) {
    (kind, id.to_string())
}

fn is_state_change(component: &Map<String, Value>) -> bool {
    component.contains_key("state") && component.keys().all(|k| k == "id" || k == "state")
}

fn parse_run_state(state: &str) -> RunState {
    serde_json::from_value(json!(state)).unwrap_or(RunState::Unknown)
}

fn stale(sent: Option<u64>, current: u64) -> Response {
    text(
        409,
        &format!("revision {sent:?} does not match current revision {current}"),
    )
}

fn ok(value: &Value) -> Response {
    json_response(200, value)
}

fn json_response(status: u16, value: &Value) -> Response {
    Response::new(status, value.to_string())
}

fn text(status: u16, message: &str) -> Response {
    Response::new(status, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ComponentId {
        ComponentId::parse(s).unwrap()
    }

    async fn call(mock: &MockControlPlane, method: Method, path: &str, body: Option<Value>) -> Response {
        mock.invoke(method, path, body.as_ref()).await.unwrap()
    }

    #[tokio::test]
    async fn transitions_apply_after_configured_polls() {
        let mock = MockControlPlane::new().with_convergence_polls(2);
        let p = mock.seed_processor("root", "STOPPED");
        let path = format!("/processors/{p}");

        let accepted = call(
            &mock,
            Method::PUT,
            &path,
            Some(json!({ "revision": { "version": 1 }, "component": { "id": p, "state": "RUNNING" } })),
        )
        .await;
        assert_eq!(accepted.status, 200);

        for _ in 0..2 {
            call(&mock, Method::GET, &path, None).await;
            assert_eq!(mock.state_of(ResourceKind::Processor, &p).as_deref(), Some("STOPPED"));
        }
        call(&mock, Method::GET, &path, None).await;
        assert_eq!(mock.state_of(ResourceKind::Processor, &p).as_deref(), Some("RUNNING"));
    }

    #[tokio::test]
    async fn rejects_multi_step_and_duplicate_transitions() {
        let mock = MockControlPlane::new();
        let p = mock.seed_processor("root", "RUNNING");
        let path = format!("/processors/{p}");

        let to_disabled = call(
            &mock,
            Method::PUT,
            &path,
            Some(json!({ "revision": { "version": 1 }, "component": { "id": p, "state": "DISABLED" } })),
        )
        .await;
        assert_eq!(to_disabled.status, 409);

        let already = call(
            &mock,
            Method::PUT,
            &path,
            Some(json!({ "revision": { "version": 1 }, "component": { "id": p, "state": "RUNNING" } })),
        )
        .await;
        assert_eq!(already.status, 409);
    }

    #[tokio::test]
    async fn connection_rules() {
        let mock = MockControlPlane::new();
        let a = mock.seed_processor("root", "RUNNING");
        let b = mock.seed_processor("root", "STOPPED");
        let c = mock.seed_connection("root", &a, &b);
        let path = format!("/connections/{c}");

        let update = call(
            &mock,
            Method::PUT,
            &path,
            Some(json!({ "revision": { "version": 1 }, "component": { "id": c, "backPressureObjectThreshold": 5 } })),
        )
        .await;
        assert_eq!(update.status, 409);
        assert!(update.text().contains("is running"));

        mock.set_state(ResourceKind::Processor, &a, "STOPPED");
        mock.set_queued(&c, 3);
        let delete = call(&mock, Method::DELETE, &format!("{path}?version=1"), None).await;
        assert_eq!(delete.status, 409);
        assert!(delete.text().contains("queue holds 3"));

        mock.set_queued(&c, 0);
        let delete = call(&mock, Method::DELETE, &format!("{path}?version=1"), None).await;
        assert_eq!(delete.status, 200);
        assert_eq!(call(&mock, Method::GET, &path, None).await.status, 404);
    }

    #[tokio::test]
    async fn injected_failures_run_out() {
        let mock = MockControlPlane::new();
        mock.fail(Method::GET, "/processors/p1", 500, 1);

        assert_eq!(call(&mock, Method::GET, "/processors/p1", None).await.status, 500);
        assert_eq!(call(&mock, Method::GET, "/processors/p1", None).await.status, 404);
        assert_eq!(mock.calls().len(), 2);
        assert!(mock.state_of(ResourceKind::Processor, &id("p1")).is_none());
    }

    #[test]
    fn state_requests_are_recognised() {
        let transition = RecordedCall {
            method: Method::PUT,
            path: "/processors/p1".into(),
            body: Some(json!({ "revision": { "version": 1 }, "component": { "id": "p1", "state": "STOPPED" } })),
        };
        let structural = RecordedCall {
            method: Method::PUT,
            path: "/processors/p1".into(),
            body: Some(json!({ "revision": { "version": 1 }, "component": { "id": "p1", "name": "x", "state": "STOPPED" } })),
        };

        assert_eq!(transition.requested_state(), Some("STOPPED"));
        assert_eq!(structural.requested_state(), None);
    }
}
