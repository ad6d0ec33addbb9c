//! In-process stand-in for the control-plane API used by the client tests

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tokio::sync::broadcast;

use kubewire_client::{Client, Endpoint};

const LOG_TEXT: &str = "1:C 01 May 2024 10:00:00.000 # oO0OoO0OoO0Oo Redis is starting oO0OoO0OoO0Oo\n\
1:M 01 May 2024 10:00:00.001 * Server started, Redis version 7.2.4\n\
1:M 01 May 2024 10:00:00.001 * Ready to accept connections tcp\n";

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Key {
    namespace: Option<String>,
    collection: String,
    name: String,
}

#[derive(Clone, Debug)]
struct Change {
    namespace: Option<String>,
    collection: String,
    line: String,
}

struct ApiState {
    objects: Mutex<BTreeMap<Key, Value>>,
    requests: Mutex<Vec<String>>,
    version: AtomicU64,
    changes: broadcast::Sender<Change>,
}

impl ApiState {
    fn next_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn publish(&self, key: &Key, event_type: &str, object: &Value) {
        let line = format!("{}\n", json!({"type": event_type, "object": object}));
        // no subscribers is fine
        let _ = self.changes.send(Change {
            namespace: key.namespace.clone(),
            collection: key.collection.clone(),
            line,
        });
    }
}

/// A minimal API server holding objects in memory.
///
/// Supports create/get/list/delete for pods, replication controllers and
/// namespaces, pod logs and namespaced watches.
pub struct FakeApiServer {
    addr: SocketAddr,
    state: Arc<ApiState>,
}

impl FakeApiServer {
    pub async fn start() -> Self {
        let (changes, _) = broadcast::channel(64);
        let state = Arc::new(ApiState {
            objects: Mutex::new(BTreeMap::new()),
            requests: Mutex::new(Vec::new()),
            version: AtomicU64::new(0),
            changes,
        });

        let app = Router::new()
            .fallback(dispatch)
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    pub fn client(&self, namespace: &str) -> Client {
        let endpoint = Endpoint::new(&self.base_url(), namespace).unwrap();
        Client::with_endpoint(endpoint).unwrap()
    }

    /// Every request seen so far as `METHOD /path?query`
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Move a pending pod to Running, as a kubelet would
    pub fn start_pod(&self, namespace: &str, name: &str) {
        let key = Key {
            namespace: Some(namespace.to_string()),
            collection: "pods".to_string(),
            name: name.to_string(),
        };
        let version = self.state.next_version();

        let mut objects = self.state.objects.lock().unwrap();
        let pod = objects.get_mut(&key).expect("pod exists");
        pod["status"]["phase"] = json!("Running");
        pod["status"]["podIP"] = json!("10.1.0.7");
        pod["metadata"]["resourceVersion"] = json!(version.to_string());
        self.state.publish(&key, "MODIFIED", pod);
    }
}

fn kind_of(collection: &str) -> Option<&'static str> {
    match collection {
        "pods" => Some("Pod"),
        "replicationcontrollers" => Some("ReplicationController"),
        "namespaces" => Some("Namespace"),
        _ => None,
    }
}

fn status(code: StatusCode, reason: &str, message: String) -> Response {
    let body = json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code.as_u16()
    });
    json_response(code, &body)
}

fn json_response(code: StatusCode, body: &Value) -> Response {
    (
        code,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

fn not_found(collection: &str, name: &str) -> Response {
    status(
        StatusCode::NOT_FOUND,
        "NotFound",
        format!("{} \"{}\" not found", collection, name),
    )
}

async fn dispatch(
    State(state): State<Arc<ApiState>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let target = match uri.query() {
        Some(query) => format!("{} {}?{}", method, uri.path(), query),
        None => format!("{} {}", method, uri.path()),
    };
    state.requests.lock().unwrap().push(target);

    let Some(path) = uri.path().strip_prefix("/api/v1/") else {
        return status(StatusCode::NOT_FOUND, "NotFound", "unknown api root".to_string());
    };
    let segments: Vec<&str> = path.split('/').collect();

    match (method, segments.as_slice()) {
        (Method::GET, ["namespaces"]) => list(&state, None, "namespaces"),
        (Method::POST, ["namespaces"]) => create(&state, None, "namespaces", &body),
        (Method::GET, ["namespaces", name]) => get(&state, None, "namespaces", name),
        (Method::DELETE, ["namespaces", name]) => delete_namespace(&state, name),
        (Method::GET, ["namespaces", ns, "watch", collection]) => watch(&state, ns, collection),
        (Method::GET, ["namespaces", ns, "pods", name, "log"]) => logs(&state, ns, name),
        (Method::GET, ["namespaces", ns, collection]) => list(&state, Some(*ns), collection),
        (Method::POST, ["namespaces", ns, collection]) => {
            create(&state, Some(*ns), collection, &body)
        }
        (Method::GET, ["namespaces", ns, collection, name]) => {
            get(&state, Some(*ns), collection, name)
        }
        (Method::DELETE, ["namespaces", ns, collection, name]) => {
            delete(&state, ns, collection, name)
        }
        _ => status(
            StatusCode::NOT_FOUND,
            "NotFound",
            "the server could not find the requested resource".to_string(),
        ),
    }
}

fn namespace_exists(state: &ApiState, namespace: &str) -> bool {
    let key = Key {
        namespace: None,
        collection: "namespaces".to_string(),
        name: namespace.to_string(),
    };
    state.objects.lock().unwrap().contains_key(&key)
}

fn create(state: &ApiState, namespace: Option<&str>, collection: &str, body: &[u8]) -> Response {
    let Some(kind) = kind_of(collection) else {
        return not_found(collection, "");
    };
    if let Some(ns) = namespace {
        if !namespace_exists(state, ns) {
            return not_found("namespaces", ns);
        }
    }

    let mut object: Value = match serde_json::from_slice(body) {
        Ok(object @ Value::Object(_)) => object,
        _ => {
            return status(
                StatusCode::BAD_REQUEST,
                "BadRequest",
                "the body of the request was in an unknown format".to_string(),
            );
        }
    };
    let Some(name) = object["metadata"]["name"].as_str().map(str::to_string) else {
        return status(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid",
            format!("{} \"\" is invalid: metadata.name: Required value", kind),
        );
    };

    let key = Key {
        namespace: namespace.map(str::to_string),
        collection: collection.to_string(),
        name: name.clone(),
    };
    let version = state.next_version();

    let mut objects = state.objects.lock().unwrap();
    if objects.contains_key(&key) {
        return status(
            StatusCode::CONFLICT,
            "AlreadyExists",
            format!("{} \"{}\" already exists", collection, name),
        );
    }

    object["kind"] = json!(kind);
    object["apiVersion"] = json!("v1");
    object["metadata"]["uid"] = json!(format!("00000000-0000-0000-0000-{:012}", version));
    object["metadata"]["resourceVersion"] = json!(version.to_string());
    object["metadata"]["creationTimestamp"] = json!("2024-05-01T10:00:00Z");
    if let Some(ns) = namespace {
        object["metadata"]["namespace"] = json!(ns);
    }
    object["status"] = match collection {
        "pods" => json!({"phase": "Pending"}),
        "replicationcontrollers" => json!({"replicas": 0}),
        _ => json!({"phase": "Active"}),
    };

    objects.insert(key.clone(), object.clone());
    state.publish(&key, "ADDED", &object);
    json_response(StatusCode::CREATED, &object)
}

fn get(state: &ApiState, namespace: Option<&str>, collection: &str, name: &str) -> Response {
    let key = Key {
        namespace: namespace.map(str::to_string),
        collection: collection.to_string(),
        name: name.to_string(),
    };
    match state.objects.lock().unwrap().get(&key) {
        Some(object) => json_response(StatusCode::OK, object),
        None => not_found(collection, name),
    }
}

fn list(state: &ApiState, namespace: Option<&str>, collection: &str) -> Response {
    let Some(kind) = kind_of(collection) else {
        return not_found(collection, "");
    };
    let items: Vec<Value> = state
        .objects
        .lock()
        .unwrap()
        .iter()
        .filter(|(key, _)| key.namespace.as_deref() == namespace && key.collection == collection)
        .map(|(_, object)| object.clone())
        .collect();

    let body = json!({
        "kind": format!("{}List", kind),
        "apiVersion": "v1",
        "metadata": {"resourceVersion": state.version.load(Ordering::SeqCst).to_string()},
        "items": items
    });
    json_response(StatusCode::OK, &body)
}

fn delete(state: &ApiState, namespace: &str, collection: &str, name: &str) -> Response {
    let key = Key {
        namespace: Some(namespace.to_string()),
        collection: collection.to_string(),
        name: name.to_string(),
    };
    match state.objects.lock().unwrap().remove(&key) {
        Some(object) => {
            state.publish(&key, "DELETED", &object);
            json_response(StatusCode::OK, &object)
        }
        None => not_found(collection, name),
    }
}

fn delete_namespace(state: &ApiState, name: &str) -> Response {
    let key = Key {
        namespace: None,
        collection: "namespaces".to_string(),
        name: name.to_string(),
    };

    let mut objects = state.objects.lock().unwrap();
    let Some(mut object) = objects.remove(&key) else {
        return not_found("namespaces", name);
    };
    objects.retain(|key, _| key.namespace.as_deref() != Some(name));

    object["status"]["phase"] = json!("Terminating");
    json_response(StatusCode::OK, &object)
}

fn logs(state: &ApiState, namespace: &str, name: &str) -> Response {
    let key = Key {
        namespace: Some(namespace.to_string()),
        collection: "pods".to_string(),
        name: name.to_string(),
    };
    let objects = state.objects.lock().unwrap();
    let Some(pod) = objects.get(&key) else {
        return not_found("pods", name);
    };
    if pod["status"]["phase"] == "Pending" {
        let container = pod["spec"]["containers"][0]["name"].as_str().unwrap_or("");
        return status(
            StatusCode::BAD_REQUEST,
            "BadRequest",
            format!(
                "container \"{}\" in pod \"{}\" is waiting to start: ContainerCreating",
                container, name
            ),
        );
    }

    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], LOG_TEXT).into_response()
}

fn watch(state: &ApiState, namespace: &str, collection: &str) -> Response {
    if kind_of(collection).is_none() {
        return not_found(collection, "");
    }

    // subscribe before the snapshot so no change falls in between
    let changes = state.changes.subscribe();
    let existing: Vec<Result<Bytes, Infallible>> = state
        .objects
        .lock()
        .unwrap()
        .iter()
        .filter(|(key, _)| {
            key.namespace.as_deref() == Some(namespace) && key.collection == collection
        })
        .map(|(_, object)| {
            let line = format!("{}\n", json!({"type": "ADDED", "object": object}));
            Ok(Bytes::from(line))
        })
        .collect();

    let namespace = namespace.to_string();
    let collection = collection.to_string();
    let live = futures::stream::unfold(changes, move |mut changes| {
        let namespace = namespace.clone();
        let collection = collection.clone();
        async move {
            loop {
                match changes.recv().await {
                    Ok(change)
                        if change.namespace.as_deref() == Some(namespace.as_str())
                            && change.collection == collection =>
                    {
                        return Some((Ok(Bytes::from(change.line)), changes));
                    }
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        }
    });

    let body = futures::StreamExt::chain(futures::stream::iter(existing), live);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        Body::from_stream(body),
    )
        .into_response()
}
