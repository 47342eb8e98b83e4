//! Drives the real HTTP client through the whole setup against an in-process
//! stub of the cluster's REST API.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use qa_setup_lib::clients::{ApiError, MlApi, MlCommonsClient};
use qa_setup_lib::config::SetupConfig;
use qa_setup_lib::setup::{QaModelSetup, SetupError};
use serde_json::{json, Value};
use warp::http::{Method, StatusCode};
use warp::hyper::body::Bytes;
use warp::path::FullPath;
use warp::Filter;

/// One request as seen by the stub.
#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    body: Option<Value>,
}

type Script = HashMap<(String, String), VecDeque<(u16, Value)>>;

/// Answers each `(method, path)` with the next scripted `(status, body)`.
/// The last scripted answer of a route is repeated once the queue drains.
///
/// The warp server runs on its own runtime thread; the client under test
/// is blocking and stays outside of it.
struct StubCluster {
    base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubCluster {
    fn start(routes: Vec<(&str, &str, Vec<(u16, Value)>)>) -> Self {
        let mut script = Script::new();
        for (method, path, responses) in routes {
            script.insert((method.to_string(), path.to_string()), responses.into());
        }
        let script = Arc::new(Mutex::new(script));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        let routes = warp::method()
            .and(warp::path::full())
            .and(warp::body::bytes())
            .map(move |method: Method, path: FullPath, body: Bytes| {
                let method = method.to_string();
                let path = path.as_str().to_string();
                recorded.lock().unwrap().push(Recorded {
                    method: method.clone(),
                    path: path.clone(),
                    body: serde_json::from_slice(&body).ok(),
                });

                let (status, payload) = next_answer(&mut script.lock().unwrap(), method, path);
                warp::reply::with_status(
                    warp::reply::json(&payload),
                    StatusCode::from_u16(status).unwrap(),
                )
            });

        let (tx, rx) = mpsc::channel::<SocketAddr>();
        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
                tx.send(addr).unwrap();
                server.await;
            });
        });
        let addr = rx.recv_timeout(Duration::from_secs(5)).unwrap();

        Self {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn paths(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    fn client(&self) -> MlCommonsClient {
        MlCommonsClient::new(&self.base_url, Duration::from_secs(5)).unwrap()
    }

    fn config(&self) -> SetupConfig {
        let mut config = SetupConfig::default().with_base_url(&self.base_url).unwrap();
        config.poll.interval_secs = 0;
        config
    }
}

fn next_answer(script: &mut Script, method: String, path: String) -> (u16, Value) {
    match script.get_mut(&(method, path)) {
        Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
        Some(queue) if !queue.is_empty() => queue[0].clone(),
        _ => (404, json!({"error": "no route"})),
    }
}

fn set_route(
    routes: &mut [(&'static str, &'static str, Vec<(u16, Value)>)],
    path: &str,
    responses: Vec<(u16, Value)>,
) {
    let route = routes.iter_mut().find(|route| route.1 == path).unwrap();
    route.2 = responses;
}

fn happy_routes() -> Vec<(&'static str, &'static str, Vec<(u16, Value)>)> {
    vec![
        (
            "PUT",
            "/_cluster/settings",
            vec![(200, json!({"acknowledged": true}))],
        ),
        (
            "POST",
            "/_plugins/_ml/model_groups/_register",
            vec![(200, json!({"model_group_id": "grp-1", "status": "CREATED"}))],
        ),
        (
            "POST",
            "/_plugins/_ml/models/_register",
            vec![(200, json!({"task_id": "reg-task", "status": "CREATED"}))],
        ),
        (
            "GET",
            "/_plugins/_ml/tasks/reg-task",
            vec![
                (200, json!({"state": "RUNNING", "task_type": "REGISTER_MODEL"})),
                (200, json!({"state": "RUNNING", "task_type": "REGISTER_MODEL"})),
                (
                    200,
                    json!({"state": "COMPLETED", "model_id": "abc123", "task_type": "REGISTER_MODEL"}),
                ),
            ],
        ),
        (
            "POST",
            "/_plugins/_ml/models/abc123/_deploy",
            vec![(200, json!({"task_id": "deploy-task", "status": "CREATED"}))],
        ),
        (
            "GET",
            "/_plugins/_ml/tasks/deploy-task",
            vec![(200, json!({"state": "COMPLETED", "task_type": "DEPLOY_MODEL"}))],
        ),
    ]
}

#[test]
fn test_setup_end_to_end() {
    let cluster = StubCluster::start(happy_routes());
    let client = cluster.client();
    let config = cluster.config();

    let model_id = QaModelSetup::new(&client, &config)
        .run_with_suffix("20240101_120000")
        .unwrap();
    assert_eq!(model_id, "abc123");

    let requests = cluster.requests();
    assert_eq!(
        cluster.paths(),
        vec![
            "PUT /_cluster/settings",
            "POST /_plugins/_ml/model_groups/_register",
            "POST /_plugins/_ml/models/_register",
            "GET /_plugins/_ml/tasks/reg-task",
            "GET /_plugins/_ml/tasks/reg-task",
            "GET /_plugins/_ml/tasks/reg-task",
            "POST /_plugins/_ml/models/abc123/_deploy",
            "GET /_plugins/_ml/tasks/deploy-task",
        ]
    );

    let settings = requests[0].body.clone().unwrap();
    assert_eq!(
        settings["persistent"]["plugins.ml_commons.allow_registering_model_via_url"],
        true
    );

    let group = requests[1].body.clone().unwrap();
    assert_eq!(group["name"], "local_model_group_20240101_120000");

    let registration = requests[2].body.clone().unwrap();
    assert_eq!(registration["name"], "test_question_answering_20240101_120000");
    assert_eq!(registration["model_group_id"], "grp-1");
    assert_eq!(registration["function_name"], "QUESTION_ANSWERING");
    assert_eq!(registration["model_config"]["framework_type"], "huggingface_transformers");
}

#[test]
fn test_model_id_from_search_fallback() {
    let mut routes = happy_routes();
    for route in routes.iter_mut() {
        if route.1 == "/_plugins/_ml/tasks/reg-task" {
            route.2 = vec![(200, json!({"state": "COMPLETED"}))];
        }
        if route.1 == "/_plugins/_ml/models/abc123/_deploy" {
            route.1 = "/_plugins/_ml/models/m-found/_deploy";
        }
    }
    routes.push((
        "POST",
        "/_plugins/_ml/models/_search",
        vec![(
            200,
            json!({"hits": {"hits": [
                {"_id": "m-other", "_source": {"task_id": "older-task"}},
                {"_id": "m-found", "_source": {"task_id": "reg-task"}}
            ]}}),
        )],
    ));
    let cluster = StubCluster::start(routes);
    let client = cluster.client();
    let config = cluster.config();

    let model_id = QaModelSetup::new(&client, &config)
        .run_with_suffix("ts")
        .unwrap();
    assert_eq!(model_id, "m-found");

    let search = cluster
        .requests()
        .into_iter()
        .find(|r| r.path == "/_plugins/_ml/models/_search")
        .unwrap();
    assert_eq!(search.body.unwrap()["size"], 1000);
}

#[test]
fn test_registration_error_status() {
    let mut routes = happy_routes();
    routes[2].2 = vec![(
        400,
        json!({"error": {"reason": "model url not allowed"}, "status": 400}),
    )];
    let cluster = StubCluster::start(routes);
    let client = cluster.client();
    let config = cluster.config();

    let err = QaModelSetup::new(&client, &config)
        .run_with_suffix("ts")
        .unwrap_err();

    match err {
        SetupError::RegistrationRejected { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("model url not allowed"));
        }
        other => panic!("Expected RegistrationRejected, got: {:?}", other),
    }
}

#[test]
fn test_task_status_is_decoded_verbatim() {
    let cluster = StubCluster::start(vec![(
        "GET",
        "/_plugins/_ml/tasks/t-1",
        vec![(
            200,
            json!({"state": "FAILED", "error": "bad zip", "worker_node": ["n1"]}),
        )],
    )]);
    let client = cluster.client();

    let status = client.get_task("t-1").unwrap();
    assert_eq!(status.state.as_deref(), Some("FAILED"));
    assert_eq!(status.error_message(), Some("bad zip"));
    assert_eq!(status.extra["worker_node"], json!(["n1"]));
}

#[test]
fn test_unknown_route_is_status_error() {
    let cluster = StubCluster::start(Vec::new());
    let client = cluster.client();

    let err = client.deploy_model("nope").unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(matches!(err, ApiError::Status { ref path, .. } if path == "/_plugins/_ml/models/nope/_deploy"));
}

#[test]
fn test_blank_model_id_uses_search() {
    let mut routes = happy_routes();
    set_route(
        &mut routes,
        "/_plugins/_ml/tasks/reg-task",
        vec![(200, json!({"state": "COMPLETED", "model_id": ""}))],
    );
    routes.push((
        "POST",
        "/_plugins/_ml/models/_search",
        vec![(
            200,
            json!({"hits": {"hits": [
                {"_id": "", "_source": {"task_id": "reg-task"}},
                {"_id": "m-search", "_source": {"task_id": "reg-task"}}
            ]}}),
        )],
    ));
    routes.push((
        "POST",
        "/_plugins/_ml/models/m-search/_deploy",
        vec![(200, json!({"status": "COMPLETED"}))],
    ));
    let cluster = StubCluster::start(routes);
    let client = cluster.client();
    let config = cluster.config();

    let model_id = QaModelSetup::new(&client, &config)
        .run_with_suffix("ts")
        .unwrap();

    assert_eq!(model_id, "m-search");
    let paths = cluster.paths();
    assert!(paths.contains(&"POST /_plugins/_ml/models/_search".to_string()));
    assert_eq!(
        paths.last().map(String::as_str),
        Some("POST /_plugins/_ml/models/m-search/_deploy")
    );
}

#[test]
fn test_rejected_settings_and_group_do_not_stop_setup() {
    let mut routes = happy_routes();
    set_route(
        &mut routes,
        "/_cluster/settings",
        vec![(403, json!({"error": {"type": "security_exception"}, "status": 403}))],
    );
    set_route(
        &mut routes,
        "/_plugins/_ml/model_groups/_register",
        vec![(400, json!({"error": {"reason": "name already exists"}, "status": 400}))],
    );
    let cluster = StubCluster::start(routes);
    let client = cluster.client();
    let config = cluster.config();

    let model_id = QaModelSetup::new(&client, &config)
        .run_with_suffix("ts")
        .unwrap();
    assert_eq!(model_id, "abc123");

    let registration = cluster
        .requests()
        .into_iter()
        .find(|r| r.path == "/_plugins/_ml/models/_register")
        .unwrap();
    assert!(registration.body.unwrap().get("model_group_id").is_none());
}

#[test]
fn test_task_not_found_yet_keeps_polling() {
    let mut routes = happy_routes();
    set_route(
        &mut routes,
        "/_plugins/_ml/tasks/reg-task",
        vec![
            (404, json!({"error": {"type": "status_exception"}, "status": 404})),
            (200, json!({"state": "COMPLETED", "model_id": "abc123"})),
        ],
    );
    let cluster = StubCluster::start(routes);
    let client = cluster.client();
    let config = cluster.config();

    let model_id = QaModelSetup::new(&client, &config)
        .run_with_suffix("ts")
        .unwrap();

    assert_eq!(model_id, "abc123");
    let lookups = cluster
        .paths()
        .into_iter()
        .filter(|path| path == "GET /_plugins/_ml/tasks/reg-task")
        .count();
    assert_eq!(lookups, 2);
}
