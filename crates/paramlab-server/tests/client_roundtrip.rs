//! Drives a live proxy through `ProxyClient` and the core view state

use mockito::{Matcher, Server};
use serde_json::json;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

use paramlab_core::{
    builder::{GenerationRequestBuilder, RunCount},
    editor::{Field, Parameter},
    history::{DeleteOutcome, ExperimentHistory, ListState},
    types::ExportFormat,
    workbench::Workbench,
    CoreError,
};
use paramlab_server::{config::ServerConfig, ParamlabServer, ProxyClient};

struct RunningProxy {
    url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl RunningProxy {
    async fn start(backend_url: &str) -> Self {
        let mut config = ServerConfig::default();
        config.backend.url = backend_url.to_string();
        let server = ParamlabServer::new(config).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            server
                .serve_with_shutdown(listener, async move {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            url,
            shutdown: Some(tx),
            handle,
        }
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap();
    }
}

fn experiment(id: &str, scores: &[f64]) -> serde_json::Value {
    let responses: Vec<_> = scores
        .iter()
        .enumerate()
        .map(|(i, score)| {
            json!({
                "id": format!("{}-r{}", id, i + 1),
                "content": "x".repeat(200),
                "parameters": {"temperature": 0.5, "top_p": 0.9, "max_tokens": 200},
                "metrics": {
                    "coherence": score, "completeness": score, "readability": score,
                    "relevance": score, "overallScore": score
                },
                "generatedAt": "2024-03-01T10:00:00Z",
                "model": "gpt-4o-mini"
            })
        })
        .collect();
    json!({
        "id": id,
        "prompt": "Summarize the release notes",
        "parameterRange": {
            "temperature": {"min": 0.1, "max": 1.0, "step": 0.1},
            "top_p": {"min": 0.1, "max": 1.0, "step": 0.1},
            "max_tokens": {"min": 100, "max": 1000, "step": 100}
        },
        "responses": responses,
        "createdAt": "2024-03-01T10:00:00Z",
        "updatedAt": "2024-03-01T10:00:00Z",
        "totalRuns": scores.len()
    })
}

#[tokio::test]
async fn test_workbench_generate_through_proxy() {
    let mut backend = Server::new_async().await;
    let generate = backend
        .mock("POST", "/api/generate")
        .match_body(Matcher::PartialJson(json!({
            "prompt": "Summarize the release notes",
            "numberOfRuns": 3,
            "parameterRange": {"temperature": {"min": 0.3, "max": 0.9, "step": 0.3}}
        })))
        .with_status(200)
        .with_body(json!({"success": true, "data": experiment("exp-1", &[0.6, 0.9, 0.75])}).to_string())
        .expect(1)
        .create_async()
        .await;
    let proxy = RunningProxy::start(&backend.url()).await;
    let api = ProxyClient::new(&proxy.url).unwrap();

    let mut workbench = Workbench::new();
    workbench.editor_mut().update(Parameter::Temperature, Field::Min, 0.3);
    workbench.editor_mut().update(Parameter::Temperature, Field::Max, 0.9);
    workbench.editor_mut().update(Parameter::Temperature, Field::Step, 0.3);
    let form = GenerationRequestBuilder::new()
        .prompt("  Summarize the release notes ")
        .runs(RunCount::Three);
    let request = workbench.prepare(&form).unwrap();

    let experiment = workbench.generate(&api, request).await.unwrap();
    assert_eq!(experiment.id, "exp-1");
    let summary = workbench.summary().unwrap();
    assert_eq!(summary.best, Some(0.9));
    assert!((summary.average.unwrap() - 0.75).abs() < 1e-9);
    assert!(!workbench.is_generating());

    generate.assert_async().await;
    proxy.stop().await;
}

#[tokio::test]
async fn test_backend_failure_surfaces_message_and_status() {
    let mut backend = Server::new_async().await;
    let _failing = backend
        .mock("POST", "/api/generate")
        .with_status(502)
        .with_body(r#"{"success":false,"error":"Model provider unavailable"}"#)
        .create_async()
        .await;
    let proxy = RunningProxy::start(&backend.url()).await;
    let api = ProxyClient::new(&proxy.url).unwrap();

    let mut workbench = Workbench::new();
    let request = workbench
        .prepare(&GenerationRequestBuilder::new().prompt("hello"))
        .unwrap();
    let err = workbench.generate(&api, request).await.unwrap_err();

    match err {
        CoreError::Backend { message, status, .. } => {
            assert_eq!(message, "Model provider unavailable");
            assert_eq!(status, Some(502));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(workbench.current_experiment().is_none());
    assert!(!workbench.is_generating());
    proxy.stop().await;
}

#[tokio::test]
async fn test_history_list_delete_and_export() {
    let mut backend = Server::new_async().await;
    let _listing = backend
        .mock("GET", "/api/experiments")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "1".into()),
            Matcher::UrlEncoded("limit".into(), "10".into()),
        ]))
        .with_status(200)
        .with_body(
            json!({"success": true, "data": {
                "experiments": [experiment("exp-1", &[0.5]), experiment("exp-2", &[0.8, 0.4])],
                "total": 2
            }})
            .to_string(),
        )
        .create_async()
        .await;
    let delete = backend
        .mock("DELETE", "/api/experiments/exp-1")
        .with_status(200)
        .with_body(r#"{"success":true}"#)
        .expect(1)
        .create_async()
        .await;
    let _export = backend
        .mock("POST", "/api/export")
        .match_body(Matcher::Json(json!({
            "experimentId": "exp-2",
            "format": "csv",
            "includeMetrics": true,
            "includeDetails": false
        })))
        .with_status(200)
        .with_header("content-type", "text/csv")
        .with_body("id,overall\nexp-2-r1,0.8\n")
        .create_async()
        .await;
    let proxy = RunningProxy::start(&backend.url()).await;
    let api = ProxyClient::new(&proxy.url).unwrap();

    let mut history = ExperimentHistory::default();
    assert_eq!(history.refresh(&api).await, &ListState::Loaded);
    assert_eq!(history.experiments().len(), 2);

    assert_eq!(
        history.delete(&api, "exp-1", false).await.unwrap(),
        DeleteOutcome::Cancelled
    );
    assert_eq!(history.experiments().len(), 2);
    assert_eq!(
        history.delete(&api, "exp-1", true).await.unwrap(),
        DeleteOutcome::Deleted
    );
    assert_eq!(history.experiments().len(), 1);
    assert_eq!(history.experiments()[0].id, "exp-2");

    history.toggle_export_menu("exp-2");
    let file = history.export(&api, "exp-2", ExportFormat::Csv).await.unwrap();
    assert_eq!(file.filename, "experiment_exp-2.csv");
    assert_eq!(file.content_type, "text/csv");
    assert_eq!(file.content_disposition, "attachment");
    assert_eq!(file.bytes, b"id,overall\nexp-2-r1,0.8\n");
    assert!(!history.is_export_menu_open("exp-2"));

    delete.assert_async().await;
    proxy.stop().await;
}

#[tokio::test]
async fn test_history_error_state_when_backend_down() {
    let proxy = RunningProxy::start("http://127.0.0.1:1").await;
    let api = ProxyClient::new(&proxy.url).unwrap();

    let mut history = ExperimentHistory::default();
    assert_eq!(
        history.refresh(&api).await,
        &ListState::Error("Internal server error".to_string())
    );
    proxy.stop().await;
}
