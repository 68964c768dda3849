//! Integration tests for the submission pipeline.
//!
//! The parser service and the display surface are in-memory fakes; the
//! backend records every call so ordering and short-circuiting can be
//! checked directly.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Barrier, Notify};

use astviz::application::services::{
    Outcome, Phase, Severity, Status, StatusReporter, SubmissionController, TriggerState,
};
use astviz::application::{ApplicationError, Stage};
use astviz::config::{BusyPolicy, Settings};
use astviz::domain::{Diagram, NodeCategory, TreeLayoutEngine};
use astviz::infrastructure::di::ServiceContainer;
use astviz::infrastructure::traits::{DiagramSurface, ParserBackend};
use astviz::infrastructure::RemoteError;
use astviz::util::testing;

const TREE_JSON: &str = r#"{"name":"Program","children":[{"name":"Function","children":[{"name":"FunctionName: main"},{"name":"ReturnType: int"}]}]}"#;
const TRACE_JSON: &str = r#"[{"step":1,"action":"shift"},{"step":2,"action":"reduce"}]"#;

// ============================================================
// Fakes
// ============================================================

#[derive(Default)]
struct FakeBackend {
    calls: Mutex<Vec<&'static str>>,
    saved: Mutex<Vec<String>>,
    tree: Mutex<Option<String>>,
    /// Call name that answers with HTTP 500
    fail_at: Option<&'static str>,
    /// Call name that never answers
    hang_at: Option<&'static str>,
    /// Held by the first `save_code` until notified
    gate: Mutex<Option<Arc<Notify>>>,
    /// Shared by both fetches; neither returns until the other has started
    rendezvous: Option<Arc<Barrier>>,
}

impl FakeBackend {
    fn new() -> Self {
        Self::default()
    }

    fn failing_at(call: &'static str) -> Self {
        Self {
            fail_at: Some(call),
            ..Self::default()
        }
    }

    fn hanging_at(call: &'static str) -> Self {
        Self {
            hang_at: Some(call),
            ..Self::default()
        }
    }

    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Mutex::new(Some(gate)),
            ..Self::default()
        }
    }

    fn fetching_together() -> Self {
        Self {
            rendezvous: Some(Arc::new(Barrier::new(2))),
            ..Self::default()
        }
    }

    fn with_tree(self, json: &str) -> Self {
        *self.tree.lock().unwrap() = Some(json.to_string());
        self
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn saved(&self) -> Vec<String> {
        self.saved.lock().unwrap().clone()
    }

    async fn answer(&self, call: &'static str) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(call);
        if self.hang_at == Some(call) {
            std::future::pending::<()>().await;
        }
        if self.fail_at == Some(call) {
            return Err(RemoteError::Status {
                url: format!("mem://{call}"),
                status: 500,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ParserBackend for FakeBackend {
    async fn save_code(&self, code: &str) -> Result<(), RemoteError> {
        self.saved.lock().unwrap().push(code.to_string());
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.answer("save").await
    }

    async fn run_parser(&self) -> Result<(), RemoteError> {
        self.answer("parse").await
    }

    async fn fetch_tree(&self) -> Result<String, RemoteError> {
        if let Some(rendezvous) = &self.rendezvous {
            rendezvous.wait().await;
        }
        self.answer("tree").await?;
        let tree = self.tree.lock().unwrap().clone();
        Ok(tree.unwrap_or_else(|| TREE_JSON.to_string()))
    }

    async fn fetch_trace(&self) -> Result<String, RemoteError> {
        if let Some(rendezvous) = &self.rendezvous {
            rendezvous.wait().await;
        }
        self.answer("trace").await?;
        Ok(TRACE_JSON.to_string())
    }

    async fn fetch_sample(&self) -> Result<String, RemoteError> {
        self.answer("sample").await?;
        Ok("int main() { return 0; }".to_string())
    }
}

#[derive(Default)]
struct RecordingSurface {
    drawn: Mutex<Vec<Diagram>>,
}

impl RecordingSurface {
    fn count(&self) -> usize {
        self.drawn.lock().unwrap().len()
    }

    fn last(&self) -> Option<Diagram> {
        self.drawn.lock().unwrap().last().cloned()
    }
}

impl DiagramSurface for RecordingSurface {
    fn replace(&self, diagram: &Diagram) -> io::Result<()> {
        self.drawn.lock().unwrap().push(diagram.clone());
        Ok(())
    }
}

struct Harness {
    backend: Arc<FakeBackend>,
    surface: Arc<RecordingSurface>,
    status: Arc<StatusReporter>,
    controller: SubmissionController,
}

fn harness(backend: FakeBackend) -> Harness {
    testing::init_test_setup();
    let backend = Arc::new(backend);
    let surface = Arc::new(RecordingSurface::default());
    let status = Arc::new(StatusReporter::new());
    let controller = SubmissionController::new(
        backend.clone(),
        surface.clone(),
        status.clone(),
        TreeLayoutEngine::default(),
    );
    Harness {
        backend,
        surface,
        status,
        controller,
    }
}

fn status_of(h: &Harness) -> (Severity, String) {
    let status = h.status.current().expect("status reported");
    (status.severity, status.message)
}

// ============================================================
// Happy path
// ============================================================

#[tokio::test]
async fn given_source_when_submit_then_calls_run_in_pipeline_order() {
    let h = harness(FakeBackend::new());

    let rendered = h.controller.submit("int main() { return 0; }").await.unwrap();

    let calls = h.backend.calls();
    assert_eq!(&calls[..2], &["save", "parse"]);
    assert_eq!(calls.len(), 4);
    assert!(calls[2..].contains(&"tree"));
    assert!(calls[2..].contains(&"trace"));
    assert_eq!(h.surface.count(), 1);
    assert_eq!(rendered.diagram.nodes.len(), 4);
    assert_eq!(rendered.trace.entry_count(), 2);
    assert_eq!(
        status_of(&h),
        (Severity::Success, "Code processed successfully!".to_string())
    );
    assert_eq!(h.controller.phase(), Phase::Idle(Outcome::Succeeded));
}

#[tokio::test]
async fn given_padded_source_when_submit_then_saves_trimmed_text() {
    let h = harness(FakeBackend::new());

    h.controller.submit("\n\n  int x = 1;  \n").await.unwrap();

    assert_eq!(h.backend.saved(), vec!["int x = 1;".to_string()]);
}

#[tokio::test]
async fn given_program_with_function_when_submit_then_draws_two_nodes_one_link() {
    let h = harness(FakeBackend::new().with_tree(
        r#"{"name":"Program","children":[{"name":"Function: main"}]}"#,
    ));

    let rendered = h.controller.submit("int main() {}").await.unwrap();

    let diagram = &rendered.diagram;
    assert_eq!(diagram.nodes.len(), 2);
    assert_eq!(diagram.edges.len(), 1);
    let (root, leaf) = (&diagram.nodes[0], &diagram.nodes[1]);
    assert_eq!(root.category, NodeCategory::Program);
    assert_eq!(leaf.category, NodeCategory::Function);
    assert!(diagram.position(root).0 < diagram.position(leaf).0);
}

#[tokio::test]
async fn given_same_source_twice_when_submit_then_surface_replaced_with_identical_layout() {
    let h = harness(FakeBackend::new());

    let first = h.controller.submit("int main() {}").await.unwrap();
    let second = h.controller.submit("int main() {}").await.unwrap();

    assert_eq!(h.surface.count(), 2);
    assert_eq!(first.diagram, second.diagram);
    assert_eq!(
        first.diagram.relative_positions(),
        second.diagram.relative_positions()
    );
    assert!(second.generation > first.generation);
    assert_eq!(h.controller.displayed().unwrap().generation, second.generation);
}

// ============================================================
// Validation
// ============================================================

#[tokio::test]
async fn given_whitespace_source_when_submit_then_no_remote_calls() {
    let h = harness(FakeBackend::new());

    let err = h.controller.submit(" \n\t ").await.unwrap_err();

    assert!(matches!(err, ApplicationError::Validation));
    assert!(h.backend.calls().is_empty());
    assert!(h.backend.saved().is_empty());
    assert_eq!(h.surface.count(), 0);
    assert_eq!(
        status_of(&h),
        (Severity::Error, "Please enter some code first!".to_string())
    );
    assert!(h.controller.trigger().enabled);
}

// ============================================================
// Failures
// ============================================================

#[tokio::test]
async fn given_parse_failure_when_submit_then_no_fetch_and_stage_named() {
    let h = harness(FakeBackend::failing_at("parse"));

    let err = h.controller.submit("int main() {}").await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Parse));
    assert_eq!(h.backend.calls(), vec!["save", "parse"]);
    assert_eq!(h.surface.count(), 0);
    let (severity, message) = status_of(&h);
    assert_eq!(severity, Severity::Error);
    assert!(message.starts_with("Error: "), "got: {message}");
    assert!(message.contains("run parser"), "got: {message}");
}

#[tokio::test]
async fn given_trace_failure_when_tree_succeeds_then_nothing_rendered() {
    let h = harness(FakeBackend::failing_at("trace"));

    let err = h.controller.submit("int main() {}").await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::FetchTrace));
    assert!(h.backend.calls().contains(&"trace"));
    assert_eq!(h.surface.count(), 0);
    assert!(h.controller.displayed().is_none());
    let (_, message) = status_of(&h);
    assert!(message.contains("fetch trace document"), "got: {message}");
    assert_eq!(
        h.controller.phase(),
        Phase::Idle(Outcome::Failed(Some(Stage::FetchTrace)))
    );
}

#[tokio::test]
async fn given_rendered_diagram_when_later_run_fails_then_previous_diagram_stays() {
    let backend = FakeBackend::new();
    let h = harness(backend);
    let first = h.controller.submit("int main() {}").await.unwrap();

    *h.backend.tree.lock().unwrap() = Some("{not json".to_string());
    let err = h.controller.submit("int main() {}").await.unwrap_err();

    assert!(matches!(err, ApplicationError::Parse { .. }));
    assert_eq!(h.surface.count(), 1);
    assert_eq!(h.surface.last().unwrap(), first.diagram);
    assert_eq!(h.controller.displayed().unwrap().generation, first.generation);
}

#[tokio::test]
async fn given_unlabelled_node_when_submit_then_domain_error_reported() {
    let h = harness(FakeBackend::new().with_tree(
        r#"{"name":"Program","children":[{"name":""}]}"#,
    ));

    let err = h.controller.submit("int main() {}").await.unwrap_err();

    assert!(matches!(err, ApplicationError::Domain(_)));
    assert_eq!(h.surface.count(), 0);
    assert_eq!(status_of(&h).0, Severity::Error);
}

#[tokio::test]
async fn given_hanging_fetch_when_timeout_elapses_then_timeout_reported() {
    let backend = Arc::new(FakeBackend::hanging_at("tree"));
    let surface = Arc::new(RecordingSurface::default());
    let status = Arc::new(StatusReporter::new());
    let controller = SubmissionController::new(
        backend.clone(),
        surface.clone(),
        status.clone(),
        TreeLayoutEngine::default(),
    )
    .with_timeout(Some(Duration::from_millis(50)));

    let err = controller.submit("int main() {}").await.unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Timeout {
            stage: Stage::FetchTree,
            ..
        }
    ));
    assert_eq!(surface.count(), 0);
    assert!(controller.trigger().enabled);
    let message = status.current().unwrap().message;
    assert!(message.contains("fetch tree document"), "got: {message}");
}

// ============================================================
// Concurrency
// ============================================================

#[tokio::test]
async fn given_run_in_flight_when_submit_again_then_second_is_rejected() {
    let gate = Arc::new(Notify::new());
    let h = harness(FakeBackend::gated(gate.clone()));

    let first = h.controller.submit("int first;");
    let second = async {
        tokio::task::yield_now().await;
        let trigger = h.controller.trigger();
        let status = h.status.current();
        let result = h.controller.submit("int second;").await;
        gate.notify_one();
        (trigger, status, result)
    };
    let (first, (trigger, status, second)) = tokio::join!(first, second);

    assert!(first.is_ok());
    assert!(matches!(second, Err(ApplicationError::Busy)));
    assert_eq!(
        trigger,
        TriggerState {
            enabled: false,
            label: "Processing..."
        }
    );
    assert_eq!(status.unwrap().message, "Processing your code...");
    assert_eq!(h.backend.saved(), vec!["int first;".to_string()]);
    assert_eq!(h.surface.count(), 1);
    assert_eq!(status_of(&h).0, Severity::Success);
    assert_eq!(
        h.controller.trigger(),
        TriggerState {
            enabled: true,
            label: "Convert & Visualize"
        }
    );
}

#[tokio::test]
async fn given_run_in_flight_when_submit_blank_then_busy_and_status_untouched() {
    let gate = Arc::new(Notify::new());
    let h = harness(FakeBackend::gated(gate.clone()));

    let first = h.controller.submit("int first;");
    let second = async {
        tokio::task::yield_now().await;
        let result = h.controller.submit("   \n ").await;
        let status = h.status.current();
        let phase = h.controller.phase();
        gate.notify_one();
        (result, status, phase)
    };
    let (first, (second, status, phase)) = tokio::join!(first, second);

    assert!(first.is_ok());
    assert!(matches!(second, Err(ApplicationError::Busy)));
    assert_eq!(
        status.unwrap(),
        Status {
            message: "Processing your code...".to_string(),
            severity: Severity::Info,
        }
    );
    assert_eq!(phase, Phase::Submitting);
    assert_eq!(h.backend.saved(), vec!["int first;".to_string()]);
    assert_eq!(status_of(&h).0, Severity::Success);
}

#[tokio::test]
async fn given_source_when_fetching_results_then_tree_and_trace_are_in_flight_together() {
    let h = harness(FakeBackend::fetching_together());

    // each fetch waits for the other, so fetching one after the other never finishes
    let result = tokio::time::timeout(Duration::from_secs(5), h.controller.submit("int main() {}")).await;

    let rendered = result.expect("fetches ran one after the other").unwrap();
    assert_eq!(rendered.trace.entry_count(), 2);
    assert_eq!(h.surface.count(), 1);
    let calls = h.backend.calls();
    assert_eq!(&calls[..2], &["save", "parse"]);
    assert_eq!(calls.len(), 4);
}

#[tokio::test]
async fn given_supersede_policy_when_submit_again_then_stale_run_never_draws() {
    let gate = Arc::new(Notify::new());
    let backend = Arc::new(FakeBackend::gated(gate.clone()));
    let surface = Arc::new(RecordingSurface::default());
    let status = Arc::new(StatusReporter::new());
    let controller = SubmissionController::new(
        backend.clone(),
        surface.clone(),
        status.clone(),
        TreeLayoutEngine::default(),
    )
    .with_policy(BusyPolicy::Supersede);

    let first = controller.submit("int first;");
    let second = async {
        tokio::task::yield_now().await;
        assert!(controller.trigger().enabled);
        controller.submit("int second;").await
    };
    let (first, second) = tokio::join!(first, second);

    assert!(matches!(first, Err(ApplicationError::Cancelled)));
    let second = second.unwrap();
    assert_eq!(surface.count(), 1);
    assert_eq!(controller.displayed().unwrap().generation, second.generation);
    assert_eq!(
        status.current().unwrap().message,
        "Code processed successfully!"
    );
    assert_eq!(controller.phase(), Phase::Idle(Outcome::Succeeded));
}

#[tokio::test]
async fn given_run_in_flight_when_cancel_then_run_abandoned_and_trigger_released() {
    let gate = Arc::new(Notify::new());
    let h = harness(FakeBackend::gated(gate));

    let run = h.controller.submit("int main() {}");
    let cancel = async {
        tokio::task::yield_now().await;
        h.controller.cancel()
    };
    let (result, cancelled) = tokio::join!(run, cancel);

    assert!(cancelled);
    assert!(matches!(result, Err(ApplicationError::Cancelled)));
    assert_eq!(h.surface.count(), 0);
    assert!(!h.backend.calls().contains(&"parse"));
    assert_eq!(status_of(&h), (Severity::Info, "Submission cancelled".to_string()));
    assert_eq!(h.controller.phase(), Phase::Idle(Outcome::Failed(None)));
    assert!(h.controller.trigger().enabled);
}

// ============================================================
// Container wiring
// ============================================================

#[tokio::test]
async fn given_container_with_fakes_when_sample_loads_then_source_returned() {
    let backend = Arc::new(FakeBackend::new());
    let surface = Arc::new(RecordingSurface::default());
    let status = Arc::new(StatusReporter::new());
    let services = ServiceContainer::with_deps(Settings::default(), backend.clone(), surface, status.clone());

    let sample = services.sample.load().await;

    assert_eq!(sample.as_deref(), Some("int main() { return 0; }"));
    assert!(status.current().is_none());
}

#[tokio::test]
async fn given_failing_sample_when_load_then_none_and_status_untouched() {
    let backend = Arc::new(FakeBackend::failing_at("sample"));
    let surface = Arc::new(RecordingSurface::default());
    let status = Arc::new(StatusReporter::new());
    let services = ServiceContainer::with_deps(Settings::default(), backend, surface, status.clone());

    assert!(services.sample.load().await.is_none());
    assert!(status.current().is_none());
}
