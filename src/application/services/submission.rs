//! Submission pipeline: persist -> parse -> fetch -> render.
//!
//! One run at a time. Each run gets a generation number from a watch
//! channel; bumping the generation cancels the run at its next remote call
//! and keeps it away from the surface.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult, Document, RemoteResultExt, Stage};
use crate::config::BusyPolicy;
use crate::domain::{Diagram, SyntaxTree, TraceDocument, TreeDocument, TreeLayoutEngine};
use crate::infrastructure::traits::{DiagramSurface, ParserBackend};
use crate::infrastructure::RemoteError;

use super::status::StatusReporter;

pub const PROCESSING_MESSAGE: &str = "Processing your code...";
pub const SUCCESS_MESSAGE: &str = "Code processed successfully!";
pub const CANCELLED_MESSAGE: &str = "Submission cancelled";
pub const IDLE_LABEL: &str = "Convert & Visualize";
pub const BUSY_LABEL: &str = "Processing...";

/// How the last run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing submitted yet
    Ready,
    Succeeded,
    /// Failed, with the stage when a remote step was at fault
    Failed(Option<Stage>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle(Outcome),
    Submitting,
    Parsing,
    FetchingResults,
    Rendering,
}

/// State of the submit control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerState {
    pub enabled: bool,
    pub label: &'static str,
}

/// A successful run: what is on the surface now.
#[derive(Debug)]
pub struct Rendered {
    pub generation: u64,
    pub tree: SyntaxTree,
    pub diagram: Diagram,
    /// Fetched and validated, not drawn
    pub trace: TraceDocument,
}

pub struct SubmissionController {
    backend: Arc<dyn ParserBackend>,
    surface: Arc<dyn DiagramSurface>,
    status: Arc<StatusReporter>,
    engine: TreeLayoutEngine,
    timeout: Option<Duration>,
    policy: BusyPolicy,
    generation: watch::Sender<u64>,
    /// Generation of the run holding the trigger
    owner: Mutex<Option<u64>>,
    phase: Mutex<Phase>,
    displayed: Mutex<Option<Arc<Rendered>>>,
}

/// Releases the trigger when a run ends, however it ends.
struct FlightGuard<'a> {
    controller: &'a SubmissionController,
    generation: u64,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut owner = self.controller.owner.lock().unwrap_or_else(|e| e.into_inner());
        if *owner == Some(self.generation) {
            *owner = None;
        }
    }
}

impl SubmissionController {
    pub fn new(
        backend: Arc<dyn ParserBackend>,
        surface: Arc<dyn DiagramSurface>,
        status: Arc<StatusReporter>,
        engine: TreeLayoutEngine,
    ) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            backend,
            surface,
            status,
            engine,
            timeout: None,
            policy: BusyPolicy::default(),
            generation,
            owner: Mutex::new(None),
            phase: Mutex::new(Phase::Idle(Outcome::Ready)),
            displayed: Mutex::new(None),
        }
    }

    /// Per-call timeout for the four remote steps.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: BusyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn trigger(&self) -> TriggerState {
        let busy = self.owner.lock().unwrap_or_else(|e| e.into_inner()).is_some();
        TriggerState {
            enabled: !busy || self.policy == BusyPolicy::Supersede,
            label: if busy { BUSY_LABEL } else { IDLE_LABEL },
        }
    }

    /// Latest successful run, if any.
    pub fn displayed(&self) -> Option<Arc<Rendered>> {
        self.displayed.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn current_generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Cancel the run in flight, if any. Returns whether there was one.
    pub fn cancel(&self) -> bool {
        let running = self.owner.lock().unwrap_or_else(|e| e.into_inner()).is_some();
        if running {
            self.generation.send_modify(|g| *g += 1);
            info!("cancel: generation now {}", self.current_generation());
            self.status.info(CANCELLED_MESSAGE);
        }
        running
    }

    /// Run the whole pipeline for `source`.
    ///
    /// Every outcome except `Busy` and stale runs ends in exactly one status
    /// report. A failure leaves the surface as it was.
    #[instrument(level = "debug", skip(self, source), fields(bytes = source.len()))]
    pub async fn submit(&self, source: &str) -> ApplicationResult<Arc<Rendered>> {
        // a disabled trigger does nothing, whatever the input
        if !self.trigger().enabled {
            warn!("submit: {}", ApplicationError::Busy);
            return Err(ApplicationError::Busy);
        }

        let code = source.trim();
        if code.is_empty() {
            warn!("submit: empty source");
            self.status.error(ApplicationError::Validation.to_string());
            if self.owner.lock().unwrap_or_else(|e| e.into_inner()).is_none() {
                self.set_phase(Phase::Idle(Outcome::Failed(None)));
            }
            return Err(ApplicationError::Validation);
        }

        let guard = self.begin().inspect_err(|e| warn!("submit: {}", e))?;
        let generation = guard.generation;
        self.status.info(PROCESSING_MESSAGE);

        let result = self.run(code, generation).await;
        match &result {
            Ok(rendered) => {
                info!("submit: rendered {} nodes", rendered.diagram.nodes.len());
                self.status.success(SUCCESS_MESSAGE);
                self.set_phase(Phase::Idle(Outcome::Succeeded));
            }
            Err(e) if self.is_current(generation) => {
                warn!("submit: {}", e);
                self.status.error(format!("Error: {e}"));
                self.set_phase(Phase::Idle(Outcome::Failed(e.stage())));
            }
            Err(e) => {
                debug!("submit: stale generation {} ended: {}", generation, e);
                if self.owns_trigger(generation) {
                    // cancelled rather than superseded
                    self.set_phase(Phase::Idle(Outcome::Failed(None)));
                }
            }
        }
        drop(guard);
        result
    }

    fn begin(&self) -> ApplicationResult<FlightGuard<'_>> {
        let mut owner = self.owner.lock().unwrap_or_else(|e| e.into_inner());
        if owner.is_some() && self.policy == BusyPolicy::Reject {
            return Err(ApplicationError::Busy);
        }
        self.generation.send_modify(|g| *g += 1);
        let generation = self.current_generation();
        *owner = Some(generation);
        debug!("begin: generation {}", generation);
        Ok(FlightGuard {
            controller: self,
            generation,
        })
    }

    fn owns_trigger(&self, generation: u64) -> bool {
        *self.owner.lock().unwrap_or_else(|e| e.into_inner()) == Some(generation)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.current_generation() == generation
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = phase;
    }

    fn advance(&self, generation: u64, phase: Phase) -> ApplicationResult<()> {
        if !self.is_current(generation) {
            return Err(ApplicationError::Cancelled);
        }
        self.set_phase(phase);
        Ok(())
    }

    async fn run(&self, code: &str, generation: u64) -> ApplicationResult<Arc<Rendered>> {
        self.advance(generation, Phase::Submitting)?;
        self.remote(Stage::Persist, generation, self.backend.save_code(code))
            .await?;

        self.advance(generation, Phase::Parsing)?;
        self.remote(Stage::Parse, generation, self.backend.run_parser())
            .await?;

        self.advance(generation, Phase::FetchingResults)?;
        let (tree_text, trace_text) = tokio::try_join!(
            self.remote(Stage::FetchTree, generation, self.backend.fetch_tree()),
            self.remote(Stage::FetchTrace, generation, self.backend.fetch_trace()),
        )?;

        self.advance(generation, Phase::Rendering)?;
        let document = TreeDocument::from_json(&tree_text).map_err(|source| ApplicationError::Parse {
            document: Document::Tree,
            source,
        })?;
        let trace = TraceDocument::from_json(&trace_text).map_err(|source| ApplicationError::Parse {
            document: Document::Trace,
            source,
        })?;
        debug!("run: trace has {} entries", trace.entry_count());

        let tree = SyntaxTree::from_document(&document)?;
        let diagram = self.engine.layout(&tree);

        // no await past this point: the check and the draw cannot interleave
        // with another run
        self.advance(generation, Phase::Rendering)?;
        self.surface.replace(&diagram).map_err(|e| ApplicationError::Render {
            message: e.to_string(),
        })?;

        let rendered = Arc::new(Rendered {
            generation,
            tree,
            diagram,
            trace,
        });
        *self.displayed.lock().unwrap_or_else(|e| e.into_inner()) = Some(rendered.clone());
        Ok(rendered)
    }

    /// One remote step under the per-call timeout, abandoned as soon as the
    /// generation moves on.
    async fn remote<T>(
        &self,
        stage: Stage,
        generation: u64,
        call: impl Future<Output = Result<T, RemoteError>>,
    ) -> ApplicationResult<T> {
        debug!("remote: {}", stage);
        let timeout = self.timeout;
        let call = async move {
            match timeout {
                Some(after) => match tokio::time::timeout(after, call).await {
                    Ok(result) => result.at_stage(stage),
                    Err(_) => Err(ApplicationError::Timeout { stage, after }),
                },
                None => call.await.at_stage(stage),
            }
        };

        let mut generations = self.generation.subscribe();
        tokio::select! {
            biased;
            _ = superseded(&mut generations, generation) => Err(ApplicationError::Cancelled),
            result = call => result,
        }
    }
}

/// Resolves once the generation differs from `generation`.
async fn superseded(generations: &mut watch::Receiver<u64>, generation: u64) {
    let changed = generations
        .wait_for(|&current| current != generation)
        .await
        .map(|_| ())
        .is_ok();
    if !changed {
        // sender lives as long as the controller
        std::future::pending::<()>().await;
    }
}
