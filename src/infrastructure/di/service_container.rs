//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{SampleLoader, StatusListener, StatusReporter, SubmissionController};
use crate::config::Settings;
use crate::domain::TreeLayoutEngine;
use crate::infrastructure::error::InfraResult;
use crate::infrastructure::http::HttpBackend;
use crate::infrastructure::svg::SvgFileSurface;
use crate::infrastructure::traits::{DiagramSurface, ParserBackend};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Parser service abstraction
    pub backend: Arc<dyn ParserBackend>,

    /// Display surface abstraction
    pub surface: Arc<dyn DiagramSurface>,

    /// Status line shared by all services
    pub status: Arc<StatusReporter>,

    pub controller: SubmissionController,

    pub sample: SampleLoader,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings, listener: Option<Arc<dyn StatusListener>>) -> InfraResult<Self> {
        let backend = Arc::new(HttpBackend::new(settings.server.clone())?);
        let surface = Arc::new(SvgFileSurface::new(settings.render.output.clone()));
        let status = match listener {
            Some(listener) => StatusReporter::with_listener(listener),
            None => StatusReporter::new(),
        };
        Ok(Self::with_deps(settings, backend, surface, Arc::new(status)))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        backend: Arc<dyn ParserBackend>,
        surface: Arc<dyn DiagramSurface>,
        status: Arc<StatusReporter>,
    ) -> Self {
        let settings = Arc::new(settings);
        let timeout = settings.server.timeout();

        let controller = SubmissionController::new(
            backend.clone(),
            surface.clone(),
            status.clone(),
            TreeLayoutEngine::new(settings.render.layout()),
        )
        .with_timeout(timeout)
        .with_policy(settings.pipeline.on_busy);
        let sample = SampleLoader::new(backend.clone(), timeout);

        Self {
            settings,
            backend,
            surface,
            status,
            controller,
            sample,
        }
    }
}
