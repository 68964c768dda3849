//! Sample source preloading.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::infrastructure::traits::ParserBackend;

/// Fetches the sample source shown before the first submission.
///
/// Failures are logged and never reach the status line.
pub struct SampleLoader {
    backend: Arc<dyn ParserBackend>,
    timeout: Option<Duration>,
}

impl SampleLoader {
    pub fn new(backend: Arc<dyn ParserBackend>, timeout: Option<Duration>) -> Self {
        Self { backend, timeout }
    }

    pub async fn load(&self) -> Option<String> {
        let fetch = self.backend.fetch_sample();
        let result = match self.timeout {
            Some(after) => match tokio::time::timeout(after, fetch).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Error loading sample code: timed out after {:?}", after);
                    return None;
                }
            },
            None => fetch.await,
        };
        match result {
            Ok(code) => {
                debug!("loaded sample source: {} bytes", code.len());
                Some(code)
            }
            Err(e) => {
                warn!("Error loading sample code: {}", e);
                None
            }
        }
    }
}
