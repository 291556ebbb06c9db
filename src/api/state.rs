use std::sync::Arc;
use std::time::Instant;

use crate::predictor::Predictor;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    /// Loaded once at startup, read-only afterwards
    pub predictor: Arc<Predictor>,

    /// Application start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(predictor: Predictor) -> Self {
        Self::from_shared(Arc::new(predictor))
    }

    pub fn from_shared(predictor: Arc<Predictor>) -> Self {
        Self {
            predictor,
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
