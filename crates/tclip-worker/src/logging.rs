//! Structured run logging.
//!
//! Every line emitted through [`RunLogger`] carries the run id and topic so
//! one selection run can be followed across the engine and Helix spans.

use tracing::{error, info, warn, Span};
use uuid::Uuid;

/// Logger bound to one selection run.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    topic: String,
}

impl RunLogger {
    /// Create a logger with a fresh run id.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            topic: topic.into(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(run_id = %self.run_id, topic = %self.topic, "Run started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(run_id = %self.run_id, topic = %self.topic, "Run progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(run_id = %self.run_id, topic = %self.topic, "Run warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(run_id = %self.run_id, topic = %self.topic, "Run error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(run_id = %self.run_id, topic = %self.topic, "Run completed: {}", message);
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Span to instrument the whole run with.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("run", run_id = %self.run_id, topic = %self.topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_logger_creation() {
        let logger = RunLogger::new("game:Among Us");
        assert_eq!(logger.topic(), "game:Among Us");
        assert!(Uuid::parse_str(logger.run_id()).is_ok());
    }

    #[test]
    fn test_run_ids_are_unique() {
        let a = RunLogger::new("t");
        let b = RunLogger::new("t");
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn test_logging_without_subscriber() {
        let logger = RunLogger::new("t");
        let _guard = logger.create_span().entered();
        logger.log_start("s");
        logger.log_progress("p");
        logger.log_warning("w");
        logger.log_error("e");
        logger.log_completion("c");
    }
}
