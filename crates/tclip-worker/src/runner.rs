//! One-shot selection run: token, topic lookup, selection, hand-off.

use std::sync::Arc;

use tclip_engine::{SelectionConfig, SelectionEngine, SelectionReport};
use tclip_twitch::HelixClient;
use tracing::Instrument;

use crate::config::{Topic, WorkerConfig};
use crate::consumer::{JsonFileConsumer, LogConsumer, SelectionConsumer};
use crate::error::WorkerResult;
use crate::logging::RunLogger;

/// Drives a single selection run against Helix.
pub struct SelectionRunner {
    client: Arc<HelixClient>,
    engine: SelectionEngine,
    topic: Topic,
    consumers: Vec<Box<dyn SelectionConsumer>>,
}

impl SelectionRunner {
    /// Build the Helix client, the engine and the consumers from config.
    ///
    /// The log consumer is always installed; the JSON file consumer only
    /// when an output path is configured.
    pub fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let client = Arc::new(HelixClient::new(config.helix)?);

        let mut consumers: Vec<Box<dyn SelectionConsumer>> = vec![Box::new(LogConsumer)];
        if let Some(path) = config.output_path {
            consumers.push(Box::new(JsonFileConsumer::new(path)));
        }

        Self::with_consumers(client, config.selection, config.topic, consumers)
    }

    pub fn with_consumers(
        client: Arc<HelixClient>,
        selection: SelectionConfig,
        topic: Topic,
        consumers: Vec<Box<dyn SelectionConsumer>>,
    ) -> WorkerResult<Self> {
        let engine = SelectionEngine::new(client.clone(), client.clone(), selection)?;
        Ok(Self {
            client,
            engine,
            topic,
            consumers,
        })
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Run one selection and hand the result to every consumer.
    pub async fn run_once(&self) -> WorkerResult<SelectionReport> {
        let logger = RunLogger::new(self.topic.to_string());
        let span = logger.create_span();

        async {
            logger.log_start("selecting trending clip");

            let result = self.select(&logger).await;
            match &result {
                Ok(report) => logger.log_completion(&format!(
                    "{} ({})",
                    report.result.id, report.result.basis
                )),
                Err(e) => logger.log_error(&e.to_string()),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn select(&self, logger: &RunLogger) -> WorkerResult<SelectionReport> {
        let topic_id = self.resolve_topic().await?;
        logger.log_progress(&format!("resolved topic to game_id {}", topic_id));

        // Token is cached by the client, so this reuses the lookup token.
        let report = self.engine.run_with(&topic_id, self.client.as_ref()).await?;

        if report.filter_fallback_used {
            logger.log_warning("filters removed every candidate, ranked the unfiltered batch");
        }

        for consumer in &self.consumers {
            consumer.consume(&report).await?;
            logger.log_progress(&format!("handed off to {}", consumer.name()));
        }

        Ok(report)
    }

    async fn resolve_topic(&self) -> WorkerResult<String> {
        match &self.topic {
            Topic::Id(id) => Ok(id.clone()),
            Topic::Name(name) => {
                let token = self.client.app_token().await?;
                Ok(self.client.get_game_id(name, &token).await?)
            }
        }
    }
}
