use techflow_core::{AnalysisClient, AnalysisResult, Error, LogRecord};
use techflow_model::ModelProvider;

use crate::demo::demo_logs;

/// The support-log dashboard: a fixed batch of logs and the latest
/// analysis of them.
pub struct Dashboard {
    client: AnalysisClient,
    logs: Vec<LogRecord>,
    result: Option<AnalysisResult>,
}

impl Dashboard {
    /// Creates a dashboard over [`demo_logs`].
    #[inline]
    pub fn new(client: AnalysisClient) -> Self {
        Self::with_logs(client, demo_logs())
    }

    /// Creates a dashboard over [`demo_logs`] with a specified model
    /// provider.
    #[inline]
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        Self::new(AnalysisClient::new(provider))
    }

    /// Creates a dashboard over `logs`.
    pub fn with_logs(client: AnalysisClient, logs: Vec<LogRecord>) -> Self {
        Self {
            client,
            logs,
            result: None,
        }
    }

    /// Returns the logs being analyzed.
    #[inline]
    pub fn logs(&self) -> &[LogRecord] {
        &self.logs
    }

    /// Returns the latest successful analysis, if any.
    #[inline]
    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// Analyzes the logs and stores the result.
    ///
    /// On failure the previous result is kept.
    pub async fn analyze(&mut self) -> Result<&AnalysisResult, Error> {
        let result = self
            .client
            .analyze(&self.logs)
            .await
            .inspect_err(|err| warn!("analysis failed: {err}"))?;
        Ok(self.result.insert(result))
    }
}

#[cfg(test)]
mod tests {
    use techflow_core::ErrorKind;
    use techflow_test_model::{PresetResponse, TestModelProvider};

    use super::*;

    const REPLY: &str = r#"{
        "sentimentScore": 38,
        "topics": [
            { "name": "Firmware update", "count": 1 },
            { "name": "Overheating", "count": 1 },
            { "name": "Wait times", "count": 1 }
        ],
        "summary": "Mixed feedback with a power failure and an overheating device.",
        "urgentIssues": ["Luca B. reports E-500 with the device burning hot"]
    }"#;

    #[tokio::test]
    async fn test_analyze() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_text(REPLY));
        let mut dashboard = Dashboard::with_model_provider(provider.clone());
        assert!(dashboard.result().is_none());
        assert_eq!(dashboard.logs().len(), 6);

        let result = dashboard.analyze().await.unwrap();
        assert_eq!(result.sentiment_score, 38.0);
        assert_eq!(result.topics.len(), 3);

        let request = &provider.requests()[0];
        assert!(request.prompt.contains("[12:10] Sara M.:"));
    }

    #[tokio::test]
    async fn test_failure_keeps_result() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_text(REPLY));
        provider.add_response(PresetResponse::with_text("not json"));
        let mut dashboard = Dashboard::with_model_provider(provider);

        let first = dashboard.analyze().await.unwrap().clone();
        let err = dashboard.analyze().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        assert_eq!(dashboard.result(), Some(&first));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let provider = TestModelProvider::default();
        let mut dashboard = Dashboard::with_logs(
            AnalysisClient::new(provider.clone()),
            vec![],
        );

        let err = dashboard.analyze().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(dashboard.result().is_none());
        assert_eq!(provider.request_count(), 0);
    }
}
