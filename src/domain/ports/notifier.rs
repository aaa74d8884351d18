use async_trait::async_trait;

use crate::domain::errors::EngineResult;
use crate::domain::models::Assessment;

/// Outbound notification fired once an assessment reaches a terminal
/// state. Delivery failure never fails finalization.
#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    async fn assessment_finished(&self, assessment: &Assessment) -> EngineResult<()>;
}

/// Notifier that drops all notifications. Default when no webhook is
/// configured, and the usual choice in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

#[async_trait]
impl CompletionNotifier for NullNotifier {
    async fn assessment_finished(&self, _assessment: &Assessment) -> EngineResult<()> {
        Ok(())
    }
}
