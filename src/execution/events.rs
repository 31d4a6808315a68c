//! Execution events and their subscribers

use crate::core::{RunStatus, StageKind};
use crate::execution::SchedulingStrategy;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Events that can occur during a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    RunStarted {
        pipeline_id: String,
        run_id: Uuid,
        strategy: SchedulingStrategy,
        stages: usize,
    },
    StageStarted {
        pipeline_id: String,
        stage: String,
        kind: StageKind,
    },
    StageCompleted {
        pipeline_id: String,
        stage: String,
    },
    StageFailed {
        pipeline_id: String,
        stage: String,
        error: String,
    },
    StageCancelled {
        pipeline_id: String,
        stage: String,
    },
    RunFinished {
        pipeline_id: String,
        run_id: Uuid,
        status: RunStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Fan-out of events to every registered handler
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<RwLock<Vec<EventHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event handler
    pub async fn subscribe<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.handlers.write().await.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    pub async fn emit(&self, event: ExecutionEvent) {
        let handlers = self.handlers.read().await;
        for handler in handlers.iter() {
            handler(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_every_handler_receives_events() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b"] {
            let seen = seen.clone();
            bus.subscribe(move |event| {
                if let ExecutionEvent::StageCompleted { stage, .. } = event {
                    seen.lock().unwrap().push(format!("{}:{}", tag, stage));
                }
            })
            .await;
        }

        bus.emit(ExecutionEvent::StageCompleted {
            pipeline_id: "p".to_string(),
            stage: "test".to_string(),
        })
        .await;

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec!["a:test".to_string(), "b:test".to_string()]);
    }
}
