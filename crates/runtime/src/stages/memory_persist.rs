//! Memory persistence: fire-and-forget capture of the completed
//! exchange into long-term memory.

use std::sync::Arc;

use herald_domain::Result;

use crate::context::TurnContext;
use crate::pipeline::TurnStage;
use crate::state::RuntimeState;

use super::ORDER_MEMORY_PERSIST;

pub struct MemoryPersistStage {
    state: Arc<RuntimeState>,
}

impl MemoryPersistStage {
    pub fn new(state: Arc<RuntimeState>) -> Self {
        Self { state }
    }
}

#[async_trait::async_trait]
impl TurnStage for MemoryPersistStage {
    fn name(&self) -> &'static str {
        "memory-persist"
    }

    fn order(&self) -> u32 {
        ORDER_MEMORY_PERSIST
    }

    fn should_process(&self, ctx: &TurnContext) -> bool {
        ctx.final_answer_ready && ctx.llm_response.is_some()
    }

    async fn process(&self, ctx: &mut TurnContext) -> Result<()> {
        let Some(user_text) = ctx.last_user_text() else {
            return Ok(());
        };
        let assistant_text = ctx
            .llm_response
            .as_ref()
            .map(|r| r.content_str().to_owned())
            .unwrap_or_default();
        if assistant_text.is_empty() {
            return Ok(());
        }

        let memory = self.state.memory.clone();
        let session_id = ctx.session_id();
        tokio::spawn(async move {
            if let Err(e) = memory
                .persist_exchange(session_id, user_text, assistant_text)
                .await
            {
                tracing::warn!(error = %e, "memory persist failed");
            }
        });
        Ok(())
    }
}
