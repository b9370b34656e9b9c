use std::time::Duration;

use askdb_core::{AskDbError, JsonLlm, LlmJsonRequest, LlmJsonResponse};
use moka::future::Cache;
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_CAPACITY: u64 = 1_000;

/// Serves identical requests from memory for a fixed time.
///
/// The key is the serialized request (prompt, system message, model,
/// temperature, context); the per-call API key is not part of it. A hit
/// costs nothing, so its `cost` is reported as 0.
pub struct CachedLlm<L> {
    inner: L,
    cache: Cache<String, LlmJsonResponse>,
}

impl<L> CachedLlm<L> {
    pub fn new(inner: L) -> Self {
        Self::with_ttl(inner, DEFAULT_TTL, DEFAULT_CAPACITY)
    }

    pub fn with_ttl(inner: L, ttl: Duration, capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<L> JsonLlm for CachedLlm<L>
where
    L: JsonLlm,
{
    async fn ask_json(&self, request: LlmJsonRequest) -> Result<LlmJsonResponse, AskDbError> {
        let key = serde_json::to_string(&request)?;
        if let Some(hit) = self.cache.get(&key).await {
            debug!(model = %request.model, "llm cache hit");
            return Ok(LlmJsonResponse::new(hit.answer, 0.0));
        }
        let response = self.inner.ask_json(request).await?;
        self.cache.insert(key, response.clone()).await;
        Ok(response)
    }
}
