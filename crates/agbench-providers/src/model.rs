use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Model capability class the pipeline resolves handlers by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelType {
    TextSmall,
    TextLarge,
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::TextSmall => write!(f, "text_small"),
            ModelType::TextLarge => write!(f, "text_large"),
        }
    }
}

/// Generation request handed to a model handler.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub stop: Vec<String>,
}

impl ModelRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.5,
            max_tokens: 2048,
            stop: Vec::new(),
        }
    }
}

/// Async text generation behind a provider. Handlers own their own
/// rate-limiting and token accounting, and must not raise on ordinary
/// upstream 4xx/5xx errors: they catch, log, and return an empty string.
/// Timeouts and retries are the pipeline's concern.
#[async_trait]
pub trait ModelHandler: Send + Sync {
    async fn generate(&self, request: &ModelRequest) -> String;
}

struct ModelEntry {
    model_type: ModelType,
    provider: String,
    handler: Arc<dyn ModelHandler>,
}

/// Maps (model type, provider name) to handlers. Registration order is
/// meaningful: resolution by model type alone is first-registered-wins,
/// with an optional provider override from the run configuration.
/// Read-only after startup; concurrent reads are safe.
#[derive(Default)]
pub struct ModelRegistry {
    entries: Vec<ModelEntry>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        model_type: ModelType,
        provider: impl Into<String>,
        handler: Arc<dyn ModelHandler>,
    ) {
        self.entries.push(ModelEntry {
            model_type,
            provider: provider.into(),
            handler,
        });
    }

    /// Resolve a handler for the model type. When `provider` is given, only
    /// that provider's registration is considered.
    pub fn resolve(
        &self,
        model_type: ModelType,
        provider: Option<&str>,
    ) -> Result<Arc<dyn ModelHandler>> {
        self.entries
            .iter()
            .find(|e| {
                e.model_type == model_type
                    && provider.map(|p| e.provider.eq_ignore_ascii_case(p)).unwrap_or(true)
            })
            .map(|e| e.handler.clone())
            .ok_or_else(|| match provider {
                Some(p) => Error::UnknownModel(format!("{} (provider '{}')", model_type, p)),
                None => Error::UnknownModel(model_type.to_string()),
            })
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.provider.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    #[async_trait]
    impl ModelHandler for Fixed {
        async fn generate(&self, _request: &ModelRequest) -> String {
            self.0.to_string()
        }
    }

    #[tokio::test]
    async fn test_first_registered_wins() {
        let mut registry = ModelRegistry::new();
        registry.register(ModelType::TextLarge, "alpha", Arc::new(Fixed("a")));
        registry.register(ModelType::TextLarge, "beta", Arc::new(Fixed("b")));

        let handler = registry.resolve(ModelType::TextLarge, None).unwrap();
        assert_eq!(handler.generate(&ModelRequest::new("x")).await, "a");
    }

    #[tokio::test]
    async fn test_provider_override() {
        let mut registry = ModelRegistry::new();
        registry.register(ModelType::TextLarge, "alpha", Arc::new(Fixed("a")));
        registry.register(ModelType::TextLarge, "beta", Arc::new(Fixed("b")));

        let handler = registry.resolve(ModelType::TextLarge, Some("BETA")).unwrap();
        assert_eq!(handler.generate(&ModelRequest::new("x")).await, "b");

        assert!(registry.resolve(ModelType::TextSmall, None).is_err());
    }
}
