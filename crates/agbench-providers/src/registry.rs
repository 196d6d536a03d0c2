use std::collections::BTreeMap;
use std::sync::Arc;

use agbench_types::TurnResult;

use crate::actions::ActionRegistry;
use crate::error::{Error, Result};
use crate::model::ModelRegistry;
use crate::provider::ContextProvider;

/// Opaque rule referenced by CUSTOM outcomes, registered by id at startup.
pub type CustomPredicate = dyn Fn(&TurnResult) -> bool + Send + Sync;

/// The central runtime object: providers, actions, model handlers, and
/// custom predicates are all values in here, and every handler receives it
/// as its first argument. This resolves the provider↔action cycle without
/// back-references (the registry pattern).
///
/// Built once per scale point, read-only while scenarios run.
#[derive(Default)]
pub struct AgentRegistry {
    pub actions: ActionRegistry,
    pub models: ModelRegistry,
    providers: Vec<Arc<dyn ContextProvider>>,
    predicates: BTreeMap<String, Arc<CustomPredicate>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_provider(&mut self, provider: Arc<dyn ContextProvider>) -> Result<()> {
        if self.providers.iter().any(|p| p.name() == provider.name()) {
            return Err(Error::DuplicateProvider(provider.name().to_string()));
        }
        self.providers.push(provider);
        Ok(())
    }

    /// All providers, ordered by position ascending (stable for ties).
    pub fn providers(&self) -> Vec<Arc<dyn ContextProvider>> {
        let mut ordered = self.providers.clone();
        ordered.sort_by_key(|p| p.position());
        ordered
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers().iter().map(|p| p.name().to_string()).collect()
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub fn register_predicate(
        &mut self,
        id: impl Into<String>,
        predicate: Arc<CustomPredicate>,
    ) {
        self.predicates.insert(id.into(), predicate);
    }

    pub fn predicate(&self, id: &str) -> Option<&Arc<CustomPredicate>> {
        self.predicates.get(id)
    }

    /// Startup validation: a degradation target must exist and at least one
    /// model handler must be registered. Fatal configuration errors.
    pub fn validate(&self) -> Result<()> {
        self.actions.safe_default()?;
        if self.models.is_empty() {
            return Err(Error::UnknownModel("none registered".to_string()));
        }
        Ok(())
    }
}
