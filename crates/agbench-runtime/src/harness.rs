use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use agbench_engine::{always_reply_baseline, build_scaling_curves, random_baseline};
use agbench_env::EnvironmentDriver;
use agbench_providers::{
    AgentRegistry, ModelHandler, ModelType, bootstrap_registry, desktop_actions,
    distractor_actions, distractor_providers,
};
use agbench_types::{DecisionTrace, RunRecord, ScalePoint, Scenario, ScenarioFilter};

use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::runner::run_scenario;

/// Builds one driver instance per scenario. Drivers that cannot be
/// isolated should force `concurrency = 1` in the run configuration.
pub type DriverFactory = Arc<dyn Fn() -> Box<dyn EnvironmentDriver> + Send + Sync>;

/// Scale point whose catalog defines the random-baseline action pool.
const BASELINE_SCALE: ScalePoint = ScalePoint {
    action_count: 50,
    provider_count: 18,
    conversation_prefill: 30,
};

/// Top-level facade: owns the run configuration and the model handler,
/// builds per-scale-point registries, fans the matrix out under the
/// concurrency cap, and folds results into a RunRecord.
pub struct Harness {
    config: Arc<RunConfig>,
    model: Arc<dyn ModelHandler>,
    model_provider_name: String,
}

impl Harness {
    pub fn new(
        config: RunConfig,
        model: Arc<dyn ModelHandler>,
        model_provider_name: impl Into<String>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            model,
            model_provider_name: model_provider_name.into(),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Assemble the registry for one scale point: bootstrap providers and
    /// actions, the desktop set, then distractors topped up to the scale
    /// point's counts, plus the model handler.
    pub fn build_registry(&self, scale_point: ScalePoint) -> Result<AgentRegistry> {
        let mut registry = AgentRegistry::new();
        bootstrap_registry(&mut registry)?;
        for spec in desktop_actions() {
            registry.actions.register(spec)?;
        }

        let action_gap = scale_point.action_count.saturating_sub(registry.actions.len());
        for spec in distractor_actions(action_gap) {
            registry.actions.register(spec)?;
        }

        let provider_gap = scale_point
            .provider_count
            .saturating_sub(registry.provider_count());
        for provider in distractor_providers(provider_gap) {
            registry.register_provider(provider)?;
        }

        registry.models.register(
            ModelType::TextLarge,
            self.model_provider_name.clone(),
            self.model.clone(),
        );
        registry.validate()?;
        Ok(registry)
    }

    /// Execute the full matrix (configs × scale points × trials ×
    /// scenarios) and compute baselines and curves. Partial results are
    /// returned when the cancel token fires mid-run.
    pub async fn run(
        &self,
        scenarios: &[Scenario],
        driver_factory: DriverFactory,
        cancel: CancellationToken,
    ) -> Result<(RunRecord, Vec<DecisionTrace>)> {
        let started = Instant::now();
        let mut record = RunRecord::new(
            self.config.benchmark_name.clone(),
            self.config.model_name.clone(),
            self.config.seed,
        );
        record.config_hash = self.config.config_hash();

        let capabilities = driver_factory().capabilities();

        // One registry per scale point, shared across configs and trials.
        let mut registries: BTreeMap<String, Arc<AgentRegistry>> = BTreeMap::new();
        for scale_point in &self.config.scale_points {
            registries.insert(
                scale_point.label(),
                Arc::new(self.build_registry(*scale_point)?),
            );
        }

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();
        let mut seq: u64 = 0;

        for config_name in &self.config.config_names {
            let selected = filter_for_config(scenarios, config_name);
            if selected.is_empty() {
                warn!(config = %config_name, "no scenarios match this config");
                continue;
            }

            for scale_point in &self.config.scale_points {
                let registry = registries[&scale_point.label()].clone();
                info!(
                    config = %config_name,
                    scale = %scale_point.label(),
                    scenarios = selected.len(),
                    "running scale point"
                );

                for _trial in 0..self.config.trials.max(1) {
                    for scenario in &selected {
                        if !scenario
                            .required_capabilities
                            .iter()
                            .all(|cap| capabilities.contains(cap))
                        {
                            warn!(
                                scenario = %scenario.id,
                                "skipping: driver lacks required capabilities"
                            );
                            continue;
                        }

                        let registry = registry.clone();
                        let config = self.config.clone();
                        let scenario = scenario.clone();
                        let scale_point = *scale_point;
                        let config_name = config_name.clone();
                        let driver_factory = driver_factory.clone();
                        let cancel = cancel.clone();
                        let semaphore = semaphore.clone();
                        let tx = tx.clone();
                        let task_seq = seq;
                        seq += 1;

                        tasks.spawn(async move {
                            let _permit = semaphore.acquire().await;
                            if cancel.is_cancelled() {
                                return Ok(());
                            }
                            let mut driver = driver_factory();
                            let run = run_scenario(
                                &registry,
                                &config,
                                driver.as_mut(),
                                &scenario,
                                scale_point,
                                &config_name,
                                &cancel,
                            )
                            .await?;
                            let _ = tx.send((task_seq, run));
                            Ok::<(), Error>(())
                        });
                    }
                }
            }
        }
        drop(tx);

        // Only configuration and invariant violations surface here.
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(Error::Invariant(format!("scenario task panicked: {}", e))),
            }
        }

        let mut runs = Vec::new();
        while let Some(entry) = rx.recv().await {
            runs.push(entry);
        }
        runs.sort_by_key(|(seq, _)| *seq);

        let mut traces = Vec::with_capacity(runs.len());
        for (_, run) in runs {
            record.results.push(run.result);
            traces.push(run.trace);
        }

        // Baselines run after all real runs finish.
        let baseline_registry = self.build_registry(BASELINE_SCALE)?;
        let action_pool = baseline_registry.actions.names();
        let baseline_scenarios = filter_for_config(scenarios, "full");
        record.baselines.insert(
            "random".to_string(),
            random_baseline(&baseline_scenarios, &action_pool, self.config.seed),
        );
        record.baselines.insert(
            "always_reply".to_string(),
            always_reply_baseline(&baseline_scenarios),
        );

        record.scaling_curves = build_scaling_curves(&record.results, &self.config.scale_points);

        record.metadata.insert(
            "benchmark".to_string(),
            json!(self.config.benchmark_name.clone()),
        );
        record
            .metadata
            .insert("version".to_string(), json!(env!("CARGO_PKG_VERSION")));
        record
            .metadata
            .insert("model".to_string(), json!(self.config.model_name.clone()));
        record.metadata.insert(
            "provider".to_string(),
            json!(self.model_provider_name.clone()),
        );
        record.metadata.insert(
            "duration_ms".to_string(),
            json!(started.elapsed().as_millis() as u64),
        );
        record
            .metadata
            .insert("total_scenarios".to_string(), json!(record.results.len()));
        record.completed_at = Some(chrono::Utc::now());

        Ok((record, traces))
    }
}

/// Memory/planning scenarios only run under the "full" configuration.
fn filter_for_config(scenarios: &[Scenario], config_name: &str) -> Vec<Scenario> {
    let is_full = config_name == "full";
    let filter = ScenarioFilter {
        include_memory: is_full,
        include_planning: is_full,
        ..ScenarioFilter::default()
    };
    filter.apply(scenarios)
}
