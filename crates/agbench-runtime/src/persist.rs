use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use agbench_engine::build_summary;
use agbench_types::{DecisionTrace, RunRecord};

use crate::error::Result;

/// Persisted layout inside the output directory:
///
/// ```text
/// <output>/
///   <benchmark>-<timestamp>.json         # aggregate summary
///   <benchmark>-<timestamp>.md           # human report
///   traces/<run_id>/<scenario_id>.jsonl  # one trace step per line
///   raw/<run_id>.json                    # full dump incl. transcripts
/// ```
pub struct OutputPaths {
    root: PathBuf,
    benchmark: String,
    run_id: Uuid,
    timestamp: String,
}

impl OutputPaths {
    pub fn new(root: impl Into<PathBuf>, record: &RunRecord) -> Self {
        Self {
            root: root.into(),
            benchmark: record.benchmark_name.clone(),
            run_id: record.run_id,
            timestamp: format_timestamp(record.started_at),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn summary_path(&self) -> PathBuf {
        self.root
            .join(format!("{}-{}.json", self.benchmark, self.timestamp))
    }

    pub fn report_path(&self) -> PathBuf {
        self.root
            .join(format!("{}-{}.md", self.benchmark, self.timestamp))
    }

    pub fn traces_dir(&self) -> PathBuf {
        self.root.join("traces").join(self.run_id.to_string())
    }

    pub fn raw_path(&self) -> PathBuf {
        self.root
            .join("raw")
            .join(format!("{}.json", self.run_id))
    }

    /// Write the summary JSON, the Markdown report, every trace as JSONL,
    /// and the full raw dump.
    pub fn write_all(
        &self,
        record: &RunRecord,
        traces: &[DecisionTrace],
        markdown: &str,
    ) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;

        let summary = build_summary(record);
        std::fs::write(
            self.summary_path(),
            serde_json::to_string_pretty(&summary).map_err(agbench_types::Error::from)?,
        )?;

        std::fs::write(self.report_path(), markdown)?;

        let traces_dir = self.traces_dir();
        std::fs::create_dir_all(&traces_dir)?;
        let mut seen: HashMap<String, usize> = HashMap::new();
        for trace in traces {
            let count = seen.entry(trace.scenario_id.clone()).or_insert(0);
            *count += 1;
            // Repeated runs of one scenario (scale points, trials) get a
            // numeric suffix so each trace file stays self-contained.
            let file_name = if *count == 1 {
                format!("{}.jsonl", trace.scenario_id)
            } else {
                format!("{}-{}.jsonl", trace.scenario_id, count)
            };
            std::fs::write(
                traces_dir.join(file_name),
                trace.to_jsonl().map_err(agbench_types::Error::from)?,
            )?;
        }

        let raw_path = self.raw_path();
        if let Some(parent) = raw_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(
            raw_path,
            serde_json::to_string_pretty(record).map_err(agbench_types::Error::from)?,
        )?;

        Ok(())
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}
