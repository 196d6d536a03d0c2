use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::scenario::{Scenario, TurnActor};

/// A scenario source file may hold one scenario or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScenarioFile {
    Many(Vec<Scenario>),
    One(Box<Scenario>),
}

impl ScenarioFile {
    fn into_vec(self) -> Vec<Scenario> {
        match self {
            ScenarioFile::Many(scenarios) => scenarios,
            ScenarioFile::One(scenario) => vec![*scenario],
        }
    }
}

/// Parse scenarios from a string. `yaml` selects the YAML parser; JSON is
/// the canonical format.
pub fn load_str(content: &str, yaml: bool) -> Result<Vec<Scenario>> {
    let file: ScenarioFile = if yaml {
        serde_yaml::from_str(content)?
    } else {
        serde_json::from_str(content)?
    };
    Ok(file.into_vec())
}

/// Load scenarios from a file or a directory walked recursively for
/// `.json`/`.yaml`/`.yml` sources. Deterministic: directory entries are
/// visited in path order. The loaded set is validated before it is returned.
pub fn load_path(path: &Path) -> Result<Vec<Scenario>> {
    let mut scenarios = Vec::new();

    if path.is_dir() {
        let mut files: Vec<_> = WalkDir::new(path)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|p| matches!(extension(p), Some("json") | Some("yaml") | Some("yml")))
            .collect();
        files.sort();

        for file in files {
            scenarios.extend(load_file(&file)?);
        }
    } else {
        scenarios.extend(load_file(path)?);
    }

    validate(&scenarios)?;
    Ok(scenarios)
}

fn load_file(path: &Path) -> Result<Vec<Scenario>> {
    let content = std::fs::read_to_string(path)?;
    let yaml = matches!(extension(path), Some("yaml") | Some("yml"));
    load_str(&content, yaml)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

/// Check the loaded set against the model invariants. Violations are
/// configuration errors, fatal at startup.
pub fn validate(scenarios: &[Scenario]) -> Result<()> {
    let mut seen_ids = HashSet::new();

    for scenario in scenarios {
        if scenario.id.is_empty() {
            return Err(Error::Config("scenario with empty id".to_string()));
        }
        if !seen_ids.insert(scenario.id.as_str()) {
            return Err(Error::Config(format!(
                "duplicate scenario id '{}'",
                scenario.id
            )));
        }
        if scenario.turns.is_empty() {
            return Err(Error::Config(format!(
                "scenario '{}' has no turns",
                scenario.id
            )));
        }
        if scenario.level > 3 {
            return Err(Error::Config(format!(
                "scenario '{}' level {} outside 0-3",
                scenario.id, scenario.level
            )));
        }

        for (idx, turn) in scenario.turns.iter().enumerate() {
            if turn.actor == TurnActor::Assistant {
                return Err(Error::Config(format!(
                    "scenario '{}' turn {} uses actor 'assistant'; model assistant \
                     prefill as conversation_prefill instead",
                    scenario.id, idx
                )));
            }
            if turn.delay_seconds < 0.0 {
                return Err(Error::Config(format!(
                    "scenario '{}' turn {} has negative delay_seconds",
                    scenario.id, idx
                )));
            }
            for outcome in turn.expected_outcomes.iter().chain(&turn.forbidden_outcomes) {
                if outcome.weight < 0.0 {
                    return Err(Error::Config(format!(
                        "scenario '{}' turn {} has negative outcome weight",
                        scenario.id, idx
                    )));
                }
            }
        }
    }

    Ok(())
}

/// Deterministic, order-preserving scenario selection.
#[derive(Debug, Clone, Default)]
pub struct ScenarioFilter {
    /// Keep scenarios whose level is in this set. Empty = all levels.
    pub levels: Vec<u8>,
    /// Keep scenarios sharing at least one tag. Empty = no tag constraint.
    pub tags: Vec<String>,
    /// Keep exactly these ids. Empty = no id constraint.
    pub ids: Vec<String>,
    /// Include scenarios flagged requires_memory.
    pub include_memory: bool,
    /// Include scenarios flagged requires_planning.
    pub include_planning: bool,
}

impl ScenarioFilter {
    pub fn all() -> Self {
        Self {
            include_memory: true,
            include_planning: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, scenario: &Scenario) -> bool {
        if !self.levels.is_empty() && !self.levels.contains(&scenario.level) {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| scenario.has_tag(t)) {
            return false;
        }
        if !self.ids.is_empty() && !self.ids.iter().any(|id| id == &scenario.id) {
            return false;
        }
        if scenario.requires_memory && !self.include_memory {
            return false;
        }
        if scenario.requires_planning && !self.include_planning {
            return false;
        }
        true
    }

    pub fn apply(&self, scenarios: &[Scenario]) -> Vec<Scenario> {
        scenarios
            .iter()
            .filter(|s| self.matches(s))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Turn;

    fn scenario(id: &str, level: u8, tags: &[&str]) -> Scenario {
        Scenario {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            level,
            category: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            required_capabilities: Vec::new(),
            requires_memory: false,
            requires_planning: false,
            distractor_count: 0,
            turns: vec![Turn::user("hello")],
        }
    }

    #[test]
    fn test_load_str_single_and_list() {
        let single = r#"{"id":"s1","name":"One","level":0,"turns":[{"actor":"user","text":"hi"}]}"#;
        let scenarios = load_str(single, false).unwrap();
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].id, "s1");

        let list = format!("[{single}]");
        let scenarios = load_str(&list, false).unwrap();
        assert_eq!(scenarios.len(), 1);
    }

    #[test]
    fn test_load_yaml() {
        let yaml = "id: s1\nname: One\nlevel: 1\nturns:\n  - actor: user\n    text: hi\n";
        let scenarios = load_str(yaml, true).unwrap();
        assert_eq!(scenarios[0].level, 1);
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let scenarios = vec![scenario("s1", 0, &[]), scenario("s1", 1, &[])];
        assert!(validate(&scenarios).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_turns() {
        let mut s = scenario("s1", 0, &[]);
        s.turns.clear();
        assert!(validate(&[s]).is_err());
    }

    #[test]
    fn test_validate_rejects_assistant_turns() {
        let mut s = scenario("s1", 0, &[]);
        s.turns[0].actor = TurnActor::Assistant;
        let err = validate(&[s]).unwrap_err();
        assert!(err.to_string().contains("conversation_prefill"));
    }

    #[test]
    fn test_filter_is_order_preserving() {
        let scenarios = vec![
            scenario("a", 0, &["x"]),
            scenario("b", 1, &["y"]),
            scenario("c", 0, &["x", "y"]),
        ];

        let filter = ScenarioFilter {
            levels: vec![0],
            include_memory: true,
            include_planning: true,
            ..ScenarioFilter::default()
        };
        let picked = filter.apply(&scenarios);
        let ids: Vec<&str> = picked.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        let filter = ScenarioFilter {
            tags: vec!["y".to_string()],
            include_memory: true,
            include_planning: true,
            ..ScenarioFilter::default()
        };
        let ids: Vec<String> = filter.apply(&scenarios).into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_filter_excludes_memory_scenarios_unless_included() {
        let mut s = scenario("m1", 0, &[]);
        s.requires_memory = true;
        let filter = ScenarioFilter::default();
        assert!(!filter.matches(&s));
        assert!(ScenarioFilter::all().matches(&s));
    }

    #[test]
    fn test_load_path_walks_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.json"),
            r#"{"id":"s2","name":"Two","level":0,"turns":[{"actor":"user","text":"hi"}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.yaml"),
            "id: s1\nname: One\nlevel: 0\nturns:\n  - actor: user\n    text: hi\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("ignored.txt"), "not a scenario").unwrap();

        let scenarios = load_path(dir.path()).unwrap();
        let ids: Vec<String> = scenarios.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
    }
}
