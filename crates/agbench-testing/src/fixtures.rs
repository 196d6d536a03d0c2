use std::path::{Path, PathBuf};

use agbench_types::{ExpectedOutcome, OutcomeKind, OutcomeValue, Scenario, Turn};

fn scenario(id: &str, name: &str, level: u8, turns: Vec<Turn>) -> Scenario {
    Scenario {
        id: id.to_string(),
        name: name.to_string(),
        description: format!("Fixture scenario: {name}"),
        level,
        category: "fixture".to_string(),
        tags: vec!["fixture".to_string()],
        required_capabilities: Vec::new(),
        requires_memory: false,
        requires_planning: false,
        distractor_count: 0,
        turns,
    }
}

/// Single user turn expecting the CLICK action.
pub fn click_scenario() -> Scenario {
    scenario(
        "fix-click",
        "Click the Submit button",
        0,
        vec![Turn::user("click the Submit button").with_outcomes(vec![
            ExpectedOutcome::new(OutcomeKind::ActionMatch, OutcomeValue::Text("CLICK".into())),
        ])],
    )
}

/// Same as `click_scenario` but forbidding CLICK and TYPE.
pub fn forbidden_click_scenario() -> Scenario {
    scenario(
        "fix-no-click",
        "Do not click anything",
        0,
        vec![
            Turn::user("click the Submit button").with_forbidden(vec![ExpectedOutcome::new(
                OutcomeKind::ActionNotMatch,
                OutcomeValue::List(vec!["CLICK".into(), "TYPE".into()]),
            )]),
        ],
    )
}

/// Two turns; the second opens a fresh session.
pub fn new_session_scenario() -> Scenario {
    scenario(
        "fix-new-session",
        "Return in a new session",
        1,
        vec![
            Turn::user("remember that my badge code is 4417").with_outcomes(vec![
                ExpectedOutcome::new(OutcomeKind::ActionMatch, OutcomeValue::Text("REPLY".into())),
            ]),
            Turn::user("what is my badge code?")
                .with_new_session()
                .with_outcomes(vec![ExpectedOutcome::new(
                    OutcomeKind::MemoryRecalled,
                    OutcomeValue::Text("4417".into()),
                )]),
        ],
    )
}

/// Mixed-weight outcomes on a single turn (action weight 2, text weight 1).
pub fn weighted_scenario() -> Scenario {
    scenario(
        "fix-weighted",
        "Weighted outcomes",
        0,
        vec![Turn::user("say hello and act").with_outcomes(vec![
            ExpectedOutcome::weighted(
                OutcomeKind::ActionMatch,
                OutcomeValue::Text("WAIT".into()),
                2.0,
            ),
            ExpectedOutcome::weighted(
                OutcomeKind::TextContains,
                OutcomeValue::Text("hello".into()),
                1.0,
            ),
        ])],
    )
}

/// A suite of `count` single-turn scenarios all expecting CLICK, for
/// scaling-curve tests.
pub fn click_suite(count: usize) -> Vec<Scenario> {
    (0..count)
        .map(|i| {
            scenario(
                &format!("fix-click-{i:02}"),
                &format!("Click target {i}"),
                0,
                vec![Turn::user(format!("click target number {i}")).with_outcomes(vec![
                    ExpectedOutcome::new(
                        OutcomeKind::ActionMatch,
                        OutcomeValue::Text("CLICK".into()),
                    ),
                ])],
            )
        })
        .collect()
}

/// The default embedded fixture set.
pub fn sample_scenarios() -> Vec<Scenario> {
    vec![
        click_scenario(),
        forbidden_click_scenario(),
        new_session_scenario(),
        weighted_scenario(),
    ]
}

/// Write scenarios as a JSON file under `dir`, returning the path.
pub fn write_scenario_file(dir: &Path, file_name: &str, scenarios: &[Scenario]) -> PathBuf {
    let path = dir.join(file_name);
    let json = serde_json::to_string_pretty(scenarios).expect("fixture scenarios serialize");
    std::fs::write(&path, json).expect("fixture scenario file written");
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use agbench_types::validate;

    #[test]
    fn test_fixtures_pass_validation() {
        let mut all = sample_scenarios();
        all.extend(click_suite(10));
        validate(&all).unwrap();
    }

    #[test]
    fn test_write_scenario_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_scenario_file(dir.path(), "fixtures.json", &sample_scenarios());
        let loaded = agbench_types::load_path(&path).unwrap();
        assert_eq!(loaded.len(), sample_scenarios().len());
    }
}
