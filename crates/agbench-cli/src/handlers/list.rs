use anyhow::Result;

use crate::args::FilterArgs;
use crate::handlers::load_and_filter;

pub fn handle(filter: FilterArgs) -> Result<i32> {
    let scenarios = load_and_filter(&filter)?;

    println!("{:<18} {:<6} {:<40} Tags", "ID", "Level", "Name");
    println!("{}", "-".repeat(90));
    for scenario in &scenarios {
        let mut features = Vec::new();
        if scenario.requires_memory {
            features.push("mem");
        }
        if scenario.requires_planning {
            features.push("plan");
        }
        let feature_note = if features.is_empty() {
            String::new()
        } else {
            format!(" [{}]", features.join(","))
        };

        println!(
            "{:<18} L{:<5} {:<40} {}{}",
            scenario.id,
            scenario.level,
            scenario.name,
            scenario.tags.join(", "),
            feature_note
        );
    }
    println!("\nTotal: {} scenarios", scenarios.len());

    Ok(0)
}
