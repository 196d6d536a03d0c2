use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

use agbench_types::RunRecord;

/// Compact colored run summary printed after the files are written.
pub fn print_summary(record: &RunRecord) {
    let color = std::io::stdout().is_terminal();

    println!();
    println!("{}", "=".repeat(60));
    println!("  {} Results", record.benchmark_name);
    if let Some(model) = record.metadata.get("model").and_then(|v| v.as_str()) {
        println!("  Model: {}", model);
    }
    if let Some(duration) = record.metadata.get("duration_ms").and_then(|v| v.as_u64()) {
        println!("  Duration: {}ms", duration);
    }
    println!("{}", "=".repeat(60));
    println!();

    println!("  Baselines:");
    for (name, score) in &record.baselines {
        println!("    {:<20}: {:.1}%", name, score * 100.0);
    }
    println!();

    for (config_name, points) in &record.scaling_curves {
        println!("  Scaling Curve ({}):", config_name);
        for point in points {
            let filled = (point.score.clamp(0.0, 1.0) * 40.0) as usize;
            let bar = format!("{}{}", "#".repeat(filled), ".".repeat(40 - filled));
            let line = format!(
                "    {:<16} [{}] {:>5.1}%  ({:.0}ms)",
                point.scale_label,
                bar,
                point.score * 100.0,
                point.latency_ms
            );
            if color && point.score < 0.5 {
                println!("{}", line.red());
            } else if color && point.score >= 0.9 {
                println!("{}", line.green());
            } else {
                println!("{}", line);
            }
        }
        println!();
    }

    if !record.results.is_empty() {
        let scores: Vec<f64> = record.results.iter().map(|r| r.score).collect();
        let avg = scores.iter().sum::<f64>() / scores.len() as f64;
        let perfect = scores.iter().filter(|s| **s >= 1.0).count();
        let failed = scores.iter().filter(|s| **s < 0.5).count();
        let errored = record.results.iter().filter(|r| r.error.is_some()).count();
        println!(
            "  Overall: avg={:.1}%, perfect={}/{}, failed={}/{}, errors={}",
            avg * 100.0,
            perfect,
            scores.len(),
            failed,
            scores.len(),
            errored
        );
        println!();
    }
}
