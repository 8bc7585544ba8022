//! Reconnect a generated recording and print what happened.
//!
//! Run with: cargo run --example stitch_demo --features synthetic

use std::io::Write;

use track_stitcher::synthetic::SyntheticScenario;
use track_stitcher::{reconnect_tracks, StitchConfig};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let scenario = SyntheticScenario {
        individuals: 6,
        breaks_per_individual: 3,
        ..SyntheticScenario::default()
    };
    let dataset = scenario.generate();
    let config = StitchConfig::default();

    println!("Track Reconnection Demo\n");
    println!(
        "{} individuals, {} identity slots, {} frames",
        scenario.individuals,
        dataset.names.len(),
        dataset.timeline.frame_count()
    );
    println!(
        "Config: frame_window={}, distance_threshold={}, consistency_radius={}\n",
        config.frame_window, config.distance_threshold, config.consistency_radius
    );

    let report = match reconnect_tracks(&dataset.timeline, &dataset.names, &config) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Reconnection failed: {}", err);
            std::process::exit(1);
        }
    };

    println!("Connections:");
    for c in &report.stitch.connections {
        println!(
            "   {} (end {}) -> {} (start {}): frame_diff={}, distance={:.2}, score={:.2}",
            c.root_name,
            c.root_end,
            c.candidate_name,
            c.candidate_start,
            c.frame_diff,
            c.spatial_distance,
            c.score
        );
    }

    let mut expected = dataset.expected_chain_names();
    expected.sort();
    let mut completed = report.stitch.completed.clone();
    completed.sort();
    println!(
        "\nCompleted {} of {} individuals in {} passes ({})",
        completed.len(),
        expected.len(),
        report.stitch.passes,
        if completed == expected {
            "matches ground truth"
        } else {
            "differs from ground truth"
        }
    );

    println!("\nDistance travelled:");
    print!("{}", report.distances);
}
