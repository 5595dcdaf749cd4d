//! Count a short load series and print the results
//!
//! Run with: cargo run --example count_series -p rainflow-core

use rainflow_core::prelude::*;

fn main() -> RainflowResult<()> {
    // Siemens knowledge-base example: 6 classes centered on the values
    // 1..=6, hysteresis of one class width.
    let series = [
        2.0, 5.0, 3.0, 6.0, 2.0, 4.0, 1.0, 6.0, 1.0, 4.0, 1.0, 5.0, 3.0, 6.0, 3.0, 6.0, 1.0,
        5.0, 2.0,
    ];

    let mut engine = RainflowEngine::new(6, 1.0, 0.5, 1.0)?;
    engine.set_wohler(WohlerCurve::builder().sd(1e3).nd(1e7).k(-5.0).build())?;
    engine.enable_turning_point_storage(64)?;
    engine.feed(&series)?;
    engine.finalize(ResidualMethod::None)?;

    let full = engine.full_increment();
    println!("samples:        {}", engine.samples());
    println!("closed cycles:  {}", engine.matrix().total() / full);
    println!("pseudo damage:  {:.4e}", engine.pseudo_damage());

    println!("\nrainflow matrix (from class \\ to class, full cycles):");
    let count = engine.class_map().count();
    for from in 0..count {
        let row: Vec<String> = (0..count)
            .map(|to| format!("{:2}", engine.matrix().at(from, to) / full))
            .collect();
        println!("  {}", row.join(" "));
    }

    let residue: Vec<f64> = engine.residue().iter().map(|tp| tp.value).collect();
    println!("\nresidue:        {:?}", residue);

    let tps: Vec<(f64, u64)> = engine
        .turning_points()
        .unwrap()
        .iter()
        .map(|tp| (tp.value, tp.pos))
        .collect();
    println!("turning points: {:?}", tps);

    Ok(())
}
