//! Simulated training loop: one warm-up sweep, then highest-loss-first.
//!
//! Each item has a hidden "difficulty"; its loss decays every time it is
//! visited. Items visited `visit_threshold` times are retired.

use kuji_prio::SamplerConfig;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config: SamplerConfig = serde_json::from_str(
        r#"{"index": {"visit_threshold": 4}, "scheduler": {"warmup_epochs": 1, "shuffle": true, "seed": 7}}"#,
    )?;

    let n = 20;
    let batch_size = 5;
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let difficulty: Vec<f64> = (0..n).map(|_| rng.random_range(0.1..5.0)).collect();

    let mut index = config.build_index(n)?;
    let mut scheduler = config.build_scheduler();

    for _ in 0..4 {
        let mut epoch = scheduler.begin_epoch(&index);
        let mut order = Vec::new();
        while let Some(batch) = epoch.next_batch(&index, batch_size) {
            let losses: Vec<f64> = batch
                .iter()
                .map(|&id| {
                    let visits = index.visits(id).unwrap_or(0);
                    difficulty[id] / f64::from(visits + 1)
                })
                .collect();
            index.update(&batch, &losses)?;
            order.extend(batch);
        }
        println!(
            "epoch {} ({:?}): active={} order={:?}",
            epoch.number(),
            epoch.phase(),
            index.active_count(),
            order
        );
        scheduler.finish_epoch(epoch);
    }

    Ok(())
}
