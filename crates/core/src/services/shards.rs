use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// How items are dealt out to workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardStrategy {
    /// Item `i` goes to shard `i % workers`.
    #[default]
    RoundRobin,
    /// Equal contiguous slices of `len / workers`; the last shard also takes
    /// the remainder.
    Contiguous,
}

impl ShardStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShardStrategy::RoundRobin => "round_robin",
            ShardStrategy::Contiguous => "contiguous",
        }
    }
}

impl fmt::Display for ShardStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShardStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "round_robin" => Ok(ShardStrategy::RoundRobin),
            "contiguous" => Ok(ShardStrategy::Contiguous),
            other => Err(format!(
                "unknown shard strategy '{other}' (expected round_robin or contiguous)"
            )),
        }
    }
}

#[derive(Debug, Error)]
pub enum ShardError {
    #[error("Worker count must be at least 1")]
    NoWorkers,
    #[error("Failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Item indices per shard. Always returns exactly `workers` shards (some may
/// be empty); every index in `0..len` appears in exactly one shard, in
/// ascending order within it.
pub fn assign(
    len: usize,
    workers: usize,
    strategy: ShardStrategy,
) -> Result<Vec<Vec<usize>>, ShardError> {
    if workers == 0 {
        return Err(ShardError::NoWorkers);
    }
    let mut shards = vec![Vec::new(); workers];
    match strategy {
        ShardStrategy::RoundRobin => {
            for idx in 0..len {
                shards[idx % workers].push(idx);
            }
        }
        ShardStrategy::Contiguous => {
            let batch = len / workers;
            for (shard_idx, shard) in shards.iter_mut().enumerate() {
                let start = shard_idx * batch;
                let end = if shard_idx + 1 == workers { len } else { start + batch };
                shard.extend(start..end);
            }
        }
    }
    Ok(shards)
}

/// Apply `f` to every item on a bounded pool of `workers` threads.
///
/// Each shard is processed sequentially by one task; results come back
/// concatenated shard by shard with within-shard order preserved.
pub fn run_sharded<T, R, F>(
    items: &[T],
    workers: usize,
    strategy: ShardStrategy,
    f: F,
) -> Result<Vec<R>, ShardError>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let shards = assign(items.len(), workers, strategy)?;
    let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;
    debug!(items = items.len(), workers, %strategy, "running sharded");

    let per_shard: Vec<Vec<R>> = pool.install(|| {
        shards
            .par_iter()
            .map(|shard| shard.iter().map(|&idx| f(&items[idx])).collect())
            .collect()
    });
    Ok(per_shard.into_iter().flatten().collect())
}
