use std::collections::BTreeMap as StdBTreeMap;
use std::env;
use std::process::ExitCode;
use std::time::Instant;

use log::{error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rbtree_map::{BinarySearchTree, RedBlackTree};

const DEFAULT_OPS: usize = 100_000;
const DEFAULT_SEED: u64 = 0x5eed;

struct Config {
    ops: usize,
    seed: u64,
}

impl Config {
    fn from_args() -> Result<Config, String> {
        Config::parse(env::args().skip(1))
    }

    fn parse(mut args: impl Iterator<Item = String>) -> Result<Config, String> {
        let ops = match args.next() {
            Some(s) => s.parse().map_err(|e| format!("invalid op count {:?}: {}", s, e))?,
            None => DEFAULT_OPS,
        };
        // Keys are drawn from 0..ops and stored with value key + 1.
        if u32::try_from(ops).is_err() {
            return Err(format!("op count {} exceeds {}", ops, u32::MAX));
        }
        let seed = match args.next() {
            Some(s) => s.parse().map_err(|e| format!("invalid seed {:?}: {}", s, e))?,
            None => DEFAULT_SEED,
        };
        Ok(Config { ops, seed })
    }
}

/// Runs the same random workload against the red-black tree and std's BTreeMap,
/// checking they agree, and reports timings.
fn run(config: &Config) -> Result<(), String> {
    let key_space = u32::try_from(config.ops)
        .map_err(|e| e.to_string())?
        .max(16);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let start = Instant::now();
    let mut tree = RedBlackTree::new();
    let mut ours = Vec::with_capacity(config.ops);
    for _ in 0..config.ops {
        let key: u32 = rng.gen_range(0..key_space);
        match rng.gen_range(0..4u8) {
            0 | 1 => ours.push(tree.insert(key, key + 1).is_ok()),
            2 => ours.push(tree.remove(&key)),
            _ => ours.push(tree.get(&key).is_some()),
        }
    }
    let our_time = start.elapsed();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let start = Instant::now();
    let mut std_map = StdBTreeMap::new();
    let mut theirs = Vec::with_capacity(config.ops);
    for _ in 0..config.ops {
        let key: u32 = rng.gen_range(0..key_space);
        match rng.gen_range(0..4u8) {
            0 | 1 => theirs.push(std_map.insert(key, key + 1).is_none()),
            2 => theirs.push(std_map.remove(&key).is_some()),
            _ => theirs.push(std_map.get(&key).is_some()),
        }
    }
    let std_time = start.elapsed();

    if let Some(op) = ours.iter().zip(&theirs).position(|(a, b)| a != b) {
        return Err(format!("results diverge at operation {}", op));
    }
    if !tree.iter().map(|(k, v)| (*k, *v)).eq(std_map.iter().map(|(k, v)| (*k, *v))) {
        return Err("final contents diverge".to_string());
    }

    info!("RedBlackTree:  {:?}", our_time);
    info!("Std BTreeMap:  {:?}", std_time);
    info!(
        "{} entries, height {} (bound {:.1})",
        tree.len(),
        tree.height(),
        2.0 * ((tree.len() + 1) as f64).log2()
    );

    // Sorted input is the worst case for the unbalanced engine.
    let sorted = config.ops.min(2_000) as u32;
    let mut plain = BinarySearchTree::new();
    let mut balanced = RedBlackTree::new();
    for k in 0..sorted {
        plain
            .insert(k, ())
            .and_then(|_| balanced.insert(k, ()))
            .map_err(|e| e.to_string())?;
    }
    info!(
        "{} sorted inserts: unbalanced height {}, red-black height {}",
        sorted,
        plain.height(),
        balanced.height()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::from_args() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("usage: rbtree_main [ops] [seed]");
            return ExitCode::FAILURE;
        }
    };
    info!("running {} operations with seed {}", config.ops, config.seed);

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
