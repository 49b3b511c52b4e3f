use std::{env, io, thread};

use comms::envelope::CommandKind;
use comms::msg::{LevelIndexPair, LevelIndexVector};
use log::info;
use node::transport::LocalEndpoint;
use node::{BatchFit, Learner, LocalCluster, Node, NodeConfig, RefinementResult, Result, Transport};

const DEFAULT_WORLD_SIZE: usize = 3;
const MODEL_LEN: usize = 400;
const DIMS: usize = 3;

/// Toy single-class learner: enough surface to drive the protocol without
/// any real grid or density math.
struct DemoLearner {
    rank: usize,
    grid_version: u64,
    points: Vec<LevelIndexVector>,
    coefficients: Vec<f64>,
    merged_values: usize,
}

impl DemoLearner {
    fn new(rank: usize) -> Self {
        Self {
            rank,
            grid_version: 0,
            points: Vec::new(),
            coefficients: vec![0.0; MODEL_LEN],
            merged_values: 0,
        }
    }
}

impl Learner for DemoLearner {
    fn dimensionality(&self) -> usize {
        DIMS
    }

    fn current_grid_version(&self, _class_index: u64) -> u64 {
        self.grid_version
    }

    fn set_grid_version(&mut self, _class_index: u64, version: u64) {
        self.grid_version = version;
    }

    fn apply_added_point(&mut self, _class_index: u64, point: &[LevelIndexPair]) -> Result<()> {
        self.points.push(point.to_vec());
        Ok(())
    }

    fn apply_deleted_point(&mut self, _class_index: u64, point_index: u64) -> Result<()> {
        let at = point_index as usize;
        if at < self.points.len() {
            self.points.remove(at);
        }
        Ok(())
    }

    fn merge_coefficients(
        &mut self,
        _class_index: u64,
        offset: usize,
        values: &[f64],
        batch_size: u64,
    ) -> Result<()> {
        let weight = batch_size as f64;
        for (slot, value) in self.coefficients[offset..offset + values.len()]
            .iter_mut()
            .zip(values)
        {
            *slot += value * weight;
        }
        self.merged_values += values.len();
        Ok(())
    }

    fn run_local_batch(
        &mut self,
        batch_offset: u64,
        batch_size: u64,
        _cross_validate: bool,
    ) -> Result<Vec<BatchFit>> {
        let coefficients = (0..MODEL_LEN)
            .map(|i| (batch_offset as f64 + i as f64) / batch_size as f64)
            .collect();
        Ok(vec![BatchFit {
            class_index: 0,
            batch_size,
            coefficients,
        }])
    }

    fn shutdown(&mut self) {
        info!(rank = self.rank; "learner torn down");
    }
}

fn demo_diff() -> RefinementResult {
    let added_grid_points = (0..41u64)
        .map(|p| {
            (0..DIMS as u64)
                .map(|d| LevelIndexPair {
                    level: p % 5 + 1,
                    index: 2 * p + d,
                })
                .collect()
        })
        .collect();
    RefinementResult {
        deleted_grid_point_indexes: vec![3, 1],
        added_grid_points,
    }
}

fn run_master(mut node: Node<LocalEndpoint, DemoLearner>) -> Result<()> {
    node.listen()?;
    node.barrier();

    // Hand every worker a dataset window and drain their merges.
    let workers = node.world_size() - 1;
    let batch_size = node.config().batch_size;
    for worker in 1..=workers {
        node.assign_batch(worker, (worker as u64 - 1) * batch_size, batch_size, false)?;
    }
    while node.learner().merged_values < workers * MODEL_LEN {
        if !node.poll_completed()? {
            thread::yield_now();
        }
    }
    info!(merged = node.learner().merged_values; "all batch contributions merged");

    // A refinement step: bump the topology version, push the diff out.
    node.learner_mut().grid_version += 1;
    node.broadcast_command(CommandKind::StartSync)?;
    node.broadcast_refinement(0, &demo_diff())?;
    node.broadcast_command(CommandKind::EndSync)?;

    node.broadcast_shutdown()?;
    node.wait_all()?;
    node.barrier();
    info!("master finished");
    Ok(())
}

fn run_worker(mut node: Node<LocalEndpoint, DemoLearner>) -> Result<()> {
    node.listen()?;
    node.barrier();
    node.run_worker()?;
    info!(
        rank = node.rank(),
        grid_points = node.learner().points.len(),
        grid_version = node.learner().current_grid_version(0);
        "worker state at shutdown"
    );
    node.barrier();
    Ok(())
}

fn node_config() -> NodeConfig {
    match env::var("NODE_CONFIG_JSON") {
        Ok(raw) => NodeConfig::from_json(&raw).expect("invalid NODE_CONFIG_JSON"),
        Err(_) => NodeConfig::default(),
    }
}

fn main() -> io::Result<()> {
    env_logger::init();

    let world_size = env::var("NODE_WORLD")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_WORLD_SIZE);
    let config = node_config();
    info!(world_size = world_size; "starting in-process pool");

    let mut endpoints = LocalCluster::new(world_size).into_iter();
    let master = endpoints.next().expect("world size is at least one");

    let workers: Vec<_> = endpoints
        .map(|endpoint| {
            let config = config.clone();
            thread::spawn(move || {
                let rank = endpoint.rank();
                let node = Node::new(endpoint, DemoLearner::new(rank), config);
                run_worker(node)
            })
        })
        .collect();

    run_master(Node::new(master, DemoLearner::new(0), config))?;

    for worker in workers {
        worker.join().expect("worker thread panicked")?;
    }
    Ok(())
}
