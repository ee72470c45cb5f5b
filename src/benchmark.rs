/**
 * RecoSim
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

// Measures sequential against parallel running times, as well as the resulting speedup and
// efficiency per worker count.

use serde_derive::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::dataset::Dataset;
use crate::engine;
use crate::recommend;
use crate::similarity::Metric;
use crate::topn::ScoredItem;
use crate::types::{EntityRecord, Features};
use crate::utils;

/// Parallel results may only deviate from sequential ones by floating point reordering.
const TOLERANCE: f64 = 1e-9;

/// A single measurement. Field names will be used as CSV header.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BenchmarkRecord {
    pub algorithm: String,
    pub dataset_size: usize,
    pub mode: String,
    pub num_workers: usize,
    pub time_ms: f64,
    pub speedup: f64,
    pub efficiency: f64,
    pub comparisons: usize,
}

/// Worker counts to benchmark: powers of two up to eight that do not exceed twice the number of
/// available cpus, followed by twice the number of cpus.
pub fn worker_counts(num_cpus: usize) -> Vec<usize> {
    let max_workers = 2 * num_cpus.max(1);

    let mut counts: Vec<usize> = [2, 4, 8].iter()
        .cloned()
        .filter(|&count| count < max_workers)
        .collect();
    counts.push(max_workers);

    counts
}

/// Times the sequential similarity matrix against the pair enumeration engine.
pub fn benchmark_matrix<W: Features>(
    entities: &[EntityRecord<W>],
    metric: Metric,
    worker_counts: &[usize],
) -> Vec<BenchmarkRecord> {

    let algorithm = format!("matrix-{}", metric);
    let dataset_size = entities.len();
    let comparisons = engine::num_pairs(dataset_size);

    let (expected, sequential_millis) =
        utils::measure(|| engine::similarity_matrix_sequential(entities, metric));

    info!("{}: sequential run over {} entities took {:.2}ms",
        algorithm, dataset_size, sequential_millis);

    let mut records = Vec::with_capacity(worker_counts.len() + 1);
    records.push(sequential_record(&algorithm, dataset_size, sequential_millis, comparisons));

    for &num_workers in worker_counts {

        let (matrix, parallel_millis) =
            utils::measure(|| engine::similarity_matrix(entities, metric, num_workers));

        let deviation = matrix.max_abs_difference(&expected);
        if deviation > TOLERANCE {
            warn!("{} with {} workers deviates from the sequential result by {}",
                algorithm, num_workers, deviation);
        }

        records.push(parallel_record(&algorithm, dataset_size, num_workers, sequential_millis,
            parallel_millis, comparisons));
    }

    records
}

/// Times sequential against partitioned item-based recommendation for a single user with the
/// given metric. The remaining parameters are taken from `config`.
pub fn benchmark_item_based<W: Features>(
    dataset: &Dataset<W>,
    user: u32,
    metric: Metric,
    config: &Config,
    worker_counts: &[usize],
) -> Vec<BenchmarkRecord> {

    let algorithm = format!("item-based-{}", metric);
    let dataset_size = dataset.num_columns();

    let num_rated = dataset.row(user).map(|history| history.len()).unwrap_or(0);
    let comparisons = (dataset_size - num_rated) * num_rated;

    let (expected, sequential_millis) = utils::measure(|| {
        recommend::recommend_item_based(
            dataset, user, config.top_k, metric, config.neighbor_k)
    });

    info!("{}: sequential run for user {} took {:.2}ms", algorithm, user, sequential_millis);

    let mut records = Vec::with_capacity(worker_counts.len() + 1);
    records.push(sequential_record(&algorithm, dataset_size, sequential_millis, comparisons));

    for &num_workers in worker_counts {

        let (recommendations, parallel_millis) = utils::measure(|| {
            recommend::recommend_item_based_parallel(
                dataset, user, config.top_k, metric, config.neighbor_k, num_workers)
        });

        if !same_scores(&recommendations, &expected) {
            warn!("{} with {} workers deviates from the sequential result", algorithm, num_workers);
        }

        records.push(parallel_record(&algorithm, dataset_size, num_workers, sequential_millis,
            parallel_millis, comparisons));
    }

    records
}

fn same_scores(actual: &[ScoredItem], expected: &[ScoredItem]) -> bool {
    actual.len() == expected.len() &&
        actual.iter()
            .zip(expected.iter())
            .all(|(a, b)| (a.score - b.score).abs() <= TOLERANCE)
}

fn sequential_record(
    algorithm: &str,
    dataset_size: usize,
    sequential_millis: f64,
    comparisons: usize,
) -> BenchmarkRecord {
    BenchmarkRecord {
        algorithm: algorithm.to_owned(),
        dataset_size,
        mode: String::from("sequential"),
        num_workers: 1,
        time_ms: sequential_millis,
        speedup: 1.0,
        efficiency: 1.0,
        comparisons,
    }
}

fn parallel_record(
    algorithm: &str,
    dataset_size: usize,
    num_workers: usize,
    sequential_millis: f64,
    parallel_millis: f64,
    comparisons: usize,
) -> BenchmarkRecord {

    let speedup = utils::speedup(sequential_millis, parallel_millis);

    info!("{}: {:2} workers took {:.2}ms (speedup: {:.2}x)",
        algorithm, num_workers, parallel_millis, speedup);

    BenchmarkRecord {
        algorithm: algorithm.to_owned(),
        dataset_size,
        mode: String::from("parallel"),
        num_workers,
        time_ms: parallel_millis,
        speedup,
        efficiency: utils::efficiency(speedup, num_workers),
        comparisons,
    }
}
