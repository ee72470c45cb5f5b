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

// Fans similarity computations out to a pool of worker threads.
//
// Two strategies are available. Pair enumeration streams all index pairs of a list of entities
// through a bounded work queue, and a single collector owns the resulting matrix. Partitioning
// splits a list of tasks into contiguous slices, each worker scores its slice into a private
// map, and the maps are merged after all workers are done.

use std::cmp;
use std::ops::Range;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Mutex, PoisonError};

use fnv::FnvHashMap;
use scoped_pool::Pool;
use tracing::debug;

use crate::similarity::Metric;
use crate::types::{EntityRecord, Features, SimilarityMatrix};

/// Number of queued pairs we allow per worker before the producer blocks.
const QUEUE_SLOTS_PER_WORKER: usize = 100;

/// A similarity computed by a worker, addressed by the ordinals of both entities.
#[derive(Debug)]
struct PairSimilarity {
    i: usize,
    j: usize,
    similarity: f64,
}

pub fn num_pairs(num_entities: usize) -> usize {
    num_entities * num_entities.saturating_sub(1) / 2
}

/// Capacity of the work queue and the result channel, never below one slot.
pub fn queue_capacity(num_tasks: usize, num_workers: usize) -> usize {
    cmp::max(1, cmp::min(num_tasks, num_workers * QUEUE_SLOTS_PER_WORKER))
}

/// Computes all pairwise similarities on the calling thread.
pub fn similarity_matrix_sequential<W: Features>(
    entities: &[EntityRecord<W>],
    metric: Metric,
) -> SimilarityMatrix {

    let num_entities = entities.len();
    let mut matrix = SimilarityMatrix::new(num_entities);

    for i in 0..num_entities {
        for j in (i + 1)..num_entities {
            let similarity = metric.similarity(entities[i].features, entities[j].features);
            matrix.set_symmetric(i, j, similarity);
        }
    }

    matrix
}

/// Computes all pairwise similarities with `num_workers` threads. A producer enumerates the pairs
/// `(i, j), i < j` into a bounded queue, the workers publish their results to a bounded channel
/// and the calling thread is the only one writing to the matrix.
pub fn similarity_matrix<W: Features>(
    entities: &[EntityRecord<W>],
    metric: Metric,
    num_workers: usize,
) -> SimilarityMatrix {

    let num_entities = entities.len();
    let num_workers = cmp::max(1, num_workers);
    let num_pairs = num_pairs(num_entities);

    let mut matrix = SimilarityMatrix::new(num_entities);

    if num_pairs == 0 {
        return matrix;
    }

    let capacity = queue_capacity(num_pairs, num_workers);

    debug!(
        "Comparing {} pairs of {} entities with {} workers (metric: {}, queue capacity: {})",
        num_pairs, num_entities, num_workers, metric, capacity,
    );

    let (job_sender, job_receiver) = mpsc::sync_channel::<(usize, usize)>(capacity);
    let (result_sender, result_receiver) = mpsc::sync_channel::<PairSimilarity>(capacity);
    let job_receiver = Mutex::new(job_receiver);

    // One additional thread runs the producer
    let pool = Pool::new(num_workers + 1);

    pool.scoped(|scope| {

        for _ in 0..num_workers {
            let jobs = &job_receiver;
            let results = result_sender.clone();

            scope.execute(move || compare_pairs(entities, metric, jobs, results));
        }

        // The collector stops once every worker has dropped its sender
        drop(result_sender);

        scope.execute(move || enumerate_pairs(num_entities, job_sender));

        for PairSimilarity { i, j, similarity } in result_receiver.iter() {
            matrix.set_symmetric(i, j, similarity);
        }
    });

    pool.shutdown();

    matrix
}

fn enumerate_pairs(num_entities: usize, jobs: SyncSender<(usize, usize)>) {
    for i in 0..num_entities {
        for j in (i + 1)..num_entities {
            if jobs.send((i, j)).is_err() {
                return;
            }
        }
    }
}

fn compare_pairs<W: Features>(
    entities: &[EntityRecord<W>],
    metric: Metric,
    jobs: &Mutex<Receiver<(usize, usize)>>,
    results: SyncSender<PairSimilarity>,
) {
    loop {
        // The guard only lives for this statement, workers never hold the lock while computing
        let job = jobs.lock().unwrap_or_else(PoisonError::into_inner).recv();

        let (i, j) = match job {
            Ok(pair) => pair,
            Err(_) => return,
        };

        let similarity = metric.similarity(entities[i].features, entities[j].features);

        if results.send(PairSimilarity { i, j, similarity }).is_err() {
            return;
        }
    }
}

/// Splits `num_tasks` into one contiguous range per worker. Every range but the last holds
/// `max(1, num_tasks / num_workers)` tasks, the last one absorbs the remainder. Surplus workers
/// receive empty ranges.
pub fn partition_bounds(num_tasks: usize, num_workers: usize) -> Vec<Range<usize>> {

    let num_workers = cmp::max(1, num_workers);
    let chunk_size = cmp::max(1, num_tasks / num_workers);

    (0..num_workers)
        .map(|worker| {
            let start = cmp::min(worker * chunk_size, num_tasks);
            let end = if worker == num_workers - 1 {
                num_tasks
            } else {
                cmp::min(start + chunk_size, num_tasks)
            };
            start..end
        })
        .collect()
}

/// Scores every task on the calling thread.
pub fn score_sequential<F>(tasks: &[u32], score: F) -> FnvHashMap<u32, f64>
    where F: Fn(u32) -> f64 {

    let mut scores = FnvHashMap::with_capacity_and_hasher(tasks.len(), Default::default());
    for &task in tasks {
        scores.insert(task, score(task));
    }
    scores
}

/// Scores every task with `num_workers` threads. Each worker owns a private map for its slice of
/// the tasks, the maps are merged once all workers are finished.
pub fn score_partitioned<F>(tasks: &[u32], num_workers: usize, score: F) -> FnvHashMap<u32, f64>
    where F: Fn(u32) -> f64 + Sync {

    let bounds = partition_bounds(tasks.len(), num_workers);

    debug!("Scoring {} tasks in {} partitions", tasks.len(), bounds.len());

    let mut partials: Vec<FnvHashMap<u32, f64>> = bounds.iter()
        .map(|range| FnvHashMap::with_capacity_and_hasher(range.len(), Default::default()))
        .collect();

    let pool = Pool::new(bounds.len());

    pool.scoped(|scope| {
        for (range, partial) in bounds.iter().zip(partials.iter_mut()) {

            let slice = &tasks[range.clone()];
            let score = &score;

            scope.execute(move || {
                for &task in slice {
                    partial.insert(task, score(task));
                }
            });
        }
    });

    pool.shutdown();

    let mut scores = FnvHashMap::with_capacity_and_hasher(tasks.len(), Default::default());
    for partial in partials.into_iter() {
        scores.extend(partial);
    }

    scores
}


#[cfg(test)]
mod tests {

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::types::{self, SparseVector};

    fn vector(entries: &[(u32, f64)]) -> SparseVector {
        let mut vector = types::new_sparse_vector(entries.len());
        for &(key, weight) in entries {
            vector.insert(key, weight);
        }
        vector
    }

    fn random_vectors(num_entities: usize, seed: u64) -> Vec<SparseVector> {
        let mut rng = StdRng::seed_from_u64(seed);

        (0..num_entities)
            .map(|_| {
                let num_entries = rng.gen_range(0..12);
                let mut vector = types::new_sparse_vector(num_entries);
                for _ in 0..num_entries {
                    vector.insert(rng.gen_range(0..20), rng.gen_range(0.0..1.0));
                }
                vector
            })
            .collect()
    }

    fn records(vectors: &[SparseVector]) -> Vec<EntityRecord> {
        vectors.iter()
            .enumerate()
            .map(|(id, features)| EntityRecord { id: id as u32, features })
            .collect()
    }

    fn assert_symmetric_with_unit_diagonal(matrix: &SimilarityMatrix) {
        for i in 0..matrix.size() {
            assert_eq!(matrix.get(i, i), 1.0);
            for j in 0..matrix.size() {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
            }
        }
    }

    #[test]
    fn three_entities() {
        let vectors = vec![
            vector(&[(1, 1.0), (2, 0.5)]),
            vector(&[(1, 1.0), (2, 0.5)]),
            vector(&[(1, 0.0), (3, 1.0)]),
        ];
        let entities = records(&vectors);

        let matrix = similarity_matrix(&entities, Metric::Cosine, 2);

        assert_eq!(matrix.size(), 3);
        assert!((matrix.get(0, 1) - 1.0).abs() < 1e-9);
        assert!(matrix.get(0, 2).abs() < 1e-9);
        assert_symmetric_with_unit_diagonal(&matrix);
    }

    #[test]
    fn parallel_matches_sequential() {
        for &num_entities in &[0, 1, 2, 50] {
            let vectors = random_vectors(num_entities, num_entities as u64);
            let entities = records(&vectors);

            for metric in Metric::ALL.iter() {
                let expected = similarity_matrix_sequential(&entities, *metric);

                for &num_workers in &[1, 2, 4, 8] {
                    let matrix = similarity_matrix(&entities, *metric, num_workers);

                    assert_eq!(matrix.size(), num_entities);
                    assert!(matrix.max_abs_difference(&expected) < 1e-9);
                    assert_symmetric_with_unit_diagonal(&matrix);
                }
            }
        }
    }

    #[test]
    fn more_workers_than_pairs() {
        let vectors = random_vectors(3, 7);
        let entities = records(&vectors);

        let expected = similarity_matrix_sequential(&entities, Metric::Jaccard);
        let matrix = similarity_matrix(&entities, Metric::Jaccard, 16);

        assert!(matrix.max_abs_difference(&expected) < 1e-9);
    }

    #[test]
    fn zero_workers_behave_like_one() {
        let vectors = random_vectors(5, 3);
        let entities = records(&vectors);

        let expected = similarity_matrix_sequential(&entities, Metric::Pearson);
        let matrix = similarity_matrix(&entities, Metric::Pearson, 0);

        assert!(matrix.max_abs_difference(&expected) < 1e-9);
    }

    #[test]
    fn queue_capacity_bounds() {
        assert_eq!(queue_capacity(0, 4), 1);
        assert_eq!(queue_capacity(3, 4), 3);
        assert_eq!(queue_capacity(10_000, 4), 400);
        assert_eq!(num_pairs(0), 0);
        assert_eq!(num_pairs(1), 0);
        assert_eq!(num_pairs(50), 1225);
    }

    fn assert_covers_exactly_once(bounds: &[Range<usize>], num_tasks: usize) {
        let mut covered = vec![0; num_tasks];
        for range in bounds {
            for task in range.clone() {
                covered[task] += 1;
            }
        }
        assert!(covered.iter().all(|&count| count == 1));
    }

    #[test]
    fn partitions_absorb_remainder() {
        let bounds = partition_bounds(10, 3);

        assert_eq!(bounds, vec![0..3, 3..6, 6..10]);
        assert_covers_exactly_once(&bounds, 10);
    }

    #[test]
    fn partitions_with_surplus_workers() {
        let bounds = partition_bounds(2, 5);

        assert_eq!(bounds.len(), 5);
        assert_eq!(bounds[0], 0..1);
        assert_eq!(bounds[1], 1..2);
        assert!(bounds[2..].iter().all(|range| range.len() == 0));
        assert_covers_exactly_once(&bounds, 2);
    }

    #[test]
    fn partitions_cover_all_tasks() {
        for num_tasks in 0..40 {
            for num_workers in 0..10 {
                let bounds = partition_bounds(num_tasks, num_workers);
                assert_eq!(bounds.len(), cmp::max(1, num_workers));
                assert_covers_exactly_once(&bounds, num_tasks);
            }
        }
    }

    #[test]
    fn partitioned_scoring_matches_sequential() {
        let tasks: Vec<u32> = (0..97).map(|task| task * 3).collect();
        let score = |task: u32| (task as f64).sqrt() / 7.0;

        let expected = score_sequential(&tasks, score);

        for &num_workers in &[1, 2, 4, 8, 200] {
            let scores = score_partitioned(&tasks, num_workers, score);
            assert_eq!(scores, expected);
        }

        assert!(score_partitioned(&[], 4, score).is_empty());
    }
}
