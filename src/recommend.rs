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

// Neighborhood-based collaborative filtering for a single user.
//
// Both recommenders predict the score of an unrated item as the similarity-weighted average
// `sum(sim * rating) / sum(|sim|)` over a set of neighbors, which resolves to zero if all
// neighbor similarities are zero. The item-based variant uses the items the user rated as
// neighbors of each candidate item, the user-based variant uses the most similar other users.

use fnv::{FnvHashMap, FnvHashSet};
use tracing::debug;

use crate::dataset::Dataset;
use crate::engine;
use crate::similarity::Metric;
use crate::topn::{self, NeighborCandidate, ScoredItem};
use crate::types::{Features, SparseVector};

/// Recommends the `top_k` highest predicted items the user has not rated yet. For every candidate
/// item, the `neighbor_k` most similar items from the user's history act as neighbors (all of
/// them if `neighbor_k` is zero).
pub fn recommend_item_based<W: Features>(
    dataset: &Dataset<W>,
    user: u32,
    top_k: usize,
    metric: Metric,
    neighbor_k: usize,
) -> Vec<ScoredItem> {

    let history = match user_history(dataset, user) {
        Some(history) => history,
        None => return Vec::new(),
    };

    let candidates = unrated_items(dataset, history);

    let scores = engine::score_sequential(&candidates, |item| {
        predict_from_history(dataset, history, item, metric, neighbor_k)
    });

    topn::top_k(scores, top_k)
}

/// Same as `recommend_item_based`, but the candidate items are partitioned across
/// `num_workers` threads.
pub fn recommend_item_based_parallel<W: Features>(
    dataset: &Dataset<W>,
    user: u32,
    top_k: usize,
    metric: Metric,
    neighbor_k: usize,
    num_workers: usize,
) -> Vec<ScoredItem> {

    let history = match user_history(dataset, user) {
        Some(history) => history,
        None => return Vec::new(),
    };

    let candidates = unrated_items(dataset, history);

    let scores = engine::score_partitioned(&candidates, num_workers, |item| {
        predict_from_history(dataset, history, item, metric, neighbor_k)
    });

    topn::top_k(scores, top_k)
}

/// Recommends the `top_k` highest predicted items, based on the ratings of the `neighbor_k` users
/// most similar to the given user (all other users if `neighbor_k` is zero).
pub fn recommend_user_based<W: Features>(
    dataset: &Dataset<W>,
    user: u32,
    top_k: usize,
    metric: Metric,
    neighbor_k: usize,
) -> Vec<ScoredItem> {
    recommend_user_based_with_threshold(dataset, user, top_k, metric, neighbor_k, None)
}

/// User-based recommendation where users with a similarity below `min_similarity` never become
/// neighbors.
pub fn recommend_user_based_with_threshold<W: Features>(
    dataset: &Dataset<W>,
    user: u32,
    top_k: usize,
    metric: Metric,
    neighbor_k: usize,
    min_similarity: Option<f64>,
) -> Vec<ScoredItem> {

    let history = match user_history(dataset, user) {
        Some(history) => history,
        None => return Vec::new(),
    };

    let other_users = other_users(dataset, user);

    let similarities = engine::score_sequential(&other_users, |other_user| {
        metric.similarity(history, &dataset.rows()[&other_user])
    });

    let neighbors = nearest_neighbors(similarities, neighbor_k, min_similarity);
    let candidates = items_rated_by_neighbors(dataset, history, &neighbors);

    let scores = engine::score_sequential(&candidates, |item| {
        predict_from_neighbors(dataset, &neighbors, item)
    });

    topn::top_k(scores, top_k)
}

/// User-based recommendation where both the similarity computation against all other users and
/// the scoring of the candidate items are partitioned across `num_workers` threads.
pub fn recommend_user_based_parallel<W: Features>(
    dataset: &Dataset<W>,
    user: u32,
    top_k: usize,
    metric: Metric,
    neighbor_k: usize,
    min_similarity: Option<f64>,
    num_workers: usize,
) -> Vec<ScoredItem> {

    let history = match user_history(dataset, user) {
        Some(history) => history,
        None => return Vec::new(),
    };

    let other_users = other_users(dataset, user);

    let similarities = engine::score_partitioned(&other_users, num_workers, |other_user| {
        metric.similarity(history, &dataset.rows()[&other_user])
    });

    let neighbors = nearest_neighbors(similarities, neighbor_k, min_similarity);
    let candidates = items_rated_by_neighbors(dataset, history, &neighbors);

    let scores = engine::score_partitioned(&candidates, num_workers, |item| {
        predict_from_neighbors(dataset, &neighbors, item)
    });

    topn::top_k(scores, top_k)
}

fn user_history<W: Features>(dataset: &Dataset<W>, user: u32) -> Option<&SparseVector<W>> {
    match dataset.row(user) {
        Some(history) if !history.is_empty() => Some(history),
        _ => {
            debug!("User {} has no observed interactions, nothing to recommend", user);
            None
        }
    }
}

/// All items the user has not rated, in ascending id order so that partitions are reproducible.
fn unrated_items<W: Features>(dataset: &Dataset<W>, history: &SparseVector<W>) -> Vec<u32> {
    let mut candidates: Vec<u32> = dataset.columns()
        .keys()
        .filter(|item| !history.contains_key(*item))
        .cloned()
        .collect();
    candidates.sort_unstable();
    candidates
}

fn other_users<W: Features>(dataset: &Dataset<W>, user: u32) -> Vec<u32> {
    let mut other_users: Vec<u32> = dataset.rows()
        .keys()
        .filter(|other_user| **other_user != user)
        .cloned()
        .collect();
    other_users.sort_unstable();
    other_users
}

/// Predicts the user's rating for `candidate` from the most similar items in the user's history.
fn predict_from_history<W: Features>(
    dataset: &Dataset<W>,
    history: &SparseVector<W>,
    candidate: u32,
    metric: Metric,
    neighbor_k: usize,
) -> f64 {

    let candidate_vector = match dataset.column(candidate) {
        Some(candidate_vector) => candidate_vector,
        None => return 0.0,
    };

    let similarities = history.keys()
        .filter_map(|rated_item| {
            dataset.column(*rated_item).map(|rated_vector| {
                (*rated_item, metric.similarity(rated_vector, candidate_vector))
            })
        });

    let neighbors = topn::select_neighbors(similarities, neighbor_k);

    weighted_average(neighbors.iter().map(|neighbor| {
        (neighbor.score, history[&neighbor.item].preference())
    }))
}

/// Selects the most similar users. Candidates are offered in ascending id order, so that ties
/// are resolved the same way no matter how the similarities were computed.
fn nearest_neighbors(
    similarities: FnvHashMap<u32, f64>,
    neighbor_k: usize,
    min_similarity: Option<f64>,
) -> Vec<NeighborCandidate> {

    let mut eligible: Vec<(u32, f64)> = similarities.into_iter()
        .filter(|&(_, similarity)| {
            min_similarity.map_or(true, |threshold| similarity >= threshold)
        })
        .collect();

    eligible.sort_unstable_by_key(|&(other_user, _)| other_user);

    topn::select_neighbors(eligible, neighbor_k)
}

fn items_rated_by_neighbors<W: Features>(
    dataset: &Dataset<W>,
    history: &SparseVector<W>,
    neighbors: &[NeighborCandidate],
) -> Vec<u32> {

    let mut candidates: FnvHashSet<u32> = FnvHashSet::default();

    for neighbor in neighbors {
        if let Some(ratings) = dataset.row(neighbor.item) {
            let unrated = ratings.keys().filter(|item| !history.contains_key(*item));
            candidates.extend(unrated.cloned());
        }
    }

    let mut candidates: Vec<u32> = candidates.into_iter().collect();
    candidates.sort_unstable();
    candidates
}

/// Predicts a rating for `item` from the neighbors that rated it.
fn predict_from_neighbors<W: Features>(
    dataset: &Dataset<W>,
    neighbors: &[NeighborCandidate],
    item: u32,
) -> f64 {

    weighted_average(neighbors.iter().filter_map(|neighbor| {
        dataset.row(neighbor.item)
            .and_then(|ratings| ratings.get(&item))
            .map(|weight| (neighbor.score, weight.preference()))
    }))
}

/// Computes `sum(similarity * rating) / sum(|similarity|)`, or zero for a zero denominator.
fn weighted_average<I>(similarities_and_ratings: I) -> f64
    where I: IntoIterator<Item = (f64, f64)> {

    let mut numerator = 0.0;
    let mut denominator = 0.0;

    for (similarity, rating) in similarities_and_ratings {
        numerator += similarity * rating;
        denominator += similarity.abs();
    }

    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}


#[cfg(test)]
mod tests {

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::types::Interaction;

    fn close_enough_to(value: f64, expected: f64) -> bool {
        (value - expected).abs() < 1e-9
    }

    fn random_dataset(num_users: u32, num_items: u32, seed: u64) -> Dataset {
        let mut rng = StdRng::seed_from_u64(seed);

        let observations: Vec<(u32, u32, f64)> = (0..num_users * 6)
            .map(|_| {
                let user = rng.gen_range(0..num_users);
                let item = rng.gen_range(0..num_items);
                let rating = rng.gen_range(1..6) as f64 / 5.0;
                (user, item, rating)
            })
            .collect();

        Dataset::from_observations(observations)
    }

    fn assert_same_recommendations(actual: &[ScoredItem], expected: &[ScoredItem]) {
        assert_eq!(actual.len(), expected.len());

        // Exact ties may come out in any order, so we only compare the scores position-wise
        for (actual_item, expected_item) in actual.iter().zip(expected.iter()) {
            assert!(close_enough_to(actual_item.score, expected_item.score));
        }
    }

    /// User 0 rated items 0 and 1, items 2 and 3 are the only unrated candidates.
    fn small_dataset() -> Dataset {
        Dataset::from_observations(vec![
            (0, 0, 1.0),
            (0, 1, 0.2),
            (1, 0, 1.0),
            (1, 2, 1.0),
            (2, 1, 1.0),
            (2, 3, 0.6),
            (3, 0, 0.8),
            (3, 1, 0.4),
            (3, 2, 0.8),
        ])
    }

    #[test]
    fn weighted_average_with_zero_denominator() {
        assert_eq!(weighted_average(Vec::new()), 0.0);
        assert_eq!(weighted_average(vec![(0.0, 0.7)]), 0.0);
        assert!(close_enough_to(weighted_average(vec![(0.5, 1.0), (-0.5, 0.2)]), 0.4));
    }

    #[test]
    fn item_based_for_unknown_user_is_empty() {
        let dataset = small_dataset();

        assert!(recommend_item_based(&dataset, 42, 10, Metric::Cosine, 0).is_empty());
        assert!(recommend_item_based_parallel(&dataset, 42, 10, Metric::Cosine, 0, 4).is_empty());
        assert!(recommend_user_based(&dataset, 42, 10, Metric::Cosine, 0).is_empty());
    }

    #[test]
    fn item_based_returns_both_candidates_regardless_of_neighbor_k() {
        let dataset = small_dataset();

        for &neighbor_k in &[0, 1, 2, 5] {
            let recommendations = recommend_item_based(&dataset, 0, 2, Metric::Cosine, neighbor_k);

            assert_eq!(recommendations.len(), 2);
            assert!(recommendations[0].score >= recommendations[1].score);

            let mut items: Vec<u32> = recommendations.iter().map(|scored| scored.item).collect();
            items.sort();
            assert_eq!(items, vec![2, 3]);
        }
    }

    #[test]
    fn item_based_prediction() {
        let dataset = small_dataset();

        // Item 2 is rated by users 1 and 3, item 3 only by user 2. With a single neighbor, each
        // candidate is predicted from the most similar item in user 0's history.
        let recommendations = recommend_item_based(&dataset, 0, 2, Metric::Cosine, 1);

        // cos(item 0, item 2) > 0 and item 0 was rated 1.0, cos(item 1, item 3) > 0 with rating 0.2
        assert_eq!(recommendations[0].item, 2);
        assert!(close_enough_to(recommendations[0].score, 1.0));
        assert_eq!(recommendations[1].item, 3);
        assert!(close_enough_to(recommendations[1].score, 0.2));
    }

    #[test]
    fn item_based_top_k_cut() {
        let dataset = small_dataset();

        assert_eq!(recommend_item_based(&dataset, 0, 1, Metric::Jaccard, 0).len(), 1);
        assert!(recommend_item_based(&dataset, 0, 0, Metric::Jaccard, 0).is_empty());
    }

    #[test]
    fn item_based_parallel_matches_sequential() {
        let dataset = random_dataset(40, 60, 17);

        for metric in Metric::ALL.iter() {
            for &user in &[0, 5, 13] {
                let expected = recommend_item_based(&dataset, user, 10, *metric, 5);

                for &num_workers in &[1, 2, 4, 8] {
                    let recommendations =
                        recommend_item_based_parallel(&dataset, user, 10, *metric, 5, num_workers);
                    assert_same_recommendations(&recommendations, &expected);
                }
            }
        }
    }

    #[test]
    fn user_based_prediction() {
        let dataset = small_dataset();

        // User 3 shares both of user 0's items, users 1 and 2 share one each
        let recommendations = recommend_user_based(&dataset, 0, 10, Metric::Cosine, 1);

        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].item, 2);
        assert!(close_enough_to(recommendations[0].score, 0.8));
    }

    #[test]
    fn user_based_with_all_neighbors() {
        let dataset = small_dataset();

        let recommendations = recommend_user_based(&dataset, 0, 10, Metric::Jaccard, 0);

        let mut items: Vec<u32> = recommendations.iter().map(|scored| scored.item).collect();
        items.sort();
        assert_eq!(items, vec![2, 3]);

        for scored in recommendations.iter() {
            assert!(scored.score > 0.0);
        }
    }

    #[test]
    fn user_based_threshold_excludes_weak_neighbors() {
        let dataset = small_dataset();

        // Jaccard of user 0 with user 1 and user 2 is 1/3, with user 3 it is 2/3
        let recommendations =
            recommend_user_based_with_threshold(&dataset, 0, 10, Metric::Jaccard, 0, Some(0.5));

        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].item, 2);
        assert!(close_enough_to(recommendations[0].score, 0.8));

        let nobody =
            recommend_user_based_with_threshold(&dataset, 0, 10, Metric::Jaccard, 0, Some(0.9));
        assert!(nobody.is_empty());
    }

    #[test]
    fn user_based_parallel_matches_sequential() {
        let dataset = random_dataset(40, 60, 23);

        for metric in Metric::ALL.iter() {
            for &user in &[1, 7, 30] {
                let expected = recommend_user_based(&dataset, user, 10, *metric, 8);

                for &num_workers in &[1, 2, 4, 8] {
                    let recommendations = recommend_user_based_parallel(
                        &dataset, user, 10, *metric, 8, None, num_workers);
                    assert_same_recommendations(&recommendations, &expected);
                }
            }
        }
    }

    #[test]
    fn recommendations_on_interactions_use_ratings() {
        let dataset = Dataset::from_observations(vec![
            (0, 100, Interaction::new(0.9, 0.8)),
            (1, 100, Interaction::new(0.7, 0.6)),
            (1, 200, Interaction::new(0.1, 0.4)),
        ]);

        let recommendations = recommend_user_based(&dataset, 0, 5, Metric::JaccardWeighted, 0);

        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].item, 200);
        assert!(close_enough_to(recommendations[0].score, 0.4));

        let recommendations = recommend_item_based(&dataset, 0, 5, Metric::Cosine, 0);

        assert_eq!(recommendations.len(), 1);
        assert!(close_enough_to(recommendations[0].score, 0.8));
    }
}
