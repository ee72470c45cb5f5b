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

// Pairwise similarities between sparse weighted feature vectors, and neighborhood-based
// recommendations built on top of them, computed with a pool of worker threads.


pub mod benchmark;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod io;
pub mod recommend;
pub mod similarity;
pub mod stats;
pub mod topn;
pub mod types;
pub mod utils;

use tracing::info;

pub use crate::config::Config;
pub use crate::dataset::Dataset;
pub use crate::error::{Error, Result};
pub use crate::similarity::Metric;
pub use crate::topn::{BoundedTopN, ScoredItem};
pub use crate::types::{EntityRecord, Features, Interaction, SimilarityMatrix, SparseVector};

/// Which neighborhood to predict from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    ItemBased,
    UserBased,
}

impl Strategy {

    pub fn from_name(name: &str) -> Option<Strategy> {
        match name.trim().to_lowercase().as_str() {
            "item" | "item-based" => Some(Strategy::ItemBased),
            "user" | "user-based" => Some(Strategy::UserBased),
            _ => None,
        }
    }
}

/// Computes the similarity matrix between all row entities of the dataset (in ascending id
/// order) with the configured metric and number of workers.
pub fn similarity_matrix<W: Features>(dataset: &Dataset<W>, config: &Config) -> SimilarityMatrix {
    similarity_matrix_between(&dataset.row_records(), config)
}

/// Computes the similarity matrix between the given entities, the ordinals of the matrix follow
/// the order of the slice.
pub fn similarity_matrix_between<W: Features>(
    entities: &[EntityRecord<W>],
    config: &Config,
) -> SimilarityMatrix {

    info!(
        "Computing {} similarities between {} entities with {} workers",
        config.metric, entities.len(), config.num_workers,
    );

    engine::similarity_matrix(entities, config.metric, config.num_workers)
}

/// Computes recommendations for a single user. Runs on the calling thread for a single worker
/// and partitions the work otherwise.
pub fn recommend<W: Features>(
    dataset: &Dataset<W>,
    user: u32,
    strategy: Strategy,
    config: &Config,
) -> Vec<ScoredItem> {

    match (strategy, config.num_workers) {
        (Strategy::ItemBased, 1) => recommend::recommend_item_based(
            dataset, user, config.top_k, config.metric, config.neighbor_k),
        (Strategy::ItemBased, num_workers) => recommend::recommend_item_based_parallel(
            dataset, user, config.top_k, config.metric, config.neighbor_k, num_workers),
        (Strategy::UserBased, 1) => recommend::recommend_user_based_with_threshold(
            dataset, user, config.top_k, config.metric, config.neighbor_k,
            config.min_neighbor_similarity),
        (Strategy::UserBased, num_workers) => recommend::recommend_user_based_parallel(
            dataset, user, config.top_k, config.metric, config.neighbor_k,
            config.min_neighbor_similarity, num_workers),
    }
}
