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

use crate::error::{Error, Result};
use crate::similarity::Metric;

/// Parameters shared by the similarity matrix computation and the recommenders.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub metric: Metric,
    /// Number of recommendations to compute per user.
    pub top_k: usize,
    /// Number of neighbors to take into account per prediction, zero means all of them.
    pub neighbor_k: usize,
    pub num_workers: usize,
    /// Users below this similarity never become neighbors in user-based recommendation.
    pub min_neighbor_similarity: Option<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            metric: Metric::Cosine,
            top_k: 10,
            neighbor_k: 30,
            num_workers: num_cpus::get(),
            min_neighbor_similarity: None,
        }
    }
}

impl Config {

    pub fn validate(&self) -> Result<()> {

        if self.top_k == 0 {
            return Err(Error::InvalidConfig(String::from("top_k must be positive")));
        }

        if self.num_workers == 0 {
            return Err(Error::InvalidConfig(String::from("num_workers must be positive")));
        }

        if let Some(threshold) = self.min_neighbor_similarity {
            if !threshold.is_finite() {
                return Err(Error::InvalidConfig(
                    format!("min_neighbor_similarity must be finite, got {}", threshold)));
            }
        }

        Ok(())
    }
}
