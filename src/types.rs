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

use std::slice;

use fnv::FnvHashMap;

/// The observed features of one entity, keyed by the id of the other side (e.g. item ids for a
/// user). Absent keys have an implicit weight of zero.
pub type SparseVector<W = f64> = FnvHashMap<u32, W>;

pub fn new_sparse_vector<W>(capacity: usize) -> SparseVector<W> {
    FnvHashMap::with_capacity_and_hasher(capacity, Default::default())
}

/// The weight stored per key of a sparse vector. A weight consists of one or more real-valued
/// features.
pub trait Features: Copy + Send + Sync {

    /// All feature values observed at a single key.
    fn values(&self) -> &[f64];

    /// Single scalar for this key, used by weighted Jaccard.
    fn total(&self) -> f64 {
        self.values().iter().sum()
    }

    /// The value that acts as "the rating" when this weight enters a weighted average.
    fn preference(&self) -> f64;
}

impl Features for f64 {

    fn values(&self) -> &[f64] {
        slice::from_ref(self)
    }

    fn total(&self) -> f64 {
        *self
    }

    fn preference(&self) -> f64 {
        *self
    }
}

/// A user-game interaction with normalized playtime and rating.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interaction {
    features: [f64; 2],
}

impl Interaction {

    pub fn new(playtime_norm: f64, rating: f64) -> Self {
        Interaction { features: [playtime_norm, rating] }
    }

    pub fn playtime_norm(&self) -> f64 {
        self.features[0]
    }

    pub fn rating(&self) -> f64 {
        self.features[1]
    }
}

impl Features for Interaction {

    fn values(&self) -> &[f64] {
        &self.features
    }

    fn preference(&self) -> f64 {
        self.rating()
    }
}

/// An entity id together with a view on its feature vector.
#[derive(Debug)]
pub struct EntityRecord<'a, W: 'a = f64> {
    pub id: u32,
    pub features: &'a SparseVector<W>,
}

impl<'a, W> Clone for EntityRecord<'a, W> {
    fn clone(&self) -> Self {
        EntityRecord { id: self.id, features: self.features }
    }
}

impl<'a, W> Copy for EntityRecord<'a, W> {}

/// Dense, square and symmetric table of pairwise similarities, indexed by entity ordinal. The
/// diagonal always holds 1.0.
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarityMatrix {
    size: usize,
    values: Vec<f64>,
}

impl SimilarityMatrix {

    pub fn new(size: usize) -> Self {
        let mut values = vec![0.0; size * size];
        for i in 0..size {
            values[i * size + i] = 1.0;
        }
        SimilarityMatrix { size, values }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.size + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let start = i * self.size;
        &self.values[start..start + self.size]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks(0) panics, an empty matrix simply has no rows
        self.values.chunks(self.size.max(1))
    }

    /// Writes a similarity for an off-diagonal pair into both halves of the matrix.
    pub(crate) fn set_symmetric(&mut self, i: usize, j: usize, similarity: f64) {
        self.values[i * self.size + j] = similarity;
        self.values[j * self.size + i] = similarity;
    }

    /// Largest absolute difference between two matrices, infinite if their sizes differ.
    pub fn max_abs_difference(&self, other: &SimilarityMatrix) -> f64 {
        if self.size != other.size {
            return f64::INFINITY;
        }

        self.values.iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}
