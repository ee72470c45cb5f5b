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

use std::fmt;

use crate::types::{Features, SparseVector};

/// The closed set of supported similarity measures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    Cosine,
    Pearson,
    Jaccard,
    JaccardWeighted,
}

impl Metric {

    pub const ALL: [Metric; 4] =
        [Metric::Cosine, Metric::Pearson, Metric::Jaccard, Metric::JaccardWeighted];

    /// Resolves a metric from its name. Unknown names fall back to cosine similarity.
    pub fn from_name(name: &str) -> Metric {
        match name.trim().to_lowercase().replace('_', "-").as_str() {
            "pearson" => Metric::Pearson,
            "jaccard" => Metric::Jaccard,
            "jaccard-weighted" | "weighted-jaccard" => Metric::JaccardWeighted,
            _ => Metric::Cosine,
        }
    }

    pub fn name(&self) -> &'static str {
        match *self {
            Metric::Cosine => "cosine",
            Metric::Pearson => "pearson",
            Metric::Jaccard => "jaccard",
            Metric::JaccardWeighted => "jaccard-weighted",
        }
    }

    #[inline]
    pub fn similarity<W: Features>(&self, a: &SparseVector<W>, b: &SparseVector<W>) -> f64 {
        match *self {
            Metric::Cosine => cosine(a, b),
            Metric::Pearson => pearson(a, b),
            Metric::Jaccard => jaccard(a, b),
            Metric::JaccardWeighted => jaccard_weighted(a, b),
        }
    }
}

impl Default for Metric {
    fn default() -> Self {
        Metric::Cosine
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cosine similarity. The dot product only covers keys present in both vectors, while the norms
/// cover the complete key sets of each vector.
pub fn cosine<W: Features>(a: &SparseVector<W>, b: &SparseVector<W>) -> f64 {

    let mut dot_product: f64 = 0.0;
    let mut squared_norm_a: f64 = 0.0;

    for (key, weight_a) in a.iter() {
        if let Some(weight_b) = b.get(key) {
            dot_product += dot(weight_a.values(), weight_b.values());
        }
        squared_norm_a += dot(weight_a.values(), weight_a.values());
    }

    let squared_norm_b: f64 = b.values()
        .map(|weight_b| dot(weight_b.values(), weight_b.values()))
        .sum();

    if squared_norm_a == 0.0 || squared_norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (squared_norm_a.sqrt() * squared_norm_b.sqrt())
}

/// Pearson correlation on the co-observed keys only, centered around the means of the
/// co-observed values. Needs at least two common keys.
pub fn pearson<W: Features>(a: &SparseVector<W>, b: &SparseVector<W>) -> f64 {

    let common: Vec<(&[f64], &[f64])> = a.iter()
        .filter_map(|(key, weight_a)| {
            b.get(key).map(|weight_b| (weight_a.values(), weight_b.values()))
        })
        .collect();

    if common.len() < 2 {
        return 0.0;
    }

    let mut num_values = 0;
    let mut sum_a: f64 = 0.0;
    let mut sum_b: f64 = 0.0;

    for &(values_a, values_b) in common.iter() {
        for (value_a, value_b) in values_a.iter().zip(values_b.iter()) {
            sum_a += value_a;
            sum_b += value_b;
            num_values += 1;
        }
    }

    let mean_a = sum_a / num_values as f64;
    let mean_b = sum_b / num_values as f64;

    let mut covariance: f64 = 0.0;
    let mut variance_a: f64 = 0.0;
    let mut variance_b: f64 = 0.0;

    for &(values_a, values_b) in common.iter() {
        for (value_a, value_b) in values_a.iter().zip(values_b.iter()) {
            let centered_a = value_a - mean_a;
            let centered_b = value_b - mean_b;
            covariance += centered_a * centered_b;
            variance_a += centered_a * centered_a;
            variance_b += centered_b * centered_b;
        }
    }

    if variance_a == 0.0 || variance_b == 0.0 {
        return 0.0;
    }

    covariance / (variance_a.sqrt() * variance_b.sqrt())
}

/// Jaccard index on the key sets, weights are ignored.
pub fn jaccard<W>(a: &SparseVector<W>, b: &SparseVector<W>) -> f64 {

    let (smaller, larger) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let intersection = smaller.keys()
        .filter(|key| larger.contains_key(*key))
        .count();

    let union = a.len() + b.len() - intersection;

    if union == 0 {
        return 0.0;
    }

    intersection as f64 / union as f64
}

/// Weighted Jaccard index: the sum of per-key minimums divided by the sum of per-key maximums
/// over the union of keys, where each key contributes the sum of its feature values.
pub fn jaccard_weighted<W: Features>(a: &SparseVector<W>, b: &SparseVector<W>) -> f64 {

    let mut min_sum: f64 = 0.0;
    let mut max_sum: f64 = 0.0;

    for (key, weight_a) in a.iter() {
        let total_a = weight_a.total();
        let total_b = b.get(key).map(|weight_b| weight_b.total()).unwrap_or(0.0);

        min_sum += total_a.min(total_b);
        max_sum += total_a.max(total_b);
    }

    for (key, weight_b) in b.iter() {
        if !a.contains_key(key) {
            let total_b = weight_b.total();
            min_sum += total_b.min(0.0);
            max_sum += total_b.max(0.0);
        }
    }

    if max_sum == 0.0 {
        return 0.0;
    }

    min_sum / max_sum
}

#[inline(always)]
fn dot(values_a: &[f64], values_b: &[f64]) -> f64 {
    values_a.iter().zip(values_b.iter()).map(|(x, y)| x * y).sum()
}
