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

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::mem;

/// An entity id with a score, used both for neighbor candidates and for ranked output.
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct ScoredItem {
    pub item: u32,
    pub score: f64,
}

/// A candidate produced while scoring neighbors for a single query.
pub type NeighborCandidate = ScoredItem;

/// Ordering for our heap, note that we must use a special implementation here as there is no
/// total order on floating point numbers. The order is reversed, so that the binary heap keeps
/// the lowest score on top.
fn cmp_reverse(scored_item_a: &ScoredItem, scored_item_b: &ScoredItem) -> Ordering {
    match scored_item_a.score.partial_cmp(&scored_item_b.score) {
        Some(Ordering::Less) => Ordering::Greater,
        Some(Ordering::Greater) => Ordering::Less,
        Some(Ordering::Equal) => Ordering::Equal,
        None => Ordering::Equal
    }
}

impl Eq for ScoredItem {}

impl Ord for ScoredItem {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_reverse(self, other)
    }
}

impl PartialOrd for ScoredItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(cmp_reverse(self, other))
    }
}

/// Retains the `capacity` highest scored candidates of a stream, in O(log capacity) per offer.
pub struct BoundedTopN {
    capacity: usize,
    heap: BinaryHeap<ScoredItem>,
}

impl BoundedTopN {

    pub fn new(capacity: usize) -> Self {
        BoundedTopN { capacity, heap: BinaryHeap::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn offer(&mut self, item: u32, score: f64) {

        let scored_item = ScoredItem { item, score };

        if self.heap.len() < self.capacity {
            self.heap.push(scored_item);
        } else if let Some(mut lowest) = self.heap.peek_mut() {
            // Strictly greater scores only, ties keep the entry we already hold
            if scored_item < *lowest {
                *lowest = scored_item;
            }
        }
    }

    /// Hands out the retained candidates sorted by descending score and leaves the selector empty.
    pub fn drain(&mut self) -> Vec<ScoredItem> {
        let heap = mem::replace(&mut self.heap, BinaryHeap::with_capacity(self.capacity));
        heap.into_sorted_vec()
    }
}

/// Picks the `n` highest scored candidates, or every candidate if `n` is zero.
pub fn select_neighbors<I>(candidates: I, n: usize) -> Vec<NeighborCandidate>
    where I: IntoIterator<Item = (u32, f64)> {

    if n == 0 {
        return candidates.into_iter()
            .map(|(item, score)| ScoredItem { item, score })
            .collect();
    }

    let mut top_n = BoundedTopN::new(n);
    for (item, score) in candidates {
        top_n.offer(item, score);
    }

    top_n.drain()
}

/// Sorts all scored items by descending score and keeps the first `k`. The order among exact
/// ties is unspecified.
pub fn top_k<I>(scores: I, k: usize) -> Vec<ScoredItem>
    where I: IntoIterator<Item = (u32, f64)> {

    let mut ranked: Vec<ScoredItem> = scores.into_iter()
        .map(|(item, score)| ScoredItem { item, score })
        .collect();

    // With the reversed ordering, an ascending sort ranks the highest score first
    ranked.sort_unstable();
    ranked.truncate(k);

    ranked
}
