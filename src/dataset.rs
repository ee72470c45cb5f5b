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

use fnv::FnvHashMap;

use crate::types::{self, EntityRecord, Features, SparseVector};

pub type SparseIndex<W> = FnvHashMap<u32, SparseVector<W>>;

/// Observed weights between row entities (users) and column entities (items), indexed both ways.
/// Both indexes are built once and never change afterwards.
#[derive(Clone, Debug)]
pub struct Dataset<W = f64> {
    rows: SparseIndex<W>,
    columns: SparseIndex<W>,
    num_observations: usize,
}

impl<W: Features> Dataset<W> {

    /// Builds both indexes from `(row, column, weight)` observations. A repeated observation for
    /// the same row and column replaces the earlier one.
    pub fn from_observations<I>(observations: I) -> Self
        where I: IntoIterator<Item = (u32, u32, W)> {

        let mut rows: SparseIndex<W> = FnvHashMap::default();
        let mut columns: SparseIndex<W> = FnvHashMap::default();
        let mut num_observations = 0;

        for (row, column, weight) in observations {

            let previous = rows.entry(row)
                .or_insert_with(|| types::new_sparse_vector(10))
                .insert(column, weight);

            columns.entry(column)
                .or_insert_with(|| types::new_sparse_vector(10))
                .insert(row, weight);

            if previous.is_none() {
                num_observations += 1;
            }
        }

        Dataset { rows, columns, num_observations }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_observations(&self) -> usize {
        self.num_observations
    }

    pub fn row(&self, row: u32) -> Option<&SparseVector<W>> {
        self.rows.get(&row)
    }

    pub fn column(&self, column: u32) -> Option<&SparseVector<W>> {
        self.columns.get(&column)
    }

    /// The by-row index, e.g. user to item weights.
    pub fn rows(&self) -> &SparseIndex<W> {
        &self.rows
    }

    /// The by-column index, e.g. item to user weights.
    pub fn columns(&self) -> &SparseIndex<W> {
        &self.columns
    }

    /// All row entities in ascending id order, so that matrix ordinals are reproducible.
    pub fn row_records(&self) -> Vec<EntityRecord<W>> {
        sorted_records(&self.rows)
    }

    pub fn column_records(&self) -> Vec<EntityRecord<W>> {
        sorted_records(&self.columns)
    }
}

fn sorted_records<W>(index: &SparseIndex<W>) -> Vec<EntityRecord<W>> {
    let mut records: Vec<EntityRecord<W>> = index.iter()
        .map(|(id, features)| EntityRecord { id: *id, features })
        .collect();
    records.sort_by_key(|record| record.id);
    records
}
