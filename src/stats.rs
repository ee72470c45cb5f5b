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

/// Maps the original string identifiers of users and items to consecutive integer ids.
#[derive(Debug, Default)]
pub struct DataDictionary {
    user_dict: FnvHashMap<String, u32>,
    item_dict: FnvHashMap<String, u32>,
    num_interactions: u64,
}

impl DataDictionary {

    pub fn num_users(&self) -> usize {
        self.user_dict.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_dict.len()
    }

    pub fn num_interactions(&self) -> u64 {
        self.num_interactions
    }

    pub fn user_index(&self, name: &str) -> Option<u32> {
        self.user_dict.get(name).cloned()
    }

    pub fn item_index(&self, name: &str) -> Option<u32> {
        self.item_dict.get(name).cloned()
    }

    /// Registers an observed interaction and returns the integer ids of its user and item,
    /// assigning new ids to identifiers we have not seen before.
    pub fn observe(&mut self, user: &str, item: &str) -> (u32, u32) {
        let user_index = index_or_insert(&mut self.user_dict, user);
        let item_index = index_or_insert(&mut self.item_dict, item);
        self.num_interactions += 1;

        (user_index, item_index)
    }

    pub fn from_interactions<'a, I>(interactions: I) -> Self
        where I: IntoIterator<Item = &'a (String, String)> {

        let mut data_dict = DataDictionary::default();
        for &(ref user, ref item) in interactions {
            data_dict.observe(user, item);
        }
        data_dict
    }
}

fn index_or_insert(dict: &mut FnvHashMap<String, u32>, name: &str) -> u32 {
    if let Some(index) = dict.get(name) {
        return *index;
    }

    let index = dict.len() as u32;
    dict.insert(name.to_owned(), index);
    index
}

/// Maps integer ids back to the original string identifiers.
pub struct Renaming {
    user_names: FnvHashMap<u32, String>,
    item_names: FnvHashMap<u32, String>,
}

impl Renaming {

    pub fn user_name(&self, user_index: u32) -> &str {
        &self.user_names[&user_index]
    }

    pub fn item_name(&self, item_index: u32) -> &str {
        &self.item_names[&item_index]
    }
}

impl From<DataDictionary> for Renaming {

    fn from(data_dict: DataDictionary) -> Self {

        let mut user_names: FnvHashMap<u32, String> =
            FnvHashMap::with_capacity_and_hasher(data_dict.num_users(), Default::default());

        let mut item_names: FnvHashMap<u32, String> =
            FnvHashMap::with_capacity_and_hasher(data_dict.num_items(), Default::default());

        for (user, user_id) in data_dict.user_dict.into_iter() {
            user_names.insert(user_id, user);
        }

        for (item, item_id) in data_dict.item_dict.into_iter() {
            item_names.insert(item_id, item);
        }

        Renaming { user_names, item_names }
    }
}
