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

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Terminator, Trim, WriterBuilder};
use serde_derive::Serialize;
use tracing::{debug, info};

use crate::benchmark::BenchmarkRecord;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::stats::{DataDictionary, Renaming};
use crate::topn::ScoredItem;
use crate::types::{Interaction, SimilarityMatrix};

/// Ratings are given on a scale from 1 to 5 and normalized to [0, 1].
const RATING_SCALE: f64 = 5.0;

/// Interaction files carry the app id, the steam id, the normalized playtime and the rating.
const NUM_INTERACTION_COLUMNS: usize = 4;

/// We expect a header line and comma separated records. Records with missing trailing fields
/// are tolerated by the reader and skipped by the parsers.
fn csv_reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input)
}

/// If a `path` is supplied we write to a file at the specified path, otherwise to stdout.
fn output(path: Option<&str>) -> Result<Box<dyn Write>> {
    let out: Box<dyn Write> = match path {
        Some(path) => Box::new(File::create(Path::new(path))?),
        None => Box::new(io::stdout()),
    };

    Ok(out)
}

/// Reads a ratings file with the columns `userId,movieId,rating[,timestamp]`.
pub fn read_ratings(path: &str) -> Result<(Dataset, DataDictionary)> {
    let file = File::open(path)?;
    read_ratings_from(file)
}

pub fn read_ratings_from<R: Read>(input: R) -> Result<(Dataset, DataDictionary)> {

    let mut reader = csv_reader(input);
    let mut data_dict = DataDictionary::default();
    let mut observations = Vec::new();
    let mut num_skipped = 0;

    for record in reader.records() {
        let record = record?;

        match parse_rating(&record) {
            Some((user, item, rating)) => {
                let (user_index, item_index) = data_dict.observe(user, item);
                observations.push((user_index, item_index, rating));
            },
            None => {
                debug!("Skipping malformed rating record {:?}", record);
                num_skipped += 1;
            },
        }
    }

    let dataset = Dataset::from_observations(observations);

    info!(
        "Read {} ratings between {} users and {} items ({} records skipped)",
        dataset.num_observations(), dataset.num_rows(), dataset.num_columns(), num_skipped,
    );

    Ok((dataset, data_dict))
}

fn parse_rating(record: &StringRecord) -> Option<(&str, &str, f64)> {

    if record.len() < 3 || record[0].is_empty() || record[1].is_empty() {
        return None;
    }

    let rating = parse_finite(&record[2])?;

    Some((&record[0], &record[1], rating / RATING_SCALE))
}

/// Reads a file of user-game interactions with the columns
/// `app_id,steam_id,playtime_norm,rating`. The values are expected to be normalized already.
pub fn read_interactions(path: &str) -> Result<(Dataset<Interaction>, DataDictionary)> {
    let file = File::open(path)?;
    read_interactions_from(file, path)
}

/// Same as `read_interactions`, `source` only names the input in error messages.
pub fn read_interactions_from<R: Read>(
    input: R,
    source: &str,
) -> Result<(Dataset<Interaction>, DataDictionary)> {

    let mut reader = csv_reader(input);

    let header = reader.headers()?.clone();
    if header.len() < NUM_INTERACTION_COLUMNS {
        return Err(Error::MalformedHeader {
            path: source.to_owned(),
            expected: NUM_INTERACTION_COLUMNS,
            found: header.len(),
        });
    }

    debug!("Columns detected: {:?}", header);

    let mut data_dict = DataDictionary::default();
    let mut observations = Vec::new();
    let mut num_skipped = 0;

    for record in reader.records() {
        let record = record?;

        match parse_interaction(&record) {
            Some((user, game, interaction)) => {
                let (user_index, game_index) = data_dict.observe(user, game);
                observations.push((user_index, game_index, interaction));
            },
            None => {
                debug!("Skipping malformed interaction record {:?}", record);
                num_skipped += 1;
            },
        }
    }

    let dataset = Dataset::from_observations(observations);

    info!(
        "Read {} interactions between {} users and {} games ({} records skipped)",
        dataset.num_observations(), dataset.num_rows(), dataset.num_columns(), num_skipped,
    );

    Ok((dataset, data_dict))
}

/// Returns the steam id, the app id and the interaction of a record.
fn parse_interaction(record: &StringRecord) -> Option<(&str, &str, Interaction)> {

    if record.len() < NUM_INTERACTION_COLUMNS || record[1].is_empty() {
        return None;
    }

    let _: u32 = record[0].parse().ok()?;
    let playtime_norm = parse_finite(&record[2])?;
    let rating = parse_finite(&record[3])?;

    Some((&record[1], &record[0], Interaction::new(playtime_norm, rating)))
}

/// `NaN` and infinite weights are rejected, they would end up as scores without an order.
fn parse_finite(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Writes the matrix as tab separated text. The first line and the first column hold the names
/// of the entities.
pub fn write_matrix(
    matrix: &SimilarityMatrix,
    entity_names: &[&str],
    matrix_path: Option<&str>,
) -> Result<()> {
    write_matrix_to(output(matrix_path)?, matrix, entity_names)
}

pub fn write_matrix_to<W: Write>(
    out: W,
    matrix: &SimilarityMatrix,
    entity_names: &[&str],
) -> Result<()> {

    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out);

    let mut header: Vec<&str> = Vec::with_capacity(entity_names.len() + 1);
    header.push("entity");
    header.extend(entity_names.iter());
    writer.write_record(&header)?;

    for (name, row) in entity_names.iter().zip(matrix.rows()) {
        let mut record: Vec<String> = Vec::with_capacity(row.len() + 1);
        record.push(name.to_string());
        record.extend(row.iter().map(|similarity| format!("{:.6}", similarity)));
        writer.write_record(&record)?;
    }

    writer.flush()?;

    Ok(())
}

/// Struct used for JSON serialization of computed recommendations. Field names will be used in
/// JSON.
#[derive(Serialize)]
struct Recommendations<'a> {
    for_user: &'a str,
    recommended_items: Vec<RecommendedItem<'a>>,
}

#[derive(Serialize)]
struct RecommendedItem<'a> {
    item: &'a str,
    score: f64,
}

/// Output the computed recommendations in JSON format, one line per user, using the original
/// identifiers from the input file.
pub fn write_recommendations(
    recommendations: &[(u32, Vec<ScoredItem>)],
    renaming: &Renaming,
    recommendations_path: Option<&str>,
) -> Result<()> {
    write_recommendations_to(output(recommendations_path)?, recommendations, renaming)
}

pub fn write_recommendations_to<W: Write>(
    mut out: W,
    recommendations: &[(u32, Vec<ScoredItem>)],
    renaming: &Renaming,
) -> Result<()> {

    for (user, scored_items) in recommendations {

        let recommended_items = scored_items.iter()
            .map(|scored_item| RecommendedItem {
                item: renaming.item_name(scored_item.item),
                score: scored_item.score,
            })
            .collect();

        let for_user = Recommendations { for_user: renaming.user_name(*user), recommended_items };

        writeln!(out, "{}", serde_json::to_string(&for_user)?)?;
    }

    out.flush()?;

    Ok(())
}

/// Writes benchmark measurements as CSV with a header line.
pub fn write_benchmark_results(
    records: &[BenchmarkRecord],
    results_path: Option<&str>,
) -> Result<()> {
    write_benchmark_results_to(output(results_path)?, records)
}

pub fn write_benchmark_results_to<W: Write>(out: W, records: &[BenchmarkRecord]) -> Result<()> {

    let mut writer = csv::Writer::from_writer(out);

    for record in records {
        writer.serialize(record)?;
    }

    writer.flush()?;

    Ok(())
}


#[cfg(test)]
mod tests {

    use super::*;
    use crate::types::Features;

    const RATINGS: &str = "userId,movieId,rating,timestamp
1,31,2.5,1260759144
1,1029,3.0,1260759179
2,31,5.0,835355493
2,10
3,1029,great,835355493
";

    const INTERACTIONS: &str = "app_id,steam_id,playtime_norm,rating
10,76561197960265728,0.5,0.8
20,76561197960265728,0.1,0.4
10,76561197960265729,0.9,1.0
xx,76561197960265729,0.9,1.0
30,76561197960265729,0.2
";

    #[test]
    fn ratings_are_normalized_and_malformed_records_skipped() {
        let (dataset, data_dict) = read_ratings_from(RATINGS.as_bytes()).unwrap();

        assert_eq!(dataset.num_observations(), 3);
        assert_eq!(dataset.num_rows(), 2);
        assert_eq!(dataset.num_columns(), 2);

        let user = data_dict.user_index("2").unwrap();
        let item = data_dict.item_index("31").unwrap();
        assert_eq!(dataset.row(user).unwrap()[&item], 1.0);
        assert_eq!(dataset.column(item).unwrap()[&user], 1.0);

        let first_user = data_dict.user_index("1").unwrap();
        assert_eq!(dataset.row(first_user).unwrap()[&item], 0.5);

        assert!(data_dict.user_index("3").is_none());
    }

    #[test]
    fn empty_ratings_file() {
        let (dataset, _) = read_ratings_from("userId,movieId,rating\n".as_bytes()).unwrap();

        assert_eq!(dataset.num_rows(), 0);
    }

    #[test]
    fn non_finite_weights_are_skipped() {
        let ratings = "userId,movieId,rating
1,a,NaN
2,b,inf
3,c,-inf
1,b,4.0
2,a,nan
";
        let (dataset, data_dict) = read_ratings_from(ratings.as_bytes()).unwrap();

        assert_eq!(dataset.num_observations(), 1);
        assert!(data_dict.user_index("2").is_none());
        assert!(data_dict.item_index("c").is_none());
        assert!(dataset.rows().values().flat_map(|row| row.values()).all(|w| w.is_finite()));

        let interactions = "app_id,steam_id,playtime_norm,rating
10,76561197960265728,NaN,0.8
20,76561197960265728,0.1,inf
30,76561197960265729,0.3,0.6
";
        let (dataset, _) = read_interactions_from(interactions.as_bytes(), "test").unwrap();

        assert_eq!(dataset.num_observations(), 1);
        assert_eq!(dataset.num_rows(), 1);
    }

    #[test]
    fn interactions_are_read_per_steam_user() {
        let (dataset, data_dict) = read_interactions_from(INTERACTIONS.as_bytes(), "test").unwrap();

        assert_eq!(dataset.num_rows(), 2);
        assert_eq!(dataset.num_columns(), 2);
        assert_eq!(dataset.num_observations(), 3);

        let user = data_dict.user_index("76561197960265728").unwrap();
        let game = data_dict.item_index("20").unwrap();
        let interaction = dataset.row(user).unwrap()[&game];

        assert_eq!(interaction.playtime_norm(), 0.1);
        assert_eq!(interaction.preference(), 0.4);
        assert!(data_dict.item_index("30").is_none());
    }

    #[test]
    fn interactions_need_four_columns() {
        let result = read_interactions_from("app_id,steam_id,rating\n".as_bytes(), "games.csv");

        match result {
            Err(Error::MalformedHeader { path, expected, found }) => {
                assert_eq!(path, "games.csv");
                assert_eq!(expected, 4);
                assert_eq!(found, 3);
            },
            _ => panic!("expected a malformed header"),
        }
    }

    #[test]
    fn matrix_output() {
        let mut matrix = SimilarityMatrix::new(2);
        matrix.set_symmetric(0, 1, 0.25);

        let mut out = Vec::new();
        write_matrix_to(&mut out, &matrix, &["alice", "bob"]).unwrap();

        let written = String::from_utf8(out).unwrap();
        assert_eq!(
            written,
            "entity\talice\tbob\nalice\t1.000000\t0.250000\nbob\t0.250000\t1.000000\n",
        );
    }

    #[test]
    fn recommendations_output() {
        let interactions = vec![
            (String::from("alice"), String::from("apple")),
            (String::from("alice"), String::from("dog")),
        ];
        let data_dict = DataDictionary::from_interactions(interactions.iter());
        let alice = data_dict.user_index("alice").unwrap();
        let dog = data_dict.item_index("dog").unwrap();
        let renaming = Renaming::from(data_dict);

        let recommendations = vec![(alice, vec![ScoredItem { item: dog, score: 0.5 }])];

        let mut out = Vec::new();
        write_recommendations_to(&mut out, &recommendations, &renaming).unwrap();

        let written = String::from_utf8(out).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(written.trim()).unwrap();

        assert_eq!(parsed["for_user"], "alice");
        assert_eq!(parsed["recommended_items"][0]["item"], "dog");
        assert_eq!(parsed["recommended_items"][0]["score"], 0.5);
    }

    #[test]
    fn benchmark_output() {
        let records = vec![BenchmarkRecord {
            algorithm: String::from("cosine"),
            dataset_size: 10,
            mode: String::from("parallel"),
            num_workers: 4,
            time_ms: 2.0,
            speedup: 3.0,
            efficiency: 0.75,
            comparisons: 45,
        }];

        let mut out = Vec::new();
        write_benchmark_results_to(&mut out, &records).unwrap();

        let written = String::from_utf8(out).unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next(),
            Some("algorithm,dataset_size,mode,num_workers,time_ms,speedup,efficiency,comparisons"),
        );

        let fields: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(fields.len(), 8);
        assert_eq!(&fields[..4], &["cosine", "10", "parallel", "4"]);
        assert_eq!(fields[6].parse::<f64>().unwrap(), 0.75);
        assert_eq!(fields[7], "45");
        assert!(lines.next().is_none());
    }
}
