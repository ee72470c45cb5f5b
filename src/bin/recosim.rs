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

use std::env;
use std::process;
use std::str::FromStr;

use getopts::{Matches, Options};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use recosim::benchmark::{self, BenchmarkRecord};
use recosim::io;
use recosim::stats::{DataDictionary, Renaming};
use recosim::{Config, Dataset, Features, Metric, Result, Strategy};

#[derive(Clone, Copy, Debug, PartialEq)]
enum Task {
    Matrix,
    Recommend(Strategy),
    Benchmark,
}

struct Job {
    task: Task,
    config: Config,
    users: Vec<String>,
    max_entities: Option<usize>,
    output_path: Option<String>,
}

fn main() {

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "inputfile", "Input file name (required). The input is a CSV file with a \
        header line.", "PATH");
    opts.optopt("f", "format", "Input format, either 'ratings' (userId,movieId,rating) or \
        'interactions' (app_id,steam_id,playtime_norm,rating). Defaults to 'ratings'.", "FORMAT");
    opts.optopt("t", "task", "What to compute: 'matrix', 'item', 'user' or 'benchmark' \
        (optional, defaults to 'item').", "TASK");
    opts.optopt("m", "metric", "Similarity measure: 'cosine', 'pearson', 'jaccard' or \
        'jaccard-weighted' (optional, defaults to 'cosine').", "METRIC");
    opts.optmulti("u", "user", "User to compute recommendations for, may be repeated \
        (required for the 'item' and 'user' tasks).", "USER");
    opts.optopt("k", "top-k", "Number of recommendations per user (optional, defaults to 10).",
        "NUMBER");
    opts.optopt("n", "neighbors", "Number of neighbors per prediction, 0 uses all of them \
        (optional, defaults to 30).", "NUMBER");
    opts.optopt("w", "workers", "Number of worker threads (optional, defaults to the number of \
        cpus).", "NUMBER");
    opts.optopt("s", "min-similarity", "Minimum similarity of neighbors in user-based \
        recommendation (optional).", "NUMBER");
    opts.optopt("l", "max-entities", "Only compare the first NUMBER users in the 'matrix' and \
        'benchmark' tasks (optional).", "NUMBER");
    opts.optopt("o", "outputfile", "Output file name (optional, output will be written to stdout \
        by default).", "PATH");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    if matches.opt_present("h") {
        print_usage(&program, &opts, None);
        return;
    }

    let input_path = match matches.opt_str("i") {
        Some(input_path) => input_path,
        None => return print_usage_and_exit(
            &program,
            opts,
            Some("Please specify an inputfile via --inputfile."),
        ),
    };

    let job = match job_from(&matches) {
        Ok(job) => job,
        Err(hint) => return print_usage_and_exit(&program, opts, Some(&hint)),
    };

    let format = matches.opt_str("f").unwrap_or_else(|| String::from("ratings"));

    let outcome = match format.as_str() {
        "ratings" => io::read_ratings(&input_path)
            .and_then(|(dataset, data_dict)| run(&dataset, data_dict, &job)),
        "interactions" => io::read_interactions(&input_path)
            .and_then(|(dataset, data_dict)| run(&dataset, data_dict, &job)),
        other => {
            let hint = format!("Unknown input format '{}'.", other);
            return print_usage_and_exit(&program, opts, Some(&hint));
        },
    };

    if let Err(error) = outcome {
        eprintln!("{}", error);
        process::exit(1);
    }
}

fn print_usage(program: &str, opts: &Options, hint: Option<&str>) {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));
}

fn print_usage_and_exit(program: &str, opts: Options, hint: Option<&str>) {
    print_usage(program, &opts, hint);
    process::exit(1);
}

fn numeric_option<T>(matches: &Matches, name: &str, default: T) -> std::result::Result<T, String>
    where T: FromStr, T::Err: ToString {

    matches.opt_get_default(name, default)
        .map_err(|failure| format!("Problem with option '{}': {}", name, failure.to_string()))
}

fn job_from(matches: &Matches) -> std::result::Result<Job, String> {

    let defaults = Config::default();

    let task = match matches.opt_str("t").as_ref().map(String::as_str).unwrap_or("item") {
        "matrix" => Task::Matrix,
        "benchmark" => Task::Benchmark,
        name => match Strategy::from_name(name) {
            Some(strategy) => Task::Recommend(strategy),
            None => return Err(format!("Unknown task '{}'.", name)),
        },
    };

    let metric = matches.opt_str("m")
        .map(|name| Metric::from_name(&name))
        .unwrap_or(defaults.metric);

    let min_neighbor_similarity = match matches.opt_str("s") {
        Some(value) => Some(value.parse::<f64>()
            .map_err(|failure| format!("Problem with option 's': {}", failure))?),
        None => None,
    };

    let max_entities = match matches.opt_str("l") {
        Some(value) => Some(value.parse::<usize>()
            .map_err(|failure| format!("Problem with option 'l': {}", failure))?),
        None => None,
    };

    let config = Config {
        metric,
        top_k: numeric_option(matches, "k", defaults.top_k)?,
        neighbor_k: numeric_option(matches, "n", defaults.neighbor_k)?,
        num_workers: numeric_option(matches, "w", defaults.num_workers)?,
        min_neighbor_similarity,
    };

    config.validate().map_err(|error| error.to_string())?;

    let users = matches.opt_strs("u");

    if let Task::Recommend(_) = task {
        if users.is_empty() {
            return Err(String::from("Please specify at least one user via --user."));
        }
    }

    Ok(Job { task, config, users, max_entities, output_path: matches.opt_str("o") })
}

fn run<W: Features>(dataset: &Dataset<W>, data_dict: DataDictionary, job: &Job) -> Result<()> {

    let users = resolve_users(&data_dict, &job.users);

    // Build reverse index, make sure we consume the data dictionary
    let renaming: Renaming = data_dict.into();

    let output_path = job.output_path.as_ref().map(String::as_str);

    match job.task {

        Task::Matrix => {
            let mut entities = dataset.row_records();
            if let Some(max_entities) = job.max_entities {
                entities.truncate(max_entities);
            }

            let matrix = recosim::similarity_matrix_between(&entities, &job.config);

            let names: Vec<&str> = entities.iter()
                .map(|entity| renaming.user_name(entity.id))
                .collect();

            io::write_matrix(&matrix, &names, output_path)
        },

        Task::Recommend(strategy) => {
            let recommendations: Vec<_> = users.into_iter()
                .map(|user| (user, recosim::recommend(dataset, user, strategy, &job.config)))
                .collect();

            io::write_recommendations(&recommendations, &renaming, output_path)
        },

        Task::Benchmark => {
            let mut entities = dataset.row_records();
            if let Some(max_entities) = job.max_entities {
                entities.truncate(max_entities);
            }

            let worker_counts = benchmark::worker_counts(num_cpus::get());
            let mut records: Vec<BenchmarkRecord> = Vec::new();

            for metric in Metric::ALL.iter() {
                records.extend(benchmark::benchmark_matrix(&entities, *metric, &worker_counts));
            }

            for &user in users.iter() {
                for metric in Metric::ALL.iter() {
                    records.extend(benchmark::benchmark_item_based(
                        dataset, user, *metric, &job.config, &worker_counts));
                }
            }

            io::write_benchmark_results(&records, output_path)
        },
    }
}

fn resolve_users(data_dict: &DataDictionary, names: &[String]) -> Vec<u32> {
    names.iter()
        .filter_map(|name| {
            let user = data_dict.user_index(name);
            if user.is_none() {
                warn!("Unknown user '{}', skipping", name);
            }
            user
        })
        .collect()
}
