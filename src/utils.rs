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

use std::time::{Duration, Instant};

pub fn to_millis(duration: Duration) -> f64 {
    (duration.as_secs() as f64 * 1_000.0) + (duration.subsec_nanos() as f64 / 1_000_000.0)
}

/// Runs `function` once and returns its result together with the elapsed wall time in
/// milliseconds.
pub fn measure<F, R>(function: F) -> (R, f64) where F: FnOnce() -> R {
    let start = Instant::now();
    let result = function();
    (result, to_millis(start.elapsed()))
}

/// Ratio of sequential to parallel running time, zero if the parallel run took no measurable time.
pub fn speedup(sequential_millis: f64, parallel_millis: f64) -> f64 {
    if parallel_millis == 0.0 {
        0.0
    } else {
        sequential_millis / parallel_millis
    }
}

/// Speedup per worker.
pub fn efficiency(speedup: f64, num_workers: usize) -> f64 {
    if num_workers == 0 {
        0.0
    } else {
        speedup / num_workers as f64
    }
}
