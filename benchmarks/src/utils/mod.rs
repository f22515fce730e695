//! Utility helpers for the workloads

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::adapters::SqlValue;

/// Timer utility for measuring execution time
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_nanos() as f64 / 1_000_000.0
    }
}

/// Round a millisecond duration to two decimal digits
pub fn round_ms(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}

/// Upper bound of the random integers the workloads insert
pub const MAX_RANDOM: i64 = 100_000;

/// Deterministic source of workload data
pub struct DataGenerator {
    rng: StdRng,
}

impl DataGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform integer in `0..=MAX_RANDOM`
    pub fn random_int(&mut self) -> i64 {
        self.rng.gen_range(0..=MAX_RANDOM)
    }

    /// `(a, b, c)` parameters for the t1/t2/t3 tables: `a` as given, `b`
    /// random, `c` the spelled-out `b`
    pub fn row(&mut self, a: i64) -> Vec<SqlValue> {
        let n = self.random_int();
        vec![
            SqlValue::Integer(a),
            SqlValue::Integer(n),
            SqlValue::Text(number_name(n as u64)),
        ]
    }

    pub fn rows(&mut self, count: usize) -> Vec<Vec<SqlValue>> {
        (1..=count as i64).map(|a| self.row(a)).collect()
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

const ONES: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "ten", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

/// English spelling of `n`, e.g. `152` is "one hundred fifty two"
pub fn number_name(n: u64) -> String {
    let mut words = Vec::new();
    push_words(n, &mut words);
    words.join(" ")
}

fn push_words(mut n: u64, words: &mut Vec<&'static str>) {
    for (scale, word) in [(1_000_000_000, "billion"), (1_000_000, "million"), (1_000, "thousand")] {
        if n >= scale {
            push_words(n / scale, words);
            words.push(word);
            n %= scale;
        }
    }
    if n >= 100 {
        words.push(ONES[(n / 100) as usize]);
        words.push("hundred");
        n %= 100;
    }
    if n >= 20 {
        words.push(TENS[(n / 10) as usize]);
        n %= 10;
    }
    if n > 0 || words.is_empty() {
        words.push(ONES[n as usize]);
    }
}
