//! Fitness functions: pure mappings from a candidate plaintext (upper-case
//! A-Z only) to a score, higher meaning more English-like.

use std::{fs, path::Path};

use anyhow::{ensure, Context, Result};

/// Log-probability charged for every n-gram missing from the table. Bounded
/// on purpose: one unseen gram must dent the score, not dominate it.
pub const MISS_PENALTY: f32 = -12.0;

pub trait FitnessFunction {
    fn score(&self, text: &str) -> f32;
}

/// English n-gram log-probabilities, `N` in 1..=4. The table is flat,
/// indexed by five bits per letter, and pre-filled with [`MISS_PENALTY`] so
/// lookups never branch on presence.
pub struct NgramFitness<const N: usize> {
    table: Vec<f32>,
}

impl<const N: usize> NgramFitness<N> {
    /// Load a table from a `GRAM,SCORE`-per-line file. A missing or
    /// unreadable file, or any malformed line, is fatal.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading n-gram table {}", path.display()))?;
        Self::from_lines(text.lines())
            .with_context(|| format!("parsing n-gram table {}", path.display()))
    }

    /// Build a table from pre-split lines. Duplicate grams: last one wins.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        ensure!((1..=4usize).contains(&N), "unsupported n-gram size: {N}");

        let size = Self::index(&[b'Z'; N]) + 1;
        let mut table = vec![MISS_PENALTY; size];

        for (number, line) in lines.into_iter().enumerate() {
            let (gram, score) = line
                .split_once(',')
                .with_context(|| format!("line {}: expected GRAM,SCORE", number + 1))?;
            ensure!(
                gram.len() == N && gram.bytes().all(|b| b.is_ascii_uppercase()),
                "line {}: bad {N}-gram {gram:?}",
                number + 1
            );
            let score: f32 = score
                .trim()
                .parse()
                .with_context(|| format!("line {}: bad score {score:?}", number + 1))?;

            table[Self::index(gram.as_bytes())] = score;
        }

        Ok(Self { table })
    }

    #[inline]
    fn index(gram: &[u8]) -> usize {
        gram.iter()
            .fold(0, |acc, &c| (acc << 5) | (c - b'A') as usize)
    }
}

impl<const N: usize> FitnessFunction for NgramFitness<N> {
    fn score(&self, text: &str) -> f32 {
        debug_assert!(text.bytes().all(|b| b.is_ascii_uppercase()));

        // Summed in text order so parallel callers agree on the total.
        text.as_bytes()
            .windows(N)
            .map(|gram| self.table[Self::index(gram)])
            .sum()
    }
}

/// Index of Coincidence: the probability that two letters drawn from the
/// text are equal. English sits near 0.067, uniform noise near 0.038.
pub struct IoCFitness;

impl IoCFitness {
    pub fn new() -> Self {
        Self
    }
}

impl Default for IoCFitness {
    fn default() -> Self {
        Self::new()
    }
}

impl FitnessFunction for IoCFitness {
    fn score(&self, text: &str) -> f32 {
        debug_assert!(text.bytes().all(|b| b.is_ascii_uppercase()));

        if text.len() < 2 {
            return 0.0;
        }

        let mut histogram = [0u32; 26];
        for b in text.bytes() {
            histogram[(b - b'A') as usize] += 1;
        }

        let coincidences: u32 = histogram.iter().map(|&f| f * f.saturating_sub(1)).sum();
        let n = text.len() as f32;
        coincidences as f32 / (n * (n - 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ioc_of_uniform_text_is_one() {
        let ioc = IoCFitness::new();
        assert_eq!(ioc.score("AAAA"), 1.0);
    }

    #[test]
    fn ioc_of_known_mix() {
        // AABB: 2*1 + 2*1 coincidences over 4*3 draws.
        let ioc = IoCFitness::new();
        let score = ioc.score("AABB");
        assert!((score - 4.0 / 12.0).abs() < 1e-6);
    }

    #[test]
    fn ioc_degenerate_inputs_are_zero() {
        let ioc = IoCFitness::new();
        assert_eq!(ioc.score(""), 0.0);
        assert_eq!(ioc.score("Q"), 0.0);
    }

    #[test]
    fn ioc_stays_in_unit_interval() {
        let ioc = IoCFitness::new();
        for text in ["ABCDEFGHIJKLMNOPQRSTUVWXYZ", "AAB", "ZZZZZZZA"] {
            let score = ioc.score(text);
            assert!((0.0..=1.0).contains(&score), "{text}: {score}");
        }
    }

    #[test]
    fn ngram_scores_sum_over_windows() {
        let bigrams = NgramFitness::<2>::from_lines(["TH,-1.0", "HE,-2.0"]).unwrap();
        assert!((bigrams.score("THE") - -3.0).abs() < 1e-6);
    }

    #[test]
    fn missing_grams_cost_the_penalty() {
        let bigrams = NgramFitness::<2>::from_lines(["TH,-1.0"]).unwrap();
        assert!((bigrams.score("QZ") - MISS_PENALTY).abs() < 1e-6);
        assert_eq!(bigrams.score("A"), 0.0);
    }

    #[test]
    fn duplicate_grams_last_occurrence_wins() {
        let bigrams = NgramFitness::<2>::from_lines(["TH,-1.0", "TH,-5.0"]).unwrap();
        assert!((bigrams.score("TH") - -5.0).abs() < 1e-6);
    }

    #[test]
    fn malformed_lines_are_fatal() {
        assert!(NgramFitness::<2>::from_lines(["TH -1.0"]).is_err());
        assert!(NgramFitness::<2>::from_lines(["THE,-1.0"]).is_err());
        assert!(NgramFitness::<2>::from_lines(["th,-1.0"]).is_err());
        assert!(NgramFitness::<2>::from_lines(["TH,twelve"]).is_err());
    }

    #[test]
    fn missing_table_file_is_fatal() {
        assert!(NgramFitness::<2>::from_file("data/no-such-table.txt").is_err());
    }

    #[test]
    fn shipped_tables_parse() {
        let bi = NgramFitness::<2>::from_file("data/bigrams.txt").unwrap();
        let tri = NgramFitness::<3>::from_file("data/trigrams.txt").unwrap();
        let quad = NgramFitness::<4>::from_file("data/quadgrams.txt").unwrap();

        assert!(bi.score("TH") > bi.score("QZ"));
        assert!(tri.score("THE") > MISS_PENALTY);
        assert!(quad.score("TION") > MISS_PENALTY);
    }
}
