//! Ciphertext-only key recovery: the three-phase hill-climb over wheel
//! order and positions, ring settings, and plugboard pairs.

pub mod fitness;

use std::{cmp::Ordering, ops::Deref, path::Path};

use anyhow::Result;
use itertools::iproduct;
use log::{debug, info};
use rayon::prelude::*;

use crate::enigma::{letters, Enigma, Key, ReflectorId, Rotor, WheelId};
use fitness::{FitnessFunction, IoCFitness, NgramFitness};

/// Phase-1 survivors: the best candidate from each of the 60 wheel orders.
pub const ROTOR_SURVIVORS: usize = 60;

/// How many ring-optimised keys are worth a plugboard search.
pub const PLUG_CANDIDATES: usize = 10;

/// Cap on committed plugboard pairs. Historical operators ran ten cables,
/// and the greedy climb stalls on its own well before thirteen.
pub const MAX_PLUGS: usize = 10;

/// Which wheels phase 1 draws from.
pub enum WheelSet {
    /// Wheels I-III only: 6 ordered triples. Cheap, useful for tests.
    Three,
    /// The full M3 box, wheels I-V: 60 ordered triples.
    Five,
}

impl WheelSet {
    fn wheels(&self) -> &'static [WheelId] {
        match self {
            WheelSet::Three => &[WheelId::I, WheelId::II, WheelId::III],
            WheelSet::Five => &WheelId::ALL,
        }
    }
}

/// A key with the fitness its decryption earned. Orderable by score alone;
/// dereferences to the key itself.
#[derive(Debug, Clone)]
pub struct ScoredKey {
    key: Key,
    score: f32,
}

impl ScoredKey {
    pub fn new(key: Key, score: f32) -> Self {
        Self { key, score }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn into_key(self) -> Key {
        self.key
    }
}

impl Deref for ScoredKey {
    type Target = Key;

    fn deref(&self) -> &Self::Target {
        &self.key
    }
}

impl PartialEq for ScoredKey {
    fn eq(&self, other: &Self) -> bool {
        self.score.eq(&other.score)
    }
}

impl PartialOrd for ScoredKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.score.partial_cmp(&other.score)
    }
}

// Best first: score descending, then the canonical key order so that equal
// scores rank the same way on every run regardless of worker timing.
fn rank(a: &ScoredKey, b: &ScoredKey) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.key.cmp(&b.key))
}

/// Reset the machine to its configured positions, decipher into `buf`, and
/// score the result. Every trial in every phase goes through here so no
/// trial ever sees rotor state left over from the previous one.
fn rescore(
    machine: &mut Enigma,
    cipher: &str,
    buf: &mut String,
    f: &impl FitnessFunction,
) -> f32 {
    machine.reset_positions();
    buf.clear();
    buf.extend(cipher.chars().map(|c| machine.encrypt(c)));
    f.score(buf)
}

/// Phase 1: enumerate every ordered triple of distinct wheels and all 26³
/// starting positions, rings zero, scoring by `f`. The best candidate per
/// wheel order survives; the survivors come back ranked best-first and cut
/// to `required_keys`.
///
/// `pairs` rides along unchanged, so a partially-known plugboard can be
/// kept in play while the wheels are rescanned.
pub fn find_rotor_configurations(
    cipher: &str,
    wheels: WheelSet,
    pairs: &[(char, char)],
    required_keys: usize,
    f: &(impl FitnessFunction + Sync),
) -> Vec<ScoredKey> {
    let available = wheels.wheels();

    // Collected up front so the parallel iterator hands out whole wheel
    // orders without synchronising on anything smaller.
    let orders: Vec<_> = iproduct!(available, available, available)
        .map(|(a, b, c)| (*a, *b, *c))
        .filter(|(a, b, c)| a != b && a != c && b != c)
        .collect();

    let mut survivors: Vec<ScoredKey> = orders
        .into_par_iter()
        .filter_map(|(a, b, c)| {
            debug!("scanning wheel order {a} {b} {c}");

            let mut machine = Enigma::new([a, b, c], [0, 0, 0], [0, 0, 0], ReflectorId::B, pairs);
            let mut buf = String::with_capacity(cipher.len());

            let mut best: Option<ScoredKey> = None;
            for (i, j, k) in iproduct!(0..26u8, 0..26u8, 0..26u8) {
                machine.set_positions(i, j, k);
                let score = rescore(&mut machine, cipher, &mut buf, f);

                if best.as_ref().map_or(true, |b| score > b.score) {
                    best = Some(ScoredKey::new(machine.key(), score));
                }
            }

            best
        })
        .collect();

    survivors.sort_unstable_by(rank);
    survivors.truncate(required_keys);
    survivors
}

/// Phase 2: optimise the ring settings of the rightmost rotor, then the
/// middle one. The leftmost rotor's ring is left alone: it steps once in a
/// blue moon, so its ring and position only matter through their
/// difference, which phase 1 already fixed.
pub fn find_ring_settings(cipher: &str, key: &Key, f: &impl FitnessFunction) -> ScoredKey {
    let mut machine = Enigma::from_key(key);

    for select in [Enigma::right_rotor_mut, Enigma::middle_rotor_mut] {
        let best_ring = find_ring_setting(cipher, &mut machine, select, f);

        let rotor = select(&mut machine);
        let start = rotor.initial_position();
        rotor.set_ring(best_ring);
        rotor.set_position((start + best_ring) % 26);
    }

    let mut buf = String::with_capacity(cipher.len());
    let score = rescore(&mut machine, cipher, &mut buf, f);
    ScoredKey::new(machine.key(), score)
}

// Walking ring and position up together keeps the rotor's wiring offset
// fixed while sliding its turnover timing through all 26 possibilities.
fn find_ring_setting(
    cipher: &str,
    machine: &mut Enigma,
    select: fn(&mut Enigma) -> &mut Rotor,
    f: &impl FitnessFunction,
) -> u8 {
    let start_ring = select(machine).ring();
    let start_pos = select(machine).initial_position();

    let mut best_ring = 0;
    let mut max_fitness = f32::NEG_INFINITY;
    let mut buf = String::with_capacity(cipher.len());

    for ring in 0..26 {
        let rotor = select(machine);
        rotor.set_ring(ring);
        rotor.set_position((start_pos + ring) % 26);

        let fitness = rescore(machine, cipher, &mut buf, f);
        if fitness > max_fitness {
            max_fitness = fitness;
            best_ring = ring;
        }
    }

    // Leave the machine as we found it; the caller applies the winner.
    let rotor = select(machine);
    rotor.set_ring(start_ring);
    rotor.set_position(start_pos);

    best_ring
}

/// Phase 3: greedy plugboard growth. Each round scans every pair of
/// currently free letters, rebuilding the board from the committed list
/// plus the candidate, and commits the round's best pair only if it
/// strictly beats the incumbent score. Stops at the first round that
/// fails to improve, or after `max_plugs` commits.
pub fn find_plugs(
    cipher: &str,
    key: &Key,
    max_plugs: usize,
    f: &impl FitnessFunction,
) -> ScoredKey {
    let mut machine = Enigma::from_key(key);
    let mut pairs = key.pairs().to_vec();
    let mut buf = String::with_capacity(cipher.len());

    let mut incumbent = rescore(&mut machine, cipher, &mut buf, f);

    for _ in 0..max_plugs {
        let (fitness, plug) = find_plug(cipher, &mut machine, &pairs, f);
        if fitness <= incumbent {
            break;
        }

        debug!(
            "committing plug {}{}: {incumbent} -> {fitness}",
            plug.0, plug.1
        );
        incumbent = fitness;
        pairs.push(plug);
    }

    machine.set_plugboard(&pairs);
    let score = rescore(&mut machine, cipher, &mut buf, f);
    ScoredKey::new(machine.key(), score)
}

fn find_plug(
    cipher: &str,
    machine: &mut Enigma,
    pairs: &[(char, char)],
    f: &impl FitnessFunction,
) -> (f32, (char, char)) {
    machine.set_plugboard(pairs);
    let free = machine.plugboard().unplugged();

    let mut trial = pairs.to_vec();
    let mut buf = String::with_capacity(cipher.len());

    let mut best_plug = ('A', 'A');
    let mut max_fitness = f32::NEG_INFINITY;

    for a in 0..26u8 {
        if !free[a as usize] {
            continue;
        }
        for b in a + 1..26 {
            if !free[b as usize] {
                continue;
            }

            let plug = ((a + b'A') as char, (b + b'A') as char);
            trial.push(plug);
            machine.set_plugboard(&trial);
            trial.pop();

            let fitness = rescore(machine, cipher, &mut buf, f);
            if fitness > max_fitness {
                max_fitness = fitness;
                best_plug = plug;
            }
        }
    }

    (max_fitness, best_plug)
}

/// The search driver. Owns the cleaned ciphertext and the fitness tables;
/// [`Decryptor::decrypt`] runs the three phases and returns the best key
/// it saw. There is no failure mode — the score says how convincing the
/// answer is.
pub struct Decryptor {
    cipher: String,
    ioc: IoCFitness,
    bigrams: NgramFitness<2>,
}

impl Decryptor {
    /// Build a decryptor, loading the bigram table from `data/`.
    pub fn new(ciphertext: &str) -> Result<Self> {
        Self::with_data_dir(ciphertext, "data")
    }

    /// Build a decryptor with the frequency tables under `dir`.
    pub fn with_data_dir(ciphertext: &str, dir: impl AsRef<Path>) -> Result<Self> {
        let bigrams = NgramFitness::from_file(dir.as_ref().join("bigrams.txt"))?;
        Ok(Self::with_tables(ciphertext, bigrams))
    }

    /// Build a decryptor around an already-loaded bigram table.
    pub fn with_tables(ciphertext: &str, bigrams: NgramFitness<2>) -> Self {
        Self {
            cipher: letters(ciphertext),
            ioc: IoCFitness::new(),
            bigrams,
        }
    }

    /// The ciphertext as the search sees it: upper-case letters only.
    pub fn ciphertext(&self) -> &str {
        &self.cipher
    }

    /// Run the full three-phase search and return the best-scoring key.
    pub fn decrypt(&self) -> ScoredKey {
        info!(
            "phase 1: scanning wheel orders and positions over {} letters",
            self.cipher.len()
        );
        let survivors = find_rotor_configurations(
            &self.cipher,
            WheelSet::Five,
            &[],
            ROTOR_SURVIVORS,
            &self.ioc,
        );

        info!("phase 2: optimising rings for {} survivors", survivors.len());
        let mut refined: Vec<ScoredKey> = survivors
            .par_iter()
            .map(|candidate| find_ring_settings(&self.cipher, candidate.key(), &self.ioc))
            .collect();
        refined.sort_unstable_by(rank);
        refined.truncate(PLUG_CANDIDATES);

        info!("phase 3: growing plugboards for {} candidates", refined.len());
        let best = refined
            .par_iter()
            .map(|candidate| find_plugs(&self.cipher, candidate.key(), MAX_PLUGS, &self.bigrams))
            .collect::<Vec<_>>()
            .into_iter()
            .min_by(rank)
            .expect("search produced no candidates");

        info!("best key: {} (score {})", best.key(), best.score());
        best
    }
}
