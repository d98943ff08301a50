//! Ciphertext-only cryptanalysis of the three-rotor naval Enigma (M3).
//!
//! [`enigma`] holds the machine itself; [`analysis`] holds the fitness
//! functions and the three-phase key search (wheel order and positions by
//! Index of Coincidence, then ring settings, then a greedy plugboard climb
//! under a bigram model).

pub mod analysis;
pub mod enigma;
