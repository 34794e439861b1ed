//! Random test data
//!
//! Generators for owners, balances and currencies. Every function takes the
//! random source explicitly so tests can seed it.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::Currency;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Random integer in `min..=max`
pub fn random_int<R: Rng + ?Sized>(rng: &mut R, min: i64, max: i64) -> i64 {
    rng.gen_range(min..=max)
}

/// Random ASCII letter string of length `n`
pub fn random_string<R: Rng + ?Sized>(rng: &mut R, n: usize) -> String {
    (0..n)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

pub fn random_owner<R: Rng + ?Sized>(rng: &mut R) -> String {
    random_string(rng, 5)
}

/// Random balance in `0..=1000`
pub fn random_money<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    random_int(rng, 0, 1000)
}

pub fn random_currency<R: Rng + ?Sized>(rng: &mut R) -> Currency {
    *Currency::ALL.choose(rng).unwrap_or(&Currency::Usd)
}
