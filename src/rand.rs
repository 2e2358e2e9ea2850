use core::fmt::Debug;
use std::{fmt::Display, str::FromStr};

use ::rand::seq::SliceRandom;
use ::rand::{Rng as _, SeedableRng};
use rand_pcg::Pcg64;

/// A 32-byte seed for the randomized layouts, written as hex on the command line.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Seed(pub [u8; 32]);

impl Seed {
    /// Draws a fresh seed from the thread-local entropy source.
    pub fn random() -> Self {
        Seed(::rand::random())
    }
}

impl FromStr for Seed {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes: Vec<u8> = hex::decode(s)?;
        let bytes = <[u8; 32]>::try_from(bytes)
            .map_err(|b| anyhow::anyhow!("seed must be 32 bytes, got {}", b.len()))?;
        Ok(Seed(bytes))
    }
}

impl Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Display for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as Debug>::fmt(self, f)
    }
}

/// Seeded PCG generator behind every random decision in a layout pass.
#[derive(Clone)]
pub struct Rng {
    inner: Pcg64,
}

impl Rng {
    pub fn from_seed(seed: &Seed) -> Rng {
        Rng {
            inner: Pcg64::from_seed(seed.0),
        }
    }

    /// Picks a random value uniformly distributed between `0.0` (inclusive) and `1.0` (exclusive).
    pub fn rnd(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Picks a random value uniformly distributed between `min` (inclusive) and `max` (exclusive).
    /// An empty range yields `min`.
    pub fn uniform(&mut self, min: f64, max: f64) -> f64 {
        if min >= max {
            return min;
        }
        self.inner.gen_range(min..max)
    }

    /// Picks a value in `[-spread, spread)`.
    pub fn jitter(&mut self, spread: f64) -> f64 {
        self.uniform(-spread, spread)
    }

    /// Constructs a new vector with a uniformly random permutation of the elements in `xs`.
    pub fn shuffle<T, I: IntoIterator<Item = T>>(&mut self, xs: I) -> Vec<T> {
        let mut result: Vec<T> = xs.into_iter().collect();
        result.shuffle(&mut self.inner);
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    const SEED: Seed = Seed(hex!(
        "efa7bdd92b5e9cd9de9b54ac0e3dc60623f1c989a80ed9c5157fffff10c2a148"
    ));

    #[test]
    fn test_seed_round_trips_through_hex() {
        let text = SEED.to_string();
        assert_eq!(
            text,
            "0xefa7bdd92b5e9cd9de9b54ac0e3dc60623f1c989a80ed9c5157fffff10c2a148"
        );
        assert_eq!(text.parse::<Seed>().unwrap(), SEED);
        assert_eq!(text[2..].parse::<Seed>().unwrap(), SEED);
    }

    #[test]
    fn test_seed_rejects_wrong_length() {
        assert!("0x1234".parse::<Seed>().is_err());
        assert!("not hex".parse::<Seed>().is_err());
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = Rng::from_seed(&SEED);
        let mut b = Rng::from_seed(&SEED);
        let xs: [f64; 16] = std::array::from_fn(|_| a.rnd());
        let ys: [f64; 16] = std::array::from_fn(|_| b.rnd());
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_rnd_is_a_unit_fraction() {
        let mut rng = Rng::from_seed(&SEED);
        let xs: Vec<f64> = (0..1000).map(|_| rng.rnd()).collect();
        assert!(xs.iter().all(|x| (0.0..1.0).contains(x)));
        assert!(xs.iter().any(|&x| x < 0.5) && xs.iter().any(|&x| x >= 0.5));
    }

    #[test]
    fn test_empty_range_yields_min() {
        let mut rng = Rng::from_seed(&SEED);
        assert_eq!(rng.jitter(0.0), 0.0);
        assert_eq!(rng.uniform(3.0, 3.0), 3.0);
        assert_eq!(rng.uniform(5.0, 2.0), 5.0);
    }

    #[test]
    fn test_uniform_stays_in_range() {
        let mut rng = Rng::from_seed(&SEED);
        for i in 0..1000 {
            let lo = i as f64;
            let v = rng.uniform(lo, lo * 2.0 + 3.0);
            assert!(v >= lo && v < lo * 2.0 + 3.0, "{v} out of range");
        }
        for _ in 0..1000 {
            let v = rng.jitter(0.25);
            assert!((-0.25..0.25).contains(&v));
        }
    }

    #[test]
    fn test_shuffle_empty() {
        let mut rng = Rng::from_seed(&SEED);
        assert_eq!(rng.shuffle(Vec::<()>::new()), Vec::<()>::new());
    }

    #[test]
    fn test_shuffle_singleton() {
        let mut rng = Rng::from_seed(&SEED);
        assert_eq!(rng.shuffle(vec![777]), vec![777]);
        assert_eq!(rng.shuffle(vec![777]), vec![777]);
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut rng = Rng::from_seed(&SEED);
        let colors = vec!['r', 'o', 'y', 'g', 'b', 'i', 'v'];
        let mut shuffled = rng.shuffle(colors.clone());
        shuffled.sort_unstable();
        let mut sorted = colors;
        sorted.sort_unstable();
        assert_eq!(shuffled, sorted);
    }
}
