//! Key patterns for load generation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::Rng;
use rand_distr::{Distribution, Zipf};

use crate::error::{CacheError, Result};

/// How each request picks its key.
#[derive(Debug, Clone)]
pub enum KeyPattern {
    /// Every request reads the same key
    Single(String),
    /// `key-<rank>` with Zipf-distributed ranks, a fraction replaced by
    /// never-repeating scan keys
    Zipf {
        ranks: Zipf<f64>,
        scan_ratio: f64,
        scans: Arc<AtomicU64>,
    },
    /// `hot_ratio` of requests over the first `hot_keys` keys, the rest
    /// spread over the remaining cold keys
    HotCold {
        total_keys: u64,
        hot_keys: u64,
        hot_ratio: f64,
    },
    /// `hot-<n>` keys mixed with never-repeating scan keys
    ScanMix {
        hot_keys: u64,
        scan_ratio: f64,
        scans: Arc<AtomicU64>,
    },
}

impl KeyPattern {
    pub fn single(key: impl Into<String>) -> Self {
        KeyPattern::Single(key.into())
    }

    pub fn zipf(universe: u64, alpha: f64, scan_ratio: f64) -> Result<Self> {
        let ranks = Zipf::new(universe, alpha)
            .map_err(|err| CacheError::Config(format!("invalid zipf distribution: {err}")))?;
        Ok(KeyPattern::Zipf {
            ranks,
            scan_ratio: ratio("scan ratio", scan_ratio)?,
            scans: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn hot_cold(total_keys: u64, hot_keys: u64, hot_ratio: f64) -> Result<Self> {
        if hot_keys == 0 || hot_keys >= total_keys {
            return Err(CacheError::Config(format!(
                "hot keys must be between 1 and total keys - 1, got {hot_keys} of {total_keys}"
            )));
        }
        Ok(KeyPattern::HotCold {
            total_keys,
            hot_keys,
            hot_ratio: ratio("hot ratio", hot_ratio)?,
        })
    }

    pub fn scan_mix(hot_keys: u64, scan_ratio: f64) -> Result<Self> {
        if hot_keys == 0 {
            return Err(CacheError::Config("hot keys must be positive".to_string()));
        }
        Ok(KeyPattern::ScanMix {
            hot_keys,
            scan_ratio: ratio("scan ratio", scan_ratio)?,
            scans: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Draws the key for the next request.
    pub fn next_key<R: Rng>(&self, rng: &mut R) -> String {
        match self {
            KeyPattern::Single(key) => key.clone(),
            KeyPattern::Zipf {
                ranks,
                scan_ratio,
                scans,
            } => {
                if rng.gen::<f64>() < *scan_ratio {
                    scan_key(scans)
                } else {
                    format!("key-{}", ranks.sample(rng) as u64)
                }
            }
            KeyPattern::HotCold {
                total_keys,
                hot_keys,
                hot_ratio,
            } => {
                let n = if rng.gen::<f64>() < *hot_ratio {
                    rng.gen_range(0..*hot_keys)
                } else {
                    hot_keys + rng.gen_range(0..total_keys - hot_keys)
                };
                format!("key-{n}")
            }
            KeyPattern::ScanMix {
                hot_keys,
                scan_ratio,
                scans,
            } => {
                if rng.gen::<f64>() < *scan_ratio {
                    scan_key(scans)
                } else {
                    format!("hot-{}", rng.gen_range(0..*hot_keys))
                }
            }
        }
    }
}

fn scan_key(scans: &AtomicU64) -> String {
    format!("scan-{}", scans.fetch_add(1, Ordering::Relaxed))
}

fn ratio(name: &str, value: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(CacheError::Config(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn suffix(key: &str, prefix: &str) -> u64 {
        key.strip_prefix(prefix).unwrap().parse().unwrap()
    }

    #[test]
    fn test_single_key() {
        let pattern = KeyPattern::single("hot");
        let mut rng = rng();
        assert!((0..10).all(|_| pattern.next_key(&mut rng) == "hot"));
    }

    #[test]
    fn test_zipf_ranks_stay_in_universe() {
        let pattern = KeyPattern::zipf(100, 0.9, 0.0).unwrap();
        let mut rng = rng();
        let mut rank_one = 0;

        for _ in 0..2_000 {
            let rank = suffix(&pattern.next_key(&mut rng), "key-");
            assert!((1..=100).contains(&rank));
            if rank == 1 {
                rank_one += 1;
            }
        }
        // Rank 1 is the most popular key by a wide margin
        assert!(rank_one > 2_000 / 100);
    }

    #[test]
    fn test_scan_keys_never_repeat() {
        let pattern = KeyPattern::zipf(10, 1.0, 1.0).unwrap();
        let mut rng = rng();

        let keys: HashSet<String> = (0..500).map(|_| pattern.next_key(&mut rng)).collect();
        assert_eq!(keys.len(), 500);
        assert!(keys.iter().all(|k| k.starts_with("scan-")));
    }

    #[test]
    fn test_hot_cold_split() {
        let pattern = KeyPattern::hot_cold(1_000, 10, 1.0).unwrap();
        let mut rng = rng();
        assert!((0..500).all(|_| suffix(&pattern.next_key(&mut rng), "key-") < 10));

        let pattern = KeyPattern::hot_cold(1_000, 10, 0.0).unwrap();
        assert!((0..500).all(|_| {
            let n = suffix(&pattern.next_key(&mut rng), "key-");
            (10..1_000).contains(&n)
        }));
    }

    #[test]
    fn test_scan_mix_prefixes() {
        let pattern = KeyPattern::scan_mix(5, 0.5).unwrap();
        let mut rng = rng();

        let keys: Vec<String> = (0..400).map(|_| pattern.next_key(&mut rng)).collect();
        assert!(keys.iter().any(|k| k.starts_with("scan-")));
        assert!(keys
            .iter()
            .filter(|k| k.starts_with("hot-"))
            .all(|k| suffix(k, "hot-") < 5));
    }

    #[test]
    fn test_invalid_patterns_are_config_errors() {
        assert!(matches!(KeyPattern::zipf(0, 0.9, 0.0), Err(CacheError::Config(_))));
        assert!(matches!(KeyPattern::zipf(10, 0.9, 1.5), Err(CacheError::Config(_))));
        assert!(matches!(KeyPattern::hot_cold(10, 10, 0.8), Err(CacheError::Config(_))));
        assert!(matches!(KeyPattern::hot_cold(10, 0, 0.8), Err(CacheError::Config(_))));
        assert!(matches!(KeyPattern::scan_mix(0, 0.1), Err(CacheError::Config(_))));
        assert!(matches!(KeyPattern::scan_mix(5, -0.1), Err(CacheError::Config(_))));
    }
}
