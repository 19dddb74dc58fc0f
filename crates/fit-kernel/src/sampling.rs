//! Random minimal-subset selection.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded RNG when `seed` is given, entropy-seeded otherwise.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Fill `out` with distinct draws from `pool`.
///
/// Rejection sampling over positions; `out` is at most four long here, so
/// collisions are rare and cheap. Returns `false` if the pool is too small.
pub fn sample_distinct(rng: &mut impl Rng, pool: &[usize], out: &mut [usize]) -> bool {
    let k = out.len();
    if pool.len() < k {
        return false;
    }
    let mut picked = [usize::MAX; 8];
    debug_assert!(k <= picked.len());
    let mut filled = 0;
    while filled < k {
        let pos = rng.gen_range(0..pool.len());
        if picked[..filled].contains(&pos) {
            continue;
        }
        picked[filled] = pos;
        out[filled] = pool[pos];
        filled += 1;
    }
    true
}

/// Up to `limit` indices spread evenly over `0..n`.
pub fn strided_indices(n: usize, limit: usize) -> Vec<usize> {
    if n <= limit {
        return (0..n).collect();
    }
    (0..limit).map(|i| i * n / limit).collect()
}
