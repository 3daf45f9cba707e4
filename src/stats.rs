//! Read-only statistical collaborators. Everything here consumes an
//! immutable panmatrix snapshot; nothing feeds back into the data model.

use log::debug;
use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::matrix::Panmatrix;

/// Rarefaction of the pangenome: for each permutation, organisms are
/// accumulated in a shuffled order and the cumulative number of distinct
/// clusters is recorded at each step. Returns a permutations × n_organisms
/// matrix.
///
/// Randomness is fully caller-seeded: permutation `p` draws from a ChaCha
/// stream `(seed, p)`, so results are reproducible for a fixed seed no
/// matter how rayon schedules the permutations.
pub fn rarefact(pm: &Panmatrix, permutations: usize, seed: u64) -> Array2<u32> {
    let n = pm.n_organisms();
    let rows: Vec<Vec<u32>> = (0..permutations)
        .into_par_iter()
        .map(|p| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            rng.set_stream(p as u64);
            let mut order: Vec<usize> = (0..n).collect();
            order.shuffle(&mut rng);

            let mut seen = vec![false; pm.n_clusters()];
            let mut distinct = 0u32;
            let mut cumulative = Vec::with_capacity(n);
            for &row in &order {
                for (c, &count) in pm.counts().row(row).iter().enumerate() {
                    if count > 0 && !seen[c] {
                        seen[c] = true;
                        distinct += 1;
                    }
                }
                cumulative.push(distinct);
            }
            cumulative
        })
        .collect();

    debug!("rarefaction: {} permutations over {} organisms (seed {seed})", permutations, n);
    let flat: Vec<u32> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((permutations, n), flat).expect("permutations × organisms shape")
}

/// Mean cumulative cluster count per organism count, taken column-wise over
/// a rarefaction matrix. The raw input for downstream curve fitting.
pub fn pan_curve(rarefaction: &Array2<u32>) -> Vec<f64> {
    let permutations = rarefaction.nrows();
    if permutations == 0 {
        return Vec::new();
    }
    rarefaction
        .columns()
        .into_iter()
        .map(|col| col.iter().map(|&v| v as f64).sum::<f64>() / permutations as f64)
        .collect()
}

/// Genomic fluidity: the mean over all unordered organism pairs of
/// (clusters unique to either) / (total clusters of both). 0 for identical
/// gene content, approaching 1 for disjoint content. None below 2 organisms.
pub fn fluidity(pm: &Panmatrix) -> Option<f64> {
    let n = pm.n_organisms();
    if n < 2 {
        return None;
    }
    let presence: Vec<Vec<bool>> = (0..n).map(|row| pm.row_fingerprint(row)).collect();
    let sizes: Vec<usize> = presence
        .iter()
        .map(|p| p.iter().filter(|&&x| x).count())
        .collect();

    let mut sum = 0.0;
    let mut pairs = 0usize;
    for i in 0..n {
        for j in (i + 1)..n {
            let shared = presence[i]
                .iter()
                .zip(&presence[j])
                .filter(|(&a, &b)| a && b)
                .count();
            let unique = (sizes[i] - shared) + (sizes[j] - shared);
            let total = sizes[i] + sizes[j];
            if total > 0 {
                sum += unique as f64 / total as f64;
            }
            pairs += 1;
        }
    }
    Some(sum / pairs as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::GeneLedger;
    use crate::registry::{NameRegistry, OrgId};
    use crate::table::Table;

    fn fixture() -> Panmatrix {
        let mut t = Table::new(["gene", "org", "cluster"]);
        for (gene, org, cluster) in [
            ("g1", "A", "OG1"),
            ("g2", "A", "OG2"),
            ("g1", "B", "OG1"),
            ("g2", "B", "OG3"),
            ("g1", "C", "OG4"),
        ] {
            t.push_row([gene, org, cluster]).unwrap();
        }
        let mut orgs = NameRegistry::new("organism");
        let mut clusters = NameRegistry::new("cluster");
        let ledger = GeneLedger::from_table(&t, "__", &mut orgs, &mut clusters).unwrap();
        Panmatrix::build(&ledger, &[OrgId(0), OrgId(1), OrgId(2)], clusters.len())
    }

    #[test]
    fn rarefaction_is_deterministic_per_seed() {
        let pm = fixture();
        let a = rarefact(&pm, 16, 42);
        let b = rarefact(&pm, 16, 42);
        assert_eq!(a, b);
        let c = rarefact(&pm, 16, 43);
        assert_ne!(a, c);
    }

    #[test]
    fn rarefaction_ends_at_the_full_pangenome_size() {
        let pm = fixture();
        let rar = rarefact(&pm, 5, 7);
        assert_eq!(rar.shape(), [5, 3]);
        // Every permutation accumulates all four clusters by the last organism.
        for row in rar.rows() {
            assert_eq!(row[2], 4);
            assert!(row[0] <= row[1] && row[1] <= row[2]);
        }
    }

    #[test]
    fn pan_curve_averages_columns() {
        let pm = fixture();
        let rar = rarefact(&pm, 10, 1);
        let curve = pan_curve(&rar);
        assert_eq!(curve.len(), 3);
        assert_eq!(curve[2], 4.0);
        assert!(curve[0] >= 1.0 && curve[0] <= curve[1]);
    }

    #[test]
    fn fluidity_matches_a_hand_computed_pair() {
        // A={OG1,OG2}, B={OG1,OG3}: unique 2, total 4 → 0.5.
        let mut t = Table::new(["gene", "org", "cluster"]);
        for (gene, org, cluster) in [
            ("g1", "A", "OG1"),
            ("g2", "A", "OG2"),
            ("g1", "B", "OG1"),
            ("g2", "B", "OG3"),
        ] {
            t.push_row([gene, org, cluster]).unwrap();
        }
        let mut orgs = NameRegistry::new("organism");
        let mut clusters = NameRegistry::new("cluster");
        let ledger = GeneLedger::from_table(&t, "__", &mut orgs, &mut clusters).unwrap();
        let pm = Panmatrix::build(&ledger, &[OrgId(0), OrgId(1)], clusters.len());
        assert_eq!(fluidity(&pm), Some(0.5));
    }

    #[test]
    fn fluidity_needs_two_organisms() {
        let pm = fixture();
        assert!(fluidity(&pm).is_some());
        let mut t = Table::new(["gene", "org", "cluster"]);
        t.push_row(["g1", "A", "OG1"]).unwrap();
        let mut orgs = NameRegistry::new("organism");
        let mut clusters = NameRegistry::new("cluster");
        let ledger = GeneLedger::from_table(&t, "__", &mut orgs, &mut clusters).unwrap();
        let single = Panmatrix::build(&ledger, &[OrgId(0)], clusters.len());
        assert_eq!(fluidity(&single), None);
    }
}
