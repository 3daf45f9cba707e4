//! The panmatrix: a dense organism × cluster abundance matrix derived from
//! the gene ledger. Rows follow the active organism order, columns the full
//! cluster registry order; cells above 1 indicate in-paralogues.

use std::collections::HashMap;

use ndarray::Array2;

use crate::ledger::GeneLedger;
use crate::registry::{ClusterId, OrgId};

#[derive(Clone, Debug)]
pub struct Panmatrix {
    counts: Array2<u32>,
    org_ids: Vec<OrgId>,
    row_of_org: HashMap<OrgId, usize>,
}

impl Panmatrix {
    /// Builds the matrix in one pass over the ledger: linear in gene count.
    /// Genes owned by organisms outside `active` are skipped.
    pub fn build(ledger: &GeneLedger, active: &[OrgId], n_clusters: usize) -> Self {
        let row_of_org: HashMap<OrgId, usize> =
            active.iter().enumerate().map(|(r, &o)| (o, r)).collect();
        let mut counts = Array2::<u32>::zeros((active.len(), n_clusters));
        for gene in ledger.genes() {
            if let Some(&row) = row_of_org.get(&gene.org) {
                counts[[row, gene.cluster.0]] += 1;
            }
        }
        Self {
            counts,
            org_ids: active.to_vec(),
            row_of_org,
        }
    }

    pub fn counts(&self) -> &Array2<u32> {
        &self.counts
    }

    pub fn n_organisms(&self) -> usize {
        self.counts.nrows()
    }

    pub fn n_clusters(&self) -> usize {
        self.counts.ncols()
    }

    /// Active organism ids in row order.
    pub fn org_ids(&self) -> &[OrgId] {
        &self.org_ids
    }

    pub fn row_of(&self, org: OrgId) -> Option<usize> {
        self.row_of_org.get(&org).copied()
    }

    /// Gene count for an (organism, cluster) cell; 0 for inactive organisms.
    pub fn count(&self, org: OrgId, cluster: ClusterId) -> u32 {
        match self.row_of(org) {
            Some(row) => self.counts[[row, cluster.0]],
            None => 0,
        }
    }

    /// Number of active organisms with at least one gene in `cluster`.
    pub fn presence(&self, cluster: ClusterId) -> usize {
        self.counts
            .column(cluster.0)
            .iter()
            .filter(|&&c| c > 0)
            .count()
    }

    /// Total gene count of `cluster` across active organisms.
    pub fn cluster_total(&self, cluster: ClusterId) -> u32 {
        self.counts.column(cluster.0).sum()
    }

    /// Presence/absence fingerprint of one row across all clusters.
    pub fn row_fingerprint(&self, row: usize) -> Vec<bool> {
        self.counts.row(row).iter().map(|&c| c > 0).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NameRegistry;
    use crate::table::Table;

    fn fixture() -> (GeneLedger, usize) {
        let mut t = Table::new(["gene", "org", "cluster"]);
        // ecoli_A carries an in-paralogue pair in OG1.
        t.push_row(["g1", "ecoli_A", "OG1"]).unwrap();
        t.push_row(["g2", "ecoli_A", "OG1"]).unwrap();
        t.push_row(["g3", "ecoli_A", "OG2"]).unwrap();
        t.push_row(["g1", "ecoli_B", "OG1"]).unwrap();
        t.push_row(["g2", "ecoli_B", "OG3"]).unwrap();
        let mut orgs = NameRegistry::new("organism");
        let mut clusters = NameRegistry::new("cluster");
        let ledger = GeneLedger::from_table(&t, "__", &mut orgs, &mut clusters).unwrap();
        (ledger, clusters.len())
    }

    #[test]
    fn counts_follow_registry_order_and_record_paralogues() {
        let (ledger, n_clusters) = fixture();
        let pm = Panmatrix::build(&ledger, &[OrgId(0), OrgId(1)], n_clusters);
        assert_eq!(pm.counts().shape(), [2, 3]);
        assert_eq!(pm.count(OrgId(0), ClusterId(0)), 2);
        assert_eq!(pm.count(OrgId(0), ClusterId(2)), 0);
        assert_eq!(pm.count(OrgId(1), ClusterId(2)), 1);
        assert_eq!(pm.presence(ClusterId(0)), 2);
        assert_eq!(pm.cluster_total(ClusterId(0)), 3);
    }

    #[test]
    fn masked_organisms_are_excluded_from_rows() {
        let (ledger, n_clusters) = fixture();
        let pm = Panmatrix::build(&ledger, &[OrgId(1)], n_clusters);
        assert_eq!(pm.n_organisms(), 1);
        assert_eq!(pm.row_of(OrgId(0)), None);
        assert_eq!(pm.count(OrgId(0), ClusterId(0)), 0);
        assert_eq!(pm.presence(ClusterId(1)), 0);
        assert_eq!(pm.row_fingerprint(0), vec![true, false, true]);
    }
}
