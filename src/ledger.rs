//! The gene ledger: the single source of truth every derived view (panmatrix,
//! classification, sequence groupings) is recomputed from.

use std::collections::HashMap;

use log::info;

use crate::error::{PanError, Result};
use crate::mask::OrganismMask;
use crate::registry::{ClusterId, NameRegistry, OrgId};
use crate::table::{MetaTable, Table};

/// Column name of the gene identifier in the primary table.
pub const GENE_ALIASES: [&str; 1] = ["gene"];
/// Accepted spellings of the organism column.
pub const ORG_ALIASES: [&str; 2] = ["org", "organism"];
/// Accepted spellings of the cluster column.
pub const CLUSTER_ALIASES: [&str; 2] = ["group", "cluster"];

/// One gene record. `gid` is the composite key `organism ⧺ separator ⧺ gene`,
/// unique across the whole dataset.
#[derive(Clone, Debug)]
pub struct Gene {
    pub gid: String,
    pub name: String,
    pub org: OrgId,
    pub cluster: ClusterId,
}

#[derive(Clone, Debug)]
pub struct GeneLedger {
    genes: Vec<Gene>,
    by_gid: HashMap<String, usize>,
    by_org: Vec<Vec<usize>>,
    by_cluster: Vec<Vec<usize>>,
    gene_meta: MetaTable,
}

impl GeneLedger {
    /// Builds the ledger from the primary table, registering every distinct
    /// organism and cluster name in first-appearance order.
    ///
    /// Fails with `MissingColumn` if a required column is absent and with
    /// `DuplicateKey` if two rows produce the same composite gene id; both
    /// abort construction with nothing built.
    pub fn from_table(
        table: &Table,
        separator: &str,
        orgs: &mut NameRegistry,
        clusters: &mut NameRegistry,
    ) -> Result<Self> {
        let gene_col = table
            .first_column_index(&GENE_ALIASES)
            .ok_or_else(|| PanError::MissingColumn(GENE_ALIASES.join("|")))?;
        let org_col = table
            .first_column_index(&ORG_ALIASES)
            .ok_or_else(|| PanError::MissingColumn(ORG_ALIASES.join("|")))?;
        let cluster_col = table
            .first_column_index(&CLUSTER_ALIASES)
            .ok_or_else(|| PanError::MissingColumn(CLUSTER_ALIASES.join("|")))?;

        let mut genes = Vec::with_capacity(table.n_rows());
        let mut by_gid = HashMap::with_capacity(table.n_rows());
        for row in table.rows() {
            let org_name = &row[org_col];
            let gene_name = &row[gene_col];
            let org = OrgId(orgs.register(org_name));
            let cluster = ClusterId(clusters.register(&row[cluster_col]));
            let gid = format!("{org_name}{separator}{gene_name}");
            if by_gid.insert(gid.clone(), genes.len()).is_some() {
                return Err(PanError::DuplicateKey(gid));
            }
            genes.push(Gene {
                gid,
                name: gene_name.clone(),
                org,
                cluster,
            });
        }

        let mut by_org = vec![Vec::new(); orgs.len()];
        let mut by_cluster = vec![Vec::new(); clusters.len()];
        for (i, gene) in genes.iter().enumerate() {
            by_org[gene.org.0].push(i);
            by_cluster[gene.cluster.0].push(i);
        }

        // Extra columns of the primary table become per-gene metadata.
        let mut gene_meta = MetaTable::with_rows(genes.len());
        for (ci, cname) in table.columns().iter().enumerate() {
            if ci == gene_col || ci == org_col || ci == cluster_col {
                continue;
            }
            let values = table.rows().map(|row| Some(row[ci].clone())).collect();
            gene_meta.push_column(cname.clone(), values)?;
        }

        info!(
            "gene ledger loaded: {} genes, {} organisms, {} clusters",
            genes.len(),
            orgs.len(),
            clusters.len()
        );
        Ok(Self {
            genes,
            by_gid,
            by_org,
            by_cluster,
            gene_meta,
        })
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn gene(&self, index: usize) -> &Gene {
        &self.genes[index]
    }

    pub fn index_of_gid(&self, gid: &str) -> Option<usize> {
        self.by_gid.get(gid).copied()
    }

    /// Composite gene ids in ledger order; the join keys for gene metadata.
    pub fn gids(&self) -> Vec<String> {
        self.genes.iter().map(|g| g.gid.clone()).collect()
    }

    /// Ledger indexes of the genes in `cluster`, in load order.
    pub fn gene_indexes_of_cluster(&self, cluster: ClusterId) -> &[usize] {
        &self.by_cluster[cluster.0]
    }

    pub fn gene_indexes_of_organism(&self, org: OrgId) -> &[usize] {
        &self.by_org[org.0]
    }

    pub fn genes_of_cluster(
        &self,
        cluster: ClusterId,
        mask: &OrganismMask,
        active_only: bool,
    ) -> Vec<&Gene> {
        self.by_cluster[cluster.0]
            .iter()
            .map(|&i| &self.genes[i])
            .filter(|g| !active_only || !mask.is_dropped(g.org))
            .collect()
    }

    pub fn genes_of_organism(
        &self,
        org: OrgId,
        mask: &OrganismMask,
        active_only: bool,
    ) -> Vec<&Gene> {
        if active_only && mask.is_dropped(org) {
            return Vec::new();
        }
        self.by_org[org.0].iter().map(|&i| &self.genes[i]).collect()
    }

    pub fn gene_meta(&self) -> &MetaTable {
        &self.gene_meta
    }

    pub fn gene_meta_mut(&mut self) -> &mut MetaTable {
        &mut self.gene_meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary() -> Table {
        let mut t = Table::new(["gene", "org", "cluster", "product"]);
        t.push_row(["g1", "ecoli_A", "OG1", "kinase"]).unwrap();
        t.push_row(["g2", "ecoli_A", "OG2", "ligase"]).unwrap();
        t.push_row(["g1", "ecoli_B", "OG1", "kinase"]).unwrap();
        t
    }

    fn build(t: &Table) -> Result<(GeneLedger, NameRegistry, NameRegistry)> {
        let mut orgs = NameRegistry::new("organism");
        let mut clusters = NameRegistry::new("cluster");
        let ledger = GeneLedger::from_table(t, "__", &mut orgs, &mut clusters)?;
        Ok((ledger, orgs, clusters))
    }

    #[test]
    fn builds_composite_ids_and_registers_names() {
        let (ledger, orgs, clusters) = build(&primary()).unwrap();
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.gene(0).gid, "ecoli_A__g1");
        assert_eq!(orgs.names(), ["ecoli_A", "ecoli_B"]);
        assert_eq!(clusters.names(), ["OG1", "OG2"]);
        assert_eq!(ledger.index_of_gid("ecoli_B__g1"), Some(2));
    }

    #[test]
    fn alias_column_spellings_are_accepted() {
        let mut t = Table::new(["gene", "organism", "group"]);
        t.push_row(["g1", "o1", "c1"]).unwrap();
        assert!(build(&t).is_ok());
    }

    #[test]
    fn missing_required_column_fails() {
        let t = Table::new(["gene", "org"]);
        assert!(matches!(
            build(&t),
            Err(PanError::MissingColumn(c)) if c == "group|cluster"
        ));
    }

    #[test]
    fn duplicate_composite_key_fails() {
        let mut t = primary();
        t.push_row(["g1", "ecoli_A", "OG2", "dup"]).unwrap();
        assert!(matches!(
            build(&t),
            Err(PanError::DuplicateKey(k)) if k == "ecoli_A__g1"
        ));
    }

    #[test]
    fn extra_columns_become_gene_metadata() {
        let (ledger, ..) = build(&primary()).unwrap();
        assert_eq!(ledger.gene_meta().get("product", 1), Some("ligase"));
    }

    #[test]
    fn cluster_and_organism_lookups_respect_the_mask() {
        let (ledger, ..) = build(&primary()).unwrap();
        let mut mask = OrganismMask::default();
        assert_eq!(ledger.genes_of_cluster(ClusterId(0), &mask, true).len(), 2);

        mask.drop(OrgId(1));
        assert_eq!(ledger.genes_of_cluster(ClusterId(0), &mask, true).len(), 1);
        assert_eq!(ledger.genes_of_cluster(ClusterId(0), &mask, false).len(), 2);
        assert!(ledger.genes_of_organism(OrgId(1), &mask, true).is_empty());
        assert_eq!(ledger.genes_of_organism(OrgId(1), &mask, false).len(), 1);
    }
}
