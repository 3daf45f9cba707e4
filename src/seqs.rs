//! Sequence storage for the sequence-aware variant. Sequences are keyed by
//! the same composite gene id as the ledger and filtered through the same
//! mask and classification as every other view.

use std::collections::HashMap;

use log::{info, warn};

use crate::error::{PanError, Result};
use crate::ledger::GeneLedger;
use crate::registry::{ClusterId, NameRegistry};

/// Nested sequence input: organism name → (gene name → nucleotide string).
/// Names must match the primary table exactly.
pub type SequenceInput = HashMap<String, HashMap<String, String>>;

/// One sequence slot in a per-cluster group. Placeholder slots (inserted by
/// `fill`) carry no gene id and an empty sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeqRecord {
    pub organism: String,
    pub gid: Option<String>,
    pub sequence: String,
}

impl SeqRecord {
    pub fn is_placeholder(&self) -> bool {
        self.gid.is_none()
    }
}

/// Sequences of one cluster, in the group order requested by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterSeqs {
    pub cluster: ClusterId,
    pub name: String,
    pub records: Vec<SeqRecord>,
}

/// Raw sequences row-aligned with the ledger's gene order.
///
/// Construction validates the ledger against the input: a ledger gene with
/// no sequence is fatal, a sequence with no ledger gene is tolerated but
/// flagged on [`SequenceStore::orphans`] and logged at warn.
#[derive(Clone, Debug)]
pub struct SequenceStore {
    seqs: Vec<String>,
    orphans: Vec<String>,
}

impl SequenceStore {
    pub fn from_input(
        ledger: &GeneLedger,
        orgs: &NameRegistry,
        separator: &str,
        input: &SequenceInput,
    ) -> Result<Self> {
        let mut seqs = Vec::with_capacity(ledger.len());
        for gene in ledger.genes() {
            let org_name = orgs.name_of(gene.org.0)?;
            let seq = input
                .get(org_name)
                .and_then(|genes| genes.get(&gene.name))
                .ok_or_else(|| PanError::MissingSequence(gene.gid.clone()))?;
            seqs.push(seq.clone());
        }

        let mut orphans = Vec::new();
        for (org_name, genes) in input {
            for gene_name in genes.keys() {
                let gid = format!("{org_name}{separator}{gene_name}");
                if ledger.index_of_gid(&gid).is_none() {
                    warn!("sequence '{gid}' has no matching gene record; ignoring it");
                    orphans.push(gid);
                }
            }
        }
        orphans.sort_unstable();

        info!(
            "sequence store loaded: {} sequences, {} orphaned",
            seqs.len(),
            orphans.len()
        );
        Ok(Self { seqs, orphans })
    }

    /// The sequence of the ledger gene at `gene_index`.
    pub fn seq(&self, gene_index: usize) -> &str {
        &self.seqs[gene_index]
    }

    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }

    /// Composite keys from the input that matched no ledger gene, sorted.
    pub fn orphans(&self) -> &[String] {
        &self.orphans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NameRegistry;
    use crate::table::Table;

    fn ledger() -> (GeneLedger, NameRegistry) {
        let mut t = Table::new(["gene", "org", "cluster"]);
        t.push_row(["g1", "A", "OG1"]).unwrap();
        t.push_row(["g1", "B", "OG1"]).unwrap();
        let mut orgs = NameRegistry::new("organism");
        let mut clusters = NameRegistry::new("cluster");
        let ledger = GeneLedger::from_table(&t, "__", &mut orgs, &mut clusters).unwrap();
        (ledger, orgs)
    }

    fn input(pairs: &[(&str, &str, &str)]) -> SequenceInput {
        let mut out = SequenceInput::new();
        for &(org, gene, seq) in pairs {
            out.entry(org.to_string())
                .or_default()
                .insert(gene.to_string(), seq.to_string());
        }
        out
    }

    #[test]
    fn sequences_align_with_ledger_order() {
        let (ledger, orgs) = ledger();
        let store = SequenceStore::from_input(
            &ledger,
            &orgs,
            "__",
            &input(&[("A", "g1", "ATG"), ("B", "g1", "ATGC")]),
        )
        .unwrap();
        assert_eq!(store.seq(0), "ATG");
        assert_eq!(store.seq(1), "ATGC");
        assert!(store.orphans().is_empty());
    }

    #[test]
    fn ledger_gene_without_sequence_is_fatal() {
        let (ledger, orgs) = ledger();
        let err = SequenceStore::from_input(&ledger, &orgs, "__", &input(&[("A", "g1", "ATG")]));
        assert!(matches!(
            err,
            Err(PanError::MissingSequence(gid)) if gid == "B__g1"
        ));
    }

    #[test]
    fn orphan_sequences_are_flagged_not_fatal() {
        let (ledger, orgs) = ledger();
        let store = SequenceStore::from_input(
            &ledger,
            &orgs,
            "__",
            &input(&[
                ("A", "g1", "ATG"),
                ("B", "g1", "ATGC"),
                ("B", "g9", "TTT"),
                ("Z", "g1", "CCC"),
            ]),
        )
        .unwrap();
        assert_eq!(store.orphans(), ["B__g9", "Z__g1"]);
    }
}
