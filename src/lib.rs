//! An in-memory bacterial pangenome data model.
//!
//! The central type is [`Pangenome`]: gene-cluster membership across
//! organisms loaded from a primary table, with optional per-dimension
//! metadata and per-gene DNA sequences. Organisms can be reversibly hidden
//! (`drop`/`recover`); every derived view (the organism × cluster
//! [`Panmatrix`], the core/shell/cloud [`Classification`], sequence
//! groupings, and coordinate subsets) is filtered through the same mask,
//! so the views can never disagree about which organisms exist.
//!
//! ```
//! use panmatrix::{Pangenome, Partition, Table};
//!
//! let mut table = Table::new(["gene", "org", "cluster"]);
//! table.push_row(["dnaA_1", "ecoli_A", "dnaA"]).unwrap();
//! table.push_row(["dnaA_1", "ecoli_B", "dnaA"]).unwrap();
//! table.push_row(["traX_1", "ecoli_B", "traX"]).unwrap();
//!
//! let mut pan = Pangenome::from_table(&table).unwrap();
//! assert_eq!(pan.summary_stats().core, 1);
//!
//! pan.drop_organism("ecoli_A").unwrap();
//! assert_eq!(pan.panmatrix().n_organisms(), 1);
//! pan.recover_organism("ecoli_A").unwrap();
//! assert_eq!(pan.clusters_in(Partition::Cloud).len(), 1);
//! ```

pub mod classify;
pub mod error;
pub mod ledger;
pub mod mask;
pub mod matrix;
pub mod pangenome;
pub mod registry;
pub mod select;
pub mod seqs;
pub mod stats;
pub mod table;

pub use crate::classify::{Classification, CloudRule, Partition, PartitionSummary};
pub use crate::error::{PanError, Result};
pub use crate::ledger::{Gene, GeneLedger};
pub use crate::mask::OrganismMask;
pub use crate::matrix::Panmatrix;
pub use crate::pangenome::{
    MetaTarget, OrgRef, PanOptions, Pangenome, DEFAULT_CORE_LEVEL, DEFAULT_SEPARATOR,
};
pub use crate::registry::{ClusterId, NameRegistry, OrgId};
pub use crate::select::{PanView, Selector};
pub use crate::seqs::{ClusterSeqs, SeqRecord, SequenceInput, SequenceStore};
pub use crate::table::{MetaColumn, MetaTable, Table};
