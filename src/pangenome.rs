//! The root pangenome object: registries, gene ledger, organism mask, and
//! the memoized derived views (panmatrix, classification) with their
//! invalidation rules.

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info, warn};
use ndarray::Axis;

use crate::classify::{Classification, CloudRule, Partition, PartitionSummary};
use crate::error::{PanError, Result};
use crate::ledger::{Gene, GeneLedger, CLUSTER_ALIASES, GENE_ALIASES, ORG_ALIASES};
use crate::mask::OrganismMask;
use crate::matrix::Panmatrix;
use crate::registry::{ClusterId, NameRegistry, OrgId};
use crate::select::{self, PanView, Selector};
use crate::seqs::{ClusterSeqs, SeqRecord, SequenceInput, SequenceStore};
use crate::table::{MetaTable, Table};

/// Separator joining organism and gene name into the composite gene id.
pub const DEFAULT_SEPARATOR: &str = "__";
/// Default core threshold, in percent of active organisms.
pub const DEFAULT_CORE_LEVEL: f64 = 95.0;

const CORE_LEVEL_WARN_FLOOR: f64 = 85.0;

/// Construction options. The defaults match the common case: `__` as the
/// gene-id separator, core at 95%, singleton-only cloud rule.
#[derive(Clone, Debug)]
pub struct PanOptions {
    pub separator: String,
    pub core_level: f64,
    pub cloud_rule: CloudRule,
}

impl Default for PanOptions {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            core_level: DEFAULT_CORE_LEVEL,
            cloud_rule: CloudRule::default(),
        }
    }
}

/// Which entity dimension `add_metadata` joins onto.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetaTarget {
    Organism,
    Cluster,
    Gene,
}

/// An organism reference: by name or by id. `drop_organism` and
/// `recover_organism` accept either.
#[derive(Clone, Debug)]
pub enum OrgRef {
    Name(String),
    Id(OrgId),
}

impl From<&str> for OrgRef {
    fn from(name: &str) -> Self {
        OrgRef::Name(name.to_string())
    }
}

impl From<String> for OrgRef {
    fn from(name: String) -> Self {
        OrgRef::Name(name)
    }
}

impl From<OrgId> for OrgRef {
    fn from(id: OrgId) -> Self {
        OrgRef::Id(id)
    }
}

/// A bacterial pangenome: gene-cluster membership across organisms, with
/// optional metadata and sequences, reversible organism masking, and
/// threshold-driven core/shell/cloud partitioning.
///
/// The gene ledger is the single source of truth; the panmatrix and the
/// classification are projections of it, memoized and invalidated whenever
/// the active-organism set or the core threshold changes. Each accessor
/// call is internally consistent at the instant it runs, but the object is
/// not safe for unsynchronized mutation from multiple threads.
///
/// Cloning yields a deep, fully independent copy. Callers who want two
/// handles observing the same instance should wrap it in `Rc<RefCell<_>>`
/// rather than clone.
#[derive(Clone, Debug)]
pub struct Pangenome {
    orgs: NameRegistry,
    clusters: NameRegistry,
    ledger: GeneLedger,
    mask: OrganismMask,
    org_meta: MetaTable,
    cluster_meta: MetaTable,
    sequences: Option<SequenceStore>,
    separator: String,
    core_level: f64,
    cloud_rule: CloudRule,
    panmatrix_cache: RefCell<Option<Arc<Panmatrix>>>,
    classification_cache: RefCell<Option<Arc<Classification>>>,
}

fn validate_core_level(level: f64) -> Result<()> {
    if !(level > 0.0 && level <= 100.0) {
        return Err(PanError::InvalidThreshold(level));
    }
    if level < CORE_LEVEL_WARN_FLOOR {
        warn!("core level {level} is below {CORE_LEVEL_WARN_FLOOR}; the core partition will be permissive");
    }
    Ok(())
}

impl Pangenome {
    /// Loads a pangenome from the primary gene table with default options.
    pub fn from_table(table: &Table) -> Result<Self> {
        Self::with_options(table, PanOptions::default())
    }

    pub fn with_options(table: &Table, options: PanOptions) -> Result<Self> {
        validate_core_level(options.core_level)?;
        let mut orgs = NameRegistry::new("organism");
        let mut clusters = NameRegistry::new("cluster");
        let ledger = GeneLedger::from_table(table, &options.separator, &mut orgs, &mut clusters)?;
        let org_meta = MetaTable::with_rows(orgs.len());
        let cluster_meta = MetaTable::with_rows(clusters.len());
        Ok(Self {
            orgs,
            clusters,
            ledger,
            mask: OrganismMask::default(),
            org_meta,
            cluster_meta,
            sequences: None,
            separator: options.separator,
            core_level: options.core_level,
            cloud_rule: options.cloud_rule,
            panmatrix_cache: RefCell::new(None),
            classification_cache: RefCell::new(None),
        })
    }

    /// Loads the sequence-aware variant: primary table plus a sequence for
    /// every gene record. Fails with `MissingSequence` before anything is
    /// built if a ledger gene has no sequence.
    pub fn with_sequences(table: &Table, seqs: &SequenceInput) -> Result<Self> {
        let mut pan = Self::from_table(table)?;
        pan.attach_sequences(seqs)?;
        Ok(pan)
    }

    /// Attaches (or replaces) the sequence store. On error the pangenome is
    /// left exactly as it was.
    pub fn attach_sequences(&mut self, seqs: &SequenceInput) -> Result<()> {
        let store = SequenceStore::from_input(&self.ledger, &self.orgs, &self.separator, seqs)?;
        self.sequences = Some(store);
        Ok(())
    }

    // --- identity and registries ---

    pub fn n_organisms(&self) -> usize {
        self.orgs.len()
    }

    pub fn n_clusters(&self) -> usize {
        self.clusters.len()
    }

    pub fn n_genes(&self) -> usize {
        self.ledger.len()
    }

    /// All registered organism names in id order, masked or not.
    pub fn organism_names(&self) -> &[String] {
        self.orgs.names()
    }

    pub fn cluster_names(&self) -> &[String] {
        self.clusters.names()
    }

    pub fn organism_id(&self, name: &str) -> Result<OrgId> {
        self.orgs.id_of(name).map(OrgId)
    }

    pub fn cluster_id(&self, name: &str) -> Result<ClusterId> {
        self.clusters.id_of(name).map(ClusterId)
    }

    pub fn organism_name(&self, id: OrgId) -> Result<&str> {
        self.orgs.name_of(id.0)
    }

    pub fn cluster_name(&self, id: ClusterId) -> Result<&str> {
        self.clusters.name_of(id.0)
    }

    pub fn ledger(&self) -> &GeneLedger {
        &self.ledger
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    // --- masking ---

    fn resolve_org(&self, org: OrgRef) -> Result<OrgId> {
        match org {
            OrgRef::Name(name) => self.orgs.id_of(&name).map(OrgId),
            OrgRef::Id(id) if self.orgs.contains_id(id.0) => Ok(id),
            OrgRef::Id(id) => Err(PanError::not_found("organism", format!("#{}", id.0))),
        }
    }

    /// Hides an organism from every derived view. No-op if already dropped;
    /// `NotFound` if the name/id is unknown.
    pub fn drop_organism(&mut self, org: impl Into<OrgRef>) -> Result<()> {
        let id = self.resolve_org(org.into())?;
        if self.mask.drop(id) {
            self.invalidate_derived();
        }
        Ok(())
    }

    /// Restores a dropped organism. No-op if it is not dropped; `NotFound`
    /// if the name/id is unknown.
    pub fn recover_organism(&mut self, org: impl Into<OrgRef>) -> Result<()> {
        let id = self.resolve_org(org.into())?;
        if self.mask.recover(id) {
            self.invalidate_derived();
        }
        Ok(())
    }

    /// Active organism ids in registry order.
    pub fn active_organisms(&self) -> Vec<OrgId> {
        self.mask.active(self.orgs.len())
    }

    /// Dropped organisms with their names, in the order they were dropped.
    pub fn dropped_organisms(&self) -> Vec<(OrgId, &str)> {
        self.mask
            .dropped()
            .iter()
            .map(|&id| (id, self.orgs.names()[id.0].as_str()))
            .collect()
    }

    // --- derived views ---

    fn invalidate_derived(&mut self) {
        *self.panmatrix_cache.get_mut() = None;
        *self.classification_cache.get_mut() = None;
    }

    /// The organism × cluster abundance matrix over the active organisms.
    /// Memoized; rebuilt lazily after any mask change.
    pub fn panmatrix(&self) -> Arc<Panmatrix> {
        if let Some(pm) = self.panmatrix_cache.borrow().as_ref() {
            return Arc::clone(pm);
        }
        let active = self.active_organisms();
        debug!("rebuilding panmatrix for {} active organisms", active.len());
        let pm = Arc::new(Panmatrix::build(&self.ledger, &active, self.clusters.len()));
        *self.panmatrix_cache.borrow_mut() = Some(Arc::clone(&pm));
        pm
    }

    /// The current core/shell/cloud classification. Memoized; invalidated
    /// by mask changes and by `set_core_level`.
    pub fn classification(&self) -> Arc<Classification> {
        if let Some(cls) = self.classification_cache.borrow().as_ref() {
            return Arc::clone(cls);
        }
        let cls = Arc::new(Classification::compute(
            &self.panmatrix(),
            self.core_level,
            self.cloud_rule,
        ));
        *self.classification_cache.borrow_mut() = Some(Arc::clone(&cls));
        cls
    }

    pub fn core_level(&self) -> f64 {
        self.core_level
    }

    /// Sets the core threshold, in (0, 100]. Values below 85 proceed with a
    /// warning; anything else outside the range is `InvalidThreshold`.
    pub fn set_core_level(&mut self, level: f64) -> Result<()> {
        validate_core_level(level)?;
        self.core_level = level;
        *self.classification_cache.get_mut() = None;
        Ok(())
    }

    pub fn cloud_rule(&self) -> CloudRule {
        self.cloud_rule
    }

    pub fn clusters_in(&self, partition: Partition) -> Vec<ClusterId> {
        self.classification().clusters_in(partition)
    }

    pub fn core_clusters(&self) -> Vec<ClusterId> {
        self.clusters_in(Partition::Core)
    }

    pub fn shell_clusters(&self) -> Vec<ClusterId> {
        self.clusters_in(Partition::Shell)
    }

    pub fn cloud_clusters(&self) -> Vec<ClusterId> {
        self.clusters_in(Partition::Cloud)
    }

    pub fn summary_stats(&self) -> PartitionSummary {
        self.classification().summary()
    }

    pub fn summary_table(&self) -> Table {
        self.summary_stats().to_table()
    }

    // --- gene access ---

    pub fn genes_of_cluster(&self, cluster: ClusterId, active_only: bool) -> Result<Vec<&Gene>> {
        if !self.clusters.contains_id(cluster.0) {
            return Err(PanError::not_found("cluster", format!("#{}", cluster.0)));
        }
        Ok(self.ledger.genes_of_cluster(cluster, &self.mask, active_only))
    }

    pub fn genes_of_organism(&self, org: OrgId, active_only: bool) -> Result<Vec<&Gene>> {
        if !self.orgs.contains_id(org.0) {
            return Err(PanError::not_found("organism", format!("#{}", org.0)));
        }
        Ok(self.ledger.genes_of_organism(org, &self.mask, active_only))
    }

    // --- metadata ---

    /// Left-joins `incoming` onto one entity dimension, matching on its key
    /// column (`org`/`organism`, `group`/`cluster`, or `gene` holding
    /// composite gene ids). Unmatched rows are null-filled.
    pub fn add_metadata(&mut self, target: MetaTarget, incoming: &Table) -> Result<()> {
        match target {
            MetaTarget::Organism => {
                self.org_meta
                    .left_join(self.orgs.names(), incoming, &ORG_ALIASES)
            }
            MetaTarget::Cluster => {
                self.cluster_meta
                    .left_join(self.clusters.names(), incoming, &CLUSTER_ALIASES)
            }
            MetaTarget::Gene => {
                let gids = self.ledger.gids();
                self.ledger
                    .gene_meta_mut()
                    .left_join(&gids, incoming, &GENE_ALIASES)
            }
        }
    }

    pub fn organism_meta(&self) -> &MetaTable {
        &self.org_meta
    }

    pub fn cluster_meta(&self) -> &MetaTable {
        &self.cluster_meta
    }

    pub fn gene_meta(&self) -> &MetaTable {
        self.ledger.gene_meta()
    }

    // --- tabular read surface ---

    /// Active organisms with their metadata, in registry order.
    pub fn organism_table(&self) -> Table {
        let mut columns: Vec<String> = vec!["id".into(), "org".into()];
        columns.extend(self.org_meta.columns().iter().map(|c| c.name.clone()));
        let mut table = Table::new(columns);
        for id in self.active_organisms() {
            let mut row: Vec<String> = vec![id.0.to_string(), self.orgs.names()[id.0].clone()];
            for col in self.org_meta.columns() {
                row.push(col.values[id.0].clone().unwrap_or_default());
            }
            table.push_row(row).expect("row built from column set");
        }
        table
    }

    /// All clusters with their current partition label, presence among the
    /// active organisms, and metadata.
    pub fn cluster_table(&self) -> Table {
        let cls = self.classification();
        let mut columns: Vec<String> =
            vec!["id".into(), "cluster".into(), "partition".into(), "presence".into()];
        columns.extend(self.cluster_meta.columns().iter().map(|c| c.name.clone()));
        let mut table = Table::new(columns);
        for (c, name) in self.clusters.names().iter().enumerate() {
            let cluster = ClusterId(c);
            let mut row: Vec<String> = vec![
                c.to_string(),
                name.clone(),
                cls.label(cluster).as_str().to_string(),
                cls.presence(cluster).to_string(),
            ];
            for col in self.cluster_meta.columns() {
                row.push(col.values[c].clone().unwrap_or_default());
            }
            table.push_row(row).expect("row built from column set");
        }
        table
    }

    /// Genes of active organisms with their metadata, in ledger order.
    pub fn gene_table(&self) -> Table {
        let mut columns: Vec<String> =
            vec!["gid".into(), "gene".into(), "org".into(), "cluster".into()];
        columns.extend(self.gene_meta().columns().iter().map(|c| c.name.clone()));
        let mut table = Table::new(columns);
        for (i, gene) in self.ledger.genes().iter().enumerate() {
            if self.mask.is_dropped(gene.org) {
                continue;
            }
            let mut row: Vec<String> = vec![
                gene.gid.clone(),
                gene.name.clone(),
                self.orgs.names()[gene.org.0].clone(),
                self.clusters.names()[gene.cluster.0].clone(),
            ];
            for col in self.gene_meta().columns() {
                row.push(col.values[i].clone().unwrap_or_default());
            }
            table.push_row(row).expect("row built from column set");
        }
        table
    }

    // --- sequences ---

    pub fn has_sequences(&self) -> bool {
        self.sequences.is_some()
    }

    pub fn sequences(&self) -> Option<&SequenceStore> {
        self.sequences.as_ref()
    }

    /// Sequences grouped by cluster, filtered through the mask and an
    /// optional partition filter (`None` means all partitions). Records keep
    /// load order within each cluster. `None` when no sequences are loaded.
    pub fn cluster_sequences(&self, filter: Option<Partition>) -> Option<Vec<ClusterSeqs>> {
        let store = self.sequences.as_ref()?;
        let cls = self.classification();
        let mut groups = Vec::new();
        for (c, name) in self.clusters.names().iter().enumerate() {
            let cluster = ClusterId(c);
            if let Some(wanted) = filter {
                if cls.label(cluster) != wanted {
                    continue;
                }
            }
            let records: Vec<SeqRecord> = self
                .ledger
                .gene_indexes_of_cluster(cluster)
                .iter()
                .filter(|&&i| !self.mask.is_dropped(self.ledger.gene(i).org))
                .map(|&i| {
                    let gene = self.ledger.gene(i);
                    SeqRecord {
                        organism: self.orgs.names()[gene.org.0].clone(),
                        gid: Some(gene.gid.clone()),
                        sequence: store.seq(i).to_string(),
                    }
                })
                .collect();
            groups.push(ClusterSeqs {
                cluster,
                name: name.clone(),
                records,
            });
        }
        Some(groups)
    }

    /// Core-cluster sequences arranged for concatenation into a multi-gene
    /// alignment: one group per core cluster, records ordered by organism
    /// name ascending. `max_per_org` caps sequences per (organism, cluster)
    /// pair, discarding extras in load order; with `fill`, organisms absent
    /// from a cluster get a placeholder empty sequence so every group has an
    /// entry per active organism. `None` when no sequences are loaded.
    pub fn core_seqs_for_phylo(
        &self,
        max_per_org: Option<usize>,
        fill: bool,
    ) -> Option<Vec<ClusterSeqs>> {
        let store = self.sequences.as_ref()?;
        let cls = self.classification();

        let mut active_by_name: Vec<OrgId> = self.active_organisms();
        active_by_name.sort_by(|a, b| self.orgs.names()[a.0].cmp(&self.orgs.names()[b.0]));

        let mut groups = Vec::new();
        for cluster in cls.clusters_in(Partition::Core) {
            let mut records = Vec::new();
            for &org in &active_by_name {
                let org_name = &self.orgs.names()[org.0];
                let mut taken = 0usize;
                for &i in self.ledger.gene_indexes_of_cluster(cluster) {
                    let gene = self.ledger.gene(i);
                    if gene.org != org {
                        continue;
                    }
                    if max_per_org.is_some_and(|cap| taken >= cap) {
                        break;
                    }
                    records.push(SeqRecord {
                        organism: org_name.clone(),
                        gid: Some(gene.gid.clone()),
                        sequence: store.seq(i).to_string(),
                    });
                    taken += 1;
                }
                if taken == 0 && fill {
                    records.push(SeqRecord {
                        organism: org_name.clone(),
                        gid: None,
                        sequence: String::new(),
                    });
                }
            }
            groups.push(ClusterSeqs {
                cluster,
                name: self.clusters.names()[cluster.0].clone(),
                records,
            });
        }
        info!(
            "assembled {} core cluster group(s) for phylogeny (fill={fill})",
            groups.len()
        );
        Some(groups)
    }

    // --- subsetting ---

    /// Produces a consistent restricted view of the matrix, gene table, and
    /// sequence store for the given organism and cluster selectors. The
    /// result is a detached snapshot; the pangenome itself is untouched.
    pub fn select(&self, org_sel: &Selector, cluster_sel: &Selector) -> Result<PanView> {
        let pm = self.panmatrix();
        let active_names: Vec<&str> = pm
            .org_ids()
            .iter()
            .map(|&o| self.orgs.names()[o.0].as_str())
            .collect();
        let org_rows = select::resolve(org_sel, &active_names, "organism")?;
        let cluster_names: Vec<&str> = self.clusters.names().iter().map(String::as_str).collect();
        let cluster_cols = select::resolve(cluster_sel, &cluster_names, "cluster")?;

        let counts = pm
            .counts()
            .select(Axis(0), &org_rows)
            .select(Axis(1), &cluster_cols);

        let org_set: HashSet<OrgId> = org_rows.iter().map(|&r| pm.org_ids()[r]).collect();
        let cluster_set: HashSet<ClusterId> = cluster_cols.iter().map(|&c| ClusterId(c)).collect();
        let genes: Vec<Gene> = self
            .ledger
            .genes()
            .iter()
            .filter(|g| org_set.contains(&g.org) && cluster_set.contains(&g.cluster))
            .cloned()
            .collect();

        let sequences = self.sequences.as_ref().map(|store| {
            cluster_cols
                .iter()
                .map(|&c| {
                    let cluster = ClusterId(c);
                    let records: Vec<SeqRecord> = self
                        .ledger
                        .gene_indexes_of_cluster(cluster)
                        .iter()
                        .filter(|&&i| org_set.contains(&self.ledger.gene(i).org))
                        .map(|&i| {
                            let gene = self.ledger.gene(i);
                            SeqRecord {
                                organism: self.orgs.names()[gene.org.0].clone(),
                                gid: Some(gene.gid.clone()),
                                sequence: store.seq(i).to_string(),
                            }
                        })
                        .collect();
                    ClusterSeqs {
                        cluster,
                        name: cluster_names[c].to_string(),
                        records,
                    }
                })
                .collect()
        });

        Ok(PanView {
            organisms: org_rows
                .iter()
                .map(|&r| active_names[r].to_string())
                .collect(),
            clusters: cluster_cols
                .iter()
                .map(|&c| cluster_names[c].to_string())
                .collect(),
            counts,
            genes,
            sequences,
        })
    }
}
