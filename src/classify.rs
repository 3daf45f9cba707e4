//! Core/shell/cloud partitioning of clusters, driven by the panmatrix and
//! the mutable core threshold.

use std::collections::HashMap;

use log::debug;

use crate::matrix::Panmatrix;
use crate::registry::ClusterId;
use crate::table::Table;

/// The pangenome partition a cluster belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Partition {
    Core,
    Shell,
    Cloud,
}

impl Partition {
    pub fn as_str(self) -> &'static str {
        match self {
            Partition::Core => "core",
            Partition::Shell => "shell",
            Partition::Cloud => "cloud",
        }
    }
}

/// How cloud membership is decided beyond the core threshold.
///
/// `Singletons` is the authoritative rule: a cluster with exactly one gene
/// across active organisms is cloud. `CollapseClones` additionally treats
/// organisms with identical presence/absence fingerprints across all
/// clusters as one effective organism, and calls a cluster cloud when its
/// present organisms reduce to at most one effective organism.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CloudRule {
    #[default]
    Singletons,
    CollapseClones,
}

/// Per-cluster labels plus the inputs they were derived from. A pure
/// projection of one panmatrix snapshot; never mutated in place.
#[derive(Clone, Debug)]
pub struct Classification {
    labels: Vec<Partition>,
    presence: Vec<usize>,
    n_active: usize,
    core_level: f64,
}

impl Classification {
    /// Labels every cluster. Cloud is decided first (a singleton stays cloud
    /// even when its presence ratio clears the threshold), then core, then
    /// shell for the remainder. Clusters with no active genes are cloud.
    pub fn compute(pm: &Panmatrix, core_level: f64, rule: CloudRule) -> Self {
        let n_active = pm.n_organisms();
        let n_clusters = pm.n_clusters();

        // Effective-organism groups for the clonal-collapse rule: organisms
        // sharing a fingerprint across all clusters count once.
        let group_of_row: Vec<usize> = match rule {
            CloudRule::Singletons => (0..n_active).collect(),
            CloudRule::CollapseClones => {
                let mut groups: HashMap<Vec<bool>, usize> = HashMap::new();
                (0..n_active)
                    .map(|row| {
                        let next = groups.len();
                        *groups.entry(pm.row_fingerprint(row)).or_insert(next)
                    })
                    .collect()
            }
        };

        let mut labels = Vec::with_capacity(n_clusters);
        let mut presence = Vec::with_capacity(n_clusters);
        for c in 0..n_clusters {
            let cluster = ClusterId(c);
            let present_rows: Vec<usize> = (0..n_active)
                .filter(|&row| pm.counts()[[row, c]] > 0)
                .collect();
            let p = present_rows.len();
            presence.push(p);

            let is_cloud = match rule {
                CloudRule::Singletons => pm.cluster_total(cluster) <= 1,
                CloudRule::CollapseClones => {
                    let mut effective: Vec<usize> =
                        present_rows.iter().map(|&r| group_of_row[r]).collect();
                    effective.sort_unstable();
                    effective.dedup();
                    effective.len() <= 1
                }
            };

            let label = if is_cloud {
                Partition::Cloud
            } else if n_active > 0 && (p * 100) as f64 >= core_level * n_active as f64 {
                Partition::Core
            } else {
                Partition::Shell
            };
            labels.push(label);
        }

        let out = Self {
            labels,
            presence,
            n_active,
            core_level,
        };
        let summary = out.summary();
        debug!(
            "classified {} clusters at core level {}: {} core, {} shell, {} cloud",
            summary.total, core_level, summary.core, summary.shell, summary.cloud
        );
        out
    }

    pub fn label(&self, cluster: ClusterId) -> Partition {
        self.labels[cluster.0]
    }

    pub fn labels(&self) -> &[Partition] {
        &self.labels
    }

    /// Active organisms with at least one gene in `cluster`.
    pub fn presence(&self, cluster: ClusterId) -> usize {
        self.presence[cluster.0]
    }

    pub fn n_active(&self) -> usize {
        self.n_active
    }

    pub fn core_level(&self) -> f64 {
        self.core_level
    }

    pub fn clusters_in(&self, partition: Partition) -> Vec<ClusterId> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == partition)
            .map(|(c, _)| ClusterId(c))
            .collect()
    }

    pub fn summary(&self) -> PartitionSummary {
        let mut summary = PartitionSummary {
            core: 0,
            shell: 0,
            cloud: 0,
            total: self.labels.len(),
        };
        for label in &self.labels {
            match label {
                Partition::Core => summary.core += 1,
                Partition::Shell => summary.shell += 1,
                Partition::Cloud => summary.cloud += 1,
            }
        }
        summary
    }
}

/// Cluster counts per partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartitionSummary {
    pub core: usize,
    pub shell: usize,
    pub cloud: usize,
    pub total: usize,
}

impl PartitionSummary {
    pub fn to_table(&self) -> Table {
        let mut t = Table::new(["category", "clusters"]);
        for (name, count) in [
            ("core", self.core),
            ("shell", self.shell),
            ("cloud", self.cloud),
            ("total", self.total),
        ] {
            t.push_row([name.to_string(), count.to_string()])
                .expect("two-column row");
        }
        t
    }
}
