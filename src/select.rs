//! Two-dimensional (organism, cluster) subsetting. Selectors resolve against
//! the *visible* order (active organisms as the matrix shows them, clusters
//! in registry order) and project one consistent restriction onto the
//! matrix, the gene table, and the sequence store.

use std::collections::HashMap;

use ndarray::Array2;

use crate::error::{PanError, Result};
use crate::ledger::Gene;
use crate::seqs::ClusterSeqs;

/// One dimension of a subsetting request.
///
/// `Positions` are 1-based into the visible order (matching the matrix's
/// row/column numbering); `Names` resolve through the registry; `Mask` must
/// match the visible length exactly.
#[derive(Clone, Debug)]
pub enum Selector {
    All,
    Positions(Vec<usize>),
    Names(Vec<String>),
    Mask(Vec<bool>),
}

impl Selector {
    pub fn positions<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Selector::Positions(iter.into_iter().collect())
    }

    pub fn names<I, S>(iter: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selector::Names(iter.into_iter().map(Into::into).collect())
    }

    pub fn mask<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Selector::Mask(iter.into_iter().collect())
    }
}

/// Resolves `sel` to 0-based indexes into `visible`, in selection order.
pub(crate) fn resolve(sel: &Selector, visible: &[&str], dim: &str) -> Result<Vec<usize>> {
    match sel {
        Selector::All => Ok((0..visible.len()).collect()),
        Selector::Positions(positions) => positions
            .iter()
            .map(|&p| {
                if p >= 1 && p <= visible.len() {
                    Ok(p - 1)
                } else {
                    Err(PanError::InvalidSelector(format!(
                        "{dim} position {p} out of range 1..={}",
                        visible.len()
                    )))
                }
            })
            .collect(),
        Selector::Names(names) => {
            let index: HashMap<&str, usize> = visible
                .iter()
                .enumerate()
                .map(|(i, &n)| (n, i))
                .collect();
            names
                .iter()
                .map(|n| {
                    index.get(n.as_str()).copied().ok_or_else(|| {
                        PanError::InvalidSelector(format!("{dim} '{n}' is not in the current view"))
                    })
                })
                .collect()
        }
        Selector::Mask(mask) => {
            if mask.len() != visible.len() {
                return Err(PanError::InvalidSelector(format!(
                    "{dim} mask has {} entries but the view has {}",
                    mask.len(),
                    visible.len()
                )));
            }
            Ok(mask
                .iter()
                .enumerate()
                .filter(|(_, &keep)| keep)
                .map(|(i, _)| i)
                .collect())
        }
    }
}

/// The restricted snapshot produced by `Pangenome::select`: a new value
/// detached from the source object, with all views agreeing on exactly the
/// same (organism, cluster) pairs.
#[derive(Clone, Debug)]
pub struct PanView {
    pub organisms: Vec<String>,
    pub clusters: Vec<String>,
    pub counts: Array2<u32>,
    pub genes: Vec<Gene>,
    pub sequences: Option<Vec<ClusterSeqs>>,
}

impl PanView {
    pub fn n_organisms(&self) -> usize {
        self.organisms.len()
    }

    pub fn n_clusters(&self) -> usize {
        self.clusters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VISIBLE: [&str; 3] = ["A", "B", "C"];

    #[test]
    fn positions_are_one_based() {
        let idx = resolve(&Selector::positions([1, 3]), &VISIBLE, "organism").unwrap();
        assert_eq!(idx, vec![0, 2]);
    }

    #[test]
    fn name_and_position_selectors_agree() {
        let by_name = resolve(&Selector::names(["A", "C"]), &VISIBLE, "organism").unwrap();
        let by_pos = resolve(&Selector::positions([1, 3]), &VISIBLE, "organism").unwrap();
        assert_eq!(by_name, by_pos);
    }

    #[test]
    fn out_of_range_position_is_invalid() {
        for p in [0, 4] {
            assert!(matches!(
                resolve(&Selector::positions([p]), &VISIBLE, "organism"),
                Err(PanError::InvalidSelector(_))
            ));
        }
    }

    #[test]
    fn unknown_name_is_invalid() {
        assert!(matches!(
            resolve(&Selector::names(["Z"]), &VISIBLE, "cluster"),
            Err(PanError::InvalidSelector(_))
        ));
    }

    #[test]
    fn mask_must_match_visible_length() {
        let idx = resolve(&Selector::mask([true, false, true]), &VISIBLE, "organism").unwrap();
        assert_eq!(idx, vec![0, 2]);
        assert!(matches!(
            resolve(&Selector::mask([true, false]), &VISIBLE, "organism"),
            Err(PanError::InvalidSelector(_))
        ));
    }
}
