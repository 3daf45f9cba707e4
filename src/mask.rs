//! Organism masking. Dropping hides an organism from every derived view;
//! recovering restores it. Identity is untouched either way, so the
//! operation is fully reversible.

use std::collections::HashSet;

use log::debug;

use crate::registry::OrgId;

#[derive(Clone, Debug, Default)]
pub struct OrganismMask {
    dropped: Vec<OrgId>,
    dropped_set: HashSet<OrgId>,
}

impl OrganismMask {
    pub fn is_dropped(&self, org: OrgId) -> bool {
        self.dropped_set.contains(&org)
    }

    /// Adds `org` to the dropped set. Returns false (no change) if it was
    /// already dropped. Callers validate the id against the registry first.
    pub fn drop(&mut self, org: OrgId) -> bool {
        if !self.dropped_set.insert(org) {
            return false;
        }
        self.dropped.push(org);
        debug!("dropped organism #{} ({} now masked)", org.0, self.dropped.len());
        true
    }

    /// Removes `org` from the dropped set. Returns false if it was not
    /// dropped (not dropped → no change).
    pub fn recover(&mut self, org: OrgId) -> bool {
        if !self.dropped_set.remove(&org) {
            return false;
        }
        self.dropped.retain(|&o| o != org);
        debug!("recovered organism #{} ({} still masked)", org.0, self.dropped.len());
        true
    }

    /// All registered organism ids minus the dropped ones, in registry order.
    pub fn active(&self, total: usize) -> Vec<OrgId> {
        (0..total)
            .map(OrgId)
            .filter(|o| !self.dropped_set.contains(o))
            .collect()
    }

    /// The dropped organisms, in the order they were dropped.
    pub fn dropped(&self) -> &[OrgId] {
        &self.dropped
    }

    pub fn n_dropped(&self) -> usize {
        self.dropped.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_plus_dropped_is_total() {
        let mut mask = OrganismMask::default();
        assert!(mask.drop(OrgId(1)));
        assert!(mask.drop(OrgId(3)));
        assert_eq!(mask.active(5), vec![OrgId(0), OrgId(2), OrgId(4)]);
        assert_eq!(mask.active(5).len() + mask.n_dropped(), 5);
    }

    #[test]
    fn drop_is_a_noop_when_already_dropped() {
        let mut mask = OrganismMask::default();
        assert!(mask.drop(OrgId(0)));
        assert!(!mask.drop(OrgId(0)));
        assert_eq!(mask.n_dropped(), 1);
    }

    #[test]
    fn recover_restores_and_preserves_drop_order() {
        let mut mask = OrganismMask::default();
        mask.drop(OrgId(2));
        mask.drop(OrgId(0));
        mask.drop(OrgId(4));
        assert_eq!(mask.dropped(), [OrgId(2), OrgId(0), OrgId(4)]);

        assert!(mask.recover(OrgId(0)));
        assert!(!mask.recover(OrgId(0)));
        assert_eq!(mask.dropped(), [OrgId(2), OrgId(4)]);
        assert_eq!(mask.active(5), vec![OrgId(0), OrgId(1), OrgId(3)]);
    }
}
