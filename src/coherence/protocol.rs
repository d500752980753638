//! Coherence protocol variants.
//!
//! Every variant shares the miss path and the read-hit path; they differ in
//! the signal a write hit puts on the bus, in how a snooping cache reacts to
//! what it observes, and in whether the requester settles its state after the
//! broadcast.

use std::fmt::Debug;

use super::common::{BlockState, BusSignal, SnoopAction};
use crate::commons::Protocol;

pub trait CoherencePolicy: Debug + Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Signal issued by a write that hits a line in state `prev`.
    fn write_hit(&self, prev: BlockState) -> Option<BusSignal>;

    /// Reaction of a cache holding a line in `state` to `sig` from a peer.
    fn snoop(&self, state: BlockState, sig: BusSignal) -> SnoopAction;

    /// Whether the requester resolves its state from the shared line after
    /// the broadcast.
    fn settles_after_broadcast(&self) -> bool {
        false
    }

    /// Whether snoops are screened by a snoop filter.
    fn filters_snoops(&self) -> bool {
        false
    }
}

impl Protocol {
    pub fn policy(&self) -> &'static dyn CoherencePolicy {
        match self {
            Protocol::MSI => &Msi,
            Protocol::MSIBusUpgr => &MsiBusUpgr,
            Protocol::MESI => &Mesi,
            Protocol::MESIFilter => &MesiFilter,
        }
    }
}

/// Write hits in MSI and MESI once BusUpgr is available.
fn upgrade_on_write(prev: BlockState) -> Option<BusSignal> {
    match prev {
        BlockState::Shared => Some(BusSignal::BusUpgr),
        BlockState::Invalid => Some(BusSignal::BusRdX),
        BlockState::Exclusive | BlockState::Modified => None,
    }
}

#[derive(Debug)]
pub struct Msi;

impl CoherencePolicy for Msi {
    fn protocol(&self) -> Protocol {
        Protocol::MSI
    }
    fn write_hit(&self, prev: BlockState) -> Option<BusSignal> {
        (prev != BlockState::Modified).then_some(BusSignal::BusRdX)
    }
    fn snoop(&self, state: BlockState, sig: BusSignal) -> SnoopAction {
        use BlockState::*;
        use BusSignal::*;
        match (state, sig) {
            (Modified, BusRd) => SnoopAction::demote(true),
            (Modified, BusRdX) => SnoopAction::invalidate(true),
            (Shared, BusRdX) => SnoopAction::invalidate(false),
            _ => SnoopAction::ignore(state),
        }
    }
}

#[derive(Debug)]
pub struct MsiBusUpgr;

impl CoherencePolicy for MsiBusUpgr {
    fn protocol(&self) -> Protocol {
        Protocol::MSIBusUpgr
    }
    fn write_hit(&self, prev: BlockState) -> Option<BusSignal> {
        upgrade_on_write(prev)
    }
    fn snoop(&self, state: BlockState, sig: BusSignal) -> SnoopAction {
        use BlockState::*;
        use BusSignal::*;
        match (state, sig) {
            (Modified, BusRd) => SnoopAction::demote(true),
            (Modified, BusRdX) => SnoopAction::invalidate(true),
            (Shared, BusRdX | BusUpgr) => SnoopAction::invalidate(false),
            _ => SnoopAction::ignore(state),
        }
    }
}

#[derive(Debug)]
pub struct Mesi;

impl CoherencePolicy for Mesi {
    fn protocol(&self) -> Protocol {
        Protocol::MESI
    }
    fn write_hit(&self, prev: BlockState) -> Option<BusSignal> {
        upgrade_on_write(prev)
    }
    fn snoop(&self, state: BlockState, sig: BusSignal) -> SnoopAction {
        use BlockState::*;
        use BusSignal::*;
        match (state, sig) {
            (Modified, BusRd) => SnoopAction::demote(true),
            (Modified, BusRdX) => SnoopAction::invalidate(true),
            (Exclusive, BusRd) => SnoopAction::demote(false),
            (Exclusive, BusRdX) => SnoopAction::invalidate(false),
            (Shared, BusRdX | BusUpgr) => SnoopAction::invalidate(false),
            // a BusUpgr can't meet a Modified or Exclusive copy
            _ => SnoopAction::ignore(state),
        }
    }
    fn settles_after_broadcast(&self) -> bool {
        true
    }
}

/// MESI with the snoop filter enabled. Transitions are MESI's; the owning
/// cache records every invalidation in its filter.
#[derive(Debug)]
pub struct MesiFilter;

impl CoherencePolicy for MesiFilter {
    fn protocol(&self) -> Protocol {
        Protocol::MESIFilter
    }
    fn write_hit(&self, prev: BlockState) -> Option<BusSignal> {
        Mesi.write_hit(prev)
    }
    fn snoop(&self, state: BlockState, sig: BusSignal) -> SnoopAction {
        Mesi.snoop(state, sig)
    }
    fn settles_after_broadcast(&self) -> bool {
        true
    }
    fn filters_snoops(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::coherence::common::{BlockState::*, BusSignal::*};

    const ALL: [Protocol; 4] = [Protocol::MSI, Protocol::MSIBusUpgr, Protocol::MESI, Protocol::MESIFilter];

    #[test]
    fn test_policy_lookup() {
        for p in ALL {
            assert_eq!(p.policy().protocol(), p);
        }
        assert!(!Protocol::MSIBusUpgr.policy().settles_after_broadcast());
        assert!(Protocol::MESI.policy().settles_after_broadcast());
        assert!(Protocol::MESIFilter.policy().filters_snoops());
        assert!(!Protocol::MESI.policy().filters_snoops());
    }

    #[test]
    fn test_write_hits() {
        let msi = Protocol::MSI.policy();
        assert_eq!(msi.write_hit(Shared), Some(BusRdX));
        assert_eq!(msi.write_hit(Invalid), Some(BusRdX));
        assert_eq!(msi.write_hit(Modified), None);
        for p in [Protocol::MSIBusUpgr, Protocol::MESI, Protocol::MESIFilter] {
            let policy = p.policy();
            assert_eq!(policy.write_hit(Shared), Some(BusUpgr));
            assert_eq!(policy.write_hit(Invalid), Some(BusRdX));
            assert_eq!(policy.write_hit(Exclusive), None);
            assert_eq!(policy.write_hit(Modified), None);
        }
    }

    #[test]
    fn test_modified_flushes() {
        for p in ALL {
            let policy = p.policy();
            let rd = policy.snoop(Modified, BusRd);
            assert_eq!(rd.next, Shared);
            assert!(rd.flush && rd.intervention && !rd.invalidation);
            let rdx = policy.snoop(Modified, BusRdX);
            assert_eq!(rdx.next, Invalid);
            assert!(rdx.flush && rdx.invalidation && !rdx.intervention);
            assert_eq!(policy.snoop(Modified, BusUpgr), SnoopAction::ignore(Modified));
        }
    }

    #[test]
    fn test_shared_snoops() {
        for p in ALL {
            let policy = p.policy();
            assert_eq!(policy.snoop(Shared, BusRd), SnoopAction::ignore(Shared));
            assert_eq!(policy.snoop(Shared, BusRdX), SnoopAction::invalidate(false));
        }
        assert_eq!(Protocol::MSI.policy().snoop(Shared, BusUpgr), SnoopAction::ignore(Shared));
        for p in [Protocol::MSIBusUpgr, Protocol::MESI, Protocol::MESIFilter] {
            assert_eq!(p.policy().snoop(Shared, BusUpgr), SnoopAction::invalidate(false));
        }
    }

    #[test]
    fn test_exclusive_is_clean() {
        for p in [Protocol::MESI, Protocol::MESIFilter] {
            let rd = p.policy().snoop(Exclusive, BusRd);
            assert_eq!(rd.next, Shared);
            assert!(rd.intervention && !rd.flush);
            let rdx = p.policy().snoop(Exclusive, BusRdX);
            assert_eq!(rdx.next, Invalid);
            assert!(rdx.invalidation && !rdx.flush);
        }
    }

    #[test]
    fn test_invalid_ignores_everything() {
        for p in ALL {
            for sig in [BusRd, BusRdX, BusUpgr] {
                assert_eq!(p.policy().snoop(Invalid, sig), SnoopAction::ignore(Invalid));
            }
        }
    }
}
