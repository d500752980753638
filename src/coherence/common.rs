use std::fmt;

#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockState {
    #[default]
    Invalid,
    Shared,
    Exclusive,
    Modified,
}

impl BlockState {
    pub fn is_valid(&self) -> bool {
        *self != BlockState::Invalid
    }
    /// Owners of a block must intervene when it is requested.
    pub fn is_owner(&self) -> bool {
        matches!(self, BlockState::Modified | BlockState::Exclusive)
    }
}

// the bus signals that caches can receive as defined by the protocol
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BusSignal {
    BusRd,
    BusRdX,
    BusUpgr,
}

impl fmt::Display for BusSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a snooping cache has to do when it observes a bus signal.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SnoopAction {
    pub next: BlockState,
    pub flush: bool,
    pub intervention: bool,
    pub invalidation: bool,
}

impl SnoopAction {
    /// Observe the signal without reacting.
    pub fn ignore(state: BlockState) -> Self {
        SnoopAction { next: state, flush: false, intervention: false, invalidation: false }
    }
    /// Demote to Shared and supply the block. Dirty blocks are flushed.
    pub fn demote(dirty: bool) -> Self {
        SnoopAction { next: BlockState::Shared, flush: dirty, intervention: true, invalidation: false }
    }
    /// Drop the block. Dirty blocks are flushed on the way out.
    pub fn invalidate(dirty: bool) -> Self {
        SnoopAction { next: BlockState::Invalid, flush: dirty, intervention: false, invalidation: true }
    }
}
