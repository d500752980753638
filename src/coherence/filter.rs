use log::trace;

use super::set_assoc::SetAssocCache;
use crate::commons::{Addr, FilterSpec};
use crate::error::Result;

/// Remembers addresses that are known to be absent from the owning cache so
/// that snoops for them can skip the tag array.
///
/// An entry is only ever a hint: it is dropped as soon as the owner requests
/// the address itself, and losing an entry to replacement merely costs a
/// full snoop.
#[derive(Clone, Debug)]
pub struct SnoopFilter {
    entries: SetAssocCache,
}

impl SnoopFilter {
    pub fn new(spec: FilterSpec, block_size: u64) -> Result<Self> {
        let entries = SetAssocCache::new(spec.size(block_size)?, block_size, spec.assoc)?;
        Ok(SnoopFilter { entries })
    }

    /// True if `addr` is recorded as absent from the owner.
    pub fn is_absent(&self, addr: Addr) -> bool {
        self.entries.contains(addr)
    }

    /// Records `addr` as absent from the owner.
    pub fn record_absent(&mut self, addr: Addr) {
        self.entries.tick();
        if self.entries.contains(addr) {
            self.entries.touch(addr);
        } else {
            trace!("filter: {:#x} absent", addr);
            self.entries.fill(addr);
        }
    }

    /// Drops the entry for `addr`; the owner is about to hold it.
    pub fn forget(&mut self, addr: Addr) {
        self.entries.invalidate(addr);
    }
}
