use log::{debug, trace};

use super::common::{BlockState, BusSignal};
use super::filter::SnoopFilter;
use super::protocol::CoherencePolicy;
use super::set_assoc::SetAssocCache;
use super::stats::CacheStats;
use crate::commons::{Addr, Op, Protocol, SystemSpec};
use crate::error::Result;

/// A processor's private cache together with its coherence controller.
#[derive(Debug)]
pub struct Cache {
    pub id: usize,
    lines: SetAssocCache,
    policy: &'static dyn CoherencePolicy,
    filter: Option<SnoopFilter>,
    stats: CacheStats,
}

impl Cache {
    pub fn new(id: usize, specs: &SystemSpec) -> Result<Self> {
        let policy = specs.protocol.policy();
        let filter = if policy.filters_snoops() {
            Some(SnoopFilter::new(specs.filter, specs.block_size)?)
        } else {
            None
        };
        Ok(Cache {
            id,
            lines: SetAssocCache::new(specs.cache_size, specs.block_size, specs.cache_assoc)?,
            policy,
            filter,
            stats: CacheStats::default(),
        })
    }

    pub fn protocol(&self) -> Protocol {
        self.policy.protocol()
    }
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
    pub fn lines(&self) -> &SetAssocCache {
        &self.lines
    }
    /// Coherence state of the block holding `addr`; Invalid when absent.
    pub fn state_of(&self, addr: Addr) -> BlockState {
        self.lines.lookup(addr).map_or(BlockState::Invalid, |l| l.state)
    }
    pub fn filter(&self) -> Option<&SnoopFilter> {
        self.filter.as_ref()
    }

    fn send_bus_sig(&mut self, sig: BusSignal) -> Option<BusSignal> {
        match sig {
            BusSignal::BusRdX => {
                self.stats.mem_transactions += 1;
                self.stats.bus_rdx += 1;
            }
            BusSignal::BusUpgr => self.stats.bus_upgr += 1,
            BusSignal::BusRd => (),
        }
        Some(sig)
    }

    // inputs

    /// Local step of an access by this cache's processor. Returns the signal
    /// to broadcast, if any.
    pub fn on_proc_req(&mut self, op: Op, addr: Addr) -> Option<BusSignal> {
        self.lines.tick();
        match op {
            Op::Read => self.stats.reads += 1,
            Op::Write => self.stats.writes += 1,
        }
        // the processor is about to hold the block
        if let Some(filter) = self.filter.as_mut() {
            filter.forget(addr);
        }

        let prev = match self.lines.lookup(addr) {
            Some(line) => line.state,
            None => return self.on_miss(op, addr),
        };
        self.lines.touch(addr);
        let sig = match op {
            Op::Write => {
                self.set_state(addr, BlockState::Modified);
                self.policy.write_hit(prev)
            }
            Op::Read if prev == BlockState::Invalid => {
                self.set_state(addr, BlockState::Shared);
                self.stats.mem_transactions += 1;
                Some(BusSignal::BusRd)
            }
            Op::Read => None,
        };
        trace!("cache {}: {:?} hit {:#x} in {:?} -> {:?}", self.id, op, addr, prev, sig);
        sig.and_then(|s| self.send_bus_sig(s))
    }

    fn on_miss(&mut self, op: Op, addr: Addr) -> Option<BusSignal> {
        if let Some(victim) = self.lines.fill(addr) {
            if victim.state == BlockState::Modified {
                self.stats.writeback();
            }
        }
        trace!("cache {}: {:?} miss {:#x}", self.id, op, addr);
        match op {
            Op::Write => {
                self.stats.write_misses += 1;
                self.set_state(addr, BlockState::Modified);
                self.send_bus_sig(BusSignal::BusRdX)
            }
            Op::Read => {
                self.stats.read_misses += 1;
                // already Shared from the fill
                self.stats.mem_transactions += 1;
                self.send_bus_sig(BusSignal::BusRd)
            }
        }
    }

    /// Snoops a signal put on the bus by a peer. Returns true if this cache
    /// owned the block and has to supply it.
    pub fn on_bus_sig(&mut self, sig: BusSignal, addr: Addr) -> bool {
        if let Some(filter) = &self.filter {
            if filter.is_absent(addr) {
                self.stats.filtered_snoops += 1;
                return false;
            }
        }
        let state = match self.lines.lookup(addr) {
            Some(line) => line.state,
            None => {
                self.stats.wasted_snoops += 1;
                self.record_absent(addr);
                return false;
            }
        };

        let action = self.policy.snoop(state, sig);
        if action.next != state {
            debug!("cache {}: {} on {:#x}, {:?} -> {:?}", self.id, sig, addr, state, action.next);
            self.set_state(addr, action.next);
        }
        if action.flush {
            self.stats.flushes += 1;
            self.stats.writeback();
        }
        if action.intervention {
            self.stats.interventions += 1;
        }
        if action.invalidation {
            self.stats.invalidations += 1;
        }
        if action.next == BlockState::Invalid {
            self.record_absent(addr);
        }
        self.stats.useful_snoops += 1;
        state.is_owner()
    }

    /// Resolves the requester's line once every peer has been snooped.
    /// `supplied` is true if some peer provided the block.
    pub fn settle(&mut self, sig: BusSignal, addr: Addr, supplied: bool) {
        if !self.policy.settles_after_broadcast() {
            return;
        }
        let next = match (sig, supplied) {
            (BusSignal::BusRd, true) => BlockState::Shared,
            (BusSignal::BusRd, false) => BlockState::Exclusive,
            (BusSignal::BusRdX, true) => BlockState::Modified,
            _ => return,
        };
        self.set_state(addr, next);
        if supplied {
            // the block came from a peer, not from memory
            self.stats.cache_to_cache_transfers += 1;
            self.stats.mem_transactions -= 1;
        }
        trace!("cache {}: settled {:#x} as {:?}", self.id, addr, next);
    }

    fn set_state(&mut self, addr: Addr, state: BlockState) {
        if let Some(line) = self.lines.lookup_mut(addr) {
            line.state = state;
        }
    }

    fn record_absent(&mut self, addr: Addr) {
        if let Some(filter) = self.filter.as_mut() {
            filter.record_absent(addr);
        }
    }
}
