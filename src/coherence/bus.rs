use log::{debug, info};

use super::cache::Cache;
use super::common::BusSignal;
use crate::commons::{Access, Addr, Op, Protocol, SystemSpec};
use crate::error::{Error, Result};

/// The snooping bus and the caches attached to it.
///
/// Requests are atomic: an access runs its local step, the broadcast to every
/// peer and the requester's settle step before the next access is looked at.
#[derive(Debug)]
pub struct Bus {
    specs: SystemSpec,
    caches: Vec<Cache>,
}

impl Bus {
    pub fn new(specs: SystemSpec) -> Result<Self> {
        specs.validate()?;
        let caches = (0..specs.num_procs)
            .map(|i| Cache::new(i, &specs))
            .collect::<Result<Vec<_>>>()?;
        info!(
            "{} bus with {} caches of {}B, {}-way, {}B blocks",
            specs.protocol, specs.num_procs, specs.cache_size, specs.cache_assoc, specs.block_size
        );
        Ok(Bus { specs, caches })
    }

    pub fn specs(&self) -> &SystemSpec {
        &self.specs
    }
    pub fn protocol(&self) -> Protocol {
        self.specs.protocol
    }
    pub fn caches(&self) -> &[Cache] {
        &self.caches
    }

    /// Carries one access through the whole bus transaction and returns the
    /// signal that was broadcast, if any.
    pub fn handle_access(&mut self, proc: usize, op: Op, addr: Addr) -> Result<Option<BusSignal>> {
        let num_procs = self.caches.len();
        let requester = self
            .caches
            .get_mut(proc)
            .ok_or(Error::UnknownProcessor { proc, num_procs })?;

        let Some(sig) = requester.on_proc_req(op, addr) else {
            return Ok(None);
        };
        debug!("cache {proc}: {sig} {addr:#x}");

        // every peer snoops, in order, even once one of them has supplied
        let mut supplied = false;
        for peer in self.caches.iter_mut().filter(|c| c.id != proc) {
            supplied |= peer.on_bus_sig(sig, addr);
        }

        self.caches[proc].settle(sig, addr, supplied);
        Ok(Some(sig))
    }

    /// Replays a whole trace. Every access is checked before the first one
    /// runs, so a rejected trace leaves the caches untouched.
    pub fn run<I>(&mut self, trace: I) -> Result<()>
    where
        I: IntoIterator<Item = Access>,
    {
        let trace = trace.into_iter().collect::<Vec<_>>();
        let num_procs = self.caches.len();
        if let Some(bad) = trace.iter().find(|a| a.proc >= num_procs) {
            return Err(Error::UnknownProcessor { proc: bad.proc, num_procs });
        }
        for access in &trace {
            self.handle_access(access.proc, access.op, access.addr)?;
        }
        info!("replayed {} accesses", trace.len());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::coherence::common::BlockState;
    use crate::coherence::stats::CacheStats;

    fn bus(protocol: Protocol, num_procs: usize) -> Bus {
        Bus::new(SystemSpec {
            protocol,
            num_procs,
            block_size: 4,
            cache_size: 64,
            cache_assoc: 2,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_config() {
        let specs = SystemSpec { cache_size: 96, block_size: 4, cache_assoc: 8, ..Default::default() };
        assert!(matches!(Bus::new(specs), Err(Error::SetsNotPowerOfTwo(3))));
    }

    #[test]
    fn test_unknown_processor() {
        let mut b = bus(Protocol::MSI, 2);
        let err = b.handle_access(2, Op::Read, Addr(0)).unwrap_err();
        assert!(matches!(err, Error::UnknownProcessor { proc: 2, num_procs: 2 }));
    }

    #[test]
    fn test_run_rejects_trace_before_replaying() {
        let mut b = bus(Protocol::MESI, 2);
        let trace = [Access::read(0, 0x40), Access::write(1, 0x40), Access::read(5, 0x40)];
        let err = b.run(trace).unwrap_err();
        assert!(matches!(err, Error::UnknownProcessor { proc: 5, num_procs: 2 }));
        for cache in b.caches() {
            assert_eq!(*cache.stats(), CacheStats::default());
            assert_eq!(cache.state_of(Addr(0x40)), BlockState::Invalid);
            assert_eq!(cache.lines().clock(), 0);
        }
    }

    #[test]
    fn test_hit_is_not_broadcast() {
        let mut b = bus(Protocol::MESI, 2);
        assert_eq!(b.handle_access(0, Op::Read, Addr(0)).unwrap(), Some(BusSignal::BusRd));
        assert_eq!(b.handle_access(0, Op::Read, Addr(0)).unwrap(), None);
        assert_eq!(b.caches()[1].stats().wasted_snoops, 1);
    }

    #[test]
    fn test_write_invalidates_all_sharers() {
        let mut b = bus(Protocol::MSIBusUpgr, 4);
        for p in 0..4 {
            b.handle_access(p, Op::Read, Addr(0x20)).unwrap();
        }
        assert_eq!(b.handle_access(2, Op::Write, Addr(0x20)).unwrap(), Some(BusSignal::BusUpgr));
        for p in [0, 1, 3] {
            assert_eq!(b.caches()[p].state_of(Addr(0x20)), BlockState::Invalid);
            assert_eq!(b.caches()[p].stats().invalidations, 1);
        }
        assert_eq!(b.caches()[2].state_of(Addr(0x20)), BlockState::Modified);
    }

    #[test]
    fn test_modified_owner_supplies_writer() {
        let mut b = bus(Protocol::MESI, 2);
        b.handle_access(0, Op::Write, Addr(0)).unwrap();
        b.handle_access(1, Op::Write, Addr(0)).unwrap();
        let (c0, c1) = (b.caches()[0].stats(), b.caches()[1].stats());
        assert_eq!(b.caches()[0].state_of(Addr(0)), BlockState::Invalid);
        assert_eq!((c0.flushes, c0.writebacks, c0.invalidations), (1, 1, 1));
        assert_eq!(b.caches()[1].state_of(Addr(0)), BlockState::Modified);
        // BusRdX counted then refunded by the transfer
        assert_eq!((c1.cache_to_cache_transfers, c1.mem_transactions, c1.bus_rdx), (1, 0, 1));
    }
}
