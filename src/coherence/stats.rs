use std::fmt;

use serde::Serialize;

use crate::commons::Protocol;

/// Per-cache counters. They only ever grow, apart from the corrective
/// decrement of `mem_transactions` when a peer supplies a block.
#[derive(Debug, Serialize, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub reads: u64,
    pub read_misses: u64,
    pub writes: u64,
    pub write_misses: u64,
    pub writebacks: u64,
    pub cache_to_cache_transfers: u64,
    pub mem_transactions: u64,
    pub interventions: u64,
    pub invalidations: u64,
    pub flushes: u64,
    pub bus_rdx: u64,
    pub bus_upgr: u64,
    pub useful_snoops: u64,
    pub wasted_snoops: u64,
    pub filtered_snoops: u64,
}

impl CacheStats {
    pub fn accesses(&self) -> u64 {
        self.reads + self.writes
    }
    pub fn misses(&self) -> u64 {
        self.read_misses + self.write_misses
    }
    /// Total miss rate in percent.
    pub fn miss_rate(&self) -> f64 {
        if self.accesses() == 0 {
            return 0.0;
        }
        100.0 * self.misses() as f64 / self.accesses() as f64
    }

    pub(crate) fn writeback(&mut self) {
        self.writebacks += 1;
        self.mem_transactions += 1;
    }

    /// Counters that must not depend on whether snoops are filtered.
    pub fn without_snoop_counts(&self) -> CacheStats {
        CacheStats {
            useful_snoops: 0,
            wasted_snoops: 0,
            filtered_snoops: 0,
            ..*self
        }
    }
}

/// Text report for one cache in the simulator's historical layout.
pub struct Report<'a> {
    pub id: usize,
    pub protocol: Protocol,
    pub stats: &'a CacheStats,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.stats;
        writeln!(f, "============ Simulation results (Cache {}) ============", self.id)?;
        writeln!(f, "01. number of reads: {}", s.reads)?;
        writeln!(f, "02. number of read misses: {}", s.read_misses)?;
        writeln!(f, "03. number of writes: {}", s.writes)?;
        writeln!(f, "04. number of write misses: {}", s.write_misses)?;
        writeln!(f, "05. total miss rate: {:.2}%", s.miss_rate())?;
        writeln!(f, "06. number of writebacks: {}", s.writebacks)?;
        writeln!(f, "07. number of cache-to-cache transfers: {}", s.cache_to_cache_transfers)?;
        writeln!(f, "08. number of memory transactions: {}", s.mem_transactions)?;
        writeln!(f, "09. number of interventions: {}", s.interventions)?;
        writeln!(f, "10. number of invalidations: {}", s.invalidations)?;
        writeln!(f, "11. number of flushes: {}", s.flushes)?;
        writeln!(f, "12. number of BusRdX: {}", s.bus_rdx)?;
        writeln!(f, "13. number of BusUpgr: {}", s.bus_upgr)?;
        if self.protocol == Protocol::MESIFilter {
            writeln!(f, "14. number of useful snoops: {}", s.useful_snoops)?;
            writeln!(f, "15. number of wasted snoops: {}", s.wasted_snoops)?;
            writeln!(f, "16. number of filtered snoops: {}", s.filtered_snoops)?;
        }
        Ok(())
    }
}
