use log::trace;

use super::common::BlockState;
use crate::commons::{check_geometry, Addr};
use crate::error::Result;

// tag array

#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub struct CacheLine {
    pub tag: u64,
    pub state: BlockState,
    pub last_used: u64,
}

impl CacheLine {
    pub fn is_valid(&self) -> bool {
        self.state.is_valid()
    }
    fn clear(&mut self) {
        self.tag = 0;
        self.state = BlockState::Invalid;
    }
}

/// A line pushed out of the cache by a fill.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Victim {
    pub tag: u64,
    pub state: BlockState,
}

/// A set-associative tag array with LRU replacement.
///
/// Lines live in one contiguous buffer, `assoc` ways per set. The recency clock
/// belongs to the array and is only advanced through [`SetAssocCache::tick`].
#[derive(Clone, Debug)]
pub struct SetAssocCache {
    lines: Vec<CacheLine>,
    assoc: usize,
    set_mask: u64,
    block_bits: u32,
    clock: u64,
}

impl SetAssocCache {
    pub fn new(size: u64, block_size: u64, assoc: u64) -> Result<Self> {
        check_geometry(size, block_size, assoc)?;
        let sets = size / (block_size * assoc);
        Ok(SetAssocCache {
            lines: vec![CacheLine::default(); (sets * assoc) as usize],
            assoc: assoc as usize,
            set_mask: sets - 1,
            block_bits: block_size.trailing_zeros(),
            clock: 0,
        })
    }

    pub fn num_sets(&self) -> usize {
        self.lines.len() / self.assoc
    }
    pub fn clock(&self) -> u64 {
        self.clock
    }
    /// Advances the recency clock by one access.
    pub fn tick(&mut self) {
        self.clock += 1;
    }

    // address decomposition
    pub fn tag_of(&self, addr: Addr) -> u64 {
        addr.0 >> self.block_bits
    }
    pub fn set_of(&self, addr: Addr) -> usize {
        (self.tag_of(addr) & self.set_mask) as usize
    }

    pub fn set(&self, index: usize) -> &[CacheLine] {
        &self.lines[index * self.assoc..(index + 1) * self.assoc]
    }
    fn set_mut(&mut self, index: usize) -> &mut [CacheLine] {
        let assoc = self.assoc;
        &mut self.lines[index * assoc..(index + 1) * assoc]
    }

    fn find_way(&self, addr: Addr) -> Option<usize> {
        let tag = self.tag_of(addr);
        self.set(self.set_of(addr))
            .iter()
            .position(|l| l.is_valid() && l.tag == tag)
    }

    pub fn lookup(&self, addr: Addr) -> Option<&CacheLine> {
        let way = self.find_way(addr)?;
        Some(&self.set(self.set_of(addr))[way])
    }
    pub fn lookup_mut(&mut self, addr: Addr) -> Option<&mut CacheLine> {
        let way = self.find_way(addr)?;
        let index = self.set_of(addr);
        Some(&mut self.set_mut(index)[way])
    }
    pub fn contains(&self, addr: Addr) -> bool {
        self.find_way(addr).is_some()
    }

    /// Marks the block holding `addr` as most recently used.
    pub fn touch(&mut self, addr: Addr) {
        let clock = self.clock;
        if let Some(line) = self.lookup_mut(addr) {
            line.last_used = clock;
        }
    }

    /// Picks the way `addr` would be filled into: the first invalid way, or
    /// else the least recently used one (lowest way on ties). The chosen way
    /// is stamped as most recently used right away.
    pub fn choose_victim(&mut self, addr: Addr) -> &mut CacheLine {
        let clock = self.clock;
        let index = self.set_of(addr);
        let set = self.set_mut(index);
        let way = match set.iter().position(|l| !l.is_valid()) {
            Some(way) => way,
            None => set
                .iter()
                .enumerate()
                .min_by_key(|(_, l)| l.last_used)
                .map(|(i, _)| i)
                .expect("cache set has no ways"),
        };
        let line = &mut set[way];
        line.last_used = clock;
        line
    }

    /// Brings the block of `addr` in as Shared, returning whatever valid line
    /// it displaced. Callers fix up the state afterwards.
    pub fn fill(&mut self, addr: Addr) -> Option<Victim> {
        let tag = self.tag_of(addr);
        let line = self.choose_victim(addr);
        let victim = line.is_valid().then(|| Victim { tag: line.tag, state: line.state });
        line.tag = tag;
        line.state = BlockState::Shared;
        if let Some(v) = victim {
            trace!("evicted tag {:#x} ({:?}) for tag {:#x}", v.tag, v.state, tag);
        }
        victim
    }

    pub fn invalidate(&mut self, addr: Addr) {
        if let Some(line) = self.lookup_mut(addr) {
            line.clear();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // 2 sets x 2 ways of 4 byte blocks
    fn small() -> SetAssocCache {
        SetAssocCache::new(16, 4, 2).unwrap()
    }

    #[test]
    fn test_decomposition() {
        let c = SetAssocCache::new(4096, 32, 2).unwrap();
        assert_eq!(c.num_sets(), 64);
        assert_eq!(c.tag_of(Addr(0x1234)), 0x1234 >> 5);
        assert_eq!(c.set_of(Addr(0x1234)), (0x1234 >> 5) & 63);
        // same block, same line
        assert_eq!(c.tag_of(Addr(0x40)), c.tag_of(Addr(0x5f)));
    }

    #[test]
    fn test_fill_is_provisionally_shared() {
        let mut c = small();
        c.tick();
        assert!(c.lookup(Addr(0)).is_none());
        assert_eq!(c.fill(Addr(0)), None);
        let line = c.lookup(Addr(3)).unwrap();
        assert_eq!(line.state, BlockState::Shared);
        assert_eq!(line.last_used, 1);
    }

    #[test]
    fn test_lru_eviction() {
        let mut c = small();
        // blocks 0, 2 and 4 all map to set 0
        for a in [0u64, 8] {
            c.tick();
            c.fill(Addr(a));
        }
        c.tick();
        c.touch(Addr(0));
        c.tick();
        let victim = c.fill(Addr(16)).unwrap();
        assert_eq!(victim.tag, 2);
        assert!(c.contains(Addr(0)));
        assert!(!c.contains(Addr(8)));
    }

    #[test]
    fn test_lru_ties_go_to_lowest_way() {
        // the clock never moves, so every stamp is equal
        let mut c = small();
        c.fill(Addr(0));
        c.fill(Addr(8));
        let victim = c.fill(Addr(16)).unwrap();
        assert_eq!(victim.tag, 0);
        assert_eq!(c.set(0)[0].tag, 4);
        assert_eq!(c.set(0)[1].tag, 2);
    }

    #[test]
    fn test_invalid_way_preferred() {
        let mut c = small();
        for a in [0u64, 8] {
            c.tick();
            c.fill(Addr(a));
        }
        c.invalidate(Addr(8));
        assert_eq!(c.set(0)[1].state, BlockState::Invalid);
        assert_eq!(c.set(0)[1].tag, 0);
        c.tick();
        assert_eq!(c.fill(Addr(16)), None);
        assert!(c.contains(Addr(0)));
        assert!(c.contains(Addr(16)));
    }

    #[test]
    fn test_invalidate_absent_is_noop() {
        let mut c = small();
        c.fill(Addr(0));
        c.invalidate(Addr(4));
        assert!(c.contains(Addr(0)));
    }
}
