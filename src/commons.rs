use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};

// system specs

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum Protocol {
    MSI,
    MSIBusUpgr,
    MESI,
    MESIFilter,
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "0" | "msi" => Ok(Protocol::MSI),
            "1" | "msi-busupgr" | "msi_busupgr" => Ok(Protocol::MSIBusUpgr),
            "2" | "mesi" => Ok(Protocol::MESI),
            "3" | "mesi-filter" | "mesi_filter" => Ok(Protocol::MESIFilter),
            _ => Err(Error::UnknownProtocol(s.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::MSI => "MSI",
            Protocol::MSIBusUpgr => "MSI BusUpgr",
            Protocol::MESI => "MESI",
            Protocol::MESIFilter => "MESI Filter BusNOP",
        })
    }
}

/// Geometry of the per-cache snoop filter, counted in blocks.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct FilterSpec {
    pub entries: u64,
    pub assoc: u64,
}

impl FilterSpec {
    /// Filter capacity in bytes for blocks of `block_size` bytes.
    pub fn size(&self, block_size: u64) -> Result<u64> {
        self.entries.checked_mul(block_size).ok_or(Error::GeometryOverflow {
            what: "snoop filter size",
            lhs: self.entries,
            rhs: block_size,
        })
    }
}

impl Default for FilterSpec {
    fn default() -> Self {
        // 16 entries, direct mapped
        FilterSpec { entries: 16, assoc: 1 }
    }
}

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct SystemSpec {
    pub protocol: Protocol,
    pub num_procs: usize,
    pub block_size: u64,
    pub cache_size: u64,
    pub cache_assoc: u64,
    pub filter: FilterSpec,
}

impl Default for SystemSpec {
    fn default() -> Self {
        SystemSpec {
            protocol: Protocol::MESI,
            num_procs: 4,
            block_size: 64,     // bytes
            cache_size: 8192,   // bytes
            cache_assoc: 8,     // blocks
            filter: FilterSpec::default(),
        }
    }
}

impl SystemSpec {
    /// Checks every precondition the simulator relies on.
    pub fn validate(&self) -> Result<()> {
        if self.num_procs == 0 {
            return Err(Error::ZeroParameter("number of processors"));
        }
        check_geometry(self.cache_size, self.block_size, self.cache_assoc)?;
        if self.protocol == Protocol::MESIFilter {
            check_geometry(self.filter.size(self.block_size)?, self.block_size, self.filter.assoc)?;
        }
        Ok(())
    }
}

/// Rejects any geometry that does not decompose into a power-of-two number of sets.
pub fn check_geometry(size: u64, block_size: u64, assoc: u64) -> Result<()> {
    if size == 0 {
        return Err(Error::ZeroParameter("cache size"));
    }
    if block_size == 0 {
        return Err(Error::ZeroParameter("block size"));
    }
    if assoc == 0 {
        return Err(Error::ZeroParameter("associativity"));
    }
    if !block_size.is_power_of_two() {
        return Err(Error::BlockSizeNotPowerOfTwo(block_size));
    }
    let set_bytes = block_size.checked_mul(assoc).ok_or(Error::GeometryOverflow {
        what: "set size",
        lhs: block_size,
        rhs: assoc,
    })?;
    if size % set_bytes != 0 {
        return Err(Error::UnevenGeometry { size, block_size, assoc });
    }
    let sets = size / set_bytes;
    if !sets.is_power_of_two() {
        return Err(Error::SetsNotPowerOfTwo(sets));
    }
    Ok(())
}

// addresses and accesses

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Addr(pub u64);

impl fmt::LowerHex for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Op {
    Read,
    Write,
}

impl Op {
    /// Anything but the write marker is a read.
    pub fn from_code(code: char) -> Op {
        match code {
            'w' => Op::Write,
            _ => Op::Read,
        }
    }
}

/// One trace event.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Access {
    pub proc: usize,
    pub op: Op,
    pub addr: Addr,
}

impl Access {
    pub fn read(proc: usize, addr: u64) -> Self {
        Access { proc, op: Op::Read, addr: Addr(addr) }
    }
    pub fn write(proc: usize, addr: u64) -> Self {
        Access { proc, op: Op::Write, addr: Addr(addr) }
    }
}
