//! A trace-driven simulator of private caches kept coherent by a snooping bus
//! (MSI, MSI with BusUpgr, MESI, MESI with a snoop filter).

pub mod coherence;
pub mod commons;
pub mod error;
pub mod utils;

pub use coherence::{BlockState, Bus, BusSignal, Cache, CacheStats};
pub use commons::{Access, Addr, FilterSpec, Op, Protocol, SystemSpec};
pub use error::{Error, Result};
