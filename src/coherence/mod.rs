mod bus;
mod cache;
mod common;
mod filter;
mod protocol;
mod set_assoc;
mod stats;

pub use bus::Bus;
pub use cache::Cache;
pub use common::*;
pub use filter::SnoopFilter;
pub use protocol::{CoherencePolicy, Mesi, MesiFilter, Msi, MsiBusUpgr};
pub use set_assoc::{CacheLine, SetAssocCache, Victim};
pub use stats::{CacheStats, Report};
