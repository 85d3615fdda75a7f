//! robots.txt compliance: parsing and a per-domain policy cache.

pub mod policy;
pub mod policy_cache;

pub use policy::DomainPolicy;
pub use policy_cache::PolicyCache;
