//! Core type definitions using newtype patterns for type safety.
//!
//! Invalid ports and unresolved targets cannot reach the scanning engine.

mod port;
mod scan_id;
mod target;

pub use port::{Port, PortError, PortRange, PortSet};
pub use scan_id::SessionId;
pub use target::{DnsResolver, Resolver, Target, TargetError, TargetSpec};
