//! HTTP server process management: socket ownership, connection tracking,
//! resource monitoring, graceful shutdown.

mod connection;
mod monitor;
mod process;

pub use connection::{ConnectionCounter, ConnectionTracking, TrackedService};
pub use monitor::{
    MemorySampler, MemoryUsage, MonitorReport, MonitorWarning, ProcMemorySampler, ResourceMonitor,
};
pub use process::{HttpServerProcess, ServerOptions};
