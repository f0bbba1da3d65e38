//! The beads daemon: per-workspace RPC server, event bus, write
//! serialization, debounced auto-flush, and the decision wait protocol.

pub mod bus;
pub mod flush;
pub mod handlers;
pub mod lifecycle;
pub mod protocol;
pub mod server;
pub mod wait;

pub use bus::{subjects, BusEvent, EventBus};
pub use handlers::Handler;
pub use protocol::{Request, Response};
pub use server::{run_daemon, DaemonOptions};
pub use wait::{stop_check, wait_for_decision, StopCheckOutcome, WaitOptions};
