//! Process record persistence and identity resolution.
//!
//! The record store is the single durable source of truth for which PID the
//! supervisor believes to be the stream; the identity resolver checks that
//! belief against the processes actually present on the system.

pub mod identity;
pub mod record;

pub use identity::{IdentityStatus, ProcessProbe, SysinfoProbe};
pub use record::{RecordError, RecordStore};
