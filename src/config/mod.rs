//! Configuration module for the pveha reconciler.
//!
//! Connection parameters come from CLI flags and environment variables; the
//! password fallback is resolved exactly once at startup so nothing past this
//! module ever touches the process environment.

mod connection;

pub use connection::{ConnectionConfig, DEFAULT_PORT, PASSWORD_ENV, load_dotenv};
