// Canoe - Rust Implementation
// A compact self-describing binary serialization format

#![warn(rust_2018_idioms)]

pub mod meta;

// Re-exports for convenience
pub use meta::{Clock, CoarseClock, ManualClock, MetaPool, MetaPoolConfig, Scope, StructSignature};

/// Canoe error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Null argument: {0}")]
        NullArgument(String),

        #[error("Invalid configuration: {0}")]
        InvalidConfiguration(String),

        #[error("I/O error: {0}")]
        Io(String),
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
