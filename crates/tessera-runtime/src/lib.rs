//! Tessera Runtime - configuration, logging and boot sequence.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, `TesseraConfig`)
//! - Logging setup (`LoggingBuilder`)
//! - The boot sequence (`TesseraRuntime`): registry assembly, then
//!   initializers at `BeforeStartup` and `AfterStartup`
//!
//! ```ignore
//! use tessera_runtime::TesseraRuntime;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = TesseraRuntime::builder().build()?;
//!     for failure in runtime.boot() {
//!         eprintln!("{failure}");
//!     }
//!     // ... start the host ...
//!     runtime.after_startup();
//!     println!("{}", runtime.stats());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, TesseraConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{InitializerFailure, RegistryStats, RuntimeBuilder, TesseraRuntime};

// Re-export tracing for use by plugin crates
pub use tracing;

/// Logging macros for plugin code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
