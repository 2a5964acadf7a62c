//! norseq - a Norpix/StreamPix SEQ sequence file codec written in Rust
//!
//! norseq reads and writes the SEQ binary container used by StreamPix
//! high-speed camera software: one fixed 8192-byte header followed by
//! fixed-size frame blocks, each holding an uncompressed pixel payload, an
//! 8-byte timestamp, and zero padding up to the aligned block size.
//!
//! # Architecture
//!
//! norseq is organized into several key modules:
//!
//! - `format`: sequence container handling (reading, writing, ROI cropping)
//! - `codec`: raw pixel decoding/encoding with row-stride correction
//! - `util`: common utilities and pixel format definitions
//! - `error`: crate-wide error type

pub mod codec;
pub mod error;
pub mod format;
pub mod util;

pub use error::{Error, Result};

/// norseq version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for the norseq library
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Enable verbose logging
    pub verbose: bool,
    /// Enable debug output
    pub debug: bool,
}

/// Initialize the norseq library with the given configuration
pub fn init(config: Config) -> Result<()> {
    if config.verbose || config.debug {
        let level = if config.debug { "debug" } else { "info" };
        tracing_subscriber::fmt()
            .with_env_filter(level)
            .try_init()
            .map_err(|e| Error::invalid_state(format!("Failed to initialize logging: {}", e)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.verbose, false);
        assert_eq!(config.debug, false);
    }

    #[test]
    fn test_init_without_logging() {
        assert!(init(Config::default()).is_ok());
    }
}
