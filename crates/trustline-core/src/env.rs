//! Environment abstraction.
//!
//! The ledger stamps every recorded transaction with wall-clock time. Taking
//! the clock as a parameter keeps that stamp deterministic under test.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time.
pub trait Environment: Send + Sync + 'static {
    /// Seconds since the Unix epoch.
    fn unix_time(&self) -> u64;
}

/// Production environment backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    fn unix_time(&self) -> u64 {
        // A clock set before 1970 stamps records with zero rather than failing
        SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |elapsed| elapsed.as_secs())
    }
}
