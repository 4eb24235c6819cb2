// src/services/guard.rs
use std::fmt;
use log::{error, info};

/// Batches smaller than this look like a failed or partial fetch.
pub const MIN_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct GuardVeto {
    pub batch_size: usize,
    pub minimum: usize,
}

impl fmt::Display for GuardVeto {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "batch of {} products is below the minimum of {}; keeping the existing catalog",
            self.batch_size, self.minimum
        )
    }
}

impl std::error::Error for GuardVeto {}

/// Vetoes the write when the batch is implausibly small. The provider
/// sometimes answers an outage with a valid but empty payload, which would
/// otherwise shrink the catalog to its curated records.
pub fn check_batch(batch_size: usize, minimum: usize) -> Result<(), GuardVeto> {
    if batch_size < minimum {
        let veto = GuardVeto { batch_size, minimum };
        error!("Integrity guard veto: {}", veto);
        return Err(veto);
    }
    info!("Integrity guard passed: {} products (minimum {})", batch_size, minimum);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive() {
        assert_eq!(
            check_batch(9, MIN_BATCH_SIZE),
            Err(GuardVeto { batch_size: 9, minimum: 10 })
        );
        assert!(check_batch(10, MIN_BATCH_SIZE).is_ok());
        assert!(check_batch(0, MIN_BATCH_SIZE).is_err());
    }

    #[test]
    fn custom_minimum() {
        assert!(check_batch(2, 3).is_err());
        assert!(check_batch(3, 3).is_ok());
    }
}
