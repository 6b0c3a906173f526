//! Fault injection for simulated stores
//!
//! TigerStyle: faults are drawn from a seeded RNG so a failing run can be
//! replayed with the same seed.

use std::sync::{Mutex, PoisonError};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Kinds of faults the simulated stores can inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultType {
    /// Content document read fails
    StoreReadFail,
    /// Content document insert/update/delete fails
    StoreWriteFail,
    /// Pre-signed upload target cannot be created
    MediaSignFail,
    /// Transfer of the upload body fails mid-stream
    MediaUploadFail,
    /// Object listing or deletion fails
    MediaDeleteFail,
}

/// One fault and the probability it fires on each eligible operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaultConfig {
    /// Which operation fails
    pub fault_type: FaultType,
    /// Probability in `[0.0, 1.0]`
    pub probability: f64,
}

impl FaultConfig {
    /// Create a fault configuration.
    ///
    /// # Panics
    /// Panics if probability is outside `[0.0, 1.0]`.
    #[must_use]
    pub fn new(fault_type: FaultType, probability: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&probability),
            "probability must be in [0, 1], got {probability}"
        );
        Self {
            fault_type,
            probability,
        }
    }

    /// A fault that fires on every eligible operation.
    #[must_use]
    pub fn always(fault_type: FaultType) -> Self {
        Self::new(fault_type, 1.0)
    }
}

/// Decides, deterministically per seed, whether an operation fails.
#[derive(Debug)]
pub struct FaultInjector {
    seed: u64,
    faults: Vec<FaultConfig>,
    rng: Mutex<ChaCha8Rng>,
}

impl FaultInjector {
    /// An injector that never fires.
    #[must_use]
    pub fn none() -> Self {
        FaultInjectorBuilder::new(0).build()
    }

    /// Start building an injector with the given seed.
    #[must_use]
    pub fn builder(seed: u64) -> FaultInjectorBuilder {
        FaultInjectorBuilder::new(seed)
    }

    /// Seed used by this injector (log it to reproduce a run).
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Roll for the given fault type.
    pub fn should_inject(&self, fault_type: FaultType) -> bool {
        let Some(config) = self.faults.iter().find(|f| f.fault_type == fault_type) else {
            return false;
        };
        if config.probability >= 1.0 {
            return true;
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_bool(config.probability)
    }
}

impl Default for FaultInjector {
    fn default() -> Self {
        Self::none()
    }
}

/// Builder for [`FaultInjector`].
#[derive(Debug)]
pub struct FaultInjectorBuilder {
    seed: u64,
    faults: Vec<FaultConfig>,
}

impl FaultInjectorBuilder {
    /// Create a builder.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            faults: Vec::new(),
        }
    }

    /// Add a fault; a later config for the same type replaces the earlier one.
    #[must_use]
    pub fn with_fault(mut self, config: FaultConfig) -> Self {
        self.faults.retain(|f| f.fault_type != config.fault_type);
        self.faults.push(config);
        self
    }

    /// Build the injector.
    #[must_use]
    pub fn build(self) -> FaultInjector {
        FaultInjector {
            seed: self.seed,
            faults: self.faults,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(self.seed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_never_fires() {
        let injector = FaultInjector::none();
        for _ in 0..100 {
            assert!(!injector.should_inject(FaultType::StoreReadFail));
        }
    }

    #[test]
    fn test_always_fires() {
        let injector = FaultInjector::builder(7)
            .with_fault(FaultConfig::always(FaultType::StoreWriteFail))
            .build();
        assert!(injector.should_inject(FaultType::StoreWriteFail));
        assert!(!injector.should_inject(FaultType::StoreReadFail));
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let roll = |seed| {
            let injector = FaultInjector::builder(seed)
                .with_fault(FaultConfig::new(FaultType::MediaUploadFail, 0.5))
                .build();
            (0..32)
                .map(|_| injector.should_inject(FaultType::MediaUploadFail))
                .collect::<Vec<_>>()
        };
        assert_eq!(roll(42), roll(42));
    }

    #[test]
    #[should_panic(expected = "probability")]
    fn test_probability_out_of_range() {
        let _ = FaultConfig::new(FaultType::StoreReadFail, 1.5);
    }
}
