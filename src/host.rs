//! The process-wide CPUID instance for the running processor.
//!
//! The first call to any function in this module probes the processor.
//! The probe is serialized and runs exactly once; later calls only read
//! its result.

use std::sync::atomic::{AtomicUsize, Ordering};

use lazy_static::lazy_static;

use crate::cpuid::{Cpuid, ProcessorCapability};
use crate::error::CpuidError;
use crate::hardware::Hardware;
use crate::platform::Platform;
use crate::registers::CpuidRegisters;

/// Number of times the running processor has been probed.
static PROBES: AtomicUsize = AtomicUsize::new(0);

lazy_static! {
    static ref HOST: Cpuid<Hardware> = {
        PROBES.fetch_add(1, Ordering::SeqCst);
        Cpuid::initialize(Hardware)
    };
}

/// The probed running processor.
///
/// This is the only [Cpuid] over real hardware in the process.
pub fn host() -> &'static Cpuid<impl Platform> {
    &*HOST
}

/// Probe the running processor, if that has not happened yet, and
/// return its capability.
pub fn initialize() -> ProcessorCapability {
    HOST.capability()
}

/// Execute CPUID on the running processor.
pub fn execute_cpuid(leaf: u32, subleaf: u32) -> Result<CpuidRegisters, CpuidError> {
    HOST.execute(leaf, subleaf)
}

/// The maximum leaf of the running processor, or [None] without CPUID.
pub fn max_leaf() -> Option<u32> {
    HOST.max_leaf()
}
