//! # Validated CPUID Queries
//!
//! [Cpuid] pairs a [Platform] with the [ProcessorCapability] probed from
//! it once. After that, every query is checked against the capability
//! before the instruction is executed.
//!
//! ```
//! use rawcpuid::{Cpuid, CpuidDump, CpuidError, CpuidQuery, CpuidRegisters};
//!
//! let dump: CpuidDump = vec![(
//!     CpuidQuery::from(0),
//!     CpuidRegisters { eax: 1, ebx: 0, edx: 0, ecx: 0 },
//! )]
//! .into_iter()
//! .collect();
//!
//! let cpuid = Cpuid::initialize(dump);
//! assert_eq!(cpuid.max_leaf(), Some(1));
//! assert!(cpuid.execute(1, 0).is_ok());
//! assert_eq!(
//!     cpuid.execute(2, 0),
//!     Err(CpuidError::LeafOutOfRange { leaf: 2, max_leaf: 1 })
//! );
//! ```

use log::{debug, warn};

use crate::error::CpuidError;
use crate::platform::Platform;
use crate::registers::{CpuidQuery, CpuidRegisters};

/// What the processor can do, as determined once at initialization.
///
/// There are exactly two states: CPUID is unavailable, or it is
/// available up to a maximum leaf. The maximum leaf is not observable
/// in the first state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorCapability {
    max_leaf: Option<u32>,
}

impl ProcessorCapability {
    /// Probe `platform`: first for the instruction, then for the maximum
    /// leaf. The second step is skipped if the first one fails.
    fn detect<P: Platform>(platform: &P) -> Self {
        if !platform.probe_instruction_support() {
            warn!("CPUID instruction is not supported on this processor");
            return Self { max_leaf: None };
        }

        let max_leaf = capture_max_leaf(platform);
        debug!("CPUID supported, maximum leaf {:#x}", max_leaf);

        Self {
            max_leaf: Some(max_leaf),
        }
    }

    pub fn cpuid_supported(&self) -> bool {
        self.max_leaf.is_some()
    }

    /// The highest leaf the processor advertises, or [None] if CPUID is
    /// not supported.
    pub fn max_leaf(&self) -> Option<u32> {
        self.max_leaf
    }

    /// Check `query` against this capability.
    ///
    /// Checks happen in order: instruction support first, then the leaf
    /// bound. The subleaf is never checked.
    pub fn validate(&self, query: CpuidQuery) -> Result<(), CpuidError> {
        let max_leaf = self.max_leaf.ok_or(CpuidError::UnsupportedInstruction)?;

        if query.leaf > max_leaf {
            return Err(CpuidError::LeafOutOfRange {
                leaf: query.leaf,
                max_leaf,
            });
        }

        Ok(())
    }
}

/// Leaf 0 reports the maximum standard leaf in `eax`.
fn capture_max_leaf<P: Platform>(platform: &P) -> u32 {
    // SAFETY: Only called after the platform reported CPUID support.
    let leaf0 = unsafe { platform.raw_cpuid(CpuidQuery::from(0)) };
    leaf0.eax
}

/// A platform whose CPUID support has been probed.
#[derive(Debug, Clone)]
pub struct Cpuid<P> {
    platform: P,
    capability: ProcessorCapability,
}

impl<P: Platform> Cpuid<P> {
    /// Probe `platform` and keep the outcome for all later queries.
    pub fn initialize(platform: P) -> Self {
        let capability = ProcessorCapability::detect(&platform);

        Self {
            platform,
            capability,
        }
    }

    pub fn capability(&self) -> ProcessorCapability {
        self.capability
    }

    pub fn max_leaf(&self) -> Option<u32> {
        self.capability.max_leaf()
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Execute CPUID with the given leaf and subleaf.
    pub fn execute(&self, leaf: u32, subleaf: u32) -> Result<CpuidRegisters, CpuidError> {
        self.query(CpuidQuery { leaf, subleaf })
    }

    /// Execute CPUID for `query`.
    ///
    /// Fails with [CpuidError::UnsupportedInstruction] if the processor
    /// has no CPUID, and with [CpuidError::LeafOutOfRange] if the leaf is
    /// beyond the maximum leaf.
    pub fn query(&self, query: CpuidQuery) -> Result<CpuidRegisters, CpuidError> {
        self.capability.validate(query)?;

        // SAFETY: validate() only passes if the probe succeeded.
        Ok(unsafe { self.platform.raw_cpuid(query) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::CpuidDump;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and returns `leaf + subleaf` in every register.
    #[derive(Default)]
    struct CountingPlatform {
        supported: bool,
        max_leaf: u32,
        probes: AtomicUsize,
        raw_calls: AtomicUsize,
    }

    impl CountingPlatform {
        fn new(supported: bool, max_leaf: u32) -> Self {
            Self {
                supported,
                max_leaf,
                ..Default::default()
            }
        }
    }

    impl Platform for CountingPlatform {
        fn probe_instruction_support(&self) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.supported
        }

        unsafe fn raw_cpuid(&self, query: CpuidQuery) -> CpuidRegisters {
            assert!(self.supported, "raw CPUID executed on unsupported platform");
            self.raw_calls.fetch_add(1, Ordering::SeqCst);

            if query.leaf == 0 {
                CpuidRegisters {
                    eax: self.max_leaf,
                    ..Default::default()
                }
            } else {
                let v = query.leaf.wrapping_add(query.subleaf);
                CpuidRegisters {
                    eax: v,
                    ebx: v,
                    edx: v,
                    ecx: v,
                }
            }
        }
    }

    fn intel_dump() -> CpuidDump {
        vec![
            (
                CpuidQuery::from(0),
                CpuidRegisters {
                    eax: 0x16,
                    ebx: 0x756e6547,
                    edx: 0x49656e69,
                    ecx: 0x6c65746e,
                },
            ),
            (
                CpuidQuery::from(1),
                CpuidRegisters {
                    eax: 0x000906ED,
                    ebx: 0x00100800,
                    edx: 0xBFEBFBFF,
                    ecx: 0x7FFAFBBF,
                },
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn leaves_up_to_max_leaf_succeed() {
        let cpuid = Cpuid::initialize(CountingPlatform::new(true, 0x16));

        for leaf in 0..=0x16 {
            assert!(cpuid.execute(leaf, 0).is_ok(), "leaf {:#x}", leaf);
        }
    }

    #[test]
    fn leaves_beyond_max_leaf_carry_bound() {
        let cpuid = Cpuid::initialize(CountingPlatform::new(true, 0x16));

        for &leaf in &[0x17, 0x20, 0x8000_0000, u32::MAX] {
            assert_eq!(
                cpuid.execute(leaf, 0),
                Err(CpuidError::LeafOutOfRange {
                    leaf,
                    max_leaf: 0x16
                })
            );
        }

        // Only the leaf 0 capture reached the platform.
        assert_eq!(cpuid.platform().raw_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subleaf_is_passed_through() {
        let cpuid = Cpuid::initialize(CountingPlatform::new(true, 0x16));

        assert_eq!(cpuid.execute(4, 3).map(|r| r.eax), Ok(7));
        assert_eq!(
            cpuid.execute(4, u32::MAX).map(|r| r.ecx),
            Ok(4u32.wrapping_add(u32::MAX))
        );
    }

    #[test]
    fn unsupported_short_circuits_everything() {
        let cpuid = Cpuid::initialize(CountingPlatform::new(false, 0x16));

        assert!(!cpuid.capability().cpuid_supported());
        assert_eq!(cpuid.max_leaf(), None);

        for &(leaf, subleaf) in &[(0, 0), (1, 0), (0x17, 0), (u32::MAX, u32::MAX)] {
            assert_eq!(
                cpuid.execute(leaf, subleaf),
                Err(CpuidError::UnsupportedInstruction)
            );
        }

        assert_eq!(cpuid.platform().raw_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn initialization_probes_once() {
        let cpuid = Cpuid::initialize(CountingPlatform::new(true, 5));
        let before = cpuid.capability();

        for leaf in 0..=5 {
            let _ = cpuid.execute(leaf, 0);
        }

        assert_eq!(cpuid.capability(), before);
        assert_eq!(cpuid.platform().probes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn leaf_zero_eax_is_max_leaf() {
        let cpuid = Cpuid::initialize(intel_dump());

        assert_eq!(cpuid.max_leaf(), Some(0x16));
        assert_eq!(cpuid.execute(0, 0).map(|r| r.eax), Ok(0x16));
    }

    #[test]
    fn genuine_intel_field_order() {
        let cpuid = Cpuid::initialize(intel_dump());
        let leaf0 = cpuid.execute(0, 0).expect("leaf 0 is always valid");

        assert_eq!(leaf0.ebx, 0x756e6547);
        assert_eq!(leaf0.edx, 0x49656e69);
        assert_eq!(leaf0.ecx, 0x6c65746e);
        assert_eq!(
            <(u32, u32, u32, u32)>::from(leaf0),
            (0x16, 0x756e6547, 0x49656e69, 0x6c65746e)
        );
    }

    #[test]
    fn unsupported_dump_never_reports_leaf_errors() {
        let cpuid = Cpuid::initialize(CpuidDump::unsupported());

        assert_eq!(cpuid.execute(0, 0), Err(CpuidError::UnsupportedInstruction));
        assert_eq!(
            cpuid.execute(0x100, 0),
            Err(CpuidError::UnsupportedInstruction)
        );
    }

    #[test]
    fn validation_order_prefers_unsupported() {
        let disabled = ProcessorCapability { max_leaf: None };
        let ready = ProcessorCapability { max_leaf: Some(1) };

        assert_eq!(
            disabled.validate(CpuidQuery::from(2)),
            Err(CpuidError::UnsupportedInstruction)
        );
        assert_eq!(
            ready.validate(CpuidQuery::from(2)),
            Err(CpuidError::LeafOutOfRange {
                leaf: 2,
                max_leaf: 1
            })
        );
        assert_eq!(ready.validate(CpuidQuery::new(1, 99)), Ok(()));
    }
}
