use crate::registers::{CpuidQuery, CpuidRegisters};

/// A source of raw CPUID results.
///
/// The running processor is one implementation (see [crate::host]);
/// recorded dumps are another ([crate::CpuidDump]). Everything above
/// this trait only talks to processors through it.
pub trait Platform {
    /// Check whether the CPUID instruction can be executed at all.
    ///
    /// This is only called once, during [crate::Cpuid::initialize].
    fn probe_instruction_support(&self) -> bool;

    /// Execute CPUID for `query` without any validation.
    ///
    /// # Safety
    ///
    /// [Platform::probe_instruction_support] must have returned `true`
    /// for this platform. On hardware without CPUID, executing the
    /// instruction raises an invalid-opcode exception.
    unsafe fn raw_cpuid(&self, query: CpuidQuery) -> CpuidRegisters;
}
