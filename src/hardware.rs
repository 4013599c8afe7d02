//! # CPUID on the Running Processor
//!
//! [Hardware] executes the flags probe and the CPUID instruction
//! directly. Only compiled for 32-bit and 64-bit x86.

use std::arch::asm;

#[cfg(target_arch = "x86")]
use std::arch::x86::__cpuid_count;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::__cpuid_count;

use crate::platform::Platform;
use crate::registers::{CpuidQuery, CpuidRegisters};

/// The ID flag, bit 21 of (R/E)FLAGS.
const FLAGS_ID: u64 = 1 << 21;

/// The processor this code runs on.
///
/// Only [crate::host] constructs this, so the probe runs once per
/// process.
#[derive(Debug)]
pub(crate) struct Hardware;

/// Checks whether (R/E)FLAGS.ID is writable.
///
/// The original flags are pushed first and popped last, so the flags
/// register is left as it was found.
#[cfg(target_arch = "x86_64")]
fn flags_id_writable() -> bool {
    let write_diff: u64;

    // SAFETY: The block only pushes and pops the flags register on the
    // stack and leaves both stack pointer and flags unchanged.
    unsafe {
        asm!(
            "pushfq",
            "pushfq",
            "xor qword ptr [rsp], 0x200000",
            "popfq",
            "pushfq",
            "pop {diff}",
            "xor {diff}, [rsp]",
            "popfq",
            diff = lateout(reg) write_diff,
            options(preserves_flags),
        );
    }

    write_diff == FLAGS_ID
}

#[cfg(target_arch = "x86")]
fn flags_id_writable() -> bool {
    let write_diff: u32;

    // SAFETY: See the x86_64 variant.
    unsafe {
        asm!(
            "pushfd",
            "pushfd",
            "xor dword ptr [esp], 0x200000",
            "popfd",
            "pushfd",
            "pop {diff}",
            "xor {diff}, [esp]",
            "popfd",
            diff = lateout(reg) write_diff,
            options(preserves_flags),
        );
    }

    u64::from(write_diff) == FLAGS_ID
}

impl Platform for Hardware {
    fn probe_instruction_support(&self) -> bool {
        flags_id_writable()
    }

    unsafe fn raw_cpuid(&self, query: CpuidQuery) -> CpuidRegisters {
        let result = __cpuid_count(query.leaf, query.subleaf);

        CpuidRegisters {
            eax: result.eax,
            ebx: result.ebx,
            edx: result.edx,
            ecx: result.ecx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Interrupt enable and direction flags.
    #[cfg(target_arch = "x86_64")]
    const FLAGS_IF: u64 = 1 << 9;
    #[cfg(target_arch = "x86_64")]
    const FLAGS_DF: u64 = 1 << 10;

    #[cfg(target_arch = "x86_64")]
    fn read_flags() -> u64 {
        let flags: u64;

        // SAFETY: Pushes and pops RFLAGS, nothing else.
        unsafe {
            asm!("pushfq", "pop {}", out(reg) flags, options(preserves_flags));
        }

        flags
    }

    #[test]
    #[cfg(target_arch = "x86_64")]
    fn probe_restores_id_if_and_df_flags() {
        let mask = FLAGS_ID | FLAGS_IF | FLAGS_DF;

        for _ in 0..2 {
            let before = read_flags();
            assert!(Hardware.probe_instruction_support());
            let after = read_flags();

            assert_eq!(
                before & mask,
                after & mask,
                "flags before {:#x}, after {:#x}",
                before,
                after
            );
        }
    }

    #[test]
    fn leaf_zero_reports_a_vendor() {
        assert!(Hardware.probe_instruction_support());

        // SAFETY: Checked above.
        let leaf0 = unsafe { Hardware.raw_cpuid(0.into()) };
        let vendor: Vec<u8> = [leaf0.ebx, leaf0.edx, leaf0.ecx]
            .iter()
            .flat_map(|r| r.to_le_bytes())
            .collect();

        assert_eq!(vendor.len(), 12);
        assert!(vendor.iter().all(|b| b.is_ascii()));
    }
}
