//! # Raw CPUID Queries
//!
//! Execute the x86 CPUID instruction safely. Before the first query the
//! processor is probed once: whether CPUID exists at all (the
//! EFLAGS.ID bit is writable), and which leaf is the highest it
//! advertises. Queries are then checked against that probe and return
//! the raw registers. No leaf is interpreted.
//!
//! For the running processor, use the free functions:
//!
//! ```no_run
//! # #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
//! # fn main() -> Result<(), rawcpuid::CpuidError> {
//! let regs = rawcpuid::execute_cpuid(0, 0)?;
//! let (eax, ebx, edx, ecx): (u32, u32, u32, u32) = regs.into();
//! assert_eq!(Some(eax), rawcpuid::max_leaf());
//! # let _ = (ebx, edx, ecx);
//! # Ok(())
//! # }
//! # #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
//! # fn main() {}
//! ```
//!
//! Other processors, such as recorded AIDA dumps, are wrapped in
//! [Cpuid] explicitly.

mod cpuid;
mod dump;
mod error;
mod platform;
mod registers;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod hardware;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod host;

pub use crate::cpuid::{Cpuid, ProcessorCapability};
pub use crate::dump::CpuidDump;
pub use crate::error::{CpuidError, ParseCpuidDumpError};
pub use crate::platform::Platform;
pub use crate::registers::{CpuidQuery, CpuidRegister, CpuidRegisters};

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use crate::host::{execute_cpuid, host, initialize, max_leaf};
