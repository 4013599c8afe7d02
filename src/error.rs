use thiserror::Error;

/// Why a CPUID query was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpuidError {
    /// The processor does not implement the CPUID instruction. This
    /// cannot change during the lifetime of the process.
    #[error("CPUID not supported")]
    UnsupportedInstruction,

    /// The requested leaf is greater than the maximum leaf the processor
    /// advertises in leaf 0.
    #[error("leaf {leaf:#x} is greater than CPUID_MAXLEAF ({max_leaf:#x})")]
    LeafOutOfRange { leaf: u32, max_leaf: u32 },
}

impl CpuidError {
    /// Whether the same call can succeed with a different leaf.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CpuidError::LeafOutOfRange { .. })
    }
}

/// Failure to parse an AIDA CPUID dump.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCpuidDumpError {
    #[error("duplicate group `{0}` in CPUID dump")]
    DuplicateGroup(String),

    #[error("CPUID dump has no `{0}` group")]
    MissingGroup(&'static str),
}
