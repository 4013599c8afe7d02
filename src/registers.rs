use std::fmt;

/// The input to a `cpuid` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CpuidQuery {
    pub leaf: u32,
    pub subleaf: u32,
}

impl CpuidQuery {
    pub fn new(leaf: u32, subleaf: u32) -> Self {
        Self { leaf, subleaf }
    }
}

/// Simple queries do not require a subleaf.
impl From<u32> for CpuidQuery {
    fn from(leaf: u32) -> Self {
        Self { leaf, subleaf: 0 }
    }
}

/// The result of a `cpuid` invocation.
///
/// Note the field order: `edx` comes before `ecx`. Every positional view
/// of this type ([From] conversions into tuples and arrays) keeps the
/// order `(eax, ebx, edx, ecx)`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CpuidRegisters {
    pub eax: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
}

/// The registers of a [CpuidRegisters].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuidRegister {
    Eax,
    Ebx,
    Edx,
    Ecx,
}

impl CpuidRegisters {
    /// Retrieve a register value from a CPUID result.
    pub fn get(&self, reg: CpuidRegister) -> u32 {
        match reg {
            CpuidRegister::Eax => self.eax,
            CpuidRegister::Ebx => self.ebx,
            CpuidRegister::Edx => self.edx,
            CpuidRegister::Ecx => self.ecx,
        }
    }
}

impl From<CpuidRegisters> for (u32, u32, u32, u32) {
    fn from(regs: CpuidRegisters) -> Self {
        (regs.eax, regs.ebx, regs.edx, regs.ecx)
    }
}

impl From<CpuidRegisters> for [u32; 4] {
    fn from(regs: CpuidRegisters) -> Self {
        [regs.eax, regs.ebx, regs.edx, regs.ecx]
    }
}

impl fmt::Display for CpuidRegisters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "eax={:#010x}, ebx={:#010x}, edx={:#010x}, ecx={:#010x}",
            self.eax, self.ebx, self.edx, self.ecx
        )
    }
}
