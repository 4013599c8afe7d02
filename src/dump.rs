//! # Replay AIDA CPUID Dumps
//!
//! Extract CPUID information out of AIDA CPUID dumps and serve it as a
//! [Platform]. This code only uses CPUID values from logical CPU 0. All
//! other groups, including MSR registers, are ignored.
//!
//! See [CpuidDump].

use std::collections::BTreeMap as Map;
use std::{collections::BTreeSet as Set, str::FromStr};

use lazy_static::lazy_static;
use log::trace;
use regex::Regex;

use crate::error::ParseCpuidDumpError;
use crate::platform::Platform;
use crate::registers::{CpuidQuery, CpuidRegisters};

/// The group whose CPUID lines are replayed.
const CPU0_GROUP: &str = "Logical CPU #0";

/// Recorded CPUID results of a single logical CPU.
///
/// Queries that were not recorded return all-zero registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuidDump {
    cpuid: Map<CpuidQuery, CpuidRegisters>,
    supported: bool,
}

impl CpuidDump {
    /// A processor without the CPUID instruction.
    pub fn unsupported() -> Self {
        Self {
            cpuid: Map::new(),
            supported: false,
        }
    }

    pub fn get(&self, query: CpuidQuery) -> Option<&CpuidRegisters> {
        self.cpuid.get(&query)
    }
}

impl FromIterator<(CpuidQuery, CpuidRegisters)> for CpuidDump {
    fn from_iter<I: IntoIterator<Item = (CpuidQuery, CpuidRegisters)>>(iter: I) -> Self {
        Self {
            cpuid: iter.into_iter().collect(),
            supported: true,
        }
    }
}

impl Platform for CpuidDump {
    fn probe_instruction_support(&self) -> bool {
        self.supported
    }

    unsafe fn raw_cpuid(&self, query: CpuidQuery) -> CpuidRegisters {
        self.get(query).copied().unwrap_or_default()
    }
}

/// Low-level representation of a single input line after first
/// parsing round.
#[derive(Debug, Clone, PartialEq)]
enum InputLine {
    /// A header in the input.
    ///
    /// For example, `------[ Logical CPU #0 ]------` would be parsed
    /// as group header with name `Logical CPU #0`.
    GroupHeader { name: String },

    /// A CPUID line in the input.
    Cpuid {
        query: CpuidQuery,
        result: CpuidRegisters,
    },
}

/// Parse a group header line or return [None].
fn try_match_group_header(input: &str) -> Option<InputLine> {
    lazy_static! {
        static ref GROUP_HEADER_RE: Regex =
            Regex::new(r"^------\[ (.+) ]------$").expect("a valid regex");
    }

    let matches = GROUP_HEADER_RE.captures(input)?;

    Some(InputLine::GroupHeader {
        name: matches
            .get(1)
            .expect("capture group populated after match")
            .as_str()
            .to_owned(),
    })
}

/// Parse a hex string to an `u32`.
///
/// **Note:** This function assumes correct input and will panic if
/// the string cannot be parsed.
fn hex_as_u32(input: &str) -> u32 {
    u32::from_str_radix(input, 16).expect("can't parse input after regex matched")
}

/// Parse a CPUID line or return [None].
///
/// AIDA lists the registers as eax-ebx-ecx-edx.
fn try_match_cpuid(input: &str) -> Option<InputLine> {
    lazy_static! {
        static ref CPUID_RE: Regex =
            Regex::new(r"^CPUID ([0-9a-fA-F]{1,8}): ([0-9a-fA-F]{8})-([0-9a-fA-F]{8})-([0-9a-fA-F]{8})-([0-9a-fA-F]{8})(?: \[SL ([0-9a-fA-F]{2})\]|.*)$").expect("a valid regex");
    }

    let matches = CPUID_RE.captures(input)?;

    Some(InputLine::Cpuid {
        query: CpuidQuery {
            leaf: hex_as_u32(matches.get(1).expect("CPUID leaf match").as_str()),
            subleaf: matches.get(6).map(|m| hex_as_u32(m.as_str())).unwrap_or(0),
        },

        result: CpuidRegisters {
            eax: hex_as_u32(matches.get(2).expect("CPUID eax match").as_str()),
            ebx: hex_as_u32(matches.get(3).expect("CPUID ebx match").as_str()),
            ecx: hex_as_u32(matches.get(4).expect("CPUID ecx match").as_str()),
            edx: hex_as_u32(matches.get(5).expect("CPUID edx match").as_str()),
        },
    })
}

impl InputLine {
    fn parse(s: &str) -> Option<Self> {
        try_match_group_header(s).or_else(|| try_match_cpuid(s))
    }
}

impl FromStr for CpuidDump {
    type Err = ParseCpuidDumpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // We first parse each line of the input. Non-matching lines
        // are discarded.
        let parsed_lines = s.lines().filter_map(|line| {
            let parsed = InputLine::parse(line);
            if parsed.is_none() && !line.trim().is_empty() {
                trace!("skipping dump line {:?}", line);
            }
            parsed
        });

        // Fold each line into the group it belongs to. Everything
        // before the first group header belongs to the unnamed group.
        let groups_vec: Vec<(String, Vec<InputLine>)> =
            parsed_lines.fold(vec![("".to_string(), vec![])], |mut acc, line| {
                if let InputLine::GroupHeader { name } = line {
                    acc.push((name, vec![]));
                } else {
                    acc.last_mut().expect("at least one item").1.push(line);
                }

                acc
            });

        {
            let mut seen = Set::new();
            for (name, _) in &groups_vec {
                if !seen.insert(name.as_str()) {
                    return Err(ParseCpuidDumpError::DuplicateGroup(name.clone()));
                }
            }
        }

        let mut groups: Map<String, Vec<InputLine>> = groups_vec.into_iter().collect();

        let cpu0 = groups
            .remove(CPU0_GROUP)
            .ok_or(ParseCpuidDumpError::MissingGroup(CPU0_GROUP))?;

        Ok(cpu0
            .into_iter()
            .filter_map(|line| {
                if let InputLine::Cpuid { query, result } = line {
                    Some((query, result))
                } else {
                    None
                }
            })
            .collect())
    }
}
