//! Lending protocols the collector tracks when no explicit key list is configured.

/// A program id with a human-readable label for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownProtocol {
    pub name: &'static str,
    pub program_id: &'static str,
}

pub const KNOWN_PROTOCOLS: &[KnownProtocol] = &[
    KnownProtocol {
        name: "kamino",
        program_id: "KLend2g3cP87fffoy8q1mQqGKjrxjC8boSyAYavgmjD",
    },
    KnownProtocol {
        name: "mango",
        program_id: "4MangoMjqJ2firMokCjjGgoK8d4MXcrgL7XJaL3w6fVg",
    },
    KnownProtocol {
        name: "solend",
        program_id: "So1endDq2YkqhipRh3WViPa8hdiSpxWy6z3Z6tMCpAo",
    },
    KnownProtocol {
        name: "marginfi",
        program_id: "MFv2hWf31Z9kbCa1snEPYctwafyhdvnV7FZnsebVacA",
    },
];

/// Label for a program id, falling back to the id itself.
#[must_use]
pub fn protocol_label(program_id: &str) -> &str {
    KNOWN_PROTOCOLS
        .iter()
        .find(|p| p.program_id == program_id)
        .map_or(program_id, |p| p.name)
}
