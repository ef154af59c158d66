use std::fmt::Display;

/// The identity of a logical process in a cluster.
///
/// Ids are small integers assigned by the scenario, unique within one
/// cluster and stable for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(u64);

impl ProcessId {
    /// Creates a new process ID with the given number.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Gets the underlying ID number.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl From<u64> for ProcessId {
    fn from(n: u64) -> Self {
        Self(n)
    }
}

impl From<ProcessId> for u64 {
    fn from(id: ProcessId) -> Self {
        id.0
    }
}

impl Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pid:{}", self.0)
    }
}
