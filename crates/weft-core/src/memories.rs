use std::fmt::Display;

/// Tag distinguishing classes of memory associated with a device (e.g., device-local HBM vs. host-pinned memory).
///
/// Kinds are platform-dependent strings (e.g., `"device"`, `"pinned_host"`, `"unpinned_host"`). A `MemoryKind` is
/// carried by every sharding but never interpreted by this crate; it only needs to be equality-comparable so that
/// runtime layers can route shards to the right memory space. The unspecified kind is a valid value and means that
/// the default memory of each device should be used.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MemoryKind {
    kind: Option<String>,
}

impl MemoryKind {
    /// Creates a memory kind from a platform-dependent kind string.
    pub fn new<K: Into<String>>(kind: K) -> Self {
        Self { kind: Some(kind.into()) }
    }

    /// Creates the unspecified memory kind.
    pub fn unspecified() -> Self {
        Self { kind: None }
    }

    /// Kind string of this memory kind, or [`None`] if it is unspecified.
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// Returns `true` iff this memory kind is unspecified.
    pub fn is_unspecified(&self) -> bool {
        self.kind.is_none()
    }
}

impl Display for MemoryKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            Some(kind) => write!(formatter, "{kind}"),
            None => write!(formatter, "(unspecified)"),
        }
    }
}
