//! Dense indices into the topology arenas. Every link between entities is one of these.

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u16);

        impl $name {
            pub const fn new(index: usize) -> Self { $name(index as u16) }

            pub const fn index(self) -> usize { self.0 as usize }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

arena_id!(
    /// A clock gate node.
    ClockId
);
arena_id!(
    /// A register-addressable cluster of clock gates.
    GroupId
);
arena_id!(
    /// A phase-locked loop.
    PllId
);
arena_id!(
    /// A switchable power island (MTCMOS).
    DomainId
);
arena_id!(
    /// A clock source multiplexer.
    MuxId
);

/// Opaque handle returned when a resource monitor is registered.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MonitorToken(pub u32);
