use serde::Serialize;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub struct $name(pub(crate) usize);

        impl $name {
            pub fn new(index: usize) -> Self {
                Self(index)
            }

            pub fn index(self) -> usize {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Stable index of an operation in the arena.
    OperationId,
    "op#"
);
arena_id!(ConnectionId, "conn#");
arena_id!(ProxyId, "proxy#");
arena_id!(
    /// Index of an execution group; stored on proxies to name their executor.
    GroupId,
    "group#"
);

/// One socket of one operation. Whether it names an input or an output is
/// given by context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SocketRef {
    pub operation: OperationId,
    pub index: usize,
}

impl SocketRef {
    pub fn new(operation: OperationId, index: usize) -> Self {
        Self { operation, index }
    }
}

impl std::fmt::Display for SocketRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.operation, self.index)
    }
}
