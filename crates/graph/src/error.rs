use thiserror::Error;

use crate::ids::{ConnectionId, OperationId, ProxyId, SocketRef};

/// Structural misuse of the operation arena. These indicate a bug in a
/// graph pass, not bad user input.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("operation {0} does not exist")]
    UnknownOperation(OperationId),

    #[error("input socket {0} does not exist")]
    UnknownInput(SocketRef),

    #[error("output socket {0} does not exist")]
    UnknownOutput(SocketRef),

    #[error("input socket {0} is already connected")]
    InputAlreadyConnected(SocketRef),

    #[error("connection {0} does not exist")]
    UnknownConnection(ConnectionId),

    #[error("memory proxy {0} does not exist")]
    UnknownProxy(ProxyId),

    #[error("failed to read node tree: {0}")]
    TreeIo(#[from] std::io::Error),

    #[error("failed to parse node tree: {0}")]
    TreeParse(#[from] toml::de::Error),

    #[error("invalid node tree: {0}")]
    Tree(String),
}
