use std::{error::Error, fmt, io};

/// The node module's result type.
pub type Result<T> = std::result::Result<T, NodeErr>;

/// Protocol and transport failures. All of these are fatal to the process:
/// the pool is either fully healthy or restarted as a unit.
#[derive(Debug)]
pub enum NodeErr {
    Io(io::Error),
    Transport(String),
    GridVersionMismatch {
        class_index: u64,
        local: u64,
        remote: u64,
    },
    UnknownCommand(u8),
    NullCommand,
    DimensionMismatch {
        expected: usize,
        got: usize,
    },
    Learner(String),
}

impl fmt::Display for NodeErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeErr::Io(e) => write!(f, "io error: {e}"),
            NodeErr::Transport(detail) => write!(f, "transport error: {detail}"),
            NodeErr::GridVersionMismatch {
                class_index,
                local,
                remote,
            } => write!(
                f,
                "merge for class {class_index} carries grid version {remote}, local is {local}"
            ),
            NodeErr::UnknownCommand(id) => write!(f, "unknown command id {id}"),
            NodeErr::NullCommand => write!(f, "incoming command has the null command id"),
            NodeErr::DimensionMismatch { expected, got } => {
                write!(f, "grid point has {got} dimensions, expected {expected}")
            }
            NodeErr::Learner(detail) => write!(f, "learner error: {detail}"),
        }
    }
}

impl Error for NodeErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NodeErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for NodeErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<NodeErr> for io::Error {
    fn from(value: NodeErr) -> Self {
        match value {
            NodeErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
