use std::io;

/// Total size of every message on the wire. All payload variants must fit.
pub const ENVELOPE_BYTES: usize = 1024;

/// Bytes reserved for the command header at the front of the envelope.
const HEADER_BYTES: usize = 8;

/// Capacity available to a message payload inside one envelope.
pub const PAYLOAD_BYTES: usize = ENVELOPE_BYTES - HEADER_BYTES;

const ENVELOPE_WORDS: usize = ENVELOPE_BYTES / 8;

/// The closed set of commands understood by the dispatcher.
///
/// The zero id is deliberately invalid so that a spurious all-zero buffer
/// is detected as corruption instead of being dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandKind {
    Null = 0,
    AssignBatch = 1,
    UpdateGrid = 2,
    MergeGrid = 3,
    StartSync = 4,
    EndSync = 5,
    Shutdown = 6,
}

impl CommandKind {
    /// Maps a wire id back to a command.
    ///
    /// # Returns
    /// The command, or `InvalidData` for ids outside the known set.
    pub fn from_id(id: u8) -> io::Result<Self> {
        let kind = match id {
            0 => Self::Null,
            1 => Self::AssignBatch,
            2 => Self::UpdateGrid,
            3 => Self::MergeGrid,
            4 => Self::StartSync,
            5 => Self::EndSync,
            6 => Self::Shutdown,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unknown command id {other}"),
                ));
            }
        };
        Ok(kind)
    }
}

/// A fixed-size wire container: one command header followed by a payload
/// region sized to the largest message variant.
///
/// Storage is 8-byte aligned so that numeric payload sections can be
/// reinterpreted with `bytemuck` casts instead of per-element copies.
pub struct Envelope {
    words: Box<[u64; ENVELOPE_WORDS]>,
}

impl Envelope {
    /// Creates an all-zero envelope, which decodes as `CommandKind::Null`.
    pub fn zeroed() -> Self {
        Self {
            words: Box::new([0; ENVELOPE_WORDS]),
        }
    }

    /// Creates a zeroed envelope stamped with `kind`.
    pub fn for_command(kind: CommandKind) -> Self {
        let mut env = Self::zeroed();
        env.set_kind(kind);
        env
    }

    /// The raw wire id in the header, valid or not.
    pub fn kind_id(&self) -> u8 {
        self.bytes()[0]
    }

    /// Decodes the header command.
    pub fn kind(&self) -> io::Result<CommandKind> {
        CommandKind::from_id(self.kind_id())
    }

    pub fn set_kind(&mut self, kind: CommandKind) {
        self.bytes_mut()[0] = kind as u8;
    }

    /// The whole envelope as it travels on the wire.
    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words[..])
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.words[..])
    }

    /// The payload region after the command header.
    pub fn payload(&self) -> &[u8] {
        &self.bytes()[HEADER_BYTES..]
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.bytes_mut()[HEADER_BYTES..]
    }

    /// Zeroes the envelope so a re-armed receive cannot observe stale bytes.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Returns true if every byte, header included, is zero.
    pub fn is_zeroed(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }
}
