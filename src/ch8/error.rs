use super::rom::RomKind;

use thiserror::Error;

pub type C8Result<T> = Result<T, C8Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum C8Error {
    #[error("ROM too big for variant: {size}B exceeds the {max}B available to {kind}")]
    RomTooBig {
        size: usize,
        max: usize,
        kind: RomKind,
    },

    #[error("ROM size ({0}B) is below minimum size (2B)")]
    RomTooSmall(usize),

    #[error("Invalid instruction {opcode:04X} at {address:#06X} for {kind}")]
    InvalidInstruction {
        address: u32,
        opcode: u32,
        kind: RomKind,
    },

    #[error("Stack overflow at {address:#06X}: call depth exceeds {depth}")]
    StackOverflow { address: u32, depth: usize },

    #[error("Could not return from subroutine at {address:#06X} because stack is empty")]
    StackUnderflow { address: u32 },

    #[error("Bad argument: {0}")]
    Argument(String),

    #[error("IO failure: {0}")]
    Io(String),
}

impl C8Error {
    // errors the session cannot resume from
    pub fn is_fatal(&self) -> bool {
        !matches!(self, C8Error::Io(_))
    }
}

impl From<std::io::Error> for C8Error {
    fn from(err: std::io::Error) -> Self {
        C8Error::Io(err.to_string())
    }
}
