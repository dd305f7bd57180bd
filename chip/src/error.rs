use thiserror::Error;

use crate::opcode::Opcode;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum ProcessError {
    #[error("Invalid opcode state '{0}'.")]
    Opcode(#[from] OpcodeError),
    #[error("Invalid stack state '{0}'.")]
    Stack(#[from] StackError),
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum OpcodeError {
    #[error("An unsupported opcode was used {0:#06X?}.")]
    InvalidOpcode(Opcode),
    #[error("Pointer location invalid there can not be an opcode at {pointer}, if data len is {len}")]
    MemoryInvalid { pointer: usize, len: usize },
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum StackError {
    #[error("Stack is full!")]
    Full,
    #[error("Stack is empty!")]
    Empty,
}

/// Everything that can go wrong while reading a program image.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Unable to read the rom '{0}'.")]
    Io(#[from] std::io::Error),
    #[error("Unable to extract the rom from the archive '{0}'.")]
    Archive(#[from] zip::result::ZipError),
    #[error("The rom is {len} bytes long, but it has to be shorter than {max} bytes.")]
    TooLarge { len: usize, max: usize },
}

/// Failures reported by a display or input surface.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("The device failed '{0}'.")]
    Io(#[from] std::io::Error),
}

/// The reasons a run of the chip can end early.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("The chip stopped '{0}'.")]
    Process(#[from] ProcessError),
    #[error("The surface stopped '{0}'.")]
    Device(#[from] DeviceError),
    #[error("The cpu worker panicked.")]
    WorkerPanicked,
}
