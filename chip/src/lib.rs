//! A CHIP-8 interpreter: the instruction set, the machine state, program loading and a real
//! time driver that talks to a display and an input surface.
pub mod chip8;
pub mod definitions;
pub mod devices;
pub mod display;
pub mod opcode;
pub mod resources;
pub mod timer;
mod error;

// reexporting for convinience
mod runner;
pub use error::*;
pub use runner::*;
