use std::{convert::TryFrom, ops::Range};

use {
    crate::{
        definitions::{cpu, display, keyboard, memory},
        devices::Keyboard,
        display::Screen,
        opcode::{
            self, ChipOpcodes, Instruction, Opcode, Operation, ProgramCounter, ProgramCounterStep,
        },
        resources::Rom,
        timer::Timers,
        OpcodeError, ProcessError, StackError,
    },
    rand::RngCore,
    tinyvec::ArrayVec,
};

/// The memory holding the font glyphs
const FONT_AREA: Range<usize> =
    display::fontset::LOCATION..(display::fontset::LOCATION + display::fontset::FONTSET.len());

/// The ChipSet struct represents the current state
/// of the system, it contains all the structures
/// needed for emulating an instant on the
/// Chip8 CPU.
pub struct ChipSet {
    /// name of the loaded rom
    pub(super) name: String,
    /// all two bytes long and stored big-endian
    pub(super) opcode: Opcode,
    /// - `0x000-0x04F` - Used for the built in `4x5` pixel font set (`0-F`)
    /// - `0x050-0x1FF` - Reserved for the interpreter
    /// - `0x200-0xFFF` - Program ROM and work RAM
    pub(super) memory: Box<[u8; memory::SIZE]>,
    /// `8-bit` data registers named `V0` to `VF`. The `VF` register doubles as a flag for some
    /// instructions; thus, it should be avoided. In an addition operation, `VF` is the carry flag,
    /// while in subtraction, it is the "no borrow" flag. In the draw instruction `VF` is set upon
    /// pixel collision.
    pub(super) registers: [u8; cpu::register::SIZE],
    /// The index for the register, this is a special register entry
    /// called index `I`, only the lower 12 bits are ever set.
    pub(super) index_register: usize,
    /// The program counter is a CPU register in the computer processor which has the address of the
    /// next instruction to be executed from memory.
    pub(super) program_counter: usize,
    /// The stack is only used to store return addresses when subroutines are called. The original
    /// [RCA 1802](https://de.wikipedia.org/wiki/RCA1802) version allocated `48` bytes for up to
    /// `12` levels of nesting; modern implementations usually have more.
    /// (here we are using `16`)
    pub(super) stack: ArrayVec<[usize; cpu::stack::SIZE]>,
    /// The delay and the sound timer, both count down at 60 hertz, until they reach 0.
    pub(super) timers: Timers,
    /// The graphics of the Chip 8 are black and white and the screen has a total of `2048` pixels
    /// `(64 x 32)`.
    pub(super) display: Screen,
    /// The state of the hex keypad, written by the surface and read by the opcodes.
    pub(super) keyboard: Keyboard,
    /// This stores the random number generator, used by the chipset.
    /// It is stored into the chipset, so as to enable simple mocking
    /// of the given type.
    pub(super) rng: Box<dyn RngCore + Send>,
}

impl ChipSet {
    /// will create a new chipset object
    pub fn new(rom: Rom) -> Self {
        // initialize all the memory with 0
        let mut ram = Box::new([0; memory::SIZE]);

        // load fonts
        ram[FONT_AREA].copy_from_slice(&display::fontset::FONTSET);

        // write the rom data into memory, the rom guarantees that it fits
        ram[cpu::PROGRAM_COUNTER..(cpu::PROGRAM_COUNTER + rom.get_data().len())]
            .copy_from_slice(rom.get_data());

        log::debug!(
            "Created chipset for '{}' with {} program bytes",
            rom.get_name(),
            rom.get_data().len()
        );

        Self {
            name: rom.get_name().to_string(),
            opcode: 0,
            memory: ram,
            registers: [0; cpu::register::SIZE],
            index_register: 0,
            program_counter: cpu::PROGRAM_COUNTER,
            stack: ArrayVec::new(),
            timers: Timers::default(),
            display: Screen::new(),
            keyboard: Keyboard::new(),
            rng: Box::new(rand::rngs::OsRng),
        }
    }

    /// Will replace the random number generator used by `CXNN`.
    pub fn with_rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.rng = rng;
        self
    }

    /// will get the next opcode from memory
    pub(super) fn set_opcode(&mut self) -> Result<(), OpcodeError> {
        // will build the opcode given from the pointer
        self.opcode = opcode::build_opcode(&self.memory[..], self.program_counter)?;
        Ok(())
    }

    /// will advance the program by a single step
    ///
    /// Unknown opcodes are skipped with a warning, only a broken stack or a
    /// program counter outside of the memory stop the chip.
    pub fn next(&mut self) -> Result<Operation, ProcessError> {
        let pc = self.program_counter;
        // get next opcode
        self.set_opcode()?;
        // the counter points past the running opcode during its execution
        self.program_counter = (pc + memory::opcodes::SIZE) & memory::ADDRESS_MASK;

        let instruction = match Instruction::try_from(self.opcode) {
            Ok(instruction) => instruction,
            Err(err) => {
                log::warn!("{} Skipping it at {:#06X}.", err, pc);
                return Ok(Operation::None);
            }
        };

        log::trace!("{:#06X}: {:#06X} {:?}", pc, self.opcode, instruction);

        self.calc(&instruction)
    }

    /// Will decrement both timers by one, called at 60 hertz.
    pub fn tick_timers(&mut self) {
        self.timers.tick();
    }

    /// Will write keyboard data into interncal keyboard representation.
    pub fn set_keyboard(&mut self, keys: &[bool; keyboard::SIZE]) {
        self.keyboard.set_mult(keys);
    }

    /// Will set the value of the given key
    pub fn set_key(&mut self, key: usize, to: bool) {
        self.keyboard.set_key(key, to)
    }

    /// Will get the current state of the keyboard
    pub fn get_keyboard(&self) -> &[bool] {
        self.keyboard.get_keys()
    }

    /// will return the sound timer
    pub fn get_sound_timer(&self) -> u8 {
        self.timers.sound.get_value()
    }

    /// will return the delay timer
    pub fn get_delay_timer(&self) -> u8 {
        self.timers.delay.get_value()
    }

    /// As long as the sound timer runs the surface should play a tone.
    pub fn is_beeping(&self) -> bool {
        self.timers.is_beeping()
    }

    /// Will return the current display configuration
    pub fn get_display(&self) -> &Screen {
        &self.display
    }

    /// Will return the name of the loaded rom
    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_index_register(&self) -> usize {
        self.index_register
    }

    pub fn get_program_counter(&self) -> usize {
        self.program_counter
    }

    /// Will return the current nesting depth of subroutine calls
    pub fn get_stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Will read a byte, the address wraps around the end of the memory
    pub(super) fn read_memory(&self, address: usize) -> u8 {
        self.memory[address & memory::ADDRESS_MASK]
    }

    /// Will write a byte, the address wraps around the end of the memory.
    /// The font is read only, writes into it are dropped.
    pub(super) fn write_memory(&mut self, address: usize, value: u8) {
        let address = address & memory::ADDRESS_MASK;
        if FONT_AREA.contains(&address) {
            log::warn!(
                "Ignoring the write of {:#04X} into the font at {:#06X}.",
                value,
                address
            );
            return;
        }
        self.memory[address] = value;
    }

    /// Will push the current pointer to the stack
    pub(super) fn push_stack(&mut self, pointer: usize) -> Result<(), StackError> {
        match self.stack.try_push(pointer) {
            None => Ok(()),
            Some(_) => Err(StackError::Full),
        }
    }

    /// Will pop from the stack
    pub(super) fn pop_stack(&mut self) -> Result<usize, StackError> {
        self.stack.pop().ok_or(StackError::Empty)
    }
}

impl ProgramCounter for ChipSet {
    fn step(&mut self, step: ProgramCounterStep) {
        self.program_counter = step.apply(self.program_counter);
    }
}
