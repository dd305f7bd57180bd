//! The instruction word, its decoding into typed instructions and the trait
//! executing them.
use std::convert::TryFrom;

use crate::{definitions::memory, OpcodeError, ProcessError};

/// A raw two byte instruction word
pub type Opcode = u16;

/// Will read the big-endian word starting at `pointer`.
///
/// # Example
/// ```rust
/// # use chip::opcode::build_opcode;
/// # use chip::OpcodeError;
/// let data = [0x12, 0x34, 0xAB];
/// assert_eq!(build_opcode(&data, 0), Ok(0x1234));
/// assert_eq!(build_opcode(&data, 1), Ok(0x34AB));
/// assert_eq!(
///     build_opcode(&data, 2),
///     Err(OpcodeError::MemoryInvalid { pointer: 2, len: 3 })
/// );
/// ```
pub fn build_opcode(data: &[u8], pointer: usize) -> Result<Opcode, OpcodeError> {
    match data.get(pointer..pointer + 2) {
        Some(&[high, low]) => Ok(Opcode::from_be_bytes([high, low])),
        _ => Err(OpcodeError::MemoryInvalid {
            pointer,
            len: data.len(),
        }),
    }
}

/// Field extractors, the nibbles of a word are named `T X Y N`.
pub trait OpcodeTrait {
    /// The instruction class, the highest nibble.
    fn t(&self) -> usize;

    /// The 12 bit address of `TNNN`.
    fn nnn(&self) -> usize;

    /// The register and the byte constant of `TXNN`.
    fn xnn(&self) -> (usize, u8);

    /// Both registers and the lowest nibble of `TXYN`.
    fn xyn(&self) -> (usize, usize, usize);
}

impl OpcodeTrait for Opcode {
    /// ```rust
    /// # use chip::opcode::OpcodeTrait;
    /// assert_eq!(0xD12Fu16.t(), 0xD);
    /// ```
    fn t(&self) -> usize {
        (self >> 12) as usize
    }

    /// ```rust
    /// # use chip::opcode::OpcodeTrait;
    /// assert_eq!(0xD12Fu16.nnn(), 0x12F);
    /// ```
    fn nnn(&self) -> usize {
        (self & 0x0FFF) as usize
    }

    /// ```rust
    /// # use chip::opcode::OpcodeTrait;
    /// assert_eq!(0xD12Fu16.xnn(), (0x1, 0x2F));
    /// ```
    fn xnn(&self) -> (usize, u8) {
        (((self >> 8) & 0xF) as usize, (self & 0xFF) as u8)
    }

    /// ```rust
    /// # use chip::opcode::OpcodeTrait;
    /// assert_eq!(0xD12Fu16.xyn(), (0x1, 0x2, 0xF));
    /// ```
    fn xyn(&self) -> (usize, usize, usize) {
        let (x, _) = self.xnn();
        (x, ((self >> 4) & 0xF) as usize, (self & 0xF) as usize)
    }
}

/// Where the program counter goes after an instruction ran. It already
/// points past the running instruction at that time.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProgramCounterStep {
    /// Carry on with the following instruction
    Next,
    /// Pass over the following instruction
    Skip,
    /// Continue at the given address, masked to 12 bits
    Jump(usize),
    /// Land on the running instruction again, so it repeats next cycle
    Repeat,
}

impl ProgramCounterStep {
    /// Skips when the condition holds.
    ///
    /// ```rust
    /// # use chip::opcode::ProgramCounterStep;
    /// assert_eq!(ProgramCounterStep::cond(false), ProgramCounterStep::Next);
    /// assert_eq!(ProgramCounterStep::cond(true), ProgramCounterStep::Skip);
    /// ```
    #[inline]
    pub fn cond(cond: bool) -> Self {
        if cond {
            Self::Skip
        } else {
            Self::Next
        }
    }

    /// The new program counter, given the one pointing past the instruction.
    ///
    /// ```rust
    /// # use chip::opcode::ProgramCounterStep;
    /// assert_eq!(ProgramCounterStep::Skip.apply(0x202), 0x204);
    /// assert_eq!(ProgramCounterStep::Repeat.apply(0x202), 0x200);
    /// assert_eq!(ProgramCounterStep::Jump(0x1234).apply(0x202), 0x234);
    /// ```
    #[inline]
    pub fn apply(&self, pc: usize) -> usize {
        let pc = match *self {
            Self::Next => pc,
            Self::Skip => pc + memory::opcodes::SIZE,
            Self::Jump(target) => target,
            Self::Repeat => pc.wrapping_sub(memory::opcodes::SIZE),
        };
        pc & memory::ADDRESS_MASK
    }
}

/// Declares a sub operation enum, decoded from the given raw field.
macro_rules! sub_operations {
    (
        $(#[$meta:meta])*
        $name:ident : $raw:ty {
            $( $(#[$doc:meta])* $variant:ident = $code:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$doc])* $variant, )+
        }

        impl $name {
            fn decode(raw: $raw) -> Option<Self> {
                match raw {
                    $( $code => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

sub_operations! {
    /// The register to register operations of `8XYN`, all of them write `VX`.
    AluOperation: usize {
        /// `8XY0` copies `VY`
        Assign = 0x0,
        /// `8XY1`
        Or = 0x1,
        /// `8XY2`
        And = 0x2,
        /// `8XY3`
        Xor = 0x3,
        /// `8XY4` with `VF` as carry
        Add = 0x4,
        /// `8XY5` `VX - VY`, `VF` is cleared on borrow
        Sub = 0x5,
        /// `8XY6` with the dropped bit in `VF`
        ShiftRight = 0x6,
        /// `8XY7` `VY - VX`, `VF` is cleared on borrow
        SubReverse = 0x7,
        /// `8XYE` with the dropped bit in `VF`
        ShiftLeft = 0xE,
    }
}

sub_operations! {
    /// The key checks of `EXNN`.
    KeyCondition: u8 {
        /// `EX9E` skips while the key in `VX` is down
        Pressed = 0x9E,
        /// `EXA1` skips while the key in `VX` is up
        Released = 0xA1,
    }
}

sub_operations! {
    /// The timer, keyboard and memory operations of `FXNN`.
    MiscOperation: u8 {
        /// `FX07` reads the delay timer into `VX`
        GetDelayTimer = 0x07,
        /// `FX0A` blocks until a key is down and stores it in `VX`
        AwaitKey = 0x0A,
        /// `FX15`
        SetDelayTimer = 0x15,
        /// `FX18`
        SetSoundTimer = 0x18,
        /// `FX1E` adds `VX` to `I`, `VF` stays untouched
        AddToIndex = 0x1E,
        /// `FX29` points `I` at the font glyph of `VX`
        FontGlyph = 0x29,
        /// `FX33` writes the decimal digits of `VX` to `I..I+3`
        StoreBcd = 0x33,
        /// `FX55` writes `V0..=VX` to memory at `I`
        StoreRegisters = 0x55,
        /// `FX65` reads `V0..=VX` from memory at `I`
        LoadRegisters = 0x65,
    }
}

/// A 12 bit memory address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    pub nnn: usize,
}

/// A register together with a byte constant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterValue {
    pub x: usize,
    pub nn: u8,
}

/// Two registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterPair {
    pub x: usize,
    pub y: usize,
}

/// The position registers and the row count of a sprite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sprite {
    pub x: usize,
    pub y: usize,
    pub n: usize,
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// `0NNN` machine code routine, not available on this chip
    System(Address),
    /// `00E0`
    ClearScreen,
    /// `00EE`
    Return,
    /// `1NNN`
    Jump(Address),
    /// `2NNN`
    Call(Address),
    /// `3XNN`
    SkipEqual(RegisterValue),
    /// `4XNN`
    SkipNotEqual(RegisterValue),
    /// `5XY0`
    SkipRegistersEqual(RegisterPair),
    /// `6XNN`
    Load(RegisterValue),
    /// `7XNN`
    Add(RegisterValue),
    /// `8XYN`
    Alu(AluOperation, RegisterPair),
    /// `9XY0`
    SkipRegistersNotEqual(RegisterPair),
    /// `ANNN`
    LoadIndex(Address),
    /// `BNNN`
    JumpOffset(Address),
    /// `CXNN`
    Random(RegisterValue),
    /// `DXYN`
    Draw(Sprite),
    /// `EXNN`
    SkipKey(KeyCondition, usize),
    /// `FXNN`
    Misc(MiscOperation, usize),
}

impl TryFrom<Opcode> for Instruction {
    type Error = OpcodeError;

    fn try_from(opcode: Opcode) -> Result<Self, Self::Error> {
        use Instruction::*;

        let address = Address { nnn: opcode.nnn() };
        let (x, nn) = opcode.xnn();
        let value = RegisterValue { x, nn };
        let (_, y, n) = opcode.xyn();
        let pair = RegisterPair { x, y };

        let instruction = match (opcode.t(), n) {
            // both are matched before the generic machine code call
            (0x0, _) if opcode == 0x00E0 => Some(ClearScreen),
            (0x0, _) if opcode == 0x00EE => Some(Return),
            (0x0, _) => Some(System(address)),
            (0x1, _) => Some(Jump(address)),
            (0x2, _) => Some(Call(address)),
            (0x3, _) => Some(SkipEqual(value)),
            (0x4, _) => Some(SkipNotEqual(value)),
            (0x5, 0x0) => Some(SkipRegistersEqual(pair)),
            (0x6, _) => Some(Load(value)),
            (0x7, _) => Some(Add(value)),
            (0x8, n) => AluOperation::decode(n).map(|op| Alu(op, pair)),
            (0x9, 0x0) => Some(SkipRegistersNotEqual(pair)),
            (0xA, _) => Some(LoadIndex(address)),
            (0xB, _) => Some(JumpOffset(address)),
            (0xC, _) => Some(Random(value)),
            (0xD, n) => Some(Draw(Sprite { x, y, n })),
            (0xE, _) => KeyCondition::decode(nn).map(|op| SkipKey(op, x)),
            (0xF, _) => MiscOperation::decode(nn).map(|op| Misc(op, x)),
            _ => None,
        };
        instruction.ok_or(OpcodeError::InvalidOpcode(opcode))
    }
}

/// Moves the program counter after an instruction ran.
pub trait ProgramCounter {
    fn step(&mut self, step: ProgramCounterStep);
}

/// A hint for the surface about what the last instruction did.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Operation {
    /// Nothing the surface has to know about
    None,
    /// Spinning on `FX0A` until a key goes down
    Wait,
    /// The screen changed
    Draw,
}

/// The instruction set of the chip.
///
/// Every method returns where the program counter goes next, [`calc`](ChipOpcodes::calc)
/// applies it through [`ProgramCounter`].
pub trait ChipOpcodes: ProgramCounter {
    /// Will run a single decoded instruction.
    fn calc(&mut self, instruction: &Instruction) -> Result<Operation, ProcessError> {
        let mut operation = Operation::None;

        let step = match *instruction {
            Instruction::System(address) => self.system(address)?,
            Instruction::ClearScreen => {
                operation = Operation::Draw;
                self.clear_screen()?
            }
            Instruction::Return => self.return_from_subroutine()?,
            Instruction::Jump(address) => self.jump(address)?,
            Instruction::Call(address) => self.call(address)?,
            Instruction::SkipEqual(value) => self.skip_equal(value)?,
            Instruction::SkipNotEqual(value) => self.skip_not_equal(value)?,
            Instruction::SkipRegistersEqual(pair) => self.skip_registers_equal(pair)?,
            Instruction::Load(value) => self.load(value)?,
            Instruction::Add(value) => self.add(value)?,
            Instruction::Alu(op, pair) => self.alu(op, pair)?,
            Instruction::SkipRegistersNotEqual(pair) => self.skip_registers_not_equal(pair)?,
            Instruction::LoadIndex(address) => self.load_index(address)?,
            Instruction::JumpOffset(address) => self.jump_offset(address)?,
            Instruction::Random(value) => self.random(value)?,
            Instruction::Draw(sprite) => {
                operation = Operation::Draw;
                self.draw(sprite)?
            }
            Instruction::SkipKey(condition, x) => self.skip_key(condition, x)?,
            Instruction::Misc(op, x) => {
                let (step, op) = self.misc(op, x)?;
                operation = op;
                step
            }
        };

        self.step(step);
        Ok(operation)
    }

    /// `0NNN` calls into the machine code of the host, ignored.
    fn system(&mut self, address: Address) -> Result<ProgramCounterStep, ProcessError>;

    /// `00E0` blanks the screen.
    fn clear_screen(&mut self) -> Result<ProgramCounterStep, ProcessError>;

    /// `00EE` continues at the address on top of the stack.
    fn return_from_subroutine(&mut self) -> Result<ProgramCounterStep, ProcessError>;

    /// `1NNN` continues at `NNN`.
    fn jump(&self, address: Address) -> Result<ProgramCounterStep, ProcessError>;

    /// `2NNN` pushes the return address and continues at `NNN`.
    fn call(&mut self, address: Address) -> Result<ProgramCounterStep, ProcessError>;

    /// `3XNN` skips if `VX == NN`.
    fn skip_equal(&self, value: RegisterValue) -> Result<ProgramCounterStep, ProcessError>;

    /// `4XNN` skips if `VX != NN`.
    fn skip_not_equal(&self, value: RegisterValue) -> Result<ProgramCounterStep, ProcessError>;

    /// `5XY0` skips if `VX == VY`.
    fn skip_registers_equal(&self, pair: RegisterPair)
        -> Result<ProgramCounterStep, ProcessError>;

    /// `6XNN` sets `VX = NN`.
    fn load(&mut self, value: RegisterValue) -> Result<ProgramCounterStep, ProcessError>;

    /// `7XNN` adds `NN` to `VX` without touching the carry flag.
    fn add(&mut self, value: RegisterValue) -> Result<ProgramCounterStep, ProcessError>;

    /// `8XYN` the register arithmetic, see [`AluOperation`].
    fn alu(
        &mut self,
        op: AluOperation,
        pair: RegisterPair,
    ) -> Result<ProgramCounterStep, ProcessError>;

    /// `9XY0` skips if `VX != VY`.
    fn skip_registers_not_equal(
        &self,
        pair: RegisterPair,
    ) -> Result<ProgramCounterStep, ProcessError>;

    /// `ANNN` sets `I = NNN`.
    fn load_index(&mut self, address: Address) -> Result<ProgramCounterStep, ProcessError>;

    /// `BNNN` continues at `V0 + NNN`.
    fn jump_offset(&self, address: Address) -> Result<ProgramCounterStep, ProcessError>;

    /// `CXNN` sets `VX` to a random byte masked with `NN`.
    fn random(&mut self, value: RegisterValue) -> Result<ProgramCounterStep, ProcessError>;

    /// `DXYN` XORs the `N` byte sprite at `I` onto the screen at `(VX, VY)`,
    /// `VF` reports whether a lit pixel was switched off.
    fn draw(&mut self, sprite: Sprite) -> Result<ProgramCounterStep, ProcessError>;

    /// `EX9E` and `EXA1` skip depending on the key in `VX`.
    fn skip_key(
        &self,
        condition: KeyCondition,
        x: usize,
    ) -> Result<ProgramCounterStep, ProcessError>;

    /// `FXNN` the timer, keyboard and memory operations, see [`MiscOperation`].
    fn misc(
        &mut self,
        op: MiscOperation,
        x: usize,
    ) -> Result<(ProgramCounterStep, Operation), ProcessError>;
}
