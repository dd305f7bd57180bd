use crate::{
    definitions::{cpu, display, memory},
    opcode::{
        Address, AluOperation, ChipOpcodes, KeyCondition, MiscOperation, Operation,
        ProgramCounterStep, RegisterPair, RegisterValue, Sprite,
    },
    ProcessError,
};

use super::ChipSet;

/// Will turn a flag into the value stored in `VF`.
#[inline]
fn flag(set: bool) -> u8 {
    if set {
        1
    } else {
        0
    }
}

impl ChipOpcodes for ChipSet {
    fn system(&mut self, address: Address) -> Result<ProgramCounterStep, ProcessError> {
        log::debug!("Ignoring the machine code routine at {:#06X}", address.nnn);
        Ok(ProgramCounterStep::Next)
    }

    fn clear_screen(&mut self) -> Result<ProgramCounterStep, ProcessError> {
        self.display.clear();
        Ok(ProgramCounterStep::Next)
    }

    fn return_from_subroutine(&mut self) -> Result<ProgramCounterStep, ProcessError> {
        let pc = self.pop_stack()?;
        log::debug!("Returning to {:#06X}", pc);
        Ok(ProgramCounterStep::Jump(pc))
    }

    fn jump(&self, address: Address) -> Result<ProgramCounterStep, ProcessError> {
        Ok(ProgramCounterStep::Jump(address.nnn))
    }

    fn call(&mut self, address: Address) -> Result<ProgramCounterStep, ProcessError> {
        // the counter already points at the instruction after the call
        self.push_stack(self.program_counter)?;
        log::debug!(
            "Calling {:#06X} from {:#06X}",
            address.nnn,
            self.program_counter
        );
        Ok(ProgramCounterStep::Jump(address.nnn))
    }

    fn skip_equal(&self, value: RegisterValue) -> Result<ProgramCounterStep, ProcessError> {
        Ok(ProgramCounterStep::cond(self.registers[value.x] == value.nn))
    }

    fn skip_not_equal(&self, value: RegisterValue) -> Result<ProgramCounterStep, ProcessError> {
        Ok(ProgramCounterStep::cond(self.registers[value.x] != value.nn))
    }

    fn skip_registers_equal(
        &self,
        pair: RegisterPair,
    ) -> Result<ProgramCounterStep, ProcessError> {
        Ok(ProgramCounterStep::cond(
            self.registers[pair.x] == self.registers[pair.y],
        ))
    }

    fn load(&mut self, value: RegisterValue) -> Result<ProgramCounterStep, ProcessError> {
        self.registers[value.x] = value.nn;
        Ok(ProgramCounterStep::Next)
    }

    fn add(&mut self, value: RegisterValue) -> Result<ProgramCounterStep, ProcessError> {
        self.registers[value.x] = self.registers[value.x].wrapping_add(value.nn);
        Ok(ProgramCounterStep::Next)
    }

    fn alu(
        &mut self,
        op: AluOperation,
        pair: RegisterPair,
    ) -> Result<ProgramCounterStep, ProcessError> {
        let RegisterPair { x, y } = pair;
        let vx = self.registers[x];
        let vy = self.registers[y];

        let (res, vf) = match op {
            AluOperation::Assign => (vy, None),
            AluOperation::Or => (vx | vy, None),
            AluOperation::And => (vx & vy, None),
            AluOperation::Xor => (vx ^ vy, None),
            AluOperation::Add => {
                let (res, carry) = vx.overflowing_add(vy);
                (res, Some(flag(carry)))
            }
            AluOperation::Sub => {
                let (res, borrow) = vx.overflowing_sub(vy);
                (res, Some(flag(!borrow)))
            }
            AluOperation::ShiftRight => (vx >> 1, Some(vx & 1)),
            AluOperation::SubReverse => {
                let (res, borrow) = vy.overflowing_sub(vx);
                (res, Some(flag(!borrow)))
            }
            AluOperation::ShiftLeft => (vx << 1, Some(vx >> 7)),
        };

        self.registers[x] = res;
        // written last, so the flag wins if X is F
        if let Some(vf) = vf {
            self.registers[cpu::register::LAST] = vf;
        }
        Ok(ProgramCounterStep::Next)
    }

    fn skip_registers_not_equal(
        &self,
        pair: RegisterPair,
    ) -> Result<ProgramCounterStep, ProcessError> {
        Ok(ProgramCounterStep::cond(
            self.registers[pair.x] != self.registers[pair.y],
        ))
    }

    fn load_index(&mut self, address: Address) -> Result<ProgramCounterStep, ProcessError> {
        self.index_register = address.nnn;
        Ok(ProgramCounterStep::Next)
    }

    fn jump_offset(&self, address: Address) -> Result<ProgramCounterStep, ProcessError> {
        let v0 = self.registers[0] as usize;
        Ok(ProgramCounterStep::Jump(v0 + address.nnn))
    }

    fn random(&mut self, value: RegisterValue) -> Result<ProgramCounterStep, ProcessError> {
        // RngCore has no u8 generator
        let mut rand = [0u8; 1];
        self.rng.fill_bytes(&mut rand);
        self.registers[value.x] = value.nn & rand[0];
        Ok(ProgramCounterStep::Next)
    }

    fn draw(&mut self, sprite: Sprite) -> Result<ProgramCounterStep, ProcessError> {
        let x = self.registers[sprite.x] as usize;
        let y = self.registers[sprite.y] as usize;

        let rows: Vec<u8> = (0..sprite.n)
            .map(|row| self.read_memory(self.index_register + row))
            .collect();

        let collision = self.display.draw_sprite(x, y, &rows);
        self.registers[cpu::register::LAST] = flag(collision);

        Ok(ProgramCounterStep::Next)
    }

    fn skip_key(
        &self,
        condition: KeyCondition,
        x: usize,
    ) -> Result<ProgramCounterStep, ProcessError> {
        let pressed = self.keyboard.is_pressed(self.registers[x]);
        let step = match condition {
            KeyCondition::Pressed => ProgramCounterStep::cond(pressed),
            KeyCondition::Released => ProgramCounterStep::cond(!pressed),
        };
        Ok(step)
    }

    fn misc(
        &mut self,
        op: MiscOperation,
        x: usize,
    ) -> Result<(ProgramCounterStep, Operation), ProcessError> {
        match op {
            MiscOperation::GetDelayTimer => {
                self.registers[x] = self.timers.delay.get_value();
            }
            MiscOperation::AwaitKey => match self.keyboard.first_pressed() {
                Some(key) => self.registers[x] = key,
                // rerun until a key is down, the timers keep on running
                None => return Ok((ProgramCounterStep::Repeat, Operation::Wait)),
            },
            MiscOperation::SetDelayTimer => {
                self.timers.delay.set_value(self.registers[x]);
            }
            MiscOperation::SetSoundTimer => {
                self.timers.sound.set_value(self.registers[x]);
            }
            MiscOperation::AddToIndex => {
                let vx = self.registers[x] as usize;
                self.index_register = (self.index_register + vx) & memory::ADDRESS_MASK;
            }
            MiscOperation::FontGlyph => {
                let glyph = self.registers[x] as usize;
                self.index_register = (display::fontset::LOCATION
                    + display::fontset::GLYPH_SIZE * glyph)
                    & memory::ADDRESS_MASK;
            }
            MiscOperation::StoreBcd => {
                let i = self.index_register;
                let vx = self.registers[x];

                self.write_memory(i, vx / 100);
                self.write_memory(i + 1, vx / 10 % 10);
                self.write_memory(i + 2, vx % 10);
            }
            MiscOperation::StoreRegisters => {
                let i = self.index_register;
                for offset in 0..=x {
                    self.write_memory(i + offset, self.registers[offset]);
                }
            }
            MiscOperation::LoadRegisters => {
                let i = self.index_register;
                for offset in 0..=x {
                    self.registers[offset] = self.read_memory(i + offset);
                }
            }
        }
        Ok((ProgramCounterStep::Next, Operation::None))
    }
}
