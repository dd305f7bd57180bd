//! The pretty print implementation of the [`ChipSet`](super::ChipSet), used to dump the state of
//! the machine once it stopped with an error.

use super::ChipSet;
use crate::definitions::cpu;
use once_cell::sync::Lazy;
use std::fmt;

/// The amount of entries printed on a single row, an opcode is two bytes
/// long so a memory row covers twice as many bytes.
const HEX_PRINT_STEP: usize = 8;

const END_OF_LINE: char = '\n';
const INDENT_FILLAMENT: char = '\t';
const INDENT_SIZE: usize = 2;

/// Will add an indent post processing
fn indent_helper(text: &mut String, indent: usize) {
    for _ in 0..indent {
        text.push(INDENT_FILLAMENT);
    }
}

/// Will remove the trailing line end of a finished block.
fn trim_line_end(text: &mut String) {
    if text.ends_with(END_OF_LINE) {
        text.pop();
    }
}

macro_rules! intformat {
    () => {
        // The formatted string will be 2 symbols for the prefix (0x)
        // and 4 for the rest long.
        "{:#06X}"
    };
}

// If one of these fails some essential component of printing went
// wrongly, so panicking is correct.
static POINTER_LEN: Lazy<usize> = Lazy::new(|| {
    let mut line = String::with_capacity(20);
    pointer_print::formatter(&mut line, 0, 0).expect("unable to format a pointer");
    line.len()
});

static INTEGER_LEN: Lazy<usize> = Lazy::new(|| {
    let mut line = String::new();
    integer_print::formatter(&mut line, 0u8).expect("unable to format an integer");
    line.len()
});

/// a line length (This is a bit bigger then the actual line will be)
static LENLINE: Lazy<usize> =
    Lazy::new(|| INDENT_SIZE + HEX_PRINT_STEP * (*INTEGER_LEN + 1) + 1 + *POINTER_LEN);

/// Handles all the printing of the pointer values.
mod pointer_print {
    use std::fmt::{self, Write};

    /// will format the pointers according to definition
    pub(super) fn formatter(line: &mut String, from: usize, to: usize) -> fmt::Result {
        write!(line, concat!(intformat!(), " - ", intformat!(), " :"), from, to)
    }
}

/// Handles all the opcode prints
mod opcode_print {
    use super::{integer_print, pointer_print, HEX_PRINT_STEP};
    use crate::{
        definitions::memory,
        opcode::{self, Opcode},
    };
    use once_cell::sync::Lazy;
    use std::fmt::{self, Write};

    /// The amount of bytes covered by a single row
    const POINTER_INCREMENT: usize = HEX_PRINT_STEP * memory::opcodes::SIZE;
    /// The values that are used when a row only contains zeros.
    const FILLER_BASE: &str = "...";

    /// Prepares the line that stands in for rows of only zeros.
    static ZERO_FILLER: Lazy<String> = Lazy::new(|| {
        let mut formatted = String::new();
        integer_print::formatter(&mut formatted, 0u16).expect("unable to format an integer");
        let length = formatted.len() * (HEX_PRINT_STEP - 2) + (HEX_PRINT_STEP - 1)
            - FILLER_BASE.len();
        let filler = " ".repeat(length / 2);
        format!("{0}{1}{2}{1}{0}", formatted, filler, FILLER_BASE)
    });

    /// a single row of opcodes (only in this context)
    struct Row {
        from: usize,
        to: usize,
        data: [Opcode; HEX_PRINT_STEP],
        only_null: bool,
    }

    impl fmt::Display for Row {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let mut res = String::with_capacity(*super::LENLINE);
            pointer_print::formatter(&mut res, self.from, self.to)?;
            res.push(' ');

            if self.only_null {
                res.push_str(&ZERO_FILLER);
            } else {
                let entries = self
                    .data
                    .iter()
                    .map(|entry| format!(intformat!(), entry))
                    .collect::<Vec<_>>();
                res.push_str(&entries.join(" "));
            }
            write!(f, "{}", res)
        }
    }

    /// will pretty print the content of the raw memory, neighbouring rows of only zeros are
    /// merged into a single one
    pub(super) fn printer(memory: &[u8], indent: usize) -> Result<String, fmt::Error> {
        let data_last_index = memory.len() - 1;
        let mut rows: Vec<Row> = Vec::with_capacity(memory.len() / POINTER_INCREMENT);

        for from in (0..memory.len()).step_by(POINTER_INCREMENT) {
            let to = (from + POINTER_INCREMENT - 1).min(data_last_index);

            let mut data = [0; HEX_PRINT_STEP];
            for (entry, index) in data
                .iter_mut()
                .zip((from..=to).step_by(memory::opcodes::SIZE))
            {
                *entry = opcode::build_opcode(memory, index).map_err(|_| fmt::Error)?;
            }
            let only_null = data.iter().all(|entry| *entry == 0);

            match rows.last_mut() {
                Some(last) if only_null && last.only_null => last.to = to,
                _ => rows.push(Row {
                    from,
                    to,
                    data,
                    only_null,
                }),
            }
        }

        let mut string = String::with_capacity((*super::LENLINE + 1) * rows.len());
        for row in rows {
            super::indent_helper(&mut string, indent);
            writeln!(string, "{}", row)?;
        }
        super::trim_line_end(&mut string);
        Ok(string)
    }
}

/// handles printing of any and all of integers.
mod integer_print {
    use super::{pointer_print, HEX_PRINT_STEP};
    use num_traits::Unsigned;
    use std::fmt::{self, Write};

    /// will format all integer types
    pub(super) fn formatter<T>(line: &mut String, data: T) -> fmt::Result
    where
        T: fmt::UpperHex + Unsigned + Copy,
    {
        write!(line, intformat!(), data)
    }

    /// will pretty print a single value on its own line
    pub(super) fn single<T>(data: T, indent: usize) -> Result<String, fmt::Error>
    where
        T: fmt::UpperHex + Unsigned + Copy,
    {
        let mut res = String::with_capacity(*super::INTEGER_LEN + indent);
        super::indent_helper(&mut res, indent);
        formatter(&mut res, data)?;
        Ok(res)
    }

    /// will pretty print all the integer data given
    pub(super) fn printer<T>(data: &[T], indent: usize) -> Result<String, fmt::Error>
    where
        T: fmt::UpperHex + Unsigned + Copy,
    {
        let mut res = String::with_capacity(*super::LENLINE * (data.len() / HEX_PRINT_STEP + 1));
        for (row, chunk) in data.chunks(HEX_PRINT_STEP).enumerate() {
            let from = row * HEX_PRINT_STEP;
            super::indent_helper(&mut res, indent);
            pointer_print::formatter(&mut res, from, from + chunk.len() - 1)?;

            for entry in chunk {
                res.push(' ');
                formatter(&mut res, *entry)?;
            }
            res.push(super::END_OF_LINE);
        }
        super::trim_line_end(&mut res);
        Ok(res)
    }
}

/// Handles all the boolean data types.
mod bool_print {
    use super::{pointer_print, HEX_PRINT_STEP};
    use once_cell::sync::Lazy;
    use std::fmt;

    /// the prepared true string
    static TRUE: Lazy<String> = Lazy::new(|| formatter("true"));
    /// the prepared false string
    static FALSE: Lazy<String> = Lazy::new(|| formatter("false"));

    /// keeps the same column width as the integers
    fn formatter(message: &str) -> String {
        format!("{:width$}", message, width = *super::INTEGER_LEN)
    }

    /// will pretty print all the boolean data given
    pub(super) fn printer(data: &[bool], indent: usize) -> Result<String, fmt::Error> {
        let check_type = |val: bool| if val { &*TRUE } else { &*FALSE };

        let mut res = String::with_capacity(*super::LENLINE * (data.len() / HEX_PRINT_STEP + 1));
        for (row, chunk) in data.chunks(HEX_PRINT_STEP).enumerate() {
            let from = row * HEX_PRINT_STEP;
            super::indent_helper(&mut res, indent);
            pointer_print::formatter(&mut res, from, from + chunk.len() - 1)?;

            let line = chunk
                .iter()
                .map(|value| check_type(*value).as_str())
                .collect::<Vec<_>>()
                .join(" ");
            res.push(' ');
            res.push_str(line.trim_end());
            res.push(super::END_OF_LINE);
        }
        super::trim_line_end(&mut res);
        Ok(res)
    }
}

impl fmt::Display for ChipSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut nam = String::with_capacity(INDENT_SIZE + self.name.len());
        indent_helper(&mut nam, INDENT_SIZE);
        nam.push_str(&self.name);

        let opc = integer_print::single(self.opcode, INDENT_SIZE)?;
        let prc = integer_print::single(self.program_counter, INDENT_SIZE)?;
        let idx = integer_print::single(self.index_register, INDENT_SIZE)?;
        let del = integer_print::single(self.timers.delay.get_value(), INDENT_SIZE)?;
        let snd = integer_print::single(self.timers.sound.get_value(), INDENT_SIZE)?;

        let mem = opcode_print::printer(&self.memory[..], INDENT_SIZE)?;
        let key = bool_print::printer(self.keyboard.get_keys(), INDENT_SIZE)?;

        // the stack is filled up, so it always shows its full depth
        let mut stack = [0usize; cpu::stack::SIZE];
        stack[..self.stack.len()].copy_from_slice(&self.stack);
        let sta = integer_print::printer(&stack, INDENT_SIZE)?;

        let reg = integer_print::printer(&self.registers, INDENT_SIZE)?;

        write!(
            f,
            "Chipset {{\n\
                \tProgram Name :\n{}\n\
                \tOpcode :\n{}\n\
                \tProgram Counter :\n{}\n\
                \tIndex Register :\n{}\n\
                \tDelay Timer :\n{}\n\
                \tSound Timer :\n{}\n\
                \tMemory :\n{}\n\
                \tKeyboard :\n{}\n\
                \tStack :\n{}\n\
                \tRegister :\n{}\n\
                }}",
            nam, opc, prc, idx, del, snd, mem, key, sta, reg
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests;
    use crate::definitions::keyboard;

    const OUTPUT_PRINT: &str = "\
        Chipset {\n\
            \tProgram Name :\n\
                \t\tTEST\n\
            \tOpcode :\n\
                \t\t0x0000\n\
            \tProgram Counter :\n\
                \t\t0x0200\n\
            \tIndex Register :\n\
                \t\t0x0000\n\
            \tDelay Timer :\n\
                \t\t0x0000\n\
            \tSound Timer :\n\
                \t\t0x0000\n\
            \tMemory :\n\
                \t\t0x0000 - 0x000F : 0xF090 0x9090 0xF020 0x6020 0x2070 0xF010 0xF080 0xF0F0\n\
                \t\t0x0010 - 0x001F : 0x10F0 0x10F0 0x9090 0xF010 0x10F0 0x80F0 0x10F0 0xF080\n\
                \t\t0x0020 - 0x002F : 0xF090 0xF0F0 0x1020 0x4040 0xF090 0xF090 0xF0F0 0x90F0\n\
                \t\t0x0030 - 0x003F : 0x10F0 0xF090 0xF090 0x90E0 0x90E0 0x90E0 0xF080 0x8080\n\
                \t\t0x0040 - 0x004F : 0xF0E0 0x9090 0x90E0 0xF080 0xF080 0xF0F0 0x80F0 0x8080\n\
                \t\t0x0050 - 0x01FF : 0x0000                    ...                    0x0000\n\
                \t\t0x0200 - 0x020F : 0x6005 0x7003 0x8014 0x00E0 0x0000 0x0000 0x0000 0x0000\n\
                \t\t0x0210 - 0x0FFF : 0x0000                    ...                    0x0000\n\
            \tKeyboard :\n\
                \t\t0x0000 - 0x0007 : false  true   false  true   false  true   false  true\n\
                \t\t0x0008 - 0x000F : false  true   false  true   false  true   false  true\n\
            \tStack :\n\
                \t\t0x0000 - 0x0007 : 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000\n\
                \t\t0x0008 - 0x000F : 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000\n\
            \tRegister :\n\
                \t\t0x0000 - 0x0007 : 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000\n\
                \t\t0x0008 - 0x000F : 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000\n\
        }";

    #[test]
    /// tests if the pretty print output is as expected
    fn test_full_print() {
        let mut chip = tests::get_default_chip();
        let mut keys = [false; keyboard::SIZE];

        for (index, key) in keys.iter_mut().enumerate() {
            *key = index % 2 != 0;
        }

        chip.set_keyboard(&keys);

        let actual_full = format!("{}", chip);
        let actual_split = actual_full.split('\n');
        let expected = OUTPUT_PRINT.split('\n');

        for (exp, act) in expected.zip(actual_split) {
            assert_eq!(exp, act);
        }
        assert_eq!(OUTPUT_PRINT, actual_full);
    }

    #[test]
    fn test_stack_is_padded() {
        let mut chip = tests::get_default_chip();
        chip.stack.push(0x0ABC);
        chip.stack.push(0x0DEF);

        let actual = format!("{}", chip);
        assert!(actual.contains("\t\t0x0000 - 0x0007 : 0x0ABC 0x0DEF 0x0000"));
    }
}
