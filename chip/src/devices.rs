use std::time::Duration;

use crate::{definitions::keyboard, display::Screen, DeviceError};

#[cfg_attr(test, mockall::automock)]
/// The traits responsible for the display based code
pub trait DisplayCommands {
    /// Will render the screen, `beeping` is set as long as the sound timer is running.
    fn display(&mut self, screen: &Screen, beeping: bool) -> Result<(), DeviceError>;
}

#[cfg_attr(test, mockall::automock)]
/// The trait responsible for reading the raw keyboard events
pub trait InputCommands {
    /// Will wait at most `timeout` for the next event.
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, DeviceError>;
}

/// A raw event of the input surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// A key went down on the host keyboard
    Key(char),
    /// The user wants to quit
    Exit,
}

/// Will store the current state of the hex keypad.
///
/// Input is done with a hex keyboard that has 16 keys ranging `0-F`. The `8`, `4`, `6`, and
/// `2` keys are typically used for directional input. Three opcodes are used to detect input.
/// One skips an instruction if a specific key is pressed, while another does the same if a
/// specific key is not pressed. The third waits for a key press, and then stores it in one of
/// the data registers.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Keyboard {
    keys: [bool; keyboard::SIZE],
}

impl Keyboard {
    pub fn new() -> Self {
        Keyboard::default()
    }

    /// Will release all the keys.
    pub fn reset(&mut self) {
        self.keys = [false; keyboard::SIZE];
    }

    pub fn set_key(&mut self, key: usize, to: bool) {
        debug_assert!(key < keyboard::SIZE);
        self.keys[key % keyboard::SIZE] = to;
    }

    pub fn set_mult(&mut self, keys: &[bool; keyboard::SIZE]) {
        self.keys = *keys;
    }

    /// Checks the key, only the lowest nibble of `key` is used.
    pub fn is_pressed(&self, key: u8) -> bool {
        self.keys[key as usize % keyboard::SIZE]
    }

    /// Will return the lowest key currently held down.
    pub fn first_pressed(&self) -> Option<u8> {
        self.keys.iter().position(|key| *key).map(|key| key as u8)
    }

    pub fn get_keys(&self) -> &[bool] {
        &self.keys
    }
}
