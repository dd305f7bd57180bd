//! The monochrome display buffer the chip draws its sprites into.
use crate::definitions::display::{HEIGHT, WIDTH};

/// The graphics of the Chip 8 are black and white and the screen has a total of `2048` pixels
/// `(64 x 32)`. Each pixel only stores if it is on or off, a consumer reads the whole buffer
/// whenever it wants to render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pixels: [[bool; WIDTH]; HEIGHT],
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            pixels: [[false; WIDTH]; HEIGHT],
        }
    }
}

impl Screen {
    pub fn new() -> Self {
        Screen::default()
    }

    /// Will turn every pixel off.
    pub fn clear(&mut self) {
        for row in self.pixels.iter_mut() {
            row.fill(false);
        }
    }

    /// Will flip the pixel at the given coordinates, both coordinates wrap around the screen
    /// edges. Returns the state of the pixel after the flip.
    pub fn toggle(&mut self, x: usize, y: usize) -> bool {
        let pixel = &mut self.pixels[y % HEIGHT][x % WIDTH];
        *pixel = !*pixel;
        *pixel
    }

    /// XORs a sprite onto the screen with its top left corner at `(x, y)`. Every byte of the
    /// sprite is one row of 8 pixels, the most significant bit is the left most pixel.
    ///
    /// Returns `true` if any pixel that was flipped ended up turned off.
    pub fn draw_sprite(&mut self, x: usize, y: usize, sprite: &[u8]) -> bool {
        const BYTE: usize = 8;

        let mut collision = false;
        for (row, line) in sprite.iter().enumerate() {
            for column in 0..BYTE {
                let mask = 0x80 >> column;
                if line & mask == 0 {
                    continue;
                }
                if !self.toggle(x + column, y + row) {
                    collision = true;
                }
            }
        }
        collision
    }

    /// Will return the state of the pixel, the coordinates wrap around like they do while
    /// drawing.
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.pixels[y % HEIGHT][x % WIDTH]
    }

    /// Will return the rows of the screen, from top to bottom.
    pub fn rows(&self) -> &[[bool; WIDTH]; HEIGHT] {
        &self.pixels
    }

    /// Checks if there is any pixel turned on.
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|row| row.iter().all(|pixel| !pixel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_screen_is_blank() {
        let screen = Screen::new();
        assert!(screen.is_blank());
        assert_eq!(screen.rows().len(), HEIGHT);
        assert_eq!(screen.rows()[0].len(), WIDTH);
    }

    #[test]
    fn test_toggle_returns_new_state() {
        let mut screen = Screen::new();
        assert!(screen.toggle(3, 4));
        assert!(screen.get(3, 4));
        assert!(!screen.toggle(3, 4));
        assert!(!screen.get(3, 4));
    }

    #[test]
    fn test_sprite_bit_order() {
        let mut screen = Screen::new();
        let collision = screen.draw_sprite(8, 2, &[0b1010_1011]);
        assert!(!collision);

        let expected = [true, false, true, false, true, false, true, true];
        for (column, pixel) in expected.iter().enumerate() {
            assert_eq!(screen.get(8 + column, 2), *pixel);
        }
        assert!(!screen.get(7, 2));
        assert!(!screen.get(16, 2));
        assert!(!screen.get(8, 1));
        assert!(!screen.get(8, 3));
    }

    #[test]
    fn test_sprite_wraps_horizontally() {
        let mut screen = Screen::new();
        screen.draw_sprite(WIDTH - 1, 0, &[0b1100_0000]);
        assert!(screen.get(WIDTH - 1, 0));
        assert!(screen.rows()[0][0]);
    }

    #[test]
    fn test_sprite_wraps_vertically() {
        let mut screen = Screen::new();
        screen.draw_sprite(0, HEIGHT - 1, &[0x80, 0x80]);
        assert!(screen.rows()[HEIGHT - 1][0]);
        assert!(screen.rows()[0][0]);
    }

    #[test]
    fn test_collision_on_overlap_only() {
        let mut screen = Screen::new();
        assert!(!screen.draw_sprite(0, 0, &[0b1111_0000]));
        // overlaps on the two right most pixels
        assert!(screen.draw_sprite(2, 0, &[0b1100_0000]));
        assert!(screen.get(0, 0));
        assert!(screen.get(1, 0));
        assert!(!screen.get(2, 0));
        assert!(!screen.get(3, 0));
    }

    #[test]
    fn test_double_draw_restores() {
        let mut screen = Screen::new();
        screen.draw_sprite(1, 1, &[0xFF]);
        let before = screen.clone();

        let sprite = [0x3C, 0x42, 0x81, 0x42, 0x3C];
        screen.draw_sprite(60, 30, &sprite);
        assert_ne!(before, screen);
        screen.draw_sprite(60, 30, &sprite);
        assert_eq!(before, screen);
    }

    #[test]
    fn test_clear() {
        let mut screen = Screen::new();
        screen.draw_sprite(0, 0, &[0xFF, 0xFF]);
        assert!(!screen.is_blank());
        screen.clear();
        assert!(screen.is_blank());
    }
}
