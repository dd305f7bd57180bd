//! The terminal surface, renders the screen with `tui` and reads the keys with `crossterm`.
use std::{io, time::Duration};

use chip::{
    definitions::display::{HEIGHT, WIDTH},
    devices::{DisplayCommands, InputCommands, InputEvent},
    display::Screen,
    DeviceError,
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tui::{
    backend::CrosstermBackend,
    layout::Rect,
    style::{Color, Style},
    symbols::Marker,
    widgets::{
        canvas::{Canvas, Points},
        Block, Borders,
    },
    Terminal,
};

const TITLE: &str = "CHIP-8";
const TITLE_BEEPING: &str = "CHIP-8 *beep*";

/// Will turn the lit pixels into canvas coordinates, the top row sits at `y = 0` and the rows
/// grow downwards into the negative.
pub(crate) fn points(screen: &Screen) -> Vec<(f64, f64)> {
    screen
        .rows()
        .iter()
        .enumerate()
        .flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, pixel)| **pixel)
                .map(move |(x, _)| (x as f64, -(y as f64)))
        })
        .collect()
}

/// A monochrome display and a keyboard in the raw mode terminal
pub struct TerminalSurface {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalSurface {
    /// Will switch the terminal into raw mode on the alternate screen, it is restored once the
    /// surface is dropped.
    pub fn new() -> Result<Self, DeviceError> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.hide_cursor()?;
        terminal.clear()?;
        Ok(Self { terminal })
    }

    fn restore(&mut self) -> io::Result<()> {
        terminal::disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            log::warn!("Unable to restore the terminal: {}", err);
        }
    }
}

impl DisplayCommands for TerminalSurface {
    fn display(&mut self, screen: &Screen, beeping: bool) -> Result<(), DeviceError> {
        let coords = points(screen);
        let title = if beeping { TITLE_BEEPING } else { TITLE };

        self.terminal.draw(|f| {
            // one cell per pixel plus the border
            let area = Rect::new(0, 0, WIDTH as u16 + 2, HEIGHT as u16 + 2).intersection(f.size());

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title(title)
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds([0.0, (WIDTH - 1) as f64])
                .y_bounds([-((HEIGHT - 1) as f64), 0.0])
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &coords,
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, area);
        })?;
        Ok(())
    }
}

impl InputCommands for TerminalSurface {
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, DeviceError> {
        if !event::poll(timeout)? {
            return Ok(None);
        }

        let res = match event::read()? {
            Event::Key(KeyEvent {
                code: KeyCode::Esc, ..
            }) => Some(InputEvent::Exit),
            // raw mode swallows the interrupt signal
            Event::Key(KeyEvent {
                code: KeyCode::Char('c'),
                modifiers,
                ..
            }) if modifiers.contains(KeyModifiers::CONTROL) => Some(InputEvent::Exit),
            Event::Key(KeyEvent {
                code: KeyCode::Char(key),
                ..
            }) => Some(InputEvent::Key(key)),
            _ => None,
        };
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_of_blank_screen() {
        assert!(points(&Screen::new()).is_empty());
    }

    #[test]
    fn test_points_are_flipped() {
        let mut screen = Screen::new();
        screen.toggle(3, 4);
        screen.toggle(WIDTH - 1, HEIGHT - 1);

        assert_eq!(
            points(&screen),
            vec![
                (3.0, -4.0),
                ((WIDTH - 1) as f64, -((HEIGHT - 1) as f64))
            ]
        );
    }
}
