//! Drives a [`ChipSet`] in real time: the cpu and the timers run on a worker thread, while the
//! calling thread feeds the keyboard and renders the screen.
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use {
    hashbrown::HashMap,
    once_cell::sync::Lazy,
    parking_lot::Mutex,
    tinyvec::ArrayVec,
};

use crate::{
    chip8::ChipSet,
    definitions::{cpu, keyboard, runner, timer},
    devices::{DisplayCommands, InputCommands, InputEvent},
    opcode::Operation,
    timer::{period_from_hertz, Clock, Scheduler, StopFlag, Ticker, Worker},
    DeviceError, ProcessError, RunError,
};

/// The host keys mapped onto the hex keypad, only the lower case characters are stored.
static KEYMAP: Lazy<HashMap<char, usize>> = Lazy::new(|| {
    keyboard::QWERTY
        .iter()
        .flatten()
        .zip(keyboard::LAYOUT.iter().flatten())
        .map(|(host, key)| (*host, *key))
        .collect()
});

/// Will translate a character from the host keyboard into a keypad index.
///
/// # Example
/// ```rust
/// # use chip::map_key;
/// assert_eq!(map_key('1'), Some(0x1));
/// assert_eq!(map_key('V'), Some(0xF));
/// assert_eq!(map_key('p'), None);
/// ```
pub fn map_key(host: char) -> Option<usize> {
    KEYMAP.get(&host.to_ascii_lowercase()).copied()
}

/// The rates and delays the runner works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// cpu cycles per second
    pub cpu_hz: u64,
    /// timer ticks per second
    pub timer_hz: u64,
    /// redraws per second
    pub frame_hz: u64,
    /// how long a key stays down after its key down event
    pub key_hold: Duration,
    /// the sleep between two idle clock polls
    pub poll_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cpu_hz: cpu::HERTZ,
            timer_hz: timer::HERTZ,
            frame_hz: runner::FRAME_HERTZ,
            key_hold: keyboard::HOLD,
            poll_interval: runner::POLL_INTERVAL,
        }
    }
}

/// Terminals only report key downs, so every key is released again once
/// it was held for long enough.
#[derive(Debug, Clone)]
pub struct KeyLatch {
    hold: Duration,
    pressed: [Option<Instant>; keyboard::SIZE],
}

impl KeyLatch {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            pressed: [None; keyboard::SIZE],
        }
    }

    /// Will mark the key as pressed, returns `false` if it is already held.
    /// A held key keeps its original press time.
    pub fn press(&mut self, key: usize, now: Instant) -> bool {
        let slot = &mut self.pressed[key % keyboard::SIZE];
        if slot.is_some() {
            return false;
        }
        *slot = Some(now);
        true
    }

    pub fn is_held(&self, key: usize) -> bool {
        self.pressed[key % keyboard::SIZE].is_some()
    }

    /// Will release and return all the keys held for at least the hold time.
    pub fn release_expired(&mut self, now: Instant) -> ArrayVec<[usize; keyboard::SIZE]> {
        let mut released = ArrayVec::new();
        for (key, slot) in self.pressed.iter_mut().enumerate() {
            if let Some(since) = *slot {
                if now.saturating_duration_since(since) >= self.hold {
                    *slot = None;
                    released.push(key);
                }
            }
        }
        released
    }
}

/// Raised by the cpu loop whenever the screen changed, taken by the surface loop.
#[derive(Debug, Clone)]
pub struct RedrawFlag(Arc<AtomicBool>);

impl RedrawFlag {
    /// Starts raised, so the first frame is always rendered.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Will return if a redraw is due and lower the flag.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

impl Default for RedrawFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs cpu cycles and timer ticks until the flag is raised or the chip fails, a failure raises
/// the flag for everybody else.
pub fn run_cpu<C>(
    chip: &Mutex<ChipSet>,
    clock: C,
    config: &RunnerConfig,
    stop: &StopFlag,
    redraw: &RedrawFlag,
) -> Result<(), ProcessError>
where
    C: Clock,
{
    let mut scheduler = Scheduler::new(clock, config.cpu_hz, config.timer_hz);
    let mut waiting = false;

    while !stop.is_raised() {
        let fired = scheduler.poll();
        if !fired.cpu && !fired.timer {
            thread::sleep(config.poll_interval);
            continue;
        }

        // a single step per lock
        let mut chip = chip.lock();
        if fired.timer {
            chip.tick_timers();
        }
        if fired.cpu {
            match chip.next() {
                Ok(operation) => {
                    if operation == Operation::Draw {
                        redraw.raise();
                    }
                    let wait = operation == Operation::Wait;
                    if wait && !waiting {
                        log::debug!("Waiting for a key press.");
                    }
                    waiting = wait;
                }
                Err(err) => {
                    log::error!(
                        "The chip stopped at {:#06X}: {}",
                        chip.get_program_counter(),
                        err
                    );
                    stop.raise();
                    return Err(err);
                }
            }
        }
    }
    Ok(())
}

/// Feeds the keyboard and renders the screen until the flag is raised or the user asks to
/// quit. A frame is only rendered if the screen or the beep changed since the last one.
pub fn run_surface<S, C>(
    chip: &Mutex<ChipSet>,
    surface: &mut S,
    clock: &C,
    config: &RunnerConfig,
    stop: &StopFlag,
    redraw: &RedrawFlag,
) -> Result<(), DeviceError>
where
    S: DisplayCommands + InputCommands,
    C: Clock,
{
    let mut latch = KeyLatch::new(config.key_hold);
    let mut frame = Ticker::new(period_from_hertz(config.frame_hz), clock.now());
    let mut was_beeping = false;

    while !stop.is_raised() {
        let event = surface.poll_event(config.poll_interval)?;
        let now = clock.now();

        match event {
            Some(InputEvent::Exit) => {
                log::info!("Exit requested.");
                stop.raise();
                break;
            }
            Some(InputEvent::Key(host)) => match map_key(host) {
                Some(key) => {
                    if latch.press(key, now) {
                        log::debug!("Key {:#X} down", key);
                        chip.lock().set_key(key, true);
                    }
                }
                None => log::debug!("The key '{}' is not mapped.", host),
            },
            None => {}
        }

        let released = latch.release_expired(now);
        if !released.is_empty() {
            let mut chip = chip.lock();
            for key in released {
                chip.set_key(key, false);
            }
        }

        if frame.fire(now) {
            // render outside of the lock
            let pending = {
                let chip = chip.lock();
                let beeping = chip.is_beeping();
                let changed = redraw.take() || beeping != was_beeping;
                changed.then(|| (chip.get_display().clone(), beeping))
            };
            if let Some((screen, beeping)) = pending {
                surface.display(&screen, beeping)?;
                was_beeping = beeping;
            }
        }
    }
    Ok(())
}

/// Will run the chip until the user quits or either loop fails.
///
/// The cpu runs on a [`Worker`] thread, the surface is served from the calling thread.
pub fn run<S, C>(
    chip: Arc<Mutex<ChipSet>>,
    surface: &mut S,
    clock: C,
    config: &RunnerConfig,
) -> Result<(), RunError>
where
    S: DisplayCommands + InputCommands,
    C: Clock + Clone + Send + 'static,
{
    log::info!(
        "Running '{}' with {} hz",
        chip.lock().get_name(),
        config.cpu_hz
    );

    let stop = StopFlag::new();
    let redraw = RedrawFlag::new();
    let mut worker = {
        let chip = Arc::clone(&chip);
        let clock = clock.clone();
        let config = config.clone();
        let redraw = redraw.clone();
        Worker::start(stop.clone(), move |stop| {
            run_cpu(&chip, clock, &config, &stop, &redraw)
        })
    };

    let surface_res = run_surface(&chip, surface, &clock, config, &stop, &redraw);
    // either loop ending stops the other one
    let cpu_res = worker.stop();

    surface_res?;
    cpu_outcome(cpu_res)?;
    log::info!("Stopped running '{}'.", chip.lock().get_name());
    Ok(())
}

/// A cpu worker without a result did not return on its own.
fn cpu_outcome(res: Option<Result<(), ProcessError>>) -> Result<(), RunError> {
    match res {
        Some(res) => Ok(res?),
        None => Err(RunError::WorkerPanicked),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        devices::{MockDisplayCommands, MockInputCommands},
        display::Screen,
        resources::Rom,
        timer::{MockClock, SystemClock},
        StackError,
    };

    /// A surface made up of both mocks
    struct TestSurface {
        display: MockDisplayCommands,
        input: MockInputCommands,
    }

    impl DisplayCommands for TestSurface {
        fn display(&mut self, screen: &Screen, beeping: bool) -> Result<(), DeviceError> {
            self.display.display(screen, beeping)
        }
    }

    impl InputCommands for TestSurface {
        fn poll_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, DeviceError> {
            self.input.poll_event(timeout)
        }
    }

    fn surface_with(input: MockInputCommands) -> TestSurface {
        let mut display = MockDisplayCommands::new();
        display.expect_display().returning(|_, _| Ok(()));

        TestSurface { display, input }
    }

    /// will replay the events, then ask to quit
    fn surface(events: Vec<Option<InputEvent>>) -> TestSurface {
        let mut input = MockInputCommands::new();
        let mut events = events.into_iter();
        input
            .expect_poll_event()
            .returning(move |_| Ok(events.next().unwrap_or(Some(InputEvent::Exit))));
        surface_with(input)
    }

    /// every call moves the clock by the given step
    fn stepping_clock(step: Duration) -> MockClock {
        let start = Instant::now();
        let mut calls = 0u32;
        let mut clock = MockClock::new();
        clock.expect_now().returning(move || {
            let now = start + step * calls;
            calls += 1;
            now
        });
        clock
    }

    fn chip(program: &[u8]) -> Mutex<ChipSet> {
        let rom = Rom::new("TEST", program).expect("The program has to fit.");
        Mutex::new(ChipSet::new(rom))
    }

    fn config() -> RunnerConfig {
        RunnerConfig {
            poll_interval: Duration::ZERO,
            ..RunnerConfig::default()
        }
    }

    #[test]
    fn test_keymap() {
        let expected = [
            ('1', 0x1),
            ('2', 0x2),
            ('3', 0x3),
            ('4', 0xC),
            ('q', 0x4),
            ('w', 0x5),
            ('e', 0x6),
            ('r', 0xD),
            ('a', 0x7),
            ('s', 0x8),
            ('d', 0x9),
            ('f', 0xE),
            ('z', 0xA),
            ('x', 0x0),
            ('c', 0xB),
            ('v', 0xF),
        ];
        for (host, key) in expected {
            assert_eq!(map_key(host), Some(key));
            assert_eq!(map_key(host.to_ascii_uppercase()), Some(key));
        }
        assert_eq!(map_key('5'), None);
        assert_eq!(map_key(' '), None);
    }

    #[test]
    fn test_latch_ignores_repeats() {
        let start = Instant::now();
        let mut latch = KeyLatch::new(Duration::from_millis(100));

        assert!(latch.press(0x5, start));
        assert!(!latch.press(0x5, start + Duration::from_millis(60)));
        assert!(latch.is_held(0x5));

        // the repeat did not extend the hold
        let released = latch.release_expired(start + Duration::from_millis(100));
        assert_eq!(released.as_slice(), &[0x5]);
        assert!(!latch.is_held(0x5));

        assert!(latch.press(0x5, start + Duration::from_millis(101)));
    }

    #[test]
    fn test_latch_releases_after_hold() {
        let start = Instant::now();
        let mut latch = KeyLatch::new(Duration::from_millis(100));
        latch.press(0x1, start);
        latch.press(0xA, start + Duration::from_millis(50));

        assert!(latch
            .release_expired(start + Duration::from_millis(99))
            .is_empty());
        assert_eq!(
            latch
                .release_expired(start + Duration::from_millis(120))
                .as_slice(),
            &[0x1]
        );
        assert_eq!(
            latch
                .release_expired(start + Duration::from_millis(150))
                .as_slice(),
            &[0xA]
        );
    }

    #[test]
    fn test_cpu_loop_stops_on_error() {
        // return without a call
        let chip = chip(&[0x00, 0xEE]);
        let stop = StopFlag::new();

        let res = run_cpu(
            &chip,
            stepping_clock(Duration::from_millis(1)),
            &config(),
            &stop,
            &RedrawFlag::new(),
        );

        assert_eq!(res, Err(ProcessError::Stack(StackError::Empty)));
        assert!(stop.is_raised());
    }

    #[test]
    fn test_cpu_loop_honors_stop() {
        let chip = chip(&[0x12, 0x00]);
        let stop = StopFlag::new();
        stop.raise();

        let res = run_cpu(&chip, SystemClock, &config(), &stop, &RedrawFlag::new());
        assert_eq!(res, Ok(()));
        assert_eq!(chip.lock().get_program_counter(), cpu::PROGRAM_COUNTER);
    }

    #[test]
    fn test_surface_latches_keys() {
        let chip = chip(&[0x12, 0x00]);
        let stop = StopFlag::new();
        let mut surface = surface(vec![Some(InputEvent::Key('W')), None]);

        let res = run_surface(
            &chip,
            &mut surface,
            &stepping_clock(Duration::from_millis(10)),
            &config(),
            &stop,
            &RedrawFlag::new(),
        );

        assert!(res.is_ok());
        assert!(stop.is_raised());
        assert!(chip.lock().get_keyboard()[0x5]);
    }

    #[test]
    fn test_surface_releases_keys() {
        let chip = chip(&[0x12, 0x00]);
        let stop = StopFlag::new();
        let mut events = vec![Some(InputEvent::Key('x'))];
        events.extend(std::iter::repeat(None).take(20));
        let mut surface = surface(events);

        let res = run_surface(
            &chip,
            &mut surface,
            &stepping_clock(Duration::from_millis(10)),
            &config(),
            &stop,
            &RedrawFlag::new(),
        );

        assert!(res.is_ok());
        assert!(chip.lock().get_keyboard().iter().all(|key| !key));
    }

    #[test]
    fn test_surface_error_is_returned() {
        let chip = chip(&[0x12, 0x00]);
        let stop = StopFlag::new();
        let mut input = MockInputCommands::new();
        input.expect_poll_event().returning(|_| {
            Err(DeviceError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "gone",
            )))
        });
        let mut surface = surface_with(input);

        let res = run_surface(
            &chip,
            &mut surface,
            &stepping_clock(Duration::from_millis(10)),
            &config(),
            &stop,
            &RedrawFlag::new(),
        );
        assert!(matches!(res, Err(DeviceError::Io(_))));
    }

    #[test]
    fn test_run_returns_chip_error() {
        let chip = Arc::new(chip(&[0x00, 0xEE]));
        // never asks to quit on its own
        let mut input = MockInputCommands::new();
        input.expect_poll_event().returning(|_| Ok(None));
        let mut surface = surface_with(input);

        let res = run(chip, &mut surface, SystemClock, &config());
        assert!(matches!(
            res,
            Err(RunError::Process(ProcessError::Stack(StackError::Empty)))
        ));
    }

    #[test]
    fn test_run_until_exit() {
        let chip = Arc::new(chip(&[0x12, 0x00]));
        let mut surface = surface(vec![None, None, Some(InputEvent::Exit)]);

        let res = run(Arc::clone(&chip), &mut surface, SystemClock, &config());
        assert!(res.is_ok());
    }

    #[test]
    fn test_cpu_loop_raises_redraw() {
        // clear the screen, then fail on a return without a call
        let chip = chip(&[0x00, 0xE0, 0x00, 0xEE]);
        let stop = StopFlag::new();
        let redraw = RedrawFlag::new();
        assert!(redraw.take());
        assert!(!redraw.take());

        let res = run_cpu(
            &chip,
            stepping_clock(Duration::from_millis(1)),
            &config(),
            &stop,
            &redraw,
        );

        assert!(res.is_err());
        assert!(redraw.take());
    }

    #[test]
    fn test_surface_renders_only_changes() {
        let chip = chip(&[0x12, 0x00]);
        let stop = StopFlag::new();
        let redraw = RedrawFlag::new();

        // the frames at 20ms and 40ms fire, only the first one has something to show
        let mut input = MockInputCommands::new();
        let mut events = vec![None, None, None, None].into_iter();
        input
            .expect_poll_event()
            .returning(move |_| Ok(events.next().unwrap_or(Some(InputEvent::Exit))));
        let mut display = MockDisplayCommands::new();
        display.expect_display().times(1).returning(|_, _| Ok(()));
        let mut surface = TestSurface { display, input };

        let res = run_surface(
            &chip,
            &mut surface,
            &stepping_clock(Duration::from_millis(10)),
            &config(),
            &stop,
            &redraw,
        );

        assert!(res.is_ok());
        assert!(!redraw.take());
    }

    #[test]
    fn test_surface_skips_unchanged_frames() {
        let chip = chip(&[0x12, 0x00]);
        let stop = StopFlag::new();
        let redraw = RedrawFlag::new();
        redraw.take();

        let mut input = MockInputCommands::new();
        let mut events = vec![None, None, None, None].into_iter();
        input
            .expect_poll_event()
            .returning(move |_| Ok(events.next().unwrap_or(Some(InputEvent::Exit))));
        let mut display = MockDisplayCommands::new();
        display.expect_display().times(0);
        let mut surface = TestSurface { display, input };

        let res = run_surface(
            &chip,
            &mut surface,
            &stepping_clock(Duration::from_millis(10)),
            &config(),
            &stop,
            &redraw,
        );
        assert!(res.is_ok());
    }

    #[test]
    fn test_panicked_worker_is_an_error() {
        assert!(matches!(cpu_outcome(None), Err(RunError::WorkerPanicked)));
        assert!(matches!(cpu_outcome(Some(Ok(()))), Ok(())));
        assert!(matches!(
            cpu_outcome(Some(Err(ProcessError::Stack(StackError::Full)))),
            Err(RunError::Process(ProcessError::Stack(StackError::Full)))
        ));
    }
}
