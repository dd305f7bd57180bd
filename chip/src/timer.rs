use {
    num_traits::{PrimInt, Unsigned},
    std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread::{self, JoinHandle},
        time::{Duration, Instant},
    },
};

/// Represents a timer inside of the chip
/// infrastruture, it will count down to
/// zero from what ever number given, once
/// per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer<T> {
    value: T,
}

impl<T> Timer<T>
where
    T: PrimInt + Unsigned,
{
    /// Will create a new timer with the given value.
    pub fn new(value: T) -> Self {
        Self { value }
    }

    /// Will set the value from which the timer shall count down from.
    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }

    /// Will get the value that the counter is currently at.
    pub fn get_value(&self) -> T {
        self.value
    }

    /// Checks if the timer is still counting down.
    pub fn is_active(&self) -> bool {
        !self.value.is_zero()
    }

    /// Will count down by one, a timer at zero stays there.
    pub fn tick(&mut self) {
        if self.is_active() {
            self.value = self.value - T::one();
        }
    }
}

impl<T> Default for Timer<T>
where
    T: PrimInt + Unsigned,
{
    fn default() -> Self {
        Self::new(T::zero())
    }
}

/// The two hardware timers of the chip.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timers {
    /// Delay timer: This timer is intended to be used for timing the events of games. Its value
    /// can be set and read.
    pub delay: Timer<u8>,
    /// Sound timer: This timer is used for sound effects. When its value is nonzero, a beeping
    /// sound is made.
    pub sound: Timer<u8>,
}

impl Timers {
    /// Both timers count down independently.
    pub fn tick(&mut self) {
        self.delay.tick();
        self.sound.tick();
    }

    /// The only signal for the surface to emit a tone.
    pub fn is_beeping(&self) -> bool {
        self.sound.is_active()
    }
}

#[cfg_attr(test, mockall::automock)]
/// A monotonic time source, split out so the scheduling can be tested
/// without waiting.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The clock of the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Converts a frequency into the length of a single period.
pub fn period_from_hertz(hertz: u64) -> Duration {
    const NANOS_PER_SEC: u64 = 1_000_000_000;
    Duration::from_nanos(NANOS_PER_SEC / hertz.max(1))
}

/// A periodic task that fires once a full period has passed since it last
/// fired.
#[derive(Debug, Clone, Copy)]
pub struct Ticker {
    period: Duration,
    last: Instant,
}

impl Ticker {
    pub fn new(period: Duration, start: Instant) -> Self {
        Self {
            period,
            last: start,
        }
    }

    /// Fires at most once per call. The mark moves by exactly one period
    /// so a late poll is made up by the following ones.
    pub fn fire(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) >= self.period {
            self.last += self.period;
            true
        } else {
            false
        }
    }
}

/// What fired during a single [`Scheduler::poll`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    /// A cpu cycle is due
    pub cpu: bool,
    /// A timer tick is due
    pub timer: bool,
}

/// Drives the cpu cycles and the timer ticks at their own rates from a
/// single clock.
pub struct Scheduler<C> {
    clock: C,
    cpu: Ticker,
    timer: Ticker,
}

impl<C> Scheduler<C>
where
    C: Clock,
{
    pub fn new(clock: C, cpu_hertz: u64, timer_hertz: u64) -> Self {
        let start = clock.now();
        Self {
            cpu: Ticker::new(period_from_hertz(cpu_hertz), start),
            timer: Ticker::new(period_from_hertz(timer_hertz), start),
            clock,
        }
    }

    pub fn poll(&mut self) -> Fired {
        let now = self.clock.now();
        Fired {
            cpu: self.cpu.fire(now),
            timer: self.timer.fire(now),
        }
    }
}

/// A cooperative stop signal shared between the loops.
#[derive(Debug, Default, Clone)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        StopFlag::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Runs a job on a second thread until it returns or the stop flag is
/// raised.
pub struct Worker<R> {
    /// Contains the actuall thread, that is running.
    thread: Option<JoinHandle<R>>,
    /// Shared with the job, so it knows when to quit.
    stop: StopFlag,
}

impl<R> Worker<R>
where
    R: Send + 'static,
{
    /// Will start the job, the job is expected to poll the flag it gets
    /// handed.
    pub fn start<F>(stop: StopFlag, job: F) -> Self
    where
        F: FnOnce(StopFlag) -> R + Send + 'static,
    {
        let flag = stop.clone();
        let thread = thread::spawn(move || job(flag));
        Self {
            thread: Some(thread),
            stop,
        }
    }

    /// Will stop the worker and hand back what the job returned, `None` if
    /// it panicked or was already stopped.
    pub fn stop(&mut self) -> Option<R> {
        self.stop.raise();
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(res) => Some(res),
            Err(_) => {
                log::error!("The worker thread panicked.");
                None
            }
        }
    }

    /// Checks if the thread is alive.
    pub fn is_alive(&self) -> bool {
        self.thread
            .as_ref()
            .map_or(false, |thread| !thread.is_finished())
    }
}

impl<R> Drop for Worker<R> {
    /// Will drop the worker
    fn drop(&mut self) {
        self.stop.raise();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
