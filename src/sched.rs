use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Cancellation handle for a scheduled callback
pub type Token = u64;

/// What the controller wants invoked when a scheduled entry fires
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Callback {
    Frame,
    PhaseTimer,
}

/// A due callback, tagged with the generation it was scheduled under.
/// Firings are plain values so a stale one can still be delivered (and
/// discarded) after the session that scheduled it was reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Firing {
    pub token: Token,
    pub callback: Callback,
    pub generation: u64,
}

/// Monotonic time source, millisecond resolution
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Production clock anchored at process-local origin
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Manually advanced clock for unit tests. Clones share the same time cell
/// so a controller and its scheduler observe the same instant.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// Deferred-callback facility injected into the animation controller.
///
/// `request_frame` entries are due at the next drain (host frame cadence);
/// `after` entries are due once the delay has elapsed. The host drives the
/// whole thing by draining due firings once per tick.
pub trait FrameScheduler {
    fn request_frame(&mut self, callback: Callback, generation: u64) -> Token;
    fn after(&mut self, delay_ms: u64, callback: Callback, generation: u64) -> Token;
    fn cancel(&mut self, token: Token);
    fn drain_due(&mut self) -> Vec<Firing>;
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    token: Token,
    // None = due at the next drain, Some(t) = due once now_ms() >= t
    due_ms: Option<u64>,
    callback: Callback,
    generation: u64,
}

/// Scheduler backed by the host tick loop: entries are plain data, no
/// threads or timers of its own.
#[derive(Debug)]
pub struct TickScheduler<C: Clock> {
    clock: C,
    entries: Vec<Entry>,
    next_token: Token,
}

impl<C: Clock> TickScheduler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            entries: Vec::new(),
            next_token: 1,
        }
    }

    fn push(&mut self, due_ms: Option<u64>, callback: Callback, generation: u64) -> Token {
        let token = self.next_token;
        self.next_token += 1;
        self.entries.push(Entry {
            token,
            due_ms,
            callback,
            generation,
        });
        token
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }
}

impl<C: Clock> FrameScheduler for TickScheduler<C> {
    fn request_frame(&mut self, callback: Callback, generation: u64) -> Token {
        self.push(None, callback, generation)
    }

    fn after(&mut self, delay_ms: u64, callback: Callback, generation: u64) -> Token {
        let due = self.clock.now_ms() + delay_ms;
        self.push(Some(due), callback, generation)
    }

    fn cancel(&mut self, token: Token) {
        self.entries.retain(|e| e.token != token);
    }

    fn drain_due(&mut self) -> Vec<Firing> {
        let now = self.clock.now_ms();
        let mut due = Vec::new();
        self.entries.retain(|e| {
            let ready = match e.due_ms {
                None => true,
                Some(t) => now >= t,
            };
            if ready {
                due.push(Firing {
                    token: e.token,
                    callback: e.callback,
                    generation: e.generation,
                });
            }
            !ready
        });
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_entries_fire_on_next_drain() {
        let clock = ManualClock::new();
        let mut sched = TickScheduler::new(clock.clone());

        sched.request_frame(Callback::Frame, 1);
        let due = sched.drain_due();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].callback, Callback::Frame);
        assert_eq!(due[0].generation, 1);
        assert!(sched.drain_due().is_empty());
    }

    #[test]
    fn delayed_entries_wait_for_the_clock() {
        let clock = ManualClock::new();
        let mut sched = TickScheduler::new(clock.clone());

        sched.after(500, Callback::PhaseTimer, 3);
        assert!(sched.drain_due().is_empty());

        clock.advance(499);
        assert!(sched.drain_due().is_empty());

        clock.advance(1);
        let due = sched.drain_due();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].callback, Callback::PhaseTimer);
    }

    #[test]
    fn cancel_removes_a_pending_entry() {
        let clock = ManualClock::new();
        let mut sched = TickScheduler::new(clock.clone());

        let t1 = sched.request_frame(Callback::Frame, 1);
        let t2 = sched.after(100, Callback::PhaseTimer, 1);
        sched.cancel(t1);
        sched.cancel(t2);

        clock.advance(200);
        assert!(sched.drain_due().is_empty());
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn cancel_of_unknown_token_is_a_noop() {
        let clock = ManualClock::new();
        let mut sched = TickScheduler::new(clock);
        sched.request_frame(Callback::Frame, 1);
        sched.cancel(999);
        assert_eq!(sched.pending(), 1);
    }

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(250);
        assert_eq!(other.now_ms(), 250);
    }
}
