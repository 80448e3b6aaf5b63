use crate::sched::{Callback, Clock, Firing, FrameScheduler, Token};
use std::io;

pub const EDGE_LEFT: f64 = 0.05;
pub const EDGE_RIGHT: f64 = 0.95;
pub const CENTER: f64 = 0.5;

pub const LEG_DURATION_MS: u64 = 8000;
pub const EXTREME_PAUSE_MS: u64 = 2000;
pub const CENTER_PAUSE_MS: u64 = 1000;
pub const DEFAULT_TARGET_ROUNDS: u32 = 10;

/// Decorative ball faces, advanced once per second of session time
pub const BALL_GLYPHS: [char; 4] = ['◐', '◓', '◑', '◒'];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationPhase {
    Idle,
    MovingOut,
    PausedAtExtreme,
    MovingBack,
    PausedAtCenter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GazeDirection {
    Left,
    Right,
}

impl GazeDirection {
    /// Extreme position for this direction (5% inset from the screen edge)
    pub fn edge(&self) -> f64 {
        match self {
            GazeDirection::Left => EDGE_LEFT,
            GazeDirection::Right => EDGE_RIGHT,
        }
    }
}

/// Sink for completed training, owned by the persistence layer.
/// `record_completion` must be called exactly once per naturally completed
/// session, never on reset.
pub trait ProgressStore {
    fn record_completion(&mut self, count: u32) -> io::Result<()>;
    fn today_completed_count(&self) -> u32;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GazeSession {
    pub target_rounds: u32,
    pub completed_rounds: u32,
    pub direction: GazeDirection,
    pub position: f64,
}

impl Default for GazeSession {
    fn default() -> Self {
        Self {
            target_rounds: 0,
            completed_rounds: 0,
            direction: GazeDirection::Left,
            position: CENTER,
        }
    }
}

/// Drives the guided eye-gaze exercise: a ball moves from the center to one
/// edge and back, once per round, with fixed pauses between legs and rounds.
///
/// The controller owns phase, position and round counters exclusively; the
/// UI only reads them. All motion is driven by the injected clock and
/// scheduler, so a host tick loop (or a test) advances it deterministically
/// via [`pump`](Self::pump).
#[derive(Debug)]
pub struct GazeAssistController<C: Clock, S: FrameScheduler, P: ProgressStore> {
    clock: C,
    sched: S,
    store: P,
    phase: AnimationPhase,
    session: GazeSession,
    // Bumped on every start/reset; firings from older generations are stale
    generation: u64,
    leg_start_ms: u64,
    leg_from: f64,
    leg_to: f64,
    frame_token: Option<Token>,
    pause_token: Option<Token>,
    session_start_ms: u64,
    glyph_index: usize,
    completed_today: u32,
}

impl<C: Clock, S: FrameScheduler, P: ProgressStore> GazeAssistController<C, S, P> {
    pub fn new(clock: C, sched: S, store: P) -> Self {
        let completed_today = store.today_completed_count();
        Self {
            clock,
            sched,
            store,
            phase: AnimationPhase::Idle,
            session: GazeSession::default(),
            generation: 0,
            leg_start_ms: 0,
            leg_from: CENTER,
            leg_to: CENTER,
            frame_token: None,
            pause_token: None,
            session_start_ms: 0,
            glyph_index: 0,
            completed_today,
        }
    }

    /// Begin a new session. Ignored while a session is already running.
    pub fn start(&mut self, target_rounds: u32, direction: GazeDirection) {
        if self.phase != AnimationPhase::Idle {
            return;
        }
        self.generation += 1;
        self.session = GazeSession {
            target_rounds: target_rounds.max(1),
            completed_rounds: 0,
            direction,
            position: CENTER,
        };
        self.session_start_ms = self.clock.now_ms();
        self.glyph_index = 0;
        self.phase = AnimationPhase::MovingOut;
        self.begin_leg(CENTER, direction.edge());
    }

    /// Cancel whatever is in flight and return to a clean idle state.
    /// Safe to call in any phase, any number of times. Lifetime/today
    /// counters live in the store and are left untouched.
    pub fn reset(&mut self) {
        self.generation += 1;
        if let Some(token) = self.frame_token.take() {
            self.sched.cancel(token);
        }
        if let Some(token) = self.pause_token.take() {
            self.sched.cancel(token);
        }
        self.phase = AnimationPhase::Idle;
        self.session = GazeSession::default();
        self.glyph_index = 0;
    }

    /// Drain due callbacks from the scheduler and apply them. The host
    /// calls this once per tick.
    pub fn pump(&mut self) {
        for firing in self.sched.drain_due() {
            self.dispatch(firing);
        }
    }

    /// Deliver one callback. A firing scheduled under an older generation
    /// (its session was reset after it was queued) is discarded before any
    /// state is touched.
    pub fn dispatch(&mut self, firing: Firing) {
        if firing.generation != self.generation {
            return;
        }
        match firing.callback {
            Callback::Frame => self.on_frame(),
            Callback::PhaseTimer => self.on_phase_timer(),
        }
    }

    fn begin_leg(&mut self, from: f64, to: f64) {
        self.leg_start_ms = self.clock.now_ms();
        self.leg_from = from;
        self.leg_to = to;
        self.session.position = from;
        self.frame_token = Some(self.sched.request_frame(Callback::Frame, self.generation));
    }

    fn on_frame(&mut self) {
        let now = self.clock.now_ms();
        self.advance_glyph(now);

        let elapsed = now.saturating_sub(self.leg_start_ms);
        let progress = (elapsed as f64 / LEG_DURATION_MS as f64).min(1.0);
        self.session.position = self.leg_from + progress * (self.leg_to - self.leg_from);

        if progress < 1.0 {
            self.frame_token = Some(self.sched.request_frame(Callback::Frame, self.generation));
            return;
        }
        self.frame_token = None;

        match self.phase {
            AnimationPhase::MovingOut => {
                self.phase = AnimationPhase::PausedAtExtreme;
                self.pause_token = Some(self.sched.after(
                    EXTREME_PAUSE_MS,
                    Callback::PhaseTimer,
                    self.generation,
                ));
            }
            AnimationPhase::MovingBack => {
                self.session.completed_rounds += 1;
                self.completed_today += 1;

                if self.session.completed_rounds < self.session.target_rounds {
                    self.phase = AnimationPhase::PausedAtCenter;
                    self.pause_token = Some(self.sched.after(
                        CENTER_PAUSE_MS,
                        Callback::PhaseTimer,
                        self.generation,
                    ));
                } else {
                    let _ = self.store.record_completion(self.session.completed_rounds);
                    self.phase = AnimationPhase::Idle;
                }
            }
            _ => {}
        }
    }

    fn on_phase_timer(&mut self) {
        self.pause_token = None;
        let now = self.clock.now_ms();
        self.advance_glyph(now);

        match self.phase {
            AnimationPhase::PausedAtExtreme => {
                self.phase = AnimationPhase::MovingBack;
                self.begin_leg(self.session.direction.edge(), CENTER);
            }
            AnimationPhase::PausedAtCenter => {
                self.phase = AnimationPhase::MovingOut;
                self.begin_leg(CENTER, self.session.direction.edge());
            }
            _ => {}
        }
    }

    fn advance_glyph(&mut self, now: u64) {
        let secs = now.saturating_sub(self.session_start_ms) / 1000;
        self.glyph_index = secs as usize % BALL_GLYPHS.len();
    }

    pub fn phase(&self) -> AnimationPhase {
        self.phase
    }

    pub fn position(&self) -> f64 {
        self.session.position
    }

    pub fn direction(&self) -> GazeDirection {
        self.session.direction
    }

    pub fn completed_rounds(&self) -> u32 {
        self.session.completed_rounds
    }

    pub fn target_rounds(&self) -> u32 {
        self.session.target_rounds
    }

    pub fn completed_today(&self) -> u32 {
        self.completed_today
    }

    pub fn glyph(&self) -> char {
        BALL_GLYPHS[self.glyph_index]
    }

    pub fn is_running(&self) -> bool {
        self.phase != AnimationPhase::Idle
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn store(&self) -> &P {
        &self.store
    }
}

/// Free-form round-count input: anything that does not parse to a positive
/// integer falls back to the default of 10.
pub fn parse_target_rounds(raw: &str) -> u32 {
    match raw.trim().parse::<u32>() {
        Ok(n) if n >= 1 => n,
        _ => DEFAULT_TARGET_ROUNDS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched::{ManualClock, TickScheduler};
    use crate::store::MemoryProgress;
    use assert_matches::assert_matches;

    type TestController =
        GazeAssistController<ManualClock, TickScheduler<ManualClock>, MemoryProgress>;

    fn controller() -> (ManualClock, TestController) {
        controller_with_store(MemoryProgress::default())
    }

    fn controller_with_store(store: MemoryProgress) -> (ManualClock, TestController) {
        let clock = ManualClock::new();
        let sched = TickScheduler::new(clock.clone());
        let ctl = GazeAssistController::new(clock.clone(), sched, store);
        (clock, ctl)
    }

    // One pump per step, which matches the self-chained frame loop: each
    // drain hands back at most one Frame for the active leg.
    fn run_until_idle(clock: &ManualClock, ctl: &mut TestController, step_ms: u64, max_steps: u32) {
        for _ in 0..max_steps {
            if !ctl.is_running() {
                return;
            }
            clock.advance(step_ms);
            ctl.pump();
        }
        panic!("controller did not reach Idle within {max_steps} steps");
    }

    #[test]
    fn starts_in_a_clean_idle_state() {
        let (_clock, ctl) = controller();
        assert_matches!(ctl.phase(), AnimationPhase::Idle);
        assert_eq!(ctl.position(), CENTER);
        assert_eq!(ctl.completed_rounds(), 0);
        assert_eq!(ctl.glyph(), BALL_GLYPHS[0]);
    }

    #[test]
    fn start_enters_moving_out_from_center() {
        let (_clock, mut ctl) = controller();
        ctl.start(3, GazeDirection::Left);
        assert_matches!(ctl.phase(), AnimationPhase::MovingOut);
        assert_eq!(ctl.position(), CENTER);
        assert_eq!(ctl.target_rounds(), 3);
    }

    #[test]
    fn outbound_leg_interpolates_linearly_toward_the_left_edge() {
        let (clock, mut ctl) = controller();
        ctl.start(3, GazeDirection::Left);

        clock.advance(4000);
        ctl.pump();
        assert!((ctl.position() - 0.275).abs() < 1e-9);

        clock.advance(4000);
        ctl.pump();
        assert_eq!(ctl.position(), EDGE_LEFT);
        assert_matches!(ctl.phase(), AnimationPhase::PausedAtExtreme);
    }

    #[test]
    fn return_leg_mirrors_the_outbound_leg() {
        let (clock, mut ctl) = controller();
        ctl.start(3, GazeDirection::Left);

        // Out: 8s leg, then the 2s extreme pause
        clock.advance(8000);
        ctl.pump();
        clock.advance(2000);
        ctl.pump();
        assert_matches!(ctl.phase(), AnimationPhase::MovingBack);

        // 4s into the return leg: halfway between edge and center
        clock.advance(4000);
        ctl.pump();
        assert!((ctl.position() - 0.275).abs() < 1e-9);
    }

    #[test]
    fn rightward_session_uses_the_right_edge() {
        let (clock, mut ctl) = controller();
        ctl.start(1, GazeDirection::Right);

        clock.advance(4000);
        ctl.pump();
        assert!((ctl.position() - 0.725).abs() < 1e-9);

        clock.advance(4000);
        ctl.pump();
        assert_eq!(ctl.position(), EDGE_RIGHT);
    }

    #[test]
    fn position_stays_within_the_inset_edges() {
        let (clock, mut ctl) = controller();
        ctl.start(2, GazeDirection::Left);

        let mut last_phase = ctl.phase();
        for _ in 0..500 {
            clock.advance(100);
            ctl.pump();
            let p = ctl.position();
            assert!((EDGE_LEFT..=EDGE_RIGHT).contains(&p), "position {p} out of bounds");
            last_phase = ctl.phase();
            if !ctl.is_running() {
                break;
            }
        }
        assert_matches!(last_phase, AnimationPhase::Idle);
    }

    #[test]
    fn motion_is_monotonic_within_a_leg() {
        let (clock, mut ctl) = controller();
        ctl.start(1, GazeDirection::Left);

        let mut prev = ctl.position();
        while ctl.phase() == AnimationPhase::MovingOut {
            clock.advance(250);
            ctl.pump();
            assert!(ctl.position() <= prev, "outbound leg moved away from the edge");
            prev = ctl.position();
        }
        assert_eq!(prev, EDGE_LEFT);
    }

    #[test]
    fn full_session_records_completion_once() {
        let store = MemoryProgress::default();
        let handle = store.clone();
        let (clock, mut ctl) = controller_with_store(store);
        ctl.start(2, GazeDirection::Right);

        run_until_idle(&clock, &mut ctl, 500, 200);

        assert_eq!(ctl.completed_rounds(), 2);
        assert_matches!(ctl.phase(), AnimationPhase::Idle);
        // Exactly one persisted session, carrying the full round count
        assert_eq!(handle.completions(), vec![2]);
    }

    #[test]
    fn single_round_session_full_cycle() {
        let store = MemoryProgress::with_today(5);
        let handle = store.clone();
        let (clock, mut ctl) = controller_with_store(store);
        assert_eq!(ctl.completed_today(), 5);

        ctl.start(1, GazeDirection::Right);
        run_until_idle(&clock, &mut ctl, 500, 100);

        assert_eq!(ctl.completed_rounds(), 1);
        assert_eq!(ctl.completed_today(), 6);
        assert_matches!(ctl.phase(), AnimationPhase::Idle);
        assert_eq!(handle.completions(), vec![1]);
    }

    #[test]
    fn reset_before_completion_never_touches_the_store() {
        let store = MemoryProgress::default();
        let handle = store.clone();
        let (clock, mut ctl) = controller_with_store(store);

        ctl.start(1, GazeDirection::Left);
        // Deep into the return leg, one frame short of finishing
        clock.advance(8000);
        ctl.pump();
        clock.advance(2000);
        ctl.pump();
        clock.advance(7900);
        ctl.pump();

        ctl.reset();
        assert!(handle.completions().is_empty());
    }

    #[test]
    fn today_counter_advances_per_round_not_per_session() {
        let (clock, mut ctl) = controller();
        ctl.start(3, GazeDirection::Left);

        // First round: 8s out + 2s pause + 8s back
        clock.advance(8000);
        ctl.pump();
        clock.advance(2000);
        ctl.pump();
        clock.advance(8000);
        ctl.pump();

        assert_eq!(ctl.completed_rounds(), 1);
        assert_eq!(ctl.completed_today(), 1);
        assert_matches!(ctl.phase(), AnimationPhase::PausedAtCenter);
    }

    #[test]
    fn reset_is_idempotent_and_matches_a_fresh_controller() {
        let (clock, mut ctl) = controller();
        ctl.start(4, GazeDirection::Right);
        clock.advance(3000);
        ctl.pump();

        ctl.reset();
        ctl.reset();

        assert_matches!(ctl.phase(), AnimationPhase::Idle);
        assert_eq!(ctl.position(), CENTER);
        assert_eq!(ctl.completed_rounds(), 0);
        assert_eq!(ctl.glyph(), BALL_GLYPHS[0]);

        // Reset with nothing running is also fine
        let (_c, mut fresh) = controller();
        fresh.reset();
        assert_matches!(fresh.phase(), AnimationPhase::Idle);
        assert_eq!(fresh.position(), CENTER);
    }

    #[test]
    fn stale_frame_after_reset_is_discarded() {
        let (clock, mut ctl) = controller();
        ctl.start(2, GazeDirection::Left);
        clock.advance(2000);
        ctl.pump();

        let stale = Firing {
            token: 99,
            callback: Callback::Frame,
            generation: ctl.generation(),
        };
        ctl.reset();

        // The firing was queued before reset and is delivered afterwards
        clock.advance(1000);
        ctl.dispatch(stale);

        assert_matches!(ctl.phase(), AnimationPhase::Idle);
        assert_eq!(ctl.position(), CENTER);
        assert_eq!(ctl.completed_rounds(), 0);
    }

    #[test]
    fn stale_phase_timer_after_reset_is_discarded() {
        let (clock, mut ctl) = controller();
        ctl.start(1, GazeDirection::Left);
        clock.advance(8000);
        ctl.pump();
        assert_matches!(ctl.phase(), AnimationPhase::PausedAtExtreme);

        let stale = Firing {
            token: 98,
            callback: Callback::PhaseTimer,
            generation: ctl.generation(),
        };
        ctl.reset();
        ctl.dispatch(stale);

        assert_matches!(ctl.phase(), AnimationPhase::Idle);
    }

    #[test]
    fn queued_callbacks_never_fire_after_reset() {
        let (clock, mut ctl) = controller();
        ctl.start(1, GazeDirection::Left);
        clock.advance(8000);
        ctl.pump(); // queues the extreme-pause timer

        ctl.reset();
        clock.advance(60_000);
        ctl.pump();

        assert_matches!(ctl.phase(), AnimationPhase::Idle);
        assert_eq!(ctl.completed_rounds(), 0);
    }

    #[test]
    fn start_while_running_is_ignored() {
        let (clock, mut ctl) = controller();
        ctl.start(5, GazeDirection::Left);
        clock.advance(4000);
        ctl.pump();
        let position = ctl.position();

        ctl.start(99, GazeDirection::Right);

        assert_eq!(ctl.target_rounds(), 5);
        assert_eq!(ctl.direction(), GazeDirection::Left);
        assert_eq!(ctl.position(), position);
    }

    #[test]
    fn direction_is_fixed_for_the_whole_session() {
        let (clock, mut ctl) = controller();
        ctl.start(2, GazeDirection::Right);
        run_until_idle(&clock, &mut ctl, 1000, 100);
        assert_eq!(ctl.direction(), GazeDirection::Right);
    }

    #[test]
    fn glyph_cycles_once_per_second_and_survives_rounds() {
        let (clock, mut ctl) = controller();
        ctl.start(2, GazeDirection::Left);
        assert_eq!(ctl.glyph(), BALL_GLYPHS[0]);

        clock.advance(1000);
        ctl.pump();
        assert_eq!(ctl.glyph(), BALL_GLYPHS[1]);

        clock.advance(2000);
        ctl.pump();
        assert_eq!(ctl.glyph(), BALL_GLYPHS[3]);

        // Wraps around and keeps going across phase boundaries
        clock.advance(1000);
        ctl.pump();
        assert_eq!(ctl.glyph(), BALL_GLYPHS[0]);
    }

    #[test]
    fn target_rounds_parsing_defaults_to_ten() {
        assert_eq!(parse_target_rounds("25"), 25);
        assert_eq!(parse_target_rounds("  7 "), 7);
        assert_eq!(parse_target_rounds("0"), DEFAULT_TARGET_ROUNDS);
        assert_eq!(parse_target_rounds("-3"), DEFAULT_TARGET_ROUNDS);
        assert_eq!(parse_target_rounds("ten"), DEFAULT_TARGET_ROUNDS);
        assert_eq!(parse_target_rounds(""), DEFAULT_TARGET_ROUNDS);
    }

    #[test]
    fn zero_target_is_clamped_to_one_round() {
        let (clock, mut ctl) = controller();
        ctl.start(0, GazeDirection::Left);
        assert_eq!(ctl.target_rounds(), 1);
        run_until_idle(&clock, &mut ctl, 1000, 100);
        assert_eq!(ctl.completed_rounds(), 1);
    }
}
