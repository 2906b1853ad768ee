//! RowState — per-row expand/collapse state and the image-cycle timer.
//!
//! # States
//! ```text
//!  Collapsed ──tap──▶ Expanded   (arm cycling, schedule first cycle)
//!  Expanded  ──tap──▶ Collapsed  (disarm, image 0, cancel pending cycle)
//!  Expanded  ──fire─▶ Expanded   (random image, schedule next cycle)
//! ```
//!
//! The cycle is a chain of one-shot timers, never a periodic one: each fire
//! schedules the next, so a row has at most one pending timer.  The handle of
//! that timer lives in the row; collapsing or dropping the row aborts it.
//! Fired events carry the timer id, and an event whose id is not the row's
//! pending timer is ignored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// Posted into the UI loop when a row's delayed cycle action fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleFired {
    pub row_key: String,
    pub timer_id: u64,
}

/// Handle of the single pending cycle timer of a row.  Dropping it cancels
/// the timer.
#[derive(Debug)]
pub struct CycleTimer {
    id: u64,
    abort: Option<AbortHandle>,
}

impl CycleTimer {
    pub fn new(id: u64, abort: Option<AbortHandle>) -> Self {
        Self { id, abort }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for CycleTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.abort.take() {
            handle.abort();
        }
    }
}

/// Something that can run a one-shot delayed cycle action for a row.
pub trait CycleScheduler: Send + Sync {
    fn schedule(&self, row_key: &str, delay: Duration) -> CycleTimer;
}

/// Runs each cycle timer as a tokio task that posts `CycleFired` into the
/// UI channel.
pub struct TokioCycleScheduler {
    tx: mpsc::Sender<CycleFired>,
    next_id: AtomicU64,
}

impl TokioCycleScheduler {
    pub fn new(tx: mpsc::Sender<CycleFired>) -> Arc<Self> {
        Arc::new(Self {
            tx,
            next_id: AtomicU64::new(1),
        })
    }
}

impl CycleScheduler for TokioCycleScheduler {
    fn schedule(&self, row_key: &str, delay: Duration) -> CycleTimer {
        let timer_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let tx = self.tx.clone();
        let fired = CycleFired {
            row_key: row_key.to_string(),
            timer_id,
        };
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(fired).await;
        });
        CycleTimer::new(timer_id, Some(handle.abort_handle()))
    }
}

/// Durations that drive a row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowTiming {
    pub cycle: Duration,
    pub rotation: Duration,
}

impl Default for RowTiming {
    fn default() -> Self {
        Self {
            cycle: Duration::from_millis(5000),
            rotation: Duration::from_millis(300),
        }
    }
}

impl From<&movie_proto::config::UiConfig> for RowTiming {
    fn from(ui: &movie_proto::config::UiConfig) -> Self {
        Self {
            cycle: ui.image_cycle(),
            rotation: ui.rotation(),
        }
    }
}

/// Arrow angle animation: eases towards 180° when expanded, 0° when collapsed.
#[derive(Debug, Clone, Copy)]
pub struct Rotation {
    from: f32,
    to: f32,
    started: Instant,
    duration: Duration,
}

impl Rotation {
    pub fn new(duration: Duration, now: Instant) -> Self {
        Self {
            from: 0.0,
            to: 0.0,
            started: now,
            duration,
        }
    }

    pub fn set_target(&mut self, target: f32, now: Instant) {
        self.from = self.angle_at(now);
        self.to = target;
        self.started = now;
    }

    pub fn angle_at(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return self.to;
        }
        let elapsed = now.saturating_duration_since(self.started).as_secs_f32();
        let t = (elapsed / self.duration.as_secs_f32()).clamp(0.0, 1.0);
        // fast out, slow in
        let eased = 1.0 - (1.0 - t) * (1.0 - t);
        self.from + (self.to - self.from) * eased
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        (self.angle_at(now) - self.to).abs() > f32::EPSILON
    }
}

/// Map an arrow angle to a glyph: up at 0°, right half-way, down at 180°.
pub fn arrow_glyph(angle: f32) -> &'static str {
    if angle < 45.0 {
        "▲"
    } else if angle < 135.0 {
        "▶"
    } else {
        "▼"
    }
}

/// Ephemeral UI state of one rendered movie row.
#[derive(Debug)]
pub struct RowState {
    key: String,
    timing: RowTiming,
    expanded: bool,
    image_index: usize,
    cycling_armed: bool,
    pending: Option<CycleTimer>,
    rotation: Rotation,
}

impl RowState {
    pub fn new(key: impl Into<String>, timing: RowTiming) -> Self {
        Self {
            key: key.into(),
            timing,
            expanded: false,
            image_index: 0,
            cycling_armed: false,
            pending: None,
            rotation: Rotation::new(timing.rotation, Instant::now()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn image_index(&self) -> usize {
        self.image_index
    }

    pub fn is_cycling_armed(&self) -> bool {
        self.cycling_armed
    }

    pub fn has_pending_timer(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_timer_id(&self) -> Option<u64> {
        self.pending.as_ref().map(CycleTimer::id)
    }

    pub fn angle(&self, now: Instant) -> f32 {
        self.rotation.angle_at(now)
    }

    pub fn arrow(&self, now: Instant) -> &'static str {
        arrow_glyph(self.angle(now))
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.rotation.is_animating(now)
    }

    /// Header tapped.
    pub fn toggle(&mut self, scheduler: &dyn CycleScheduler) {
        self.toggle_at(scheduler, Instant::now());
    }

    pub fn toggle_at(&mut self, scheduler: &dyn CycleScheduler, now: Instant) {
        self.expanded = !self.expanded;
        if self.expanded {
            self.cycling_armed = true;
            self.rotation.set_target(180.0, now);
            self.schedule_next(scheduler);
        } else {
            self.cycling_armed = false;
            self.image_index = 0;
            self.rotation.set_target(0.0, now);
            self.pending = None;
        }
    }

    /// A delayed cycle action fired.  Returns `true` if the row changed.
    pub fn on_cycle_fired<R: Rng + ?Sized>(
        &mut self,
        timer_id: u64,
        image_count: usize,
        rng: &mut R,
        scheduler: &dyn CycleScheduler,
    ) -> bool {
        if self.pending_timer_id() != Some(timer_id) {
            return false;
        }
        self.pending = None;

        if !self.expanded {
            self.image_index = 0;
            return true;
        }

        self.image_index = if image_count > 1 {
            rng.gen_range(0..image_count)
        } else {
            0
        };
        self.cycling_armed = true;
        self.schedule_next(scheduler);
        true
    }

    /// Clamp the image index after the movie's image list changed.
    pub fn clamp_images(&mut self, image_count: usize) {
        if self.image_index >= image_count.max(1) {
            self.image_index = 0;
        }
    }

    /// Row leaves the visible set: cancel any pending cycle.
    pub fn dispose(&mut self) {
        self.pending = None;
        self.cycling_armed = false;
    }

    fn schedule_next(&mut self, scheduler: &dyn CycleScheduler) {
        if self.expanded && self.cycling_armed && self.pending.is_none() {
            self.pending = Some(scheduler.schedule(&self.key, self.timing.cycle));
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Mutex;

    /// Records schedule calls instead of running timers.
    #[derive(Default)]
    pub(crate) struct ManualScheduler {
        pub calls: Mutex<Vec<(String, u64, Duration)>>,
        next_id: AtomicU64,
    }

    impl ManualScheduler {
        pub fn last_id(&self) -> Option<u64> {
            self.calls.lock().unwrap().last().map(|c| c.1)
        }

        pub fn count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl CycleScheduler for ManualScheduler {
        fn schedule(&self, row_key: &str, delay: Duration) -> CycleTimer {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
            self.calls
                .lock()
                .unwrap()
                .push((row_key.to_string(), id, delay));
            CycleTimer::new(id, None)
        }
    }

    fn row() -> RowState {
        RowState::new("tt1", RowTiming::default())
    }

    #[test]
    fn test_tap_tap_returns_to_initial_state() {
        let sched = ManualScheduler::default();
        let mut r = row();

        r.toggle(&sched);
        assert!(r.is_expanded());
        assert!(r.is_cycling_armed());
        assert!(r.has_pending_timer());
        assert_eq!(sched.count(), 1);
        assert_eq!(sched.calls.lock().unwrap()[0].2, Duration::from_millis(5000));

        r.toggle(&sched);
        assert!(!r.is_expanded());
        assert!(!r.is_cycling_armed());
        assert_eq!(r.image_index(), 0);
        assert!(!r.has_pending_timer());
    }

    #[test]
    fn test_fire_picks_index_in_range_and_reschedules() {
        let sched = ManualScheduler::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut r = row();
        r.toggle(&sched);

        for _ in 0..200 {
            let id = r.pending_timer_id().unwrap();
            assert!(r.on_cycle_fired(id, 3, &mut rng, &sched));
            assert!(r.image_index() < 3);
            assert!(r.is_cycling_armed());
            assert!(r.has_pending_timer());
        }
        assert_eq!(sched.count(), 201);
    }

    #[test]
    fn test_fire_eventually_visits_every_image() {
        let sched = ManualScheduler::default();
        let mut rng = StdRng::seed_from_u64(42);
        let mut r = row();
        r.toggle(&sched);
        let mut seen = [false; 4];
        for _ in 0..200 {
            let id = r.pending_timer_id().unwrap();
            r.on_cycle_fired(id, 4, &mut rng, &sched);
            seen[r.image_index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_single_image_always_zero() {
        let sched = ManualScheduler::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut r = row();
        r.toggle(&sched);
        for _ in 0..20 {
            let id = r.pending_timer_id().unwrap();
            r.on_cycle_fired(id, 1, &mut rng, &sched);
            assert_eq!(r.image_index(), 0);
        }
        let id = r.pending_timer_id().unwrap();
        r.on_cycle_fired(id, 0, &mut rng, &sched);
        assert_eq!(r.image_index(), 0);
    }

    #[test]
    fn test_stale_fire_after_collapse_is_ignored() {
        let sched = ManualScheduler::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut r = row();
        r.toggle(&sched);
        let stale = r.pending_timer_id().unwrap();
        r.toggle(&sched);

        assert!(!r.on_cycle_fired(stale, 3, &mut rng, &sched));
        assert!(!r.is_expanded());
        assert_eq!(r.image_index(), 0);
        assert!(!r.has_pending_timer());
        assert_eq!(sched.count(), 1);
    }

    #[test]
    fn test_old_timer_id_ignored_after_reexpand() {
        let sched = ManualScheduler::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut r = row();
        r.toggle(&sched);
        let first = r.pending_timer_id().unwrap();
        r.toggle(&sched);
        r.toggle(&sched);
        let second = r.pending_timer_id().unwrap();
        assert_ne!(first, second);

        assert!(!r.on_cycle_fired(first, 3, &mut rng, &sched));
        assert_eq!(r.pending_timer_id(), Some(second));
    }

    #[test]
    fn test_end_to_end_three_images() {
        let sched = ManualScheduler::default();
        let mut rng = StdRng::seed_from_u64(99);
        let images = ["a", "b", "c"];
        let mut r = row();

        r.toggle(&sched);
        assert!(r.is_expanded());
        let id = sched.last_id().unwrap();
        r.on_cycle_fired(id, images.len(), &mut rng, &sched);
        assert!((0..3).contains(&r.image_index()));

        r.toggle(&sched);
        assert!(!r.is_expanded());
        assert_eq!(r.image_index(), 0);
        assert!(!r.has_pending_timer());
    }

    #[test]
    fn test_dispose_cancels_pending() {
        let sched = ManualScheduler::default();
        let mut r = row();
        r.toggle(&sched);
        r.dispose();
        assert!(!r.has_pending_timer());
        assert!(!r.is_cycling_armed());
    }

    #[test]
    fn test_clamp_images() {
        let sched = ManualScheduler::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut r = row();
        r.toggle(&sched);
        while r.image_index() == 0 {
            let id = r.pending_timer_id().unwrap();
            r.on_cycle_fired(id, 5, &mut rng, &sched);
        }
        r.clamp_images(1);
        assert_eq!(r.image_index(), 0);
    }

    #[test]
    fn test_rotation_eases_to_target() {
        let t0 = Instant::now();
        let mut rot = Rotation::new(Duration::from_millis(300), t0);
        assert_eq!(rot.angle_at(t0), 0.0);

        rot.set_target(180.0, t0);
        let mid = rot.angle_at(t0 + Duration::from_millis(150));
        assert!(mid > 90.0 && mid < 180.0, "ease-out is past half-way: {}", mid);
        assert_eq!(rot.angle_at(t0 + Duration::from_millis(300)), 180.0);
        assert!(rot.is_animating(t0 + Duration::from_millis(100)));
        assert!(!rot.is_animating(t0 + Duration::from_secs(1)));

        // reversing mid-flight starts from the current angle
        let t1 = t0 + Duration::from_millis(150);
        rot.set_target(0.0, t1);
        assert!((rot.angle_at(t1) - mid).abs() < 0.01);
        assert_eq!(rot.angle_at(t1 + Duration::from_millis(300)), 0.0);
    }

    #[test]
    fn test_zero_duration_rotation_snaps() {
        let t0 = Instant::now();
        let mut rot = Rotation::new(Duration::ZERO, t0);
        rot.set_target(180.0, t0);
        assert_eq!(rot.angle_at(t0), 180.0);
        assert_eq!(arrow_glyph(rot.angle_at(t0)), "▼");
        assert_eq!(arrow_glyph(0.0), "▲");
        assert_eq!(arrow_glyph(90.0), "▶");
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_fires_after_delay() {
        let (tx, mut rx) = mpsc::channel(8);
        let sched = TokioCycleScheduler::new(tx);
        let mut r = row();
        r.toggle(sched.as_ref());
        let expected = r.pending_timer_id().unwrap();

        let start = tokio::time::Instant::now();
        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.row_key, "tt1");
        assert_eq!(fired.timer_id, expected);
        assert!(start.elapsed() >= Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_collapse_cancels() {
        let (tx, mut rx) = mpsc::channel(8);
        let sched = TokioCycleScheduler::new(tx);
        let mut r = row();
        r.toggle(sched.as_ref());
        r.toggle(sched.as_ref());

        let waited = tokio::time::timeout(Duration::from_secs(20), rx.recv()).await;
        assert!(waited.is_err(), "cancelled timer must not fire");
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_drop_cancels() {
        let (tx, mut rx) = mpsc::channel(8);
        let sched = TokioCycleScheduler::new(tx);
        {
            let mut r = row();
            r.toggle(sched.as_ref());
        }
        let waited = tokio::time::timeout(Duration::from_secs(20), rx.recv()).await;
        assert!(waited.is_err(), "dropped row must not leave a timer behind");
    }
}
