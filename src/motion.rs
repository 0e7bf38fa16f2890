//! Movement interpolation and direction bucketing

use std::f64::consts::PI;
use std::time::Duration;

/// Eased progress with a slow start and stop.
pub fn swing(p: f64) -> f64 {
    let p = p.clamp(0.0, 1.0);
    0.5 - (p * PI).cos() / 2.0
}

/// Timed positional interpolation between two points.
#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    from: (f64, f64),
    to: (f64, f64),
    duration: Duration,
    elapsed: Duration,
}

impl Tween {
    pub fn new(from: (f64, f64), to: (f64, f64), duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
        }
    }

    /// Advance by `delta` and return the current position.
    pub fn update(&mut self, delta: Duration) -> (f64, f64) {
        self.elapsed = (self.elapsed + delta).min(self.duration);
        self.position()
    }

    /// Current eased position.
    pub fn position(&self) -> (f64, f64) {
        if self.duration.is_zero() {
            return self.to;
        }
        let p = self.elapsed.as_secs_f64() / self.duration.as_secs_f64();
        let eased = swing(p);
        (
            self.from.0 + (self.to.0 - self.from.0) * eased,
            self.from.1 + (self.to.1 - self.from.1) * eased,
        )
    }

    pub fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn target(&self) -> (f64, f64) {
        self.to
    }
}

/// Direction bucket from the agent's center toward a target point.
///
/// `Top` is the defensive default for a draw that lands outside every
/// bucket; no directional animation carries that suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Right,
    Up,
    Left,
    Down,
    Top,
}

impl Direction {
    /// Bucket the angle from `center` to `target` (surface coordinates,
    /// y growing downward) into octants: `[-45, 45)` is `Right`, `[45, 135)`
    /// is `Up`, `[135, 180]` and `[-180, -135)` are `Left`, `[-135, -45)` is
    /// `Down`.
    pub fn between(center: (f64, f64), target: (f64, f64)) -> Self {
        let dy = center.1 - target.1;
        let dx = target.0 - center.0;
        let r = (180.0 * dy.atan2(dx) / PI).round();

        if (-45.0..45.0).contains(&r) {
            Direction::Right
        } else if (45.0..135.0).contains(&r) {
            Direction::Up
        } else if (135.0..=180.0).contains(&r) || (-180.0..-135.0).contains(&r) {
            Direction::Left
        } else if (-135.0..-45.0).contains(&r) {
            Direction::Down
        } else {
            Direction::Top
        }
    }

    /// Suffix used to form animation names such as `MoveRight`.
    pub fn suffix(self) -> &'static str {
        match self {
            Direction::Right => "Right",
            Direction::Up => "Up",
            Direction::Left => "Left",
            Direction::Down => "Down",
            Direction::Top => "Top",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_swing_endpoints_and_midpoint() {
        assert!((swing(0.0) - 0.0).abs() < 1e-12);
        assert!((swing(0.5) - 0.5).abs() < 1e-12);
        assert!((swing(1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_swing_clamps_out_of_range() {
        assert_eq!(swing(-1.0), swing(0.0));
        assert_eq!(swing(2.0), swing(1.0));
    }

    #[test]
    fn test_tween_reaches_target() {
        let mut tween = Tween::new((0.0, 0.0), (100.0, 50.0), Duration::from_millis(1000));
        assert!(!tween.finished());

        tween.update(Duration::from_millis(500));
        let (x, y) = tween.position();
        assert!((x - 50.0).abs() < 1e-9);
        assert!((y - 25.0).abs() < 1e-9);

        tween.update(Duration::from_millis(500));
        assert!(tween.finished());
        assert_eq!(tween.position(), (100.0, 50.0));

        // Overshoot stays pinned at the target.
        tween.update(Duration::from_millis(500));
        assert_eq!(tween.position(), (100.0, 50.0));
    }

    #[test]
    fn test_tween_eases_slow_start() {
        let mut tween = Tween::new((0.0, 0.0), (100.0, 0.0), Duration::from_millis(1000));
        let (x, _) = tween.update(Duration::from_millis(100));
        // At 10% of the time only ~2.4% of the distance is covered.
        assert!(x < 10.0);
    }

    #[test]
    fn test_zero_duration_tween_is_done() {
        let tween = Tween::new((0.0, 0.0), (10.0, 10.0), Duration::ZERO);
        assert!(tween.finished());
        assert_eq!(tween.position(), (10.0, 10.0));
    }

    #[rstest]
    #[case((100.0, 100.0), (100.0, 0.0), Direction::Up)]
    #[case((100.0, 100.0), (100.0, 200.0), Direction::Down)]
    #[case((100.0, 100.0), (0.0, 100.0), Direction::Left)]
    #[case((100.0, 100.0), (200.0, 100.0), Direction::Right)]
    #[case((100.0, 100.0), (200.0, 1.0), Direction::Up)]
    #[case((100.0, 100.0), (1.0, 199.0), Direction::Down)]
    #[case((100.0, 100.0), (100.0, 100.0), Direction::Right)]
    fn test_direction_buckets(
        #[case] center: (f64, f64),
        #[case] target: (f64, f64),
        #[case] expected: Direction,
    ) {
        assert_eq!(Direction::between(center, target), expected);
    }

    #[test]
    fn test_direction_boundaries() {
        let center = (0.0, 0.0);
        // Exactly 45 degrees belongs to Up, exactly -45 to Right.
        assert_eq!(Direction::between(center, (100.0, -100.0)), Direction::Up);
        assert_eq!(
            Direction::between(center, (100.0, 100.0)),
            Direction::Right
        );
        // Exactly 135 belongs to Left, exactly -135 to Down.
        assert_eq!(Direction::between(center, (-100.0, -100.0)), Direction::Left);
        assert_eq!(Direction::between(center, (-100.0, 100.0)), Direction::Down);
    }

    #[test]
    fn test_suffix_names() {
        assert_eq!(Direction::Up.suffix(), "Up");
        assert_eq!(Direction::Top.suffix(), "Top");
    }
}
