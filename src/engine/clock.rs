use serde::{Deserialize, Serialize};
use std::fmt;

/// Level time in whole milliseconds
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GameTime(u64);

impl GameTime {
    pub const ZERO: GameTime = GameTime(0);

    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub fn from_secs(secs: f32) -> Self {
        if secs.is_finite() && secs > 0.0 {
            Self((secs * 1000.0).round() as u64)
        } else {
            Self::ZERO
        }
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    pub fn as_secs(self) -> f32 {
        self.0 as f32 / 1000.0
    }

    /// `self` shifted by `secs` (negative shifts saturate at zero)
    pub fn after(self, secs: f32) -> Self {
        if !secs.is_finite() {
            return self;
        }
        let delta = (secs.abs() * 1000.0).round() as u64;
        if secs >= 0.0 {
            Self(self.0.saturating_add(delta))
        } else {
            Self(self.0.saturating_sub(delta))
        }
    }

    /// Seconds elapsed from `earlier` to `self`, zero if `earlier` is later
    pub fn since(self, earlier: GameTime) -> f32 {
        self.0.saturating_sub(earlier.0) as f32 / 1000.0
    }
}

impl fmt::Debug for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Fixed-step level clock
#[derive(Debug, Clone)]
pub struct LevelClock {
    now: GameTime,
    frame: u64,
    frame_ms: u64,
}

impl LevelClock {
    pub fn new(frame_ms: u64) -> Self {
        Self {
            now: GameTime::ZERO,
            frame: 0,
            frame_ms: frame_ms.max(1),
        }
    }

    pub fn now(&self) -> GameTime {
        self.now
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn frame_secs(&self) -> f32 {
        self.frame_ms as f32 / 1000.0
    }

    pub fn advance(&mut self) -> GameTime {
        self.frame += 1;
        self.now = GameTime(self.now.0 + self.frame_ms);
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_after_and_since() {
        let t = GameTime::from_secs(2.0);
        assert_eq!(t.after(1.5).as_millis(), 3500);
        assert_eq!(t.after(-5.0), GameTime::ZERO);
        assert!((t.after(0.25).since(t) - 0.25).abs() < 1e-6);
        assert_eq!(t.since(t.after(1.0)), 0.0);
    }

    #[test]
    fn test_from_secs_rejects_garbage() {
        assert_eq!(GameTime::from_secs(f32::NAN), GameTime::ZERO);
        assert_eq!(GameTime::from_secs(-3.0), GameTime::ZERO);
    }

    #[test]
    fn test_clock_advance() {
        let mut clock = LevelClock::new(100);
        clock.advance();
        clock.advance();
        assert_eq!(clock.frame(), 2);
        assert_eq!(clock.now().as_millis(), 200);
        assert!((clock.frame_secs() - 0.1).abs() < 1e-6);
    }
}
