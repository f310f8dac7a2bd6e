/// Interpolates a value over a time window, driven by the host clock.
///
/// Used for smooth scrolling and for the opacity and translation tracks of edit animations.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tween {
    pub from: f64,
    pub to: f64,
    pub start_ms: u64,
    pub duration_ms: u64,
    pub easing: Easing,
}

impl Tween {
    pub fn new(from: f64, to: f64, start_ms: u64, duration_ms: u64, easing: Easing) -> Self {
        Self {
            from,
            to,
            start_ms,
            duration_ms: duration_ms.max(1),
            easing,
        }
    }

    /// A tween between two scroll offsets.
    pub fn offsets(from: u64, to: u64, start_ms: u64, duration_ms: u64, easing: Easing) -> Self {
        Self::new(from as f64, to as f64, start_ms, duration_ms, easing)
    }

    pub fn is_done(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.start_ms) >= self.duration_ms
    }

    /// Eased progress in `[0, 1]`.
    pub fn progress(&self, now_ms: u64) -> f32 {
        let elapsed = now_ms.saturating_sub(self.start_ms);
        let t = (elapsed as f32 / self.duration_ms as f32).clamp(0.0, 1.0);
        self.easing.sample(t)
    }

    pub fn sample(&self, now_ms: u64) -> f64 {
        if self.is_done(now_ms) {
            return self.to;
        }
        self.from + (self.to - self.from) * f64::from(self.progress(now_ms))
    }

    /// [`Self::sample`] rounded to a scroll offset.
    pub fn sample_offset(&self, now_ms: u64) -> u64 {
        let v = self.sample(now_ms);
        if v <= 0.0 { 0 } else { (v + 0.5) as u64 }
    }

    /// Restarts from the current value toward `new_to`.
    pub fn retarget(&mut self, now_ms: u64, new_to: f64, duration_ms: u64) {
        let current = self.sample(now_ms);
        *self = Self::new(current, new_to, now_ms, duration_ms, self.easing);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Easing {
    Linear,
    SmoothStep,
    /// Decelerating cubic, the curve of the list's fade and slide animations.
    #[default]
    EaseOutCubic,
    EaseInOutCubic,
}

impl Easing {
    pub fn sample(self, t: f32) -> f32 {
        match self {
            Self::Linear => t,
            Self::SmoothStep => t * t * (3.0 - 2.0 * t),
            Self::EaseOutCubic => {
                let u = 1.0 - t;
                1.0 - u * u * u
            }
            Self::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - (u * u * u) / 2.0
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curves_hit_both_ends() {
        for easing in [
            Easing::Linear,
            Easing::SmoothStep,
            Easing::EaseOutCubic,
            Easing::EaseInOutCubic,
        ] {
            assert_eq!(easing.sample(0.0), 0.0, "{easing:?}");
            assert_eq!(easing.sample(1.0), 1.0, "{easing:?}");
        }
        assert!(Easing::EaseOutCubic.sample(0.5) > 0.5);
    }

    #[test]
    fn offsets_clamp_to_the_window() {
        let tween = Tween::offsets(100, 300, 1_000, 200, Easing::Linear);
        assert_eq!(tween.sample_offset(0), 100);
        assert_eq!(tween.sample_offset(1_100), 200);
        assert_eq!(tween.sample_offset(5_000), 300);
        assert!(tween.is_done(1_200));
        assert!(!tween.is_done(1_199));
    }

    #[test]
    fn retarget_starts_from_the_current_value() {
        let mut tween = Tween::new(0.0, 1.0, 0, 100, Easing::Linear);
        tween.retarget(50, 0.0, 100);
        assert_eq!(tween.from, 0.5);
        assert_eq!(tween.start_ms, 50);
        assert_eq!(tween.sample(150), 0.0);
    }
}
