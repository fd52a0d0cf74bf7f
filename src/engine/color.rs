#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn lerp(self, other: Self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);
        Self::new(
            self.r + (other.r - self.r) * amount,
            self.g + (other.g - self.g) * amount,
            self.b + (other.b - self.b) * amount,
        )
    }
}

const ACTIVITY_RAMP: [Rgb; 3] = [
    Rgb::new(0.0, 0.5, 1.0),
    Rgb::new(0.5, 0.5, 0.0),
    Rgb::new(1.0, 0.0, 0.0),
];
const IDLE_RAMP: [Rgb; 3] = [
    Rgb::new(0.3, 0.3, 0.3),
    Rgb::new(0.5, 0.5, 0.0),
    Rgb::new(1.0, 0.0, 0.0),
];

pub const SELECT_COLOR: Rgb = Rgb::new(0.2, 0.7, 0.3);
pub const SELECT_HOVER_COLOR: Rgb = Rgb::new(0.2, 1.0, 0.5);

pub fn ramp(stops: &[Rgb], t: f32) -> Rgb {
    match stops {
        [] => Rgb::WHITE,
        [only] => *only,
        _ => {
            let segments = (stops.len() - 1) as f32;
            let position = t.clamp(0.0, 1.0) * segments;
            let index = (position.floor() as usize).min(stops.len() - 2);
            stops[index].lerp(stops[index + 1], position - index as f32)
        }
    }
}

/// Colour for a block whose value/maxima ratio is `ratio`.
pub fn activity_color(ratio: f32) -> Rgb {
    if ratio <= 0.0 {
        ramp(&IDLE_RAMP, 0.0)
    } else {
        ramp(&ACTIVITY_RAMP, ratio)
    }
}

pub fn hover_color(base: Rgb) -> Rgb {
    base.lerp(Rgb::WHITE, 0.5)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScaleMode {
    #[default]
    Linear,
    Log,
}

impl ScaleMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Linear => "Linear",
            Self::Log => "Log",
        }
    }

    /// Maps `value` into `[0, 1]` against `max`, which is floored at `floor`.
    pub fn normalize(self, value: f64, max: f64, floor: f64) -> f32 {
        let max = max.max(floor).max(f64::MIN_POSITIVE);
        let value = value.max(0.0);
        let ratio = match self {
            Self::Linear => value / max,
            Self::Log => value.ln_1p() / max.ln_1p(),
        };
        ratio.clamp(0.0, 1.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Rgb, b: Rgb) -> bool {
        (a.r - b.r).abs() < 1e-5 && (a.g - b.g).abs() < 1e-5 && (a.b - b.b).abs() < 1e-5
    }

    #[test]
    fn test_ramp_hits_stops_and_midpoints() {
        assert!(close(ramp(&ACTIVITY_RAMP, 0.0), ACTIVITY_RAMP[0]));
        assert!(close(ramp(&ACTIVITY_RAMP, 0.5), ACTIVITY_RAMP[1]));
        assert!(close(ramp(&ACTIVITY_RAMP, 1.0), ACTIVITY_RAMP[2]));
        assert!(close(
            ramp(&ACTIVITY_RAMP, 0.25),
            Rgb::new(0.25, 0.5, 0.5)
        ));
        assert!(close(ramp(&ACTIVITY_RAMP, 7.0), ACTIVITY_RAMP[2]));
    }

    #[test]
    fn test_zero_activity_is_grey() {
        assert!(close(activity_color(0.0), Rgb::new(0.3, 0.3, 0.3)));
        assert!(!close(activity_color(0.001), Rgb::new(0.3, 0.3, 0.3)));
    }

    #[test]
    fn test_hover_mixes_halfway_to_white() {
        assert!(close(
            hover_color(Rgb::new(0.0, 0.5, 1.0)),
            Rgb::new(0.5, 0.75, 1.0)
        ));
    }

    #[test]
    fn test_normalize_never_divides_by_zero() {
        assert_eq!(ScaleMode::Linear.normalize(0.0, 0.0, 0.01), 0.0);
        assert_eq!(ScaleMode::Linear.normalize(5.0, 0.0, 0.01), 1.0);
        assert_eq!(ScaleMode::Log.normalize(0.0, 0.0, 0.01), 0.0);
        assert!((ScaleMode::Linear.normalize(25.0, 100.0, 0.01) - 0.25).abs() < 1e-6);

        let log = ScaleMode::Log.normalize(10.0, 100.0, 0.01);
        assert!(log > 0.25 && log < 1.0);
    }
}
