//! Slider tick mapping
//!
//! UI sliders expose only integer positions; these helpers are the canonical
//! reversible mapping between a tick index and a real parameter value.
//! Out-of-range input is clamped, never rejected, since the widgets already
//! constrain movement to valid ticks.

/// Number of ticks spanning `[min, max]` at the given step
pub fn tick_count(min: f64, max: f64, step: f64) -> i64 {
    if step <= 0.0 || max < min {
        return 0;
    }
    ((max - min) / step).round() as i64
}

/// Map a parameter value to the nearest tick index
pub fn to_tick(value: f64, min: f64, max: f64, step: f64) -> i64 {
    if step <= 0.0 || max < min {
        return 0;
    }
    let tick = ((value - min) / step).round() as i64;
    tick.clamp(0, tick_count(min, max, step))
}

/// Map a tick index back to a parameter value
///
/// Rounds to 6 decimal digits before clamping to suppress floating-point
/// drift from the `min + tick * step` accumulation.
pub fn from_tick(tick: i64, min: f64, max: f64, step: f64) -> f64 {
    if step <= 0.0 || max < min {
        return min;
    }
    round6(min + tick as f64 * step).clamp(min, max)
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_count() {
        assert_eq!(tick_count(0.0, 2.0, 0.01), 200);
        assert_eq!(tick_count(0.0, 1.0, 0.25), 4);
        assert_eq!(tick_count(-1.0, 1.0, 0.5), 4);
        assert_eq!(tick_count(0.0, 2.0, 0.0), 0);
        assert_eq!(tick_count(2.0, 0.0, 0.1), 0);
    }

    #[test]
    fn test_to_tick_basic() {
        assert_eq!(to_tick(0.0, 0.0, 2.0, 0.01), 0);
        assert_eq!(to_tick(1.0, 0.0, 2.0, 0.01), 100);
        assert_eq!(to_tick(2.0, 0.0, 2.0, 0.01), 200);
        assert_eq!(to_tick(0.5, -1.0, 1.0, 0.5), 3);
    }

    #[test]
    fn test_to_tick_clamps_out_of_range() {
        assert_eq!(to_tick(-5.0, 0.0, 2.0, 0.01), 0);
        assert_eq!(to_tick(99.0, 0.0, 2.0, 0.01), 200);
    }

    #[test]
    fn test_from_tick_clamps_and_rounds() {
        assert_eq!(from_tick(0, 0.0, 2.0, 0.01), 0.0);
        assert_eq!(from_tick(100, 0.0, 2.0, 0.01), 1.0);
        // 0.1 + 2 * 0.1 accumulates binary error; round6 restores 0.3
        assert_eq!(from_tick(2, 0.1, 1.0, 0.1), 0.3);
        // Ticks past the end clamp to max
        assert_eq!(from_tick(500, 0.0, 2.0, 0.01), 2.0);
        assert_eq!(from_tick(-3, 0.0, 2.0, 0.01), 0.0);
    }

    #[test]
    fn test_round_trip_within_one_step() {
        let cases = [
            (0.0_f64, 2.0_f64, 0.01_f64),
            (-1.0, 1.0, 0.05),
            (0.5, 10.0, 0.333),
            (0.0, 1.0, 0.007),
        ];
        for (min, max, step) in cases {
            let mut value = min;
            while value <= max {
                let back = from_tick(to_tick(value, min, max, step), min, max, step);
                assert!(
                    (back - value).abs() <= step,
                    "round trip drifted: {value} -> {back} (min={min} max={max} step={step})"
                );
                value += (max - min) / 37.0;
            }
        }
    }

    #[test]
    fn test_degenerate_step_is_not_an_error() {
        assert_eq!(to_tick(1.0, 0.0, 2.0, 0.0), 0);
        assert_eq!(from_tick(7, 0.0, 2.0, -0.5), 0.0);
    }
}
