use serde::Serialize;

/// Direction of travel through the gate line. Image y grows downward, so
/// `Incoming` is movement down the frame (toward the camera on a typical
/// overhead mount) and `Outgoing` is movement up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "Incoming",
            Self::Outgoing => "Outgoing",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two-sample test of a vertical centroid against the gate line.
///
/// Incoming fires when the position moves from strictly above the line to at
/// or below it; Outgoing is the mirror image. A jump spanning the line in a
/// single sample step still fires: the check is on sign relative to the line
/// between consecutive samples, not continuous crossing detection, so
/// fast movers on low-frame-rate input may register one sample late.
///
/// `previous_y == line_y` is a dead zone: neither inequality is strict on
/// that side, so an object sitting exactly on the line produces no event
/// until it has been strictly on one side first. Kept as-is; widening one
/// inequality would bias every on-line start toward that direction.
pub fn detect(previous_y: f32, current_y: f32, line_y: f32) -> Option<Direction> {
    if previous_y < line_y && current_y >= line_y {
        Some(Direction::Incoming)
    } else if previous_y > line_y && current_y <= line_y {
        Some(Direction::Outgoing)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downward_crossing_is_incoming() {
        assert_eq!(detect(100.0, 200.0, 150.0), Some(Direction::Incoming));
    }

    #[test]
    fn upward_crossing_is_outgoing() {
        assert_eq!(detect(200.0, 100.0, 150.0), Some(Direction::Outgoing));
    }

    #[test]
    fn movement_on_one_side_is_no_event() {
        assert_eq!(detect(50.0, 80.0, 150.0), None);
        assert_eq!(detect(180.0, 160.0, 150.0), None);
    }

    #[test]
    fn landing_exactly_on_the_line_counts() {
        assert_eq!(detect(140.0, 150.0, 150.0), Some(Direction::Incoming));
        assert_eq!(detect(160.0, 150.0, 150.0), Some(Direction::Outgoing));
    }

    #[test]
    fn starting_on_the_line_is_a_dead_zone() {
        assert_eq!(detect(150.0, 200.0, 150.0), None);
        assert_eq!(detect(150.0, 100.0, 150.0), None);
        assert_eq!(detect(150.0, 150.0, 150.0), None);
    }

    #[test]
    fn single_sample_jump_across_the_line_fires() {
        assert_eq!(detect(0.0, 400.0, 150.0), Some(Direction::Incoming));
        assert_eq!(detect(400.0, 0.0, 150.0), Some(Direction::Outgoing));
    }
}
