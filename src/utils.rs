use nalgebra::SVector;

/// Factor that brings `width` down to `working_width`. Narrow frames are
/// never upscaled; detection runs on them as-is.
pub fn downscale_factor(width: i32, working_width: i32) -> f32 {
    if width <= working_width {
        1.0
    } else {
        working_width as f32 / width as f32
    }
}

/// Map a tlwh box between coordinate spaces by a uniform factor.
pub fn scale_tlwh(tlwh: &SVector<f32, 4>, factor: f32) -> SVector<f32, 4> {
    tlwh * factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn wide_frames_are_scaled_down() {
        assert_relative_eq!(downscale_factor(1280, 640), 0.5);
        assert_relative_eq!(downscale_factor(1920, 640), 640.0 / 1920.0);
    }

    #[test]
    fn narrow_frames_are_left_alone() {
        assert_relative_eq!(downscale_factor(640, 640), 1.0);
        assert_relative_eq!(downscale_factor(320, 640), 1.0);
    }

    #[test]
    fn tlwh_scaling_round_trips() {
        let tlwh = SVector::from_vec(vec![100.0, 50.0, 40.0, 30.0]);
        let down = scale_tlwh(&tlwh, 0.5);
        assert_relative_eq!(down[0], 50.0);
        assert_relative_eq!(down[3], 15.0);
        let back = scale_tlwh(&down, 2.0);
        assert_relative_eq!(back[0], tlwh[0]);
        assert_relative_eq!(back[2], tlwh[2]);
    }
}
