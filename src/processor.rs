use anyhow::Result;
use opencv::{
    core::{Mat, Size},
    imgproc,
    prelude::*,
};
use tracing::{debug, info};

use crate::config::Config;
use crate::counting::{register, SessionState, VehicleClass};
use crate::crossing;
use crate::detection::{label_for_class, Detector, FrameTracker};
use crate::history::TrackHistory;
use crate::utils::downscale_factor;
use crate::visualization;

/// Per-frame output of the orchestrator.
pub struct FrameReport {
    /// The input frame at its original resolution with overlays applied.
    pub annotated: Mat,
    /// Normalized (0-1, 0-1) centroids of all tracked detections, for the
    /// heatmap/GIS consumer.
    pub positions: Vec<(f32, f32)>,
    /// Crossings registered this frame.
    pub crossings: usize,
}

/// Per-frame driver: resize, invoke the tracker, run crossing detection over
/// the track history, update the session counts, annotate the frame.
///
/// The processor holds only the track history; counts and the counted-id set
/// live in the caller's [`SessionState`] and are mutated in place, so the
/// caller decides when a session starts over. Stopping between any two
/// `process` calls leaves every structure consistent.
pub struct FrameProcessor {
    tracker: Box<dyn FrameTracker>,
    history: TrackHistory,
    working_width: i32,
    line_fraction: f32,
    history_max_age: u64,
    frame_index: u64,
}

impl FrameProcessor {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let detector = Detector::new(
            &cfg.model_path,
            &cfg.device,
            (cfg.input_size[0], cfg.input_size[1]),
            cfg.conf_threshold,
        )?;
        Ok(Self::with_tracker(Box::new(detector), cfg))
    }

    /// Build around any tracker implementation. Tests use this with a
    /// scripted source instead of a model.
    pub fn with_tracker(tracker: Box<dyn FrameTracker>, cfg: &Config) -> Self {
        FrameProcessor {
            tracker,
            history: TrackHistory::new(cfg.history_window),
            working_width: cfg.working_width,
            line_fraction: cfg.line_fraction,
            history_max_age: cfg.history_max_age,
            frame_index: 0,
        }
    }

    /// Forget all track history, ready for a new video. Session counts are
    /// the caller's to reset.
    pub fn reset(&mut self) {
        self.history.clear();
        self.frame_index = 0;
    }

    pub fn process(&mut self, frame: &Mat, session: &mut SessionState) -> Result<FrameReport> {
        self.frame_index += 1;

        let scale = downscale_factor(frame.cols(), self.working_width);
        let resized = if scale < 1.0 {
            let mut resized = Mat::default();
            imgproc::resize(
                frame,
                &mut resized,
                Size::new(
                    self.working_width,
                    (frame.rows() as f32 * scale).round() as i32,
                ),
                0.0,
                0.0,
                imgproc::INTER_LINEAR,
            )?;
            resized
        } else {
            frame.clone()
        };

        let resized_w = resized.cols() as f32;
        let resized_h = resized.rows() as f32;
        let line_y = resized_h * self.line_fraction;

        let detections = self.tracker.track(&resized)?;

        let mut annotated = frame.clone();
        let mut positions = Vec::with_capacity(detections.len());
        let mut crossings = 0usize;

        for det in &detections {
            let (cx, cy) = det.centroid();

            if let Some(id) = det.track_id {
                positions.push((cx / resized_w, cy / resized_h));

                if let Some(prev) = self.history.previous_position(id) {
                    if let Some(direction) = crossing::detect(prev, cy, line_y) {
                        let class =
                            label_for_class(det.class_id).and_then(VehicleClass::from_label);
                        if let Some(class) = class {
                            if register(
                                id,
                                class,
                                direction,
                                &mut session.counted_ids,
                                &mut session.counts,
                            ) {
                                crossings += 1;
                                info!(
                                    id,
                                    class = class.as_str(),
                                    direction = direction.as_str(),
                                    "vehicle crossed the gate line"
                                );
                            }
                        }
                    }
                }
                self.history.record(id, cy, self.frame_index);
            }

            let counted = det
                .track_id
                .map_or(false, |id| session.counted_ids.contains(&id));
            visualization::draw_detection(&mut annotated, det, scale, counted)?;
        }

        self.history
            .evict_stale(self.frame_index, self.history_max_age);

        let line_y_original = (frame.rows() as f32 * self.line_fraction).round() as i32;
        visualization::draw_gate_line(&mut annotated, line_y_original, crossings > 0)?;
        visualization::draw_counts(&mut annotated, &session.counts)?;

        debug!(
            frame = self.frame_index,
            detections = detections.len(),
            crossings,
            tracked = self.history.len(),
            "frame processed"
        );

        Ok(FrameReport {
            annotated,
            positions,
            crossings,
        })
    }
}
