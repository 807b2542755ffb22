use anyhow::Result;
use nalgebra::SVector;
use num_traits::cast::ToPrimitive;
use opencv::{
    core::{Mat, Size, CV_32F},
    imgproc,
    prelude::*,
};
use tch::{Device, Kind, Tensor};
use thiserror::Error;
use tracing::trace;

/// Violations of the tracker output contract. These are precondition
/// failures: the frame is aborted and the error propagated rather than
/// counting from inconsistent data.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("tracker output shape {0:?} does not match the [1, N, 7] contract")]
    OutputShape(Vec<i64>),
    #[error("tracker emitted negative track id {0}; only -1 marks a box without identity")]
    NegativeTrackId(i64),
    #[error("tracker emitted a non-finite value in output row {0}")]
    NonFiniteValue(usize),
}

/// A single tracked detection, in the coordinate space of the frame handed
/// to the tracker. `track_id` is `None` when the tracker failed to assign an
/// identity this frame; such boxes are drawn but never counted.
#[derive(Debug, Clone)]
pub struct Detection {
    pub tlwh: SVector<f32, 4>,
    pub confidence: f32,
    pub class_id: i32,
    pub track_id: Option<u32>,
}

impl Detection {
    pub fn new(
        tlwh: SVector<f32, 4>,
        confidence: f32,
        class_id: i32,
        track_id: Option<u32>,
    ) -> Self {
        Self {
            tlwh,
            confidence,
            class_id,
            track_id,
        }
    }

    pub fn tlwh(&self) -> &SVector<f32, 4> {
        &self.tlwh
    }

    /// Box centroid, same coordinate space as the box.
    pub fn centroid(&self) -> (f32, f32) {
        (
            self.tlwh[0] + self.tlwh[2] / 2.0,
            self.tlwh[1] + self.tlwh[3] / 2.0,
        )
    }
}

/// Raw label for the subset of COCO class ids this model family emits.
/// Unknown ids yield `None`: the box is still drawn, never counted.
pub fn label_for_class(class_id: i32) -> Option<&'static str> {
    match class_id {
        0 => Some("person"),
        1 => Some("bicycle"),
        2 => Some("car"),
        3 => Some("motorcycle"),
        4 => Some("airplane"),
        5 => Some("bus"),
        7 => Some("truck"),
        9 => Some("traffic light"),
        _ => None,
    }
}

/// Per-frame source of tracked detections.
///
/// The production implementation wraps a TorchScript model; the orchestrator
/// only depends on this seam, so tests drive it with scripted outputs.
pub trait FrameTracker {
    fn track(&mut self, frame: &Mat) -> Result<Vec<Detection>>;
}

/// Wraps a track-enabled TorchScript detector. The module is expected to
/// carry its own identity association state across calls (the equivalent of
/// tracking with persistence on), returning one row per detection:
/// `[x, y, w, h, confidence, class_id, track_id]`, `track_id == -1` when no
/// identity was assigned.
pub struct Detector {
    model: tch::CModule,
    device: Device,
    input_size: (i64, i64),
    pub conf_threshold: f32,
}

impl Detector {
    /// Create a new detector from a model file and device ("cpu"/"cuda").
    pub fn new(
        model_path: &str,
        device: &str,
        input_size: (i64, i64),
        conf_threshold: f32,
    ) -> Result<Self> {
        let device = if device == "cuda" && tch::Cuda::is_available() {
            Device::Cuda(0)
        } else {
            Device::Cpu
        };

        let model = tch::CModule::load(model_path)?;

        Ok(Detector {
            model,
            device,
            input_size,
            conf_threshold,
        })
    }

    /// Preprocess a frame for inference: resize to the model input size,
    /// BGR to RGB, normalize to [0,1], layout [1, C, H, W].
    fn preprocess(&self, frame: &Mat) -> Result<Tensor> {
        let mut resized = Mat::default();
        imgproc::resize(
            frame,
            &mut resized,
            Size::new(self.input_size.0 as i32, self.input_size.1 as i32),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        let mut rgb = Mat::default();
        imgproc::cvt_color(&resized, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

        let mut float_mat = Mat::default();
        rgb.convert_to(&mut float_mat, CV_32F, 1.0 / 255.0, 0.0)?;

        let rows = float_mat.rows();
        let cols = float_mat.cols();
        let channels = float_mat.channels();
        let total_elements = (rows * cols * channels) as usize;
        let data =
            unsafe { std::slice::from_raw_parts(float_mat.data() as *const f32, total_elements) };

        // HWC -> CHW for the model.
        let tensor = Tensor::from_slice(data)
            .reshape(&[rows as i64, cols as i64, channels as i64])
            .permute(&[2, 0, 1])
            .unsqueeze(0)
            .to_device(self.device)
            .to_kind(Kind::Float);

        Ok(tensor)
    }
}

impl FrameTracker for Detector {
    fn track(&mut self, frame: &Mat) -> Result<Vec<Detection>> {
        let input = self.preprocess(frame)?;
        let output = self.model.forward_ts(&[input])?;
        let detections = parse_track_output(&output, self.conf_threshold)?;
        trace!(count = detections.len(), "tracker produced detections");
        Ok(detections)
    }
}

/// Parse the `[1, N, 7]` tracker output into [`Detection`]s, enforcing the
/// contract strictly: any other shape, a non-finite value, or a negative
/// track id other than the -1 sentinel fails the frame.
pub fn parse_track_output(
    output: &Tensor,
    conf_threshold: f32,
) -> Result<Vec<Detection>, ContractError> {
    let shape = output.size();
    if shape.len() != 3 || shape[0] != 1 || shape[2] != 7 {
        return Err(ContractError::OutputShape(shape));
    }

    let cpu = output.to_device(Device::Cpu);
    let rows = shape[1];
    let mut detections = Vec::new();

    for i in 0..rows {
        let row = cpu.get(0).get(i);
        let mut values = [0.0f64; 7];
        for (j, value) in values.iter_mut().enumerate() {
            *value = row.get(j as i64).double_value(&[]);
            if !value.is_finite() {
                return Err(ContractError::NonFiniteValue(i as usize));
            }
        }

        let confidence = values[4].to_f32().unwrap_or(0.0);
        if confidence < conf_threshold {
            continue;
        }

        let class_id = values[5].round() as i32;
        let raw_id = values[6].round() as i64;
        let track_id = match raw_id {
            -1 => None,
            id if id < 0 => return Err(ContractError::NegativeTrackId(id)),
            id => Some(id as u32),
        };

        detections.push(Detection::new(
            SVector::from_vec(vec![
                values[0] as f32,
                values[1] as f32,
                values[2] as f32,
                values[3] as f32,
            ]),
            confidence,
            class_id,
            track_id,
        ));
    }

    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn output_from_rows(rows: &[[f32; 7]]) -> Tensor {
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        Tensor::from_slice(&flat).reshape(&[1, rows.len() as i64, 7])
    }

    #[test]
    fn label_table_covers_the_counted_vocabulary() {
        assert_eq!(label_for_class(2), Some("car"));
        assert_eq!(label_for_class(3), Some("motorcycle"));
        assert_eq!(label_for_class(5), Some("bus"));
        assert_eq!(label_for_class(7), Some("truck"));
        assert_eq!(label_for_class(42), None);
    }

    #[test]
    fn centroid_is_box_center() {
        let det = Detection::new(
            SVector::from_vec(vec![100.0, 200.0, 40.0, 20.0]),
            0.9,
            2,
            Some(1),
        );
        let (cx, cy) = det.centroid();
        assert_relative_eq!(cx, 120.0);
        assert_relative_eq!(cy, 210.0);
    }

    #[test]
    fn parse_accepts_valid_rows_and_the_no_identity_sentinel() {
        let output = output_from_rows(&[
            [10.0, 20.0, 30.0, 40.0, 0.9, 2.0, 7.0],
            [50.0, 60.0, 30.0, 40.0, 0.8, 7.0, -1.0],
        ]);
        let dets = parse_track_output(&output, 0.5).unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].track_id, Some(7));
        assert_eq!(dets[0].class_id, 2);
        assert_eq!(dets[1].track_id, None);
        assert_relative_eq!(dets[1].tlwh[0], 50.0);
    }

    #[test]
    fn parse_filters_below_confidence_threshold() {
        let output = output_from_rows(&[
            [10.0, 20.0, 30.0, 40.0, 0.3, 2.0, 7.0],
            [50.0, 60.0, 30.0, 40.0, 0.8, 2.0, 8.0],
        ]);
        let dets = parse_track_output(&output, 0.5).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].track_id, Some(8));
    }

    #[test]
    fn parse_rejects_wrong_shape() {
        let output = Tensor::from_slice(&[0.0f32; 12]).reshape(&[1, 2, 6]);
        match parse_track_output(&output, 0.5) {
            Err(ContractError::OutputShape(shape)) => assert_eq!(shape, vec![1, 2, 6]),
            other => panic!("expected shape error, got {:?}", other),
        }
    }

    #[test]
    fn parse_rejects_negative_track_id() {
        let output = output_from_rows(&[[10.0, 20.0, 30.0, 40.0, 0.9, 2.0, -5.0]]);
        match parse_track_output(&output, 0.5) {
            Err(ContractError::NegativeTrackId(id)) => assert_eq!(id, -5),
            other => panic!("expected track id error, got {:?}", other),
        }
    }

    #[test]
    fn parse_rejects_non_finite_values() {
        let output = output_from_rows(&[[10.0, f32::NAN, 30.0, 40.0, 0.9, 2.0, 1.0]]);
        assert!(matches!(
            parse_track_output(&output, 0.5),
            Err(ContractError::NonFiniteValue(0))
        ));
    }
}
