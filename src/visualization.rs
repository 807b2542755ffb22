use opencv::{
    core::{Point, Rect, Scalar},
    imgproc,
    prelude::*,
};

use crate::counting::CountTable;
use crate::detection::{label_for_class, Detection};
use crate::utils::scale_tlwh;

// BGR.
const COLOR_TRACKED: Scalar = Scalar::new(0.0, 255.0, 0.0, 0.0); // Green
const COLOR_COUNTED: Scalar = Scalar::new(255.0, 0.0, 255.0, 0.0); // Magenta
const COLOR_LINE: Scalar = Scalar::new(0.0, 0.0, 255.0, 0.0); // Red
const COLOR_LINE_FLASH: Scalar = Scalar::new(0.0, 255.0, 0.0, 0.0); // Green
const COLOR_HUD: Scalar = Scalar::new(255.0, 255.0, 255.0, 0.0); // White

/// Draw text with a black outline for visibility on busy frames.
pub fn draw_text(
    frame: &mut Mat,
    text: &str,
    x: i32,
    y: i32,
    font_scale: f64,
    color: Scalar,
) -> opencv::Result<()> {
    let text_pos = Point::new(x, y);

    imgproc::put_text(
        frame,
        text,
        text_pos,
        imgproc::FONT_HERSHEY_SIMPLEX,
        font_scale,
        Scalar::new(0.0, 0.0, 0.0, 0.0),
        3,
        imgproc::LINE_8,
        false,
    )?;

    imgproc::put_text(
        frame,
        text,
        text_pos,
        imgproc::FONT_HERSHEY_SIMPLEX,
        font_scale,
        color,
        1,
        imgproc::LINE_8,
        false,
    )?;

    Ok(())
}

/// Draw one detection on the original frame. `scale` is the factor that took
/// the original down to detection space, so boxes are inverse-scaled here.
/// Counted identities are drawn in a different color than still-tracked ones.
pub fn draw_detection(
    frame: &mut Mat,
    det: &Detection,
    scale: f32,
    counted: bool,
) -> opencv::Result<()> {
    let color = if counted { COLOR_COUNTED } else { COLOR_TRACKED };
    let tlwh = scale_tlwh(det.tlwh(), 1.0 / scale);

    let rect = Rect::new(
        tlwh[0] as i32,
        tlwh[1] as i32,
        tlwh[2] as i32,
        tlwh[3] as i32,
    );
    imgproc::rectangle(frame, rect, color, 2, imgproc::LINE_8, 0)?;

    let cx = (tlwh[0] + tlwh[2] / 2.0) as i32;
    let cy = (tlwh[1] + tlwh[3] / 2.0) as i32;
    imgproc::circle(frame, Point::new(cx, cy), 4, color, -1, imgproc::LINE_8, 0)?;

    let name = match label_for_class(det.class_id) {
        Some(label) => label.to_string(),
        None => format!("class_{}", det.class_id),
    };
    let text = match det.track_id {
        Some(id) => format!("#{} {} {:.2}", id, name, det.confidence),
        None => format!("{} {:.2}", name, det.confidence),
    };
    draw_text(frame, &text, rect.x, rect.y - 5, 0.5, color)?;

    Ok(())
}

/// Draw the gate line across the full frame width, flashing on a crossing.
pub fn draw_gate_line(frame: &mut Mat, line_y: i32, flash: bool) -> opencv::Result<()> {
    let color = if flash { COLOR_LINE_FLASH } else { COLOR_LINE };
    let width = frame.cols();
    imgproc::line(
        frame,
        Point::new(0, line_y),
        Point::new(width, line_y),
        color,
        3,
        imgproc::LINE_8,
        0,
    )
}

/// Render the count table as a text block in the top-left corner.
pub fn draw_counts(frame: &mut Mat, counts: &CountTable) -> opencv::Result<()> {
    draw_text(
        frame,
        &format!("Total: {}", counts.total()),
        10,
        30,
        0.7,
        COLOR_HUD,
    )?;
    for (i, (key, value)) in counts.iter().enumerate() {
        let text = format!("{}: {}", key, value);
        draw_text(frame, &text, 10, 58 + 22 * i as i32, 0.5, COLOR_HUD)?;
    }
    Ok(())
}
