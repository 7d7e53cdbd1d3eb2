//! Detection overlays.
//!
//! Draws a box and a `label (0.87)` caption for each detection onto the
//! display buffer. Drawing is clipped to the image; with no detections the
//! buffer is left untouched.

use std::sync::OnceLock;

use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::detect::Detection;
use crate::frame::DisplayBuffer;

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
pub const BOX_THICKNESS: i32 = 2;
/// Caption glyph height in pixels.
pub const CAPTION_SCALE: f32 = 16.0;
/// Gap between the caption and the top edge of its box.
pub const CAPTION_OFFSET: i32 = 10;

static CAPTION_FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSansMono.ttf");

fn caption_font() -> Option<&'static FontRef<'static>> {
    static FONT: OnceLock<Option<FontRef<'static>>> = OnceLock::new();
    FONT.get_or_init(|| match FontRef::try_from_slice(CAPTION_FONT_DATA) {
        Ok(font) => Some(font),
        Err(err) => {
            log::error!("caption font unusable, drawing boxes only: {}", err);
            None
        }
    })
    .as_ref()
}

/// Draw every detection onto the buffer.
pub fn render(buffer: &mut DisplayBuffer, detections: &[Detection]) {
    let image = buffer.image_mut();
    for detection in detections {
        draw_detection(image, detection);
    }
}

pub fn draw_detection(image: &mut RgbImage, detection: &Detection) {
    let (x1, y1, x2, y2) = detection.bbox().corners();
    draw_box(image, x1, y1, x2, y2, BOX_THICKNESS, BOX_COLOR);

    let caption = detection.caption();
    let (_, text_height) = caption_size(&caption);
    let mut top = y1 - CAPTION_OFFSET - text_height as i32;
    if top < 0 {
        top = y1 + BOX_THICKNESS + 1;
    }
    draw_text(image, x1.max(0), top, &caption, TEXT_COLOR);
}

/// Rectangle outline with inclusive corners, growing inward by `thickness`.
pub fn draw_box(
    image: &mut RgbImage,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    thickness: i32,
    color: Rgb<u8>,
) {
    for t in 0..thickness {
        let (left, top) = (x1 + t, y1 + t);
        let width = x2 - t - left + 1;
        let height = y2 - t - top + 1;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at(left, top).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(image, rect, color);
    }
}

/// Draw a caption with its top-left corner at `(x, y)`. Returns the drawn width.
pub fn draw_text(image: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) -> u32 {
    let Some(font) = caption_font() else {
        return 0;
    };
    draw_text_mut(image, color, x, y, PxScale::from(CAPTION_SCALE), font, text);
    caption_size(text).0
}

fn caption_size(text: &str) -> (u32, u32) {
    match caption_font() {
        Some(font) => text_size(PxScale::from(CAPTION_SCALE), font, text),
        None => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;
    use crate::frame::Frame;

    const GRAY: Rgb<u8> = Rgb([90, 90, 90]);

    fn gray_buffer(width: u32, height: u32) -> DisplayBuffer {
        let pixels = vec![90u8; (width * height * 3) as usize];
        Frame::from_rgb(pixels, width, height, 1)
            .expect("frame")
            .into_display()
    }

    fn changed_pixels(image: &RgbImage, rows: std::ops::Range<u32>) -> usize {
        image
            .enumerate_pixels()
            .filter(|(_, y, p)| rows.contains(y) && **p != GRAY)
            .count()
    }

    #[test]
    fn no_detections_leaves_buffer_unchanged() {
        let mut buffer = gray_buffer(40, 30);
        let before = buffer.image().clone();
        render(&mut buffer, &[]);
        assert_eq!(buffer.image(), &before);
    }

    #[test]
    fn draws_box_edges_in_green() {
        let mut buffer = gray_buffer(100, 100);
        let det = Detection::new("cup", 0.5, BoundingBox::new(40, 50, 80, 90).unwrap());
        render(&mut buffer, &[det]);
        let image = buffer.image();
        assert_eq!(*image.get_pixel(40, 70), BOX_COLOR);
        assert_eq!(*image.get_pixel(41, 70), BOX_COLOR);
        assert_eq!(*image.get_pixel(80, 70), BOX_COLOR);
        assert_eq!(*image.get_pixel(60, 90), BOX_COLOR);
        // Interior untouched.
        assert_eq!(*image.get_pixel(60, 70), GRAY);
    }

    #[test]
    fn caption_is_drawn_above_the_box() {
        let mut buffer = gray_buffer(200, 100);
        let det = Detection::new("cup", 0.5, BoundingBox::new(10, 60, 80, 90).unwrap());
        render(&mut buffer, &[det]);
        let caption_rows = 0..(60 - CAPTION_OFFSET) as u32;
        assert!(changed_pixels(buffer.image(), caption_rows) > 0);
    }

    #[test]
    fn caption_moves_inside_box_near_top_edge() {
        let mut buffer = gray_buffer(200, 100);
        let det = Detection::new("cup", 0.5, BoundingBox::new(10, 2, 150, 90).unwrap());
        render(&mut buffer, &[det]);
        // Nothing above the box; caption lands below its top edge.
        assert_eq!(changed_pixels(buffer.image(), 0..2), 0);
        let inside = (2 + BOX_THICKNESS + 1) as u32..60;
        let interior_changes = buffer
            .image()
            .enumerate_pixels()
            .filter(|(x, y, p)| (12..148).contains(x) && inside.contains(y) && **p != GRAY)
            .count();
        assert!(interior_changes > 0);
    }

    #[test]
    fn caption_keeps_label_case() {
        let mut lower = RgbImage::new(200, 30);
        let mut upper = RgbImage::new(200, 30);
        draw_text(&mut lower, 0, 0, "chair (0.87)", TEXT_COLOR);
        draw_text(&mut upper, 0, 0, "CHAIR (0.87)", TEXT_COLOR);
        assert_ne!(lower, upper);
    }

    #[test]
    fn drawing_is_clipped_to_image() {
        let mut image = RgbImage::new(10, 10);
        draw_box(&mut image, -5, -5, 20, 20, 2, BOX_COLOR);
        let width = draw_text(&mut image, 8, 8, "abc", TEXT_COLOR);
        assert!(width > 0);
    }
}
