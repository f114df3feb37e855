use crate::annotations::bounding_box::BoundingBoxGeometry;
use crate::annotations::detection::DetectionBox;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const BOX_THICKNESS: i32 = 3;

/// Draws each detection's box in red, growing inward `BOX_THICKNESS` pixels.
pub fn draw_detections(image: &mut RgbImage, detections: &[DetectionBox]) {
    for detection in detections {
        let (left, top, right, bottom) = detection.annotation.as_xyxy();
        let (left, top) = (left.round() as i32, top.round() as i32);
        let (right, bottom) = (right.round() as i32, bottom.round() as i32);
        for inset in 0..BOX_THICKNESS {
            let width = right - left - 2 * inset;
            let height = bottom - top - 2 * inset;
            if width <= 0 || height <= 0 {
                break;
            }
            let rect = Rect::at(left + inset, top + inset).of_size(width as u32, height as u32);
            draw_hollow_rect_mut(image, rect, BOX_COLOR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outlines_the_box() {
        let mut image = RgbImage::new(20, 20);
        let detection = DetectionBox::new(10.0, 10.0, 10.0, 10.0, 0.9, 0).unwrap();
        draw_detections(&mut image, &[detection]);
        assert_eq!(image.get_pixel(5, 5), &BOX_COLOR);
        assert_eq!(image.get_pixel(7, 10), &BOX_COLOR);
        assert_eq!(image.get_pixel(10, 10), &Rgb([0, 0, 0]));
        assert_eq!(image.get_pixel(1, 1), &Rgb([0, 0, 0]));
    }

    #[test]
    fn boxes_outside_the_image_are_clipped() {
        let mut image = RgbImage::new(8, 8);
        let detection = DetectionBox::new(7.0, 7.0, 10.0, 10.0, 0.9, 0).unwrap();
        draw_detections(&mut image, &[detection]);
        assert_eq!(image.get_pixel(2, 5), &BOX_COLOR);
    }
}
