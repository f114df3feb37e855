use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;

/// Scales an image to the model input size and lays it out as `(image, channel, row, column)`
/// with values in 0..=1.
pub fn convert_rgb_image_to_model_input(
    rgb_image: &RgbImage,
    input_width: u32,
    input_height: u32,
) -> Array4<f32> {
    let resized = imageops::resize(rgb_image, input_width, input_height, FilterType::Triangle);
    let mut image_array =
        Array4::zeros((1, 3, input_height as usize, input_width as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        let [r, g, b] = pixel.0;
        image_array[[0, 0, y, x]] = (r as f32) / 255.;
        image_array[[0, 1, y, x]] = (g as f32) / 255.;
        image_array[[0, 2, y, x]] = (b as f32) / 255.;
    }
    image_array
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn layout_is_channel_row_column() {
        let mut img = RgbImage::new(4, 2);
        img.put_pixel(3, 1, Rgb([255, 0, 255]));
        let array = convert_rgb_image_to_model_input(&img, 4, 2);
        assert_eq!(array.shape(), &[1, 3, 2, 4]);
        assert_eq!(
            (array[[0, 0, 1, 3]], array[[0, 1, 1, 3]], array[[0, 2, 1, 3]]),
            (1.0, 0.0, 1.0)
        );
        assert_eq!(array[[0, 0, 0, 0]], 0.0);
    }
}
