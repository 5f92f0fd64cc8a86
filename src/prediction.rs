use image::{GrayImage, Luma};
use ndarray::{Array2, ArrayD, ArrayView2, Axis, Ix2, ShapeError};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Expected a prediction of shape [H, W] or [1, H, W], got {0:?}")]
    InvalidShape(Vec<usize>),
    #[error("Prediction is empty ({height}x{width})")]
    Empty { height: usize, width: usize },
    #[error("Prediction data does not match its shape: {0}")]
    ShapeMismatch(#[from] ShapeError),
    #[error("Prediction of {height}x{width} exceeds the maximum image size")]
    TooLarge { height: usize, width: usize },
}

/// Target resolution of a saved prediction, ordered `(height, width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub height: u32,
    pub width: u32,
}

impl ImageSize {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0 || self.width == 0
    }
}

impl From<(u32, u32)> for ImageSize {
    fn from((height, width): (u32, u32)) -> Self {
        Self { height, width }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

/// Single-channel prediction map with values expected in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    map: Array2<f32>,
    size: ImageSize,
}

impl Prediction {
    pub fn new(map: Array2<f32>) -> Result<Self, PredictionError> {
        let (height, width) = map.dim();
        if height == 0 || width == 0 {
            return Err(PredictionError::Empty { height, width });
        }

        let too_large = || PredictionError::TooLarge { height, width };
        let size = ImageSize {
            height: u32::try_from(height).map_err(|_| too_large())?,
            width: u32::try_from(width).map_err(|_| too_large())?,
        };

        Ok(Self { map, size })
    }

    /// Accepts `[H, W]` or `[1, H, W]`, dropping the channel axis.
    pub fn from_array(array: ArrayD<f32>) -> Result<Self, PredictionError> {
        let map = match array.ndim() {
            2 => array.into_dimensionality::<Ix2>()?,
            3 if array.len_of(Axis(0)) == 1 => array
                .index_axis_move(Axis(0), 0)
                .into_dimensionality::<Ix2>()?,
            _ => return Err(PredictionError::InvalidShape(array.shape().to_vec())),
        };

        Self::new(map)
    }

    pub fn from_shape_vec(
        height: usize,
        width: usize,
        values: Vec<f32>,
    ) -> Result<Self, PredictionError> {
        let map = Array2::from_shape_vec((height, width), values)?;
        Self::new(map)
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.map.view()
    }

    /// Quantizes the map into an 8-bit grayscale image.
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.size.width, self.size.height, |x, y| {
            Luma([quantize(self.map[[y as usize, x as usize]])])
        })
    }
}

fn quantize(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, IxDyn};

    #[test]
    fn test_from_array_accepts_channel_first() {
        let array = ArrayD::from_shape_vec(IxDyn(&[1, 2, 3]), vec![0.0; 6]).unwrap();
        let prediction = Prediction::from_array(array).unwrap();

        assert_eq!(prediction.height(), 2);
        assert_eq!(prediction.width(), 3);
    }

    #[test]
    fn test_from_array_accepts_plain_map() {
        let array = ArrayD::from_shape_vec(IxDyn(&[4, 5]), vec![0.0; 20]).unwrap();
        let prediction = Prediction::from_array(array).unwrap();

        assert_eq!(prediction.size(), ImageSize::new(4, 5));
    }

    #[test]
    fn test_from_array_rejects_other_shapes() {
        for shape in [vec![6], vec![2, 2, 3], vec![1, 1, 2, 3]] {
            let len = shape.iter().product();
            let array = ArrayD::from_shape_vec(IxDyn(&shape), vec![0.0; len]).unwrap();
            match Prediction::from_array(array) {
                Err(PredictionError::InvalidShape(got)) => assert_eq!(got, shape),
                other => panic!("expected InvalidShape for {:?}, got {:?}", shape, other),
            }
        }
    }

    #[test]
    fn test_empty_prediction_is_rejected() {
        let result = Prediction::from_shape_vec(0, 4, Vec::new());
        assert!(matches!(
            result,
            Err(PredictionError::Empty {
                height: 0,
                width: 4
            })
        ));
    }

    #[test]
    fn test_from_shape_vec_length_mismatch() {
        let result = Prediction::from_shape_vec(2, 2, vec![0.0; 3]);
        assert!(matches!(result, Err(PredictionError::ShapeMismatch(_))));
    }

    #[test]
    fn test_to_luma_clamps_and_rounds() {
        let prediction =
            Prediction::new(array![[0.0, 0.5, 1.0], [-0.3, 1.7, f32::NAN]]).unwrap();
        let image = prediction.to_luma();

        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(0, 0).0, [0]);
        assert_eq!(image.get_pixel(1, 0).0, [128]);
        assert_eq!(image.get_pixel(2, 0).0, [255]);
        assert_eq!(image.get_pixel(0, 1).0, [0]);
        assert_eq!(image.get_pixel(1, 1).0, [255]);
        assert_eq!(image.get_pixel(2, 1).0, [0]);
    }

    #[test]
    fn test_image_size_tuple_is_height_first() {
        let size: ImageSize = (480, 640).into();
        assert_eq!(size.height, 480);
        assert_eq!(size.width, 640);
        assert_eq!(size.to_string(), "480x640");
    }
}
