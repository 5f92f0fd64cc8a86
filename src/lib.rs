mod prediction;
mod save;
mod sink;

pub mod config;
pub mod telemetry;

pub use prediction::{ImageSize, Prediction, PredictionError};
pub use save::{
    format_for_extension, resolve_format, save_prediction, save_prediction_with, ResizeFilter,
    SaveError, SaveOptions,
};
pub use sink::{FilePredictionSink, PredictionSink};
