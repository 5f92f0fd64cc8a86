use crate::{
    config::OutputConfig,
    prediction::{ImageSize, Prediction},
    save::{save_prediction_with, SaveError, SaveOptions},
};
use std::{
    ffi::OsString,
    future::Future,
    path::{Path, PathBuf},
    sync::Arc,
};

pub trait PredictionSink: Send + Sync + Clone + 'static {
    /// Persists the prediction for sample `name`, returning where it went.
    fn save(
        &self,
        name: &str,
        prediction: Prediction,
        original_size: Option<ImageSize>,
    ) -> impl Future<Output = Result<PathBuf, SaveError>> + Send;
}

#[derive(Debug)]
struct SinkSettings {
    dir: PathBuf,
    extension: String,
    options: SaveOptions,
}

/// Writes each prediction to `<dir>/<sample stem>.<extension>`.
#[derive(Debug, Clone)]
pub struct FilePredictionSink {
    settings: Arc<SinkSettings>,
}

impl FilePredictionSink {
    pub fn new(output_config: &OutputConfig) -> Self {
        tracing::info!("Saving predictions to {:?}", output_config.dir);

        Self {
            settings: Arc::new(SinkSettings {
                dir: output_config.dir.clone(),
                extension: output_config.extension.clone(),
                options: SaveOptions {
                    filter: output_config.filter,
                },
            }),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.settings.dir
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, SaveError> {
        let stem = Path::new(name)
            .file_stem()
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| SaveError::InvalidName(name.to_string()))?;

        let mut file_name = OsString::from(stem);
        file_name.push(".");
        file_name.push(&self.settings.extension);

        Ok(self.settings.dir.join(file_name))
    }
}

impl PredictionSink for FilePredictionSink {
    fn save(
        &self,
        name: &str,
        prediction: Prediction,
        original_size: Option<ImageSize>,
    ) -> impl Future<Output = Result<PathBuf, SaveError>> + Send {
        let path = self.path_for(name);
        let options = self.settings.options;

        async move {
            let path = path?;
            let target = path.clone();
            tokio::task::spawn_blocking(move || {
                save_prediction_with(&prediction, &target, original_size, &options)
            })
            .await??;

            tracing::debug!("Prediction written to {:?}", path);
            Ok(path)
        }
    }
}
