use super::decoder::Picture;
use super::model::ModelInfo;
use super::Extractor;
use crate::error::{Error, Result};

/// Built-in extractor for model `none`: the picture itself is the feature vector.
pub struct RawPixels {
    info: ModelInfo,
}

impl RawPixels {
    pub fn new() -> Self {
        Self {
            info: ModelInfo::raw_pixels(),
        }
    }

    /// Raw pixels at a custom picture size
    pub fn with_info(info: ModelInfo) -> Self {
        Self { info }
    }
}

impl Default for RawPixels {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for RawPixels {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn transform(&self, batch: &[Picture]) -> Result<Vec<Vec<f32>>> {
        batch
            .iter()
            .map(|picture| {
                if picture.pixels.len() != self.info.width {
                    return Err(Error::Collaborator(format!(
                        "picture {} has {} values, model {} expects {}",
                        picture.shape,
                        picture.pixels.len(),
                        self.info.name,
                        self.info.width
                    )));
                }
                Ok(picture.pixels.clone())
            })
            .collect()
    }
}
