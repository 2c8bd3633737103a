// model.rs - sizes of a perception model, known without loading it
use serde::{Deserialize, Serialize};
use std::fmt;

/// Height x width x channels of a picture or feature map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub height: u32,
    pub width: u32,
    pub channels: u32,
}

impl Shape {
    pub const fn new(height: u32, width: u32, channels: u32) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Number of scalars in a flattened tensor of this shape
    pub fn len(&self) -> usize {
        self.height as usize * self.width as usize * self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.height, self.width, self.channels)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    /// Picture shape fed to the model
    pub input: Shape,
    /// Feature map shape produced by the model
    pub output: Shape,
    /// Length of the flattened feature vector
    pub width: usize,
}

impl ModelInfo {
    pub fn new(name: impl Into<String>, input: Shape, output: Shape) -> Self {
        Self {
            name: name.into(),
            input,
            output,
            width: output.len(),
        }
    }

    /// Raw pixels: the 128x128 RGB picture is its own feature vector.
    pub fn raw_pixels() -> Self {
        let shape = Shape::new(128, 128, 3);
        Self::new("none", shape, shape)
    }
}

impl Default for ModelInfo {
    fn default() -> Self {
        Self::raw_pixels()
    }
}
