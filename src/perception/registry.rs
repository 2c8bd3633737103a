use super::model::{ModelInfo, Shape};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Lookup table from model id to its sizes
pub struct ModelRegistry {
    map: HashMap<String, ModelInfo>,
}

impl ModelRegistry {
    /// Registry pre-populated with raw pixels and the ImageNet backbones
    pub fn new() -> Self {
        let mut registry = Self::empty();
        let imagenet = Shape::new(224, 224, 3);

        registry.register(ModelInfo::raw_pixels());
        for (name, output) in [
            ("resnet50", Shape::new(7, 7, 2048)),
            ("resnet152v2", Shape::new(7, 7, 2048)),
            ("vgg16", Shape::new(7, 7, 512)),
            ("inceptionv3", Shape::new(5, 5, 2048)),
            ("efficientnetb6", Shape::new(7, 7, 2304)),
            ("densenet121", Shape::new(7, 7, 1024)),
            ("densenet169", Shape::new(7, 7, 1664)),
            ("densenet201", Shape::new(7, 7, 1920)),
        ] {
            registry.register(ModelInfo::new(name, imagenet, output));
        }
        registry
    }

    pub fn empty() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Register (or replace) a model under its own name
    pub fn register(&mut self, info: ModelInfo) {
        self.map.insert(info.name.clone(), info);
    }

    pub fn get(&self, name: &str) -> Result<&ModelInfo> {
        self.map.get(name).ok_or_else(|| {
            let mut known = self.names();
            known.sort_unstable();
            Error::config(format!(
                "unknown model {} (known: {})",
                name,
                known.join(", ")
            ))
        })
    }

    pub fn model_count(&self) -> usize {
        self.map.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.map.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
