//! Raw float32 vector files.
//!
//! A cached vector is a headerless, native-endian array of `f32` stored at a
//! path derived from the item path by swapping its extension for a suffix.


use crate::error::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const FLOAT_BYTES: usize = 4;

/// Path of the `suffix` artifact for `item`, relocated into `cache_dir` when given.
pub fn cache_path(item: &Path, suffix: &str, cache_dir: Option<&Path>) -> PathBuf {
    let renamed = item.with_extension(suffix);
    match (cache_dir, renamed.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => renamed,
    }
}

/// Number of floats a vector file holds, or `None` if it is missing, empty
/// or not a whole number of floats.
pub fn probe(path: &Path) -> Option<usize> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => {
            let len = meta.len() as usize;
            (len % FLOAT_BYTES == 0).then_some(len / FLOAT_BYTES)
        }
        _ => None,
    }
}

/// Write `vector` to `path` through a temporary sibling, so readers never
/// observe a partial file.
pub fn write(path: &Path, vector: &[f32]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let bytes: Vec<u8> = vector.iter().flat_map(|f| f.to_ne_bytes()).collect();

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    if let Err(e) = fs::write(&tmp, &bytes).and_then(|_| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// Read a vector written by [`write`].
pub fn read(path: &Path) -> Result<Vec<f32>> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::consistency(path, "file is missing"),
        _ => Error::consistency(path, e.to_string()),
    })?;

    if bytes.is_empty() {
        return Err(Error::consistency(path, "file is empty"));
    }
    if bytes.len() % FLOAT_BYTES != 0 {
        return Err(Error::consistency(
            path,
            format!("{} bytes is not a whole number of floats", bytes.len()),
        ));
    }

    Ok(bytes
        .chunks_exact(FLOAT_BYTES)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Vector files of one cache location (next to the items or in a cache directory).
#[derive(Debug, Clone, Default)]
pub struct VectorFiles {
    cache_dir: Option<PathBuf>,
}

impl VectorFiles {
    pub fn new(cache_dir: Option<PathBuf>) -> Self {
        Self { cache_dir }
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    pub fn path(&self, item: &Path, suffix: &str) -> PathBuf {
        cache_path(item, suffix, self.cache_dir())
    }

    pub fn exists(&self, item: &Path, suffix: &str) -> bool {
        self.path(item, suffix).exists()
    }

    /// Read one file per suffix and concatenate them in suffix order.
    pub fn read_concat(&self, item: &Path, suffixes: &[String]) -> Result<Vec<f32>> {
        let mut out = Vec::new();
        for suffix in suffixes {
            out.extend(read(&self.path(item, suffix))?);
        }
        Ok(out)
    }

    /// Read one vector per item, each expected to hold exactly `width` floats.
    pub fn read_batch(
        &self,
        items: &[&Path],
        suffixes: &[String],
        width: usize,
    ) -> Result<Vec<Vec<f32>>> {
        items
            .iter()
            .map(|item| {
                let vector = self.read_concat(item, suffixes)?;
                if vector.len() != width {
                    return Err(Error::consistency(
                        *item,
                        format!(
                            "{} vectors hold {} floats, expected {}",
                            suffixes.join(","),
                            vector.len(),
                            width
                        ),
                    ));
                }
                Ok(vector)
            })
            .collect()
    }

    /// Write `vectors[i]` as the `suffix` artifact of `items[i]`.
    pub fn write_batch(
        &self,
        items: &[&Path],
        suffix: &str,
        vectors: &[Vec<f32>],
        width: usize,
    ) -> Result<()> {
        if items.len() != vectors.len() {
            return Err(Error::Collaborator(format!(
                "{} vectors for {} items",
                vectors.len(),
                items.len()
            )));
        }

        for (item, vector) in items.iter().zip(vectors) {
            if vector.len() != width {
                return Err(Error::Collaborator(format!(
                    "vector for {} has {} floats, expected {}",
                    item.display(),
                    vector.len(),
                    width
                )));
            }
            write(&self.path(item, suffix), vector)?;
        }
        Ok(())
    }
}
