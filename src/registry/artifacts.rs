//! Artifact store: checksummed binary blobs for models and encoders

use crate::error::{PredictiaError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const MODEL_FILE: &str = "model.bin";
const ENCODERS_DIR: &str = "encoders";

/// On-disk wrapper around an artifact payload
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArtifactEnvelope {
    /// Magic bytes for format detection
    magic: [u8; 4],
    format_version: u32,
    payload: Vec<u8>,
    /// FNV-1a hash of `payload`
    checksum: u64,
}

impl ArtifactEnvelope {
    const MAGIC: [u8; 4] = [b'P', b'R', b'D', b'A'];
    const VERSION: u32 = 1;

    fn new(payload: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(&payload);
        Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            payload,
            checksum,
        }
    }

    fn compute_checksum(data: &[u8]) -> u64 {
        const FNV_OFFSET: u64 = 14695981039346656037;
        const FNV_PRIME: u64 = 1099511628211;

        let mut hash = FNV_OFFSET;
        for byte in data {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        hash
    }

    fn verify(&self) -> Result<()> {
        if self.magic != Self::MAGIC {
            return Err(PredictiaError::Serialization(
                "Not a model artifact (bad magic bytes)".to_string(),
            ));
        }
        if self.format_version != Self::VERSION {
            return Err(PredictiaError::Serialization(format!(
                "Unsupported artifact format version {}",
                self.format_version
            )));
        }
        if Self::compute_checksum(&self.payload) != self.checksum {
            return Err(PredictiaError::Serialization(
                "Checksum verification failed - artifact may be corrupted".to_string(),
            ));
        }
        Ok(())
    }
}

/// Filesystem store laid out as `<root>/<model_id>/model.bin` and
/// `<root>/<model_id>/encoders/<hex(column)>.bin`.
///
/// Payloads are opaque to the store.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Use `root` as-is without creating it; for read-only access
    pub fn open_read_only(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn model_dir(&self, model_id: &str) -> PathBuf {
        self.root.join(model_id)
    }

    fn model_path(&self, model_id: &str) -> PathBuf {
        self.model_dir(model_id).join(MODEL_FILE)
    }

    fn encoder_path(&self, model_id: &str, column: &str) -> PathBuf {
        let name: String = column.bytes().map(|b| format!("{b:02x}")).collect();
        self.model_dir(model_id)
            .join(ENCODERS_DIR)
            .join(format!("{name}.bin"))
    }

    pub fn save_model<M: Serialize>(&self, model_id: &str, model: &M) -> Result<()> {
        write_blob(&self.model_path(model_id), model)
    }

    pub fn load_model<M: DeserializeOwned>(&self, model_id: &str) -> Result<M> {
        read_blob(&self.model_path(model_id), model_id, MODEL_FILE)
    }

    pub fn save_encoder<E: Serialize>(&self, model_id: &str, column: &str, encoder: &E) -> Result<()> {
        write_blob(&self.encoder_path(model_id, column), encoder)
    }

    pub fn load_encoder<E: DeserializeOwned>(&self, model_id: &str, column: &str) -> Result<E> {
        read_blob(
            &self.encoder_path(model_id, column),
            model_id,
            &format!("encoder for column '{column}'"),
        )
    }

    /// Whether a model blob exists for `model_id`
    pub fn has_model(&self, model_id: &str) -> bool {
        self.model_path(model_id).is_file()
    }

    /// Remove every artifact of a model; missing artifacts are not an error
    pub fn delete_all(&self, model_id: &str) -> Result<()> {
        match fs::remove_dir_all(self.model_dir(model_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn write_blob<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| PredictiaError::Io(io::Error::new(io::ErrorKind::InvalidInput, "artifact path has no parent")))?;
    fs::create_dir_all(dir)?;

    let envelope = ArtifactEnvelope::new(bincode::serialize(value)?);
    let bytes = bincode::serialize(&envelope)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| PredictiaError::Io(e.error))?;
    Ok(())
}

fn read_blob<T: DeserializeOwned>(path: &Path, model_id: &str, artifact: &str) -> Result<T> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(PredictiaError::ArtifactNotFound {
                model_id: model_id.to_string(),
                artifact: artifact.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let envelope: ArtifactEnvelope = bincode::deserialize(&bytes)?;
    envelope.verify()?;
    Ok(bincode::deserialize(&envelope.payload)?)
}
