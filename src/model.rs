//! Trained-model storage: the compacter's token table plus every level's trie,
//! written as LZ4-framed bincode.

use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::compacter::ExpressionCompacter;
use crate::error::FlagError;
use crate::trie::Trie;

/// Magic bytes identifying LZ4-compressed model files.
pub const LZ4_MAGIC: &[u8; 4] = b"LZ4S";

/// Bumped whenever the serialized layout of [`Model`] changes.
pub const MODEL_FORMAT_VERSION: u32 = 1;

pub const MODEL_EXTENSION: &str = "cfmodel";

/// Everything a scan needs from training.
#[derive(Serialize, Deserialize, Debug)]
pub struct Model {
    pub format_version: u32,
    /// Compacter tokens in ID order.
    pub tokens: Vec<String>,
    pub tries: Vec<Trie>,
}

/// Borrowed twin of [`Model`] used for writing; same bincode layout.
#[derive(Serialize)]
struct ModelRef<'a> {
    format_version: u32,
    tokens: Vec<String>,
    tries: &'a [Trie],
}

impl Model {
    /// Split into a rebuilt compacter and the tries.
    pub fn into_parts(self) -> (ExpressionCompacter, Vec<Trie>) {
        (ExpressionCompacter::from_tokens(self.tokens), self.tries)
    }
}

/// Default model directory: `<local data dir>/condflag`.
/// Tests should pass their own path instead.
pub fn model_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("condflag")
}

/// Default model file for a training corpus, named after its file stem.
pub fn default_model_path(corpus: &Path) -> PathBuf {
    let stem = corpus
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());
    model_dir().join(format!("{}.{}", stem, MODEL_EXTENSION))
}

/// Write the compacter and `tries` to `path`: magic bytes, then
/// LZ4-compressed bincode.
pub fn save_model(
    path: &Path,
    compacter: &ExpressionCompacter,
    tries: &[Trie],
) -> Result<(), FlagError> {
    let start = Instant::now();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(LZ4_MAGIC)?;
    let mut encoder = lz4_flex::frame::FrameEncoder::new(writer);
    let model = ModelRef {
        format_version: MODEL_FORMAT_VERSION,
        tokens: compacter.tokens(),
        tries,
    };
    bincode::serialize_into(&mut encoder, &model)?;
    let mut writer = encoder.finish().map_err(std::io::Error::other)?;
    writer.flush()?;

    let size = std::fs::metadata(path)?.len();
    info!(
        path = %path.display(),
        levels = tries.len(),
        size_mb = format_args!("{:.2}", size as f64 / 1_048_576.0),
        elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
        "Saved model"
    );
    Ok(())
}

/// Read a model written by [`save_model`].
pub fn load_model(path: &Path) -> Result<Model, FlagError> {
    let path_str = path.display().to_string();
    let load_error = |message: String| FlagError::ModelLoad {
        path: path_str.clone(),
        message,
    };
    let start = Instant::now();

    let file = std::fs::File::open(path)
        .map_err(|e| load_error(format!("cannot open file: {}", e)))?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .map_err(|e| load_error(format!("read error (magic bytes): {}", e)))?;
    if &magic != LZ4_MAGIC {
        return Err(load_error("not a model file (bad magic bytes)".to_string()));
    }

    let decoder = lz4_flex::frame::FrameDecoder::new(reader);
    let model: Model = bincode::deserialize_from(decoder)
        .map_err(|e| load_error(format!("LZ4 deserialization failed: {}", e)))?;
    if model.format_version != MODEL_FORMAT_VERSION {
        return Err(load_error(format!(
            "unsupported format version {} (expected {})",
            model.format_version, MODEL_FORMAT_VERSION
        )));
    }

    info!(
        path = %path.display(),
        levels = model.tries.len(),
        tokens = model.tokens.len(),
        elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
        "Loaded model"
    );
    Ok(model)
}
