//! Metadata store adapter: extraction requests in, chunks out.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use dossier_shared::{Document, DossierError, Result, SubjectExtractionRequest};

/// File name of the request list inside the data directory.
pub const REQUESTS_FILE: &str = "extraction_metadata.json";

/// File name of the chunk output inside the data directory.
pub const CHUNKS_FILE: &str = "chunks.jsonl";

/// Source of extraction requests and sink for finished chunks.
pub trait MetadataStore {
    fn load_requests(&self) -> Result<Vec<SubjectExtractionRequest>>;
    fn store_chunks(&self, chunks: &[Document]) -> Result<()>;
}

/// JSON request list plus JSON Lines chunk output on the local filesystem.
#[derive(Debug, Clone)]
pub struct JsonMetadataStore {
    requests_path: PathBuf,
    chunks_path: PathBuf,
}

impl JsonMetadataStore {
    /// Default file names under `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        Self::with_paths(dir.join(REQUESTS_FILE), dir.join(CHUNKS_FILE))
    }

    pub fn with_paths(requests_path: impl Into<PathBuf>, chunks_path: impl Into<PathBuf>) -> Self {
        Self {
            requests_path: requests_path.into(),
            chunks_path: chunks_path.into(),
        }
    }

    pub fn requests_path(&self) -> &Path {
        &self.requests_path
    }

    pub fn chunks_path(&self) -> &Path {
        &self.chunks_path
    }

    /// Whether the request file exists.
    pub fn has_requests(&self) -> bool {
        self.requests_path.is_file()
    }
}

impl MetadataStore for JsonMetadataStore {
    #[instrument(skip_all, fields(path = %self.requests_path.display()))]
    fn load_requests(&self) -> Result<Vec<SubjectExtractionRequest>> {
        let raw = fs::read_to_string(&self.requests_path)
            .map_err(|e| DossierError::io(&self.requests_path, e))?;
        let requests: Vec<SubjectExtractionRequest> = serde_json::from_str(&raw)?;
        debug!(requests = requests.len(), "loaded extraction metadata");
        Ok(requests)
    }

    #[instrument(skip_all, fields(path = %self.chunks_path.display(), chunks = chunks.len()))]
    fn store_chunks(&self, chunks: &[Document]) -> Result<()> {
        if let Some(parent) = self.chunks_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| DossierError::io(parent, e))?;
            }
        }

        let file = File::create(&self.chunks_path)
            .map_err(|e| DossierError::io(&self.chunks_path, e))?;
        let mut writer = BufWriter::new(file);
        for chunk in chunks {
            serde_json::to_writer(&mut writer, chunk)?;
            writer
                .write_all(b"\n")
                .map_err(|e| DossierError::io(&self.chunks_path, e))?;
        }
        writer
            .flush()
            .map_err(|e| DossierError::io(&self.chunks_path, e))?;

        debug!("chunks written");
        Ok(())
    }
}
