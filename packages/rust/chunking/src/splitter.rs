use tracing::{debug, instrument};

use dossier_shared::{ChunkingConfig, Document, DossierError, Result};

/// Boundaries tried in priority order when closing a window.
pub const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Validated window parameters, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    max_size: usize,
    overlap: usize,
}

impl ChunkConfig {
    /// Requires `max_size > 0` and `overlap < max_size`.
    pub fn new(max_size: usize, overlap: usize) -> Result<Self> {
        if max_size == 0 || overlap >= max_size {
            return Err(DossierError::InvalidChunkConfiguration { max_size, overlap });
        }
        Ok(Self { max_size, overlap })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl TryFrom<&ChunkingConfig> for ChunkConfig {
    type Error = DossierError;

    fn try_from(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }
}

/// Splits documents into overlapping chunks that share the parent's metadata.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: ChunkConfig,
}

impl TextSplitter {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Split one document. Empty content yields no chunks.
    pub fn split(&self, document: &Document) -> Vec<Document> {
        split_text(&document.content, self.config.max_size, self.config.overlap)
            .into_iter()
            .map(|window| document.with_content(window))
            .collect()
    }

    /// Split every document, keeping input order.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Document> {
        let chunks: Vec<Document> = documents.iter().flat_map(|doc| self.split(doc)).collect();
        debug!(
            chunks = chunks.len(),
            max_size = self.config.max_size,
            overlap = self.config.overlap,
            "split documents"
        );
        chunks
    }
}

/// Validate the parameters, then split all `documents`.
pub fn chunk(documents: &[Document], max_size: usize, overlap: usize) -> Result<Vec<Document>> {
    let config = ChunkConfig::new(max_size, overlap)?;
    Ok(TextSplitter::new(config).split_documents(documents))
}

/// Cut `text` into windows. Callers guarantee `overlap < max_size`.
fn split_text(text: &str, max_size: usize, overlap: usize) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }

    // Byte offset of every char boundary, including the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = bounds.len() - 1;

    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        if total - start <= max_size {
            windows.push(&text[bounds[start]..]);
            break;
        }
        let end = window_end(text, &bounds, start, max_size, overlap);
        windows.push(&text[bounds[start]..bounds[end]]);
        start = end - overlap;
    }
    windows
}

/// Char index where the window starting at `start` should end.
///
/// The end must leave more than `overlap` characters in the window so the
/// next window starts strictly later.
fn window_end(
    text: &str,
    bounds: &[usize],
    start: usize,
    max_size: usize,
    overlap: usize,
) -> usize {
    let earliest = start + overlap + 1;
    let latest = start + max_size;
    let window = &text[bounds[start]..bounds[latest]];

    for sep in SEPARATORS {
        let Some(pos) = window.rfind(sep) else {
            continue;
        };
        let end_byte = bounds[start] + pos + sep.len();
        if let Ok(end) = bounds.binary_search(&end_byte) {
            if end >= earliest {
                return end;
            }
        }
    }

    latest
}
