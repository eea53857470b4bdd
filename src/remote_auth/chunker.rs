use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// A blob's base64 text split into size-bounded parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedChunks {
    pub chunks: Vec<String>,
    /// Length of the full encoded text, before splitting.
    pub total_len: usize,
}

impl EncodedChunks {
    pub fn parts(&self) -> usize {
        self.chunks.len()
    }
}

/// Base64-encode `blob` and split the text into parts of at most
/// `max_chunk_chars` characters.
///
/// Text shorter than `max_chunk_chars` comes back as a single part; whether to
/// store it as one unsegmented value is up to the caller. The last part is
/// never empty, except for the empty blob, which yields one empty part.
pub fn encode_and_split(blob: &[u8], max_chunk_chars: usize) -> EncodedChunks {
    let max_chunk_chars = max_chunk_chars.max(1);
    let encoded = STANDARD.encode(blob);
    let total_len = encoded.len();

    if total_len < max_chunk_chars {
        return EncodedChunks {
            chunks: vec![encoded],
            total_len,
        };
    }

    // Base64 output is ASCII, so byte offsets are char offsets.
    let chunks = encoded
        .as_bytes()
        .chunks(max_chunk_chars)
        .map(|part| String::from_utf8_lossy(part).into_owned())
        .collect();

    EncodedChunks { chunks, total_len }
}

/// Concatenate parts in order and decode them back into the original blob.
pub fn join_and_decode<S: AsRef<str>>(chunks: &[S]) -> Result<Vec<u8>, base64::DecodeError> {
    let joined: String = chunks.iter().map(AsRef::as_ref).collect();
    STANDARD.decode(joined.as_bytes())
}
