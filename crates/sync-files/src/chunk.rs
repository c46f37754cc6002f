//! Fixed-size chunking (spec §4.I).

/// The fixed chunk size file transfer splits data into: 64 KiB.
///
/// Encrypted transfers instead use `sync_crypto::ENCRYPTED_CHUNK_SIZE`
/// (this crate stays free of a crypto dependency; callers pass
/// whichever size applies).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Split `data` into `chunk_size`-sized pieces. The final chunk may be
/// shorter. Zero-length input yields zero chunks.
#[must_use]
pub fn chunk_data(data: &[u8], chunk_size: usize) -> Vec<Vec<u8>> {
    if data.is_empty() {
        return Vec::new();
    }
    data.chunks(chunk_size.max(1)).map(<[u8]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_data(&[], DEFAULT_CHUNK_SIZE).is_empty());
    }

    #[test]
    fn exact_multiple_yields_even_chunks() {
        let data = vec![0u8; DEFAULT_CHUNK_SIZE * 2];
        let chunks = chunk_data(&data, DEFAULT_CHUNK_SIZE);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() == DEFAULT_CHUNK_SIZE));
    }

    #[test]
    fn trailing_remainder_yields_a_short_final_chunk() {
        let data = vec![0u8; DEFAULT_CHUNK_SIZE + 10];
        let chunks = chunk_data(&data, DEFAULT_CHUNK_SIZE);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].len(), 10);
    }
}
