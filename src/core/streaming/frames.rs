use bytes::Bytes;

/// One chunk of synthesized audio delivered over a streaming session.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Strictly increasing within a session
    pub sequence: u64,
    pub payload: Bytes,
    /// Set on exactly the last frame of a synthesis
    pub is_final: bool,
    pub duration_ms: Option<u32>,
    pub processing_time_ms: u64,
    pub cached: bool,
}

/// Splits `audio` into chunks of at most `frame_bytes` without copying.
///
/// Empty audio yields a single empty chunk so that a synthesis always
/// produces a final frame.
pub fn segment(audio: &Bytes, frame_bytes: usize) -> Vec<Bytes> {
    if audio.is_empty() {
        return vec![Bytes::new()];
    }

    let frame_bytes = frame_bytes.max(1);
    let mut frames = Vec::with_capacity(audio.len().div_ceil(frame_bytes));
    let mut offset = 0;
    while offset < audio.len() {
        let end = (offset + frame_bytes).min(audio.len());
        frames.push(audio.slice(offset..end));
        offset = end;
    }
    frames
}

/// Share of `total_duration_ms` carried by a chunk of `chunk_len` bytes.
pub fn chunk_duration_ms(total_duration_ms: Option<u32>, total_len: usize, chunk_len: usize) -> Option<u32> {
    let total = total_duration_ms?;
    if total_len == 0 {
        return Some(0);
    }
    Some((total as u64 * chunk_len as u64 / total_len as u64) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_sizes() {
        let audio = Bytes::from(vec![7u8; 10_000]);
        let frames = segment(&audio, 4800);
        let sizes: Vec<usize> = frames.iter().map(Bytes::len).collect();
        assert_eq!(sizes, vec![4800, 4800, 400]);

        let joined: Vec<u8> = frames.iter().flat_map(|f| f.iter().copied()).collect();
        assert_eq!(joined, audio.to_vec());
    }

    #[test]
    fn test_segment_is_zero_copy() {
        let audio = Bytes::from(vec![1u8; 100]);
        let frames = segment(&audio, 60);
        assert_eq!(frames[0].as_ptr(), audio.as_ptr());
        assert_eq!(frames[1].as_ptr(), audio[60..].as_ptr());
    }

    #[test]
    fn test_segment_edge_cases() {
        assert_eq!(segment(&Bytes::new(), 4800), vec![Bytes::new()]);
        assert_eq!(segment(&Bytes::from_static(b"abc"), 0).len(), 3);
        assert_eq!(segment(&Bytes::from_static(b"abc"), 4800).len(), 1);
    }

    #[test]
    fn test_chunk_duration() {
        assert_eq!(chunk_duration_ms(Some(1000), 48_000, 4800), Some(100));
        assert_eq!(chunk_duration_ms(None, 48_000, 4800), None);
        assert_eq!(chunk_duration_ms(Some(0), 0, 0), Some(0));
    }
}
