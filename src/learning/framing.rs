/// Longest unterminated text kept, far beyond any diagnostic line.
pub const MAX_PENDING: usize = 1024;

/// Splits a byte stream into trimmed text lines.
///
/// UTF-8 sequences cut between two chunks are completed by the next chunk,
/// invalid bytes turn into U+FFFD. The text after the last newline is kept
/// until more bytes arrive.
#[derive(Default)]
pub struct LineFramer {
    undecoded: Vec<u8>,
    buffer: String,
}

impl LineFramer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.decode(chunk);

        let mut lines = Vec::new();
        while let Some(end) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=end).collect();
            lines.push(line.trim().to_string());
        }
        if self.buffer.len() > MAX_PENDING {
            log::warn!(
                "Dropping {} bytes received without a newline, check the line speed",
                self.buffer.len()
            );
            self.buffer.clear();
        }
        lines
    }

    /// Text received after the last newline.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    fn decode(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.undecoded);
        bytes.extend_from_slice(chunk);

        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    return;
                }
                Err(error) => {
                    let (valid, tail) = rest.split_at(error.valid_up_to());
                    self.buffer.push_str(&String::from_utf8_lossy(valid));
                    match error.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[len..];
                        }
                        None => {
                            self.undecoded = tail.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_line_waits_for_newline() {
        let mut framer = LineFramer::default();
        assert!(framer.push(b"Protocol: NEC Co").is_empty());
        assert_eq!(framer.pending(), "Protocol: NEC Co");
        assert_eq!(
            framer.push(b"de: 0x10\n"),
            vec!["Protocol: NEC Code: 0x10".to_string()]
        );
        assert_eq!(framer.pending(), "");
    }

    #[test]
    fn test_several_lines_in_one_chunk_are_trimmed() {
        let mut framer = LineFramer::default();
        let lines = framer.push(b"  Ready\r\nProtocol: SONY Code: 0x1\r\nrest");
        assert_eq!(lines, vec!["Ready", "Protocol: SONY Code: 0x1"]);
        assert_eq!(framer.pending(), "rest");
    }

    #[test]
    fn test_multibyte_sequence_split_across_chunks() {
        let mut framer = LineFramer::default();
        let bytes = "Grüße\n".as_bytes();
        // Cut inside the two byte encoding of 'ü'.
        assert!(framer.push(&bytes[..3]).is_empty());
        assert_eq!(framer.push(&bytes[3..]), vec!["Grüße".to_string()]);
    }

    #[test]
    fn test_endless_fragment_is_dropped() {
        let mut framer = LineFramer::default();
        let noise = vec![b'~'; MAX_PENDING / 2];
        assert!(framer.push(&noise).is_empty());
        assert_eq!(framer.pending().len(), MAX_PENDING / 2);
        assert!(framer.push(&noise).is_empty());
        assert!(framer.push(b"~").is_empty());
        assert_eq!(framer.pending(), "");

        assert_eq!(
            framer.push(b"Protocol: NEC Code: 0x10\n"),
            vec!["Protocol: NEC Code: 0x10".to_string()]
        );
    }

    #[test]
    fn test_invalid_bytes_become_replacement() {
        let mut framer = LineFramer::default();
        assert_eq!(
            framer.push(b"a\xFFb\n"),
            vec!["a\u{FFFD}b".to_string()]
        );
    }
}
