//! Locale placeholder substitution for outgoing HTML.
//!
//! Pages are rendered with a fixed token (e.g. `<html lang="%gatehouse.lang%">`)
//! and the token is swapped for the negotiated locale on the way out.
//! [`PlaceholderRewriter`] does this over a chunked body without buffering it.

/// Incremental find-and-replace of the first occurrence of a token in a
/// byte stream.
///
/// A token split across two chunks is still replaced: at the end of each
/// chunk the rewriter holds back the longest tail that could begin a token,
/// which is never more than `token.len() - 1` bytes. Once the token has been
/// replaced, later bytes pass through untouched.
#[derive(Debug, Clone)]
pub struct PlaceholderRewriter {
    token: Vec<u8>,
    replacement: Vec<u8>,
    carry: Vec<u8>,
    replaced: bool,
}

impl PlaceholderRewriter {
    pub fn new(token: &str, replacement: &str) -> Self {
        Self {
            token: token.as_bytes().to_vec(),
            replacement: replacement.as_bytes().to_vec(),
            carry: Vec::new(),
            replaced: token.is_empty(),
        }
    }

    /// Feeds one chunk and returns the bytes that are safe to emit.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<u8> {
        if self.replaced {
            return chunk.to_vec();
        }

        let mut buf = std::mem::take(&mut self.carry);
        buf.extend_from_slice(chunk);

        if let Some(pos) = find(&buf, &self.token) {
            self.replaced = true;
            let mut out = Vec::with_capacity(buf.len() + self.replacement.len());
            out.extend_from_slice(&buf[..pos]);
            out.extend_from_slice(&self.replacement);
            out.extend_from_slice(&buf[pos + self.token.len()..]);
            return out;
        }

        let held = partial_token_suffix(&buf, &self.token);
        self.carry = buf.split_off(buf.len() - held);
        buf
    }

    /// Flushes whatever was held back. Call once after the last chunk.
    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.carry)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Length of the longest suffix of `bytes` that is a proper prefix of `token`.
fn partial_token_suffix(bytes: &[u8], token: &[u8]) -> usize {
    let max = bytes.len().min(token.len().saturating_sub(1));
    (1..=max)
        .rev()
        .find(|&k| bytes.ends_with(&token[..k]))
        .unwrap_or(0)
}
