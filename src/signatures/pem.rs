//! PEM armoring for signatures and keys.
//!
//! Supports RFC 1421 style headers (`Key: Value` lines between the BEGIN line
//! and a blank line), which strict RFC 7468 codecs reject. Signature blocks
//! carry the signature algorithm in such a header.
//!
//! Encoded form:
//!
//! ```text
//! -----BEGIN SIGNATURE-----
//! Signature Algorithm: RSASSA-PKCS1-V1_5
//!
//! <base64, 64 columns>
//! -----END SIGNATURE-----
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::BTreeMap;
use thiserror::Error;

use compdesc_model::SIGNATURE_PEM_BLOCK_TYPE;

const BEGIN: &str = "-----BEGIN ";
const END: &str = "-----END ";
const DASHES: &str = "-----";
const LINE_WIDTH: usize = 64;

/// Errors decoding PEM data
#[derive(Debug, Error)]
pub enum PemError {
    #[error("missing END line for pem block '{0}'")]
    MissingEnd(String),

    #[error("END line '{found}' does not match pem block '{expected}'")]
    MismatchedEnd { expected: String, found: String },

    #[error("malformed BEGIN line: {0}")]
    MalformedBegin(String),

    #[error("malformed header line in pem block '{block}': {line}")]
    MalformedHeader { block: String, line: String },

    #[error("invalid base64 in pem block '{block}': {source}")]
    Base64 {
        block: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("unexpected data after last pem block: {0}")]
    TrailingData(String),
}

/// A decoded PEM block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemBlock {
    /// Type from the BEGIN/END lines, e.g. `SIGNATURE`.
    pub block_type: String,
    pub headers: BTreeMap<String, String>,
    pub bytes: Vec<u8>,
}

impl PemBlock {
    pub fn new(block_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            block_type: block_type.into(),
            headers: BTreeMap::new(),
            bytes,
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// Encode a block. Headers are written in key order, followed by a blank line.
pub fn encode(block: &PemBlock) -> String {
    let mut out = String::new();
    out.push_str(BEGIN);
    out.push_str(&block.block_type);
    out.push_str(DASHES);
    out.push('\n');

    for (key, value) in &block.headers {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push('\n');
    }
    if !block.headers.is_empty() {
        out.push('\n');
    }

    let body = STANDARD.encode(&block.bytes);
    // base64 output is ASCII, so byte chunks are valid UTF-8
    for chunk in body.as_bytes().chunks(LINE_WIDTH) {
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        out.push('\n');
    }

    out.push_str(END);
    out.push_str(&block.block_type);
    out.push_str(DASHES);
    out.push('\n');
    out
}

/// Decode the first block in `data`, returning it and the remaining input.
///
/// Text before the BEGIN line is skipped. Returns `Ok(None)` when `data`
/// contains no BEGIN line.
pub fn decode(data: &str) -> Result<Option<(PemBlock, &str)>, PemError> {
    let start = match data.find(BEGIN) {
        Some(i) => i,
        None => return Ok(None),
    };
    let rest = &data[start + BEGIN.len()..];

    let (begin_line, mut rest) = split_line(rest);
    let begin_line = begin_line.trim_end_matches('\r');
    let block_type = begin_line
        .strip_suffix(DASHES)
        .ok_or_else(|| PemError::MalformedBegin(begin_line.to_string()))?
        .to_string();

    let mut headers = BTreeMap::new();
    let mut body = String::new();
    let mut in_headers = true;

    loop {
        if rest.is_empty() {
            return Err(PemError::MissingEnd(block_type));
        }
        let (line, next) = split_line(rest);
        rest = next;
        let line = line.trim_end_matches('\r');

        if let Some(end) = line.strip_prefix(END) {
            let end_type = end.strip_suffix(DASHES).unwrap_or(end);
            if end_type != block_type {
                return Err(PemError::MismatchedEnd {
                    expected: block_type,
                    found: end_type.to_string(),
                });
            }
            break;
        }

        if in_headers {
            if line.trim().is_empty() {
                in_headers = false;
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                headers.insert(key.trim().to_string(), value.trim().to_string());
                continue;
            }
            if !headers.is_empty() {
                return Err(PemError::MalformedHeader {
                    block: block_type,
                    line: line.to_string(),
                });
            }
            in_headers = false;
        }

        body.extend(line.chars().filter(|c| !c.is_whitespace()));
    }

    let bytes = STANDARD.decode(body.as_bytes()).map_err(|source| PemError::Base64 {
        block: block_type.clone(),
        source,
    })?;

    Ok(Some((
        PemBlock {
            block_type,
            headers,
            bytes,
        },
        rest,
    )))
}

/// Decode every block in `data`.
///
/// Whitespace between and after blocks is allowed; any other text after the
/// last block is an error.
pub fn decode_all(data: &str) -> Result<Vec<PemBlock>, PemError> {
    let mut blocks = Vec::new();
    let mut rest = data;
    while let Some((block, next)) = decode(rest)? {
        blocks.push(block);
        rest = next;
    }
    if !rest.trim().is_empty() {
        return Err(PemError::TrailingData(rest.trim().to_string()));
    }
    Ok(blocks)
}

/// All blocks of type `SIGNATURE` in `data`.
pub fn signature_blocks(data: &str) -> Result<Vec<PemBlock>, PemError> {
    Ok(decode_all(data)?
        .into_iter()
        .filter(|b| b.block_type == SIGNATURE_PEM_BLOCK_TYPE)
        .collect())
}

fn split_line(s: &str) -> (&str, &str) {
    match s.find('\n') {
        Some(i) => (&s[..i], &s[i + 1..]),
        None => (s, ""),
    }
}
