use crate::errors::{Error, Result};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1251, WINDOWS_1252};
use std::fs;
use std::path::Path;

/// Text decoded from a file, together with the encoding that accepted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static Encoding,
}

/// The outcome of decoding a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(Decoded),
    /// No configured encoding accepted the bytes. The file is opaque: it is
    /// never scanned and never counts as containing an ignored keyword.
    Undecodable,
}

/// Reads file content by trying an ordered list of encodings.
///
/// The default list is UTF-8, then Windows-1251, then Windows-1252. The last
/// one maps every byte, so with the defaults nothing is undecodable.
#[derive(Debug, Clone)]
pub struct ContentCodec {
    encodings: Vec<&'static Encoding>,
}

impl Default for ContentCodec {
    fn default() -> Self {
        Self {
            encodings: vec![UTF_8, WINDOWS_1251, WINDOWS_1252],
        }
    }
}

impl ContentCodec {
    pub fn new(encodings: Vec<&'static Encoding>) -> Self {
        Self { encodings }
    }

    /// Resolves WHATWG labels such as `utf-8`, `cp1251` or `latin1`.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Result<Self> {
        let encodings = labels
            .iter()
            .map(|label| {
                let label = label.as_ref().trim();
                Encoding::for_label(label.as_bytes())
                    .ok_or_else(|| Error::UnknownEncoding(label.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        if encodings.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self { encodings })
    }

    /// Reads and decodes a file. Only I/O failures are errors.
    pub fn read(&self, path: &Path) -> Result<Content> {
        let bytes = fs::read(path)?;
        Ok(self.decode(&bytes))
    }

    pub fn decode(&self, bytes: &[u8]) -> Content {
        for &encoding in &self.encodings {
            if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
                return Content::Text(Decoded {
                    text: text.into_owned(),
                    encoding,
                });
            }
        }
        Content::Undecodable
    }

    /// Encodes `text` back into the encoding it was read with.
    ///
    /// Fails when the text holds characters that encoding cannot represent,
    /// for example a replacement string outside the file's code page.
    pub fn encode(path: &Path, text: &str, encoding: &'static Encoding) -> Result<Vec<u8>> {
        let (bytes, used, had_errors) = encoding.encode(text);
        if had_errors || used != encoding {
            return Err(Error::Encode {
                path: path.to_path_buf(),
                encoding: encoding.name(),
            });
        }
        Ok(bytes.into_owned())
    }
}
