//! Buffered `multipart/form-data` bodies.

/// Single field of a [`FormData`] body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormPart {
    /// Field name from the `Content-Disposition` header.
    pub name: String,
    /// File name, present for file parts only.
    pub filename: Option<String>,
    /// Raw field content.
    pub content: Vec<u8>,
}

impl FormPart {
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// Content type guessed from the file extension; `None` for text parts.
    pub fn content_type(&self) -> Option<String> {
        self.filename
            .as_ref()
            .map(|filename| mime_guess::from_path(filename).first_or_octet_stream().to_string())
    }
}

/// Multipart body with a fixed boundary, encoded into a single buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormData {
    boundary: String,
    parts: Vec<FormPart>,
}

impl Default for FormData {
    fn default() -> Self {
        Self::new()
    }
}

impl FormData {
    /// Creates an empty form with a random boundary.
    pub fn new() -> Self {
        let digits: String = (0..24)
            .map(|_| char::from(b'0' + fastrand::u8(0..10)))
            .collect();
        Self::with_boundary(format!("--------------------------{digits}"))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// Appends a file part.
    pub fn append_file(
        &mut self,
        name: impl Into<String>,
        content: impl Into<Vec<u8>>,
        filename: impl Into<String>,
    ) {
        self.parts.push(FormPart {
            name: name.into(),
            filename: Some(filename.into()),
            content: content.into(),
        });
    }

    /// Appends a plain text part.
    pub fn append_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parts.push(FormPart {
            name: name.into(),
            filename: None,
            content: value.into().into_bytes(),
        });
    }

    /// `Content-Type` header value carrying the boundary.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Encodes every part followed by the closing boundary.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(b"--");
            out.extend_from_slice(self.boundary.as_bytes());
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"",
                    escape_quoted(&part.name)
                )
                .as_bytes(),
            );
            if let (Some(filename), Some(content_type)) = (&part.filename, part.content_type()) {
                out.extend_from_slice(
                    format!(
                        "; filename=\"{}\"\r\nContent-Type: {content_type}",
                        escape_quoted(filename)
                    )
                    .as_bytes(),
                );
            }
            out.extend_from_slice(b"\r\n\r\n");
            out.extend_from_slice(&part.content);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"--");
        out.extend_from_slice(self.boundary.as_bytes());
        out.extend_from_slice(b"--\r\n");
        out
    }
}

// Quoted-string escaping for Content-Disposition parameters.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
