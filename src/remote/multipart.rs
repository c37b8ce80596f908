use super::types::UploadFile;
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) struct MultipartBody {
    pub(crate) content_type: String,
    pub(crate) bytes: Vec<u8>,
}

pub(crate) fn new_boundary() -> String {
    format!(
        "----pipeline-builder-{}-{}",
        std::process::id(),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    )
}

fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|ch| *ch != '\r' && *ch != '\n')
        .map(|ch| if ch == '"' { '\'' } else { ch })
        .collect()
}

/// Single-file `multipart/form-data` body.
pub(crate) fn file_form(field: &str, file: &UploadFile, boundary: &str) -> MultipartBody {
    let mut bytes = Vec::with_capacity(file.bytes.len() + 256);
    bytes.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    bytes.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{}\"\r\n",
            sanitize_filename(&file.filename)
        )
        .as_bytes(),
    );
    bytes.extend_from_slice(format!("Content-Type: {}\r\n\r\n", file.content_type()).as_bytes());
    bytes.extend_from_slice(&file.bytes);
    bytes.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    MultipartBody {
        content_type: format!("multipart/form-data; boundary={boundary}"),
        bytes,
    }
}
