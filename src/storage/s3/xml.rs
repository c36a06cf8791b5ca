//! XML bodies used by the S3 REST API

use serde::Deserialize;

use crate::error::{AgentError, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateMultipartUploadResult {
    upload_id: String,
}

/// `<Error><Code>…</Code><Message>…</Message></Error>`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3ErrorBody {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Extract the upload id from a CreateMultipartUpload response
pub fn parse_upload_id(body: &str) -> Result<String> {
    quick_xml::de::from_str::<InitiateMultipartUploadResult>(body)
        .map(|result| result.upload_id)
        .map_err(|e| AgentError::RemoteTransfer(format!("malformed multipart response: {}", e)))
}

/// Parse an S3 error document, if the body is one
pub fn parse_error(body: &str) -> Option<S3ErrorBody> {
    quick_xml::de::from_str(body).ok()
}

/// Body for CompleteMultipartUpload; `parts` must be sorted by part number
pub fn complete_multipart_body(parts: &[(u32, String)]) -> String {
    let mut body = String::from("<CompleteMultipartUpload>");
    for (number, etag) in parts {
        body.push_str(&format!(
            "<Part><PartNumber>{}</PartNumber><ETag>{}</ETag></Part>",
            number,
            quick_xml::escape::escape(etag.as_str())
        ));
    }
    body.push_str("</CompleteMultipartUpload>");
    body
}
