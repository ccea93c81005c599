//! HTTP-backed [`RecordStore`].
//!
//! Sends one multipart POST per submission and reads a single documented
//! response envelope:
//!
//! - success (2xx): `{"id": <string | number>}`
//! - failure: `{"message": string, "code"?: string}`
//!
//! Anything else is reported as a malformed response with a truncated preview
//! of the body.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use schoolhub_api::RecordStoreClient;
use schoolhub_types::RecordId;
use schoolhub_util::{
    http::{RESPONSE_PREVIEW_LIMIT, parse_response_json_strict, status_error_message, truncate_response_preview},
    redact_sensitive,
};
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::SubmissionError,
    submission::{RecordStore, SubmissionPayload},
};

#[derive(Debug, Deserialize)]
struct CreatedEnvelope {
    id: RecordId,
}

#[derive(Debug, Deserialize)]
struct FailureEnvelope {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Record store reached over HTTP through a [`RecordStoreClient`].
#[derive(Debug, Clone)]
pub struct HttpRecordStore {
    client: RecordStoreClient,
    default_path: String,
}

impl HttpRecordStore {
    /// `default_path` is used for payloads whose intake declares no path.
    pub fn new(client: RecordStoreClient, default_path: impl Into<String>) -> Self {
        Self {
            client,
            default_path: default_path.into(),
        }
    }

    fn build_form(payload: &SubmissionPayload) -> Result<Form, SubmissionError> {
        let mut form = Form::new();
        for (name, value) in &payload.fields {
            form = form.text(name.clone(), value.clone());
        }
        for attachment in &payload.attachments {
            let part = Part::bytes(attachment.bytes.to_vec())
                .file_name(attachment.file_name.clone())
                .mime_str(&attachment.mime_type)
                .map_err(|error| SubmissionError::Transport(format!("invalid MIME type for '{}': {error}", attachment.field)))?;
            form = form.part(attachment.wire_name.clone(), part);
        }
        Ok(form)
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn create_record(&self, payload: &SubmissionPayload) -> Result<RecordId, SubmissionError> {
        let path = payload.path.as_deref().unwrap_or(&self.default_path);
        let form = Self::build_form(payload)?;
        debug!(
            path,
            fields = payload.fields.len(),
            attachments = payload.attachments.len(),
            "dispatching submission"
        );

        let response = self
            .client
            .post_multipart(path, form)
            .await
            .map_err(|error| SubmissionError::Transport(redact_sensitive(&format!("{error:#}"))))?;
        interpret_response(response.status, &response.body)
    }
}

/// Map a record store response onto a record id or a submission error.
pub fn interpret_response(status: StatusCode, body: &str) -> Result<RecordId, SubmissionError> {
    if status.is_success() {
        let value = parse_response_json_strict(body, Some(status))
            .map_err(|error| SubmissionError::MalformedResponse(error.to_string()))?;
        return serde_json::from_value::<CreatedEnvelope>(value)
            .map(|created| created.id)
            .map_err(|error| {
                SubmissionError::MalformedResponse(format!(
                    "expected a record id ({error}); body: {}",
                    truncate_response_preview(body, RESPONSE_PREVIEW_LIMIT)
                ))
            });
    }

    let envelope = serde_json::from_str::<FailureEnvelope>(body)
        .ok()
        .filter(|envelope| !envelope.message.trim().is_empty());
    let (message, code) = match envelope {
        Some(FailureEnvelope { message, code }) => (message, code),
        None => (
            status_error_message(status.as_u16())
                .unwrap_or_else(|| truncate_response_preview(body, RESPONSE_PREVIEW_LIMIT)),
            None,
        ),
    };
    Err(SubmissionError::Rejected {
        status: status.as_u16(),
        code,
        message: redact_sensitive(&message),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::submission::PayloadAttachment;

    #[test]
    fn success_envelope_accepts_string_and_numeric_ids() {
        let id = interpret_response(StatusCode::CREATED, r#"{"id": "stu-12"}"#).expect("string id");
        assert_eq!(id.as_str(), "stu-12");

        let id = interpret_response(StatusCode::OK, r#"{"id": 34, "status": "ok"}"#).expect("numeric id");
        assert_eq!(id.as_str(), "34");
    }

    #[test]
    fn success_without_id_is_malformed() {
        let error = interpret_response(StatusCode::OK, r#"{"ok": true}"#).expect_err("no id");
        assert!(matches!(error, SubmissionError::MalformedResponse(_)));

        let error = interpret_response(StatusCode::OK, "<html>ok</html>").expect_err("not json");
        match error {
            SubmissionError::MalformedResponse(message) => assert!(message.contains("<html>ok</html>")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn failure_envelope_is_surfaced() {
        let error = interpret_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"message": "Admission number already exists", "code": "DUPLICATE"}"#,
        )
        .expect_err("rejected");
        match error {
            SubmissionError::Rejected { status, code, message } => {
                assert_eq!(status, 422);
                assert_eq!(code.as_deref(), Some("DUPLICATE"));
                assert_eq!(message, "Admission number already exists");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn failure_without_envelope_falls_back_to_hints_and_previews() {
        let error = interpret_response(StatusCode::UNAUTHORIZED, "").expect_err("401");
        assert!(error.to_string().contains("SCHOOLHUB_API_TOKEN"));

        let error = interpret_response(StatusCode::BAD_GATEWAY, "upstream\nunavailable").expect_err("502");
        match error {
            SubmissionError::Rejected { message, code, .. } => {
                assert_eq!(message, "upstream unavailable");
                assert!(code.is_none());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn form_rejects_unparseable_mime_types() {
        let payload = SubmissionPayload {
            intake: "registration".into(),
            path: None,
            fields: vec![("firstName".into(), "Asha".into())],
            attachments: vec![PayloadAttachment {
                field: "studentPhoto".into(),
                wire_name: "studentPhoto".into(),
                file_name: "photo.png".into(),
                mime_type: "not a mime".into(),
                bytes: Arc::from(vec![1_u8, 2, 3]),
            }],
        };
        assert!(matches!(
            HttpRecordStore::build_form(&payload),
            Err(SubmissionError::Transport(_))
        ));
    }
}
