//! Exam upload analysis and follow-up questions.

use std::path::Path;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;
use crate::pdf::extract_pdf_text_blocking;

use super::form::FlexibleForm;
use super::{map_agent_error, require_field, ApiError, AppState};

/// Multipart part carrying the exam document.
const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub(in crate::api) struct ExamQuestionForm {
    pub question: String,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct AnalyzeExamResponse {
    pub status: &'static str,
    pub filename: String,
    pub session_id: String,
    pub analysis: String,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct ExamQuestionResponse {
    pub status: &'static str,
    pub session_id: String,
    pub answer: String,
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

pub(in crate::api) async fn analyze_exam(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeExamResponse>, ApiError> {
    let mut multipart = multipart
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.body_text()))?;
    let upload = read_upload(&req_id.0, &mut multipart, state.max_upload_bytes).await?;
    tracing::info!(filename = %upload.filename, bytes = upload.bytes.len(), "exam upload received");

    if !has_pdf_extension(&upload.filename) {
        tracing::warn!(filename = %upload.filename, "rejected non-PDF upload");
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "Only PDF files are accepted",
        ));
    }

    let text = extract_pdf_text_blocking(upload.bytes).await.map_err(|e| {
        tracing::warn!(filename = %upload.filename, error = %e, "PDF extraction failed");
        ApiError::new(req_id.0.clone(), "unprocessable_document", e.to_string())
    })?;

    let result = state
        .agents
        .analyze_exam(&text)
        .await
        .map_err(|e| map_agent_error(req_id.0.clone(), "Error processing file", &e))?;

    Ok(Json(AnalyzeExamResponse {
        status: "success",
        filename: upload.filename,
        session_id: result.session_id,
        analysis: result.analysis,
    }))
}

pub(in crate::api) async fn exam_question(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    FlexibleForm(form): FlexibleForm<ExamQuestionForm>,
) -> Result<Json<ExamQuestionResponse>, ApiError> {
    let question = require_field(&req_id.0, "question", &form.question)?;
    let session_id = require_field(&req_id.0, "session_id", &form.session_id)?;
    tracing::info!(session_id, "exam question received");

    let answer = state
        .agents
        .answer_exam_question(session_id, question)
        .await
        .map_err(|e| map_agent_error(req_id.0.clone(), "Error answering exam question", &e))?;

    Ok(Json(ExamQuestionResponse {
        status: "success",
        session_id: session_id.to_owned(),
        answer,
    }))
}

/// Reads the `file` part, stopping as soon as it exceeds `max_bytes`.
async fn read_upload(
    req_id: &str,
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<Upload, ApiError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(req_id, &e, max_bytes))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_owned();
        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(req_id, &e, max_bytes))?
        {
            if bytes.len() + chunk.len() > max_bytes {
                tracing::warn!(filename = %filename, max_bytes, "exam upload too large");
                return Err(too_large(req_id, max_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(Upload { filename, bytes });
    }

    Err(ApiError::new(
        req_id,
        "validation_error",
        "a PDF file is required in the 'file' field",
    ))
}

fn multipart_error(req_id: &str, error: &MultipartError, max_bytes: usize) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return too_large(req_id, max_bytes);
    }
    ApiError::new(req_id, "validation_error", error.body_text())
}

fn too_large(req_id: &str, max_bytes: usize) -> ApiError {
    ApiError::new(
        req_id,
        "payload_too_large",
        format!(
            "File too large. Maximum allowed size is {}.",
            format_size(max_bytes)
        ),
    )
}

/// Human-readable upload cap: whole or one-decimal megabytes, else bytes.
fn format_size(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes % MIB == 0 {
        return format!("{}MB", bytes / MIB);
    }
    let tenths = bytes.saturating_mul(10) / MIB;
    if tenths == 0 {
        return format!("{bytes} bytes");
    }
    if tenths % 10 == 0 {
        format!("{}MB", tenths / 10)
    } else {
        format!("{}.{}MB", tenths / 10, tenths % 10)
    }
}

fn has_pdf_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use tower::ServiceExt;

    use super::super::test_support::{
        app_with, app_with_keys, json_body, multipart_upload, post_form, StubGenerator, StubReply,
    };
    use super::*;
    use crate::pdf::fixtures::{blank_pdf, pdf_with_pages};
    use crate::prompts::{EXAM_DISCLAIMER, SESSION_NOT_FOUND_MESSAGE};

    #[test]
    fn pdf_extension_is_case_insensitive() {
        assert!(has_pdf_extension("exame.pdf"));
        assert!(has_pdf_extension("EXAME.PDF"));
        assert!(!has_pdf_extension("exame.txt"));
        assert!(!has_pdf_extension("pdf"));
        assert!(!has_pdf_extension(""));
    }

    #[test]
    fn upload_cap_is_reported_without_truncating_to_zero() {
        assert_eq!(format_size(5 * 1024 * 1024), "5MB");
        assert_eq!(format_size(3 * 1024 * 1024 / 2), "1.5MB");
        assert_eq!(format_size(512 * 1024), "0.5MB");
        assert_eq!(format_size(1000), "1000 bytes");
    }

    #[tokio::test]
    async fn analyze_exam_requires_auth_before_reading_the_upload() {
        let llm = Arc::new(StubGenerator::text("unused"));
        let app = app_with_keys(Arc::clone(&llm), &["token-1"]);

        let response = app
            .oneshot(multipart_upload("exame.txt", b"not a pdf", None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "unauthorized");
        assert_eq!(json["error"]["message"], "Not authenticated");
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn analyze_exam_rejects_files_over_the_cap() {
        let app = app_with(Arc::new(StubGenerator::text("unused")));
        let six_mb = vec![b'a'; 6 * 1024 * 1024];

        let response = app
            .oneshot(multipart_upload("exame.pdf", &six_mb, None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "payload_too_large");
        assert_eq!(
            json["error"]["message"],
            "File too large. Maximum allowed size is 5MB."
        );
    }

    #[tokio::test]
    async fn analyze_exam_rejects_non_pdf_files() {
        let llm = Arc::new(StubGenerator::text("unused"));
        let app = app_with(Arc::clone(&llm));

        let response = app
            .oneshot(multipart_upload("exame.txt", b"Hemoglobina 13", None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"]["message"], "Only PDF files are accepted");
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn analyze_exam_rejects_unreadable_pdf() {
        let app = app_with(Arc::new(StubGenerator::text("unused")));

        let response = app
            .oneshot(multipart_upload("exame.pdf", b"%PDF-1.4 garbage", None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "unprocessable_document");
    }

    #[tokio::test]
    async fn analyze_exam_rejects_pdf_without_text() {
        let app = app_with(Arc::new(StubGenerator::text("unused")));

        let response = app
            .oneshot(multipart_upload("exame.pdf", &blank_pdf(), None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn analyze_exam_requires_file_field() {
        let app = app_with(Arc::new(StubGenerator::text("unused")));
        let response = app
            .oneshot(post_form(
                "/api/agents/analyze-exam",
                "multipart/form-data; boundary=XBOUNDARY",
                "--XBOUNDARY--\r\n",
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn analyze_exam_returns_session_and_disclaimer_for_two_page_pdf() {
        let llm = Arc::new(StubGenerator::text("✅ Resumo geral do exame\nValores normais."));
        let app = app_with_keys(Arc::clone(&llm), &["token-1"]);
        let pdf = pdf_with_pages(&["Hemoglobina 13.5 g/dL", "Glicose 92 mg/dL"]);

        let response = app
            .oneshot(multipart_upload("Exame.PDF", &pdf, Some("token-1")))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["filename"], "Exame.PDF");
        assert!(!json["session_id"].as_str().unwrap().is_empty());
        assert!(json["analysis"].as_str().unwrap().ends_with(EXAM_DISCLAIMER));

        let prompt = &llm.calls()[0].0;
        assert!(prompt.contains("Hemoglobina"));
        assert!(prompt.contains("Glicose"));
    }

    #[tokio::test]
    async fn analyze_exam_rewrites_missing_model_error() {
        let app = app_with(Arc::new(StubGenerator::new(StubReply::ModelNotFound)));
        let pdf = pdf_with_pages(&["Colesterol 180"]);

        let response = app
            .oneshot(multipart_upload("exame.pdf", &pdf, None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "upstream_error");
        assert_eq!(
            json["error"]["message"],
            "The AI model is not available. Please check the server logs for details."
        );
    }

    #[tokio::test]
    async fn exam_question_with_unknown_session_is_an_apology() {
        let app = app_with(Arc::new(StubGenerator::text("unused")));

        let response = app
            .oneshot(post_form(
                "/api/agents/exam-question",
                "application/json",
                r#"{"question":"Está tudo bem?","session_id":"missing"}"#,
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["session_id"], "missing");
        assert_eq!(json["answer"], SESSION_NOT_FOUND_MESSAGE);
    }

    #[tokio::test]
    async fn exam_question_answers_about_uploaded_exam() {
        let llm = Arc::new(StubGenerator::text("Sua hemoglobina está normal."));
        let app = app_with(Arc::clone(&llm));
        let pdf = pdf_with_pages(&["Hemoglobina 13.5 g/dL"]);

        let upload = app
            .clone()
            .oneshot(multipart_upload("exame.pdf", &pdf, None))
            .await
            .expect("response");
        let session_id = json_body(upload).await["session_id"]
            .as_str()
            .unwrap()
            .to_owned();

        let response = app
            .oneshot(post_form(
                "/api/agents/exam-question",
                "application/x-www-form-urlencoded",
                &format!("question=E+a+hemoglobina%3F&session_id={session_id}"),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["answer"], "Sua hemoglobina está normal.");
        let follow_up = &llm.calls()[1].0;
        assert!(follow_up.contains("Hemoglobina"));
        assert!(follow_up.contains("\"E a hemoglobina?\""));
    }

    #[tokio::test]
    async fn exam_question_rejects_blank_question() {
        let app = app_with(Arc::new(StubGenerator::text("unused")));

        let response = app
            .oneshot(post_form(
                "/api/agents/exam-question",
                "application/json",
                r#"{"question":"  ","session_id":"abc"}"#,
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
