use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::form::FlexibleForm;
use super::{map_agent_error, require_field, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(in crate::api) struct QuestionForm {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct QuestionResponse {
    pub status: &'static str,
    pub question: String,
    pub answer: String,
}

pub(in crate::api) async fn general_question(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    FlexibleForm(form): FlexibleForm<QuestionForm>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let question = require_field(&req_id.0, "question", &form.question)?;
    tracing::info!(question, "general question received");

    let answer = state
        .agents
        .general_question(question)
        .await
        .map_err(|e| map_agent_error(req_id.0.clone(), "Error answering question", &e))?;

    Ok(Json(QuestionResponse {
        status: "success",
        question: question.to_owned(),
        answer,
    }))
}
