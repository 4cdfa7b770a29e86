//! Medication information and price lookups.

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::form::FlexibleForm;
use super::{map_agent_error, require_field, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(in crate::api) struct MedicationForm {
    pub medication_name: String,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct MedicationInfoResponse {
    pub status: &'static str,
    pub medication: String,
    pub information: String,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct MedicationPricesResponse {
    pub status: &'static str,
    pub medication: String,
    pub prices: String,
}

pub(in crate::api) async fn medication_info(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    FlexibleForm(form): FlexibleForm<MedicationForm>,
) -> Result<Json<MedicationInfoResponse>, ApiError> {
    let medication = require_field(&req_id.0, "medication_name", &form.medication_name)?;
    tracing::info!(medication, "medication info requested");

    let information = state
        .agents
        .medication_info(medication)
        .await
        .map_err(|e| map_agent_error(req_id.0.clone(), "Error getting medication info", &e))?;

    Ok(Json(MedicationInfoResponse {
        status: "success",
        medication: medication.to_owned(),
        information,
    }))
}

pub(in crate::api) async fn medication_prices(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    FlexibleForm(form): FlexibleForm<MedicationForm>,
) -> Result<Json<MedicationPricesResponse>, ApiError> {
    let medication = require_field(&req_id.0, "medication_name", &form.medication_name)?;
    tracing::info!(medication, "medication prices requested");

    let prices = state
        .agents
        .medication_prices(medication)
        .await
        .map_err(|e| map_agent_error(req_id.0.clone(), "Error getting medication prices", &e))?;

    Ok(Json(MedicationPricesResponse {
        status: "success",
        medication: medication.to_owned(),
        prices,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use tower::ServiceExt;

    use super::super::test_support::{
        app_with, app_with_keys, json_body, post_form, StubGenerator, StubReply,
    };

    #[tokio::test]
    async fn medication_info_accepts_urlencoded_form() {
        let llm = Arc::new(StubGenerator::text("A dipirona é um analgésico."));
        let app = app_with(Arc::clone(&llm));

        let response = app
            .oneshot(post_form(
                "/api/agents/medication-info",
                "application/x-www-form-urlencoded",
                "medication_name=dipirona",
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["medication"], "dipirona");
        assert_eq!(json["information"], "A dipirona é um analgésico.");
        assert!(llm.calls()[0].0.contains("\"dipirona\""));
    }

    #[tokio::test]
    async fn medication_prices_accepts_json_and_is_public() {
        let app = app_with_keys(Arc::new(StubGenerator::text("Entre R$ 5 e R$ 10.")), &["k"]);

        let response = app
            .oneshot(post_form(
                "/api/agents/medication-prices",
                "application/json",
                r#"{"medication_name":"paracetamol"}"#,
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["medication"], "paracetamol");
        assert_eq!(json["prices"], "Entre R$ 5 e R$ 10.");
    }

    #[tokio::test]
    async fn medication_info_requires_name() {
        let app = app_with(Arc::new(StubGenerator::text("unused")));

        let response = app
            .oneshot(post_form(
                "/api/agents/medication-info",
                "application/x-www-form-urlencoded",
                "other=1",
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "validation_error");
        assert!(json["meta"]["request_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn medication_info_rewrites_api_key_errors() {
        let app = app_with(Arc::new(StubGenerator::new(StubReply::InvalidApiKey)));

        let response = app
            .oneshot(post_form(
                "/api/agents/medication-info",
                "application/json",
                r#"{"medication_name":"dipirona"}"#,
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert_eq!(
            json["error"]["message"],
            "API key for Gemini not configured correctly. Please check the server configuration."
        );
    }
}
