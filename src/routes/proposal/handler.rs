use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    AppState,
    ai::ProposalForm,
    error::WorkflowError,
    routes::group::model::StudentGroup,
    utils::{Claims, error_codes, error_to_api_response, success_to_api_response},
};

use super::model::{Proposal, SaveProposalRequest};

#[derive(Debug, Deserialize)]
pub struct GenerateTitleRequest {
    pub description: String,
    pub field: String,
}

#[derive(Debug, Deserialize)]
pub struct ImproveDescriptionRequest {
    pub text: String,
    pub field: String,
}

#[derive(Debug, Deserialize)]
pub struct SuggestKeywordsRequest {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct FullProposalRequest {
    pub title: String,
    pub description: String,
    pub field: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_project_type")]
    pub project_type: String,
}

fn default_project_type() -> String {
    "thesis".to_string()
}

async fn member_group(state: &AppState, claims: &Claims) -> Result<StudentGroup, WorkflowError> {
    StudentGroup::find_by_member(&state.pool, &claims.sub)
        .await?
        .ok_or(WorkflowError::NotFound("小组"))
}

#[axum::debug_handler]
pub async fn get_my_proposal(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let group = match member_group(&state, &claims).await {
        Ok(group) => group,
        Err(e) => return e.to_response(),
    };

    match Proposal::find_by_group(&state.pool, &group.group_id).await {
        Ok(Some(proposal)) => (StatusCode::OK, success_to_api_response(proposal)),
        Ok(None) => WorkflowError::NotFound("选题书").to_response(),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn save_proposal(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SaveProposalRequest>,
) -> impl IntoResponse {
    let group = match member_group(&state, &claims).await {
        Ok(group) => group,
        Err(e) => return e.to_response(),
    };

    match Proposal::save(&state.pool, &group.group_id, req).await {
        Ok(proposal) => (StatusCode::OK, success_to_api_response(proposal)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn submit_proposal(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let group = match member_group(&state, &claims).await {
        Ok(group) => group,
        Err(e) => return e.to_response(),
    };

    match Proposal::submit(&state.pool, &group.group_id).await {
        Ok(proposal) => (StatusCode::OK, success_to_api_response(proposal)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn generate_title(
    State(state): State<AppState>,
    Json(req): Json<GenerateTitleRequest>,
) -> impl IntoResponse {
    match state.ai.generate_title(&req.description, &req.field).await {
        Ok(title) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({ "title": title })),
        ),
        Err(e) => {
            tracing::error!("AI title generation failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                error_to_api_response(error_codes::INTERNAL_ERROR, "文本生成服务不可用".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn generate_full_proposal(
    State(state): State<AppState>,
    Json(req): Json<FullProposalRequest>,
) -> impl IntoResponse {
    let form = ProposalForm {
        title: req.title,
        description: req.description,
        field: req.field,
        keywords: req.keywords,
        project_type: req.project_type,
    };
    match state.ai.generate_full_proposal(&form).await {
        Ok(text) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({ "full_proposal": text })),
        ),
        Err(e) => {
            tracing::error!("AI proposal generation failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                error_to_api_response(error_codes::INTERNAL_ERROR, "文本生成服务不可用".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn improve_description(
    State(state): State<AppState>,
    Json(req): Json<ImproveDescriptionRequest>,
) -> impl IntoResponse {
    match state.ai.improve_description(&req.text, &req.field).await {
        Ok(text) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({ "text": text })),
        ),
        Err(e) => {
            tracing::error!("AI description improvement failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                error_to_api_response(error_codes::INTERNAL_ERROR, "文本生成服务不可用".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn suggest_keywords(
    State(state): State<AppState>,
    Json(req): Json<SuggestKeywordsRequest>,
) -> impl IntoResponse {
    match state.ai.suggest_keywords(&req.title, &req.description).await {
        Ok(keywords) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({ "keywords": keywords })),
        ),
        Err(e) => {
            tracing::error!("AI keyword suggestion failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                error_to_api_response(error_codes::INTERNAL_ERROR, "文本生成服务不可用".to_string()),
            )
        }
    }
}
