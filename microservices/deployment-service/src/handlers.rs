//! HTTP handlers for the deployment service

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use frontdesk_store::agents::AgentRepository;
use frontdesk_store::AgentStatus;

use crate::error::{Error, Result};
use crate::workflow::{self, DeployRequest};
use crate::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "deployment-service"
    }))
}

pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if state.db.is_healthy().await {
        (StatusCode::OK, Json(json!({ "ready": true })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "ready": false })),
        )
    }
}

/// Trigger a deployment. The workflow runs on a spawned task; the 202
/// response only acknowledges that it started. Progress is observed by
/// polling the status endpoint.
pub async fn deploy(
    State(state): State<AppState>,
    Json(request): Json<DeployRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let agent = AgentRepository::new(&state.db)
        .find_by_ids(request.customer_id, request.agent_id)
        .await?
        .ok_or_else(|| Error::AgentNotFound(request.agent_id.to_string()))?;

    if agent.status != AgentStatus::Deploying {
        return Err(Error::NotDeploying(request.agent_id.to_string()));
    }

    let execution_id = Uuid::new_v4();
    let agent_id = request.agent_id;

    info!(
        execution_id = %execution_id,
        agent_id = %agent_id,
        customer_id = %request.customer_id,
        "Deployment triggered"
    );

    tokio::spawn(workflow::run_deployment(state.clone(), request));

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "execution_id": execution_id,
            "agent_id": agent_id,
            "status": "deploying"
        })),
    ))
}

/// Deployment progress for the customer's newest agent.
pub async fn deploy_status(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let status = AgentRepository::new(&state.db)
        .deploy_status(customer_id)
        .await?;

    let Some(mut status) = status else {
        return Ok(Json(json!({ "status": "not_started" })));
    };

    // Placeholder ids assigned before stage 1 completes are internal.
    if status
        .external_agent_id
        .as_deref()
        .is_some_and(|id| id.starts_with("temp_"))
    {
        status.external_agent_id = None;
    }

    let body = serde_json::to_value(&status).map_err(|e| Error::Internal(e.to_string()))?;
    Ok(Json(body))
}
