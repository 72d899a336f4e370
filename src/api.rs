//! REST API server for the advisor suite
//!
//! Exposes settings, the lead pipeline and the content studio via HTTP
//! endpoints. Integrates with the frontend UI.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::cloud::CloudConfig;
use crate::content::ContentStudio;
use crate::leads::{lead_from_draft, LeadStore};
use crate::models::{
    AdvisorProfile, AutomationSettings, Brand, Lead, LeadStatus, MarketTheme, RoiInput,
};
use crate::settings::SettingsStore;
use crate::SuiteError;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadRequest {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub brand_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MoveLeadRequest {
    pub status: LeadStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketPulseRequest {
    pub location: String,
    #[serde(default)]
    pub theme: Option<MarketTheme>,
    #[serde(default)]
    pub brand_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdRequest {
    pub brand_id: String,
    pub objective: String,
    pub platform: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideRequest {
    pub brand_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiRequest {
    #[serde(flatten)]
    pub input: RoiInput,
    #[serde(default)]
    pub brand_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmsRequest {
    pub content_type: String,
    pub topic: String,
    pub brand_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub content: String,
    #[serde(default)]
    pub brand_id: Option<String>,
    /// Also add parsed drafts to the pipeline.
    #[serde(default)]
    pub import: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractImageRequest {
    pub data: String,
    pub mime_type: String,
    #[serde(default)]
    pub brand_id: Option<String>,
    #[serde(default)]
    pub import: bool,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub settings: Arc<SettingsStore>,
    pub leads: Arc<LeadStore>,
    pub studio: Arc<ContentStudio>,
    pub cloud: Arc<CloudConfig>,
}

type Reply = (StatusCode, Json<ApiResponse>);

fn ok<T: Serialize>(data: T) -> Reply {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

fn fail(error: SuiteError) -> Reply {
    let status = match &error {
        SuiteError::NotFound(_) => StatusCode::NOT_FOUND,
        SuiteError::Validation(_) => StatusCode::BAD_REQUEST,
        SuiteError::Gateway(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiResponse::error(error.to_string())))
}

/// =============================
/// Health & Cloud
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn cloud_status(State(state): State<ApiState>) -> Reply {
    ok(serde_json::json!({
        "connected": state.cloud.is_connected(),
        "url": state.cloud.url,
    }))
}

/// =============================
/// Settings Endpoints
/// =============================

async fn list_brands(State(state): State<ApiState>) -> Reply {
    ok(state.settings.brands())
}

async fn get_brand(State(state): State<ApiState>, Path(id): Path<String>) -> Reply {
    match state.settings.brand(&id) {
        Some(brand) => ok(brand),
        None => fail(SuiteError::NotFound(format!("Brand {}", id))),
    }
}

async fn update_brand(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(brand): Json<Brand>,
) -> Reply {
    if brand.id != id {
        return fail(SuiteError::Validation(
            "Brand id in path and body must match".to_string(),
        ));
    }
    if state.settings.brand(&id).is_none() {
        return fail(SuiteError::NotFound(format!("Brand {}", id)));
    }
    match state.settings.update_brand(brand) {
        Ok(()) => ok(state.settings.brand(&id)),
        Err(e) => fail(e),
    }
}

async fn get_profile(State(state): State<ApiState>) -> Reply {
    ok(state.settings.profile())
}

async fn update_profile(
    State(state): State<ApiState>,
    Json(profile): Json<AdvisorProfile>,
) -> Reply {
    match state.settings.update_profile(profile) {
        Ok(()) => ok(state.settings.profile()),
        Err(e) => fail(e),
    }
}

async fn get_automation(State(state): State<ApiState>) -> Reply {
    ok(state.settings.automation())
}

async fn update_automation(
    State(state): State<ApiState>,
    Json(settings): Json<AutomationSettings>,
) -> Reply {
    match state.settings.update_automation(settings) {
        Ok(()) => ok(state.settings.automation()),
        Err(e) => fail(e),
    }
}

/// =============================
/// Lead Pipeline Endpoints
/// =============================

async fn list_leads(State(state): State<ApiState>) -> Reply {
    match state.leads.leads().await {
        Ok(leads) => ok(leads),
        Err(e) => fail(e),
    }
}

async fn create_lead(
    State(state): State<ApiState>,
    Json(req): Json<CreateLeadRequest>,
) -> Reply {
    let requirements = crate::models::LeadRequirements {
        budget: Some(req.value),
        location: req.location.clone(),
        bedrooms: req.bedrooms,
        property_type: req.property_type.clone(),
        ..Default::default()
    };

    let lead = Lead {
        id: String::new(),
        name: req.name,
        email: req.email,
        phone: req.phone,
        source: "Pipeline Manual".to_string(),
        status: LeadStatus::New,
        value: req.value,
        sentiment: 60,
        urgency: 50,
        intent: 50,
        last_activity: "Created".to_string(),
        summary: req.notes,
        personality_type: None,
        image_url: None,
        brand_id: req.brand_id,
        viewing_plan: None,
        call_logs: None,
        nurture_sequence: None,
        emails: Vec::new(),
        requirements: Some(requirements),
    };

    match state.leads.add_lead(lead).await {
        Ok(created) => (StatusCode::CREATED, Json(ApiResponse::success(created))),
        Err(e) => fail(e),
    }
}

async fn update_lead(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(lead): Json<Lead>,
) -> Reply {
    if lead.id != id {
        return fail(SuiteError::Validation(
            "Lead id in path and body must match".to_string(),
        ));
    }
    match state.leads.update_lead(lead.clone()).await {
        Ok(()) => ok(lead),
        Err(e) => fail(e),
    }
}

async fn move_lead(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<MoveLeadRequest>,
) -> Reply {
    match state.leads.move_lead(&id, req.status).await {
        Ok(lead) => ok(lead),
        Err(e) => fail(e),
    }
}

async fn delete_lead(State(state): State<ApiState>, Path(id): Path<String>) -> Reply {
    match state.leads.remove_lead(&id).await {
        Ok(()) => ok(serde_json::json!({ "deleted": id })),
        Err(e) => fail(e),
    }
}

/// Import parsed drafts, skipping contacts already in the pipeline.
async fn import_drafts(
    state: &ApiState,
    drafts: &[crate::models::LeadDraft],
    brand_id: Option<String>,
) -> Vec<Lead> {
    let mut imported = Vec::new();
    for draft in drafts {
        let lead = lead_from_draft(draft.clone(), brand_id.clone());
        match state.leads.add_lead(lead).await {
            Ok(created) => imported.push(created),
            Err(SuiteError::Validation(reason)) => {
                info!("Skipping draft during import: {}", reason)
            }
            Err(e) => {
                info!("Failed to import draft: {}", e);
            }
        }
    }
    imported
}

async fn extract_leads(
    State(state): State<ApiState>,
    Json(req): Json<ExtractRequest>,
) -> Reply {
    match state.studio.extract_leads_from_content(&req.content).await {
        Ok(extraction) => {
            let imported = if req.import {
                import_drafts(&state, &extraction.drafts, req.brand_id).await
            } else {
                Vec::new()
            };
            ok(serde_json::json!({
                "status": extraction.status,
                "drafts": extraction.drafts,
                "imported": imported,
            }))
        }
        Err(e) => fail(e),
    }
}

async fn extract_leads_from_image(
    State(state): State<ApiState>,
    Json(req): Json<ExtractImageRequest>,
) -> Reply {
    match state
        .studio
        .extract_leads_from_image(&req.data, &req.mime_type)
        .await
    {
        Ok(extraction) => {
            let imported = if req.import {
                import_drafts(&state, &extraction.drafts, req.brand_id).await
            } else {
                Vec::new()
            };
            ok(serde_json::json!({
                "status": extraction.status,
                "drafts": extraction.drafts,
                "imported": imported,
            }))
        }
        Err(e) => fail(e),
    }
}

async fn analyze_lead_emails(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Reply {
    let lead = match state.leads.lead(&id).await {
        Ok(Some(lead)) => lead,
        Ok(None) => return fail(SuiteError::NotFound(format!("Lead {}", id))),
        Err(e) => return fail(e),
    };

    if lead.emails.is_empty() {
        return fail(SuiteError::Validation(format!(
            "Lead {} has no email thread",
            id
        )));
    }

    match state.studio.analyze_email_thread(&lead.emails, &lead).await {
        Ok(analysis) => ok(analysis),
        Err(e) => fail(e),
    }
}

/// =============================
/// Content Endpoints
/// =============================

async fn market_pulse(
    State(state): State<ApiState>,
    Json(req): Json<MarketPulseRequest>,
) -> Reply {
    info!("Market pulse request for {}", req.location);

    let brand = req.brand_id.as_deref().and_then(|id| state.settings.brand(id));
    let profile = state.settings.profile();
    let theme = req.theme.unwrap_or(MarketTheme::General);

    match state
        .studio
        .market_pulse(&req.location, theme, brand.as_ref(), Some(&profile))
        .await
    {
        Ok(pulse) => ok(pulse),
        Err(e) => fail(e),
    }
}

async fn generate_ad(State(state): State<ApiState>, Json(req): Json<AdRequest>) -> Reply {
    match state
        .studio
        .generate_viral_ad(&req.brand_id, &req.objective, &req.platform)
        .await
    {
        Ok(ad) => ok(ad),
        Err(e) => fail(e),
    }
}

async fn generate_guide(State(state): State<ApiState>, Json(req): Json<GuideRequest>) -> Reply {
    match state.studio.generate_buyer_guide(&req.brand_id).await {
        Ok(text) => ok(serde_json::json!({ "text": text })),
        Err(e) => fail(e),
    }
}

async fn generate_roi(State(state): State<ApiState>, Json(req): Json<RoiRequest>) -> Reply {
    let brand = req.brand_id.as_deref().and_then(|id| state.settings.brand(id));
    let profile = state.settings.profile();

    match state
        .studio
        .generate_roi_report(&req.input, brand.as_ref(), Some(&profile))
        .await
    {
        Ok(text) => ok(serde_json::json!({ "text": text })),
        Err(e) => fail(e),
    }
}

async fn generate_cms(State(state): State<ApiState>, Json(req): Json<CmsRequest>) -> Reply {
    match state
        .studio
        .generate_cms_content(&req.content_type, &req.topic, &req.brand_id)
        .await
    {
        Ok(text) => ok(serde_json::json!({ "text": text })),
        Err(e) => fail(e),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/cloud/status", get(cloud_status))
        .route("/api/brands", get(list_brands))
        .route("/api/brands/:id", get(get_brand).put(update_brand))
        .route("/api/profile", get(get_profile).put(update_profile))
        .route("/api/automation", get(get_automation).put(update_automation))
        .route("/api/leads", get(list_leads).post(create_lead))
        .route("/api/leads/extract", post(extract_leads))
        .route("/api/leads/extract-image", post(extract_leads_from_image))
        .route("/api/leads/:id", put(update_lead).delete(delete_lead))
        .route("/api/leads/:id/status", post(move_lead))
        .route("/api/leads/:id/email-analysis", post(analyze_lead_emails))
        .route("/api/content/market-pulse", post(market_pulse))
        .route("/api/content/ads", post(generate_ad))
        .route("/api/content/guide", post(generate_guide))
        .route("/api/content/roi", post(generate_roi))
        .route("/api/content/cms", post(generate_cms))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success_shape() {
        let response = ApiResponse::success(serde_json::json!({ "ok": true }));
        assert!(response.success);
        assert!(response.error.is_none());
        assert_eq!(response.data.unwrap()["ok"], true);
    }

    #[test]
    fn test_create_lead_request_defaults() {
        let req: CreateLeadRequest =
            serde_json::from_str(r#"{"name":"Hans Muller"}"#).unwrap();
        assert_eq!(req.name, "Hans Muller");
        assert_eq!(req.value, 0.0);
        assert!(req.email.is_empty());
        assert!(req.brand_id.is_none());
    }

    #[test]
    fn test_extract_request_import_flag_defaults_off() {
        let req: ExtractRequest =
            serde_json::from_str(r#"{"content":"call notes"}"#).unwrap();
        assert!(!req.import);
        assert!(req.brand_id.is_none());
    }
}
