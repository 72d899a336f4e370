//! Core data models for the advisor suite

use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Enums =================
//

/// Output language for generated content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppLanguage {
    No,
    En,
    Es,
    De,
    Ru,
    Fr,
}

impl AppLanguage {
    /// English name of the language, used in prompt instructions.
    pub fn english_name(&self) -> &'static str {
        match self {
            AppLanguage::No => "Norwegian",
            AppLanguage::En => "English",
            AppLanguage::Es => "Spanish",
            AppLanguage::De => "German",
            AppLanguage::Ru => "Russian",
            AppLanguage::Fr => "French",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LeadStatus {
    New,
    Qualified,
    Viewing,
    Negotiation,
    Won,
    Lost,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MarketTheme {
    Pricing,
    Infrastructure,
    Legal,
    General,
}

//
// ================= Brand =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationSettings {
    pub facebook_active: bool,
    pub instagram_active: bool,
    pub linkedin_active: bool,
    pub tiktok_active: bool,
    pub youtube_active: bool,
    pub pinterest_active: bool,
    pub email_sync_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiktok_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinterest_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_app_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrandVisualStyles {
    pub primary_color: String,
    pub secondary_color: String,
    pub font_heading: String,
    pub font_body: String,
}

/// A business identity the advisor operates under.
///
/// The id is immutable once created; there is exactly one record per id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub business_type: String,
    pub description: String,
    pub tone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone2: Option<String>,
    pub website: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_styles: Option<BrandVisualStyles>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrations: Option<IntegrationSettings>,
}

//
// ================= Advisor Profile =================
//

/// The single logged-in advisor's public identity (singleton record).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorProfile {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone2: Option<String>,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub expertise: Vec<String>,
}

//
// ================= Automation Settings =================
//

/// Feature toggles plus the selected output language (singleton record).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutomationSettings {
    pub market_pulse_enabled: bool,
    pub brand_identity_guard_enabled: bool,
    pub social_sync_enabled: bool,
    pub lead_nurture_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<AppLanguage>,
}

//
// ================= Lead =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub id: String,
    pub date: String,
    pub from: String,
    pub subject: String,
    pub body: String,
    pub is_incoming: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallLog {
    pub id: String,
    pub date: String,
    pub time: String,
    pub duration: String,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ViewingStatus {
    Confirmed,
    Pending,
    Completed,
    Delayed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewingItem {
    pub id: String,
    pub property_title: String,
    pub property_location: String,
    pub time: String,
    pub contact_person: String,
    pub contact_phone: String,
    pub status: ViewingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maps_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NurtureChannel {
    Email,
    WhatsApp,
    Call,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NurtureStatus {
    Pending,
    Sent,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NurtureStep {
    pub id: String,
    pub day: u32,
    #[serde(rename = "type")]
    pub channel: NurtureChannel,
    pub subject: String,
    pub status: NurtureStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeadRequirements {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
}

/// A sales prospect moving through the pipeline.
///
/// The id is assigned at creation and never reused.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub source: String,
    pub status: LeadStatus,
    pub value: f64,
    pub sentiment: u8,
    pub urgency: u8,
    pub intent: u8,
    pub last_activity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewing_plan: Option<Vec<ViewingItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_logs: Option<Vec<CallLog>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nurture_sequence: Option<Vec<NurtureStep>>,
    #[serde(default)]
    pub emails: Vec<EmailMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<LeadRequirements>,
}

//
// ================= Content Outputs =================
//

/// A cited source attached to grounded market analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceLink {
    pub title: String,
    pub url: String,
}

/// Market analysis text plus its grounding sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketPulse {
    pub text: String,
    pub sources: Vec<SourceLink>,
}

/// Structured ad copy returned by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdCopy {
    pub headlines: Vec<String>,
    pub body_options: Vec<String>,
    pub virality_score: f64,
    pub hooks: Vec<String>,
}

/// A lead candidate extracted from free text or an image.
///
/// Only the name is required; everything else is best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality_type: Option<String>,
}

/// Whether the gateway reply for an extraction parsed cleanly.
///
/// Lets callers distinguish "no leads found" from "extraction failed".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Parsed,
    Unparseable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadExtraction {
    pub status: ExtractionStatus,
    pub drafts: Vec<LeadDraft>,
}

/// Analysis of a lead's email thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailThreadAnalysis {
    pub summary: String,
    pub sentiment_score: f64,
    pub urgency_level: String,
    pub suggested_action: String,
    pub suggested_email_draft: String,
}

/// Input for an investment return report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiInput {
    pub location: String,
    pub price: f64,
    pub rent: f64,
    pub expenses: f64,
    #[serde(rename = "yield")]
    pub yield_percent: String,
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LeadStatus::New => "NEW",
            LeadStatus::Qualified => "QUALIFIED",
            LeadStatus::Viewing => "VIEWING",
            LeadStatus::Negotiation => "NEGOTIATION",
            LeadStatus::Won => "WON",
            LeadStatus::Lost => "LOST",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for MarketTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketTheme::Pricing => "pricing",
            MarketTheme::Infrastructure => "infrastructure",
            MarketTheme::Legal => "legal",
            MarketTheme::General => "general",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for AppLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppLanguage::No => "no",
            AppLanguage::En => "en",
            AppLanguage::Es => "es",
            AppLanguage::De => "de",
            AppLanguage::Ru => "ru",
            AppLanguage::Fr => "fr",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brand_round_trip_uses_camel_case() {
        let brand = Brand {
            id: "soleada".to_string(),
            name: "Soleada.no".to_string(),
            business_type: "Agency".to_string(),
            description: "Luxury International Agency".to_string(),
            tone: "Professional".to_string(),
            logo: None,
            email: "info@soleada.no".to_string(),
            phone: "+47 000 00 000".to_string(),
            phone2: None,
            website: "https://soleada.no".to_string(),
            visual_styles: None,
            integrations: Some(IntegrationSettings::default()),
        };

        let json = serde_json::to_string(&brand).unwrap();
        assert!(json.contains("\"type\":\"Agency\""));
        assert!(json.contains("facebookActive"));
        assert!(!json.contains("phone2"));

        let back: Brand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, brand);
    }

    #[test]
    fn test_lead_status_wire_format() {
        let json = serde_json::to_string(&LeadStatus::Negotiation).unwrap();
        assert_eq!(json, "\"NEGOTIATION\"");
        let back: LeadStatus = serde_json::from_str("\"WON\"").unwrap();
        assert_eq!(back, LeadStatus::Won);
    }

    #[test]
    fn test_lead_draft_tolerates_missing_optionals() {
        let draft: LeadDraft = serde_json::from_str(r#"{"name":"Kari Nordmann"}"#).unwrap();
        assert_eq!(draft.name, "Kari Nordmann");
        assert!(draft.email.is_none());
        assert!(draft.value.is_none());
    }

    #[test]
    fn test_language_names() {
        assert_eq!(AppLanguage::No.english_name(), "Norwegian");
        assert_eq!(AppLanguage::Es.english_name(), "Spanish");
        assert_eq!(AppLanguage::No.to_string(), "no");
    }
}
