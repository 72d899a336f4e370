//! Marketing content studio
//!
//! Composes system instructions from the active brand, advisor profile and
//! configured output language, then drives the gateway for market analysis,
//! ad copy, buyer guides, lead extraction and email-thread analysis. Each
//! call is an independent, best-effort network request; nothing here writes
//! shared state.

use crate::error::GatewayError;
use crate::gateway::{GenerateRequest, TextGenerator, FLASH_MODEL, PRO_MODEL};
use crate::models::{
    AdCopy, AdvisorProfile, Brand, EmailMessage, EmailThreadAnalysis, ExtractionStatus, Lead,
    LeadDraft, LeadExtraction, MarketPulse, MarketTheme, RoiInput,
};
use crate::settings::SettingsStore;
use crate::{Result, SuiteError};
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::warn;

pub struct ContentStudio {
    gateway: Arc<dyn TextGenerator>,
    settings: Arc<SettingsStore>,
}

impl ContentStudio {
    pub fn new(gateway: Arc<dyn TextGenerator>, settings: Arc<SettingsStore>) -> Self {
        Self { gateway, settings }
    }

    /// System instruction shared by every content operation: role, optional
    /// brand and profile context, safety rules and the language requirement.
    fn system_context(&self, brand: Option<&Brand>, profile: Option<&AdvisorProfile>) -> String {
        let language = self.settings.language();
        let today = Utc::now().format("%-d %B %Y");

        let mut branding_context = String::new();
        if let Some(brand) = brand {
            branding_context = format!(
                "\nYOU REPRESENT: {}.\nCOMPANY TYPE: {}.\nTONE: {}.\nDESCRIPTION: {}.\nREGIONS: Specialist on Costa Blanca and Costa Calida.\n",
                brand.name, brand.business_type, brand.tone, brand.description
            );
        }

        let mut profile_context = String::new();
        if let Some(profile) = profile {
            profile_context = format!(
                "\nADVISOR: {}.\nEXPERTISE: {}.\nSIGNATURE: {}.\n",
                profile.name,
                profile.expertise.join(", "),
                profile.signature.as_deref().unwrap_or("")
            );
        }

        format!(
            r#"DATE: {today}.
ROLE: Senior Real Estate Advisor, Founder, Investor and Economist specialized in the Spanish property market.
{branding_context}{profile_context}
CRITICAL SAFETY INSTRUCTIONS:
- NEVER title yourself as "Legal Advisor".
- Never promise legal security or give definitive legal advice.
- Refer customers to external experts (lawyers/gestors) for legal/tax questions.
- Focus on value creation, market trends, investment opportunities, and lifestyle.

LANGUAGE REQUIREMENT:
- YOU MUST RESPOND EXCLUSIVELY IN: {language}.
- All text, headers, checklists, and calls to action must be in {language}."#,
            language = language.english_name(),
        )
    }

    /// Grounded market analysis for a location and theme.
    pub async fn market_pulse(
        &self,
        location: &str,
        theme: MarketTheme,
        brand: Option<&Brand>,
        profile: Option<&AdvisorProfile>,
    ) -> Result<MarketPulse> {
        let prompt = format!(
            "Create a comprehensive market analysis for {}. Theme: {}. Include specific info about Costa Blanca and Costa Calida. Analyze from an investor and advisor perspective.",
            location,
            theme.to_string().to_uppercase()
        );

        let reply = self
            .gateway
            .generate(
                GenerateRequest::new(FLASH_MODEL, prompt)
                    .with_system_instruction(self.system_context(brand, profile))
                    .with_search_grounding(),
            )
            .await
            .map_err(SuiteError::Gateway)?;

        Ok(MarketPulse {
            text: reply.text,
            sources: reply.sources,
        })
    }

    /// Structured ad copy for a brand, objective and platform.
    pub async fn generate_viral_ad(
        &self,
        brand_id: &str,
        objective: &str,
        platform: &str,
    ) -> Result<AdCopy> {
        let brand = self.settings.brand(brand_id);
        let brand_name = brand.as_ref().map(|b| b.name.clone()).unwrap_or_default();

        let prompt = format!(
            "Create viral ad for {}. Platform: {}. Objective: {}. Focus on new builds in Costa Blanca/Costa Calida. Return JSON with headlines, body text, and strategic hooks. Headlines must promise safety and solutions.",
            brand_name, platform, objective
        );

        let reply = self
            .gateway
            .generate(
                GenerateRequest::new(FLASH_MODEL, prompt)
                    .with_system_instruction(self.system_context(brand.as_ref(), None))
                    .with_json_output(),
            )
            .await
            .map_err(SuiteError::Gateway)?;

        let value = parse_json_value(&reply.text)?;
        for field in ["headlines", "bodyOptions", "viralityScore", "hooks"] {
            if value.get(field).is_none() {
                return Err(GatewayError::MissingField(field).into());
            }
        }

        serde_json::from_value(value).map_err(|e| {
            SuiteError::Gateway(GatewayError::MalformedJson {
                reason: e.to_string(),
                raw: reply.text,
            })
        })
    }

    /// Extract lead candidates from free-form inquiry notes.
    ///
    /// An unusable model reply is reported as `Unparseable` with no drafts,
    /// never as an error; transport failures still propagate.
    pub async fn extract_leads_from_content(&self, content: &str) -> Result<LeadExtraction> {
        let prompt = format!(
            "Extract real estate lead information from the following inquiry notes. Look for name, email, phone, budget (in EUR), location, and specific property requirements. Respond with a JSON array of lead objects.\n\nINQUIRY NOTES:\n{}",
            content
        );

        let reply = self
            .gateway
            .generate(GenerateRequest::new(FLASH_MODEL, prompt).with_json_output())
            .await
            .map_err(SuiteError::Gateway)?;

        Ok(drafts_from_reply(&reply.text))
    }

    /// Extract lead candidates from a registration form or business card image.
    pub async fn extract_leads_from_image(&self, base64: &str, mime: &str) -> Result<LeadExtraction> {
        let prompt = "Analyze this image of a real estate lead registration form or business card. Extract all contact details and property interests into a structured JSON array of leads.";

        let reply = self
            .gateway
            .generate(
                GenerateRequest::new(FLASH_MODEL, prompt)
                    .with_inline_data(base64, mime)
                    .with_json_output(),
            )
            .await
            .map_err(SuiteError::Gateway)?;

        Ok(drafts_from_reply(&reply.text))
    }

    /// Long-form buyer guide for a brand (pro model).
    pub async fn generate_buyer_guide(&self, brand_id: &str) -> Result<String> {
        let brand = self.settings.brand(brand_id);
        let prompt = r#"Generate a high-end buyer guide for Spanish real estate. Sell safety, quality, and lifestyle.
Include:
1. 5 catchy titles (promising solutions to uncertainty).
2. Table of Contents (Dream to Handover, 5-7 chapters).
3. Content for each chapter with subheaders, "Pro-tips" boxes (traps to avoid), and a "Viewing Checklist".
4. "Why New Build/Eco?" section.
5. Sales text for website with hook, 3 bullet points, and CTA."#;

        let reply = self
            .gateway
            .generate(
                GenerateRequest::new(PRO_MODEL, prompt)
                    .with_system_instruction(self.system_context(brand.as_ref(), None)),
            )
            .await
            .map_err(SuiteError::Gateway)?;

        Ok(reply.text)
    }

    /// Summary, sentiment and a suggested reply for a lead's email thread.
    pub async fn analyze_email_thread(
        &self,
        emails: &[EmailMessage],
        lead: &Lead,
    ) -> Result<EmailThreadAnalysis> {
        let thread = emails
            .iter()
            .map(|e| {
                format!(
                    "{} ({}): {}",
                    if e.is_incoming { "FROM CLIENT" } else { "TO CLIENT" },
                    e.date,
                    e.body
                )
            })
            .collect::<Vec<_>>()
            .join("\n---\n");

        let prompt = format!("Analyze email thread for \"{}\".\n\nTHREAD:\n{}", lead.name, thread);

        let reply = self
            .gateway
            .generate(
                GenerateRequest::new(PRO_MODEL, prompt)
                    .with_system_instruction(self.system_context(None, None))
                    .with_json_output(),
            )
            .await
            .map_err(SuiteError::Gateway)?;

        parse_typed(&reply.text).map_err(SuiteError::Gateway)
    }

    /// Investment return report text.
    pub async fn generate_roi_report(
        &self,
        input: &RoiInput,
        brand: Option<&Brand>,
        profile: Option<&AdvisorProfile>,
    ) -> Result<String> {
        let prompt = format!(
            "Investment analysis for {}. Data: Price €{}, Rent €{}/month, Expenses €{}/year, Yield {}%.",
            input.location, input.price, input.rent, input.expenses, input.yield_percent
        );

        let reply = self
            .gateway
            .generate(
                GenerateRequest::new(FLASH_MODEL, prompt)
                    .with_system_instruction(self.system_context(brand, profile)),
            )
            .await
            .map_err(SuiteError::Gateway)?;

        Ok(reply.text)
    }

    /// Free-form CMS content (blog posts, landing copy) under a brand voice.
    pub async fn generate_cms_content(
        &self,
        content_type: &str,
        topic: &str,
        brand_id: &str,
    ) -> Result<String> {
        let brand = self.settings.brand(brand_id);
        let prompt = format!("Generate {} about: {}.", content_type, topic);

        let reply = self
            .gateway
            .generate(
                GenerateRequest::new(FLASH_MODEL, prompt)
                    .with_system_instruction(self.system_context(brand.as_ref(), None)),
            )
            .await
            .map_err(SuiteError::Gateway)?;

        Ok(reply.text)
    }
}

/// Strip markdown code fences the model sometimes wraps JSON in.
fn clean_json(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

fn parse_json_value(raw: &str) -> Result<serde_json::Value> {
    serde_json::from_str(&clean_json(raw)).map_err(|e| {
        SuiteError::Gateway(GatewayError::MalformedJson {
            reason: e.to_string(),
            raw: raw.to_string(),
        })
    })
}

fn parse_typed<T: DeserializeOwned>(raw: &str) -> std::result::Result<T, GatewayError> {
    serde_json::from_str(&clean_json(raw)).map_err(|e| GatewayError::MalformedJson {
        reason: e.to_string(),
        raw: raw.to_string(),
    })
}

fn drafts_from_reply(raw: &str) -> LeadExtraction {
    match parse_typed::<Vec<LeadDraft>>(raw) {
        Ok(drafts) => LeadExtraction {
            status: ExtractionStatus::Parsed,
            drafts,
        },
        Err(e) => {
            warn!("Lead extraction reply did not parse: {}", e);
            LeadExtraction {
                status: ExtractionStatus::Unparseable,
                drafts: Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GenerateReply;
    use crate::storage::InMemoryStorage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted gateway: pops canned replies and records each request.
    struct ScriptedGateway {
        replies: Mutex<Vec<std::result::Result<GenerateReply, GatewayError>>>,
        requests: Mutex<Vec<GenerateRequest>>,
    }

    impl ScriptedGateway {
        fn returning(text: &str) -> Self {
            Self {
                replies: Mutex::new(vec![Ok(GenerateReply {
                    text: text.to_string(),
                    sources: Vec::new(),
                })]),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: GatewayError) -> Self {
            Self {
                replies: Mutex::new(vec![Err(error)]),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGateway {
        async fn generate(&self, request: GenerateRequest) -> std::result::Result<GenerateReply, GatewayError> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(GatewayError::EmptyResponse))
        }
    }

    fn studio_with(gateway: Arc<ScriptedGateway>) -> ContentStudio {
        let settings = Arc::new(SettingsStore::new(Arc::new(InMemoryStorage::new())));
        ContentStudio::new(gateway, settings)
    }

    #[tokio::test]
    async fn test_viral_ad_parses_fenced_json() {
        let gateway = Arc::new(ScriptedGateway::returning(
            "```json\n{\"headlines\":[\"Trygg bolig i Spania\"],\"bodyOptions\":[\"Nybygg ved havet\"],\"viralityScore\":8.5,\"hooks\":[\"Solgaranti\"]}\n```",
        ));
        let studio = studio_with(gateway.clone());

        let ad = studio
            .generate_viral_ad("zeneco", "Lead generation", "Facebook")
            .await
            .unwrap();

        assert_eq!(ad.headlines, vec!["Trygg bolig i Spania"]);
        assert_eq!(ad.virality_score, 8.5);

        let requests = gateway.requests.lock().unwrap();
        assert!(requests[0].json_output);
        let instruction = requests[0].system_instruction.as_deref().unwrap();
        assert!(instruction.contains("Zen Eco Homes"));
        assert!(instruction.contains("Norwegian"));
    }

    #[tokio::test]
    async fn test_viral_ad_missing_field_is_typed_error() {
        let gateway = Arc::new(ScriptedGateway::returning(
            r#"{"headlines":["A"],"bodyOptions":["B"],"hooks":["C"]}"#,
        ));
        let studio = studio_with(gateway);

        let result = studio.generate_viral_ad("zeneco", "Awareness", "Instagram").await;
        assert!(matches!(
            result,
            Err(SuiteError::Gateway(GatewayError::MissingField("viralityScore")))
        ));
    }

    #[tokio::test]
    async fn test_extraction_malformed_reply_yields_empty_drafts() {
        let gateway = Arc::new(ScriptedGateway::returning("Sorry, I cannot help with that."));
        let studio = studio_with(gateway);

        let extraction = studio
            .extract_leads_from_content("Hans (hans@example.com) wants a villa near Altea, 450k budget")
            .await
            .unwrap();

        assert_eq!(extraction.status, ExtractionStatus::Unparseable);
        assert!(extraction.drafts.is_empty());
    }

    #[tokio::test]
    async fn test_extraction_parses_drafts() {
        let gateway = Arc::new(ScriptedGateway::returning(
            r#"[{"name":"Hans Muller","email":"hans@example.com","value":450000,"location":"Altea"}]"#,
        ));
        let studio = studio_with(gateway);

        let extraction = studio.extract_leads_from_content("...").await.unwrap();
        assert_eq!(extraction.status, ExtractionStatus::Parsed);
        assert_eq!(extraction.drafts.len(), 1);
        assert_eq!(extraction.drafts[0].name, "Hans Muller");
        assert_eq!(extraction.drafts[0].value, Some(450000.0));
    }

    #[tokio::test]
    async fn test_extraction_propagates_transport_failure() {
        let gateway = Arc::new(ScriptedGateway::failing(GatewayError::NotConfigured(
            "GEMINI_API_KEY not configured".to_string(),
        )));
        let studio = studio_with(gateway);

        let result = studio.extract_leads_from_content("...").await;
        assert!(matches!(
            result,
            Err(SuiteError::Gateway(GatewayError::NotConfigured(_)))
        ));
    }

    #[tokio::test]
    async fn test_email_analysis_round_trip() {
        let gateway = Arc::new(ScriptedGateway::returning(
            r#"{"summary":"Ready to view","sentimentScore":0.8,"urgencyLevel":"high","suggestedAction":"Book viewing","suggestedEmailDraft":"Hei Hans, ..."}"#,
        ));
        let studio = studio_with(gateway.clone());

        let lead = crate::leads::lead_from_draft(
            LeadDraft {
                name: "Hans Muller".to_string(),
                email: Some("hans@example.com".to_string()),
                phone: None,
                value: None,
                location: None,
                summary: None,
                personality_type: None,
            },
            None,
        );
        let emails = vec![EmailMessage {
            id: "m1".to_string(),
            date: "2026-08-01".to_string(),
            from: "hans@example.com".to_string(),
            subject: "Viewing".to_string(),
            body: "Can we see the villa this weekend?".to_string(),
            is_incoming: true,
        }];

        let analysis = studio.analyze_email_thread(&emails, &lead).await.unwrap();
        assert_eq!(analysis.urgency_level, "high");
        assert_eq!(analysis.sentiment_score, 0.8);

        let requests = gateway.requests.lock().unwrap();
        assert!(requests[0].prompt.contains("FROM CLIENT"));
        assert!(requests[0].prompt.contains("Hans Muller"));
    }

    #[tokio::test]
    async fn test_market_pulse_requests_grounding() {
        let gateway = Arc::new(ScriptedGateway::returning("Prices are rising."));
        let studio = studio_with(gateway.clone());

        let pulse = studio
            .market_pulse("Benidorm", MarketTheme::Pricing, None, None)
            .await
            .unwrap();
        assert_eq!(pulse.text, "Prices are rising.");

        let requests = gateway.requests.lock().unwrap();
        assert!(requests[0].search_grounding);
        assert!(requests[0].prompt.contains("PRICING"));
    }

    #[test]
    fn test_clean_json_strips_fences() {
        assert_eq!(clean_json("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(clean_json("{\"a\":1}"), "{\"a\":1}");
    }
}
