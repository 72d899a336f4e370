use realty_advisor_suite::{
    leads::{lead_from_draft, LeadStore},
    models::{AppLanguage, LeadDraft, LeadStatus},
    settings::SettingsStore,
    storage::InMemoryStorage,
};
use std::sync::Arc;
use tracing::info;

/// Offline walk-through of the suite: default settings, a subscription, and
/// one lead moving across the pipeline. No network calls.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("Realty Advisor Suite demo starting");

    let storage = Arc::new(InMemoryStorage::new());
    let settings = Arc::new(SettingsStore::new(storage.clone()));

    let subscription = settings.subscribe(|event| info!(?event, "Settings changed"));

    println!("\n=== BRANDS ===");
    for brand in settings.brands() {
        println!("- {} [{}] — {}", brand.name, brand.id, brand.tone);
    }
    println!("Advisor: {}", settings.profile().name);
    println!("Output language: {}", settings.language());

    let mut automation = settings.automation();
    automation.language = Some(AppLanguage::En);
    settings.update_automation(automation)?;
    println!("Output language now: {}", settings.language());

    settings.unsubscribe(subscription);

    let leads = LeadStore::local(storage);
    let lead = leads
        .add_lead(lead_from_draft(
            LeadDraft {
                name: "Hans Muller".to_string(),
                email: Some("hans@example.com".to_string()),
                phone: Some("+49 170 0000000".to_string()),
                value: Some(450_000.0),
                location: Some("Altea".to_string()),
                summary: Some("Looking for a new-build villa with sea view".to_string()),
                personality_type: None,
            },
            Some("zeneco".to_string()),
        ))
        .await?;

    info!(lead_id = %lead.id, "Lead created");

    leads.move_lead(&lead.id, LeadStatus::Qualified).await?;
    leads.move_lead(&lead.id, LeadStatus::Viewing).await?;

    println!("\n=== PIPELINE ===");
    let all = leads.leads().await?;
    for status in [
        LeadStatus::New,
        LeadStatus::Qualified,
        LeadStatus::Viewing,
        LeadStatus::Negotiation,
        LeadStatus::Won,
        LeadStatus::Lost,
    ] {
        let column: Vec<_> = all.iter().filter(|l| l.status == status).collect();
        let value: f64 = column.iter().map(|l| l.value).sum();
        println!("{:<12} {} lead(s), €{:.0}", status.to_string(), column.len(), value);
    }

    Ok(())
}
