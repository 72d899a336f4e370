//! Lead pipeline store
//!
//! Owns the kanban pipeline: leads are created from form input or AI
//! extraction drafts, replaced whole-record on update, and moved between
//! statuses until won or lost. Persists to the local key-value medium by
//! default and to Postgres when cloud sync is configured. Ids are assigned
//! at creation and never reused; a lead with a known email address gets a
//! stable content-derived id so repeated imports of the same contact
//! collide instead of silently duplicating.

use crate::cloud::CloudConfig;
use crate::error::SuiteError;
use crate::models::{Lead, LeadDraft, LeadRequirements, LeadStatus};
use crate::storage::KeyValueStorage;
use crate::Result;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{OnceCell, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// Storage key for the locally persisted pipeline.
pub const LEADS_KEY: &str = "rf_leads";

/// Handle returned by `subscribe`; removes exactly that listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeadSubscriptionId(u64);

type Listener = Box<dyn Fn() + Send + Sync>;

enum LeadBackend {
    Local {
        storage: Arc<dyn KeyValueStorage>,
        cache: RwLock<Vec<Lead>>,
    },
    Postgres {
        pool: PgPool,
        schema_ready: OnceCell<()>,
    },
}

pub struct LeadStore {
    backend: LeadBackend,
    listeners: Mutex<Vec<(LeadSubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
}

impl LeadStore {
    /// Store backed by the local key-value medium.
    pub fn local(storage: Arc<dyn KeyValueStorage>) -> Self {
        let cache = load_local(storage.as_ref());
        Self {
            backend: LeadBackend::Local {
                storage,
                cache: RwLock::new(cache),
            },
            listeners: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
        }
    }

    /// Pick the backend from the cloud configuration: Postgres when sync is
    /// configured and a database URL is present, local otherwise.
    pub fn from_cloud(cloud: &CloudConfig, fallback: Arc<dyn KeyValueStorage>) -> Self {
        if cloud.is_connected() {
            if let Some(url) = &cloud.database_url {
                match sqlx::postgres::PgPoolOptions::new()
                    .max_connections(5)
                    .connect_lazy(url)
                {
                    Ok(pool) => {
                        info!("Lead store backend: postgres");
                        return Self {
                            backend: LeadBackend::Postgres {
                                pool,
                                schema_ready: OnceCell::new(),
                            },
                            listeners: Mutex::new(Vec::new()),
                            next_subscription: AtomicU64::new(0),
                        };
                    }
                    Err(error) => {
                        warn!(
                            "Failed to initialize postgres lead backend, falling back to local: {}",
                            error
                        );
                    }
                }
            }
        }

        info!("Lead store backend: local");
        Self::local(fallback)
    }

    async fn ensure_schema_if_needed(&self) -> Result<()> {
        let LeadBackend::Postgres { pool, schema_ready } = &self.backend else {
            return Ok(());
        };

        schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS pipeline_leads (
                      id TEXT PRIMARY KEY,
                      status TEXT NOT NULL,
                      value DOUBLE PRECISION NOT NULL,
                      record TEXT NOT NULL,
                      updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_pipeline_leads_status_time
                    ON pipeline_leads (status, updated_at);
                    "#,
                )
                .execute(pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                SuiteError::Database(format!("Failed to initialize lead schema: {}", e))
            })?;

        Ok(())
    }

    // =============================
    // Reads
    // =============================

    pub async fn leads(&self) -> Result<Vec<Lead>> {
        match &self.backend {
            LeadBackend::Local { cache, .. } => Ok(cache.read().await.clone()),
            LeadBackend::Postgres { pool, .. } => {
                self.ensure_schema_if_needed().await?;

                let rows = sqlx::query(
                    "SELECT record FROM pipeline_leads ORDER BY updated_at ASC",
                )
                .fetch_all(pool)
                .await
                .map_err(|e| SuiteError::Database(format!("Failed to load leads: {}", e)))?;

                let mut leads = Vec::with_capacity(rows.len());
                for row in rows {
                    let record: String = row.try_get("record").unwrap_or_default();
                    match serde_json::from_str::<Lead>(&record) {
                        Ok(lead) => leads.push(lead),
                        Err(e) => warn!("Skipping corrupt lead record: {}", e),
                    }
                }
                Ok(leads)
            }
        }
    }

    pub async fn lead(&self, id: &str) -> Result<Option<Lead>> {
        match &self.backend {
            LeadBackend::Local { cache, .. } => {
                Ok(cache.read().await.iter().find(|l| l.id == id).cloned())
            }
            LeadBackend::Postgres { pool, .. } => {
                self.ensure_schema_if_needed().await?;

                let row = sqlx::query("SELECT record FROM pipeline_leads WHERE id = $1")
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| SuiteError::Database(format!("Failed to load lead: {}", e)))?;

                match row {
                    Some(row) => {
                        let record: String = row.try_get("record").unwrap_or_default();
                        let lead = serde_json::from_str(&record)?;
                        Ok(Some(lead))
                    }
                    None => Ok(None),
                }
            }
        }
    }

    // =============================
    // Mutations
    // =============================

    /// Insert a new lead. Assigns an id when none is set; rejects duplicates
    /// so an id is never reused for a different prospect.
    pub async fn add_lead(&self, mut lead: Lead) -> Result<Lead> {
        if lead.name.trim().is_empty() {
            return Err(SuiteError::Validation("Lead name is required".to_string()));
        }
        if lead.id.trim().is_empty() {
            lead.id = lead_id_for(Some(&lead.email));
        }

        match &self.backend {
            LeadBackend::Local { storage, cache } => {
                let mut guard = cache.write().await;
                if guard.iter().any(|l| l.id == lead.id) {
                    return Err(SuiteError::Validation(format!(
                        "Lead id already exists: {}",
                        lead.id
                    )));
                }
                let mut next = guard.clone();
                next.push(lead.clone());
                persist_local(storage.as_ref(), &next)?;
                *guard = next;
            }
            LeadBackend::Postgres { pool, .. } => {
                self.ensure_schema_if_needed().await?;

                let record = serde_json::to_string(&lead)?;
                sqlx::query(
                    r#"
                    INSERT INTO pipeline_leads (id, status, value, record)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(&lead.id)
                .bind(lead.status.to_string())
                .bind(lead.value)
                .bind(&record)
                .execute(pool)
                .await
                .map_err(|e| match e {
                    sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                        SuiteError::Validation(format!("Lead id already exists: {}", lead.id))
                    }
                    other => SuiteError::Database(format!("Failed to insert lead: {}", other)),
                })?;
            }
        }

        self.notify();
        Ok(lead)
    }

    /// Whole-record replace of an existing lead; last writer wins.
    pub async fn update_lead(&self, lead: Lead) -> Result<()> {
        match &self.backend {
            LeadBackend::Local { storage, cache } => {
                let mut guard = cache.write().await;
                let Some(index) = guard.iter().position(|l| l.id == lead.id) else {
                    return Err(SuiteError::NotFound(format!("Lead {}", lead.id)));
                };
                let mut next = guard.clone();
                next[index] = lead;
                persist_local(storage.as_ref(), &next)?;
                *guard = next;
            }
            LeadBackend::Postgres { pool, .. } => {
                self.ensure_schema_if_needed().await?;

                let record = serde_json::to_string(&lead)?;
                let result = sqlx::query(
                    r#"
                    UPDATE pipeline_leads
                    SET status = $2, value = $3, record = $4, updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(&lead.id)
                .bind(lead.status.to_string())
                .bind(lead.value)
                .bind(&record)
                .execute(pool)
                .await
                .map_err(|e| SuiteError::Database(format!("Failed to update lead: {}", e)))?;

                if result.rows_affected() == 0 {
                    return Err(SuiteError::NotFound(format!("Lead {}", lead.id)));
                }
            }
        }

        self.notify();
        Ok(())
    }

    /// Move a lead to another pipeline column, refreshing its last activity.
    pub async fn move_lead(&self, id: &str, status: LeadStatus) -> Result<Lead> {
        let Some(mut lead) = self.lead(id).await? else {
            return Err(SuiteError::NotFound(format!("Lead {}", id)));
        };

        lead.status = status;
        lead.last_activity = format!("Moved to {}", status);
        self.update_lead(lead.clone()).await?;
        Ok(lead)
    }

    pub async fn remove_lead(&self, id: &str) -> Result<()> {
        match &self.backend {
            LeadBackend::Local { storage, cache } => {
                let mut guard = cache.write().await;
                if !guard.iter().any(|l| l.id == id) {
                    return Err(SuiteError::NotFound(format!("Lead {}", id)));
                }
                let next: Vec<Lead> = guard.iter().filter(|l| l.id != id).cloned().collect();
                persist_local(storage.as_ref(), &next)?;
                *guard = next;
            }
            LeadBackend::Postgres { pool, .. } => {
                self.ensure_schema_if_needed().await?;

                let result = sqlx::query("DELETE FROM pipeline_leads WHERE id = $1")
                    .bind(id)
                    .execute(pool)
                    .await
                    .map_err(|e| SuiteError::Database(format!("Failed to delete lead: {}", e)))?;

                if result.rows_affected() == 0 {
                    return Err(SuiteError::NotFound(format!("Lead {}", id)));
                }
            }
        }

        self.notify();
        Ok(())
    }

    // =============================
    // Subscriptions
    // =============================

    pub fn subscribe<F>(&self, listener: F) -> LeadSubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = LeadSubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().unwrap().push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: LeadSubscriptionId) {
        self.listeners.lock().unwrap().retain(|(sid, _)| *sid != id);
    }

    fn notify(&self) {
        let listeners = self.listeners.lock().unwrap();
        for (_, listener) in listeners.iter() {
            listener();
        }
    }
}

fn load_local(storage: &dyn KeyValueStorage) -> Vec<Lead> {
    match storage.load(LEADS_KEY) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(leads) => leads,
            Err(e) => {
                warn!("Stored {} is corrupt, starting empty: {}", LEADS_KEY, e);
                Vec::new()
            }
        },
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!("Failed to load {}, starting empty: {}", LEADS_KEY, e);
            Vec::new()
        }
    }
}

fn persist_local(storage: &dyn KeyValueStorage, leads: &[Lead]) -> Result<()> {
    let json = serde_json::to_string(leads)?;
    storage.store(LEADS_KEY, &json)
}

/// Lead id: stable SHA-256-derived for a known email address, random
/// otherwise. Stable ids make re-imports of the same contact collide.
pub fn lead_id_for(email: Option<&str>) -> String {
    match email.map(str::trim).filter(|e| !e.is_empty()) {
        Some(email) => {
            let hash = Sha256::digest(email.to_lowercase().as_bytes());
            format!("ld-{}", hex::encode(&hash[..10]))
        }
        None => format!("ld-{}", hex::encode(&Uuid::new_v4().as_bytes()[..10])),
    }
}

/// Promote an extraction draft to a pipeline lead with entry defaults.
pub fn lead_from_draft(draft: LeadDraft, brand_id: Option<String>) -> Lead {
    let id = lead_id_for(draft.email.as_deref());
    let requirements = draft.location.as_ref().map(|location| LeadRequirements {
        budget: draft.value,
        location: Some(location.clone()),
        ..Default::default()
    });

    Lead {
        id,
        name: draft.name,
        email: draft.email.unwrap_or_default(),
        phone: draft.phone.unwrap_or_default(),
        source: "AI Import".to_string(),
        status: LeadStatus::New,
        value: draft.value.unwrap_or(0.0),
        sentiment: 60,
        urgency: 50,
        intent: 50,
        last_activity: "Imported".to_string(),
        summary: draft.summary,
        personality_type: draft.personality_type,
        image_url: None,
        brand_id,
        viewing_plan: None,
        call_logs: None,
        nurture_sequence: None,
        emails: Vec::new(),
        requirements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use std::sync::atomic::AtomicUsize;

    fn draft(name: &str, email: Option<&str>) -> LeadDraft {
        LeadDraft {
            name: name.to_string(),
            email: email.map(String::from),
            phone: None,
            value: Some(450_000.0),
            location: Some("Altea".to_string()),
            summary: None,
            personality_type: None,
        }
    }

    #[tokio::test]
    async fn test_add_and_list_leads() {
        let store = LeadStore::local(Arc::new(InMemoryStorage::new()));

        let lead = store
            .add_lead(lead_from_draft(draft("Hans Muller", Some("hans@example.com")), None))
            .await
            .unwrap();

        let all = store.leads().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], lead);
        assert_eq!(all[0].status, LeadStatus::New);
        assert_eq!(all[0].requirements.as_ref().unwrap().budget, Some(450_000.0));
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = LeadStore::local(Arc::new(InMemoryStorage::new()));

        let first = lead_from_draft(draft("Hans Muller", Some("hans@example.com")), None);
        let second = lead_from_draft(draft("Hans M.", Some("hans@example.com")), None);
        assert_eq!(first.id, second.id);

        store.add_lead(first).await.unwrap();
        let result = store.add_lead(second).await;
        assert!(matches!(result, Err(SuiteError::Validation(_))));
        assert_eq!(store.leads().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_move_lead_updates_status_only() {
        let store = LeadStore::local(Arc::new(InMemoryStorage::new()));
        let lead = store
            .add_lead(lead_from_draft(draft("Hans Muller", Some("hans@example.com")), None))
            .await
            .unwrap();

        let moved = store.move_lead(&lead.id, LeadStatus::Viewing).await.unwrap();
        assert_eq!(moved.status, LeadStatus::Viewing);
        assert_eq!(moved.last_activity, "Moved to VIEWING");
        assert_eq!(moved.name, lead.name);
        assert_eq!(moved.value, lead.value);

        let reloaded = store.lead(&lead.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, LeadStatus::Viewing);
    }

    #[tokio::test]
    async fn test_update_unknown_lead_is_not_found() {
        let store = LeadStore::local(Arc::new(InMemoryStorage::new()));
        let ghost = lead_from_draft(draft("Ghost", None), None);

        assert!(matches!(
            store.update_lead(ghost).await,
            Err(SuiteError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_lead() {
        let store = LeadStore::local(Arc::new(InMemoryStorage::new()));
        let lead = store
            .add_lead(lead_from_draft(draft("Hans Muller", Some("hans@example.com")), None))
            .await
            .unwrap();

        store.remove_lead(&lead.id).await.unwrap();
        assert!(store.leads().await.unwrap().is_empty());
        assert!(matches!(
            store.remove_lead(&lead.id).await,
            Err(SuiteError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_pipeline_survives_reload() {
        let storage = Arc::new(InMemoryStorage::new());

        {
            let store = LeadStore::local(storage.clone());
            store
                .add_lead(lead_from_draft(draft("Hans Muller", Some("hans@example.com")), None))
                .await
                .unwrap();
        }

        let reloaded = LeadStore::local(storage);
        let all = reloaded.leads().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Hans Muller");
    }

    #[test]
    fn test_subscribers_fire_per_mutation() {
        let store = LeadStore::local(Arc::new(InMemoryStorage::new()));

        static CALLS: AtomicUsize = AtomicUsize::new(0);
        CALLS.store(0, Ordering::SeqCst);
        let subscription = store.subscribe(|| {
            CALLS.fetch_add(1, Ordering::SeqCst);
        });

        tokio_test::block_on(async {
            let lead = store
                .add_lead(lead_from_draft(draft("Hans Muller", Some("hans@example.com")), None))
                .await
                .unwrap();
            store.move_lead(&lead.id, LeadStatus::Qualified).await.unwrap();
        });
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);

        store.unsubscribe(subscription);
        tokio_test::block_on(async {
            store
                .add_lead(lead_from_draft(draft("Kari Nordmann", None), None))
                .await
                .unwrap();
        });
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stable_ids_for_same_email() {
        let a = lead_id_for(Some("Hans@Example.com "));
        let b = lead_id_for(Some("hans@example.com"));
        assert_eq!(a, b);
        assert!(a.starts_with("ld-"));

        let random_a = lead_id_for(None);
        let random_b = lead_id_for(None);
        assert_ne!(random_a, random_b);
    }
}
