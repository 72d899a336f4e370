//! Brand, profile and automation settings store
//!
//! Single source of truth for the brand list, the advisor profile and the
//! automation settings. All three slices load from durable storage at
//! construction (built-in defaults on absent or corrupt data), every mutation
//! persists before it commits, and subscribers are notified synchronously
//! after a successful persist.
//!
//! Mutations are whole-record replaces: last writer wins, full overwrite.
//! There is no partial-field patch API.

use crate::models::{AdvisorProfile, AppLanguage, AutomationSettings, Brand, IntegrationSettings};
use crate::storage::KeyValueStorage;
use crate::Result;
use lazy_static::lazy_static;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::warn;

/// Storage keys, one per slice.
pub const BRANDS_KEY: &str = "rf_brands";
pub const PROFILE_KEY: &str = "rf_profile";
pub const AUTOMATION_KEY: &str = "rf_automation";

/// Fallback output language when automation settings carry none.
pub const DEFAULT_LANGUAGE: AppLanguage = AppLanguage::No;

/// Which slice changed; one event per successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsEvent {
    BrandsChanged,
    ProfileChanged,
    AutomationChanged,
}

/// Handle returned by `subscribe`; removes exactly that listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(SettingsEvent) + Send + Sync>;

lazy_static! {
    static ref DEFAULT_BRANDS: Vec<Brand> = vec![
        Brand {
            id: "soleada".to_string(),
            name: "Soleada.no".to_string(),
            business_type: "Agency".to_string(),
            description: "Luxury International Agency".to_string(),
            tone: "Professional, Trustworthy, Exclusive".to_string(),
            logo: None,
            email: "info@soleada.no".to_string(),
            phone: "+47 000 00 000".to_string(),
            phone2: Some("+34 900 000 001".to_string()),
            website: "https://soleada.no".to_string(),
            visual_styles: None,
            integrations: Some(IntegrationSettings::default()),
        },
        Brand {
            id: "zeneco".to_string(),
            name: "Zen Eco Homes".to_string(),
            business_type: "Eiendomsmegler & Utbygger".to_string(),
            description: "Spesialist på nybygg og moderne kvalitetshjem i Costa Blanca og Costa Calida, Spania.".to_string(),
            tone: "Sleek, Innovative, Precise, Trustworthy".to_string(),
            logo: None,
            email: "freddy@zenecohomes.com".to_string(),
            phone: "+47 960099965".to_string(),
            phone2: Some("+34 900 000 002".to_string()),
            website: "https://zenecohomes.com".to_string(),
            visual_styles: None,
            integrations: Some(IntegrationSettings::default()),
        },
    ];

    static ref DEFAULT_PROFILE: AdvisorProfile = AdvisorProfile {
        name: "Freddy Bremseth".to_string(),
        image_url: None,
        phone: Some("+47 960099965".to_string()),
        phone2: Some("+34 600 000 000".to_string()),
        location: "Benidorm, Spain".to_string(),
        secondary_location: Some("Biar, Inland".to_string()),
        signature: Some("Med vennlig hilsen,\nFreddy Bremseth\nEiendomsrådgiver".to_string()),
        expertise: vec![
            "Costa Blanca North".to_string(),
            "Inland Properties".to_string(),
            "Sustainable Living".to_string(),
            "Eco-Fincas".to_string(),
            "Benidorm Luxury".to_string(),
        ],
    };

    static ref DEFAULT_AUTOMATION: AutomationSettings = AutomationSettings {
        market_pulse_enabled: true,
        brand_identity_guard_enabled: true,
        social_sync_enabled: false,
        lead_nurture_enabled: true,
        language: Some(AppLanguage::No),
    };
}

pub struct SettingsStore {
    storage: Arc<dyn KeyValueStorage>,
    brands: RwLock<Vec<Brand>>,
    profile: RwLock<AdvisorProfile>,
    automation: RwLock<AutomationSettings>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
}

impl SettingsStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        let brands = load_slice(storage.as_ref(), BRANDS_KEY, || DEFAULT_BRANDS.clone());
        let profile = load_slice(storage.as_ref(), PROFILE_KEY, || DEFAULT_PROFILE.clone());
        let automation =
            load_slice(storage.as_ref(), AUTOMATION_KEY, || DEFAULT_AUTOMATION.clone());

        Self {
            storage,
            brands: RwLock::new(brands),
            profile: RwLock::new(profile),
            automation: RwLock::new(automation),
            listeners: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
        }
    }

    // =============================
    // Reads
    // =============================

    pub fn brands(&self) -> Vec<Brand> {
        self.brands.read().unwrap().clone()
    }

    pub fn brand(&self, id: &str) -> Option<Brand> {
        self.brands.read().unwrap().iter().find(|b| b.id == id).cloned()
    }

    pub fn profile(&self) -> AdvisorProfile {
        self.profile.read().unwrap().clone()
    }

    pub fn automation(&self) -> AutomationSettings {
        self.automation.read().unwrap().clone()
    }

    pub fn language(&self) -> AppLanguage {
        self.automation
            .read()
            .unwrap()
            .language
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    // =============================
    // Mutations (replace → persist → commit → notify)
    // =============================

    /// Replace the brand sharing `updated.id`. When no record carries that id
    /// the list is unchanged; there is no insert path through this operation.
    pub fn update_brand(&self, updated: Brand) -> Result<()> {
        let next: Vec<Brand> = self
            .brands
            .read()
            .unwrap()
            .iter()
            .map(|b| if b.id == updated.id { updated.clone() } else { b.clone() })
            .collect();

        self.persist_all(&next, &self.profile(), &self.automation())?;
        *self.brands.write().unwrap() = next;
        self.notify(SettingsEvent::BrandsChanged);
        Ok(())
    }

    pub fn update_profile(&self, updated: AdvisorProfile) -> Result<()> {
        self.persist_all(&self.brands(), &updated, &self.automation())?;
        *self.profile.write().unwrap() = updated;
        self.notify(SettingsEvent::ProfileChanged);
        Ok(())
    }

    pub fn update_automation(&self, updated: AutomationSettings) -> Result<()> {
        self.persist_all(&self.brands(), &self.profile(), &updated)?;
        *self.automation.write().unwrap() = updated;
        self.notify(SettingsEvent::AutomationChanged);
        Ok(())
    }

    // =============================
    // Subscriptions
    // =============================

    /// Register a listener invoked once per successful mutation. Repeated
    /// subscriptions by the same caller are independent.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(SettingsEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().unwrap().push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.lock().unwrap().retain(|(sid, _)| *sid != id);
    }

    fn notify(&self, event: SettingsEvent) {
        let listeners = self.listeners.lock().unwrap();
        for (_, listener) in listeners.iter() {
            listener(event);
        }
    }

    /// All three slices are written on every mutation, matching the original
    /// save semantics. A failed write aborts before memory is touched.
    fn persist_all(
        &self,
        brands: &[Brand],
        profile: &AdvisorProfile,
        automation: &AutomationSettings,
    ) -> Result<()> {
        self.storage.store(BRANDS_KEY, &to_json(&brands)?)?;
        self.storage.store(PROFILE_KEY, &to_json(profile)?)?;
        self.storage.store(AUTOMATION_KEY, &to_json(automation)?)?;
        Ok(())
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Load one slice, falling back to its defaults when the stored document is
/// absent, unreadable or does not parse.
fn load_slice<T, F>(storage: &dyn KeyValueStorage, key: &str, default: F) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match storage.load(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Stored {} is corrupt, using defaults: {}", key, e);
                default()
            }
        },
        Ok(None) => default(),
        Err(e) => {
            warn!("Failed to load {}, using defaults: {}", key, e);
            default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use crate::SuiteError;
    use std::sync::atomic::AtomicUsize;

    fn fresh_store() -> SettingsStore {
        SettingsStore::new(Arc::new(InMemoryStorage::new()))
    }

    #[test]
    fn test_defaults_on_empty_storage() {
        let store = fresh_store();

        let brands = store.brands();
        assert_eq!(brands.len(), 2);
        assert_eq!(brands[0].id, "soleada");
        assert_eq!(brands[1].id, "zeneco");
        assert_eq!(store.profile().name, "Freddy Bremseth");
        assert_eq!(store.language(), AppLanguage::No);
    }

    #[test]
    fn test_update_brand_round_trip() {
        let store = fresh_store();

        let mut brand = store.brand("zeneco").unwrap();
        brand.tone = "Bold, Direct".to_string();
        brand.phone = "+34 111 222 333".to_string();
        store.update_brand(brand.clone()).unwrap();

        assert_eq!(store.brand("zeneco").unwrap(), brand);
    }

    #[test]
    fn test_update_brand_unknown_id_is_noop() {
        let store = fresh_store();
        let before = store.brands();

        let mut ghost = before[0].clone();
        ghost.id = "ghost".to_string();
        store.update_brand(ghost).unwrap();

        assert_eq!(store.brands(), before);
    }

    #[test]
    fn test_update_profile_full_replace() {
        let store = fresh_store();

        let profile = AdvisorProfile {
            name: "Kari Nordmann".to_string(),
            image_url: None,
            phone: None,
            phone2: None,
            location: "Alicante, Spain".to_string(),
            secondary_location: None,
            signature: None,
            expertise: vec!["New Builds".to_string()],
        };
        store.update_profile(profile.clone()).unwrap();

        assert_eq!(store.profile(), profile);
    }

    #[test]
    fn test_update_automation_preserves_other_flags() {
        let store = fresh_store();

        let mut automation = store.automation();
        automation.lead_nurture_enabled = false;
        store.update_automation(automation).unwrap();

        let after = store.automation();
        assert!(!after.lead_nurture_enabled);
        assert!(after.market_pulse_enabled);
        assert!(after.brand_identity_guard_enabled);
        assert!(!after.social_sync_enabled);
        assert_eq!(after.language, Some(AppLanguage::No));
    }

    #[test]
    fn test_language_default_when_unset() {
        let store = fresh_store();

        let mut automation = store.automation();
        automation.language = None;
        store.update_automation(automation).unwrap();

        assert_eq!(store.language(), AppLanguage::No);
    }

    #[test]
    fn test_subscribers_notified_exactly_once() {
        let store = fresh_store();

        static FIRST: AtomicUsize = AtomicUsize::new(0);
        static SECOND: AtomicUsize = AtomicUsize::new(0);
        static THIRD: AtomicUsize = AtomicUsize::new(0);
        FIRST.store(0, Ordering::SeqCst);
        SECOND.store(0, Ordering::SeqCst);
        THIRD.store(0, Ordering::SeqCst);

        let _a = store.subscribe(|_| {
            FIRST.fetch_add(1, Ordering::SeqCst);
        });
        let b = store.subscribe(|_| {
            SECOND.fetch_add(1, Ordering::SeqCst);
        });
        let _c = store.subscribe(|_| {
            THIRD.fetch_add(1, Ordering::SeqCst);
        });

        store.update_profile(store.profile()).unwrap();
        assert_eq!(FIRST.load(Ordering::SeqCst), 1);
        assert_eq!(SECOND.load(Ordering::SeqCst), 1);
        assert_eq!(THIRD.load(Ordering::SeqCst), 1);

        store.unsubscribe(b);
        store.update_profile(store.profile()).unwrap();
        assert_eq!(FIRST.load(Ordering::SeqCst), 2);
        assert_eq!(SECOND.load(Ordering::SeqCst), 1);
        assert_eq!(THIRD.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_typed_events_per_slice() {
        let store = fresh_store();

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        store.subscribe(move |event| sink.lock().unwrap().push(event));

        store.update_profile(store.profile()).unwrap();
        store.update_automation(store.automation()).unwrap();
        let brand = store.brand("soleada").unwrap();
        store.update_brand(brand).unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                SettingsEvent::ProfileChanged,
                SettingsEvent::AutomationChanged,
                SettingsEvent::BrandsChanged,
            ]
        );
    }

    #[test]
    fn test_corrupt_slice_falls_back_to_defaults() {
        let storage = InMemoryStorage::new();
        storage.seed(BRANDS_KEY, "{not valid json");
        storage.seed(AUTOMATION_KEY, "[]");

        let store = SettingsStore::new(Arc::new(storage));
        assert_eq!(store.brands().len(), 2);
        assert_eq!(store.language(), AppLanguage::No);
    }

    #[test]
    fn test_persisted_state_survives_reload() {
        let storage = Arc::new(InMemoryStorage::new());

        {
            let store = SettingsStore::new(storage.clone());
            let mut automation = store.automation();
            automation.language = Some(AppLanguage::Es);
            store.update_automation(automation).unwrap();
        }

        let reloaded = SettingsStore::new(storage);
        assert_eq!(reloaded.language(), AppLanguage::Es);
    }

    struct FailingStorage;

    impl KeyValueStorage for FailingStorage {
        fn load(&self, _key: &str) -> crate::Result<Option<String>> {
            Ok(None)
        }

        fn store(&self, _key: &str, _value: &str) -> crate::Result<()> {
            Err(SuiteError::Persistence("disk full".to_string()))
        }
    }

    #[test]
    fn test_failed_persist_leaves_memory_unchanged() {
        let store = SettingsStore::new(Arc::new(FailingStorage));

        static CALLS: AtomicUsize = AtomicUsize::new(0);
        CALLS.store(0, Ordering::SeqCst);
        store.subscribe(|_| {
            CALLS.fetch_add(1, Ordering::SeqCst);
        });

        let mut profile = store.profile();
        profile.name = "Someone Else".to_string();
        let result = store.update_profile(profile);

        assert!(matches!(result, Err(SuiteError::Persistence(_))));
        assert_eq!(store.profile().name, "Freddy Bremseth");
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    }
}
