//! Process-wide SDK settings, passed explicitly to the components that need them

use std::path::Path;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::data::{DashboardLoader, ValueDomainProvider};

/// Theme settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeSettings {
    pub name: String,
    pub dark_mode: bool,
    pub font_scale: f32,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            name: "Mountain Light".to_string(),
            dark_mode: false,
            font_scale: 1.0,
        }
    }
}

/// SDK-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkSettings {
    /// Where the dashboard server is reachable, when not the page origin
    pub base_url: Option<String>,

    pub locale: String,

    pub theme: ThemeSettings,

    /// Upper bound on values returned for a filter picker (0 = unlimited)
    pub max_filter_values: usize,
}

impl Default for SdkSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            locale: "en-US".to_string(),
            theme: ThemeSettings::default(),
            max_filter_values: 0,
        }
    }
}

impl SdkSettings {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read settings {}: {}", path.display(), e))?;
        Self::from_json_str(&text)
    }
}

/// Listener invoked after settings change
pub type SettingsListener = Arc<dyn Fn(&SdkSettings) + Send + Sync>;

/// Explicit replacement for SDK-wide statics.
///
/// Built once at startup; settings are mutated only through
/// [`SdkContext::update_settings`].
pub struct SdkContext {
    settings: RwLock<SdkSettings>,
    listeners: RwLock<AHashMap<String, SettingsListener>>,
    loader: Option<Arc<dyn DashboardLoader>>,
    value_domain: Option<Arc<dyn ValueDomainProvider>>,
}

impl SdkContext {
    pub fn builder() -> SdkContextBuilder {
        SdkContextBuilder::default()
    }

    pub fn settings(&self) -> SdkSettings {
        self.settings.read().clone()
    }

    /// The single mutation point for settings
    pub fn update_settings(&self, update: impl FnOnce(&mut SdkSettings)) {
        let snapshot = {
            let mut settings = self.settings.write();
            update(&mut settings);
            settings.clone()
        };

        let listeners: Vec<SettingsListener> = self.listeners.read().values().cloned().collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }

    /// Register a listener; a listener with the same id is replaced
    pub fn add_settings_listener(&self, id: impl Into<String>, listener: SettingsListener) {
        self.listeners.write().insert(id.into(), listener);
    }

    pub fn remove_settings_listener(&self, id: &str) {
        self.listeners.write().remove(id);
    }

    pub fn loader(&self) -> Option<Arc<dyn DashboardLoader>> {
        self.loader.clone()
    }

    pub fn value_domain(&self) -> Option<Arc<dyn ValueDomainProvider>> {
        self.value_domain.clone()
    }
}

#[derive(Default)]
pub struct SdkContextBuilder {
    settings: SdkSettings,
    loader: Option<Arc<dyn DashboardLoader>>,
    value_domain: Option<Arc<dyn ValueDomainProvider>>,
}

impl SdkContextBuilder {
    pub fn settings(mut self, settings: SdkSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn loader(mut self, loader: Arc<dyn DashboardLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn value_domain(mut self, provider: Arc<dyn ValueDomainProvider>) -> Self {
        self.value_domain = Some(provider);
        self
    }

    pub fn build(self) -> Arc<SdkContext> {
        Arc::new(SdkContext {
            settings: RwLock::new(self.settings),
            listeners: RwLock::new(AHashMap::new()),
            loader: self.loader,
            value_domain: self.value_domain,
        })
    }
}
