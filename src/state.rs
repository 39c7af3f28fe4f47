use crate::analytics::AnalyticsStore;
use crate::config::Config;
use crate::content::{ContentProvider, MarkdownContentProvider};
use crate::progress::ProgressStore;
use crate::storage::{JsonFileStore, KeyValueStore};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub progress: Arc<Mutex<ProgressStore>>,
    pub analytics: Arc<Mutex<AnalyticsStore>>,
    pub content: Arc<dyn ContentProvider>,
}

impl AppState {
    pub fn new(
        progress: ProgressStore,
        analytics: AnalyticsStore,
        content: Arc<dyn ContentProvider>,
    ) -> Self {
        Self {
            progress: Arc::new(Mutex::new(progress)),
            analytics: Arc::new(Mutex::new(analytics)),
            content,
        }
    }

    /// Opens the profile store and loads both records, so the returned state
    /// accepts mutations immediately. Session ids live in browser cookies.
    pub fn open(config: &Config) -> Self {
        let profile: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(&config.data_path));

        let mut progress = ProgressStore::new(Arc::clone(&profile));
        progress.load();
        let mut analytics = AnalyticsStore::new(profile);
        analytics.load();

        let content = Arc::new(MarkdownContentProvider::new(&config.content_path));
        Self::new(progress, analytics, content)
    }
}
