use crate::models::{
    Analytics, AnalyticsSummary, DailyStat, PageCount, RecentVisit, VisitContext, VisitEvent,
};
use crate::session::new_session_id;
use crate::storage::{ANALYTICS_KEY, KeyValueStore, load_record, persist_record};
use crate::time_ago::time_ago;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MAX_VISITS: usize = 1000;

const SUMMARY_POPULAR: usize = 5;
const SUMMARY_RECENT: usize = 10;

/// Local visit counters plus the most recent [`MAX_VISITS`] events.
///
/// Counters are maintained incrementally, so they keep counting events that
/// have already been truncated from the log.
pub struct AnalyticsStore {
    profile: Arc<dyn KeyValueStore>,
    record: Analytics,
    loaded: bool,
}

impl AnalyticsStore {
    pub fn new(profile: Arc<dyn KeyValueStore>) -> Self {
        Self {
            profile,
            record: Analytics::default(),
            loaded: false,
        }
    }

    pub fn load(&mut self) -> &Analytics {
        self.record = load_record(self.profile.as_ref(), ANALYTICS_KEY).unwrap_or_default();
        self.loaded = true;
        info!(
            total_visits = self.record.total_visits,
            unique_visitors = self.record.unique_visitors,
            "analytics loaded"
        );
        &self.record
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn analytics(&self) -> &Analytics {
        &self.record
    }

    pub fn track_visit(&mut self, path: &str, context: VisitContext) {
        self.track_visit_at(path, context, Utc::now());
    }

    pub fn track_visit_at(&mut self, path: &str, context: VisitContext, now: DateTime<Utc>) {
        if !self.loaded {
            warn!(path, "analytics not loaded yet, dropping visit");
            return;
        }

        // A visit without a session still belongs to one: a brand new one.
        let session_id = if context.session_id.is_empty() {
            new_session_id(now)
        } else {
            context.session_id
        };
        self.record_event(VisitEvent {
            path: path.to_string(),
            timestamp: now,
            session_id,
            user_agent: context.user_agent,
            referrer: context.referrer,
        });
        self.persist();
    }

    fn record_event(&mut self, event: VisitEvent) {
        let record = &mut self.record;

        if record.known_sessions.insert(event.session_id.clone()) {
            record.unique_visitors = record.unique_visitors.saturating_add(1);
            debug!(session_id = %event.session_id, "new visitor session");
        }

        record.total_visits = record.total_visits.saturating_add(1);
        record.page_views.increment(&event.path);
        let day = date_key(event.timestamp.date_naive());
        let daily = record.daily_visits.entry(day).or_default();
        *daily = daily.saturating_add(1);
        record.last_visit = Some(event.timestamp);

        debug!(path = %event.path, "visit recorded");
        record.visits.push(event);
        if record.visits.len() > MAX_VISITS {
            let excess = record.visits.len() - MAX_VISITS;
            record.visits.drain(..excess);
        }
    }

    pub fn popular_pages(&self, limit: usize) -> Vec<PageCount> {
        let mut pages: Vec<PageCount> = self
            .record
            .page_views
            .iter()
            .map(|(path, views)| PageCount {
                path: path.to_string(),
                views,
            })
            .collect();
        // Stable, so equal counts keep first-seen order.
        pages.sort_by(|a, b| b.views.cmp(&a.views));
        pages.truncate(limit);
        pages
    }

    pub fn recent_visits(&self, limit: usize) -> Vec<RecentVisit> {
        self.recent_visits_at(limit, Utc::now())
    }

    pub fn recent_visits_at(&self, limit: usize, now: DateTime<Utc>) -> Vec<RecentVisit> {
        self.record
            .visits
            .iter()
            .rev()
            .take(limit)
            .map(|visit| RecentVisit {
                visit: visit.clone(),
                time_ago: time_ago(visit.timestamp, now),
            })
            .collect()
    }

    pub fn daily_stats(&self) -> Vec<DailyStat> {
        self.daily_stats_at(Utc::now().date_naive())
    }

    pub fn daily_stats_at(&self, today: NaiveDate) -> Vec<DailyStat> {
        let mut days = Vec::with_capacity(7);
        for offset in (0..7).rev() {
            let date = today - Duration::days(offset);
            let key = date_key(date);
            let visits = self.record.daily_visits.get(&key).copied().unwrap_or(0);
            let label = match offset {
                0 => "Today".to_string(),
                1 => "Yesterday".to_string(),
                _ => date.format("%a").to_string(),
            };
            days.push(DailyStat {
                date: key,
                visits,
                label,
            });
        }
        days
    }

    pub fn summary(&self) -> AnalyticsSummary {
        self.summary_at(Utc::now())
    }

    pub fn summary_at(&self, now: DateTime<Utc>) -> AnalyticsSummary {
        AnalyticsSummary {
            total_visits: self.record.total_visits,
            unique_visitors: self.record.unique_visitors,
            tracked_pages: self.record.page_views.len(),
            last_visit: self.record.last_visit,
            popular_pages: self.popular_pages(SUMMARY_POPULAR),
            recent_visits: self.recent_visits_at(SUMMARY_RECENT, now),
            daily_stats: self.daily_stats_at(now.date_naive()),
        }
    }

    pub fn clear(&mut self) {
        if !self.loaded {
            warn!("analytics not loaded yet, ignoring clear");
            return;
        }
        self.record = Analytics::default();
        info!("analytics cleared");
        self.persist();
    }

    fn persist(&self) {
        persist_record(self.profile.as_ref(), ANALYTICS_KEY, &self.record);
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StorageError;
    use crate::models::PageViews;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        writes: AtomicUsize,
    }

    impl KeyValueStore for CountingStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value)
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 7, 12, 0, 0).unwrap()
    }

    fn loaded() -> (Arc<MemoryStore>, AnalyticsStore) {
        let profile = Arc::new(MemoryStore::new());
        let mut store = AnalyticsStore::new(profile.clone());
        store.load();
        (profile, store)
    }

    fn in_session(id: &str) -> VisitContext {
        VisitContext {
            session_id: id.to_string(),
            ..VisitContext::default()
        }
    }

    #[test]
    fn visits_before_load_change_nothing() {
        let profile = Arc::new(CountingStore::default());
        let mut store = AnalyticsStore::new(profile.clone());
        store.track_visit("/", in_session("A"));
        assert_eq!(store.analytics().total_visits, 0);
        assert_eq!(profile.writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unique_visitors_count_distinct_sessions() {
        let (_, mut store) = loaded();
        store.track_visit_at("/", in_session("A"), noon());
        store.track_visit_at("/course/1", in_session("A"), noon());
        store.track_visit_at("/", in_session("B"), noon());
        assert_eq!(store.analytics().unique_visitors, 2);
        assert_eq!(store.analytics().total_visits, 3);
    }

    #[test]
    fn browsers_with_separate_sessions_are_separate_visitors() {
        let (_, mut store) = loaded();
        let firefox = VisitContext {
            session_id: "firefox-tab".into(),
            user_agent: "Firefox".into(),
            referrer: String::new(),
        };
        let chrome = VisitContext {
            session_id: "chrome-tab".into(),
            user_agent: "Chrome on another machine".into(),
            referrer: String::new(),
        };
        store.track_visit_at("/", firefox, noon());
        store.track_visit_at("/", chrome, noon());

        let analytics = store.analytics();
        assert_eq!(analytics.unique_visitors, 2);
        assert_ne!(analytics.visits[0].session_id, analytics.visits[1].session_id);
    }

    #[test]
    fn visit_without_session_gets_a_fresh_one() {
        let (_, mut store) = loaded();
        store.track_visit("/", VisitContext::default());
        store.track_visit("/", VisitContext::default());
        let analytics = store.analytics();
        assert!(!analytics.visits[0].session_id.is_empty());
        assert_eq!(analytics.unique_visitors, 2);
    }

    #[test]
    fn counters_survive_log_truncation() {
        let (_, mut store) = loaded();
        for i in 0..1005 {
            let path = if i % 2 == 0 { "/even" } else { "/odd" };
            store.track_visit_at(path, in_session("long"), noon());
        }
        let analytics = store.analytics();
        assert_eq!(analytics.visits.len(), MAX_VISITS);
        assert_eq!(analytics.total_visits, 1005);
        assert_eq!(analytics.page_views.total(), 1005);
        assert_eq!(analytics.daily_visits.values().sum::<u64>(), 1005);
        assert_eq!(analytics.unique_visitors, 1);
    }

    #[test]
    fn truncation_drops_oldest_events() {
        let (_, mut store) = loaded();
        for i in 0..1003 {
            store.track_visit_at(&format!("/p{i}"), in_session("A"), noon());
        }
        let visits = &store.analytics().visits;
        assert_eq!(visits.first().unwrap().path, "/p3");
        assert_eq!(visits.last().unwrap().path, "/p1002");
    }

    #[test]
    fn returning_session_is_not_recounted_after_truncation() {
        let (_, mut store) = loaded();
        store.track_visit_at("/", in_session("early"), noon());
        for _ in 0..MAX_VISITS {
            store.track_visit_at("/", in_session("busy"), noon());
        }
        store.track_visit_at("/", in_session("early"), noon());
        assert_eq!(store.analytics().unique_visitors, 2);
    }

    #[test]
    fn popular_pages_sorts_by_views() {
        let (_, mut store) = loaded();
        store.record.page_views = PageViews::from_iter([("/a", 5), ("/b", 9), ("/c", 1)]);
        assert_eq!(
            store.popular_pages(2),
            vec![
                PageCount {
                    path: "/b".into(),
                    views: 9,
                },
                PageCount {
                    path: "/a".into(),
                    views: 5,
                },
            ]
        );
    }

    #[test]
    fn popular_pages_ties_keep_insertion_order() {
        let (_, mut store) = loaded();
        store.record.page_views = PageViews::from_iter([("/z", 2), ("/a", 2), ("/m", 3)]);
        let paths: Vec<String> = store.popular_pages(10).into_iter().map(|p| p.path).collect();
        assert_eq!(paths, ["/m", "/z", "/a"]);
    }

    #[test]
    fn recent_visits_are_newest_first_with_age() {
        let (_, mut store) = loaded();
        let start = noon();
        store.track_visit_at("/one", in_session("A"), start);
        store.track_visit_at("/two", in_session("A"), start + Duration::minutes(30));
        store.track_visit_at("/three", in_session("A"), start + Duration::minutes(59));

        let now = start + Duration::minutes(60);
        let recent = store.recent_visits_at(2, now);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].visit.path, "/three");
        assert_eq!(recent[0].time_ago, "1 minutes ago");
        assert_eq!(recent[1].visit.path, "/two");
        assert_eq!(recent[1].time_ago, "30 minutes ago");
    }

    #[test]
    fn daily_stats_cover_last_seven_days() {
        let (_, mut store) = loaded();
        store.track_visit_at("/", in_session("A"), noon());
        store.track_visit_at("/", in_session("A"), noon() - Duration::days(1));
        store.track_visit_at("/", in_session("A"), noon() - Duration::days(3));
        store.track_visit_at("/", in_session("A"), noon() - Duration::days(8));

        // 2026-01-07 is a Wednesday.
        let stats = store.daily_stats_at(noon().date_naive());
        assert_eq!(stats.len(), 7);
        assert_eq!(stats[0].date, "2026-01-01");
        assert_eq!(stats[0].label, "Thu");
        assert_eq!(stats[3].label, "Sun");
        assert_eq!(stats[3].visits, 1);
        assert_eq!(stats[5].label, "Yesterday");
        assert_eq!(stats[5].visits, 1);
        assert_eq!(stats[6].label, "Today");
        assert_eq!(stats[6].date, "2026-01-07");
        assert_eq!(stats[6].visits, 1);
        assert_eq!(stats.iter().map(|s| s.visits).sum::<u64>(), 3);
    }

    #[test]
    fn track_visit_persists_each_event() {
        let (profile, mut store) = loaded();
        let context = VisitContext {
            session_id: "A".into(),
            user_agent: "test-agent".into(),
            referrer: "https://example.com".into(),
        };
        store.track_visit("/course/2", context);

        let mut reloaded = AnalyticsStore::new(profile);
        let analytics = reloaded.load();
        assert_eq!(analytics.total_visits, 1);
        assert_eq!(analytics.page_views.get("/course/2"), 1);
        assert_eq!(analytics.visits[0].session_id, "A");
        assert_eq!(analytics.visits[0].user_agent, "test-agent");
        assert_eq!(analytics.visits[0].referrer, "https://example.com");
    }

    #[test]
    fn known_sessions_survive_reload() {
        let (profile, mut store) = loaded();
        store.track_visit("/", in_session("A"));

        let mut reloaded = AnalyticsStore::new(profile);
        reloaded.load();
        reloaded.track_visit("/", in_session("A"));
        assert_eq!(reloaded.analytics().unique_visitors, 1);
    }

    #[test]
    fn clear_round_trips_through_load() {
        let (profile, mut store) = loaded();
        store.track_visit("/", in_session("A"));
        store.clear();

        let mut reloaded = AnalyticsStore::new(profile);
        assert_eq!(*reloaded.load(), Analytics::default());
    }

    #[test]
    fn malformed_record_loads_as_empty() {
        let (profile, _) = loaded();
        profile.set(ANALYTICS_KEY, "{\"totalVisits\": \"many\"}").unwrap();
        let mut store = AnalyticsStore::new(profile);
        assert_eq!(*store.load(), Analytics::default());
    }

    #[test]
    fn summary_uses_panel_limits() {
        let (_, mut store) = loaded();
        for i in 0..12 {
            store.track_visit_at(&format!("/course/{i}"), in_session("A"), noon());
        }
        let summary = store.summary_at(noon());
        assert_eq!(summary.total_visits, 12);
        assert_eq!(summary.tracked_pages, 12);
        assert_eq!(summary.popular_pages.len(), 5);
        assert_eq!(summary.recent_visits.len(), 10);
        assert_eq!(summary.daily_stats.len(), 7);
    }
}
