use chrono::{DateTime, Utc};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

/// Lesson progress for one profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    #[serde(default)]
    pub completed_days: BTreeSet<i32>,
    #[serde(default)]
    pub current_day: Option<i32>,
    pub last_access_date: DateTime<Utc>,
}

impl Progress {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            completed_days: BTreeSet::new(),
            current_day: None,
            last_access_date: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Completed,
    Current,
    Pending,
}

impl DayStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Current => "current",
            Self::Pending => "pending",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseProgress {
    pub completed: usize,
    pub current: Option<i32>,
    pub total: usize,
    /// Completed plus one when a lesson of the phase is in progress.
    pub progress: usize,
}

/// One recorded page view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitEvent {
    pub path: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub referrer: String,
}

/// Request details attached to a visit.
#[derive(Debug, Clone, Default)]
pub struct VisitContext {
    /// Browser-session id; empty means the visitor has no session yet.
    pub session_id: String,
    pub user_agent: String,
    pub referrer: String,
}

/// Visit counters and the bounded event log for one profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Analytics {
    pub total_visits: u64,
    pub unique_visitors: u64,
    pub page_views: PageViews,
    pub daily_visits: BTreeMap<String, u64>,
    pub last_visit: Option<DateTime<Utc>>,
    pub visits: Vec<VisitEvent>,
    pub known_sessions: BTreeSet<String>,
}

/// Path to view count, iterated in first-seen order.
///
/// Stored as a JSON object; insertion order is what breaks ties between
/// equally popular pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageViews {
    entries: Vec<(String, u64)>,
}

impl PageViews {
    pub fn get(&self, path: &str) -> u64 {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, views)| *views)
            .unwrap_or(0)
    }

    pub fn increment(&mut self, path: &str) {
        match self.entries.iter_mut().find(|(p, _)| p == path) {
            Some((_, views)) => *views = views.saturating_add(1),
            None => self.entries.push((path.to_string(), 1)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(path, views)| (path.as_str(), *views))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, views)| views).sum()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for PageViews {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut views = PageViews::default();
        for (path, count) in iter {
            let path = path.into();
            match views.entries.iter_mut().find(|(p, _)| *p == path) {
                Some((_, existing)) => *existing = existing.saturating_add(count),
                None => views.entries.push((path, count)),
            }
        }
        views
    }
}

impl Serialize for PageViews {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (path, views) in &self.entries {
            map.serialize_entry(path, views)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PageViews {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PageViewsVisitor;

        impl<'de> Visitor<'de> for PageViewsVisitor {
            type Value = PageViews;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of page path to view count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<PageViews, A::Error> {
                let mut entries: Vec<(String, u64)> = Vec::new();
                while let Some((path, views)) = access.next_entry::<String, u64>()? {
                    entries.push((path, views));
                }
                Ok(entries.into_iter().collect())
            }
        }

        deserializer.deserialize_map(PageViewsVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageCount {
    pub path: String,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentVisit {
    #[serde(flatten)]
    pub visit: VisitEvent,
    pub time_ago: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStat {
    pub date: String,
    pub visits: u64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_visits: u64,
    pub unique_visitors: u64,
    pub tracked_pages: usize,
    pub last_visit: Option<DateTime<Utc>>,
    pub popular_pages: Vec<PageCount>,
    pub recent_visits: Vec<RecentVisit>,
    pub daily_stats: Vec<DailyStat>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionRequest {
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct VisitRequest {
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DayStatusResponse {
    pub day: i32,
    pub status: DayStatus,
}

#[derive(Debug, Serialize)]
pub struct PhaseProgressEntry {
    pub phase: u8,
    pub title: &'static str,
    #[serde(flatten)]
    pub progress: PhaseProgress,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub progress: Progress,
    pub phases: Vec<PhaseProgressEntry>,
}
