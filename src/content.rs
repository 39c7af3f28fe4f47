use crate::errors::ContentError;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use serde::Deserialize;
use std::{
    collections::HashSet,
    fs,
    io::ErrorKind,
    ops::RangeInclusive,
    path::PathBuf,
};
use tracing::debug;

pub const FIRST_DAY: i32 = 1;
pub const LAST_DAY: i32 = 90;

const WORDS_PER_MINUTE: usize = 200;
/// Deepest heading level listed in a lesson's table of contents.
const TOC_DEPTH: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    pub id: u8,
    pub title: &'static str,
    pub emoji: &'static str,
    pub days: RangeInclusive<i32>,
}

impl Phase {
    pub fn day_numbers(&self) -> Vec<i32> {
        self.days.clone().collect()
    }

    pub fn day_range_label(&self) -> String {
        format!("Days {}-{}", self.days.start(), self.days.end())
    }
}

pub static PHASES: [Phase; 6] = [
    Phase {
        id: 1,
        title: "Architecture & Core Foundations",
        emoji: "🏗️",
        days: 1..=15,
    },
    Phase {
        id: 2,
        title: "API Automation & Integration",
        emoji: "🔌",
        days: 16..=21,
    },
    Phase {
        id: 3,
        title: "CI/CD & Distributed Testing",
        emoji: "⚙️",
        days: 22..=30,
    },
    Phase {
        id: 4,
        title: "Playwright & AI-Powered Testing",
        emoji: "🎭",
        days: 31..=42,
    },
    Phase {
        id: 5,
        title: "Performance & Security Testing",
        emoji: "🛡️",
        days: 43..=57,
    },
    Phase {
        id: 6,
        title: "Test Platform & Cloud Deployment",
        emoji: "☁️",
        days: 58..=90,
    },
];

pub fn phase(id: u8) -> Option<&'static Phase> {
    PHASES.iter().find(|phase| phase.id == id)
}

pub fn phase_for_day(day: i32) -> Option<&'static Phase> {
    PHASES.iter().find(|phase| phase.days.contains(&day))
}

pub fn is_valid_day(day: i32) -> bool {
    (FIRST_DAY..=LAST_DAY).contains(&day)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjacentDays {
    pub previous: Option<i32>,
    pub next: Option<i32>,
}

pub fn adjacent_days(day: i32) -> AdjacentDays {
    AdjacentDays {
        previous: (day > FIRST_DAY).then(|| day - 1),
        next: (day < LAST_DAY).then(|| day + 1),
    }
}

/// A lesson resource: either a `"Title: https://url"` link or plain text.
///
/// The title may contain colons; the link starts at the first colon that is
/// followed (after optional whitespace) by an `http://` or `https://` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Link { title: String, url: String },
    Text(String),
}

impl Resource {
    pub fn parse(raw: &str) -> Self {
        for (colon, _) in raw.match_indices(':') {
            let title = &raw[..colon];
            let url = raw[colon + 1..].trim_start();
            if !title.is_empty() && is_http_url(url) {
                return Resource::Link {
                    title: title.trim().to_string(),
                    url: url.trim_end().to_string(),
                };
            }
        }
        Resource::Text(raw.to_string())
    }
}

fn is_http_url(candidate: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        candidate
            .strip_prefix(scheme)
            .is_some_and(|rest| !rest.is_empty())
    })
}

/// A heading of the rendered lesson body, linked from the table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    /// Anchor id set on the rendered `<hN>` element.
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lesson {
    pub id: i32,
    pub title: String,
    pub phase: u8,
    pub phase_title: String,
    pub description: String,
    /// Rendered HTML body.
    pub content: String,
    /// Headings down to `h4`, in document order.
    pub headings: Vec<Heading>,
    pub objectives: Vec<String>,
    pub exercises: Vec<String>,
    pub resources: Vec<Resource>,
    pub reading_time: usize,
}

pub trait ContentProvider: Send + Sync {
    /// `Ok(None)` when no lesson exists for `day`.
    fn lesson(&self, day: i32) -> Result<Option<Lesson>, ContentError>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FrontMatter {
    title: Option<String>,
    phase: Option<u8>,
    phase_title: Option<String>,
    description: Option<String>,
    objectives: Vec<String>,
    exercises: Vec<String>,
    resources: Vec<String>,
}

/// Reads `day-{n}.md` files with optional YAML front matter.
#[derive(Debug, Clone)]
pub struct MarkdownContentProvider {
    dir: PathBuf,
}

impl MarkdownContentProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ContentProvider for MarkdownContentProvider {
    fn lesson(&self, day: i32) -> Result<Option<Lesson>, ContentError> {
        let file_name = format!("day-{day}.md");
        let path = self.dir.join(&file_name);
        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(day, "no lesson file");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        parse_lesson(day, &file_name, &source).map(Some)
    }
}

pub fn parse_lesson(day: i32, file_name: &str, source: &str) -> Result<Lesson, ContentError> {
    let (front, body) = split_front_matter(source);
    let meta: FrontMatter = match front {
        Some(yaml) if !yaml.trim().is_empty() => {
            serde_yaml::from_str(yaml).map_err(|source| ContentError::FrontMatter {
                file: file_name.to_string(),
                source,
            })?
        }
        _ => FrontMatter::default(),
    };

    let phase = meta.phase.unwrap_or(1);
    let phase_title = meta
        .phase_title
        .or_else(|| self::phase(phase).map(|p| p.title.to_string()))
        .unwrap_or_else(|| "Course Phase".to_string());

    let (content, headings) = render_markdown(body);
    Ok(Lesson {
        id: day,
        title: meta.title.unwrap_or_else(|| format!("Day {day}")),
        phase,
        phase_title,
        description: meta.description.unwrap_or_default(),
        content,
        headings,
        objectives: meta.objectives,
        exercises: meta.exercises,
        resources: meta.resources.iter().map(|r| Resource::parse(r)).collect(),
        reading_time: reading_time(body),
    })
}

fn split_front_matter(source: &str) -> (Option<&str>, &str) {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let Some(rest) = source
        .strip_prefix("---\n")
        .or_else(|| source.strip_prefix("---\r\n"))
    else {
        return (None, source);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let front = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(front), body);
        }
        offset += line.len();
    }
    (None, source)
}

/// Renders markdown to HTML, giving every heading an anchor id. Returns the
/// HTML together with the headings for the table of contents.
pub fn render_markdown(input: &str) -> (String, Vec<Heading>) {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut events: Vec<Event> = Parser::new_ext(input, options).collect();
    let mut headings = Vec::new();
    let mut used_ids = HashSet::new();
    let mut open: Option<(usize, String)> = None;

    for index in 0..events.len() {
        let closed = match &events[index] {
            Event::Start(Tag::Heading { .. }) => {
                open = Some((index, String::new()));
                None
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, title)) = open.as_mut() {
                    title.push_str(text);
                }
                None
            }
            Event::End(TagEnd::Heading(_)) => open.take(),
            _ => None,
        };

        let Some((start, title)) = closed else {
            continue;
        };
        let title = title.trim().to_string();
        let id = unique_slug(&title, &mut used_ids);
        if let Event::Start(Tag::Heading { level, id: anchor, .. }) = &mut events[start] {
            *anchor = Some(id.clone().into());
            let level = *level as u8;
            if level <= TOC_DEPTH {
                headings.push(Heading { level, id, title });
            }
        }
    }

    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, events.into_iter());
    (html, headings)
}

/// Lowercase, whitespace runs become `-`, anything outside `[a-z0-9_-]` goes.
pub fn slugify(title: &str) -> String {
    title
        .split_whitespace()
        .map(|word| {
            word.chars()
                .flat_map(char::to_lowercase)
                .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn unique_slug(title: &str, used: &mut HashSet<String>) -> String {
    let base = match slugify(title) {
        slug if slug.is_empty() => "section".to_string(),
        slug => slug,
    };
    let mut candidate = base.clone();
    let mut n = 2;
    while !used.insert(candidate.clone()) {
        candidate = format!("{base}-{n}");
        n += 1;
    }
    candidate
}

/// Minutes to read `text`, rounded up, never below one.
pub fn reading_time(text: &str) -> usize {
    let words = text.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1)
}
