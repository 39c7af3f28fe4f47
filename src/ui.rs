use crate::content::{AdjacentDays, Heading, Lesson, Phase, Resource};
use crate::models::{AnalyticsSummary, DayStatus, PhaseProgress};
use std::fmt::Write;

/// Sidebar entry for one phase.
pub struct PhaseView {
    pub phase: &'static Phase,
    pub progress: PhaseProgress,
    pub days: Vec<(i32, DayStatus)>,
    pub expanded: bool,
}

pub fn render_home(phases: &[PhaseView]) -> String {
    let completed: usize = phases.iter().map(|p| p.progress.completed).sum();
    let total: usize = phases.iter().map(|p| p.progress.total).sum();

    let mut body = String::new();
    let _ = write!(
        body,
        r#"<header><h1>Test Automation Course</h1>
<p class="subtitle">{completed} of {total} lessons completed</p></header>
<section class="panel">
  <a class="button" href="/course/1">Start with Day 1</a>
  <a class="button secondary" href="/analytics">Visit analytics</a>
  <form method="post" action="/progress/reset"><button class="ghost" type="submit">Reset progress</button></form>
</section>"#
    );
    body.push_str(&render_sidebar(phases));
    render_page("Test Automation Course", &body)
}

pub fn render_lesson(
    lesson: &Lesson,
    status: DayStatus,
    adjacent: AdjacentDays,
    phases: &[PhaseView],
) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        r#"<nav class="crumbs"><a href="/">Course Home</a> &rarr; Phase {phase}: {phase_title} &rarr; Day {day}</nav>
<header><span class="pill">Phase {phase}</span> <span class="muted">{minutes} min read</span>
<h1>Day {day} - {title}</h1>"#,
        phase = lesson.phase,
        phase_title = escape_html(&lesson.phase_title),
        day = lesson.id,
        minutes = lesson.reading_time,
        title = escape_html(&lesson.title),
    );
    if !lesson.description.is_empty() {
        let _ = write!(body, r#"<p class="subtitle">{}</p>"#, escape_html(&lesson.description));
    }
    body.push_str("</header>");

    body.push_str(&render_list("Learning Objectives", &lesson.objectives));
    body.push_str(&render_progress_button(lesson.id, status));
    body.push_str(&render_contents(&lesson.headings));
    let _ = write!(body, r#"<article class="lesson">{}</article>"#, lesson.content);
    body.push_str(&render_list("Exercises", &lesson.exercises));
    body.push_str(&render_resources(&lesson.resources));

    body.push_str(r#"<nav class="pager">"#);
    if let Some(previous) = adjacent.previous {
        let _ = write!(body, r#"<a href="/course/{previous}">&larr; Day {previous}</a>"#);
    }
    if let Some(next) = adjacent.next {
        let _ = write!(body, r#"<a class="next" href="/course/{next}">Day {next} &rarr;</a>"#);
    }
    body.push_str("</nav>");
    body.push_str(&render_sidebar(phases));

    render_page(&format!("Day {} - {}", lesson.id, lesson.title), &body)
}

pub fn render_analytics(summary: &AnalyticsSummary) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        r#"<header><h1>Visit Analytics</h1><p class="subtitle">Stored locally for this profile only</p></header>
<section class="panel">
  <div class="stat"><span class="value">{total}</span><span class="muted">Total visits</span></div>
  <div class="stat"><span class="value">{unique}</span><span class="muted">Sessions</span></div>
  <div class="stat"><span class="value">{pages}</span><span class="muted">Pages</span></div>
</section>"#,
        total = summary.total_visits,
        unique = summary.unique_visitors,
        pages = summary.tracked_pages,
    );

    let peak = summary
        .daily_stats
        .iter()
        .map(|day| day.visits)
        .max()
        .unwrap_or(0)
        .max(1);
    body.push_str(r#"<section><h2>Last 7 days</h2><div class="chart">"#);
    for day in &summary.daily_stats {
        let height = day.visits * 100 / peak;
        let _ = write!(
            body,
            r#"<div class="bar" title="{date}: {visits}"><span style="height:{height}%"></span><small>{label}</small></div>"#,
            date = day.date,
            visits = day.visits,
            label = escape_html(&day.label),
        );
    }
    body.push_str("</div></section>");

    body.push_str("<section><h2>Popular pages</h2><ol>");
    for page in &summary.popular_pages {
        let _ = write!(
            body,
            "<li><code>{}</code> <span class=\"muted\">{} views</span></li>",
            escape_html(&page.path),
            page.views
        );
    }
    body.push_str("</ol></section>");

    body.push_str("<section><h2>Recent visits</h2><ul>");
    for recent in &summary.recent_visits {
        let _ = write!(
            body,
            "<li><code>{}</code> <span class=\"muted\">{}</span></li>",
            escape_html(&recent.visit.path),
            escape_html(&recent.time_ago)
        );
    }
    body.push_str("</ul></section>");

    body.push_str(
        r#"<form method="post" action="/analytics/clear"><button class="ghost" type="submit">Clear analytics</button></form>"#,
    );
    render_page("Visit Analytics", &body)
}

fn render_sidebar(phases: &[PhaseView]) -> String {
    let mut out = String::from(r#"<aside class="sidebar"><h2>Course phases</h2>"#);
    for view in phases {
        let phase = view.phase;
        let percent = if view.progress.total == 0 {
            0
        } else {
            view.progress.progress * 100 / view.progress.total
        };
        let _ = write!(
            out,
            r#"<div class="phase"><a href="/?phase={id}">{emoji} {title}</a>
<small class="muted">{range} &middot; {completed}/{total}</small>
<div class="track"><span style="width:{percent}%"></span></div>"#,
            id = phase.id,
            emoji = phase.emoji,
            title = escape_html(phase.title),
            range = phase.day_range_label(),
            completed = view.progress.completed,
            total = view.progress.total,
        );
        if view.expanded {
            out.push_str(r#"<div class="days">"#);
            for (day, status) in &view.days {
                let _ = write!(
                    out,
                    r#"<a class="day {status}" href="/course/{day}" title="Day {day} - {status}">{day}</a>"#,
                    status = status.as_str(),
                );
            }
            out.push_str("</div>");
        }
        out.push_str("</div>");
    }
    out.push_str("</aside>");
    out
}

fn render_progress_button(day: i32, status: DayStatus) -> String {
    let (heading, action) = if status == DayStatus::Completed {
        ("Lesson completed", "Mark as incomplete")
    } else {
        ("Finish this lesson", "Mark as completed")
    };
    format!(
        r#"<section class="progress-button {status}"><strong>{heading}</strong>
<form method="post" action="/course/{day}/toggle"><button type="submit">{action}</button></form></section>"#,
        status = status.as_str(),
    )
}

fn render_list(heading: &str, items: &[String]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let mut out = format!("<section><h2>{heading}</h2><ul>");
    for item in items {
        let _ = write!(out, "<li>{}</li>", escape_html(item));
    }
    out.push_str("</ul></section>");
    out
}

fn render_contents(headings: &[Heading]) -> String {
    if headings.is_empty() {
        return String::new();
    }
    let mut out = String::from(r#"<nav class="toc"><h2>Contents</h2><ul>"#);
    for heading in headings {
        let _ = write!(
            out,
            r##"<li class="level-{}"><a href="#{}">{}</a></li>"##,
            heading.level,
            escape_html(&heading.id),
            escape_html(&heading.title)
        );
    }
    out.push_str("</ul></nav>");
    out
}

fn render_resources(resources: &[Resource]) -> String {
    if resources.is_empty() {
        return String::new();
    }
    let mut out = String::from("<section><h2>Resources</h2><ul>");
    for resource in resources {
        match resource {
            Resource::Link { title, url } => {
                let _ = write!(
                    out,
                    r#"<li><a href="{}" target="_blank" rel="noopener noreferrer">{}</a></li>"#,
                    escape_html(url),
                    escape_html(title)
                );
            }
            Resource::Text(text) => {
                let _ = write!(out, "<li>{}</li>", escape_html(text));
            }
        }
    }
    out.push_str("</ul></section>");
    out
}

fn render_page(title: &str, body: &str) -> String {
    PAGE_HTML
        .replace("{{TITLE}}", &escape_html(title))
        .replace("{{BODY}}", body)
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #f8f3e6;
      --bg-2: #d7e8f5;
      --ink: #2b2a28;
      --accent: #2f7d5b;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.88);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #eef4f8 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(960px, 100%);
      background: var(--card);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 28px;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      font-size: clamp(2rem, 4vw, 2.6rem);
      margin: 8px 0;
    }

    .subtitle, .muted {
      color: #5f5c57;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 16px;
      align-items: center;
    }

    .stat .value {
      display: block;
      font-size: 2rem;
      font-weight: 600;
    }

    .pill {
      padding: 6px 14px;
      border-radius: 999px;
      background: #dbeafe;
      color: #1e40af;
      font-size: 0.85rem;
    }

    .button, button {
      border: none;
      border-radius: 14px;
      padding: 12px 18px;
      font: inherit;
      cursor: pointer;
      text-decoration: none;
      text-align: center;
      background: var(--accent);
      color: white;
    }

    .secondary {
      background: var(--accent-2);
    }

    .ghost {
      background: transparent;
      color: var(--accent-2);
      border: 1px solid var(--accent-2);
    }

    .progress-button {
      display: flex;
      justify-content: space-between;
      align-items: center;
      padding: 18px 22px;
      border-radius: 18px;
      background: #ecfdf5;
      border: 1px solid #a7f3d0;
    }

    .progress-button.completed button {
      background: #e5e7eb;
      color: var(--ink);
    }

    .toc ul {
      list-style: none;
      padding-left: 0;
    }

    .toc .level-2 { padding-left: 16px; }
    .toc .level-3 { padding-left: 32px; }
    .toc .level-4 { padding-left: 48px; }

    .pager {
      display: flex;
      justify-content: space-between;
    }

    .sidebar .phase {
      padding: 12px 0;
      border-bottom: 1px solid #e7e2d8;
    }

    .track {
      height: 6px;
      border-radius: 999px;
      background: #e7e2d8;
      overflow: hidden;
      margin-top: 6px;
    }

    .track span {
      display: block;
      height: 100%;
      background: var(--accent);
    }

    .days {
      display: grid;
      grid-template-columns: repeat(auto-fill, minmax(40px, 1fr));
      gap: 6px;
      margin-top: 10px;
    }

    .day {
      padding: 6px 0;
      text-align: center;
      border-radius: 10px;
      background: #f3f4f6;
      color: var(--ink);
      text-decoration: none;
    }

    .day.completed {
      background: var(--accent);
      color: white;
    }

    .day.current {
      outline: 2px solid var(--accent-2);
    }

    .chart {
      display: grid;
      grid-template-columns: repeat(7, 1fr);
      gap: 10px;
      align-items: end;
      height: 160px;
    }

    .bar {
      display: flex;
      flex-direction: column;
      justify-content: flex-end;
      height: 100%;
      text-align: center;
    }

    .bar span {
      display: block;
      background: var(--accent-2);
      border-radius: 8px 8px 0 0;
      min-height: 2px;
    }
  </style>
</head>
<body>
  <main class="app">
{{BODY}}
  </main>
</body>
</html>
"#;
