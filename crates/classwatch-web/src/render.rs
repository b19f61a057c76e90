//! Shared page layout.
//!
//! Every page is a body fragment built with `format!` and wrapped in the
//! sidebar layout rendered by minijinja. All backend-provided text must go
//! through [`esc`] before it lands in a fragment.

use classwatch_client::PollState;
use classwatch_common::error::NO_CONNECTION;
use minijinja::{context, Environment};
use serde::Serialize;

use crate::components::icons;

pub const LAYOUT_HTML: &str = include_str!("../templates/layout.html");

#[derive(Debug, Clone, Serialize)]
pub struct NavItem {
    pub href: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
}

pub const NAV_ITEMS: &[NavItem] = &[
    NavItem { href: "/",          label: "Dashboard",  icon: icons::DASHBOARD },
    NavItem { href: "/students",  label: "Computers",  icon: icons::MONITOR },
    NavItem { href: "/alerts",    label: "Violations", icon: icons::ALERT },
    NavItem { href: "/activity",  label: "Activity",   icon: icons::ACTIVITY },
    NavItem { href: "/processes", label: "Processes",  icon: icons::CPU },
    NavItem { href: "/screens",   label: "Screens",    icon: icons::SCREEN },
];

pub const SETTINGS_ITEMS: &[NavItem] = &[
    NavItem { href: "/settings", label: "Settings", icon: icons::SETTINGS },
];

/// Exact match, or prefix match for everything except the root.
pub fn is_active(href: &str, path: &str) -> bool {
    path == href || (href != "/" && path.starts_with(href))
}

#[derive(Serialize)]
struct NavEntry {
    href: &'static str,
    label: &'static str,
    icon: &'static str,
    active: bool,
}

fn nav_entries(items: &[NavItem], path: &str) -> Vec<NavEntry> {
    items
        .iter()
        .map(|item| NavEntry {
            href: item.href,
            label: item.label,
            icon: item.icon,
            active: is_active(item.href, path),
        })
        .collect()
}

/// One rendered page.
pub struct Page<'a> {
    pub title: &'a str,
    /// Request path, used to highlight the nav entry.
    pub path: &'a str,
    pub body: String,
    /// Seconds until the browser reloads the page.
    pub refresh: Option<u64>,
}

pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("layout.html", LAYOUT_HTML)?;
        Ok(Self { env })
    }

    pub fn page(&self, page: Page<'_>) -> Result<String, minijinja::Error> {
        self.env.get_template("layout.html")?.render(context! {
            title => page.title,
            body => page.body,
            refresh => page.refresh,
            nav => nav_entries(NAV_ITEMS, page.path),
            settings_nav => nav_entries(SETTINGS_ITEMS, page.path),
        })
    }
}

/// Minimal HTML escaping for text and attribute values.
pub fn esc(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

/// Percent-encode `raw` for use as one URL path segment.
pub fn seg(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Poll interval in whole seconds for the meta refresh, never below one.
pub fn refresh_secs(ms: u64) -> u64 {
    ms.div_ceil(1000).max(1)
}

/// Banner for the state of a page's primary poll: a loading hint, the
/// connection error when there is nothing to show, or a warning strip over
/// stale data. Empty when the data is fresh.
pub fn poll_notice<T>(state: &PollState<T>) -> String {
    match (&state.data, &state.error) {
        (None, Some(_)) => format!(
            r#"<div class="card notice-error">{}</div>"#,
            NO_CONNECTION
        ),
        (Some(_), Some(e)) => format!(
            r#"<div class="notice-stale">Showing last known data. {} <span class="text-muted small">({})</span></div>"#,
            NO_CONNECTION,
            esc(e)
        ),
        (None, None) if state.loading => {
            r#"<div class="card notice-loading">Loading…</div>"#.to_string()
        }
        _ => String::new(),
    }
}

/// Flash message passed back through the `status` query parameter.
pub fn flash(status: Option<&str>, level: Option<&str>) -> String {
    match status.filter(|s| !s.is_empty()) {
        Some(msg) => {
            let class = if level == Some("error") { "flash flash-error" } else { "flash flash-ok" };
            format!(r#"<div class="{}">{}</div>"#, class, esc(msg))
        }
        None => String::new(),
    }
}
