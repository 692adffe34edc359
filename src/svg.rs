use crate::stats::RepoStats;

const START_Y: i32 = 30;
const LINE_HEIGHT: i32 = 20;
const LEFT_PADDING: f32 = 15.0;
const RIGHT_PADDING: f32 = 30.0;
const CHAR_WIDTH: f32 = 9.6;
const MIN_COL_CHARS: usize = 40;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

pub struct ThemeColors {
    pub bg: &'static str,
    pub text: &'static str,
    pub key: &'static str,
    pub value: &'static str,
    pub cc: &'static str,
}

impl Theme {
    pub fn colors(self) -> ThemeColors {
        match self {
            Theme::Dark => ThemeColors {
                bg: "#161b22",
                text: "#c9d1d9",
                key: "#ffa657",
                value: "#a5d6ff",
                cc: "#616e7f",
            },
            Theme::Light => ThemeColors {
                bg: "#ffffff",
                text: "#24292f",
                key: "#d73a49",
                value: "#0366d6",
                cc: "#6a737d",
            },
        }
    }

    /// File name the card is saved under.
    pub fn file_name(self) -> &'static str {
        match self {
            Theme::Dark => "dark_mode.svg",
            Theme::Light => "light_mode.svg",
        }
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Split a row into key, dot leader and value so that values line up at
/// `align_width` characters.
pub fn build_stat_row(key: &str, value: &str, align_width: usize) -> (String, String, String) {
    let key_part = format!("{key}: ");
    let base_len = key_part.chars().count() + value.chars().count();
    let available = align_width.saturating_sub(base_len);

    let dots = match available {
        0 => "".to_string(),
        1 => " ".to_string(),
        2 => ". ".to_string(),
        n => ".".repeat(n),
    };

    (key_part, dots, value.to_string())
}

fn build_header_line(label: &str, align_width: usize) -> String {
    let base = format!("{label} ");
    let dash_count = align_width.saturating_sub(base.chars().count()) + 2;
    format!("{base}{}", "-".repeat(dash_count))
}

enum Line {
    Header(String),
    Blank,
    Stat { key: String, value: String },
}

fn card_lines(stats: &RepoStats) -> Vec<Line> {
    let stat = |key: &str, value: String| Line::Stat {
        key: key.to_string(),
        value,
    };

    let mut lines = vec![
        Line::Header(stats.repository.to_string()),
        stat("Stars", stats.stars.to_string()),
        stat("Watchers", stats.watchers.to_string()),
        stat("Forks", stats.forks.to_string()),
        stat("Commits sampled", stats.sampled_commits.to_string()),
        Line::Blank,
        Line::Header("- Top contributors".to_string()),
    ];

    if stats.significant_users.is_empty() {
        lines.push(stat("Contributors", "(none)".to_string()));
    }
    for c in &stats.significant_users {
        lines.push(stat(&c.login, c.contribution_count.to_string()));
    }
    lines
}

/// Render the stats card. Returns (tspans, width, height) in pixels.
fn build_column(stats: &RepoStats) -> (String, f32, f32) {
    let lines = card_lines(stats);

    let align_width = lines
        .iter()
        .map(|line| match line {
            Line::Stat { key, value } => key.chars().count() + 2 + value.chars().count(),
            Line::Header(text) => text.chars().count() + 1,
            Line::Blank => 0,
        })
        .max()
        .unwrap_or(0)
        .max(MIN_COL_CHARS);

    let mut tspans = String::new();
    for (i, line) in lines.iter().enumerate() {
        let y = START_Y + (i as i32) * LINE_HEIGHT;

        match line {
            Line::Blank => {}
            Line::Header(text) => {
                tspans.push_str(&format!(
                    r#"<tspan x="{LEFT_PADDING}" y="{y}">{}</tspan>
"#,
                    escape_xml(&build_header_line(text, align_width))
                ));
            }
            Line::Stat { key, value } => {
                let (k, d, v) = build_stat_row(key, value, align_width);
                tspans.push_str(&format!(
                    r#"<tspan x="{LEFT_PADDING}" y="{y}" class="cc">. </tspan>
<tspan class="key">{}</tspan><tspan class="cc">{}</tspan><tspan class="value">{}</tspan>
"#,
                    escape_xml(&k),
                    escape_xml(&d),
                    escape_xml(&v)
                ));
            }
        }
    }

    let width = LEFT_PADDING + (align_width as f32 + 2.0) * CHAR_WIDTH + RIGHT_PADDING;
    let height = lines.len() as f32 * LINE_HEIGHT as f32 + START_Y as f32;
    (tspans, width, height)
}

/// SVG stats card for `stats` in the given theme.
pub fn generate_svg(stats: &RepoStats, theme: Theme) -> String {
    let colors = theme.colors();
    let (tspans, w, h) = build_column(stats);

    format!(
        r#"<?xml version='1.0' encoding='UTF-8'?>
<svg xmlns="http://www.w3.org/2000/svg"
     width="{w}px" height="{h}px"
     font-family="ConsolasFallback,Consolas,monospace"
     font-size="16px">

<style>
.key      {{ fill: {key}; }}
.value    {{ fill: {value}; }}
.cc       {{ fill: {cc}; }}
</style>

<rect width="{w}px" height="{h}px" fill="{bg}" rx="15"/>

<text fill="{text}">
{tspans}
</text>

</svg>
"#,
        bg = colors.bg,
        text = colors.text,
        key = colors.key,
        value = colors.value,
        cc = colors.cc,
    )
}
