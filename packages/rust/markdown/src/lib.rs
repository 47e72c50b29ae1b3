//! HTML-to-Markdown conversion and cleanup passes.
//!
//! Converts fetched HTML pages to clean Markdown using the `htmd` crate, then
//! applies a series of cleanup passes to normalize headings, whitespace, code
//! blocks, and links.

mod cleanup;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use docfetch_shared::{DocFetchError, Result};

/// Stands in for a rendered table while `htmd` runs.
const TABLE_TOKEN: &str = "DOCFETCHTABLE";

/// Tags dropped wholesale during conversion.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "nav", "iframe", "noscript", "svg", "template", "form",
];

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Result of converting an HTML page to Markdown.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// The final Markdown content (frontmatter included when requested).
    pub markdown: String,
    /// Page title from `<title>` or the first H1, if there is one.
    pub title: Option<String>,
}

/// Options for the HTML-to-Markdown conversion.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Source URL used for resolving relative links and frontmatter.
    pub source_url: String,
    /// Override title (if `None`, taken from the document).
    pub title: Option<String>,
    /// ISO 8601 timestamp for the `fetched_at` frontmatter field.
    pub fetched_at: Option<String>,
    /// Prepend a YAML frontmatter block.
    pub frontmatter: bool,
}

impl ConvertOptions {
    pub fn for_url(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Convert an HTML document to clean Markdown.
///
/// Picks the main content region (dropping page chrome), turns tables into
/// Markdown tables, runs `htmd`, then the cleanup passes.
#[instrument(skip(html), fields(url = %opts.source_url, html_len = html.len()))]
pub fn convert(html: &str, opts: &ConvertOptions) -> Result<ConvertResult> {
    let doc = Html::parse_document(html);
    let document_title = document_title(&doc);

    let (content_html, tables) = extract_tables(&main_content_html(&doc));

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .build();
    let raw = converter
        .convert(&content_html)
        .map_err(|e| DocFetchError::Conversion(format!("htmd conversion failed: {e}")))?;

    debug!(raw_len = raw.len(), tables = tables.len(), "htmd conversion complete");

    let raw = restore_tables(&raw, &tables);
    let base_url = Url::parse(&opts.source_url).ok();
    let body = cleanup::run(&raw, base_url.as_ref());

    let title = opts
        .title
        .clone()
        .or(document_title)
        .or_else(|| first_h1(&body));

    let markdown = if opts.frontmatter {
        let fm = frontmatter(&opts.source_url, title.as_deref(), opts.fetched_at.as_deref());
        format!("{fm}\n{body}")
    } else {
        body
    };

    debug!(title = ?title, final_len = markdown.len(), "conversion complete");

    Ok(ConvertResult { markdown, title })
}

/// Normalize a plain-text or Markdown body fetched as-is.
///
/// Line endings become `\n`, trailing whitespace is trimmed and the first
/// Markdown H1 (if any) is reported as the title.
pub fn normalize_text(text: &str, opts: &ConvertOptions) -> ConvertResult {
    let unified = text.replace("\r\n", "\n");
    let body: String = unified
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    let body = body.trim_matches('\n');
    let body = if body.is_empty() {
        String::new()
    } else {
        format!("{body}\n")
    };

    let title = opts.title.clone().or_else(|| first_h1(&body));
    let markdown = if opts.frontmatter {
        let fm = frontmatter(&opts.source_url, title.as_deref(), opts.fetched_at.as_deref());
        format!("{fm}\n{body}")
    } else {
        body
    };

    ConvertResult { markdown, title }
}

// ---------------------------------------------------------------------------
// Content selection
// ---------------------------------------------------------------------------

/// Inner HTML of the most specific content container, falling back to `<body>`.
fn main_content_html(doc: &Html) -> String {
    const CONTAINERS: &[&str] = &[
        "article .markdown",
        ".vp-doc",
        ".markdown-section",
        "[role=\"main\"]",
        "main",
        "article",
        "#content",
        ".content",
        "body",
    ];

    CONTAINERS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|sel| doc.select(&sel).next().map(|el| el.inner_html()))
        .unwrap_or_else(|| doc.root_element().inner_html())
}

/// Text of `<title>`, whitespace-collapsed.
fn document_title(doc: &Html) -> Option<String> {
    let sel = Selector::parse("head > title, title").ok()?;
    doc.select(&sel)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
}

/// First `# Heading` line in Markdown text, ignoring fenced code.
fn first_h1(md: &str) -> Option<String> {
    let mut in_fence = false;
    md.lines().find_map(|line| {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            return None;
        }
        if in_fence {
            return None;
        }
        line.strip_prefix("# ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
    })
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Swap each `<table>` for a placeholder paragraph (`htmd` 0.1 has no table
/// rule and would flatten the rows). Returns the rewritten HTML and the
/// rendered Markdown tables in placeholder order.
fn extract_tables(html: &str) -> (String, Vec<String>) {
    let fragment = Html::parse_fragment(html);
    let Ok(table_sel) = Selector::parse("table") else {
        return (html.to_string(), Vec::new());
    };

    let mut out = html.to_string();
    let mut tables = Vec::new();
    for table in fragment.select(&table_sel) {
        let source = table.html();
        // Nested tables vanish with their parent.
        if !out.contains(&source) {
            continue;
        }
        let token = table_token(tables.len());
        out = out.replacen(&source, &format!("<p>{token}</p>"), 1);
        tables.push(render_table(&table));
    }
    (out, tables)
}

fn table_token(index: usize) -> String {
    format!("{TABLE_TOKEN}{index}END")
}

fn restore_tables(md: &str, tables: &[String]) -> String {
    tables
        .iter()
        .enumerate()
        .fold(md.to_string(), |text, (i, table)| text.replace(&table_token(i), table))
}

fn render_table(table: &ElementRef) -> String {
    let (Ok(row_sel), Ok(cell_sel)) = (Selector::parse("tr"), Selector::parse("th, td")) else {
        return String::new();
    };

    let mut rows: Vec<Vec<String>> = table
        .select(&row_sel)
        .map(|tr| {
            tr.select(&cell_sel)
                .map(|cell| {
                    cell.text()
                        .collect::<String>()
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ")
                        .replace('|', "\\|")
                })
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return String::new();
    }
    for row in &mut rows {
        row.resize(width, String::new());
    }

    let line = |cells: &[String]| format!("| {} |", cells.join(" | "));
    let mut lines = vec![line(&rows[0]), line(&vec!["---".to_string(); width])];
    lines.extend(rows[1..].iter().map(|row| line(row)));
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a YAML frontmatter block.
fn frontmatter(source_url: &str, title: Option<&str>, fetched_at: Option<&str>) -> String {
    let mut fm = String::from("---\n");
    fm.push_str(&format!("source_url: \"{}\"\n", escape_yaml(source_url)));
    if let Some(title) = title {
        fm.push_str(&format!("title: \"{}\"\n", escape_yaml(title)));
    }
    if let Some(ts) = fetched_at {
        fm.push_str(&format!("fetched_at: \"{ts}\"\n"));
    }
    fm.push_str("---\n");
    fm
}

fn escape_yaml(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
