//! Post-conversion cleanup passes for Markdown output.
//!
//! Text passes are plain `&str -> String` functions applied in order; link
//! resolution runs last because it needs the page's base URL.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

type Pass = fn(&str) -> String;

/// Passes that only look at the text itself.
const TEXT_PASSES: &[Pass] = &[
    demote_extra_h1,
    collapse_blank_lines,
    fix_fence_languages,
    strip_wrapper_tags,
    drop_empty_links,
    trim_line_ends,
];

/// Run every cleanup pass over raw Markdown.
pub(crate) fn run(md: &str, base_url: Option<&Url>) -> String {
    let cleaned = TEXT_PASSES
        .iter()
        .fold(md.to_string(), |text, pass| pass(&text));

    let resolved = match base_url {
        Some(base) => absolutize_links(&cleaned, base),
        None => cleaned,
    };

    let body = resolved.trim_matches('\n');
    if body.is_empty() {
        String::new()
    } else {
        format!("{body}\n")
    }
}

/// Apply `f` to every line outside fenced code blocks; fence lines and code
/// pass through untouched.
fn map_outside_fences(md: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut in_fence = false;
    md.lines()
        .map(|line| {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                return line.to_string();
            }
            if in_fence {
                line.to_string()
            } else {
                f(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keep the first H1; later ones become H2 so a page has a single top heading.
fn demote_extra_h1(md: &str) -> String {
    let mut seen_h1 = false;
    map_outside_fences(md, |line| match line.strip_prefix("# ") {
        Some(text) if seen_h1 => format!("## {text}"),
        Some(_) => {
            seen_h1 = true;
            line.to_string()
        }
        None => line.to_string(),
    })
}

/// At most two consecutive blank lines.
fn collapse_blank_lines(md: &str) -> String {
    static BLANKS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{4,}").expect("valid regex"));

    BLANKS_RE.replace_all(md, "\n\n\n").into_owned()
}

/// ```` ```language-js ```` → ```` ```js ````.
fn fix_fence_languages(md: &str) -> String {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^```(?:language-|lang-|highlight-)(\w+)").expect("valid regex")
    });

    FENCE_RE.replace_all(md, "```$1").into_owned()
}

/// Remove layout tags that survived conversion, outside fenced code.
fn strip_wrapper_tags(md: &str) -> String {
    static WRAPPER_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"</?(?:div|span|section|article|aside|header|footer|figure|figcaption|details|summary|font|center)(?:\s[^>]*)?>",
        )
        .expect("valid regex")
    });

    map_outside_fences(md, |line| WRAPPER_RE.replace_all(line, "").into_owned())
}

/// `[](/foo)` carries nothing readable; icon links often convert this way.
fn drop_empty_links(md: &str) -> String {
    static EMPTY_LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(^|[^!])\[\s*\]\([^)]*\)").expect("valid regex"));

    map_outside_fences(md, |line| EMPTY_LINK_RE.replace_all(line, "$1").into_owned())
}

fn trim_line_ends(md: &str) -> String {
    md.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

/// Rewrite relative link targets against `base`; images, absolute links and
/// fenced code stay.
fn absolutize_links(md: &str, base: &Url) -> String {
    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(!?)\[([^\]]*)\]\(([^)\s]+)\)").expect("valid regex"));

    map_outside_fences(md, |line| {
        LINK_RE
            .replace_all(line, |caps: &regex::Captures| {
                let bang = &caps[1];
                let text = &caps[2];
                let href = &caps[3];

                let keep = !bang.is_empty()
                    || href.starts_with('#')
                    || href.starts_with("mailto:")
                    || Url::parse(href).is_ok();
                if keep {
                    return caps[0].to_string();
                }

                match base.join(href) {
                    Ok(resolved) => format!("[{text}]({resolved})"),
                    Err(_) => caps[0].to_string(),
                }
            })
            .into_owned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_h1_is_demoted() {
        let input = "# Title\n\nSome text\n\n# Another\n\nMore";
        assert_eq!(demote_extra_h1(input), "# Title\n\nSome text\n\n## Another\n\nMore");
    }

    #[test]
    fn nested_headings_untouched() {
        let input = "# Only One\n\n## Sub\n\n### Deep";
        assert_eq!(demote_extra_h1(input), input);
    }

    #[test]
    fn shell_comments_in_code_keep_their_hash() {
        let input = "# Install\n\n```bash\n# install the deps\nnpm ci\n```\n\n# Usage";
        assert_eq!(
            demote_extra_h1(input),
            "# Install\n\n```bash\n# install the deps\nnpm ci\n```\n\n## Usage"
        );
    }

    #[test]
    fn blank_runs_collapse() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn fence_language_prefix_removed() {
        let input = "```language-javascript\nconsole.log('hi');\n```";
        assert!(fix_fence_languages(input).starts_with("```javascript\n"));
        let plain = "```rust\nfn main() {}\n```";
        assert_eq!(fix_fence_languages(plain), plain);
    }

    #[test]
    fn wrapper_tags_removed_outside_code() {
        let input = "<div class=\"note\">Important</div>\n```html\n<div>kept</div>\n```";
        let result = strip_wrapper_tags(input);
        assert!(result.starts_with("Important\n"));
        assert!(result.contains("<div>kept</div>"));
    }

    #[test]
    fn empty_links_dropped_but_images_kept() {
        let input = "see [](/icon) here ![](/logo.png)";
        assert_eq!(drop_empty_links(input), "see  here ![](/logo.png)");
    }

    #[test]
    fn relative_links_resolved() {
        let base = Url::parse("https://docs.example.com/guide/intro").unwrap();
        assert_eq!(
            absolutize_links("[Next](/api/reference)", &base),
            "[Next](https://docs.example.com/api/reference)"
        );
        assert_eq!(
            absolutize_links("[Sib](setup)", &base),
            "[Sib](https://docs.example.com/guide/setup)"
        );
    }

    #[test]
    fn absolute_anchor_and_image_links_untouched() {
        let base = Url::parse("https://docs.example.com/page").unwrap();
        for input in [
            "[Link](https://other.com/page)",
            "[Section](#section-1)",
            "![Logo](/logo.png)",
            "[Mail](mailto:a@b.com)",
        ] {
            assert_eq!(absolutize_links(input, &base), input);
        }
    }

    #[test]
    fn links_inside_code_left_alone() {
        let base = Url::parse("https://example.com/guide/intro").unwrap();
        let input = "[Setup](setup)\n```md\nsee [docs](setup) and [](/icon)\n```";
        assert_eq!(
            run(input, Some(&base)),
            "[Setup](https://example.com/guide/setup)\n```md\nsee [docs](setup) and [](/icon)\n```\n"
        );
    }

    #[test]
    fn full_run_cleans_markdown() {
        let input = "# Title\n\n\n\n\n\n## Section   \n\n<div>Some content</div>\n\n```language-python\nprint('hi')\n```\n\n[Up](../)\n\n";
        let base = Url::parse("https://example.com/a/b").unwrap();
        let result = run(input, Some(&base));

        assert!(!result.contains("\n\n\n\n"));
        assert!(result.contains("```python"));
        assert!(!result.contains("<div>"));
        assert!(result.contains("Some content"));
        assert!(result.contains("## Section\n"));
        assert!(result.contains("[Up](https://example.com/)"));
        assert!(result.ends_with(")\n"));
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(run("\n\n  \n", None), "");
    }
}
