//! Markdown-to-HTML formatter for assistant replies
//!
//! Covers the subset replies actually use: `#`..`###` headings, bullet
//! lists, `**bold**`, `*italic*`, `` `code` `` and paragraphs.

use once_cell::sync::Lazy;
use regex::Regex;

static CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid regex"));
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"));
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").expect("valid regex"));

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn inline(text: &str) -> String {
    let escaped = escape_html(text);
    let code = CODE.replace_all(&escaped, "<code>$1</code>");
    let bold = BOLD.replace_all(&code, "<strong>$1</strong>");
    ITALIC.replace_all(&bold, "<em>$1</em>").into_owned()
}

#[derive(Default)]
struct Blocks {
    html: String,
    paragraph: Vec<String>,
    list: Vec<String>,
}

impl Blocks {
    fn close_paragraph(&mut self) {
        if !self.paragraph.is_empty() {
            self.html.push_str("<p>");
            self.html.push_str(&self.paragraph.join("<br>"));
            self.html.push_str("</p>");
            self.paragraph.clear();
        }
    }

    fn close_list(&mut self) {
        if !self.list.is_empty() {
            self.html.push_str("<ul>");
            for item in self.list.drain(..) {
                self.html.push_str("<li>");
                self.html.push_str(&item);
                self.html.push_str("</li>");
            }
            self.html.push_str("</ul>");
        }
    }

    fn close_all(&mut self) {
        self.close_paragraph();
        self.close_list();
    }
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if (1..=3).contains(&level) {
        line[level..].strip_prefix(' ').map(|rest| (level, rest))
    } else {
        None
    }
}

pub fn format_markdown(text: &str) -> String {
    let mut blocks = Blocks::default();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            blocks.close_all();
            continue;
        }

        if let Some((level, content)) = heading(line) {
            blocks.close_all();
            blocks
                .html
                .push_str(&format!("<h{0}>{1}</h{0}>", level, inline(content.trim())));
        } else if let Some(item) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            blocks.close_paragraph();
            blocks.list.push(inline(item.trim()));
        } else {
            blocks.close_list();
            blocks.paragraph.push(inline(line));
        }
    }

    blocks.close_all();
    blocks.html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs_and_inline() {
        assert_eq!(
            format_markdown("Keep **going**, you are *close*.\nUse `focus` mode.\n\nNext"),
            "<p>Keep <strong>going</strong>, you are <em>close</em>.<br>Use <code>focus</code> mode.</p><p>Next</p>"
        );
    }

    #[test]
    fn test_headings_and_lists() {
        let html = format_markdown("## Plan\n- stretch\n* run 5k\nThen rest");
        assert_eq!(
            html,
            "<h2>Plan</h2><ul><li>stretch</li><li>run 5k</li></ul><p>Then rest</p>"
        );
    }

    #[test]
    fn test_escapes_html() {
        assert_eq!(
            format_markdown("<script>alert(\"x\")</script> & more"),
            "<p>&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; more</p>"
        );
    }

    #[test]
    fn test_not_a_heading() {
        assert_eq!(format_markdown("#hashtag"), "<p>#hashtag</p>");
        assert_eq!(format_markdown("#### deep"), "<p>#### deep</p>");
    }

    #[test]
    fn test_empty() {
        assert_eq!(format_markdown(""), "");
    }
}
