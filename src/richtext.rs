use pulldown_cmark::escape::{escape_href, escape_html};
use serde::Deserialize;

/// A structured rich-text block as returned by the CMS.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RichTextBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
}

/// Inline styling applied to a character range of a block.
///
/// `start` and `end` are character offsets into the block text, end exclusive.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SpanData {
    pub url: Option<String>,
    pub label: Option<String>,
}

impl RichTextBlock {
    pub fn paragraph(text: &str) -> Self {
        Self {
            kind: "paragraph".to_string(),
            text: text.to_string(),
            spans: Vec::new(),
        }
    }

    fn list_kind(&self) -> Option<&'static str> {
        match self.kind.as_str() {
            "list-item" => Some("ul"),
            "o-list-item" => Some("ol"),
            _ => None,
        }
    }

    fn block_tag(&self) -> &str {
        match self.kind.as_str() {
            "heading1" => "h1",
            "heading2" => "h2",
            "heading3" => "h3",
            "heading4" => "h4",
            "heading5" => "h5",
            "heading6" => "h6",
            "preformatted" => "pre",
            _ => "p",
        }
    }
}

impl Span {
    fn open_tag(&self) -> Option<String> {
        let data = self.data.clone().unwrap_or_default();
        match self.kind.as_str() {
            "strong" => Some("<strong>".to_string()),
            "em" => Some("<em>".to_string()),
            "hyperlink" => data.url.map(|url| {
                let mut tag = String::from("<a href=\"");
                // writes into a String cannot fail
                let _ = escape_href(&mut tag, &url);
                tag.push_str("\" target=\"_blank\" rel=\"noopener\">");
                tag
            }),
            "label" => data.label.map(|label| {
                let mut tag = String::from("<span class=\"");
                let _ = escape_html(&mut tag, &label);
                tag.push_str("\">");
                tag
            }),
            _ => None,
        }
    }

    fn close_tag(&self) -> &'static str {
        match self.kind.as_str() {
            "strong" => "</strong>",
            "em" => "</em>",
            "hyperlink" => "</a>",
            _ => "</span>",
        }
    }
}

/// Flatten blocks to plain text, one space between blocks.
pub fn as_text(blocks: &[RichTextBlock]) -> String {
    blocks
        .iter()
        .map(|block| block.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render blocks to HTML.
///
/// Consecutive list items share a single `<ul>`/`<ol>`. Blocks of unknown type
/// render as paragraphs, unless they carry no text (images, embeds), in which
/// case they are dropped.
pub fn as_html(blocks: &[RichTextBlock]) -> String {
    let mut out = String::new();
    let mut open_list: Option<&'static str> = None;

    for block in blocks {
        let list = block.list_kind();
        if open_list != list {
            if let Some(tag) = open_list {
                out.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = list {
                out.push_str(&format!("<{}>", tag));
            }
            open_list = list;
        }

        let inner = render_spans(&block.text, &block.spans);
        if list.is_some() {
            out.push_str(&format!("<li>{}</li>", inner));
            continue;
        }
        if block.text.is_empty() && block.block_tag() == "p" && block.kind != "paragraph" {
            continue;
        }
        let tag = block.block_tag();
        out.push_str(&format!("<{}>{}</{}>", tag, inner, tag));
    }

    if let Some(tag) = open_list {
        out.push_str(&format!("</{}>", tag));
    }
    out
}

fn render_spans(text: &str, spans: &[Span]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let spans: Vec<(&Span, String)> = spans
        .iter()
        .filter(|s| s.start < s.end && s.end <= chars.len())
        .filter_map(|s| s.open_tag().map(|tag| (s, tag)))
        .collect();

    let mut out = String::new();
    let mut open: Vec<&(&Span, String)> = Vec::new();

    for i in 0..=chars.len() {
        // Close everything down to the innermost span ending here, then reopen
        // the ones that continue past this point.
        let mut reopen = Vec::new();
        while open.iter().any(|(s, _)| s.end == i) {
            let Some(entry) = open.pop() else { break };
            out.push_str(entry.0.close_tag());
            if entry.0.end != i {
                reopen.push(entry);
            }
        }
        for entry in reopen.into_iter().rev() {
            out.push_str(&entry.1);
            open.push(entry);
        }

        let mut starting: Vec<&(&Span, String)> =
            spans.iter().filter(|(s, _)| s.start == i).collect();
        starting.sort_by(|a, b| b.0.end.cmp(&a.0.end));
        for entry in starting {
            out.push_str(&entry.1);
            open.push(entry);
        }

        match chars.get(i) {
            Some('\n') => out.push_str("<br />"),
            Some(c) => {
                let mut buf = [0u8; 4];
                let _ = escape_html(&mut out, c.encode_utf8(&mut buf));
            }
            None => {}
        }
    }
    out
}
