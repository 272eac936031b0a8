//! Markdown-to-terminal rendering for assistant message bodies.
//!
//! Parses to mdast and walks the tree, styling with the crate theme. Output
//! uses `\n` line endings; the renderer converts for raw mode on write.

use crossterm::style::ContentStyle;
use markdown::{ParseOptions, mdast::Node, to_mdast};

use super::theme;

/// Render markdown source to styled terminal text.
///
/// Unparseable input falls back to the raw source.
pub fn render(source: &str) -> String {
    let Ok(root) = to_mdast(source, &ParseOptions::gfm()) else {
        return source.to_string();
    };
    let mut blocks = Vec::new();
    if let Node::Root(root) = root {
        for child in &root.children {
            render_block(child, 0, &mut blocks);
        }
    }
    blocks.join("\n\n")
}

/// Render one block-level node into `blocks`.
fn render_block(node: &Node, depth: usize, blocks: &mut Vec<String>) {
    match node {
        Node::Paragraph(p) => {
            blocks.push(inline_text(&p.children));
        }
        Node::Heading(h) => {
            blocks.push(styled(theme::heading(), &plain_text(&h.children)));
        }
        Node::Code(code) => {
            let rendered = code
                .value
                .lines()
                .map(|line| format!("  {}", styled(theme::code_block(), line)))
                .collect::<Vec<_>>()
                .join("\n");
            blocks.push(rendered);
        }
        Node::List(list) => {
            let mut lines = Vec::new();
            let mut number = list.start.unwrap_or(1);
            for item in &list.children {
                let Node::ListItem(item) = item else {
                    continue;
                };
                let marker = if list.ordered {
                    let m = format!("{number}. ");
                    number += 1;
                    m
                } else {
                    "• ".to_string()
                };
                lines.push(render_list_item(&item.children, &marker, depth));
            }
            blocks.push(lines.join("\n"));
        }
        Node::Blockquote(quote) => {
            let mut inner = Vec::new();
            for child in &quote.children {
                render_block(child, depth, &mut inner);
            }
            let quoted = inner
                .join("\n\n")
                .lines()
                .map(|line| format!("{} {}", styled(theme::quote(), ">"), line))
                .collect::<Vec<_>>()
                .join("\n");
            blocks.push(quoted);
        }
        Node::ThematicBreak(_) => {
            blocks.push(styled(theme::dim(), "---"));
        }
        Node::Html(html) => {
            blocks.push(html.value.clone());
        }
        Node::Text(text) => {
            blocks.push(text.value.clone());
        }
        other => {
            // Tables, math, and anything else fall back to their plain text.
            let text = inline_text(std::slice::from_ref(other));
            if !text.is_empty() {
                blocks.push(text);
            }
        }
    }
}

/// Render a list item's children: first paragraph inline behind the marker,
/// nested blocks indented beneath it.
fn render_list_item(children: &[Node], marker: &str, depth: usize) -> String {
    let indent = "  ".repeat(depth);
    let mut lines = Vec::new();
    let mut first = true;
    for child in children {
        match child {
            Node::Paragraph(p) if first => {
                lines.push(format!("{indent}{marker}{}", inline_text(&p.children)));
                first = false;
            }
            Node::List(_) => {
                let mut nested = Vec::new();
                render_block(child, depth + 1, &mut nested);
                lines.extend(nested);
            }
            other => {
                let mut nested = Vec::new();
                render_block(other, depth, &mut nested);
                for block in nested {
                    for line in block.lines() {
                        lines.push(format!("{indent}  {line}"));
                    }
                }
                first = false;
            }
        }
    }
    if first {
        lines.push(format!("{indent}{marker}"));
    }
    lines.join("\n")
}

/// Collect inline nodes into one styled string.
fn inline_text(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(&text.value),
            Node::Strong(strong) => {
                out.push_str(&styled(
                    theme::strong(),
                    &plain_text(&strong.children),
                ));
            }
            Node::Emphasis(em) => {
                out.push_str(&styled(theme::emphasis(), &plain_text(&em.children)));
            }
            Node::Delete(del) => {
                out.push_str(&styled(
                    theme::strikethrough(),
                    &plain_text(&del.children),
                ));
            }
            Node::InlineCode(code) => {
                out.push_str(&styled(theme::inline_code(), &code.value));
            }
            Node::Link(link) => {
                let text = plain_text(&link.children);
                if text == link.url {
                    out.push_str(&styled(theme::link_url(), &link.url));
                } else {
                    out.push_str(&text);
                    out.push_str(&format!(" ({})", styled(theme::link_url(), &link.url)));
                }
            }
            Node::Image(image) => {
                out.push_str(&image.alt);
            }
            Node::Break(_) => out.push('\n'),
            other => {
                for child in other.children().into_iter().flatten() {
                    out.push_str(&inline_text(std::slice::from_ref(child)));
                }
            }
        }
    }
    out
}

/// Flatten inline nodes to unstyled text.
fn plain_text(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(&text.value),
            Node::InlineCode(code) => out.push_str(&code.value),
            other => {
                for child in other.children().into_iter().flatten() {
                    out.push_str(&plain_text(std::slice::from_ref(child)));
                }
            }
        }
    }
    out
}

fn styled(style: ContentStyle, text: &str) -> String {
    style.apply(text).to_string()
}
