use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html};

use crate::images::ImagePolicy;

/// Converts article body markup into a Markdown document.
///
/// Output conventions: ATX headings, fenced code blocks, `-` bullets, `*`
/// emphasis and `**` strong. Scripting nodes render as nothing; images go
/// through the same [`ImagePolicy`] as the parser.
#[derive(Debug, Clone, Default)]
pub struct MarkdownConverter {
    images: ImagePolicy,
}

impl MarkdownConverter {
    pub fn new(images: ImagePolicy) -> Self {
        Self { images }
    }

    /// Heading, optional metadata block, then the converted body.
    pub fn convert(
        &self,
        body_html: &str,
        title: &str,
        author: Option<&str>,
        publish_time: Option<&str>,
    ) -> String {
        let mut document = compose_header(title, author, publish_time);
        document.push_str(&self.body_to_markdown(body_html));
        document
    }

    pub fn body_to_markdown(&self, html: &str) -> String {
        let fragment = Html::parse_fragment(html);
        let mut ctx = ConversionContext::new();
        self.visit_children(fragment.root_element(), &mut ctx);
        ctx.finish()
    }

    fn visit_node(&self, node: NodeRef<'_, Node>, ctx: &mut ConversionContext) {
        match node.value() {
            Node::Text(text) => ctx.append_text(text),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(node) {
                    self.visit_element(element, ctx);
                }
            }
            _ => {
                for child in node.children() {
                    self.visit_node(child, ctx);
                }
            }
        }
    }

    fn visit_element(&self, element: ElementRef, ctx: &mut ConversionContext) {
        let tag = element.value().name().to_ascii_lowercase();
        match tag.as_str() {
            "script" | "style" | "noscript" | "iframe" | "template" | "svg" => {}
            "img" => self.handle_image(element, ctx),
            "br" => ctx.line_break(),
            "hr" => ctx.push_block("* * *"),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = usize::from(tag.as_bytes()[1] - b'0');
                let text = single_line(&self.render(element));
                if !text.is_empty() {
                    ctx.push_block(&format!("{} {}", "#".repeat(level), text));
                }
            }
            "strong" | "b" => self.wrap_inline(element, "**", ctx),
            "em" | "i" => self.wrap_inline(element, "*", ctx),
            "code" => {
                let code = element.text().collect::<String>();
                if !code.trim().is_empty() {
                    ctx.append_raw(&format!("`{}`", code.trim()));
                }
            }
            "pre" => {
                let code = element.text().collect::<String>();
                let code = code.trim_matches('\n');
                if !code.trim().is_empty() {
                    ctx.push_block(&format!("```\n{code}\n```"));
                }
            }
            "blockquote" => {
                let inner = self.render(element);
                if !inner.is_empty() {
                    let quoted = inner
                        .lines()
                        .map(|line| {
                            if line.is_empty() {
                                ">".to_string()
                            } else {
                                format!("> {line}")
                            }
                        })
                        .collect::<Vec<_>>()
                        .join("\n");
                    ctx.push_block(&quoted);
                }
            }
            "ul" | "ol" => self.handle_list(element, tag == "ol", ctx),
            "li" => {
                let item = self.render(element);
                if !item.is_empty() {
                    ctx.push_block(&list_item("- ", &item));
                }
            }
            "a" => self.handle_anchor(element, ctx),
            "p" | "div" | "section" | "article" | "header" | "footer" | "figure"
            | "figcaption" | "table" | "tr" | "address" | "center" => {
                ctx.block_break();
                self.visit_children(element, ctx);
                ctx.block_break();
            }
            "td" | "th" => {
                self.visit_children(element, ctx);
                ctx.append_text(" ");
            }
            _ => self.visit_children(element, ctx),
        }
    }

    fn visit_children(&self, element: ElementRef, ctx: &mut ConversionContext) {
        for child in element.children() {
            self.visit_node(child, ctx);
        }
    }

    /// Renders an element's children on their own and returns the trimmed result.
    fn render(&self, element: ElementRef) -> String {
        let mut inner = ConversionContext::new();
        self.visit_children(element, &mut inner);
        inner.finish()
    }

    fn wrap_inline(&self, element: ElementRef, delimiter: &str, ctx: &mut ConversionContext) {
        let inner = single_line(&self.render(element));
        let (leading, trailing) = edge_whitespace(element);
        if leading {
            ctx.append_text(" ");
        }
        if inner.is_empty() {
            return;
        }
        ctx.append_raw(&format!("{delimiter}{inner}{delimiter}"));
        if trailing {
            ctx.append_text(" ");
        }
    }

    fn handle_list(&self, element: ElementRef, ordered: bool, ctx: &mut ConversionContext) {
        let items: Vec<String> = element
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|child| child.value().name().eq_ignore_ascii_case("li"))
            .map(|li| self.render(li))
            .filter(|item| !item.is_empty())
            .collect();
        if items.is_empty() {
            return;
        }
        let rendered = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let marker = if ordered {
                    format!("{}. ", index + 1)
                } else {
                    "- ".to_string()
                };
                list_item(&marker, item)
            })
            .collect::<Vec<_>>()
            .join("\n");
        ctx.push_block(&rendered);
    }

    fn handle_anchor(&self, element: ElementRef, ctx: &mut ConversionContext) {
        let text = single_line(&self.render(element));
        let (leading, trailing) = edge_whitespace(element);
        if leading {
            ctx.append_text(" ");
        }
        if text.is_empty() {
            return;
        }
        let href = element
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|href| href.starts_with("http://") || href.starts_with("https://"));
        match href {
            Some(href) => ctx.append_raw(&format!("[{text}]({href})")),
            None => ctx.append_raw(&text),
        }
        if trailing {
            ctx.append_text(" ");
        }
    }

    fn handle_image(&self, element: ElementRef, ctx: &mut ConversionContext) {
        let Some(url) = self.images.resolve(&element) else {
            return;
        };
        let alt = element.value().attr("alt").unwrap_or("").trim();
        let image = match element.value().attr("title").map(str::trim) {
            Some(title) if !title.is_empty() => format!("![{alt}]({url} \"{title}\")"),
            _ => format!("![{alt}]({url})"),
        };
        ctx.append_raw(&image);
    }
}

/// `# title`, then a `---` fenced block with whichever of author and publish
/// time is present; the block is omitted when neither is.
pub fn compose_header(title: &str, author: Option<&str>, publish_time: Option<&str>) -> String {
    let mut header = format!("# {title}\n\n");
    if author.is_some() || publish_time.is_some() {
        header.push_str("---\n");
        if let Some(author) = author {
            header.push_str(&format!("author: {author}\n"));
        }
        if let Some(publish_time) = publish_time {
            header.push_str(&format!("publish_time: {publish_time}\n"));
        }
        header.push_str("---\n\n");
    }
    header
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether the element's text starts and ends with whitespace. Inline
/// delimiters must sit inside that whitespace, not swallow it.
fn edge_whitespace(element: ElementRef) -> (bool, bool) {
    let text = element.text().collect::<String>();
    (
        text.starts_with(char::is_whitespace),
        text.ends_with(char::is_whitespace),
    )
}

/// Backslash-escapes text so it cannot be read back as Markdown syntax.
/// Line-leading markers are only escaped when `line_start` is set.
fn escape_markdown(text: &str, line_start: bool) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    if line_start {
        let digits = text.len() - text.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        let rest = &text[digits..];
        if digits > 0 && (rest == "." || rest.starts_with(". ")) {
            out.push_str(&text[..digits]);
            out.push('\\');
            return escape_inline(&text[digits..], out);
        }
        if text.starts_with(['#', '-', '+', '>']) {
            out.push('\\');
        }
    }
    escape_inline(text, out)
}

fn escape_inline(text: &str, mut out: String) -> String {
    for ch in text.chars() {
        if matches!(ch, '\\' | '*' | '_' | '[' | ']' | '`') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn list_item(marker: &str, item: &str) -> String {
    let indent = " ".repeat(marker.len());
    let mut lines = item.lines();
    let mut out = format!("{marker}{}", lines.next().unwrap_or_default());
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(&indent);
            out.push_str(line);
        }
    }
    out
}

struct ConversionContext {
    builder: String,
    last_char: Option<char>,
}

impl ConversionContext {
    fn new() -> Self {
        Self {
            builder: String::new(),
            last_char: None,
        }
    }

    /// Trims trailing spaces per line and collapses runs of blank lines.
    fn finish(self) -> String {
        let mut out = String::with_capacity(self.builder.len());
        let mut blank_run = 0;
        for line in self.builder.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                blank_run += 1;
                if blank_run > 1 {
                    continue;
                }
            } else {
                blank_run = 0;
            }
            out.push_str(line);
            out.push('\n');
        }
        out.trim().to_string()
    }

    /// Collapses whitespace, then escapes the result as literal text.
    fn append_text(&mut self, text: &str) {
        let line_start = matches!(self.last_char, None | Some('\n'));
        let mut last = self.last_char;
        let mut collapsed = String::with_capacity(text.len());
        for ch in text.chars() {
            if ch.is_whitespace() {
                if matches!(last, None | Some(' ') | Some('\n')) {
                    continue;
                }
                collapsed.push(' ');
                last = Some(' ');
            } else {
                collapsed.push(ch);
                last = Some(ch);
            }
        }
        let escaped = escape_markdown(&collapsed, line_start);
        self.append_raw(&escaped);
    }

    fn append_raw(&mut self, text: &str) {
        for ch in text.chars() {
            self.push_char(ch);
        }
    }

    fn line_break(&mut self) {
        if self.last_char == Some('\n') || self.builder.is_empty() {
            return;
        }
        self.push_char('\n');
    }

    fn block_break(&mut self) {
        if self.builder.is_empty() || self.builder.ends_with("\n\n") {
            return;
        }
        self.line_break();
        self.push_char('\n');
    }

    fn push_block(&mut self, block: &str) {
        self.block_break();
        self.append_raw(block);
        self.block_break();
    }

    fn push_char(&mut self, ch: char) {
        self.builder.push(ch);
        self.last_char = Some(ch);
    }
}
