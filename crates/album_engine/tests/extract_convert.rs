use album_core::UNKNOWN_TITLE;
use album_engine::{compose_header, ContentParser, MarkdownConverter, ParseError};
use pretty_assertions::assert_eq;

const ARTICLE: &str = r#"
<html>
<head>
    <title>微信公众平台</title>
    <meta property="og:title" content="OG title">
</head>
<body>
    <h1 id="activity-name">
        Rust 异步入门
    </h1>
    <a id="js_name">  技术周刊  </a>
    <em id="publish_time">2024-03-01 08:30</em>
    <div id="js_content">
        <p>First <strong>bold</strong> paragraph.</p>
        <script>track();</script>
        <div class="qr_code_pc">Scan me</div>
        <p><img data-src="http://mmbiz.qpic.cn/mmbiz_png/abc/640?wx_fmt=png" src="data:image/svg+xml,%3Csvg%3E" alt="diagram"></p>
        <p><img src="data:image/svg+xml,%3Csvg%20xmlns%3E"></p>
        <ul><li>one</li><li>two</li></ul>
        <div class="reward_area">Tip the author</div>
    </div>
</body>
</html>
"#;

#[test]
fn parser_walks_the_fallback_chains() {
    let parsed = ContentParser::platform().parse(ARTICLE).expect("parsed");

    assert_eq!(parsed.title, "Rust 异步入门");
    assert_eq!(parsed.author.as_deref(), Some("技术周刊"));
    assert_eq!(parsed.publish_time.as_deref(), Some("2024-03-01 08:30"));
    assert_eq!(
        parsed.images,
        vec!["https://mmbiz.qpic.cn/mmbiz_png/abc/640?wx_fmt=png".to_string()]
    );
    assert!(parsed.body_html.contains("First"));
    assert!(!parsed.body_html.contains("track()"));
    assert!(!parsed.body_html.contains("Scan me"));
    assert!(!parsed.body_html.contains("Tip the author"));
}

#[test]
fn landing_page_title_is_skipped_for_later_strategies() {
    let html = r#"<html><head><title>微信公众平台</title>
        <meta property="og:title" content="Fallback headline"></head>
        <body><div id="js_content"><p>text</p></div></body></html>"#;
    let parsed = ContentParser::platform().parse(html).expect("parsed");
    assert_eq!(parsed.title, "Fallback headline");
}

#[test]
fn missing_title_uses_the_sentinel() {
    let html = r#"<html><body><div class="rich_media_content"><p>text</p></div></body></html>"#;
    let parsed = ContentParser::platform().parse(html).expect("parsed");
    assert_eq!(parsed.title, UNKNOWN_TITLE);
    assert_eq!(parsed.author, None);
}

#[test]
fn publish_time_without_a_year_falls_through_to_script_timestamp_in_platform_time() {
    let html = r#"<html><body>
        <em id="publish_time">yesterday</em>
        <div id="js_content"><p>text</p></div>
        <script>var ct = "1700000000";</script>
    </body></html>"#;
    let parsed = ContentParser::platform().parse(html).expect("parsed");
    assert_eq!(parsed.publish_time.as_deref(), Some("2023-11-15 06:13"));
}

#[test]
fn page_without_body_is_content_not_found() {
    let html = "<html><head><title>Only a title</title></head><body></body></html>";
    assert_eq!(
        ContentParser::platform().parse(html),
        Err(ParseError::ContentNotFound)
    );
}

#[test]
fn converted_article_keeps_cdn_image_and_drops_placeholder() {
    let parsed = ContentParser::platform().parse(ARTICLE).expect("parsed");
    let markdown = MarkdownConverter::default().convert(
        &parsed.body_html,
        &parsed.title,
        parsed.author.as_deref(),
        parsed.publish_time.as_deref(),
    );

    assert_eq!(markdown.matches("![").count(), 1);
    assert!(markdown.contains("![diagram](https://mmbiz.qpic.cn/mmbiz_png/abc/640?wx_fmt=png)"));
    assert!(!markdown.contains("svg"));
    assert!(!markdown.contains("track()"));
    assert!(markdown.starts_with(
        "# Rust 异步入门\n\n---\nauthor: 技术周刊\npublish_time: 2024-03-01 08:30\n---\n\n"
    ));
    assert!(markdown.contains("First **bold** paragraph."));
    assert!(markdown.contains("- one\n- two"));
}

#[test]
fn metadata_block_lists_only_present_fields() {
    assert_eq!(
        compose_header("T", Some("A"), None),
        "# T\n\n---\nauthor: A\n---\n\n"
    );
    assert_eq!(compose_header("T", None, None), "# T\n\n");
}

#[test]
fn converter_renders_common_block_elements() {
    let html = r#"
        <h2>Section</h2>
        <p>See <a href="https://example.com/doc">the docs</a> and <code>cargo run</code>.</p>
        <blockquote><p>quoted line</p></blockquote>
        <ol><li>first</li><li>second</li></ol>
        <pre><code>fn main() {}</code></pre>
        <iframe src="https://v.qq.com/player"></iframe>
    "#;
    let markdown = MarkdownConverter::default().body_to_markdown(html);
    assert_eq!(
        markdown,
        "## Section\n\nSee [the docs](https://example.com/doc) and `cargo run`.\n\n> quoted line\n\n1. first\n2. second\n\n```\nfn main() {}\n```"
    );
}

#[test]
fn inline_markup_keeps_surrounding_spaces() {
    let html = r#"<p>This is<strong> important </strong>text, this is<em> subtle </em>too, and<a href="https://example.com"> a link </a>here.</p>"#;
    assert_eq!(
        MarkdownConverter::default().body_to_markdown(html),
        "This is **important** text, this is *subtle* too, and [a link](https://example.com) here."
    );
}

#[test]
fn literal_markdown_characters_are_escaped() {
    let html = "<p>*not emphasis* and 1. not a list with snake_case [x]</p><p># not heading</p><p>2. not ordered</p><p>- not a bullet</p>";
    assert_eq!(
        MarkdownConverter::default().body_to_markdown(html),
        "\\*not emphasis\\* and 1. not a list with snake\\_case \\[x\\]\n\n\\# not heading\n\n2\\. not ordered\n\n\\- not a bullet"
    );
}
