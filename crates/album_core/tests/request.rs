use album_core::{ExtractError, ExtractionRequest, ExtractorConfig, HarvestMode, RequestKind};
use pretty_assertions::assert_eq;

#[test]
fn album_and_article_urls_are_classified() {
    let album = ExtractionRequest::new(
        "https://mp.weixin.qq.com/mp/appmsgalbum?__biz=MzA&action=getalbum&album_id=42",
    );
    let article = ExtractionRequest::new("https://mp.weixin.qq.com/s?__biz=MzA&mid=1");

    assert_eq!(album.validate(), Ok(RequestKind::Album));
    assert_eq!(article.validate(), Ok(RequestKind::Article));
}

#[test]
fn foreign_hosts_and_zero_counts_are_rejected() {
    let foreign = ExtractionRequest::new("https://example.com/s?__biz=MzA");
    let zero = ExtractionRequest::new("https://mp.weixin.qq.com/mp/appmsgalbum?album_id=1")
        .with_max_count(0);
    let empty = ExtractionRequest::new("  ");

    for request in [foreign, zero, empty] {
        let err = request.validate().unwrap_err();
        assert!(matches!(err, ExtractError::Validation(_)), "{err:?}");
        assert_eq!(err.kind(), "ValidationError");
    }
}

#[test]
fn request_deserializes_from_boundary_json() {
    let request: ExtractionRequest = serde_json::from_str(
        r#"{"url":"https://mp.weixin.qq.com/mp/appmsgalbum?album_id=1","maxCount":7,"mode":"static"}"#,
    )
    .unwrap();

    assert_eq!(request.max_count, Some(7));
    assert_eq!(request.mode, HarvestMode::Static);

    let defaults: ExtractionRequest =
        serde_json::from_str(r#"{"url":"https://mp.weixin.qq.com/s?__biz=MzA"}"#).unwrap();
    assert_eq!(defaults.max_count, None);
    assert_eq!(defaults.mode, HarvestMode::Browser);
}

#[test]
fn config_fills_missing_fields_with_defaults() {
    let config = ExtractorConfig::from_ron_str("(batch: (batch_size: 5))").unwrap();

    assert_eq!(config.batch.batch_size, 5);
    assert_eq!(config.batch.window_pause_ms, 8_000);
    assert_eq!(config.retry.max_retries, 3);
    assert_eq!(config.harvest.max_rounds, 50);
}

#[test]
fn config_rejects_inverted_delay_ranges() {
    let err = ExtractorConfig::from_ron_str(
        "(batch: (unit_delay_min_ms: 6000, unit_delay_max_ms: 1000))",
    )
    .unwrap_err();
    assert!(err.to_string().contains("unit_delay_min_ms"));
}
