use serde_json::json;
use verdict_client::case::CaseParser;
use verdict_client::{ExtractionConfig, LinkQuery};

use crate::integration::common::{http_extractor, spawn_server};

#[tokio::test]
async fn test_links_resolve_against_page_url() -> anyhow::Result<()> {
    let server = spawn_server().await;
    let (extractor, _) = http_extractor();

    let links = extractor.links(&server.url("/page"), &LinkQuery::default()).await?;
    let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();

    assert_eq!(
        urls,
        vec![
            "https://other.org/about".to_string(),
            server.url("/opinions/1"),
            server.url("/opinions/2"),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_structured_data_from_live_page() -> anyhow::Result<()> {
    let server = spawn_server().await;
    let (extractor, reporter) = http_extractor();
    let config = ExtractionConfig::from_value(json!({
        "heading": {"type": "text", "selector": "h1"},
        "paragraphs": {"type": "elements", "selector": "p"},
        "first_link": {"type": "attribute", "selector": "a", "attribute": "href"}
    }))?;

    let outcome = extractor
        .extract_structured_data(&server.url("/page"), &config)
        .await?;

    assert_eq!(outcome.get("heading"), Some(&json!("Opinions")));
    assert_eq!(outcome.get("paragraphs").and_then(|p| p.as_array()).map(Vec::len), Some(1));
    assert_eq!(outcome.get("first_link"), Some(&json!("https://other.org/about")));
    assert_eq!(reporter.count("DocumentParsed"), 1);
    Ok(())
}

#[tokio::test]
async fn test_exhausted_fetch_yields_error_object() -> anyhow::Result<()> {
    let server = spawn_server().await;
    let (extractor, _) = http_extractor();
    let url = server.url("/unavailable");

    let outcome = extractor
        .extract_structured_data(&url, &ExtractionConfig::new())
        .await?;

    assert_eq!(
        serde_json::to_value(&outcome)?,
        json!({"error": "Failed to fetch URL", "url": url})
    );
    Ok(())
}

#[tokio::test]
async fn test_year_index_over_http() -> anyhow::Result<()> {
    let server = spawn_server().await;
    let (extractor, _) = http_extractor();
    let parser = CaseParser::new(extractor);

    let listings = parser
        .parse_year_index(&server.url("/years/2019"), 2019)
        .await?;

    let dockets: Vec<&str> = listings.iter().map(|l| l.docket.as_str()).collect();
    assert_eq!(dockets, vec!["18-1234", "18-99"]);
    assert_eq!(listings[0].case_url, server.url("/us-supreme-court/18-1234.html"));
    Ok(())
}
