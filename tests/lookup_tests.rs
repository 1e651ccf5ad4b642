//! Integration tests for the lookup fetcher
//!
//! These tests point the fetcher at a wiremock server and check the signed
//! request it sends and how it classifies responses.

use asin_ripple::config::LookupConfig;
use asin_ripple::crawler::{Fetcher, InvalidReason, Lookup, LookupResult};
use asin_ripple::signing::{HmacSha256Signer, Signer, SigningRequest};
use asin_ripple::CrawlError;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn lookup_config(server: &MockServer) -> LookupConfig {
    LookupConfig {
        endpoint: format!("{}/onca/xml", server.uri()),
        access_key: "AKIAEXAMPLE".to_string(),
        secret_key: "1234567890".to_string(),
        associate_tag: "shop-20".to_string(),
        condition: "New".to_string(),
        id_type: "ASIN".to_string(),
        operation: "ItemLookup".to_string(),
        response_group: "Large".to_string(),
    }
}

fn fetcher(server: &MockServer) -> Fetcher {
    let config = lookup_config(server);
    let signer = Arc::new(HmacSha256Signer::new(&config.secret_key));
    Fetcher::new(&config, signer).expect("fetcher should build")
}

fn lookup_body(is_valid: &str) -> String {
    format!(
        r#"<?xml version="1.0" ?>
<ItemLookupResponse xmlns="http://webservices.amazon.com/AWSECommerceService/2011-08-01">
  <Items>
    <Request><IsValid>{}</IsValid></Request>
    <Item>
      <ASIN>B000123</ASIN>
      <DetailPageURL>https://www.example.com/dp/B000123</DetailPageURL>
      <SalesRank>4521</SalesRank>
      <ItemAttributes><Brand>Acme</Brand><Title>Desk Lamp</Title></ItemAttributes>
      <SimilarProducts>
        <SimilarProduct><ASIN>B000200</ASIN><Title>Floor Lamp</Title></SimilarProduct>
        <SimilarProduct><ASIN>B000201</ASIN><Title>Table Lamp</Title></SimilarProduct>
      </SimilarProducts>
      <Accessories>
        <Accessory><ASIN>B000300</ASIN><Title>Bulb</Title></Accessory>
      </Accessories>
    </Item>
  </Items>
</ItemLookupResponse>"#,
        is_valid
    )
}

#[tokio::test]
async fn test_valid_lookup_returns_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/onca/xml"))
        .and(query_param("ItemId", "B000123"))
        .and(query_param("Operation", "ItemLookup"))
        .and(query_param("AssociateTag", "shop-20"))
        .respond_with(ResponseTemplate::new(200).set_body_string(lookup_body("True")))
        .expect(1)
        .mount(&server)
        .await;

    let result = fetcher(&server).fetch("B000123").await.unwrap();

    let record = match result {
        LookupResult::Valid(record) => record,
        other => panic!("expected a valid lookup, got {:?}", other),
    };
    let product = asin_ripple::CatalogProduct::from_record(&record).unwrap();
    assert_eq!(product.identifier, "B000123");
    assert_eq!(product.title.as_deref(), Some("Desk Lamp"));
    assert_eq!(product.brand.as_deref(), Some("Acme"));
    assert_eq!(product.sales_rank, Some(4521));
    assert_eq!(product.similar, vec!["B000200", "B000201"]);
    assert_eq!(product.accessories, vec!["B000300"]);
}

#[tokio::test]
async fn test_request_is_signed_over_canonical_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(lookup_body("True")))
        .mount(&server)
        .await;

    let config = lookup_config(&server);
    fetcher(&server).fetch("B000123").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let url = &requests[0].url;
    let query = url.query().unwrap();

    // Signature comes last, after the parameters it covers
    let (canonical, signature) = query.split_once("&Signature=").unwrap();
    assert!(canonical.starts_with("AWSAccessKeyId=AKIAEXAMPLE&AssociateTag=shop-20&"));

    let keys: Vec<&str> = canonical
        .split('&')
        .map(|pair| pair.split('=').next().unwrap())
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    // The recorded URL carries no port, so take the host from the server itself
    let host = server.address().to_string();
    let expected = HmacSha256Signer::new(&config.secret_key).sign(&SigningRequest {
        method: "GET",
        host: &host,
        path: "/onca/xml",
        canonical_query: canonical,
    });
    assert_eq!(urlencoding::decode(signature).unwrap(), expected);
}

#[tokio::test]
async fn test_validity_flag_false_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(lookup_body("False")))
        .mount(&server)
        .await;

    let result = fetcher(&server).fetch("B000123").await.unwrap();

    assert_eq!(
        result,
        LookupResult::Invalid(InvalidReason::NotValid("False".to_string()))
    );
}

#[tokio::test]
async fn test_malformed_body_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<ItemLookupResponse><Items>"))
        .mount(&server)
        .await;

    let result = fetcher(&server).fetch("B000123").await.unwrap();

    assert!(matches!(
        result,
        LookupResult::Invalid(InvalidReason::Malformed(_))
    ));
}

#[tokio::test]
async fn test_server_error_is_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = fetcher(&server).fetch("B000123").await;

    match result {
        Err(err @ CrawlError::FetchStatus { status: 503, .. }) => assert!(!err.is_fatal()),
        other => panic!("expected HTTP 503, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_endpoint_is_fetch_error() {
    let server = MockServer::start().await;
    let mut config = lookup_config(&server);

    // Grab a free port and release it so nothing is listening there
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    config.endpoint = format!("http://127.0.0.1:{}/onca/xml", port);

    let fetcher = Fetcher::new(&config, Arc::new(HmacSha256Signer::new("secret"))).unwrap();
    let result = fetcher.fetch("B000123").await;

    match result {
        Err(err @ CrawlError::Fetch { .. }) => assert!(!err.is_fatal()),
        other => panic!("expected a connection error, got {:?}", other),
    }
}
