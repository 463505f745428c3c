//! S3-compatible object store over plain HTTP
//!
//! Addresses objects path-style (`{endpoint}/{bucket}/{key}`) and lists them
//! with ListObjectsV2. Requests are SigV4-signed when credentials are
//! configured and sent anonymously otherwise.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;

use crate::config::RemoteConfig;
use crate::error::{Error, Result};

use super::object_store::ObjectStore;
use super::sigv4::{canonical_query_string, sign_get, uri_encode, AwsCredentials};

/// Object store speaking the S3 REST dialect
pub struct HttpObjectStore {
    client: Client,
    endpoint: Url,
    bucket: String,
    region: String,
    credentials: Option<AwsCredentials>,
}

impl HttpObjectStore {
    /// Create an anonymous store for `bucket` under `endpoint`
    pub fn new(endpoint: &str, bucket: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("Invalid object store endpoint '{}': {}", endpoint, e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(Error::Config(format!("Object store endpoint '{}' cannot be a base URL", endpoint)));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            bucket: bucket.into(),
            region: "us-east-1".to_string(),
            credentials: None,
        })
    }

    /// Sign every request for `region` with `credentials`
    pub fn with_credentials(mut self, region: impl Into<String>, credentials: AwsCredentials) -> Self {
        self.region = region.into();
        self.credentials = Some(credentials);
        self
    }

    /// Create from the remote section of the config
    pub fn from_config(config: &RemoteConfig, timeout: Duration) -> Result<Self> {
        let store = Self::new(&config.endpoint_url(), config.bucket_name.clone(), timeout)?;
        match config.credentials()? {
            Some(credentials) => {
                tracing::info!("Signing requests to bucket {} as {}", config.bucket_name, credentials.access_key_id);
                Ok(store.with_credentials(config.region.clone(), credentials))
            }
            None => {
                tracing::info!("No S3 credentials configured, accessing bucket {} anonymously", config.bucket_name);
                Ok(Self {
                    region: config.region.clone(),
                    ..store
                })
            }
        }
    }

    fn url_with_path(&self, suffix: &str) -> Url {
        let mut url = self.endpoint.clone();
        let path = format!(
            "{}/{}{}",
            self.endpoint.path().trim_end_matches('/'),
            uri_encode(&self.bucket, true),
            suffix
        );
        url.set_path(&path);
        url.set_query(None);
        url
    }

    fn bucket_url(&self) -> Url {
        self.url_with_path("")
    }

    fn object_url(&self, key: &str) -> Url {
        self.url_with_path(&format!("/{}", uri_encode(key, false)))
    }

    async fn send(&self, url: Url, what: &str) -> Result<reqwest::Response> {
        let mut request = self.client.get(url.clone());
        if let Some(credentials) = &self.credentials {
            for (name, value) in sign_get(&url, &self.region, credentials, Utc::now())? {
                request = request.header(name, value);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Transient(format!("Request for {} failed: {}", what, e)))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(classify_status(status, what))
        }
    }
}

/// Map a non-success HTTP status onto the fetch error taxonomy
pub(crate) fn classify_status(status: StatusCode, what: &str) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(what.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::PermissionDenied(format!("Access denied to {}", what))
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            Error::Transient(format!("{} returned HTTP {}", what, status))
        }
        s if s.is_server_error() => Error::Transient(format!("{} returned HTTP {}", what, status)),
        s => Error::Internal(format!("Unexpected HTTP {} for {}", s, what)),
    }
}

/// One page of a ListObjectsV2 response
#[derive(Debug, Default, PartialEq)]
pub(crate) struct ListPage {
    pub keys: Vec<String>,
    pub next_token: Option<String>,
}

/// Parse a ListObjectsV2 XML body
pub(crate) fn parse_list_page(xml: &str) -> Result<ListPage> {
    let mut reader = Reader::from_str(xml);
    let mut page = ListPage::default();
    let mut current: Option<Vec<u8>> = None;
    let mut in_contents = false;
    let mut truncated = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name().as_ref().to_vec();
                if name == b"Contents" {
                    in_contents = true;
                }
                current = Some(name);
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"Contents" {
                    in_contents = false;
                }
                current = None;
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| Error::Transient(format!("Malformed bucket listing: {}", e)))?;
                match current.as_deref() {
                    Some(b"Key") if in_contents => page.keys.push(text.into_owned()),
                    Some(b"IsTruncated") => truncated = text.trim() == "true",
                    Some(b"NextContinuationToken") => page.next_token = Some(text.into_owned()),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(Error::Transient(format!("Malformed bucket listing: {}", e)));
            }
        }
    }

    if !truncated {
        page.next_token = None;
    }
    Ok(page)
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn get_object(&self, key: &str) -> Result<Bytes> {
        let what = format!("s3://{}/{}", self.bucket, key);
        let response = self.send(self.object_url(key), &what).await?;
        response
            .bytes()
            .await
            .map_err(|e| Error::Transient(format!("Download of {} interrupted: {}", what, e)))
    }

    async fn list_objects(&self) -> Result<Vec<String>> {
        let what = format!("bucket {}", self.bucket);
        let mut keys = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut url = self.bucket_url();
            let mut pairs = vec![("list-type".to_string(), "2".to_string())];
            if let Some(ref t) = token {
                pairs.push(("continuation-token".to_string(), t.clone()));
            }
            url.set_query(Some(&canonical_query_string(&pairs)));

            let body = self
                .send(url, &what)
                .await?
                .text()
                .await
                .map_err(|e| Error::Transient(format!("Listing of {} interrupted: {}", what, e)))?;

            let page = parse_list_page(&body)?;
            keys.extend(page.keys);
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        Ok(keys)
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn name(&self) -> &str {
        "s3-http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::sigv4::EMPTY_PAYLOAD_SHA256;
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> HttpObjectStore {
        HttpObjectStore::new(&server.uri(), "docs", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_parse_list_page() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>docs</Name>
  <IsTruncated>true</IsTruncated>
  <Contents><Key>manual.pdf</Key><Size>10</Size></Contents>
  <Contents><Key>notes &amp; more.txt</Key><Size>3</Size></Contents>
  <NextContinuationToken>abc</NextContinuationToken>
</ListBucketResult>"#;

        let page = parse_list_page(xml).unwrap();
        assert_eq!(page.keys, vec!["manual.pdf", "notes & more.txt"]);
        assert_eq!(page.next_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(classify_status(StatusCode::NOT_FOUND, "k"), Error::NotFound(_)));
        assert!(matches!(classify_status(StatusCode::FORBIDDEN, "k"), Error::PermissionDenied(_)));
        assert!(matches!(classify_status(StatusCode::SERVICE_UNAVAILABLE, "k"), Error::Transient(_)));
        assert!(matches!(classify_status(StatusCode::TOO_MANY_REQUESTS, "k"), Error::Transient(_)));
        assert!(matches!(classify_status(StatusCode::BAD_REQUEST, "k"), Error::Internal(_)));
    }

    #[tokio::test]
    async fn test_get_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs/manual.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.5".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let bytes = store(&server).get_object("manual.pdf").await.unwrap();
        assert_eq!(&bytes[..], b"%PDF-1.5");
    }

    #[tokio::test]
    async fn test_missing_and_forbidden_objects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs/missing.pdf"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/docs/secret.pdf"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let store = store(&server);
        assert!(matches!(store.get_object("missing.pdf").await, Err(Error::NotFound(_))));
        assert!(matches!(store.get_object("secret.pdf").await, Err(Error::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_list_follows_continuation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs"))
            .and(query_param("continuation-token", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<ListBucketResult><IsTruncated>false</IsTruncated>\
                 <Contents><Key>b.pdf</Key></Contents></ListBucketResult>",
            ))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/docs"))
            .and(query_param("list-type", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<ListBucketResult><IsTruncated>true</IsTruncated>\
                 <Contents><Key>a.pdf</Key></Contents>\
                 <NextContinuationToken>page2</NextContinuationToken></ListBucketResult>",
            ))
            .with_priority(2)
            .mount(&server)
            .await;

        let keys = store(&server).list_objects().await.unwrap();
        assert_eq!(keys, vec!["a.pdf", "b.pdf"]);
    }

    #[tokio::test]
    async fn test_credentials_sign_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs/private/report-1.pdf"))
            .and(header_exists("authorization"))
            .and(header("x-amz-content-sha256", EMPTY_PAYLOAD_SHA256))
            .and(header_exists("x-amz-date"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let credentials = AwsCredentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: None,
        };
        let store = store(&server).with_credentials("eu-central-1", credentials);
        let bytes = store.get_object("private/report-1.pdf").await.unwrap();
        assert_eq!(&bytes[..], b"%PDF-1.7");

        let requests = server.received_requests().await.unwrap();
        let authorization = requests[0].headers.get("authorization").unwrap().to_str().unwrap();
        assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
        assert!(authorization.contains("/eu-central-1/s3/aws4_request"));
    }

    #[tokio::test]
    async fn test_anonymous_requests_are_unsigned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs/manual.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF".to_vec()))
            .mount(&server)
            .await;

        store(&server).get_object("manual.pdf").await.unwrap();
        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }
}
