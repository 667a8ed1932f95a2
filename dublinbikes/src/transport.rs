//! The HTTP seam between [`crate::TripClient`] and the network.
//!
//! The client only ever talks to a [`Transport`]; production code uses
//! [`ReqwestTransport`], tests plug in a scripted fake.

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Method, StatusCode};
use std::time::Duration;
use url::Url;

pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        HttpRequest {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attaches an already-serialized JSON body and sets the content type.
    pub fn json_body(mut self, body: Vec<u8>) -> Self {
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(body);
        self
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

pub trait Transport {
    /// Sends one request and returns the response as-is. Redirects must not be followed.
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        // the login step needs the raw 302 to read the authorization code out of Location
        let http_client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(Policy::none())
            .build()?;
        Ok(ReqwestTransport { http_client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut req = self
            .http_client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            req = req.body(body);
        }
        let res = req.send()?;
        let status = res.status();
        let headers = res.headers().clone();
        let body = res.bytes()?.to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[test]
fn test_request_builder() {
    let url = Url::parse("https://api.example.test/auth/access_tokens").unwrap();
    let req = HttpRequest::new(Method::POST, url).json_body(b"{}".to_vec());
    assert_eq!(req.method, Method::POST);
    assert_eq!(
        req.headers.get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(req.body.as_deref(), Some(&b"{}"[..]));

    let url = Url::parse("https://api.example.test/").unwrap();
    let req = HttpRequest::new(Method::GET, url)
        .header(header::ACCEPT, HeaderValue::from_static("text/plain"));
    assert!(req.body.is_none());
    assert_eq!(req.headers.get(header::ACCEPT).unwrap(), "text/plain");
}
