use crate::{CrawlError, Transport};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use std::time::Duration;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36";

/// A request as issued by the crawler, independent of the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// Url-encoded form body, for POST requests.
    pub form: Option<Vec<(String, String)>>,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            form: None,
        }
    }

    pub fn post_form(url: Url, form: Vec<(String, String)>) -> Self {
        Self {
            method: Method::POST,
            url,
            headers: HeaderMap::new(),
            form: Some(form),
        }
    }

    pub fn with_header(mut self, name: header::HeaderName, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    /// Value of a form field, if this request carries a form.
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .as_ref()?
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    pub fn content_type(&self) -> &str {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    pub fn is_json(&self) -> bool {
        let ct = self.content_type().to_ascii_lowercase();
        ct.contains("application/json") || ct.contains("+json") || ct.contains("text/json")
    }
}

/// [`Transport`] backed by a `reqwest` client.
///
/// The client's own cookie jar stays disabled; session cookies are replayed
/// by the crawler.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, CrawlError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }

        let resp = builder.send().await?.error_for_status()?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(content_type: &str) -> HttpResponse {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(content_type).unwrap(),
        );
        HttpResponse {
            status: StatusCode::OK,
            headers,
            body: String::new(),
        }
    }

    #[test]
    fn json_content_types_are_recognised() {
        assert!(response("application/json; charset=utf-8").is_json());
        assert!(response("application/problem+json").is_json());
        assert!(!response("text/html; charset=UTF-8").is_json());
    }

    #[test]
    fn form_values_are_looked_up_by_name() {
        let url = Url::parse("https://cinema.test/reservation/").unwrap();
        let req = HttpRequest::post_form(url, vec![("film".into(), "42".into())]);
        assert_eq!(req.form_value("film"), Some("42"));
        assert_eq!(req.form_value("day"), None);
        assert_eq!(req.method, Method::POST);
    }
}
