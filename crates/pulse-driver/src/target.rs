use pulse_common::{PulseError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde_json::Value;

/// Endpoint, payload and headers shared by every request of a run.
#[derive(Debug, Clone)]
pub struct TargetDescriptor {
    url: Url,
    payload: Value,
    headers: HeaderMap,
}

impl TargetDescriptor {
    pub fn new(url: &str, token: &str, payload: Value) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| PulseError::Config(format!("invalid url {}: {}", url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PulseError::Config(format!("unsupported url scheme {}", url.scheme())));
        }
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| PulseError::Config("token contains characters not valid in a header".into()))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        Ok(Self { url, payload, headers })
    }

    pub fn default_payload() -> Value {
        serde_json::json!({"user_input": "hello", "history": []})
    }

    pub fn url(&self) -> &Url { &self.url }
    pub fn payload(&self) -> &Value { &self.payload }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_is_sensitive() {
        let t = TargetDescriptor::new("https://example.com/", "abc", TargetDescriptor::default_payload()).unwrap();
        let auth = t.headers().get(AUTHORIZATION).unwrap();
        assert_eq!(auth.to_str().unwrap(), "Bearer abc");
        assert!(auth.is_sensitive());
        assert!(!format!("{:?}", t).contains("abc"));
    }

    #[test]
    fn rejects_bad_urls() {
        let p = TargetDescriptor::default_payload();
        assert!(TargetDescriptor::new("not a url", "abc", p.clone()).is_err());
        assert!(TargetDescriptor::new("ftp://example.com/", "abc", p).is_err());
    }
}
