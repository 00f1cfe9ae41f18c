/// Submission client: builds the outbound payload and posts it to the
/// configured sink.
///
/// The sink is opaque: the response is never read, so a request that leaves
/// without a transport error counts as delivered. Nothing stronger can be
/// claimed about what the remote end did with it.
use chrono::{SecondsFormat, Utc};
use log::{info, warn};
#[cfg(not(target_arch = "wasm32"))]
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use url::Url;

use crate::schema::draft::{fields, Draft};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// Fetch options for browser delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Opaque request: no CORS preflight, unreadable response.
    pub no_cors: bool,
    /// Lets the request finish after the page that sent it unloads.
    pub keepalive: bool,
}

/// Navigating to another step right after submitting must not cancel
/// the request.
pub const BROWSER_FETCH: FetchOptions = FetchOptions {
    no_cors: true,
    keepalive: true,
};

/// Draft fields sent to the sink, after `created_at`. Generated scenes are
/// deliberately absent: they stay with the user.
pub const PAYLOAD_FIELDS: [&str; 13] = [
    fields::NAME,
    fields::ALIAS,
    fields::DOB,
    fields::ROLE,
    fields::SET,
    fields::TAGS,
    fields::BACKSTORY,
    fields::TRAITS,
    fields::LIMITS,
    fields::CONNECTIONS,
    fields::GOALS,
    fields::SECRET,
    fields::WISHES,
];

/// Flat, ordered key/value pairs sent to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payload {
    pub entries: Vec<(&'static str, String)>,
}

impl Payload {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `application/x-www-form-urlencoded` body.
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.entries.iter().map(|(k, v)| (*k, v.as_str())))
            .finish()
    }
}

/// Payload stamped with the current time.
pub fn build_payload(draft: &Draft) -> Payload {
    build_payload_at(
        draft,
        &Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

/// Payload with an explicit `created_at` stamp.
pub fn build_payload_at(draft: &Draft, created_at: &str) -> Payload {
    let mut entries = Vec::with_capacity(PAYLOAD_FIELDS.len() + 1);
    entries.push(("created_at", created_at.to_string()));
    for key in PAYLOAD_FIELDS {
        entries.push((key, draft.field(key).to_string()));
    }
    Payload { entries }
}

/// What the caller can know about a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Request left without a transport error.
    Dispatched,
    /// No endpoint configured; nothing was sent.
    NoEndpoint,
    /// The request could not be built or sent.
    TransportError(String),
}

impl SubmitOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Dispatched)
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Dispatched => None,
            Self::NoEndpoint => Some("no-endpoint"),
            Self::TransportError(_) => Some("transport-error"),
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::TransportError(detail) => Some(detail),
            _ => None,
        }
    }
}

/// Posts payloads. Native builds go through `reqwest`; the browser build
/// calls `fetch` directly with [`BROWSER_FETCH`].
#[derive(Debug, Clone, Default)]
pub struct SubmissionClient {
    #[cfg(not(target_arch = "wasm32"))]
    http: reqwest::Client,
}

impl SubmissionClient {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// POST the payload once. The response body and status are ignored.
    pub async fn submit(&self, endpoint: &str, payload: &Payload) -> SubmitOutcome {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return SubmitOutcome::NoEndpoint;
        }

        let url = match Url::parse(endpoint) {
            Ok(url) => url,
            Err(e) => {
                warn!("submission endpoint rejected: {e}");
                return SubmitOutcome::TransportError(format!("invalid endpoint: {e}"));
            }
        };

        match self.send(url, payload.encode()).await {
            Ok(()) => {
                info!("submission dispatched ({} fields)", payload.entries.len());
                SubmitOutcome::Dispatched
            }
            Err(detail) => {
                warn!("submission failed: {detail}");
                SubmitOutcome::TransportError(detail)
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    async fn send(&self, url: Url, body: String) -> Result<(), String> {
        self.http
            .post(url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    #[cfg(target_arch = "wasm32")]
    async fn send(&self, url: Url, body: String) -> Result<(), String> {
        use wasm_bindgen::JsValue;

        let js_detail = |e: JsValue| format!("{e:?}");
        let window = web_sys::window().ok_or("no window to fetch from")?;

        let headers = web_sys::Headers::new().map_err(js_detail)?;
        headers
            .set("Content-Type", FORM_CONTENT_TYPE)
            .map_err(js_detail)?;

        let init = web_sys::RequestInit::new();
        init.set_method("POST");
        if BROWSER_FETCH.no_cors {
            init.set_mode(web_sys::RequestMode::NoCors);
        }
        init.set_keepalive(BROWSER_FETCH.keepalive);
        init.set_headers(&headers);
        init.set_body(&JsValue::from_str(&body));

        let promise = window.fetch_with_str_and_init(url.as_str(), &init);
        wasm_bindgen_futures::JsFuture::from(promise)
            .await
            .map(|_| ())
            .map_err(js_detail)
    }

    /// Send on a background task so the request outlives the caller.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn dispatch(
        &self,
        endpoint: String,
        payload: Payload,
    ) -> tokio::task::JoinHandle<SubmitOutcome> {
        let client = self.clone();
        tokio::spawn(async move { client.submit(&endpoint, &payload).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> Draft {
        [
            ("name", " Mona "),
            ("role", "Consigliere"),
            ("set", "Davis/Liaison"),
            ("wishes", "переговоры & давление"),
            ("scene_1", "generated text"),
            ("scene_ids", "S001,S003"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn payload_has_fixed_keys_and_no_scenes() {
        let payload = build_payload_at(&draft(), "2026-01-01T00:00:00.000Z");
        let keys: Vec<&str> = payload.entries.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys[0], "created_at");
        assert_eq!(&keys[1..], &PAYLOAD_FIELDS[..]);
        assert_eq!(payload.get("name"), Some("Mona"));
        assert_eq!(payload.get("alias"), Some(""));
        assert_eq!(payload.get("scene_1"), None);
        assert_eq!(payload.get("scene_ids"), None);
    }

    #[test]
    fn payload_encodes_as_form() {
        let payload = build_payload_at(&draft(), "2026-01-01T00:00:00.000Z");
        let body = payload.encode();
        assert!(body.starts_with("created_at=2026-01-01T00%3A00%3A00.000Z&name=Mona&alias=&"));
        assert!(body.contains("set=Davis%2FLiaison"));
        assert!(body.contains("wishes=%D0%BF"));
        assert!(body.contains("+%26+"));
    }

    #[test]
    fn created_at_is_rfc3339() {
        let payload = build_payload(&Draft::new());
        let stamp = payload.get("created_at").unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
        assert!(stamp.ends_with('Z'));
    }

    #[test]
    fn browser_fetch_survives_unload() {
        assert!(BROWSER_FETCH.keepalive);
        assert!(BROWSER_FETCH.no_cors);
    }

    #[test]
    fn outcome_reasons() {
        assert!(SubmitOutcome::Dispatched.is_ok());
        assert_eq!(SubmitOutcome::NoEndpoint.reason(), Some("no-endpoint"));
        let err = SubmitOutcome::TransportError("refused".to_string());
        assert_eq!(err.reason(), Some("transport-error"));
        assert_eq!(err.detail(), Some("refused"));
    }

    #[tokio::test]
    async fn empty_endpoint_sends_nothing() {
        let client = SubmissionClient::new();
        let payload = build_payload(&draft());
        assert_eq!(client.submit("   ", &payload).await, SubmitOutcome::NoEndpoint);
    }

    #[tokio::test]
    async fn malformed_endpoint_is_a_transport_error() {
        let client = SubmissionClient::new();
        let payload = build_payload(&draft());
        let outcome = client.submit("not a url", &payload).await;
        assert_eq!(outcome.reason(), Some("transport-error"));
    }

    #[tokio::test]
    async fn dispatch_reports_through_handle() {
        let client = SubmissionClient::new();
        let handle = client.dispatch(String::new(), build_payload(&draft()));
        assert_eq!(handle.await.unwrap(), SubmitOutcome::NoEndpoint);
    }
}
