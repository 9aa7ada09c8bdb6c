/// Synchronous client for the **World Bank Indicators API (v2)** and the
/// **World Bank Climate Data API**.
///
/// The data accessors live next to their data types in [`crate::climate`] and
/// [`crate::indicators`]; this module owns the HTTP plumbing they share.
///
/// ### Notes
/// - Every accessor issues plain GET requests. Nothing is cached or retried.
/// - List endpoints are read page by page (`ClientConfig::per_page` rows each).
/// - The Indicators API sometimes serializes numbers as **strings**; we accept both.
///
/// Typical usage:
/// ```no_run
/// # use simple_wbd::Client;
/// let client = Client::default();
/// let temps = client.get_instrumental(["Italy", "Slovenia"])?;
/// assert_eq!(temps.len(), 2);
/// # Ok::<(), simple_wbd::WbdError>(())
/// ```
use crate::config::ClientConfig;
use crate::error::{Result, WbdError};
use crate::models::Meta;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct Client {
    config: ClientConfig,
    http: HttpClient,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(ClientConfig::default()).expect("reqwest client build")
    }
}

// Allow -, _, . unescaped in codes (common for indicator ids)
const SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

pub(crate) fn enc(part: &str) -> String {
    percent_encoding::utf8_percent_encode(part.trim(), SAFE).to_string()
}

pub(crate) fn enc_join<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts.into_iter().map(enc).collect::<Vec<_>>().join(";")
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout) // total request timeout
            .connect_timeout(config.connect_timeout)
            .redirect(Policy::limited(5)) // cap redirects
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|source| WbdError::Http {
                url: String::new(),
                source,
            })?;
        Ok(Self { config, http })
    }

    /// Client configured from `WBD_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET `url` and return the body as text.
    ///
    /// The response (and with it the connection) is dropped before this
    /// returns, on success and on failure alike.
    pub(crate) fn get_text(&self, url: &str) -> Result<String> {
        log::debug!("GET {url}");
        let resp = self.http.get(url).send().map_err(|source| WbdError::Http {
            url: url.to_string(),
            source,
        })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(WbdError::Status {
                url: url.to_string(),
                status,
            });
        }
        resp.text().map_err(|source| WbdError::Http {
            url: url.to_string(),
            source,
        })
    }

    pub(crate) fn get_json(&self, url: &str) -> Result<Value> {
        let body = self.get_text(url)?;
        serde_json::from_str(&body).map_err(|e| WbdError::decode(url, e))
    }

    /// GET every page of an Indicators API list endpoint and decode its rows.
    ///
    /// `path` is appended to the indicator base URL and may carry its own
    /// query parameters. Pages are requested one after another until the
    /// count reported by the first page is reached; any failing page fails
    /// the whole call.
    pub(crate) fn get_wb_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let sep = if path.contains('?') { '&' } else { '?' };
        let page_url = |page: u32| {
            format!(
                "{}/{}{}format=json&per_page={}&page={}",
                self.config.indicator_base_url, path, sep, self.config.per_page, page
            )
        };

        let url = page_url(1);
        let (meta, mut rows) = parse_wb_payload(&url, self.get_json(&url)?)?;
        let pages = meta.map_or(1, |m| m.pages);
        if pages > 1 {
            log::debug!("{url}: reading {pages} pages");
        }
        for page in 2..=pages {
            let url = page_url(page);
            let (_, more) = parse_wb_payload::<T>(&url, self.get_json(&url)?)?;
            if more.is_empty() {
                return Err(WbdError::decode(&url, format!("page {page} of {pages} is empty")));
            }
            rows.extend(more);
        }
        Ok(rows)
    }
}

/// Split an Indicators API payload into its `[Meta, [row, ...]]` parts.
///
/// The API returns `[{"message": [...]}]` on error; that becomes
/// [`WbdError::Api`]. A payload without a row array (no data) yields no rows.
pub fn parse_wb_payload<T: DeserializeOwned>(
    url: &str,
    v: Value,
) -> Result<(Option<Meta>, Vec<T>)> {
    let Value::Array(mut arr) = v else {
        return Err(WbdError::decode(url, "not a top-level array"));
    };
    if arr.is_empty() {
        return Err(WbdError::decode(url, "empty array"));
    }

    // If first element has "message", surface API error.
    if let Some(msg) = arr[0].get("message") {
        return Err(WbdError::Api(api_message(msg)));
    }

    let rows: Vec<T> = match arr.get_mut(1) {
        Some(Value::Null) | None => Vec::new(),
        Some(rows) => serde_json::from_value(rows.take()).map_err(|e| WbdError::decode(url, e))?,
    };
    let meta = serde_json::from_value::<Meta>(arr.swap_remove(0)).ok();
    Ok((meta, rows))
}

fn api_message(msg: &Value) -> String {
    let parts: Vec<String> = msg
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|m| {
                    let key = m.get("key").and_then(Value::as_str).unwrap_or("");
                    let value = m.get("value").and_then(Value::as_str).unwrap_or("");
                    format!("{} {}", key.trim(), value.trim()).trim().to_string()
                })
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if parts.is_empty() {
        msg.to_string()
    } else {
        parts.join("; ")
    }
}
