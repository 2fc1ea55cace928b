//! `web` tool: fetch a URL and return its content.
//!
//! HTML pages are reduced to readable text; other bodies are returned as-is.
//! Output is capped so one page cannot flood the prompt.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Url};
use serde_json::{json, Value};

use crate::error::{PicoError, Result};

use super::{str_arg, truncate_chars, Tool, ToolContext};

const WEB_USER_AGENT: &str = "picobot/0.1";
const DEFAULT_MAX_CHARS: usize = 20_000;
const MAX_FETCH_BYTES: usize = 1_000_000;

static SCRIPT_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>").ok());
static BLOCK_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)</?(p|div|h[1-6]|li|tr|br)\b[^>]*>").ok());
static TAG_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?is)<[^>]+>").ok());
static TITLE_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok());

/// HTTP GET for http/https URLs.
pub struct WebTool {
    client: Client,
    max_chars: usize,
}

impl WebTool {
    pub fn new() -> Self {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(30))
            .user_agent(WEB_USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }

    /// Cap returned text at `max_chars` characters.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars.max(1);
        self
    }
}

impl Default for WebTool {
    fn default() -> Self {
        Self::new()
    }
}

fn replace(re: &Lazy<Option<Regex>>, input: &str, with: &str) -> String {
    match re.as_ref() {
        Some(re) => re.replace_all(input, with).into_owned(),
        None => input.to_string(),
    }
}

fn decode_entities(input: &str) -> String {
    input
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Readable text of an HTML document, title first when present.
fn html_to_text(html: &str) -> String {
    let title = TITLE_RE
        .as_ref()
        .and_then(|re| re.captures(html))
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(m.as_str()).trim().to_string())
        .unwrap_or_default();

    let body = replace(&SCRIPT_RE, html, " ");
    let body = replace(&BLOCK_RE, &body, "\n");
    let body = decode_entities(&replace(&TAG_RE, &body, " "));
    let lines: Vec<String> = body
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect();
    let text = lines.join("\n");

    if title.is_empty() {
        text
    } else {
        format!("# {}\n\n{}", title, text)
    }
}

/// Truncate on a character boundary.
async fn read_body_limited(mut response: reqwest::Response, max_bytes: usize) -> Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| PicoError::Tool(format!("web: failed reading body: {}", e)))?
    {
        let remaining = max_bytes.saturating_sub(buf.len());
        buf.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
        if buf.len() >= max_bytes {
            break;
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[async_trait]
impl Tool for WebTool {
    fn name(&self) -> &str {
        "web"
    }

    fn description(&self) -> &str {
        "Fetch a web page (http/https) and return its text content"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "http/https URL to fetch"}
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let url = str_arg(&args, "url")
            .ok_or_else(|| PicoError::Tool("web: 'url' argument required".into()))?;
        let parsed = Url::parse(url)
            .map_err(|e| PicoError::Tool(format!("web: invalid URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PicoError::Tool("web: only http/https URLs are allowed".into()));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| PicoError::Tool(format!("web: request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PicoError::Tool(format!("web: HTTP error {}", status)));
        }
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(false);

        let body = read_body_limited(response, MAX_FETCH_BYTES).await?;
        let text = if is_html { html_to_text(&body) } else { body };
        Ok(truncate_chars(text, self.max_chars))
    }
}
