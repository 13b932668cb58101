//! web_fetch tool: Fetch a URL and extract text content

use async_trait::async_trait;
use relay_application::{ToolError, ToolPort};
use relay_domain::ToolDefinition;
use serde_json::{Value, json};

/// Tool name constant
pub const WEB_FETCH: &str = "web_fetch";

/// Maximum response body size (5 MB)
const MAX_BODY_SIZE: usize = 5 * 1024 * 1024;

/// Default max output text size (50 KB)
const DEFAULT_MAX_TEXT: usize = 50 * 1024;

/// Fetches a web page and hands its readable text to the model
pub struct WebFetchTool {
    client: reqwest::Client,
    definition: ToolDefinition,
}

impl WebFetchTool {
    pub fn new(client: reqwest::Client) -> Self {
        let definition = ToolDefinition::new(
            WEB_FETCH,
            "Fetch a web page and extract its text content. Returns the readable text from the page.",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to fetch"
                },
                "max_length": {
                    "type": "number",
                    "description": "Maximum length of extracted text in bytes (default: 51200)"
                }
            },
            "required": ["url"]
        }));
        Self { client, definition }
    }
}

impl Default for WebFetchTool {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl ToolPort for WebFetchTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let url = arguments["url"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("url is required".to_string()))?;
        let max_length = arguments["max_length"]
            .as_u64()
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_MAX_TEXT);

        let response = self
            .client
            .get(url)
            .header("User-Agent", "PersonaRelay/0.4 (Agent Tool)")
            .send()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to fetch URL: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::ExecutionFailed(format!(
                "HTTP error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let content_length = response.content_length().unwrap_or(0);
        if content_length > MAX_BODY_SIZE as u64 {
            return Err(ToolError::ExecutionFailed(format!(
                "Response too large: {} bytes (max: {} bytes)",
                content_length, MAX_BODY_SIZE
            )));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to read response body: {}", e)))?;
        if body.len() > MAX_BODY_SIZE {
            return Err(ToolError::ExecutionFailed(format!(
                "Response too large: {} bytes",
                body.len()
            )));
        }

        let body_str = String::from_utf8_lossy(&body);
        let text = if content_type.contains("text/html") || content_type.contains("application/xhtml")
        {
            html_to_text(&body_str)
        } else {
            // For non-HTML content (JSON, plain text, etc.), return as-is
            body_str.to_string()
        };

        let (output, truncated) = if text.len() > max_length {
            let mut cut = max_length;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            (
                format!(
                    "{}\n\n[... truncated at {} bytes, total: {} bytes]",
                    &text[..cut],
                    max_length,
                    text.len()
                ),
                true,
            )
        } else {
            (text.clone(), false)
        };

        Ok(format!(
            "## Fetched: {}\n\nStatus: {} | Content-Type: {} | Size: {} bytes{}\n\n{}",
            url,
            status.as_u16(),
            content_type,
            text.len(),
            if truncated { " (truncated)" } else { "" },
            output,
        ))
    }
}

/// Extract readable text from HTML, stripping tags, scripts, and styles
pub fn html_to_text(html: &str) -> String {
    use scraper::{Html, Selector};

    let document = Html::parse_document(html);

    // Tags whose entire subtree should be ignored
    let skip_tags = ["script", "style", "noscript", "svg"];

    let body_selector = Selector::parse("body").unwrap();
    let root = document.select(&body_selector).next();

    let parts = if let Some(body) = root {
        collect_element_text(body, &skip_tags)
    } else {
        collect_element_text(document.root_element(), &skip_tags)
    };

    clean_whitespace(&parts.join(" "))
}

/// Recursively collect text from an element, skipping elements matching skip_tags
fn collect_element_text(element: scraper::ElementRef, skip_tags: &[&str]) -> Vec<String> {
    if skip_tags.contains(&element.value().name()) {
        return Vec::new();
    }

    let mut parts = Vec::new();
    for child in element.children() {
        match child.value() {
            scraper::Node::Text(text) => {
                let t = text.trim();
                if !t.is_empty() {
                    parts.push(t.to_string());
                }
            }
            scraper::Node::Element(_) => {
                if let Some(child_el) = scraper::ElementRef::wrap(child) {
                    parts.extend(collect_element_text(child_el, skip_tags));
                }
            }
            _ => {}
        }
    }
    parts
}

/// Clean up excessive whitespace
fn clean_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_was_whitespace = false;
    let mut newline_count = 0;

    for ch in text.chars() {
        if ch == '\n' {
            newline_count += 1;
            if newline_count <= 2 {
                result.push('\n');
            }
            prev_was_whitespace = true;
        } else if ch.is_whitespace() {
            if !prev_was_whitespace {
                result.push(' ');
            }
            prev_was_whitespace = true;
            newline_count = 0;
        } else {
            result.push(ch);
            prev_was_whitespace = false;
            newline_count = 0;
        }
    }

    result.trim().to_string()
}
