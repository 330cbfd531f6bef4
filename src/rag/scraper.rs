//! Fetches source pages and reduces them to plain text.

use std::time::Duration;

use regex::Regex;

use crate::core::errors::ApiError;

/// Elements whose content is never visible text.
const RAW_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

pub struct PageScraper {
    client: reqwest::Client,
    whitespace: Regex,
}

impl PageScraper {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("f1gpt-loader/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::internal)?;
        let whitespace = Regex::new(r"\s+").map_err(ApiError::internal)?;
        Ok(Self { client, whitespace })
    }

    /// Page text with markup removed and whitespace runs collapsed.
    pub async fn scrape(&self, url: &str) -> Result<String, ApiError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::upstream("scraper", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::upstream(
                "scraper",
                format!("GET {} returned {}", url, status),
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ApiError::upstream("scraper", e))?;
        Ok(self.clean(&html))
    }

    pub fn clean(&self, html: &str) -> String {
        let text = strip_html_tags(body_of(html));
        self.whitespace.replace_all(&text, " ").trim().to_string()
    }
}

/// Inner markup of `<body>`, or the whole document when there is none.
fn body_of(html: &str) -> &str {
    let lower = html.to_ascii_lowercase();
    let Some(open) = lower.find("<body") else {
        return html;
    };
    let Some(open_end) = lower[open..].find('>').map(|i| open + i + 1) else {
        return html;
    };
    let close = lower[open_end..]
        .find("</body")
        .map(|i| open_end + i)
        .unwrap_or(html.len());
    &html[open_end..close]
}

/// Removes tags, comments and raw-text elements, then decodes common entities.
pub fn strip_html_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];

        if rest.starts_with("<!--") {
            rest = match rest.find("-->") {
                Some(end) => &rest[end + 3..],
                None => "",
            };
            continue;
        }

        if let Some(after) = skip_raw_text_element(rest) {
            rest = after;
            out.push(' ');
            continue;
        }

        rest = match rest.find('>') {
            Some(end) => &rest[end + 1..],
            None => "",
        };
        // tag boundaries separate words
        out.push(' ');
    }
    out.push_str(rest);

    decode_entities(&out)
}

/// If `rest` opens a raw-text element, the input after its closing tag.
fn skip_raw_text_element(rest: &str) -> Option<&str> {
    for tag in RAW_TEXT_ELEMENTS {
        let open = format!("<{}", tag);
        let Some(head) = rest.get(..open.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(&open) {
            continue;
        }
        let boundary = rest[open.len()..].chars().next();
        if !matches!(boundary, Some(c) if c == '>' || c == '/' || c.is_whitespace()) {
            continue;
        }
        // ASCII lowercasing keeps byte offsets aligned with `rest`
        let lower = rest.to_ascii_lowercase();
        let close = format!("</{}", tag);
        return Some(match lower.find(&close) {
            Some(pos) => match lower[pos..].find('>') {
                Some(end) => &rest[pos + end + 1..],
                None => "",
            },
            None => "",
        });
    }
    None
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scraper() -> PageScraper {
        PageScraper::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_html_stripping() {
        let html = r#"
            <html>
            <head><script>var x = 1;</script><title>Ignored</title></head>
            <body>
                <h1>Hello</h1>
                <STYLE type="text/css">p { color: red }</STYLE>
                <p>World &amp; friends</p>
                <!-- hidden -->
            </body>
            </html>
        "#;

        let text = scraper().clean(html);
        assert_eq!(text, "Hello World & friends");
    }

    #[test]
    fn keeps_non_ascii_text_intact() {
        let html = "<body><p>Kimi Räikkönen</p><script>x()</script><p>Pérez</p></body>";
        assert_eq!(scraper().clean(html), "Kimi Räikkönen Pérez");
    }

    #[test]
    fn similar_tag_names_are_not_raw_text() {
        let text = strip_html_tags("<scripture>Genesis</scripture>");
        assert!(text.contains("Genesis"));
    }

    #[test]
    fn unterminated_markup_does_not_panic() {
        assert_eq!(strip_html_tags("text <b"), "text  ");
        assert_eq!(strip_html_tags("a <script>never closed").trim(), "a");
        assert_eq!(strip_html_tags("a <!-- open").trim(), "a");
    }

    #[test]
    fn documents_without_body_are_used_whole() {
        assert_eq!(scraper().clean("<p>Monaco</p>"), "Monaco");
    }
}
