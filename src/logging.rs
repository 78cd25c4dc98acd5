//! Log-safe rendering of credentials and upstream endpoints.
//!
//! API keys and customer-specific endpoints must never reach logs or error
//! bodies verbatim; everything printed goes through these helpers.

use std::fmt;
use url::Url;

/// Redacted API key: shows the first 8 characters followed by `***`
#[derive(Clone, Debug)]
pub struct SensitiveApiKey<'a> {
    inner: &'a str,
}

impl<'a> SensitiveApiKey<'a> {
    /// ```
    /// use image_gateway::logging::SensitiveApiKey;
    ///
    /// let sanitized = SensitiveApiKey::new("sk-proj-abcdef123456");
    /// assert_eq!(format!("{}", sanitized), "sk-proj-***");
    /// ```
    pub fn new(key: &'a str) -> Self {
        Self { inner: key }
    }
}

impl<'a> fmt::Display for SensitiveApiKey<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible_len = 8.min(self.inner.len());
        if self.inner.len() <= visible_len || !self.inner.is_char_boundary(visible_len) {
            // Too short to show any of it
            write!(f, "***")
        } else {
            write!(f, "{}***", &self.inner[..visible_len])
        }
    }
}

/// Mask an upstream endpoint before it is shown to a caller.
///
/// Keeps scheme, port and the public suffix of the host; the first host label
/// (usually the Azure resource or proxy tenant name) keeps only its first and
/// last two characters. Only the first path segment survives.
///
/// ```
/// use image_gateway::logging::desensitize_url;
///
/// assert_eq!(
///     desensitize_url("https://my-resource.openai.azure.com/openai/deployments/dalle3"),
///     "https://my***ce.openai.azure.com/openai"
/// );
/// ```
pub fn desensitize_url(raw: &str) -> String {
    let Ok(url) = Url::parse(raw) else {
        return "***".to_string();
    };
    let Some(host) = url.host_str() else {
        return "***".to_string();
    };

    let (first, rest) = match host.split_once('.') {
        Some((first, rest)) => (first, Some(rest)),
        None => (host, None),
    };
    let masked_first = mask_label(first);
    let masked_host = match rest {
        Some(rest) => format!("{}.{}", masked_first, rest),
        None => masked_first,
    };

    let mut out = format!("{}://{}", url.scheme(), masked_host);
    if let Some(port) = url.port() {
        out.push_str(&format!(":{}", port));
    }
    if let Some(segment) = url
        .path_segments()
        .and_then(|mut segments| segments.next())
        .filter(|s| !s.is_empty())
    {
        out.push('/');
        out.push_str(segment);
    }
    out
}

fn mask_label(label: &str) -> String {
    let chars: Vec<char> = label.chars().collect();
    if chars.len() <= 4 {
        return "***".to_string();
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}
