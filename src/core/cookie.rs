//! Session cookie parameters handed to the host's cookie setter.

use std::fmt;

use serde::{Deserialize, Serialize};

/// SameSite policy for the session cookie.
///
/// Deserializes from any casing of the policy name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String")]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    /// Parse a policy name, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

impl TryFrom<String> for SameSite {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| {
            format!("invalid SameSite policy '{}': expected strict, lax or none", value)
        })
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cookie parameters for the session cookie.
///
/// `lifetime_secs == 0` means a browser-session cookie (no `Max-Age`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieParams {
    /// Cookie lifetime in seconds; 0 for a browser-session cookie.
    pub lifetime_secs: u64,
    /// Cookie path.
    pub path: String,
    /// Cookie domain; host-only when unset.
    pub domain: Option<String>,
    /// Only send over HTTPS.
    pub secure: bool,
    /// Hide from client-side scripts.
    pub http_only: bool,
    /// SameSite policy.
    pub same_site: SameSite,
}

impl Default for CookieParams {
    fn default() -> Self {
        Self {
            lifetime_secs: 0,
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: true,
            same_site: SameSite::Lax,
        }
    }
}

impl CookieParams {
    /// Render the attribute part of a `Set-Cookie` header (everything after
    /// `name=value`).
    pub fn set_cookie_attributes(&self) -> String {
        let mut attrs = Vec::new();

        if self.lifetime_secs > 0 {
            attrs.push(format!("Max-Age={}", self.lifetime_secs));
        }
        attrs.push(format!("Path={}", self.path));
        if let Some(domain) = &self.domain {
            attrs.push(format!("Domain={}", domain));
        }
        // Browsers drop SameSite=None cookies that are not Secure
        if self.secure || self.same_site == SameSite::None {
            attrs.push("Secure".to_string());
        }
        if self.http_only {
            attrs.push("HttpOnly".to_string());
        }
        attrs.push(format!("SameSite={}", self.same_site));

        attrs.join("; ")
    }

    /// Render a full `Set-Cookie` header value for the given cookie.
    pub fn set_cookie_header(&self, name: &str, value: &str) -> String {
        format!("{}={}; {}", name, value, self.set_cookie_attributes())
    }
}
