//! GitHub OAuth handshake: authorize-URL construction, code exchange and
//! profile retrieval with a verified-primary-email fallback.

use serde::Deserialize;

use crate::error::ApiError;

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USER_URL: &str = "https://api.github.com/user";
const EMAILS_URL: &str = "https://api.github.com/user/emails";

const SCOPES: &str = "user:email read:user";

/// A GitHub user profile.
#[derive(Clone, Debug, Deserialize)]
pub struct GitHubUser {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmailEntry {
    email: String,
    primary: bool,
    verified: bool,
}

/// GitHub OAuth client.
#[derive(Clone)]
pub struct GitHubClient {
    client_id: String,
    client_secret: String,
    callback_url: String,
    http: reqwest::Client,
}

impl GitHubClient {
    pub fn new(client_id: &str, client_secret: &str, callback_url: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            callback_url: callback_url.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Authorization URL the caller is redirected to.
    pub fn auth_url(&self, state: &str) -> String {
        format!(
            "{AUTHORIZE_URL}?client_id={}&redirect_uri={}&scope={}&state={}",
            urlencode(&self.client_id),
            urlencode(&self.callback_url),
            urlencode(SCOPES),
            urlencode(state),
        )
    }

    /// Exchange an authorization code for a provider access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, ApiError> {
        let resp: AccessTokenResponse = self
            .http
            .post(TOKEN_URL)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.callback_url.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;

        resp.access_token.ok_or_else(|| {
            ApiError::internal(format!(
                "github token exchange failed: {}",
                resp.error_description.unwrap_or_default()
            ))
        })
    }

    /// Fetch the authenticated user's profile. Falls back to the emails
    /// endpoint when the profile carries no public email.
    pub async fn fetch_user(&self, access_token: &str) -> Result<GitHubUser, ApiError> {
        let resp = self
            .http
            .get(USER_URL)
            .bearer_auth(access_token)
            .header("User-Agent", "nexo-cloud")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ApiError::internal(format!(
                "github api returned status {}",
                resp.status()
            )));
        }

        let mut user: GitHubUser = resp.json().await?;

        if user.email.as_deref().unwrap_or("").is_empty() {
            if let Ok(email) = self.fetch_primary_email(access_token).await {
                user.email = Some(email);
            }
        }

        Ok(user)
    }

    async fn fetch_primary_email(&self, access_token: &str) -> Result<String, ApiError> {
        let emails: Vec<EmailEntry> = self
            .http
            .get(EMAILS_URL)
            .bearer_auth(access_token)
            .header("User-Agent", "nexo-cloud")
            .send()
            .await?
            .json()
            .await?;

        if let Some(e) = emails.iter().find(|e| e.primary && e.verified) {
            return Ok(e.email.clone());
        }
        if let Some(e) = emails.iter().find(|e| e.verified) {
            return Ok(e.email.clone());
        }
        emails
            .first()
            .map(|e| e.email.clone())
            .ok_or_else(|| ApiError::internal("no email found"))
    }
}

fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_url_carries_scopes_and_state() {
        let client = GitHubClient::new("cid", "secret", "http://localhost:3000/api/auth/callback");
        let url = client.auth_url("abcd1234");
        assert!(url.starts_with(AUTHORIZE_URL));
        assert!(url.contains("client_id=cid"));
        assert!(url.contains("state=abcd1234"));
        assert!(url.contains("scope=user%3Aemail%20read%3Auser"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fapi%2Fauth%2Fcallback"));
    }

    #[test]
    fn urlencode_passes_unreserved() {
        assert_eq!(urlencode("abc-_.~123"), "abc-_.~123");
        assert_eq!(urlencode("a b"), "a%20b");
        assert_eq!(urlencode("a/b"), "a%2Fb");
    }
}
