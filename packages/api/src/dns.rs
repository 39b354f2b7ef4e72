//! DNS management via the Cloudflare v4 API, with a resolver fallback for
//! domains outside the platform zone.

use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::proto::rr::{RData, RecordType};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;

const API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// A Cloudflare DNS record.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DnsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    pub ttl: i64,
    pub proxied: bool,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiErrorEntry>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEntry {
    #[allow(dead_code)]
    code: i64,
    message: String,
}

/// Outcome of a domain verification check.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DomainVerification {
    pub domain: String,
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_record: Option<String>,
    pub expected: String,
    pub message: String,
}

/// Cloudflare zone client.
#[derive(Clone)]
pub struct DnsClient {
    api_token: String,
    zone_id: String,
    http: reqwest::Client,
}

impl DnsClient {
    pub fn new(api_token: &str, zone_id: &str) -> Self {
        Self {
            api_token: api_token.to_string(),
            zone_id: zone_id.to_string(),
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Create a proxied CNAME with automatic TTL. Idempotent from the
    /// caller's standpoint: an existing record under the same name is
    /// returned as-is.
    pub async fn create_cname(&self, subdomain: &str, target: &str) -> Result<DnsRecord, ApiError> {
        if let Some(existing) = self.get_record_by_name(subdomain).await? {
            return Ok(existing);
        }

        let record = DnsRecord {
            id: None,
            record_type: "CNAME".to_string(),
            name: subdomain.to_string(),
            content: target.to_string(),
            ttl: 1,
            proxied: true,
        };

        let url = format!("{API_BASE}/zones/{}/dns_records", self.zone_id);
        let envelope: ApiEnvelope<DnsRecord> = self
            .http
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&record)
            .send()
            .await?
            .json()
            .await?;

        unwrap_envelope(envelope)
    }

    pub async fn delete_record(&self, record_id: &str) -> Result<(), ApiError> {
        let url = format!("{API_BASE}/zones/{}/dns_records/{record_id}", self.zone_id);
        let envelope: ApiEnvelope<serde_json::Value> = self
            .http
            .delete(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await?
            .json()
            .await?;

        if envelope.success {
            Ok(())
        } else {
            Err(envelope_error(&envelope.errors))
        }
    }

    /// Find a record by fully-qualified name; `None` when absent.
    pub async fn get_record_by_name(&self, name: &str) -> Result<Option<DnsRecord>, ApiError> {
        let url = format!(
            "{API_BASE}/zones/{}/dns_records?name={name}",
            self.zone_id
        );
        let envelope: ApiEnvelope<Vec<DnsRecord>> = self
            .http
            .get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await?
            .json()
            .await?;

        if !envelope.success {
            return Err(envelope_error(&envelope.errors));
        }
        Ok(envelope.result.unwrap_or_default().into_iter().next())
    }

    /// Check whether a domain's CNAME points at the expected target.
    ///
    /// Lookup failures report as unverified with a message rather than as
    /// errors, so callers can surface actionable feedback.
    pub async fn verify_domain(
        &self,
        domain: &str,
        expected_target: &str,
    ) -> Result<DomainVerification, ApiError> {
        let record = match self.get_record_by_name(domain).await {
            Ok(record) => record,
            Err(err) => {
                return Ok(DomainVerification {
                    domain: domain.to_string(),
                    verified: false,
                    dns_record: None,
                    expected: expected_target.to_string(),
                    message: format!("failed to check DNS: {err}"),
                });
            }
        };

        let Some(record) = record else {
            return Ok(DomainVerification {
                domain: domain.to_string(),
                verified: false,
                dns_record: None,
                expected: expected_target.to_string(),
                message: "no DNS record found, please add a CNAME record".to_string(),
            });
        };

        if !hostnames_equal(&record.content, expected_target) {
            return Ok(DomainVerification {
                domain: domain.to_string(),
                verified: false,
                dns_record: Some(record.content.clone()),
                expected: expected_target.to_string(),
                message: format!(
                    "DNS record points to {} instead of {expected_target}",
                    record.content
                ),
            });
        }

        Ok(DomainVerification {
            domain: domain.to_string(),
            verified: true,
            dns_record: Some(record.content),
            expected: expected_target.to_string(),
            message: "domain is properly configured".to_string(),
        })
    }
}

/// Resolver-level CNAME check for domains outside the platform zone.
pub async fn resolve_cname_matches(domain: &str, expected_target: &str) -> Result<bool, ApiError> {
    let resolver = TokioAsyncResolver::tokio_from_system_conf()
        .map_err(|e| ApiError::internal(format!("failed to build resolver: {e}")))?;

    let lookup = resolver
        .lookup(domain, RecordType::CNAME)
        .await
        .map_err(|e| ApiError::internal(format!("CNAME lookup failed: {e}")))?;

    for record in lookup.iter() {
        if let RData::CNAME(target) = record {
            if hostnames_equal(&target.to_utf8(), expected_target) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Case-insensitive hostname comparison, ignoring a trailing dot.
fn hostnames_equal(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}

fn unwrap_envelope<T>(envelope: ApiEnvelope<T>) -> Result<T, ApiError> {
    if !envelope.success {
        return Err(envelope_error(&envelope.errors));
    }
    envelope
        .result
        .ok_or_else(|| ApiError::internal("cloudflare response carried no result"))
}

fn envelope_error(errors: &[ApiErrorEntry]) -> ApiError {
    match errors.first() {
        Some(e) => ApiError::internal(format!("cloudflare error: {}", e.message)),
        None => ApiError::internal("cloudflare request failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostname_comparison_normalizes() {
        assert!(hostnames_equal("nexo.build.", "nexo.build"));
        assert!(hostnames_equal("NEXO.BUILD", "nexo.build"));
        assert!(hostnames_equal("nexo.build", "nexo.build."));
        assert!(!hostnames_equal("other.build", "nexo.build"));
    }

    #[test]
    fn record_serializes_with_type_field() {
        let record = DnsRecord {
            id: None,
            record_type: "CNAME".to_string(),
            name: "app.example.com".to_string(),
            content: "nexo.build".to_string(),
            ttl: 1,
            proxied: true,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "CNAME");
        assert_eq!(json["ttl"], 1);
        assert_eq!(json["proxied"], true);
        assert!(json.get("id").is_none());
    }
}
