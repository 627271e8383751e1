//! HTTP client for CloudWatch `DescribeAlarms` (JSON 1.0 protocol)

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::{instrument, trace};
use url::Url;

use super::sigv4::{self, SigningScope};
use super::{AlarmsClient, DescribeAlarmsInput, DescribeAlarmsOutput};
use crate::credentials::Credentials;
use crate::error::CloudWatchError;

const SERVICE: &str = "monitoring";
const TARGET_PREFIX: &str = "GraniteServiceVersion20100801";
const CONTENT_TYPE: &str = "application/x-amz-json-1.0";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const POOL_MAX_IDLE_PER_HOST: usize = 100;

/// Default regional endpoint
pub fn default_endpoint(region: &str) -> String {
    format!("https://{SERVICE}.{region}.amazonaws.com")
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "__type")]
    kind: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

/// CloudWatch client signing every request with SigV4
#[derive(Debug, Clone)]
pub struct HttpCloudWatchClient {
    client: Client,
    endpoint: Url,
    region: String,
    credentials: Credentials,
}

impl HttpCloudWatchClient {
    /// Create a client for `region`, optionally against an endpoint override
    pub fn new(
        region: &str,
        endpoint_url: Option<&str>,
        credentials: Credentials,
    ) -> Result<Self, CloudWatchError> {
        let endpoint = match endpoint_url.filter(|url| !url.is_empty()) {
            Some(url) => url.to_string(),
            None => default_endpoint(region),
        };
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| CloudWatchError::Endpoint(format!("{endpoint}: {e}")))?;
        // validated here so every request can sign it
        sigv4::host_header(&endpoint)?;

        let client = Client::builder()
            .use_rustls_tls()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            region: region.to_string(),
            credentials,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Call a CloudWatch action with a JSON payload
    async fn call(&self, action: &str, payload: Vec<u8>) -> Result<String, CloudWatchError> {
        let now = Utc::now();

        let mut headers = BTreeMap::from([
            ("content-type".to_string(), CONTENT_TYPE.to_string()),
            ("host".to_string(), sigv4::host_header(&self.endpoint)?),
            ("x-amz-date".to_string(), sigv4::amz_date(now)),
            ("x-amz-target".to_string(), format!("{TARGET_PREFIX}.{action}")),
        ]);
        if let Some(token) = &self.credentials.session_token {
            headers.insert("x-amz-security-token".to_string(), token.clone());
        }

        let authorization = sigv4::authorization(
            "POST",
            &self.endpoint,
            &headers,
            &payload,
            &self.credentials,
            SigningScope {
                region: &self.region,
                service: SERVICE,
                time: now,
            },
        )?;

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header("authorization", authorization)
            .body(payload);
        for (name, value) in &headers {
            // set by the HTTP client from the URL
            if name == "host" {
                continue;
            }
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), body));
        }

        Ok(body)
    }
}

fn api_error(status: u16, body: String) -> CloudWatchError {
    match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(ApiErrorBody {
            kind: Some(kind),
            message,
        }) => CloudWatchError::Api {
            // "com.amazonaws.monitoring#InvalidNextToken" -> "InvalidNextToken"
            code: kind.rsplit('#').next().unwrap_or(&kind).to_string(),
            message: message.unwrap_or_default(),
        },
        _ => CloudWatchError::Http { status, body },
    }
}

#[async_trait]
impl AlarmsClient for HttpCloudWatchClient {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn describe_alarms(
        &self,
        input: &DescribeAlarmsInput,
    ) -> Result<DescribeAlarmsOutput, CloudWatchError> {
        let payload = serde_json::to_vec(input)?;
        let body = self.call("DescribeAlarms", payload).await?;

        let output: DescribeAlarmsOutput = serde_json::from_str(&body)?;
        trace!(
            "received {} alarms (more pages: {})",
            output.metric_alarms.len(),
            output.next_token.is_some()
        );
        Ok(output)
    }
}
