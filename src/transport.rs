//! HTTP transport for SOAP traffic.
//!
//! Wraps a `reqwest` client carrying the configured timeout and, when both
//! credentials are set, HTTP Basic authentication.

use crate::config::LegacyClientConfig;
use crate::error::{CallFailure, ResolveError};
use crate::wsdl::SoapVersion;
use reqwest::Client as HttpClient;
use std::time::Duration;
use tracing::{debug, info};

/// Raw HTTP response returned by the service.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Authenticated HTTP transport shared by WSDL resolution and calls.
#[derive(Clone)]
pub struct SoapTransport {
    http_client: HttpClient,
    credentials: Option<(String, String)>,
    timeout: Duration,
}

impl std::fmt::Debug for SoapTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoapTransport")
            .field("basic_auth", &self.credentials.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SoapTransport {
    /// Build a transport from configuration.
    pub fn new(config: &LegacyClientConfig) -> Result<Self, ResolveError> {
        let timeout = config.timeout();
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(ResolveError::Transport)?;

        let credentials = config
            .basic_auth()
            .map(|(user, pass)| (user.to_string(), pass.to_string()));
        if credentials.is_some() {
            info!("Basic authentication configured for SOAP client");
        }

        Ok(Self {
            http_client,
            credentials,
            timeout,
        })
    }

    pub fn has_basic_auth(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some((user, pass)) => request.basic_auth(user, Some(pass)),
            None => request,
        }
    }

    /// GET a document (the WSDL).
    pub async fn fetch(&self, url: &str) -> Result<HttpResponse, CallFailure> {
        debug!(url = %url, "Fetching document");
        let response = self.authorize(self.http_client.get(url)).send().await?;
        read_response(response).await
    }

    /// POST a SOAP envelope.
    pub async fn post_envelope(
        &self,
        url: &str,
        version: SoapVersion,
        soap_action: Option<&str>,
        envelope: String,
    ) -> Result<HttpResponse, CallFailure> {
        let action = soap_action.unwrap_or("");
        let mut request = self.authorize(self.http_client.post(url));

        request = match version {
            SoapVersion::Soap11 => request
                .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
                .header("SOAPAction", format!("\"{}\"", action)),
            SoapVersion::Soap12 => {
                let content_type = if action.is_empty() {
                    "application/soap+xml; charset=utf-8".to_string()
                } else {
                    format!("application/soap+xml; charset=utf-8; action=\"{}\"", action)
                };
                request.header(reqwest::header::CONTENT_TYPE, content_type)
            }
        };

        debug!(url = %url, soap_action = %action, bytes = envelope.len(), "Posting SOAP envelope");
        let response = request.body(envelope).send().await?;
        read_response(response).await
    }
}

async fn read_response(response: reqwest::Response) -> Result<HttpResponse, CallFailure> {
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok(HttpResponse { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_without_credentials() {
        let transport = SoapTransport::new(&LegacyClientConfig::new("http://x")).unwrap();
        assert!(!transport.has_basic_auth());
        assert_eq!(transport.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_transport_with_credentials() {
        let config = LegacyClientConfig::new("http://x")
            .with_credentials("user", "pw")
            .with_timeout_secs(5);
        let transport = SoapTransport::new(&config).unwrap();
        assert!(transport.has_basic_auth());
        assert_eq!(transport.timeout(), Duration::from_secs(5));
        assert!(!format!("{:?}", transport).contains("pw"));
    }

    #[test]
    fn test_response_success_range() {
        let ok = HttpResponse { status: 200, body: String::new() };
        let fault = HttpResponse { status: 500, body: String::new() };
        assert!(ok.is_success());
        assert!(!fault.is_success());
    }
}
