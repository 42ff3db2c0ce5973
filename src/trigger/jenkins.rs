use std::time::Duration;

use tracing::warn;

use crate::config::JenkinsConfig;

const CRUMB_TIMEOUT: Duration = Duration::from_secs(10);
const BUILD_TIMEOUT: Duration = Duration::from_secs(15);

/// Status codes Jenkins answers a queued build with. 302 is common: the
/// server redirects to the queue item after accepting the job.
const ACCEPTED_CODES: [u16; 3] = [200, 201, 302];

/// Outcome of one trigger attempt.
///
/// `status` is the HTTP code of whichever step got a response; transport
/// failures leave it `None` and put the diagnostic in `detail`.
#[derive(Debug, Clone)]
pub struct TriggerOutcome {
    pub ok: bool,
    pub status: Option<u16>,
    pub detail: String,
}

impl TriggerOutcome {
    fn failed(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            status: None,
            detail: detail.into(),
        }
    }
}

/// Two-step Jenkins trigger client: fetch an anti-forgery crumb, then POST
/// the build request with the crumb attached.
///
/// No retries and no idempotency key; a caller that invokes this twice
/// enqueues two jobs. The approval endpoint's single-use claim is what
/// keeps invocations to at most one per token.
#[derive(Clone)]
pub struct JenkinsClient {
    http: reqwest::Client,
    config: JenkinsConfig,
}

impl JenkinsClient {
    pub fn new(config: JenkinsConfig) -> Self {
        // Redirects must stay visible: a 302 from Jenkins is the success
        // signal, not something to follow.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("failed to build Jenkins HTTP client");
        Self { http, config }
    }

    /// Perform the handshake. Every failure mode, transport errors
    /// included, is folded into the returned outcome.
    pub async fn trigger_build(&self) -> TriggerOutcome {
        let base = self.config.base_url.trim_end_matches('/');
        let crumb_url = format!(
            "{base}/crumbIssuer/api/xml?xpath=concat(//crumbRequestField,\":\",//crumb)"
        );

        let resp = match self
            .http
            .get(&crumb_url)
            .basic_auth(&self.config.user, Some(&self.config.api_token))
            .timeout(CRUMB_TIMEOUT)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "crumb fetch failed");
                return TriggerOutcome::failed(format!("crumb fetch failed: {e}"));
            }
        };

        if resp.status() != reqwest::StatusCode::OK {
            let code = resp.status().as_u16();
            return TriggerOutcome {
                ok: false,
                status: Some(code),
                detail: format!("crumb error {code}"),
            };
        }

        let body = match resp.text().await {
            Ok(b) => b,
            Err(e) => return TriggerOutcome::failed(format!("crumb body unreadable: {e}")),
        };
        // Expected shape: "Jenkins-Crumb:0a1b2c...". Split on the first
        // colon only; the crumb value itself may contain more.
        let Some((crumb_field, crumb)) = body.trim().split_once(':') else {
            return TriggerOutcome::failed(format!("malformed crumb response: {body:?}"));
        };

        let build_url = format!("{base}/job/{}/build", self.config.job);
        let mut req = self
            .http
            .post(&build_url)
            .basic_auth(&self.config.user, Some(&self.config.api_token))
            .header(crumb_field, crumb)
            .timeout(BUILD_TIMEOUT);
        if let Some(token) = &self.config.trigger_token {
            req = req.query(&[("token", token)]);
        }

        match req.send().await {
            Ok(resp) => {
                let code = resp.status().as_u16();
                let ok = ACCEPTED_CODES.contains(&code);
                let detail = if ok {
                    format!("build accepted with {code}")
                } else {
                    let body = resp.text().await.unwrap_or_default();
                    format!("build submit returned {code}: {body}")
                };
                TriggerOutcome {
                    ok,
                    status: Some(code),
                    detail,
                }
            }
            Err(e) => {
                warn!(error = %e, "build submit failed");
                TriggerOutcome::failed(format!("build submit failed: {e}"))
            }
        }
    }
}
