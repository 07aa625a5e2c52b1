use reqwest::blocking::Client;

use crate::error::{ReleaseError, Result};
use crate::ui;

/// Job parameter carrying the tag a release build should publish.
pub const RELEASE_TAG_PARAMETER: &str = "CX_RELEASE_GIT_TAG";

/// Minimal client for triggering parametrized Jenkins jobs.
///
/// Only the trigger endpoint is covered; monitoring and job reconfiguration
/// are out of scope. Calls are blocking and any non-success response is
/// fatal to the run.
pub struct JenkinsClient {
    host: String,
    username: String,
    password: String,
    client: Client,
}

impl JenkinsClient {
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(JenkinsClient {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            client,
        })
    }

    /// Trigger a parametrized build of `job`.
    pub fn trigger_build(&self, job: &str, parameters: &[(&str, &str)]) -> Result<()> {
        let url = build_trigger_url(&self.host, job);
        ui::info(&format!("Triggering jenkins job {} at {}", job, self.host));

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .query(parameters)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReleaseError::jenkins(format!(
                "job '{}' trigger returned {}",
                job, status
            )));
        }
        Ok(())
    }
}

/// URL of the parametrized trigger endpoint for a job.
fn build_trigger_url(host: &str, job: &str) -> String {
    format!(
        "{}/job/{}/buildWithParameters",
        host.trim_end_matches('/'),
        job
    )
}
