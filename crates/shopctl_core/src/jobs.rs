use std::thread::sleep;
use std::time::Duration;

use anyhow::{Result, anyhow};
use serde::Serialize;
use serde_json::Value;

use crate::client::{CatalogReadApi, JobStatus};
use crate::session::SessionCookie;

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub interval: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobWatchReport {
    pub job_id: String,
    pub polls: usize,
    pub final_state: String,
    pub error: Option<String>,
    pub result: Option<Value>,
    pub request_count: usize,
}

/// Poll a background job until it settles, invoking `on_poll` with every
/// observed status so the caller can print progress lines. A job the API
/// cannot see (bad id or missing permission) is fatal on the first poll.
pub fn watch_job<A: CatalogReadApi>(
    api: &mut A,
    session: &SessionCookie,
    job_id: &str,
    options: &WatchOptions,
    mut on_poll: impl FnMut(&JobStatus),
) -> Result<JobWatchReport> {
    let mut polls = 0;
    loop {
        let job = api
            .job(session, job_id)?
            .ok_or_else(|| anyhow!("job not found or not visible: {job_id}"))?;
        polls += 1;
        on_poll(&job);

        if job.is_finished() {
            return Ok(JobWatchReport {
                job_id: job_id.to_string(),
                polls,
                final_state: job.state,
                error: job.error,
                result: job.result,
                request_count: api.request_count(),
            });
        }
        sleep(options.interval);
    }
}

/// One human-readable line per poll, e.g. `RUNNING [update-search-index] 40%`.
pub fn format_poll_line(job: &JobStatus) -> String {
    let progress = job
        .progress
        .map(|value| format!("{value}%"))
        .unwrap_or_else(|| "-".to_string());
    let queue = job
        .queue_name
        .as_deref()
        .map(|name| format!(" [{name}]"))
        .unwrap_or_default();
    match &job.error {
        Some(error) => format!("{}{queue} {progress} - ERROR: {error}", job.state),
        None => format!("{}{queue} {progress}", job.state),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use crate::client::JobStatus;
    use crate::testing::{MockApi, mock_session};

    use super::{WatchOptions, format_poll_line, watch_job};

    fn status(state: &str, progress: f64, settled: bool) -> JobStatus {
        JobStatus {
            id: "145".to_string(),
            state: state.to_string(),
            progress: Some(progress),
            queue_name: Some("update-search-index".to_string()),
            is_settled: settled,
            error: None,
            result: None,
        }
    }

    fn fast() -> WatchOptions {
        WatchOptions {
            interval: Duration::ZERO,
        }
    }

    #[test]
    fn polls_until_completed() {
        let mut api = MockApi::default();
        api.job_polls = vec![
            status("PENDING", 0.0, false),
            status("RUNNING", 40.0, false),
            JobStatus {
                result: Some(json!({ "indexedItemCount": 128 })),
                ..status("COMPLETED", 100.0, true)
            },
        ];
        let session = mock_session();

        let mut seen = Vec::new();
        let report = watch_job(&mut api, &session, "145", &fast(), |job| {
            seen.push(job.state.clone());
        })
        .expect("watch");

        assert_eq!(report.polls, 3);
        assert_eq!(report.final_state, "COMPLETED");
        assert_eq!(seen, vec!["PENDING", "RUNNING", "COMPLETED"]);
        assert!(report.result.is_some());
    }

    #[test]
    fn failed_state_ends_the_watch_with_the_job_error() {
        let mut api = MockApi::default();
        api.job_polls = vec![
            status("RUNNING", 10.0, false),
            JobStatus {
                error: Some("index writer crashed".to_string()),
                ..status("FAILED", 10.0, true)
            },
        ];
        let session = mock_session();

        let report = watch_job(&mut api, &session, "145", &fast(), |_| {}).expect("watch");
        assert_eq!(report.final_state, "FAILED");
        assert_eq!(report.error.as_deref(), Some("index writer crashed"));
    }

    #[test]
    fn settled_flag_alone_ends_the_watch() {
        let mut api = MockApi::default();
        api.job_polls = vec![status("CANCELLED", 0.0, true)];
        let session = mock_session();

        let report = watch_job(&mut api, &session, "145", &fast(), |_| {}).expect("watch");
        assert_eq!(report.polls, 1);
        assert_eq!(report.final_state, "CANCELLED");
    }

    #[test]
    fn missing_job_is_fatal() {
        let mut api = MockApi::default();
        let session = mock_session();
        let error = watch_job(&mut api, &session, "999", &fast(), |_| {}).expect_err("must fail");
        assert!(error.to_string().contains("job not found"));
    }

    #[test]
    fn poll_line_formats_state_queue_and_progress() {
        assert_eq!(
            format_poll_line(&status("RUNNING", 40.0, false)),
            "RUNNING [update-search-index] 40%"
        );
        let mut failed = status("FAILED", 10.0, true);
        failed.error = Some("boom".to_string());
        assert_eq!(
            format_poll_line(&failed),
            "FAILED [update-search-index] 10% - ERROR: boom"
        );
    }
}
