//! Two-phase container publishing
//!
//! Instagram and Threads publish media in two steps: create a container
//! that the platform processes asynchronously, then publish it. Video
//! containers must be polled until processing settles.
//!
//! ```text
//! CREATED -> PROCESSING -> FINISHED
//!                      \-> ERROR
//! ```
//!
//! Exceeding the local wait bound abandons the container and surfaces as
//! `PlatformError::ProcessingTimedOut`.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::PublishingConfig;
use crate::error::{PlatformError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Processing,
    Finished,
    Error,
}

impl ContainerState {
    /// Map a remote status string (`status_code` on Instagram, `status` on
    /// Threads). Unknown values count as still processing.
    pub fn from_remote(status: Option<&str>) -> Self {
        match status {
            Some("FINISHED") | Some("PUBLISHED") => ContainerState::Finished,
            Some("ERROR") | Some("EXPIRED") => ContainerState::Error,
            _ => ContainerState::Processing,
        }
    }
}

/// How often and how long to poll a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(300),
        }
    }
}

impl PollPolicy {
    pub fn from_config(config: &PublishingConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            max_wait: Duration::from_secs(config.max_wait_secs),
        }
    }
}

/// Poll `check` until the container settles or the wait bound passes.
///
/// A status request that fails ends the wait with that error; there is no
/// retry. On timeout the container is left as is.
pub async fn wait_for_container<F, Fut>(
    container_id: &str,
    policy: PollPolicy,
    mut check: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ContainerState>>,
{
    let started = Instant::now();
    let mut polls = 0u32;

    while started.elapsed() < policy.max_wait {
        polls += 1;
        match check().await? {
            ContainerState::Finished => {
                info!("Container {} finished processing after {} poll(s)", container_id, polls);
                return Ok(());
            }
            ContainerState::Error => {
                return Err(PlatformError::ProcessingFailed(container_id.to_string()).into());
            }
            state => debug!("Container {} is {:?}", container_id, state),
        }
        tokio::time::sleep(policy.interval).await;
    }

    Err(PlatformError::ProcessingTimedOut {
        container_id: container_id.to_string(),
        waited_secs: started.elapsed().as_secs(),
    }
    .into())
}
