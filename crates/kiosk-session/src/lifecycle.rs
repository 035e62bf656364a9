//! Bounded device occupancy.

use std::time::Duration;

use tokio::time::Instant;

/// One-shot occupancy deadline, armed on admission.
#[derive(Debug, Clone)]
pub struct LifecycleTimer {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl LifecycleTimer {
    /// A disarmed timer with the given budget.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    /// Arm the timer. Re-arming an armed timer keeps the first deadline.
    pub fn start(&mut self) {
        if self.deadline.is_none() {
            self.deadline = Some(Instant::now() + self.timeout);
        }
    }

    /// Disarm.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Whether the timer is armed.
    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time left before expiry.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Resolves at the deadline; never resolves while disarmed.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_expires_after_timeout() {
        let mut timer = LifecycleTimer::new(Duration::from_secs(120));
        timer.start();
        tokio::time::advance(Duration::from_secs(100)).await;
        timer.start();
        assert_eq!(timer.remaining(), Some(Duration::from_secs(20)));

        let started = Instant::now();
        timer.expired().await;
        assert_eq!(started.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let mut timer = LifecycleTimer::new(Duration::from_secs(1));
        timer.start();
        timer.cancel();
        assert!(!timer.is_running());
        let fired = tokio::time::timeout(Duration::from_secs(5), timer.expired()).await;
        assert!(fired.is_err());
    }
}
