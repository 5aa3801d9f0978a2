//! Background trigger scheduling
//!
//! Emits [`Trigger`]s on a tokio channel: a `Scheduled` trigger every refresh
//! period, `Manual` triggers on request, and one-shot `Recovery` triggers after
//! a rate limit. The receiver decides what to run; the policy itself ensures
//! loads never overlap.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::Trigger;
use crate::config::DEFAULT_REFRESH_MINUTES;

/// Configuration for the periodic trigger
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Period of the scheduled trigger
    pub interval: Duration,
    /// Whether the periodic trigger runs at all
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_REFRESH_MINUTES * 60), // 15 minutes
            enabled: true,
        }
    }
}

/// Handle for controlling the background trigger tasks
pub struct RefreshHandle {
    /// Channel for receiving triggers
    pub receiver: mpsc::Receiver<Trigger>,
    /// Sender shared with the timer and recovery tasks
    trigger_tx: mpsc::Sender<Trigger>,
    /// Flag to signal shutdown
    shutdown_tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Creates a RefreshHandle and spawns the periodic trigger task
    ///
    /// # Arguments
    /// * `config` - Period and on/off switch for the timer
    ///
    /// # Returns
    /// A RefreshHandle that receives triggers via the `receiver` channel
    pub fn spawn(config: RefreshConfig) -> Self {
        let (trigger_tx, receiver) = mpsc::channel(8);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        if config.enabled {
            let period = config.interval;
            let tx = trigger_tx.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                // Skip the first tick (immediate)
                interval.tick().await;

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            debug!("scheduled refresh due");
                            // A full channel already holds a pending trigger
                            let _ = tx.try_send(Trigger::Scheduled);
                        }
                        _ = shutdown_rx.recv() => {
                            break;
                        }
                    }
                }
            });
        }

        Self {
            receiver,
            trigger_tx,
            shutdown_tx,
        }
    }

    /// Requests an immediate manual refresh
    pub fn request_refresh(&self) {
        let _ = self.trigger_tx.try_send(Trigger::Manual);
    }

    /// Emits a `Recovery` trigger once `delay` has elapsed
    pub fn schedule_recovery(&self, delay: Duration) {
        debug!(delay_secs = delay.as_secs(), "recovery refresh scheduled");
        let tx = self.trigger_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Trigger::Recovery).await;
        });
    }

    /// Shuts down the periodic trigger task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Checks for a pending trigger without blocking
///
/// # Arguments
/// * `handle` - The RefreshHandle to check
///
/// # Returns
/// * `Some(Trigger)` if a trigger was pending
/// * `None` if nothing is pending
pub fn try_recv(handle: &mut RefreshHandle) -> Option<Trigger> {
    handle.receiver.try_recv().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[test]
    fn test_refresh_config_default() {
        let config = RefreshConfig::default();
        assert_eq!(config.interval, Duration::from_secs(900));
        assert!(config.enabled);
    }

    #[tokio::test]
    async fn test_refresh_handle_spawn_disabled() {
        let config = RefreshConfig {
            enabled: false,
            ..Default::default()
        };

        let mut handle = RefreshHandle::spawn(config);

        // With the timer disabled, there should be no triggers
        assert!(try_recv(&mut handle).is_none());
    }

    #[tokio::test]
    async fn test_scheduled_trigger_fires_after_interval() {
        let mut handle = RefreshHandle::spawn(RefreshConfig {
            interval: Duration::from_millis(20),
            enabled: true,
        });

        // Nothing fires immediately
        assert!(try_recv(&mut handle).is_none());

        let trigger = timeout(Duration::from_secs(2), handle.receiver.recv())
            .await
            .expect("trigger within timeout");
        assert_eq!(trigger, Some(Trigger::Scheduled));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_request_refresh_sends_manual() {
        let mut handle = RefreshHandle::spawn(RefreshConfig {
            enabled: false,
            ..Default::default()
        });

        handle.request_refresh();

        assert_eq!(try_recv(&mut handle), Some(Trigger::Manual));
    }

    #[tokio::test]
    async fn test_schedule_recovery_sends_recovery() {
        let mut handle = RefreshHandle::spawn(RefreshConfig {
            enabled: false,
            ..Default::default()
        });

        handle.schedule_recovery(Duration::from_millis(10));

        let trigger = timeout(Duration::from_secs(2), handle.receiver.recv())
            .await
            .expect("trigger within timeout");
        assert_eq!(trigger, Some(Trigger::Recovery));
    }
}
