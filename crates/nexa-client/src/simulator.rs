//! Inbound-message simulator for the active conversation.
//!
//! One tokio task per selection. It sleeps a uniformly random interval, then
//! with a fixed probability fabricates a contact message, and repeats until
//! its token is cancelled. Dropping the [`SimulatorHandle`] cancels it.

use std::sync::Weak;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use nexa_shared::constants::SIMULATED_PHRASES;
use nexa_shared::types::ConversationId;

use crate::conversations::ConversationInner;
use crate::settings::SimulatorSettings;

/// Owner of a running simulator loop.
pub struct SimulatorHandle {
    conversation_id: ConversationId,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl SimulatorHandle {
    /// Start a loop for `conversation_id` on the current tokio runtime.
    /// Without a runtime nothing is started and `None` is returned.
    pub(crate) fn spawn(
        store: Weak<ConversationInner>,
        conversation_id: ConversationId,
        settings: SimulatorSettings,
    ) -> Option<Self> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(
                    conversation_id = %conversation_id,
                    "No tokio runtime, inbound simulator not started"
                );
                return None;
            }
        };

        let token = CancellationToken::new();
        let task = runtime.spawn(run(
            store,
            conversation_id.clone(),
            settings,
            token.clone(),
        ));
        tracing::debug!(conversation_id = %conversation_id, "Simulator started");

        Some(Self {
            conversation_id,
            token,
            task,
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SimulatorHandle {
    fn drop(&mut self) {
        self.token.cancel();
        tracing::debug!(conversation_id = %self.conversation_id, "Simulator cancelled");
    }
}

/// Uniform draw from `[lo, hi]` at millisecond resolution.
fn next_wait(rng: &mut impl Rng, (lo, hi): (Duration, Duration)) -> Duration {
    let lo = lo.as_millis() as u64;
    let hi = hi.as_millis() as u64;
    Duration::from_millis(rng.gen_range(lo..=hi))
}

async fn run(
    store: Weak<ConversationInner>,
    conversation_id: ConversationId,
    settings: SimulatorSettings,
    token: CancellationToken,
) {
    let mut rng = StdRng::from_entropy();
    let bounds = settings.delay_bounds();
    let probability = settings.probability();

    loop {
        let wait = next_wait(&mut rng, bounds);
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }

        if !rng.gen_bool(probability) {
            tracing::trace!(conversation_id = %conversation_id, "Simulator idle cycle");
            continue;
        }

        let Some(inner) = store.upgrade() else {
            break;
        };
        let phrase = SIMULATED_PHRASES[rng.gen_range(0..SIMULATED_PHRASES.len())];
        if !inner.deliver_simulated(&conversation_id, &token, phrase) {
            break;
        }
    }

    tracing::debug!(conversation_id = %conversation_id, "Simulator loop finished");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_stay_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let bounds = (Duration::from_secs(30), Duration::from_secs(90));
        for _ in 0..1_000 {
            let wait = next_wait(&mut rng, bounds);
            assert!(wait >= bounds.0 && wait <= bounds.1);
        }
    }

    #[test]
    fn degenerate_range_is_fixed() {
        let mut rng = StdRng::seed_from_u64(1);
        let five = Duration::from_secs(5);
        assert_eq!(next_wait(&mut rng, (five, five)), five);
    }

    #[test]
    fn no_runtime_means_no_loop() {
        let handle = SimulatorHandle::spawn(Weak::new(), ConversationId::new(), SimulatorSettings::default());
        assert!(handle.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn loop_ends_when_store_is_gone() {
        let settings = SimulatorSettings {
            min_delay_secs: 1,
            max_delay_secs: 1,
            message_probability: 1.0,
        };
        let handle = SimulatorHandle::spawn(Weak::new(), ConversationId::new(), settings).unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(handle.is_finished());
        assert!(!handle.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_cancels() {
        let handle =
            SimulatorHandle::spawn(Weak::new(), ConversationId::new(), SimulatorSettings::default()).unwrap();
        let token = handle.token.clone();
        drop(handle);
        assert!(token.is_cancelled());
    }
}
