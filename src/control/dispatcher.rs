//! Serialized control-command dispatch.
//!
//! Control operations on the remote trading process must never be issued
//! concurrently or out of order, so the dispatcher holds a one-slot state
//! machine (Idle -> Pending -> Idle) and rejects overlapping intents
//! outright rather than queueing them.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{HedgewatchError, Result};
use crate::gateway::{ControlIntent, Gateway};
use crate::status::{CommandOutcome, StatusSink, StatusUpdate};

pub struct CommandDispatcher {
    gateway: Arc<dyn Gateway>,
    sink: Arc<StatusSink>,
    /// Pending flag: true while exactly one command is outstanding.
    in_flight: AtomicBool,
}

impl CommandDispatcher {
    pub fn new(gateway: Arc<dyn Gateway>, sink: Arc<StatusSink>) -> Self {
        Self {
            gateway,
            sink,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Issue one control command. Fails synchronously with
    /// [`HedgewatchError::CommandInFlight`] while another command is
    /// outstanding; the new intent is dropped, not queued. A failure of the
    /// underlying call is forwarded to the sink, not returned — the operator
    /// re-issues the intent.
    pub async fn dispatch(&self, intent: ControlIntent) -> Result<()> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(%intent, "rejected control command, one already in flight");
            return Err(HedgewatchError::CommandInFlight);
        }

        info!(%intent, "dispatching control command");
        self.sink
            .publish(StatusUpdate::Notice {
                message: intent.pending_message().to_string(),
                at: Utc::now(),
                is_error: false,
            })
            .await;

        let outcome = self.gateway.send_control(intent).await;
        // Slot opens before the outcome is published so a subscriber reacting
        // to the outcome can immediately dispatch the next intent.
        self.in_flight.store(false, Ordering::SeqCst);

        let issued_at = Utc::now();
        match outcome {
            Ok(message) => {
                info!(%intent, message, "control command succeeded");
                self.sink
                    .publish(StatusUpdate::Command(CommandOutcome {
                        intent,
                        issued_at,
                        outcome: Ok(message),
                    }))
                    .await;
            }
            Err(e) => {
                warn!(%intent, error = %e, "control command failed");
                self.sink
                    .publish(StatusUpdate::Command(CommandOutcome {
                        intent,
                        issued_at,
                        outcome: Err(e.to_string()),
                    }))
                    .await;
            }
        }

        Ok(())
    }
}
