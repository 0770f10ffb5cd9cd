//! Delivery: presence, typing delays, media on the first part, and the
//! single "brain freeze" retry when a send fails.

use super::Gateway;
use crate::handlers::with_timeout;
use crate::humanize::DeliveryPlan;
use doppel_core::{
    error::DoppelError,
    message::OutgoingMessage,
    traits::{Channel, Presence},
};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Sent once when a part fails to go out.
pub const BRAIN_FREEZE: &str = "brain freeze, text me again";

/// Deadline for a single outbound send, media included.
const SEND_TIMEOUT: Duration = Duration::from_secs(60);

async fn send_text(channel: &dyn Channel, target: &str, text: &str) -> Result<(), DoppelError> {
    let msg = OutgoingMessage {
        text: text.to_string(),
        reply_target: Some(target.to_string()),
        ..Default::default()
    };
    with_timeout(SEND_TIMEOUT, channel.name(), channel.send(msg)).await
}

async fn presence(channel: &dyn Channel, target: &str, state: Presence) {
    if let Err(e) = channel.set_presence(target, state).await {
        debug!("presence {state:?} on {target} failed: {e}");
    }
}

impl Gateway {
    /// Send a plan part by part. Returns whether every part went out.
    pub(super) async fn deliver(&self, channel_name: &str, target: &str, plan: &DeliveryPlan) -> bool {
        let Some(channel) = self.channels.get(channel_name) else {
            error!("no channel named {channel_name}, dropping reply to {target}");
            return false;
        };
        let channel = channel.as_ref();

        for (i, part) in plan.parts.iter().enumerate() {
            presence(channel, target, Presence::Composing).await;
            if self.simulate_typing {
                tokio::time::sleep(Duration::from_millis(part.delay_ms)).await;
            }

            if i == 0 {
                if let Some(image) = plan.image.as_ref() {
                    let sent = with_timeout(
                        SEND_TIMEOUT,
                        "image",
                        channel.send_image(target, &image.bytes, ""),
                    )
                    .await;
                    if let Err(e) = sent {
                        warn!("image to {target} failed: {e}");
                    }
                }
            }

            if let Err(e) = send_text(channel, target, &part.text).await {
                warn!("send to {target} failed: {e}, retrying once");
                if let Err(e) = send_text(channel, target, BRAIN_FREEZE).await {
                    error!("giving up on {target}: {e}");
                }
                presence(channel, target, Presence::Paused).await;
                return false;
            }

            if i == 0 {
                if let Some(audio) = plan.audio.as_ref() {
                    let sent = with_timeout(
                        SEND_TIMEOUT,
                        "audio",
                        channel.send_audio(target, &audio.bytes, &audio.mime, true),
                    )
                    .await;
                    if let Err(e) = sent {
                        warn!("voice note to {target} failed: {e}");
                    }
                }
            }
        }

        presence(channel, target, Presence::Paused).await;
        true
    }

    /// Send one plain text message, logging failures.
    pub(super) async fn send_plain(&self, channel_name: &str, target: &str, text: &str) -> bool {
        let Some(channel) = self.channels.get(channel_name) else {
            error!("no channel named {channel_name}");
            return false;
        };
        match send_text(channel.as_ref(), target, text).await {
            Ok(()) => true,
            Err(e) => {
                error!("failed to send message to {target}: {e}");
                false
            }
        }
    }
}
