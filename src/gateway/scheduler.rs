//! Reminder delivery.

use super::Gateway;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

impl Gateway {
    /// Background task: deliver due reminders every poll interval.
    pub(super) async fn scheduler_loop(self: Arc<Self>) {
        let every = Duration::from_secs(self.config.scheduler.poll_interval_secs.max(1));
        loop {
            tokio::time::sleep(every).await;
            self.deliver_due_reminders(Utc::now().timestamp_millis())
                .await;
        }
    }

    /// Send every reminder due at `now`. Returns how many went out.
    ///
    /// A failed send leaves the reminder pending for the next poll.
    pub async fn deliver_due_reminders(&self, now: i64) -> usize {
        let due = match self.store.due_reminders(now).await {
            Ok(due) => due,
            Err(e) => {
                error!("scheduler: failed to load due reminders: {e}");
                return 0;
            }
        };

        let mut sent = 0;
        for reminder in &due {
            if self.channels.contains_key(&reminder.channel) {
                let text = format!("⏰ reminder: {}", reminder.text);
                if !self
                    .send_plain(&reminder.channel, &reminder.chat_id, &text)
                    .await
                {
                    continue;
                }
                info!("scheduler: delivered reminder {} to {}", reminder.id, reminder.contact_id);
                sent += 1;
            } else {
                warn!(
                    "scheduler: reminder {} targets unknown channel {}, discarding",
                    reminder.id, reminder.channel
                );
            }

            if let Err(e) = self.store.mark_reminder_delivered(reminder.id).await {
                error!("scheduler: failed to mark reminder {} delivered: {e}", reminder.id);
            }
        }
        sent
    }
}
