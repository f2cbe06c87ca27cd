use log::{info, warn};

use crate::{
    config::ChannelMode,
    error::NotifyError,
    extract::ClassRecord,
    metrics::{Metrics, timed},
    requests::RequestClient,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub channel_url: String,
    pub body: String,
}

impl NotificationMessage {
    pub fn new(channel_url: &str, class: &ClassRecord) -> Self {
        Self {
            channel_url: channel_url.to_string(),
            body: format!("Class: {}, Rooms: {}", class.name, class.rooms.join(", ")),
        }
    }
}

pub fn channel_url(base_url: &str, secret: &str, person_name: &str, mode: ChannelMode) -> String {
    match mode {
        ChannelMode::PerPerson => format!("{base_url}/{secret}-{person_name}"),
        ChannelMode::Shared => format!("{base_url}/{secret}"),
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

async fn post_message(
    client: &RequestClient,
    message: &NotificationMessage,
) -> Result<(), NotifyError> {
    let response = client
        .notification_post(&message.channel_url)
        .body(message.body.clone().into_bytes())
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(NotifyError::Status(status));
    }
    Ok(())
}

async fn deliver_all(
    client: &RequestClient,
    messages: &[NotificationMessage],
    metrics: &dyn Metrics,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    // A failed message doesn't stop the ones after it.
    for message in messages {
        match post_message(client, message).await {
            Ok(()) => {
                metrics.incr("notification.sent");
                report.sent += 1;
            }
            Err(e) => {
                metrics.incr("notification.failure");
                warn!("Notification failed: {e}");
                report.failed += 1;
            }
        }
    }
    report
}

/// Posts one message per class to the person's channel.
pub async fn send_notifications(
    client: &RequestClient,
    classes: &[ClassRecord],
    channel_url: &str,
    metrics: &dyn Metrics,
) -> DeliveryReport {
    let messages: Vec<_> = classes
        .iter()
        .map(|class| NotificationMessage::new(channel_url, class))
        .collect();
    let report = timed(
        metrics,
        "send_notifications",
        deliver_all(client, &messages, metrics),
    )
    .await;
    info!(
        "Sent {} of {} notifications",
        report.sent,
        messages.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_joins_rooms_with_comma() {
        let class = ClassRecord {
            name: "Algorithms101".to_string(),
            rooms: vec!["12 [30 Cap]".to_string(), "4 [8 Cap]".to_string()],
        };
        let message = NotificationMessage::new("https://ntfy.sh/k-Ada", &class);
        assert_eq!(message.body, "Class: Algorithms101, Rooms: 12 [30 Cap], 4 [8 Cap]");
    }

    #[test]
    fn message_without_rooms() {
        let class = ClassRecord {
            name: "Ethics".to_string(),
            rooms: vec![],
        };
        let message = NotificationMessage::new("https://ntfy.sh/k-Ada", &class);
        assert_eq!(message.body, "Class: Ethics, Rooms: ");
    }

    #[test]
    fn channel_per_person_and_shared() {
        assert_eq!(
            channel_url("https://ntfy.sh", "k", "Ada", ChannelMode::PerPerson),
            "https://ntfy.sh/k-Ada"
        );
        assert_eq!(
            channel_url("https://ntfy.sh", "k", "Ada", ChannelMode::Shared),
            "https://ntfy.sh/k"
        );
    }
}
