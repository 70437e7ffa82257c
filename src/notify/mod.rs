//! Domain events and notification dispatch.
//!
//! Core operations never talk to a chat transport directly. After their
//! database transaction commits they emit a [`DomainEvent`] on an unbounded
//! channel; a [`Dispatcher`] task drains the channel, renders each event into
//! plain-text messages, and hands them to a [`Notifier`]. Delivery failures are
//! logged and dropped, so business state never depends on notification
//! delivery.

/// Discord delivery through the serenity HTTP client
pub mod discord;

use crate::{
    entities::{donation, help_request},
    errors::Result,
};
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub use discord::DiscordNotifier;

/// Something that happened in the core workflow that someone may want to hear about.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// A user filed a new help request
    HelpRequestSubmitted {
        /// The stored request
        request: help_request::Model,
    },
    /// A help request was approved and paid out
    HelpRequestApproved {
        /// The request after completion
        request: help_request::Model,
        /// Requester's notification channel, if linked
        requester_channel: Option<String>,
        /// Requester's balance after the credit
        new_balance: i64,
    },
    /// A help request was rejected
    HelpRequestRejected {
        /// The request after rejection
        request: help_request::Model,
        /// Requester's notification channel, if linked
        requester_channel: Option<String>,
    },
    /// A donation reached the fund
    DonationRecorded {
        /// The stored donation
        donation: donation::Model,
        /// Donor's notification channel, if linked
        donor_channel: Option<String>,
        /// Help requests still waiting for a decision
        pending_requests: u64,
        /// Fund balance after the donation
        fund_available: i64,
    },
}

impl DomainEvent {
    /// Short name used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::HelpRequestSubmitted { .. } => "HelpRequestSubmitted",
            Self::HelpRequestApproved { .. } => "HelpRequestApproved",
            Self::HelpRequestRejected { .. } => "HelpRequestRejected",
            Self::DonationRecorded { .. } => "DonationRecorded",
        }
    }
}

/// Receiving half of the event channel, owned by the dispatcher.
pub type EventReceiver = mpsc::UnboundedReceiver<DomainEvent>;

/// Cloneable handle the core uses to publish events.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<DomainEvent>,
}

impl EventSender {
    /// Publishes an event. Never fails: if nobody is listening the event is logged and dropped.
    pub fn emit(&self, event: DomainEvent) {
        let kind = event.kind();
        match self.tx.send(event) {
            Ok(()) => debug!("Emitted {} event", kind),
            Err(_) => warn!("Dropping {} event: dispatcher is not running", kind),
        }
    }
}

/// Creates a connected sender/receiver pair.
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, rx)
}

/// A chat transport able to deliver a text message to a channel.
pub trait Notifier: Send + Sync + 'static {
    /// Delivers `text` to `channel`.
    fn send(&self, channel: &str, text: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Notifier used when no chat transport is configured: messages only go to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn send(&self, channel: &str, text: &str) -> Result<()> {
        info!(channel, "notification: {}", text);
        Ok(())
    }
}

/// A rendered message waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    /// Destination channel id
    pub channel: String,
    /// Message body
    pub text: String,
}

impl Outbound {
    fn new(channel: &str, text: String) -> Self {
        Self {
            channel: channel.to_string(),
            text,
        }
    }
}

/// Formats a whole-unit amount with thousands separators, e.g. `45,000`.
#[must_use]
pub fn format_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Turns an event into the messages it should produce.
///
/// Requester/donor messages need a linked channel, admin messages need
/// `admin_channel`; anything without a destination is skipped.
#[must_use]
pub fn render(event: &DomainEvent, admin_channel: Option<&str>) -> Vec<Outbound> {
    let mut out = Vec::new();
    match event {
        DomainEvent::HelpRequestSubmitted { request } => {
            if let Some(admin) = admin_channel {
                let mut text = format!(
                    "🆘 New help request #{} from {} ({}) for {}\nReason: {}",
                    request.id,
                    request.user_name,
                    request.user_email,
                    format_amount(request.amount),
                    request.reason
                );
                if let Some(phone) = &request.phone {
                    text.push_str(&format!("\nPhone: {phone}"));
                }
                if let Some(handle) = &request.contact_handle {
                    text.push_str(&format!("\nContact: {handle}"));
                }
                out.push(Outbound::new(admin, text));
            }
        }
        DomainEvent::HelpRequestApproved {
            request,
            requester_channel,
            new_balance,
        } => {
            if let Some(channel) = requester_channel {
                out.push(Outbound::new(
                    channel,
                    format!(
                        "✅ Your help request #{} was approved. {} has been credited to your balance (now {}).",
                        request.id,
                        format_amount(request.amount),
                        format_amount(*new_balance)
                    ),
                ));
            }
            if let Some(admin) = admin_channel {
                out.push(Outbound::new(
                    admin,
                    format!(
                        "✅ Help request #{} for {} approved by {}: {} disbursed.",
                        request.id,
                        request.user_name,
                        request.approved_by.as_deref().unwrap_or("an admin"),
                        format_amount(request.amount)
                    ),
                ));
            }
        }
        DomainEvent::HelpRequestRejected {
            request,
            requester_channel,
        } => {
            if let Some(channel) = requester_channel {
                out.push(Outbound::new(
                    channel,
                    format!(
                        "❌ Your help request #{} was rejected. Reason: {}",
                        request.id,
                        request.rejection_reason.as_deref().unwrap_or("not specified")
                    ),
                ));
            }
        }
        DomainEvent::DonationRecorded {
            donation,
            donor_channel,
            pending_requests,
            fund_available,
        } => {
            if let Some(channel) = donor_channel {
                out.push(Outbound::new(
                    channel,
                    format!(
                        "💚 Thank you for your donation of {}!",
                        format_amount(donation.amount)
                    ),
                ));
            }
            if *pending_requests > 0 {
                if let Some(admin) = admin_channel {
                    out.push(Outbound::new(
                        admin,
                        format!(
                            "💰 New donation of {} received. {} help request(s) pending, {} available in the fund.",
                            format_amount(donation.amount),
                            pending_requests,
                            format_amount(*fund_available)
                        ),
                    ));
                }
            }
        }
    }
    out
}

/// Consumes domain events and delivers the resulting messages.
pub struct Dispatcher<N> {
    notifier: N,
    admin_channel: Option<String>,
}

impl<N: Notifier> Dispatcher<N> {
    /// Creates a dispatcher delivering through `notifier`.
    pub const fn new(notifier: N, admin_channel: Option<String>) -> Self {
        Self {
            notifier,
            admin_channel,
        }
    }

    /// Delivers every message for one event and returns how many were sent.
    ///
    /// Failed sends are logged and skipped.
    pub async fn dispatch(&self, event: &DomainEvent) -> usize {
        let mut delivered = 0;
        for message in render(event, self.admin_channel.as_deref()) {
            match self.notifier.send(&message.channel, &message.text).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    "Failed to deliver {} notification to {}: {}",
                    event.kind(),
                    message.channel,
                    e
                ),
            }
        }
        delivered
    }

    /// Runs until every [`EventSender`] has been dropped.
    pub async fn run(self, mut events: EventReceiver) {
        info!("Notification dispatcher started");
        while let Some(event) = events.recv().await {
            let delivered = self.dispatch(&event).await;
            debug!("{} event produced {} notification(s)", event.kind(), delivered);
        }
        info!("Notification dispatcher stopped");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::HelpStatus;
    use crate::errors::Error;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    /// Notifier that remembers everything it was asked to send.
    #[derive(Clone, Default)]
    pub struct RecordingNotifier {
        pub sent: Arc<Mutex<Vec<Outbound>>>,
    }

    impl Notifier for RecordingNotifier {
        async fn send(&self, channel: &str, text: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push(Outbound::new(channel, text.to_string()));
            Ok(())
        }
    }

    /// Notifier whose transport is always down.
    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        async fn send(&self, _channel: &str, _text: &str) -> Result<()> {
            Err(Error::Notification {
                message: "transport unavailable".to_string(),
            })
        }
    }

    fn sample_request(status: HelpStatus) -> help_request::Model {
        help_request::Model {
            id: 7,
            user_id: 3,
            user_name: "Maria".to_string(),
            user_email: "maria@example.com".to_string(),
            phone: Some("+998901234567".to_string()),
            contact_handle: None,
            reason: "Surgery".to_string(),
            amount: 45_000,
            status,
            approved_by: Some("Admin Ivan".to_string()),
            approved_at: None,
            completed_at: None,
            rejection_reason: None,
            active_slot: None,
            created_at: Utc::now(),
        }
    }

    fn sample_donation() -> donation::Model {
        donation::Model {
            id: 1,
            donor_id: 2,
            donor_name: Some("Ivan".to_string()),
            amount: 100_000,
            message: None,
            is_anonymous: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(45_000), "45,000");
        assert_eq!(format_amount(1_234_567), "1,234,567");
        assert_eq!(format_amount(-5_000), "-5,000");
    }

    #[test]
    fn test_render_submitted_goes_to_admin_only() {
        let event = DomainEvent::HelpRequestSubmitted {
            request: sample_request(HelpStatus::Pending),
        };
        let messages = render(&event, Some("admin"));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].channel, "admin");
        assert!(messages[0].text.contains("45,000"));
        assert!(messages[0].text.contains("+998901234567"));

        assert!(render(&event, None).is_empty());
    }

    #[test]
    fn test_render_approved_notifies_requester_and_admin() {
        let event = DomainEvent::HelpRequestApproved {
            request: sample_request(HelpStatus::Completed),
            requester_channel: Some("user-dm".to_string()),
            new_balance: 45_000,
        };
        let messages = render(&event, Some("admin"));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].channel, "user-dm");
        assert_eq!(messages[1].channel, "admin");
        assert!(messages[1].text.contains("Admin Ivan"));
    }

    #[test]
    fn test_render_rejected_without_channel_is_silent() {
        let event = DomainEvent::HelpRequestRejected {
            request: sample_request(HelpStatus::Rejected),
            requester_channel: None,
        };
        assert!(render(&event, Some("admin")).is_empty());
    }

    #[test]
    fn test_render_donation_alerts_admin_only_with_pending_requests() {
        let with_pending = DomainEvent::DonationRecorded {
            donation: sample_donation(),
            donor_channel: Some("donor-dm".to_string()),
            pending_requests: 2,
            fund_available: 100_000,
        };
        let messages = render(&with_pending, Some("admin"));
        assert_eq!(messages.len(), 2);
        assert!(messages[1].text.contains("2 help request(s) pending"));

        let without_pending = DomainEvent::DonationRecorded {
            donation: sample_donation(),
            donor_channel: Some("donor-dm".to_string()),
            pending_requests: 0,
            fund_available: 100_000,
        };
        let messages = render(&without_pending, Some("admin"));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].channel, "donor-dm");
    }

    #[tokio::test]
    async fn test_dispatch_swallows_delivery_failures() {
        let dispatcher = Dispatcher::new(FailingNotifier, Some("admin".to_string()));
        let event = DomainEvent::HelpRequestSubmitted {
            request: sample_request(HelpStatus::Pending),
        };
        assert_eq!(dispatcher.dispatch(&event).await, 0);
    }

    #[tokio::test]
    async fn test_run_drains_channel_until_senders_drop() {
        let notifier = RecordingNotifier::default();
        let dispatcher = Dispatcher::new(notifier.clone(), Some("admin".to_string()));
        let (events, rx) = channel();

        events.emit(DomainEvent::HelpRequestSubmitted {
            request: sample_request(HelpStatus::Pending),
        });
        events.emit(DomainEvent::HelpRequestRejected {
            request: sample_request(HelpStatus::Rejected),
            requester_channel: Some("user-dm".to_string()),
        });
        drop(events);

        dispatcher.run(rx).await;

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].channel, "admin");
        assert_eq!(sent[1].channel, "user-dm");
    }

    #[test]
    fn test_emit_without_dispatcher_does_not_fail() {
        let (events, rx) = channel();
        drop(rx);
        events.emit(DomainEvent::HelpRequestSubmitted {
            request: sample_request(HelpStatus::Pending),
        });
    }
}
