//! Inbound helpdesk webhooks
//!
//! Each adapter only translates a vendor payload into a [`NewTicket`]; the
//! usual intake validation decides whether the ticket is accepted.

use copilot_core::{NewTicket, TicketSource};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const INTERCOM_DEFAULT_SUBJECT: &str = "Support Request";

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct WebhookUser {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct ZendeskTicket {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub requester: WebhookUser,
}

/// `{"ticket": {"subject", "description", "requester": {"email", "name"}}}`
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct ZendeskPayload {
    pub ticket: ZendeskTicket,
}

impl From<ZendeskPayload> for NewTicket {
    fn from(payload: ZendeskPayload) -> Self {
        let ticket = payload.ticket;
        NewTicket {
            customer_email: ticket.requester.email.unwrap_or_default(),
            customer_name: ticket.requester.name,
            subject: ticket.subject.unwrap_or_default(),
            description: ticket.description.unwrap_or_default(),
            order_id: None,
            source: Some(TicketSource::Zendesk.to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct IntercomMessage {
    pub subject: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct IntercomItem {
    pub conversation_message: IntercomMessage,
    pub user: WebhookUser,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct IntercomData {
    pub item: IntercomItem,
}

/// `{"data": {"item": {"conversation_message": {"body"}, "user": {"email", "name"}}}}`
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct IntercomPayload {
    #[serde(rename = "type")]
    pub topic: Option<String>,
    pub data: IntercomData,
}

impl From<IntercomPayload> for NewTicket {
    fn from(payload: IntercomPayload) -> Self {
        let item = payload.data.item;
        let subject = item
            .conversation_message
            .subject
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| INTERCOM_DEFAULT_SUBJECT.to_string());
        NewTicket {
            customer_email: item.user.email.unwrap_or_default(),
            customer_name: item.user.name,
            subject,
            description: item.conversation_message.body.unwrap_or_default(),
            order_id: None,
            source: Some(TicketSource::Intercom.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zendesk_translation() {
        let payload: ZendeskPayload = serde_json::from_str(
            r#"{"ticket": {"id": 123, "subject": "Help needed", "description": "I can't login",
                "requester": {"email": "user@example.com", "name": "User Name"}}}"#,
        )
        .unwrap();
        let ticket = NewTicket::from(payload);
        assert_eq!(ticket.customer_email, "user@example.com");
        assert_eq!(ticket.customer_name.as_deref(), Some("User Name"));
        assert_eq!(ticket.subject, "Help needed");
        assert_eq!(ticket.source.as_deref(), Some("zendesk"));
    }

    #[test]
    fn test_intercom_default_subject() {
        let payload: IntercomPayload = serde_json::from_str(
            r#"{"type": "conversation.created", "data": {"item": {"id": "456",
                "conversation_message": {"body": "I need help with my order"},
                "user": {"email": "user@example.com"}}}}"#,
        )
        .unwrap();
        let ticket = NewTicket::from(payload);
        assert_eq!(ticket.subject, INTERCOM_DEFAULT_SUBJECT);
        assert_eq!(ticket.description, "I need help with my order");
        assert_eq!(ticket.source.as_deref(), Some("intercom"));
    }

    #[test]
    fn test_missing_fields_become_empty() {
        let ticket = NewTicket::from(ZendeskPayload::default());
        assert!(ticket.customer_email.is_empty());
        assert!(ticket.subject.is_empty());
    }
}
