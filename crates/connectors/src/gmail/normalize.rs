//! Gmail API response normalization
//!
//! Converts Gmail API messages to the conversation model.

use anyhow::{Context, Result};
use base64::prelude::*;
use log::warn;

use super::api::{GmailMessage, MessagePart, MessagePayload};
use crate::error::ConnectorError;
use crate::models::{Email, MessageRecipient, MessageSender};

/// Header fields and body pulled out of a Gmail message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub id: String,
    /// `internalDate`, milliseconds since epoch
    pub timestamp: String,
    /// Raw `From` header
    pub sender: String,
    /// `To` header split into individual addresses
    pub recipients: Vec<String>,
    pub subject: String,
    /// `Subject:` line followed by the plain text body
    pub content: String,
}

/// Extract sender, recipients, subject and plain text content
pub fn parse_message(gmail_msg: GmailMessage) -> Result<ParsedMessage> {
    let payload = gmail_msg
        .payload
        .as_ref()
        .ok_or_else(|| ConnectorError::MissingPayload(gmail_msg.id.clone()))?;

    let sender = extract_header(payload, "From")
        .ok_or_else(|| ConnectorError::MissingSender(gmail_msg.id.clone()))?;

    let recipients = extract_header(payload, "To")
        .map(|s| split_recipients(&s))
        .unwrap_or_default();

    let subject = extract_header(payload, "Subject").unwrap_or_default();

    let mut content = format!("Subject:{}", subject);
    match extract_plain_text_body(payload) {
        Ok(Some(body)) => content.push_str(&body),
        Ok(None) => {}
        Err(e) => warn!("Message {}: dropping undecodable body: {:#}", gmail_msg.id, e),
    }

    Ok(ParsedMessage {
        timestamp: gmail_msg.internal_date.clone().unwrap_or_default(),
        id: gmail_msg.id,
        sender,
        recipients,
        subject,
        content,
    })
}

/// Map a parsed message onto the shared [`Email`] model
pub fn map_message_to_email(msg: ParsedMessage) -> Email {
    Email {
        id: msg.id,
        sender: MessageSender::new(msg.sender),
        recipients: msg
            .recipients
            .into_iter()
            .map(MessageRecipient::user)
            .collect(),
        content: msg.content,
        timestamp: msg.timestamp,
    }
}

/// Extract a header value by name
fn extract_header(payload: &MessagePayload, name: &str) -> Option<String> {
    payload.headers.as_ref()?.iter().find_map(|h| {
        if h.name.eq_ignore_ascii_case(name) {
            Some(h.value.clone())
        } else {
            None
        }
    })
}

/// Split a `To` header ("a@abc.com, b@def.com") into addresses
fn split_recipients(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_plain_text(mime_type: Option<&String>) -> bool {
    mime_type.is_some_and(|m| m.eq_ignore_ascii_case("text/plain"))
}

/// Decode the first text/plain body in the payload
fn extract_plain_text_body(payload: &MessagePayload) -> Result<Option<String>> {
    // Single-part message
    if is_plain_text(payload.mime_type.as_ref())
        && let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref())
    {
        return decode_body_data(data).map(Some);
    }

    match payload.parts.as_deref().and_then(find_plain_text_in_parts) {
        Some(data) => decode_body_data(data).map(Some),
        None => Ok(None),
    }
}

/// Depth-first search for the first text/plain part carrying data
fn find_plain_text_in_parts(parts: &[MessagePart]) -> Option<&str> {
    for part in parts {
        if is_plain_text(part.mime_type.as_ref())
            && let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref())
        {
            return Some(data);
        }

        if let Some(nested) = &part.parts
            && let Some(data) = find_plain_text_in_parts(nested)
        {
            return Some(data);
        }
    }

    None
}

/// Decode base64 body data
///
/// Gmail uses URL-safe base64 but padding can be missing or wrong, so
/// trailing `=` are stripped and the input re-padded to a multiple of 4.
/// Invalid UTF-8 is replaced rather than rejected.
pub fn decode_body_data(data: &str) -> Result<String> {
    let trimmed = data.trim_end_matches('=');
    let mut padded = String::with_capacity(trimmed.len() + 3);
    padded.push_str(trimmed);
    while padded.len() % 4 != 0 {
        padded.push('=');
    }

    let bytes = BASE64_URL_SAFE
        .decode(&padded)
        .or_else(|_| BASE64_STANDARD.decode(&padded))
        .context("Message body is not valid base64")?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::api::{Header, MessageBody};
    use crate::models::MessageRecipientType;

    fn encode(text: &str) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(text)
    }

    fn body(data: Option<String>) -> Option<MessageBody> {
        Some(MessageBody {
            size: data.as_ref().map(|d| d.len() as u32),
            data,
        })
    }

    fn part(mime: &str, data: Option<String>, parts: Option<Vec<MessagePart>>) -> MessagePart {
        MessagePart {
            part_id: None,
            mime_type: Some(mime.to_string()),
            filename: None,
            headers: None,
            body: body(data),
            parts,
        }
    }

    fn make_payload(headers: Vec<(&str, &str)>, parts: Option<Vec<MessagePart>>) -> MessagePayload {
        MessagePayload {
            headers: Some(
                headers
                    .into_iter()
                    .map(|(n, v)| Header {
                        name: n.to_string(),
                        value: v.to_string(),
                    })
                    .collect(),
            ),
            body: body(None),
            parts,
            mime_type: Some("multipart/alternative".to_string()),
        }
    }

    fn make_message(payload: Option<MessagePayload>) -> GmailMessage {
        GmailMessage {
            id: "msg-1".to_string(),
            thread_id: Some("thread-1".to_string()),
            label_ids: None,
            snippet: None,
            internal_date: Some("1700000000000".to_string()),
            payload,
        }
    }

    #[test]
    fn test_extract_header_case_insensitive() {
        let payload = make_payload(vec![("FROM", "test@example.com")], None);
        assert_eq!(
            extract_header(&payload, "from"),
            Some("test@example.com".to_string())
        );
        assert_eq!(extract_header(&payload, "Cc"), None);
    }

    #[test]
    fn test_split_recipients() {
        let recipients = split_recipients("a@abc.com, Bob <b@def.com>,c@ghi.com, ");
        assert_eq!(recipients, vec!["a@abc.com", "Bob <b@def.com>", "c@ghi.com"]);
    }

    #[test]
    fn test_decode_padding_correction() {
        for text in ["H", "Hi", "Hi!", "Hi!!", "Hello, World!"] {
            let unpadded = encode(text);
            assert_eq!(decode_body_data(&unpadded).unwrap(), text);

            let padded = BASE64_URL_SAFE.encode(text);
            assert_eq!(decode_body_data(&padded).unwrap(), text);

            let over_padded = format!("{}====", unpadded);
            assert_eq!(decode_body_data(&over_padded).unwrap(), text);
        }
    }

    #[test]
    fn test_decode_url_safe_alphabet() {
        // 0xfb 0xff encodes to "-_8" in the URL-safe alphabet
        let data = BASE64_URL_SAFE_NO_PAD.encode([0xfbu8, 0xff]);
        assert_eq!(data, "-_8");
        assert!(decode_body_data(&data).is_ok());
    }

    #[test]
    fn test_decode_standard_alphabet_fallback() {
        let data = BASE64_STANDARD.encode("subjects?>>");
        assert_eq!(decode_body_data(&data).unwrap(), "subjects?>>");
    }

    #[test]
    fn test_decode_invalid() {
        assert!(decode_body_data("a").is_err());
        assert!(decode_body_data("!!!!").is_err());
    }

    #[test]
    fn test_parse_message_fields() {
        let payload = make_payload(
            vec![
                ("From", "Alice <alice@example.com>"),
                ("To", "bob@example.com, carol@example.com"),
                ("Subject", "Lunch"),
            ],
            Some(vec![
                part("text/html", Some(encode("<p>Noon?</p>")), None),
                part("text/plain", Some(encode("Noon?")), None),
            ]),
        );

        let parsed = parse_message(make_message(Some(payload))).unwrap();
        assert_eq!(parsed.id, "msg-1");
        assert_eq!(parsed.timestamp, "1700000000000");
        assert_eq!(parsed.sender, "Alice <alice@example.com>");
        assert_eq!(parsed.recipients, vec!["bob@example.com", "carol@example.com"]);
        assert_eq!(parsed.subject, "Lunch");
        assert_eq!(parsed.content, "Subject:LunchNoon?");
    }

    #[test]
    fn test_first_plain_text_part_wins() {
        let payload = make_payload(
            vec![("From", "a@example.com"), ("Subject", "S")],
            Some(vec![
                part(
                    "multipart/alternative",
                    None,
                    Some(vec![part("text/plain", Some(encode("nested")), None)]),
                ),
                part("text/plain", Some(encode("second")), None),
            ]),
        );

        let parsed = parse_message(make_message(Some(payload))).unwrap();
        assert_eq!(parsed.content, "Subject:Snested");
    }

    #[test]
    fn test_single_part_body() {
        let mut payload = make_payload(vec![("From", "a@example.com"), ("Subject", "S")], None);
        payload.mime_type = Some("text/plain".to_string());
        payload.body = body(Some(encode("plain body")));

        let parsed = parse_message(make_message(Some(payload))).unwrap();
        assert_eq!(parsed.content, "Subject:Splain body");
    }

    #[test]
    fn test_missing_subject_and_body() {
        let payload = make_payload(vec![("From", "a@example.com")], None);
        let parsed = parse_message(make_message(Some(payload))).unwrap();
        assert_eq!(parsed.subject, "");
        assert_eq!(parsed.content, "Subject:");
        assert!(parsed.recipients.is_empty());
    }

    #[test]
    fn test_undecodable_body_keeps_subject() {
        let payload = make_payload(
            vec![("From", "a@example.com"), ("Subject", "S")],
            Some(vec![part("text/plain", Some("!!!!".to_string()), None)]),
        );
        let parsed = parse_message(make_message(Some(payload))).unwrap();
        assert_eq!(parsed.content, "Subject:S");
    }

    #[test]
    fn test_missing_sender_is_error() {
        let payload = make_payload(vec![("Subject", "S")], None);
        let err = parse_message(make_message(Some(payload))).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConnectorError>(),
            Some(ConnectorError::MissingSender(id)) if id == "msg-1"
        ));
    }

    #[test]
    fn test_missing_payload_is_error() {
        let err = parse_message(make_message(None)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConnectorError>(),
            Some(ConnectorError::MissingPayload(_))
        ));
    }

    #[test]
    fn test_map_message_to_email() {
        let email = map_message_to_email(ParsedMessage {
            id: "m1".to_string(),
            timestamp: "42".to_string(),
            sender: "a@example.com".to_string(),
            recipients: vec!["b@example.com".to_string(), "c@example.com".to_string()],
            subject: "Hi".to_string(),
            content: "Subject:Hi".to_string(),
        });

        assert_eq!(email.id, "m1");
        assert_eq!(email.sender.id, "a@example.com");
        assert_eq!(email.recipients.len(), 2);
        assert!(
            email
                .recipients
                .iter()
                .all(|r| r.message_recipient_type == MessageRecipientType::User)
        );
        assert_eq!(email.recipients[1].id, "c@example.com");
        assert_eq!(email.content, "Subject:Hi");
        assert_eq!(email.timestamp, "42");
    }
}
