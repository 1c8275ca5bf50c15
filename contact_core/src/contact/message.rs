//! Message composition with HTML escaping of submitter text

use super::payload::SubmissionPayload;
use crate::mail::{MailSettings, OutgoingMail};

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn subject_for(name: &str) -> String {
    format!("New contact form submission from {}", name)
}

pub fn plain_body(payload: &SubmissionPayload) -> String {
    format!(
        "Name: {}\nEmail: {}\n\n{}",
        payload.name, payload.email, payload.message
    )
}

/// Markup body. Line breaks become `<br/>` only after escaping.
pub fn html_body(payload: &SubmissionPayload) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; line-height:1.6;">
  <h2>New Contact Message</h2>
  <p><strong>Name:</strong> {name}</p>
  <p><strong>Email:</strong> {email}</p>
  <p><strong>Message:</strong></p>
  <p>{message}</p>
</div>
"#,
        name = escape_html(&payload.name),
        email = escape_html(&payload.email),
        message = escape_html(&payload.message).replace('\n', "<br/>"),
    )
}

pub fn compose(payload: &SubmissionPayload, settings: &MailSettings) -> OutgoingMail {
    OutgoingMail {
        from: settings.from.clone(),
        to: settings.to.clone(),
        reply_to: payload.email.clone(),
        subject: subject_for(&payload.name),
        text: plain_body(payload),
        html: html_body(payload),
    }
}
