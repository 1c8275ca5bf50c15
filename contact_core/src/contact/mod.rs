//! The submission gate: validation, composition and dispatch of contact messages

pub mod gate;
pub mod message;
pub mod payload;

pub use gate::SubmissionGate;
pub use message::{compose, escape_html};
pub use payload::{validate, ContactForm, SubmissionPayload};
