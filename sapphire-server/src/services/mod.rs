//! External collaborators: transcription API and SMTP mail

pub mod mailer;
pub mod transcription;
