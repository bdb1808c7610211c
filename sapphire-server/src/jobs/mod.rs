//! Background jobs

pub mod reminders;
