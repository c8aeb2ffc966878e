pub mod get_message;
pub mod schedule_message;
