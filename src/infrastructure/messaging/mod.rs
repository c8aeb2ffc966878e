pub mod dry_run;
pub mod email;
pub mod whatsapp;
