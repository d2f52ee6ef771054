pub mod chat;
pub mod functions_cmd;
pub mod onboard;
