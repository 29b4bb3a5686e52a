pub mod phone;
pub mod time;
pub mod token;
