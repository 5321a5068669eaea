pub mod holiday;
pub mod message;
pub mod template;
