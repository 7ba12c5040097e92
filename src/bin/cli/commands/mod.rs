pub mod conversations;
pub mod settings;
