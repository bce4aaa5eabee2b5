pub mod commands;
pub mod terminal;
pub mod typing;

pub use terminal::TerminalUI;
