pub mod candidates;
pub mod error;
pub mod saved;
pub mod scanner;
pub mod scoring;
pub mod selector;
pub mod wakeup;
