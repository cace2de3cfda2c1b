pub mod history;
pub mod journal;
pub mod json;
