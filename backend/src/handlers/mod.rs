pub mod forward;
pub mod history;
pub mod system;
