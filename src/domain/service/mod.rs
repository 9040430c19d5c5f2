pub mod quota_validation;
pub mod reset_window;

pub use reset_window::ResetWindow;
