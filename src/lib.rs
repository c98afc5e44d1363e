pub mod core;
pub mod utils;

// Re-export everything from core for ergonomic library use
// Users can write `inframate::runner` instead of `inframate::core::runner`
pub use self::core::*;
pub use self::utils::*;
