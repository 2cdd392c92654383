pub mod artifacts;
pub mod console;
pub mod utils;
