pub mod import;
pub mod user;

pub use import::*;
pub use user::*;
