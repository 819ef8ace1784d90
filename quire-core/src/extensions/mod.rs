//! Built-in extensions.

pub mod core;
pub mod floats;

pub use self::core::CoreExtension;
pub use self::floats::{Float, FloatsExtension};
