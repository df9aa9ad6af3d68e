//! Plugin implementations shipped with the adapters.

mod declarative;

pub use declarative::{DeclarativePlugin, FileAction, substitute};
