pub mod application;

pub use application::{AppContext, AppContextBuilder, ContextRef};
