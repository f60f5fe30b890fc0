pub mod lifecycle;
pub mod traits;

pub use lifecycle::ContextState;
pub use traits::{ContextAware, DisposableObject, InitializingObject, ManagedObject};
