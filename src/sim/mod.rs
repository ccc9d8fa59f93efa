pub mod invocation;
pub use invocation::{Invocation, RunOutput};
