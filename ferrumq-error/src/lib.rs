//! Error stack shared by the ferrumq crates: typed domain errors, their
//! status codes and the context-carrying [`StackError`].

pub mod ext;
pub mod macros;
pub mod stack;
pub mod status_code;
pub mod types;

pub use ext::*;
pub use macros::*;
pub use stack::*;
pub use status_code::*;
pub use types::*;

pub type FerrumResult<T> = Result<T, StackError>;
