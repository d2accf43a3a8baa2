//! Pack classes, instances and the invocation wrapper.

mod args;
mod class;
mod native;
mod script;
mod wrapper;

pub use args::{parameters_schema, validate_args};
pub use class::{EntryPoint, InitContext, NO_LLM_REPLY, NameAttribute, PackClass, PackInstance};
pub use native::NativeClass;
pub use script::{ScriptClass, ScriptMethod};
pub use wrapper::PackWrapper;
