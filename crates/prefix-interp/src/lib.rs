// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Tree-walk interpreter for the Prefix language.
//!
//! Executes the AST directly without compilation.

mod builtins;
mod env;
mod error;
mod interp;
mod value;

pub use env::{EnvError, Environment};
pub use error::{RuntimeDiagnostic, RuntimeError};
pub use interp::{values_equal, Interpreter};
pub use value::{Closure, MapKey, PrefixMap, Tensor, ThreadControl, ThreadHandle, Value};
