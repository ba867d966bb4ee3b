//! Value Module
//!
//! The dynamically-typed values held by the store.
//!
//! ## Shapes
//! Every key holds exactly one of three shapes:
//! - **Scalar**: a single primitive (`Null`, `Bool`, `Int`, `Float`, `Str`, `Bytes`)
//! - **Sequence**: an ordered list of scalars sharing one element type
//! - **Set**: an unordered collection of unique scalars sharing one element type
//!
//! The element type of a sequence or set is fixed by the first write that
//! creates it and is checked on every later `append` / `set_add`.

mod cell;
mod scalar;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cell::{uniform_tag, Value};
pub use scalar::{ElemTag, Scalar};

/// The three shapes a value can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Scalar,
    Sequence,
    Set,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Scalar => "scalar",
            Shape::Sequence => "sequence",
            Shape::Set => "set",
        };
        f.write_str(name)
    }
}

/// Why a mutation was refused by the type dispatch
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ShapeError {
    #[error("expected a {expected} value, found a {found}")]
    Shape { expected: Shape, found: Shape },

    #[error("expected {expected} elements, found {found}")]
    ElementType { expected: ElemTag, found: ElemTag },
}
