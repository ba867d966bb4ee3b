//! Scalar values and element tags

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A single primitive value
///
/// Floats compare and hash by bit pattern, so `NaN` equals itself and
/// `0.0` differs from `-0.0`. This keeps `Scalar` usable as a set member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
}

/// Element type of a sequence or set, one per `Scalar` variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElemTag {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
}

impl Scalar {
    /// The element tag this scalar carries
    pub fn tag(&self) -> ElemTag {
        match self {
            Scalar::Null => ElemTag::Null,
            Scalar::Bool(_) => ElemTag::Bool,
            Scalar::Int(_) => ElemTag::Int,
            Scalar::Float(_) => ElemTag::Float,
            Scalar::Str(_) => ElemTag::Str,
            Scalar::Bytes(_) => ElemTag::Bytes,
        }
    }

    /// Parse a command-line token into the most specific scalar
    ///
    /// `null`, `true`/`false`, integers and floats are recognised;
    /// anything else becomes a string.
    pub fn parse_lossy(token: &str) -> Scalar {
        match token {
            "null" => return Scalar::Null,
            "true" => return Scalar::Bool(true),
            "false" => return Scalar::Bool(false),
            _ => {}
        }
        if let Ok(i) = token.parse::<i64>() {
            return Scalar::Int(i);
        }
        if let Ok(f) = token.parse::<f64>() {
            return Scalar::Float(f);
        }
        Scalar::Str(token.to_string())
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::Float(a), Scalar::Float(b)) => a.to_bits() == b.to_bits(),
            (Scalar::Str(a), Scalar::Str(b)) => a == b,
            (Scalar::Bytes(a), Scalar::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag().hash(state);
        match self {
            Scalar::Null => {}
            Scalar::Bool(b) => b.hash(state),
            Scalar::Int(i) => i.hash(state),
            Scalar::Float(f) => f.to_bits().hash(state),
            Scalar::Str(s) => s.hash(state),
            Scalar::Bytes(b) => b.hash(state),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{:?}", x),
            Scalar::Str(s) => write!(f, "{:?}", s),
            Scalar::Bytes(b) => {
                f.write_str("0x")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for ElemTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElemTag::Null => "null",
            ElemTag::Bool => "bool",
            ElemTag::Int => "int",
            ElemTag::Float => "float",
            ElemTag::Str => "string",
            ElemTag::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Conversions
// =============================================================================

macro_rules! scalar_from {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

scalar_from! {
    bool => |v| Scalar::Bool(v),
    i32 => |v| Scalar::Int(v as i64),
    i64 => |v| Scalar::Int(v),
    u32 => |v| Scalar::Int(v as i64),
    f64 => |v| Scalar::Float(v),
    String => |v| Scalar::Str(v),
    &str => |v| Scalar::Str(v.to_string()),
    Vec<u8> => |v| Scalar::Bytes(v),
}
