//! The value stored under a single key, with its type dispatch

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ElemTag, Scalar, Shape, ShapeError};

/// A value held by the store
///
/// `Sequence` and `Set` carry their element tag explicitly so the shape
/// survives a snapshot round-trip even when the collection is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Scalar(Scalar),
    Sequence { elem: ElemTag, items: Vec<Scalar> },
    Set { elem: ElemTag, members: HashSet<Scalar> },
}

/// Element tag shared by every item, or `None` for an empty slice
pub fn uniform_tag(items: &[Scalar]) -> Result<Option<ElemTag>, ShapeError> {
    let Some(first) = items.first() else {
        return Ok(None);
    };
    let expected = first.tag();
    for item in &items[1..] {
        check_tag(expected, item)?;
    }
    Ok(Some(expected))
}

fn check_tag(expected: ElemTag, item: &Scalar) -> Result<(), ShapeError> {
    let found = item.tag();
    if found != expected {
        return Err(ShapeError::ElementType { expected, found });
    }
    Ok(())
}

impl Value {
    /// Build a sequence, checking every item against `elem`
    pub fn sequence(elem: ElemTag, items: Vec<Scalar>) -> Result<Self, ShapeError> {
        for item in &items {
            check_tag(elem, item)?;
        }
        Ok(Value::Sequence { elem, items })
    }

    /// Build a set, checking every member against `elem`
    pub fn set<I>(elem: ElemTag, members: I) -> Result<Self, ShapeError>
    where
        I: IntoIterator<Item = Scalar>,
    {
        let mut set = HashSet::new();
        for member in members {
            check_tag(elem, &member)?;
            set.insert(member);
        }
        Ok(Value::Set { elem, members: set })
    }

    pub fn shape(&self) -> Shape {
        match self {
            Value::Scalar(_) => Shape::Scalar,
            Value::Sequence { .. } => Shape::Sequence,
            Value::Set { .. } => Shape::Set,
        }
    }

    /// Element tag of a sequence or set
    pub fn elem_tag(&self) -> Option<ElemTag> {
        match self {
            Value::Scalar(_) => None,
            Value::Sequence { elem, .. } | Value::Set { elem, .. } => Some(*elem),
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Scalar]> {
        match self {
            Value::Sequence { items, .. } => Some(items),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&HashSet<Scalar>> {
        match self {
            Value::Set { members, .. } => Some(members),
            _ => None,
        }
    }

    /// Verify that every element matches the declared element tag
    ///
    /// Values built through the public enum variants (or decoded from
    /// untrusted bytes) may violate this; the store refuses them.
    pub fn check(&self) -> Result<(), ShapeError> {
        match self {
            Value::Scalar(_) => Ok(()),
            Value::Sequence { elem, items } => items.iter().try_for_each(|i| check_tag(*elem, i)),
            Value::Set { elem, members } => members.iter().try_for_each(|m| check_tag(*elem, m)),
        }
    }

    /// Append already-validated items of type `elem` to a sequence
    ///
    /// Leaves `self` untouched on error. Returns the new length.
    pub fn extend_sequence(
        &mut self,
        elem: ElemTag,
        new_items: Vec<Scalar>,
    ) -> Result<usize, ShapeError> {
        match self {
            Value::Sequence { elem: established, items } => {
                if *established != elem {
                    return Err(ShapeError::ElementType {
                        expected: *established,
                        found: elem,
                    });
                }
                items.extend(new_items);
                Ok(items.len())
            }
            other => Err(ShapeError::Shape {
                expected: Shape::Sequence,
                found: other.shape(),
            }),
        }
    }

    /// Insert a member into a set
    ///
    /// Returns `true` if the member was newly added.
    pub fn insert_member(&mut self, member: Scalar) -> Result<bool, ShapeError> {
        match self {
            Value::Set { elem, members } => {
                check_tag(*elem, &member)?;
                Ok(members.insert(member))
            }
            other => Err(ShapeError::Shape {
                expected: Shape::Set,
                found: other.shape(),
            }),
        }
    }

    /// Test set membership
    ///
    /// A candidate of a different element type is simply not a member.
    pub fn contains_member(&self, member: &Scalar) -> Result<bool, ShapeError> {
        match self {
            Value::Set { members, .. } => Ok(members.contains(member)),
            other => Err(ShapeError::Shape {
                expected: Shape::Set,
                found: other.shape(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(s) => write!(f, "{}", s),
            Value::Sequence { items, .. } => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Set { members, .. } => {
                let mut rendered: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                rendered.sort();
                write!(f, "{{{}}}", rendered.join(", "))
            }
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

macro_rules! value_from_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Scalar(Scalar::from(v))
                }
            }
        )*
    };
}

value_from_scalar!(bool, i32, i64, u32, f64, String, &str, Vec<u8>);
