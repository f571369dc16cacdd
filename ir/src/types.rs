//! Identifier, port and attribute types shared across the IR.
//!
//! Ports carry their direction in the type: an [`InPort`] can only ever be a
//! consumer and an [`OutPort`] can only ever be a producer, so the graph API
//! never has to check direction at run time.

use std::collections::BTreeMap;
use std::fmt;

/// Stable identifier of a node.
///
/// Ids are allocated monotonically and never reused, so ordering by id is the
/// graph's node-creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[display("n{_0}")]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Raw numeric value of this id.
    pub const fn raw(self) -> u32 {
        self.0
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }

    /// In-port `index` of this node.
    pub const fn input(self, index: usize) -> InPort {
        InPort { node: self, index }
    }

    /// Out-port `index` of this node.
    pub const fn output(self, index: usize) -> OutPort {
        OutPort { node: self, index }
    }
}

/// Consuming end of a data-flow edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[display("{node}.in{index}")]
pub struct InPort {
    pub node: NodeId,
    pub index: usize,
}

impl InPort {
    pub const fn new(node: NodeId, index: usize) -> Self {
        Self { node, index }
    }
}

/// Producing end of a data-flow edge. May fan out to any number of in-ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[display("{node}.out{index}")]
pub struct OutPort {
    pub node: NodeId,
    pub index: usize,
}

impl OutPort {
    pub const fn new(node: NodeId, index: usize) -> Self {
        Self { node, index }
    }
}

/// Kind tag of an [`AttrValue`], used by operator schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum AttrKind {
    Int,
    Float,
    Bool,
    Str,
    Ints,
    Floats,
}

/// Attribute value stored on a node.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
}

/// Attribute mapping of a node. Keys are unique and iterate in sorted order.
pub type Attributes = BTreeMap<String, AttrValue>;

impl AttrValue {
    pub fn kind(&self) -> AttrKind {
        match self {
            Self::Int(_) => AttrKind::Int,
            Self::Float(_) => AttrKind::Float,
            Self::Bool(_) => AttrKind::Bool,
            Self::Str(_) => AttrKind::Str,
            Self::Ints(_) => AttrKind::Ints,
            Self::Floats(_) => AttrKind::Floats,
        }
    }

    /// Numeric view of scalar values. Integers are widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "]")
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
            Self::Ints(v) => write_list(f, v),
            Self::Floats(v) => write_list(f, v),
        }
    }
}

macro_rules! impl_attr_from {
    ($($ty:ty => $variant:ident $(as $cast:ty)?),* $(,)?) => {
        $(
            impl From<$ty> for AttrValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value $(as $cast)?)
                }
            }
        )*
    };
}

impl_attr_from! {
    i64 => Int,
    i32 => Int as i64,
    usize => Int as i64,
    f64 => Float,
    bool => Bool,
    String => Str,
    Vec<i64> => Ints,
    Vec<f64> => Floats,
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

/// Build an [`Attributes`] map from `key => value` pairs.
///
/// ```
/// use splice_ir::{AttrValue, attrs};
///
/// let attrs = attrs! { "eps" => 1e-6, "across_channels" => 0 };
/// assert_eq!(attrs["across_channels"], AttrValue::Int(0));
/// ```
#[macro_export]
macro_rules! attrs {
    () => {
        $crate::Attributes::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut attrs = $crate::Attributes::new();
        $(
            attrs.insert(::std::string::String::from($key), $crate::AttrValue::from($value));
        )+
        attrs
    }};
}
