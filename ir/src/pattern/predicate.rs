//! Node predicate algebra.
//!
//! Predicates are plain data so that a pattern can be built, compared and
//! logged without running it. [`Predicate::Custom`] is the escape hatch for
//! conditions the algebra cannot express.
//!
//! ```
//! use splice_ir::pattern::{CmpOp, Predicate};
//!
//! let pred = Predicate::op("MVN") & Predicate::attr_cmp("eps", CmpOp::Lt, 1e-3);
//! assert_eq!(pred.to_string(), r#"op == "MVN" && eps < 0.001"#);
//! ```

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::sync::Arc;

use crate::graph::Node;
use crate::types::AttrValue;

/// Numeric comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CmpOp {
    #[strum(to_string = "<")]
    Lt,
    #[strum(to_string = "<=")]
    Le,
    #[strum(to_string = ">")]
    Gt,
    #[strum(to_string = ">=")]
    Ge,
}

impl CmpOp {
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

/// Test applied to a single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrTest {
    /// Exact equality, including the value's kind.
    Eq(AttrValue),
    /// Exact equality with any listed value.
    In(Vec<AttrValue>),
    /// Numeric comparison; non-numeric values never satisfy it.
    Cmp(CmpOp, f64),
}

impl AttrTest {
    pub fn eval(&self, value: &AttrValue) -> bool {
        match self {
            Self::Eq(expected) => value == expected,
            Self::In(options) => options.contains(value),
            Self::Cmp(op, rhs) => value.as_f64().is_some_and(|lhs| op.apply(lhs, *rhs)),
        }
    }
}

/// Named closure predicate.
#[derive(Clone)]
pub struct CustomPredicate {
    name: String,
    func: Arc<dyn Fn(&Node) -> bool + Send + Sync>,
}

impl CustomPredicate {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomPredicate").field(&self.name).finish()
    }
}

// Two custom predicates are equal only if they share the same closure.
impl PartialEq for CustomPredicate {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.func, &other.func)
    }
}

/// Condition a node must satisfy to bind to a pattern slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every node.
    Any,
    /// Operation kind equals the given tag.
    Op(String),
    /// Operation kind is one of the given tags.
    OpIn(Vec<String>),
    /// Attribute key is present.
    HasAttr(String),
    /// Attribute key is present and satisfies the test.
    Attr(String, AttrTest),
    /// Node has exactly this many in-ports.
    InputCount(usize),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Custom(CustomPredicate),
}

impl Predicate {
    pub fn op(op: impl Into<String>) -> Self {
        Self::Op(op.into())
    }

    pub fn op_in<I, S>(ops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::OpIn(ops.into_iter().map(Into::into).collect())
    }

    pub fn has_attr(key: impl Into<String>) -> Self {
        Self::HasAttr(key.into())
    }

    pub fn attr_eq(key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Self::Attr(key.into(), AttrTest::Eq(value.into()))
    }

    pub fn attr_in<I, V>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<AttrValue>,
    {
        Self::Attr(key.into(), AttrTest::In(values.into_iter().map(Into::into).collect()))
    }

    pub fn attr_cmp(key: impl Into<String>, op: CmpOp, rhs: f64) -> Self {
        Self::Attr(key.into(), AttrTest::Cmp(op, rhs))
    }

    pub fn input_count(count: usize) -> Self {
        Self::InputCount(count)
    }

    pub fn custom<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Node) -> bool + Send + Sync + 'static,
    {
        Self::Custom(CustomPredicate { name: name.into(), func: Arc::new(func) })
    }

    pub fn eval(&self, node: &Node) -> bool {
        match self {
            Self::Any => true,
            Self::Op(op) => node.op() == op,
            Self::OpIn(ops) => ops.iter().any(|op| node.op() == op),
            Self::HasAttr(key) => node.attr(key).is_some(),
            Self::Attr(key, test) => node.attr(key).is_some_and(|value| test.eval(value)),
            Self::InputCount(count) => node.input_count() == *count,
            Self::And(preds) => preds.iter().all(|p| p.eval(node)),
            Self::Or(preds) => preds.iter().any(|p| p.eval(node)),
            Self::Not(pred) => !pred.eval(node),
            Self::Custom(custom) => (custom.func)(node),
        }
    }

    /// Operation kind this predicate pins, if it pins exactly one.
    pub fn pinned_op(&self) -> Option<&str> {
        match self {
            Self::Op(op) => Some(op),
            Self::And(preds) => preds.iter().find_map(Predicate::pinned_op),
            _ => None,
        }
    }
}

impl BitAnd for Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Predicate) -> Predicate {
        match (self, rhs) {
            (Predicate::And(mut lhs), Predicate::And(rhs)) => {
                lhs.extend(rhs);
                Predicate::And(lhs)
            }
            (Predicate::And(mut lhs), rhs) => {
                lhs.push(rhs);
                Predicate::And(lhs)
            }
            (lhs, rhs) => Predicate::And(vec![lhs, rhs]),
        }
    }
}

impl BitOr for Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Predicate) -> Predicate {
        match (self, rhs) {
            (Predicate::Or(mut lhs), Predicate::Or(rhs)) => {
                lhs.extend(rhs);
                Predicate::Or(lhs)
            }
            (Predicate::Or(mut lhs), rhs) => {
                lhs.push(rhs);
                Predicate::Or(lhs)
            }
            (lhs, rhs) => Predicate::Or(vec![lhs, rhs]),
        }
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        match self {
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, preds: &[Predicate], sep: &str) -> fmt::Result {
    for (i, pred) in preds.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        match pred {
            Predicate::And(_) | Predicate::Or(_) => write!(f, "({pred})")?,
            _ => write!(f, "{pred}")?,
        }
    }
    Ok(())
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Op(op) => write!(f, "op == {op:?}"),
            Self::OpIn(ops) => write!(f, "op in {ops:?}"),
            Self::HasAttr(key) => write!(f, "has({key})"),
            Self::Attr(key, AttrTest::Eq(value)) => write!(f, "{key} == {value}"),
            Self::Attr(key, AttrTest::In(values)) => {
                write!(f, "{key} in [")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            Self::Attr(key, AttrTest::Cmp(op, rhs)) => write!(f, "{key} {op} {rhs}"),
            Self::InputCount(count) => write!(f, "inputs == {count}"),
            Self::And(preds) => write_joined(f, preds, " && "),
            Self::Or(preds) => write_joined(f, preds, " || "),
            Self::Not(pred) => write!(f, "!({pred})"),
            Self::Custom(custom) => write!(f, "custom({})", custom.name),
        }
    }
}
