//! Operator catalog used to validate node construction.
//!
//! The catalog only describes the surface of each operation kind (port arity
//! and attribute schema). It never interprets what an operation computes.

use std::collections::HashMap;

use snafu::ensure;

use crate::error::{ArityMismatchSnafu, AttributeKindSnafu, MissingAttributeSnafu, Result, UnknownOpSnafu};
use crate::types::{AttrKind, AttrValue, Attributes};

/// Port arity given to unknown operation kinds in a lenient catalog.
pub const DEFAULT_ARITY: (usize, usize) = (1, 1);

/// How a catalog treats operation kinds it has no schema for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CatalogMode {
    /// Unknown kinds are accepted with [`DEFAULT_ARITY`] unless the node spec
    /// gives an explicit arity.
    #[default]
    Lenient,
    /// Unknown kinds are rejected.
    Strict,
}

/// Declared attribute of an operation kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrSpec {
    pub name: String,
    pub kind: AttrKind,
    pub required: bool,
}

/// Surface schema of one operation kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpSchema {
    pub op: String,
    pub min_inputs: usize,
    pub max_inputs: usize,
    pub outputs: usize,
    pub attrs: Vec<AttrSpec>,
}

impl OpSchema {
    /// Schema with a fixed number of inputs and outputs and no attributes.
    pub fn new(op: impl Into<String>, inputs: usize, outputs: usize) -> Self {
        Self { op: op.into(), min_inputs: inputs, max_inputs: inputs, outputs, attrs: Vec::new() }
    }

    /// Schema accepting between `min` and `max` inputs (inclusive).
    pub fn variadic(op: impl Into<String>, min: usize, max: usize, outputs: usize) -> Self {
        Self { op: op.into(), min_inputs: min, max_inputs: max, outputs, attrs: Vec::new() }
    }

    /// Declare an optional attribute.
    pub fn attr(mut self, name: impl Into<String>, kind: AttrKind) -> Self {
        self.attrs.push(AttrSpec { name: name.into(), kind, required: false });
        self
    }

    /// Declare a required attribute.
    pub fn required_attr(mut self, name: impl Into<String>, kind: AttrKind) -> Self {
        self.attrs.push(AttrSpec { name: name.into(), kind, required: true });
        self
    }

    fn expected_arity(&self) -> String {
        if self.min_inputs == self.max_inputs {
            format!("{} inputs and {} outputs", self.min_inputs, self.outputs)
        } else {
            format!("{}..={} inputs and {} outputs", self.min_inputs, self.max_inputs, self.outputs)
        }
    }

    fn spec(&self, key: &str) -> Option<&AttrSpec> {
        self.attrs.iter().find(|spec| spec.name == key)
    }
}

/// Collection of operator schemas keyed by operation kind.
#[derive(Debug, Clone, Default)]
pub struct OpCatalog {
    schemas: HashMap<String, OpSchema>,
    mode: CatalogMode,
}

impl OpCatalog {
    /// Empty catalog.
    pub fn new(mode: CatalogMode) -> Self {
        Self { schemas: HashMap::new(), mode }
    }

    /// Catalog of the operations used by the normalization fusion passes.
    pub fn standard() -> Self {
        let mut catalog = Self::new(CatalogMode::Lenient);
        catalog.register(OpSchema::new("Parameter", 0, 1));
        catalog.register(OpSchema::new("Const", 0, 1));
        catalog.register(OpSchema::new("Result", 1, 0));
        catalog.register(OpSchema::variadic("ReduceMean", 1, 2, 1).attr("keep_dims", AttrKind::Bool));
        for op in ["Add", "Sub", "Mul", "Div", "Pow"] {
            catalog.register(OpSchema::new(op, 2, 1));
        }
        catalog.register(OpSchema::new("Sqrt", 1, 1));
        catalog.register(
            OpSchema::variadic("MVN", 1, 2, 1)
                .required_attr("eps", AttrKind::Float)
                .attr("across_channels", AttrKind::Int)
                .attr("normalize_variance", AttrKind::Int),
        );
        catalog
    }

    /// Same schemas with a different mode.
    pub fn with_mode(mut self, mode: CatalogMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> CatalogMode {
        self.mode
    }

    /// Register (or replace) the schema for `schema.op`.
    pub fn register(&mut self, schema: OpSchema) -> Option<OpSchema> {
        self.schemas.insert(schema.op.clone(), schema)
    }

    pub fn get(&self, op: &str) -> Option<&OpSchema> {
        self.schemas.get(op)
    }

    pub fn contains(&self, op: &str) -> bool {
        self.schemas.contains_key(op)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Resolve the port arity of a new node and validate it against the schema.
    ///
    /// Explicit counts win over schema defaults. A schema's default input count
    /// is its maximum, so optional trailing inputs exist as unconnected ports.
    pub fn resolve_arity(&self, op: &str, inputs: Option<usize>, outputs: Option<usize>) -> Result<(usize, usize)> {
        let Some(schema) = self.get(op) else {
            ensure!(self.mode == CatalogMode::Lenient, UnknownOpSnafu { op });
            return Ok((inputs.unwrap_or(DEFAULT_ARITY.0), outputs.unwrap_or(DEFAULT_ARITY.1)));
        };

        let inputs = inputs.unwrap_or(schema.max_inputs);
        let outputs = outputs.unwrap_or(schema.outputs);
        ensure!(
            (schema.min_inputs..=schema.max_inputs).contains(&inputs) && outputs == schema.outputs,
            ArityMismatchSnafu { op, expected: schema.expected_arity(), inputs, outputs }
        );
        Ok((inputs, outputs))
    }

    /// Check a full attribute map: required keys present, declared keys well-kinded.
    ///
    /// Attributes the schema does not declare are accepted as-is.
    pub fn validate_attrs(&self, op: &str, attrs: &Attributes) -> Result<()> {
        let Some(schema) = self.get(op) else {
            return Ok(());
        };

        for spec in schema.attrs.iter().filter(|spec| spec.required) {
            ensure!(attrs.contains_key(&spec.name), MissingAttributeSnafu { op, key: spec.name.as_str() });
        }
        for (key, value) in attrs {
            self.validate_attr(op, key, value)?;
        }
        Ok(())
    }

    /// Check a single attribute value against the declared kind, if any.
    pub fn validate_attr(&self, op: &str, key: &str, value: &AttrValue) -> Result<()> {
        if let Some(spec) = self.get(op).and_then(|schema| schema.spec(key)) {
            ensure!(
                spec.kind == value.kind(),
                AttributeKindSnafu { op, key, expected: spec.kind, actual: value.kind() }
            );
        }
        Ok(())
    }
}
