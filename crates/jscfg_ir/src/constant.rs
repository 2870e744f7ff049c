use std::collections::HashMap;
use std::fmt;

use tracing::trace;

use crate::error::{CfgError, Result};
use crate::ids::ConstantId;

// ---------------------------------------------------------------------------
// Literals
// ---------------------------------------------------------------------------

/// A literal value as seen by the tree walk.
///
/// Only primitive literals can become constants; regular expressions and
/// object values are rejected by the pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    /// Decimal digits without the trailing `n`.
    BigInt(String),
    RegExp { pattern: String, flags: String },
    /// Any non-primitive value, carried as a description for diagnostics.
    Object(String),
}

impl Literal {
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Literal::RegExp { .. } | Literal::Object(_))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::RegExp { pattern, flags } => write!(f, "/{pattern}/{flags}"),
            Literal::Object(description) => write!(f, "{description}"),
            primitive => match ConstantValue::try_from(primitive.clone()) {
                Ok(value) => write!(f, "{value}"),
                Err(_) => Ok(()),
            },
        }
    }
}

/// A primitive constant value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    BigInt(String),
}

impl TryFrom<Literal> for ConstantValue {
    type Error = Literal;

    fn try_from(literal: Literal) -> std::result::Result<Self, Literal> {
        Ok(match literal {
            Literal::Undefined => ConstantValue::Undefined,
            Literal::Null => ConstantValue::Null,
            Literal::Boolean(b) => ConstantValue::Boolean(b),
            Literal::Number(n) => ConstantValue::Number(n),
            Literal::String(s) => ConstantValue::String(s),
            Literal::BigInt(digits) => ConstantValue::BigInt(digits),
            other => return Err(other),
        })
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Undefined => write!(f, "undefined"),
            ConstantValue::Null => write!(f, "null"),
            ConstantValue::Boolean(b) => write!(f, "{b}"),
            ConstantValue::Number(n) if n.is_nan() => write!(f, "NaN"),
            ConstantValue::Number(n) if n.is_infinite() => {
                write!(f, "{}Infinity", if *n < 0.0 { "-" } else { "" })
            }
            // -0 prints as 0, like JS `String(-0)`.
            ConstantValue::Number(n) if *n == 0.0 => write!(f, "0"),
            ConstantValue::Number(n) => write!(f, "{n}"),
            ConstantValue::String(s) => write!(f, "{s}"),
            ConstantValue::BigInt(digits) => write!(f, "{digits}n"),
        }
    }
}

/// Hash key for a value within one type's map.
///
/// Numbers compare with SameValueZero: every NaN is one key and `-0` is `+0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ValueKey {
    Undefined,
    Null,
    Boolean(bool),
    Number(u64),
    String(String),
    BigInt(String),
}

impl From<&ConstantValue> for ValueKey {
    fn from(value: &ConstantValue) -> Self {
        match value {
            ConstantValue::Undefined => ValueKey::Undefined,
            ConstantValue::Null => ValueKey::Null,
            ConstantValue::Boolean(b) => ValueKey::Boolean(*b),
            ConstantValue::Number(n) if n.is_nan() => ValueKey::Number(f64::NAN.to_bits()),
            ConstantValue::Number(n) if *n == 0.0 => ValueKey::Number(0.0f64.to_bits()),
            ConstantValue::Number(n) => ValueKey::Number(n.to_bits()),
            ConstantValue::String(s) => ValueKey::String(s.clone()),
            ConstantValue::BigInt(digits) => ValueKey::BigInt(digits.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Constant pool
// ---------------------------------------------------------------------------

/// A canonical literal producer, unique per (type, value) within one pool.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    ty: String,
    value: ConstantValue,
}

impl Constant {
    pub fn ty(&self) -> &str {
        &self.ty
    }

    pub fn value(&self) -> &ConstantValue {
        &self.value
    }
}

#[derive(Debug, Default)]
struct TypeEntry {
    name: String,
    values: HashMap<ValueKey, ConstantId>,
    /// Constants of this type in first-request order.
    order: Vec<ConstantId>,
}

/// Deduplicates literals by type first, then by value within the type.
#[derive(Debug, Default)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    types: Vec<TypeEntry>,
    type_index: HashMap<String, usize>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the canonical constant for `(ty, literal)`, creating it on first
    /// request.
    ///
    /// # Errors
    ///
    /// Returns [`CfgError::InvalidConstant`] if `literal` is not a primitive.
    /// The pool is left untouched in that case.
    pub fn get_or_insert(&mut self, ty: &str, literal: Literal) -> Result<ConstantId> {
        let value = ConstantValue::try_from(literal).map_err(|rejected| CfgError::InvalidConstant {
            ty: ty.to_string(),
            value: rejected.to_string(),
        })?;
        let key = ValueKey::from(&value);

        let entry_index = match self.type_index.get(ty) {
            Some(&index) => index,
            None => {
                self.types.push(TypeEntry {
                    name: ty.to_string(),
                    ..TypeEntry::default()
                });
                self.type_index.insert(ty.to_string(), self.types.len() - 1);
                self.types.len() - 1
            }
        };
        let entry = &mut self.types[entry_index];
        if let Some(&id) = entry.values.get(&key) {
            return Ok(id);
        }

        let id = ConstantId::new(self.constants.len());
        trace!(%id, ty, %value, "new constant");
        self.constants.push(Constant {
            ty: ty.to_string(),
            value,
        });
        entry.values.insert(key, id);
        entry.order.push(id);
        Ok(id)
    }

    /// Look up an existing constant without creating one.
    pub fn lookup(&self, ty: &str, literal: &Literal) -> Option<ConstantId> {
        let value = ConstantValue::try_from(literal.clone()).ok()?;
        let entry = &self.types[*self.type_index.get(ty)?];
        entry.values.get(&ValueKey::from(&value)).copied()
    }

    pub fn get(&self, id: ConstantId) -> &Constant {
        &self.constants[id.index()]
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Types in first-request order, each with its constants in first-request
    /// order.
    pub fn iter_by_type(&self) -> impl Iterator<Item = (&str, &[ConstantId])> {
        self.types
            .iter()
            .map(|entry| (entry.name.as_str(), entry.order.as_slice()))
    }
}
