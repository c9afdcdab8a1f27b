
use crate::{
    db::relation::RelationBinder,
    error::{ErrorOrigin, InternalError, MappingError},
    model::{EntityDecl, TableDescriptor},
    value::{TIMESTAMP_FORMAT, Value, ValueKind},
};
use chrono::NaiveDateTime;
use ulid::Ulid;

// ============================================================================
// VALUES
// ============================================================================

///
/// FieldValue
///
/// Conversion boundary between Rust field types and `Value`.
///
/// `KIND` and `NULLABLE` feed field declarations, so an `Option<T>` field is
/// nullable and a bare `T` field is not.
///

pub trait FieldValue: Sized {
    const KIND: ValueKind;
    const NULLABLE: bool = false;

    fn to_value(&self) -> Value;

    #[must_use]
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! impl_field_value_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                const KIND: ValueKind = ValueKind::Int;

                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Int(v) => Self::try_from(*v).ok(),
                        Value::Bool(v) => Some(Self::from(*v)),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_field_value_int!(i8, i16, i32, i64, u8, u16, u32);

impl FieldValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            Value::Int(v) => Some(*v != 0),
            _ => None,
        }
    }
}

impl FieldValue for f64 {
    const KIND: ValueKind = ValueKind::Float;

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    #[expect(clippy::cast_precision_loss)]
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as Self),
            _ => None,
        }
    }
}

impl FieldValue for String {
    const KIND: ValueKind = ValueKind::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FieldValue for &str {
    const KIND: ValueKind = ValueKind::Text;

    fn to_value(&self) -> Value {
        Value::Text((*self).to_string())
    }

    fn from_value(_value: &Value) -> Option<Self> {
        None
    }
}

impl FieldValue for Vec<u8> {
    const KIND: ValueKind = ValueKind::Blob;

    fn to_value(&self) -> Value {
        Value::Blob(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Blob(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FieldValue for NaiveDateTime {
    const KIND: ValueKind = ValueKind::Timestamp;

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    // text-backed stores hand timestamps back as strings
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Timestamp(v) => Some(*v),
            Value::Text(v) => Self::parse_from_str(v, TIMESTAMP_FORMAT).ok(),
            _ => None,
        }
    }
}

impl FieldValue for Ulid {
    const KIND: ValueKind = ValueKind::Ulid;

    fn to_value(&self) -> Value {
        Value::Ulid(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Ulid(v) => Some(*v),
            Value::Text(v) => Self::from_string(v).ok(),
            Value::Blob(v) => <[u8; 16]>::try_from(v.as_slice())
                .ok()
                .map(Self::from_bytes),
            _ => None,
        }
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const KIND: ValueKind = T::KIND;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldValue::to_value)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Convert `value` for `column`, reporting a typed mismatch on failure.
pub fn convert<T: FieldValue>(column: &str, value: &Value) -> Result<T, InternalError> {
    T::from_value(value).ok_or_else(|| {
        InternalError::mapping(
            ErrorOrigin::Hydrate,
            MappingError::TypeMismatch {
                column: column.to_string(),
                expected: T::KIND,
                found: value.type_label(),
            },
        )
    })
}

/// Assign `value` into `slot`; the building block of `Entity::set_value`.
pub fn assign<T: FieldValue>(slot: &mut T, column: &str, value: &Value) -> Result<(), InternalError> {
    *slot = convert(column, value)?;

    Ok(())
}

// ============================================================================
// ENTITIES
// ============================================================================

///
/// Entity
///
/// A record type mapped to one table.
///
/// ## Contract
/// - `declare` is read once by the registry; it must be deterministic.
/// - `values` returns one value per column, in declaration order, relation
///   fields excluded.
/// - `set_value` accepts every column name `declare` produced.
///

pub trait Entity: Sized + 'static {
    fn declare() -> EntityDecl;

    fn values(&self) -> Vec<Value>;

    fn from_row(row: &EntityRow<'_>) -> Result<Self, InternalError>;

    fn set_value(&mut self, column: &str, value: &Value) -> Result<(), InternalError>;

    /// Bind relation collections to this object's key.
    fn bind_relations(&mut self, _binder: &RelationBinder<'_>) -> Result<(), InternalError> {
        Ok(())
    }
}

///
/// EntityRow
///
/// One hydrated row, values ordered like the descriptor's columns.
///

pub struct EntityRow<'a> {
    table: &'a TableDescriptor,
    values: Vec<Value>,
}

impl<'a> EntityRow<'a> {
    #[must_use]
    pub const fn new(table: &'a TableDescriptor, values: Vec<Value>) -> Self {
        Self { table, values }
    }

    /// Raw value of a column by logical name.
    pub fn value(&self, column: &str) -> Result<&Value, InternalError> {
        let index = self.table.column_index(column).ok_or_else(|| {
            InternalError::mapping(
                ErrorOrigin::Hydrate,
                MappingError::UnknownColumn {
                    table: self.table.name().to_string(),
                    column: column.to_string(),
                },
            )
        })?;

        self.values.get(index).ok_or_else(|| {
            InternalError::mapping(
                ErrorOrigin::Hydrate,
                MappingError::MissingResultColumn {
                    column: column.to_string(),
                },
            )
        })
    }

    /// Typed value of a column by logical name.
    pub fn get<T: FieldValue>(&self, column: &str) -> Result<T, InternalError> {
        convert(column, self.value(column)?)
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}
