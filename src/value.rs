//! CIM scalar and array value types (DSP0004 ch. 5)

use crate::instance::CIMInstanceName;
use serde::{Deserialize, Serialize};

/// A CIM data type, as declared on a property, method return, or parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CimType {
    /// `boolean`
    Boolean,
    /// `char16`
    Char16,
    /// `string`
    String,
    /// `uint8`
    Uint8,
    /// `uint16`
    Uint16,
    /// `uint32`
    Uint32,
    /// `uint64`
    Uint64,
    /// `sint8`
    Sint8,
    /// `sint16`
    Sint16,
    /// `sint32`
    Sint32,
    /// `sint64`
    Sint64,
    /// `real32`
    Real32,
    /// `real64`
    Real64,
    /// `datetime`, carried as its DMTF string representation
    Datetime,
    /// `reference`, pointing at instances of `reference_class`
    Reference {
        /// Declared target class of the reference.
        reference_class: String,
    },
}

impl CimType {
    /// The declared `reference_class`, if this is a reference type.
    pub fn reference_class(&self) -> Option<&str> {
        match self {
            CimType::Reference { reference_class } => Some(reference_class.as_str()),
            _ => None,
        }
    }

    /// Whether two declared types are the same CIM type.
    ///
    /// Reference types compare equal regardless of `reference_class`: CIM
    /// treats the reference target as part of the property's scope, not
    /// part of type identity for assignment compatibility checks here.
    pub fn same_kind(&self, other: &CimType) -> bool {
        matches!(
            (self, other),
            (CimType::Boolean, CimType::Boolean)
                | (CimType::Char16, CimType::Char16)
                | (CimType::String, CimType::String)
                | (CimType::Uint8, CimType::Uint8)
                | (CimType::Uint16, CimType::Uint16)
                | (CimType::Uint32, CimType::Uint32)
                | (CimType::Uint64, CimType::Uint64)
                | (CimType::Sint8, CimType::Sint8)
                | (CimType::Sint16, CimType::Sint16)
                | (CimType::Sint32, CimType::Sint32)
                | (CimType::Sint64, CimType::Sint64)
                | (CimType::Real32, CimType::Real32)
                | (CimType::Real64, CimType::Real64)
                | (CimType::Datetime, CimType::Datetime)
                | (CimType::Reference { .. }, CimType::Reference { .. })
        )
    }
}

/// A single CIM scalar value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CimScalar {
    /// `boolean`
    Boolean(bool),
    /// `char16`
    Char16(char),
    /// `string`
    String(String),
    /// `uint8`
    Uint8(u8),
    /// `uint16`
    Uint16(u16),
    /// `uint32`
    Uint32(u32),
    /// `uint64`
    Uint64(u64),
    /// `sint8`
    Sint8(i8),
    /// `sint16`
    Sint16(i16),
    /// `sint32`
    Sint32(i32),
    /// `sint64`
    Sint64(i64),
    /// `real32`
    Real32(f32),
    /// `real64`
    Real64(f64),
    /// `datetime`
    Datetime(String),
    /// `reference`
    Reference(Box<CIMInstanceName>),
}

impl CimScalar {
    /// The `CimType` this scalar instantiates.
    pub fn cim_type(&self) -> CimType {
        match self {
            CimScalar::Boolean(_) => CimType::Boolean,
            CimScalar::Char16(_) => CimType::Char16,
            CimScalar::String(_) => CimType::String,
            CimScalar::Uint8(_) => CimType::Uint8,
            CimScalar::Uint16(_) => CimType::Uint16,
            CimScalar::Uint32(_) => CimType::Uint32,
            CimScalar::Uint64(_) => CimType::Uint64,
            CimScalar::Sint8(_) => CimType::Sint8,
            CimScalar::Sint16(_) => CimType::Sint16,
            CimScalar::Sint32(_) => CimType::Sint32,
            CimScalar::Sint64(_) => CimType::Sint64,
            CimScalar::Real32(_) => CimType::Real32,
            CimScalar::Real64(_) => CimType::Real64,
            CimScalar::Datetime(_) => CimType::Datetime,
            CimScalar::Reference(path) => CimType::Reference {
                reference_class: path.classname.clone(),
            },
        }
    }
}

/// The value held by a property or keybinding: absent, scalar, or array.
///
/// `Array` always reflects a declared array property even when empty;
/// scalar-vs-array-ness is validated against the class separately from
/// the type of individual elements (§4.5 step 5/10).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CimValue {
    /// No value (CIM `NULL`).
    Null,
    /// A single scalar value.
    Scalar(CimScalar),
    /// An array of scalars; elements may individually be `NULL`.
    Array(Vec<Option<CimScalar>>),
}

impl CimValue {
    /// Whether this value is array-shaped.
    pub fn is_array(&self) -> bool {
        matches!(self, CimValue::Array(_))
    }

    /// Whether this is CIM `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self, CimValue::Null)
    }

    /// Checks the value's shape and element type against a declared
    /// property type, per the type/array-ness agreement required by
    /// CreateInstance step 5 and ModifyInstance step 10.
    pub fn conforms_to(&self, declared: &CimType, declared_array: bool) -> bool {
        match self {
            CimValue::Null => true,
            CimValue::Scalar(s) => !declared_array && s.cim_type().same_kind(declared),
            CimValue::Array(items) => {
                declared_array
                    && items
                        .iter()
                        .flatten()
                        .all(|s| s.cim_type().same_kind(declared))
            }
        }
    }

    /// The reference path carried by a scalar reference value, if any.
    pub fn as_reference(&self) -> Option<&CIMInstanceName> {
        match self {
            CimValue::Scalar(CimScalar::Reference(path)) => Some(path),
            _ => None,
        }
    }
}

impl From<CimScalar> for CimValue {
    fn from(scalar: CimScalar) -> Self {
        CimValue::Scalar(scalar)
    }
}
