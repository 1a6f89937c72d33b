//! Quantization Types
//!
//! Storage types, mode tags, source precisions and the native containers for
//! zero points and quantized data.
//!
//! @version 0.1.0
//! @author Qlinear Development Team

use std::fmt;
use std::str::FromStr;

use half::f16;
use serde::{Deserialize, Serialize};

use crate::error::{QuantError, QuantResult};
use crate::float8::Float8E4M3Fn;

// =============================================================================
// Storage Type Enum
// =============================================================================

/// Target storage type of quantized values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StorageType {
    /// 8-bit signed integer.
    #[serde(rename = "QInt8", alias = "int8")]
    QInt8,
    /// 8-bit unsigned integer.
    #[default]
    #[serde(rename = "QUInt8", alias = "uint8")]
    QUInt8,
    /// 8-bit float, 4 exponent bits, 3 mantissa bits, no infinities.
    #[serde(rename = "QFLOAT8E4M3FN", alias = "float8e4m3fn")]
    QFloat8E4M3Fn,
    /// 16-bit signed integer.
    #[serde(rename = "QInt16", alias = "int16")]
    QInt16,
    /// 16-bit unsigned integer.
    #[serde(rename = "QUInt16", alias = "uint16")]
    QUInt16,
}

impl StorageType {
    /// Every storage type, in declaration order.
    pub const ALL: [StorageType; 5] = [
        StorageType::QInt8,
        StorageType::QUInt8,
        StorageType::QFloat8E4M3Fn,
        StorageType::QInt16,
        StorageType::QUInt16,
    ];

    /// Returns the canonical name of this storage type.
    pub fn name(&self) -> &'static str {
        match self {
            StorageType::QInt8 => "QInt8",
            StorageType::QUInt8 => "QUInt8",
            StorageType::QFloat8E4M3Fn => "QFLOAT8E4M3FN",
            StorageType::QInt16 => "QInt16",
            StorageType::QUInt16 => "QUInt16",
        }
    }

    /// Returns the bit width of one quantized value.
    pub fn bits(&self) -> usize {
        match self {
            StorageType::QInt8 | StorageType::QUInt8 | StorageType::QFloat8E4M3Fn => 8,
            StorageType::QInt16 | StorageType::QUInt16 => 16,
        }
    }

    /// Returns true for signed storage types.
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            StorageType::QInt8 | StorageType::QInt16 | StorageType::QFloat8E4M3Fn
        )
    }

    /// Returns true if this storage type takes the float8 code path.
    pub fn is_float8(&self) -> bool {
        self.float8_variant().is_some()
    }

    /// Returns the float8 variant for float8 storage types.
    pub fn float8_variant(&self) -> Option<Float8Variant> {
        match self {
            StorageType::QFloat8E4M3Fn => Some(Float8Variant::E4M3Fn),
            _ => None,
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for StorageType {
    type Err = QuantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QInt8" | "int8" => Ok(StorageType::QInt8),
            "QUInt8" | "uint8" => Ok(StorageType::QUInt8),
            "QFLOAT8E4M3FN" | "float8e4m3fn" => Ok(StorageType::QFloat8E4M3Fn),
            "QInt16" | "int16" => Ok(StorageType::QInt16),
            "QUInt16" | "uint16" => Ok(StorageType::QUInt16),
            _ => Err(QuantError::InvalidQuantType(s.to_string())),
        }
    }
}

// =============================================================================
// Float8 Variants
// =============================================================================

/// 8-bit floating point encodings a scale may be requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Float8Variant {
    /// 4 exponent bits, 3 mantissa bits, finite only.
    E4M3Fn,
    /// E4M3 with unsigned zero and no negative zero.
    E4M3FnUz,
    /// 5 exponent bits, 2 mantissa bits.
    E5M2,
    /// E5M2 with unsigned zero and no negative zero.
    E5M2FnUz,
}

impl fmt::Display for Float8Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Float8Variant::E4M3Fn => write!(f, "FLOAT8E4M3FN"),
            Float8Variant::E4M3FnUz => write!(f, "FLOAT8E4M3FNUZ"),
            Float8Variant::E5M2 => write!(f, "FLOAT8E5M2"),
            Float8Variant::E5M2FnUz => write!(f, "FLOAT8E5M2FNUZ"),
        }
    }
}

// =============================================================================
// Mode Tags
// =============================================================================

macro_rules! impl_name_enum {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $($ty::$variant => f.write_str(stringify!($variant)),)+
                }
            }
        }

        impl FromStr for $ty {
            type Err = QuantError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok($ty::$variant),)+
                    _ => Err(QuantError::InvalidQuantType(s.to_string())),
                }
            }
        }
    };
}

/// Operator family used by a quantized model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantizationMode {
    /// Integer operators (`ConvInteger`, `MatMulInteger`).
    IntegerOps,
    /// Linear-quantized operators (`QLinearConv`, `QLinearMatMul`).
    QLinearOps,
}

/// Whether a quantized value is a runtime input or a constant initializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantizedValueType {
    /// Runtime input.
    Input,
    /// Constant weight.
    Initializer,
}

/// Layout of quantized operators in a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum QuantFormat {
    /// Quantized operators.
    QOperator,
    /// Quantize / dequantize pairs around float operators.
    QDQ,
}

impl_name_enum!(QuantizationMode { IntegerOps, QLinearOps });
impl_name_enum!(QuantizedValueType { Input, Initializer });
impl_name_enum!(QuantFormat { QOperator, QDQ });

// =============================================================================
// Source Precision
// =============================================================================

/// Floating point precision of source data (32 or 16 bit).
pub trait RealValue: Copy + Send + Sync + PartialOrd + fmt::Debug + fmt::Display + 'static {
    /// Name of the precision.
    const NAME: &'static str;
    /// Zero.
    const ZERO: Self;
    /// One.
    const ONE: Self;
    /// Smallest positive normal value.
    const MIN_POSITIVE: Self;

    /// Widens to `f32`.
    fn to_f32(self) -> f32;
    /// Widens to `f64`.
    fn to_f64(self) -> f64;
    /// Narrows from `f64`, rounding to nearest.
    fn from_f64(value: f64) -> Self;
}

impl RealValue for f32 {
    const NAME: &'static str = "f32";
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    const MIN_POSITIVE: Self = f32::MIN_POSITIVE;

    fn to_f32(self) -> f32 {
        self
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl RealValue for f16 {
    const NAME: &'static str = "f16";
    const ZERO: Self = f16::ZERO;
    const ONE: Self = f16::ONE;
    const MIN_POSITIVE: Self = f16::MIN_POSITIVE;

    fn to_f32(self) -> f32 {
        f16::to_f32(self)
    }

    fn to_f64(self) -> f64 {
        f16::to_f64(self)
    }

    fn from_f64(value: f64) -> Self {
        f16::from_f64(value)
    }
}

// =============================================================================
// Zero Point
// =============================================================================

/// A zero point in the native representation of its storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZeroPoint {
    /// 8-bit signed.
    I8(i8),
    /// 8-bit unsigned.
    U8(u8),
    /// 16-bit signed.
    I16(i16),
    /// 16-bit unsigned.
    U16(u16),
    /// Float8 E4M3FN.
    F8E4M3Fn(Float8E4M3Fn),
}

impl ZeroPoint {
    /// Returns the zero value for a storage type.
    pub fn zero(storage: StorageType) -> Self {
        match storage {
            StorageType::QInt8 => ZeroPoint::I8(0),
            StorageType::QUInt8 => ZeroPoint::U8(0),
            StorageType::QFloat8E4M3Fn => ZeroPoint::F8E4M3Fn(Float8E4M3Fn::ZERO),
            StorageType::QInt16 => ZeroPoint::I16(0),
            StorageType::QUInt16 => ZeroPoint::U16(0),
        }
    }

    /// Creates an integer zero point, failing if `value` does not fit the storage type.
    pub fn from_i64(storage: StorageType, value: i64) -> QuantResult<Self> {
        let out_of_range =
            || QuantError::InvalidData(format!("zero point {value} does not fit {storage}"));
        match storage {
            StorageType::QInt8 => {
                i8::try_from(value).map(ZeroPoint::I8).map_err(|_| out_of_range())
            }
            StorageType::QUInt8 => {
                u8::try_from(value).map(ZeroPoint::U8).map_err(|_| out_of_range())
            }
            StorageType::QInt16 => {
                i16::try_from(value).map(ZeroPoint::I16).map_err(|_| out_of_range())
            }
            StorageType::QUInt16 => {
                u16::try_from(value).map(ZeroPoint::U16).map_err(|_| out_of_range())
            }
            StorageType::QFloat8E4M3Fn => Err(QuantError::ZeroPointType(format!(
                "float8 zero point cannot be built from integer {value}"
            ))),
        }
    }

    /// Returns the storage type this zero point belongs to.
    pub fn storage_type(&self) -> StorageType {
        match self {
            ZeroPoint::I8(_) => StorageType::QInt8,
            ZeroPoint::U8(_) => StorageType::QUInt8,
            ZeroPoint::I16(_) => StorageType::QInt16,
            ZeroPoint::U16(_) => StorageType::QUInt16,
            ZeroPoint::F8E4M3Fn(_) => StorageType::QFloat8E4M3Fn,
        }
    }

    /// Returns the integer value, or `None` for a floating zero point.
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            ZeroPoint::I8(v) => Some(i32::from(v)),
            ZeroPoint::U8(v) => Some(i32::from(v)),
            ZeroPoint::I16(v) => Some(i32::from(v)),
            ZeroPoint::U16(v) => Some(i32::from(v)),
            ZeroPoint::F8E4M3Fn(_) => None,
        }
    }

    /// Returns the zero point as `f32`.
    pub fn to_f32(&self) -> f32 {
        match *self {
            ZeroPoint::F8E4M3Fn(v) => v.to_f32(),
            _ => self.as_i32().unwrap_or_default() as f32,
        }
    }

    /// Returns true if the zero point equals zero.
    pub fn is_zero(&self) -> bool {
        match self {
            ZeroPoint::F8E4M3Fn(v) => v.is_zero(),
            _ => self.as_i32() == Some(0),
        }
    }
}

impl fmt::Display for ZeroPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZeroPoint::F8E4M3Fn(v) => write!(f, "{v}"),
            _ => write!(f, "{}", self.as_i32().unwrap_or_default()),
        }
    }
}

// =============================================================================
// Quantized Data
// =============================================================================

/// Quantized values in the native representation of their storage type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuantizedData {
    /// 8-bit signed values.
    I8(Vec<i8>),
    /// 8-bit unsigned values.
    U8(Vec<u8>),
    /// 16-bit signed values.
    I16(Vec<i16>),
    /// 16-bit unsigned values.
    U16(Vec<u16>),
    /// Float8 E4M3FN codes.
    F8E4M3Fn(Vec<Float8E4M3Fn>),
}

impl QuantizedData {
    /// Returns an empty container for a storage type.
    pub fn empty(storage: StorageType) -> Self {
        match storage {
            StorageType::QInt8 => QuantizedData::I8(Vec::new()),
            StorageType::QUInt8 => QuantizedData::U8(Vec::new()),
            StorageType::QFloat8E4M3Fn => QuantizedData::F8E4M3Fn(Vec::new()),
            StorageType::QInt16 => QuantizedData::I16(Vec::new()),
            StorageType::QUInt16 => QuantizedData::U16(Vec::new()),
        }
    }

    /// Returns the storage type of the values.
    pub fn storage_type(&self) -> StorageType {
        match self {
            QuantizedData::I8(_) => StorageType::QInt8,
            QuantizedData::U8(_) => StorageType::QUInt8,
            QuantizedData::I16(_) => StorageType::QInt16,
            QuantizedData::U16(_) => StorageType::QUInt16,
            QuantizedData::F8E4M3Fn(_) => StorageType::QFloat8E4M3Fn,
        }
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        match self {
            QuantizedData::I8(v) => v.len(),
            QuantizedData::U8(v) => v.len(),
            QuantizedData::I16(v) => v.len(),
            QuantizedData::U16(v) => v.len(),
            QuantizedData::F8E4M3Fn(v) => v.len(),
        }
    }

    /// Returns true if there are no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns integer values, or raw bits for float8 codes.
    pub fn codes(&self) -> Vec<i64> {
        match self {
            QuantizedData::I8(v) => v.iter().map(|&x| i64::from(x)).collect(),
            QuantizedData::U8(v) => v.iter().map(|&x| i64::from(x)).collect(),
            QuantizedData::I16(v) => v.iter().map(|&x| i64::from(x)).collect(),
            QuantizedData::U16(v) => v.iter().map(|&x| i64::from(x)).collect(),
            QuantizedData::F8E4M3Fn(v) => v.iter().map(|x| i64::from(x.to_bits())).collect(),
        }
    }

    /// Reassembles per-channel containers into the original element order.
    ///
    /// The tensor is viewed as `[outer, channels, inner]`; element
    /// `(o, c, i)` is taken from `parts[c][o * inner + i]`.
    pub fn interleave(
        parts: Vec<QuantizedData>,
        storage: StorageType,
        outer: usize,
        inner: usize,
    ) -> QuantResult<Self> {
        macro_rules! gather {
            ($variant:ident) => {{
                let channels = parts
                    .into_iter()
                    .map(|part| match part {
                        QuantizedData::$variant(values) if values.len() == outer * inner => {
                            Ok(values)
                        }
                        other => Err(QuantError::InvalidData(format!(
                            "channel of {} {} values cannot be interleaved into {} x {} {}",
                            other.len(),
                            other.storage_type(),
                            outer,
                            inner,
                            storage
                        ))),
                    })
                    .collect::<QuantResult<Vec<_>>>()?;

                let mut out = Vec::with_capacity(outer * channels.len() * inner);
                for o in 0..outer {
                    for channel in &channels {
                        out.extend_from_slice(&channel[o * inner..(o + 1) * inner]);
                    }
                }
                QuantizedData::$variant(out)
            }};
        }

        Ok(match storage {
            StorageType::QInt8 => gather!(I8),
            StorageType::QUInt8 => gather!(U8),
            StorageType::QInt16 => gather!(I16),
            StorageType::QUInt16 => gather!(U16),
            StorageType::QFloat8E4M3Fn => gather!(F8E4M3Fn),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
