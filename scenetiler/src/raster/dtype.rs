//! Sample data types supported by the engine.

use std::fmt;
use std::str::FromStr;

use super::RasterError;

/// On-disk sample type of a raster.
///
/// Sentinel-2 L2A bands are `UInt16`; the other variants cover common
/// derived products. All values of these types fit exactly in an `f32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    UInt8,
    UInt16,
    Int16,
    Float32,
}

impl DataType {
    /// Bits per sample as written to the TIFF `BitsPerSample` tag.
    pub fn bits(&self) -> u16 {
        match self {
            DataType::UInt8 => 8,
            DataType::UInt16 | DataType::Int16 => 16,
            DataType::Float32 => 32,
        }
    }

    /// TIFF `SampleFormat` value (1 = unsigned, 2 = signed, 3 = IEEE float).
    pub fn sample_format(&self) -> u16 {
        match self {
            DataType::UInt8 | DataType::UInt16 => 1,
            DataType::Int16 => 2,
            DataType::Float32 => 3,
        }
    }

    /// Returns true for integer sample types.
    pub fn is_integer(&self) -> bool {
        !matches!(self, DataType::Float32)
    }

    /// Cast a floating-point value into this type's value domain.
    ///
    /// Integer types truncate toward zero and saturate at their range, the
    /// same way an `as` cast does. Precision lost here is not recovered.
    pub fn cast(&self, value: f64) -> f32 {
        match self {
            DataType::UInt8 => (value as u8) as f32,
            DataType::UInt16 => (value as u16) as f32,
            DataType::Int16 => (value as i16) as f32,
            DataType::Float32 => value as f32,
        }
    }

    /// Lowercase name used in config files and log output.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::UInt8 => "uint8",
            DataType::UInt16 => "uint16",
            DataType::Int16 => "int16",
            DataType::Float32 => "float32",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uint8" | "u8" => Ok(DataType::UInt8),
            "uint16" | "u16" => Ok(DataType::UInt16),
            "int16" | "i16" => Ok(DataType::Int16),
            "float32" | "f32" => Ok(DataType::Float32),
            other => Err(RasterError::UnsupportedDataType(other.to_string())),
        }
    }
}
