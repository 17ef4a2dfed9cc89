//! Column descriptions and their expansion into physical columns.
//!
//! A [`Column`] is what a script author declares. Composite value shapes such as
//! [`ColumnType::Vector3`] are stored as several physical columns whose names are
//! the declared name followed by a fixed suffix. [`ColumnType::components`] is the
//! single table describing that expansion; both table creation and incremental
//! alteration go through [`Column::physical`].

/// Logical type of a declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Stored as an integer holding `0` or `1`.
    Bool,
    Int,
    UInt,
    BigInt,
    BigUInt,
    Float,
    Double,
    String,
    Bytes,
    /// Stored as its 36 character textual form.
    Uuid,
    /// Unsigned seconds since the unix epoch.
    Date,
    /// `X`, `Y`, `Z`
    Vector3,
    /// `X`, `Y` (unsigned)
    GridVector,
    /// `X`, `Y`, `Z`, `W`
    Quaternion,
    /// `Red`, `Green`, `Blue`
    Color,
    /// `Red`, `Green`, `Blue`, `Alpha`
    ColorAlpha,
    /// `X`, `Y`
    EnvVector2,
    /// `Red`, `Green`, `Blue`, `Value`
    EnvVector4,
}

/// Storage class of one physical column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Bool,
    Integer,
    Unsigned,
    BigInteger,
    BigUnsigned,
    Float,
    Double,
    Text,
    Bytes,
    Uuid,
}

const SCALAR_BOOL: &[(&str, Scalar)] = &[("", Scalar::Bool)];
const SCALAR_INT: &[(&str, Scalar)] = &[("", Scalar::Integer)];
const SCALAR_UINT: &[(&str, Scalar)] = &[("", Scalar::Unsigned)];
const SCALAR_BIGINT: &[(&str, Scalar)] = &[("", Scalar::BigInteger)];
const SCALAR_BIGUINT: &[(&str, Scalar)] = &[("", Scalar::BigUnsigned)];
const SCALAR_FLOAT: &[(&str, Scalar)] = &[("", Scalar::Float)];
const SCALAR_DOUBLE: &[(&str, Scalar)] = &[("", Scalar::Double)];
const SCALAR_TEXT: &[(&str, Scalar)] = &[("", Scalar::Text)];
const SCALAR_BYTES: &[(&str, Scalar)] = &[("", Scalar::Bytes)];
const SCALAR_UUID: &[(&str, Scalar)] = &[("", Scalar::Uuid)];

const XY_DOUBLE: &[(&str, Scalar)] = &[("X", Scalar::Double), ("Y", Scalar::Double)];
const XY_UNSIGNED: &[(&str, Scalar)] = &[("X", Scalar::Unsigned), ("Y", Scalar::Unsigned)];
const XYZ: &[(&str, Scalar)] = &[
    ("X", Scalar::Double),
    ("Y", Scalar::Double),
    ("Z", Scalar::Double),
];
const XYZW: &[(&str, Scalar)] = &[
    ("X", Scalar::Double),
    ("Y", Scalar::Double),
    ("Z", Scalar::Double),
    ("W", Scalar::Double),
];
const RGB: &[(&str, Scalar)] = &[
    ("Red", Scalar::Double),
    ("Green", Scalar::Double),
    ("Blue", Scalar::Double),
];
const RGBA: &[(&str, Scalar)] = &[
    ("Red", Scalar::Double),
    ("Green", Scalar::Double),
    ("Blue", Scalar::Double),
    ("Alpha", Scalar::Double),
];
const RGBV: &[(&str, Scalar)] = &[
    ("Red", Scalar::Double),
    ("Green", Scalar::Double),
    ("Blue", Scalar::Double),
    ("Value", Scalar::Double),
];

impl ColumnType {
    /// Physical name suffixes and storage classes of this type.
    ///
    /// Scalar types have exactly one component with an empty suffix.
    pub const fn components(self) -> &'static [(&'static str, Scalar)] {
        match self {
            ColumnType::Bool => SCALAR_BOOL,
            ColumnType::Int => SCALAR_INT,
            ColumnType::UInt => SCALAR_UINT,
            ColumnType::BigInt => SCALAR_BIGINT,
            ColumnType::BigUInt | ColumnType::Date => SCALAR_BIGUINT,
            ColumnType::Float => SCALAR_FLOAT,
            ColumnType::Double => SCALAR_DOUBLE,
            ColumnType::String => SCALAR_TEXT,
            ColumnType::Bytes => SCALAR_BYTES,
            ColumnType::Uuid => SCALAR_UUID,
            ColumnType::Vector3 => XYZ,
            ColumnType::GridVector => XY_UNSIGNED,
            ColumnType::Quaternion => XYZW,
            ColumnType::Color => RGB,
            ColumnType::ColorAlpha => RGBA,
            ColumnType::EnvVector2 => XY_DOUBLE,
            ColumnType::EnvVector4 => RGBV,
        }
    }

    pub const fn is_composite(self) -> bool {
        self.components().len() > 1
    }
}

/// Default value of a declared column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    Text(&'static str),
    /// One value per physical column of a composite type, in suffix order.
    Components(&'static [f64]),
}

impl DefaultValue {
    /// Textual form of the all-zero uuid.
    pub const ZERO_UUID: DefaultValue = DefaultValue::Text("00000000-0000-0000-0000-000000000000");
}

/// Default value of one physical column, already encoded for storage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhysicalDefault {
    Int(i64),
    UInt(u64),
    Double(f64),
    Text(&'static str),
}

/// A real database column.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalColumn {
    pub name: String,
    pub suffix: &'static str,
    pub scalar: Scalar,
    pub default: Option<PhysicalDefault>,
}

/// A declared column with its storage characteristics.
///
/// Built with `const fn`s so scripts can live in `static` items:
///
/// ```
/// use tablerev_core::{Column, ColumnType, DefaultValue};
///
/// const OWNER: Column = Column::new("Owner", ColumnType::Uuid)
///     .not_null()
///     .with_default(DefaultValue::ZERO_UUID);
///
/// assert!(!OWNER.nullable);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
    /// Maximum length of `String`/`Bytes` columns.
    pub cardinality: Option<u32>,
    /// Large object storage for `String`/`Bytes` columns.
    pub long: bool,
    /// Fixed length storage for `String`/`Bytes` columns with a cardinality.
    pub fixed: bool,
}

impl Column {
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
            default: None,
            cardinality: None,
            long: false,
            fixed: false,
        }
    }

    pub const fn not_null(self) -> Self {
        Self {
            nullable: false,
            ..self
        }
    }

    pub const fn with_default(self, default: DefaultValue) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }

    pub const fn cardinality(self, cardinality: u32) -> Self {
        Self {
            cardinality: Some(cardinality),
            ..self
        }
    }

    pub const fn long(self) -> Self {
        Self { long: true, ..self }
    }

    pub const fn fixed(self) -> Self {
        Self {
            fixed: true,
            ..self
        }
    }

    /// Same column under another name.
    pub const fn renamed(self, name: &'static str) -> Self {
        Self { name, ..self }
    }

    /// True when both columns are stored identically, names aside.
    pub fn same_storage(&self, other: &Column) -> bool {
        self.renamed("") == other.renamed("")
    }

    /// Whether the default value fits the column type.
    ///
    /// Composite defaults need one value per component, each representable in
    /// the component's storage class; a negative or fractional value never
    /// fits an unsigned component.
    pub fn default_matches_type(&self) -> bool {
        let Some(default) = self.default else {
            return true;
        };

        match (default, self.ty.components()) {
            (DefaultValue::Components(values), components) if self.ty.is_composite() => {
                values.len() == components.len()
                    && values
                        .iter()
                        .zip(components)
                        .all(|(value, (_, scalar))| component_fits(*value, *scalar))
            }
            (DefaultValue::Components(_), _) => false,
            (default, [(_, scalar)]) => scalar_fits(default, *scalar),
            _ => false,
        }
    }

    /// Physical columns in suffix order.
    pub fn physical(&self) -> Vec<PhysicalColumn> {
        self.ty
            .components()
            .iter()
            .enumerate()
            .map(|(index, &(suffix, scalar))| PhysicalColumn {
                name: format!("{}{}", self.name, suffix),
                suffix,
                scalar,
                default: self.default.and_then(|d| encode_default(d, index, scalar)),
            })
            .collect()
    }

    /// Physical column names in suffix order.
    pub fn physical_names(&self) -> Vec<String> {
        self.ty
            .components()
            .iter()
            .map(|(suffix, _)| format!("{}{}", self.name, suffix))
            .collect()
    }
}

fn scalar_fits(default: DefaultValue, scalar: Scalar) -> bool {
    match (scalar, default) {
        (Scalar::Bool, DefaultValue::Bool(_)) => true,
        (Scalar::Bool, DefaultValue::Int(v)) => v == 0 || v == 1,
        (Scalar::Bool, DefaultValue::UInt(v)) => v <= 1,
        (Scalar::Integer, DefaultValue::Int(v)) => i32::try_from(v).is_ok(),
        (Scalar::Integer, DefaultValue::UInt(v)) => i32::try_from(v).is_ok(),
        (Scalar::BigInteger, DefaultValue::Int(_)) => true,
        (Scalar::BigInteger, DefaultValue::UInt(v)) => i64::try_from(v).is_ok(),
        (Scalar::Unsigned, DefaultValue::Int(v)) => u32::try_from(v).is_ok(),
        (Scalar::Unsigned, DefaultValue::UInt(v)) => u32::try_from(v).is_ok(),
        (Scalar::BigUnsigned, DefaultValue::Int(v)) => v >= 0,
        (Scalar::BigUnsigned, DefaultValue::UInt(_)) => true,
        (Scalar::Float | Scalar::Double, DefaultValue::Int(_) | DefaultValue::UInt(_)) => true,
        (Scalar::Float | Scalar::Double, DefaultValue::Double(v)) => v.is_finite(),
        (Scalar::Text, DefaultValue::Text(_)) => true,
        (Scalar::Uuid, DefaultValue::Text(v)) => v.len() == 36,
        _ => false,
    }
}

fn component_fits(value: f64, scalar: Scalar) -> bool {
    if !value.is_finite() {
        return false;
    }

    let whole = value.fract() == 0.0;

    match scalar {
        Scalar::Unsigned => whole && (0.0..=f64::from(u32::MAX)).contains(&value),
        Scalar::BigUnsigned => whole && value >= 0.0,
        Scalar::Bool | Scalar::Integer | Scalar::BigInteger => whole,
        Scalar::Float | Scalar::Double => true,
        Scalar::Text | Scalar::Bytes | Scalar::Uuid => false,
    }
}

fn encode_default(default: DefaultValue, index: usize, scalar: Scalar) -> Option<PhysicalDefault> {
    let encoded = match default {
        DefaultValue::Bool(v) => PhysicalDefault::Int(i64::from(v)),
        DefaultValue::Int(v) => PhysicalDefault::Int(v),
        DefaultValue::UInt(v) => PhysicalDefault::UInt(v),
        DefaultValue::Double(v) => PhysicalDefault::Double(v),
        DefaultValue::Text(v) => PhysicalDefault::Text(v),
        DefaultValue::Components(values) => {
            let value = *values.get(index)?;
            match scalar {
                Scalar::Unsigned | Scalar::BigUnsigned => PhysicalDefault::UInt(value as u64),
                Scalar::Integer | Scalar::BigInteger | Scalar::Bool => {
                    PhysicalDefault::Int(value as i64)
                }
                _ => PhysicalDefault::Double(value),
            }
        }
    };

    Some(encoded)
}
