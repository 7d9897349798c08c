//! HID short-item model and wire format (\[HID\] Section 5.2, 6.2.2).
//!
//! A report descriptor is a flat sequence of short items. Each item
//! serializes as a one-byte prefix holding the tag, the item type, and a
//! size code, followed by 0, 1, 2, or 4 little-endian payload bytes. Long
//! items (prefix `0xFE`) are reserved by HID 1.11, unused in practice, and
//! rejected here.

#![allow(clippy::unusual_byte_groupings)] // Tag opcodes group as tag-type.

use core::fmt;

pub mod usage;

/// Error type returned by the descriptor parser.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The stream ended in the middle of an item. The offset is the
    /// position of the item's prefix byte.
    #[error("malformed descriptor: truncated item at offset {0}")]
    Malformed(usize),
    /// A long item prefix was encountered.
    #[error("unsupported long item at offset {0}")]
    LongItem(usize),
}

/// Common parse result type.
pub type Result<T> = core::result::Result<T, Error>;

/// Long item prefix byte (\[HID\] Section 6.2.2.3).
pub const LONG_ITEM_PREFIX: u8 = 0xFE;

/// Item tag specifying the function of the item
/// (\[HID\] Section 6.2.2.4, 6.2.2.7, 6.2.2.8).
#[derive(Clone, Copy, Debug, Eq, PartialEq, num_enum::TryFromPrimitive)]
#[non_exhaustive]
#[repr(u8)]
pub enum Tag {
    // Main
    Input = 0b1000_00 << 2,
    Output = 0b1001_00 << 2,
    Feature = 0b1011_00 << 2,
    Collection = 0b1010_00 << 2,
    EndCollection = 0b1100_00 << 2,

    // Global
    UsagePage = 0b0000_01 << 2,
    LogicalMin = 0b0001_01 << 2,
    LogicalMax = 0b0010_01 << 2,
    PhysicalMin = 0b0011_01 << 2,
    PhysicalMax = 0b0100_01 << 2,
    UnitExponent = 0b0101_01 << 2,
    Unit = 0b0110_01 << 2,
    ReportSize = 0b0111_01 << 2,
    ReportId = 0b1000_01 << 2,
    ReportCount = 0b1001_01 << 2,
    Push = 0b1010_01 << 2,
    Pop = 0b1011_01 << 2,

    // Local
    Usage = 0b0000_10 << 2,
    UsageMin = 0b0001_10 << 2,
    UsageMax = 0b0010_10 << 2,
    DesignatorIndex = 0b0011_10 << 2,
    DesignatorMin = 0b0100_10 << 2,
    DesignatorMax = 0b0101_10 << 2,
    StringIndex = 0b0111_10 << 2,
    StringMin = 0b1000_10 << 2,
    StringMax = 0b1001_10 << 2,
    Delimiter = 0b1010_10 << 2,

    // Long
    Long = 0b1111_11 << 2,
}

impl Tag {
    /// Returns the tag opcode with a zero size code.
    #[inline(always)]
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Returns the tag's display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Output => "Output",
            Self::Feature => "Feature",
            Self::Collection => "Collection",
            Self::EndCollection => "EndCollection",
            Self::UsagePage => "UsagePage",
            Self::LogicalMin => "LogicalMin",
            Self::LogicalMax => "LogicalMax",
            Self::PhysicalMin => "PhysicalMin",
            Self::PhysicalMax => "PhysicalMax",
            Self::UnitExponent => "UnitExponent",
            Self::Unit => "Unit",
            Self::ReportSize => "ReportSize",
            Self::ReportId => "ReportId",
            Self::ReportCount => "ReportCount",
            Self::Push => "Push",
            Self::Pop => "Pop",
            Self::Usage => "Usage",
            Self::UsageMin => "UsageMin",
            Self::UsageMax => "UsageMax",
            Self::DesignatorIndex => "DesignatorIndex",
            Self::DesignatorMin => "DesignatorMin",
            Self::DesignatorMax => "DesignatorMax",
            Self::StringIndex => "StringIndex",
            Self::StringMin => "StringMin",
            Self::StringMax => "StringMax",
            Self::Delimiter => "Delimiter",
            Self::Long => "Long",
        }
    }
}

bitflags::bitflags! {
    /// Input, Output, and Feature item data flags (\[HID\] Section 6.2.2.5).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct Flag: u16 {
        /// Constant (static read-only field) rather than modifiable data.
        const CONST = 1 << 0;
        /// Variable fields, one per control, rather than an array of
        /// indices of asserted controls.
        const VAR = 1 << 1;
        /// Relative (change since the last report) rather than absolute.
        const REL = 1 << 2;
        /// Value rolls over when passing either extreme.
        const WRAP = 1 << 3;
        /// Raw data no longer relates linearly to what is measured.
        const NON_LINEAR = 1 << 4;
        /// The control has no preferred state to return to.
        const NO_PREF = 1 << 5;
        /// The control has a state in which it sends no meaningful data,
        /// reported as a value outside the logical extents.
        const NULL = 1 << 6;
        /// Output or Feature value may change without host interaction.
        const VOLATILE = 1 << 7;
        /// The field is a fixed-size byte stream, not a numeric quantity.
        const BYTES = 1 << 8;
    }
}

/// Collection type (\[HID\] Section 6.2.2.6).
#[derive(Clone, Copy, Debug, Eq, PartialEq, num_enum::FromPrimitive)]
#[non_exhaustive]
#[repr(u8)]
pub enum CollectionKind {
    /// Data items collected at one geometric point.
    Physical = 0x00,
    /// A grouping familiar to applications: mouse, keyboard, joystick.
    Application = 0x01,
    /// Data items forming a composite structure.
    Logical = 0x02,
    /// Wraps all the fields of one report.
    Report = 0x03,
    /// Names an array of selector usages.
    NamedArray = 0x04,
    /// Special-cases the usages it contains.
    UsageSwitch = 0x05,
    /// Extends the operating mode of the enclosing usage.
    UsageModifier = 0x06,
    /// Reserved or vendor-defined collection type.
    #[num_enum(catch_all)]
    Other(u8),
}

impl CollectionKind {
    /// Returns the raw collection type byte.
    #[must_use]
    pub const fn raw(self) -> u8 {
        match self {
            Self::Physical => 0x00,
            Self::Application => 0x01,
            Self::Logical => 0x02,
            Self::Report => 0x03,
            Self::NamedArray => 0x04,
            Self::UsageSwitch => 0x05,
            Self::UsageModifier => 0x06,
            Self::Other(v) => v,
        }
    }
}

/// Report section selected by a main item.
#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    /// Data read from the device.
    #[default]
    Input,
    /// Data written to the device.
    Output,
    /// Configuration data not intended for the end user.
    Feature,
}

impl ReportType {
    /// Returns the lowercase section name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Feature => "feature",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical unit encoding (\[HID\] Section 6.2.2.7): seven nibbles, the low
/// one selecting the unit system (1-4) and the remaining six holding signed
/// exponents for each unit type. Only the raw encoding is modeled; the
/// common codes are provided as constants.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(transparent)]
pub struct Unit(u32);

impl Unit {
    /// No unit.
    pub const NONE: Self = Self(0);
    /// SI linear length.
    pub const CENTIMETERS: Self = Self(0x11);
    /// SI rotation.
    pub const RADIANS: Self = Self(0x12);
    /// English linear length.
    pub const INCHES: Self = Self(0x13);
    /// English rotation.
    pub const DEGREES: Self = Self(0x14);
    /// Time (SI linear).
    pub const SECONDS: Self = Self(0x1001);

    /// Wraps a raw unit value.
    #[inline(always)]
    #[must_use]
    pub const fn from_raw(v: u32) -> Self {
        Self(v)
    }

    /// Returns the raw unit value for the report descriptor.
    #[inline(always)]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Report descriptor item (\[HID\] Section 5.2, 6.2.2).
///
/// One or more report fields are defined by a Main item and described by
/// the Global and Local items preceding it. Global items set defaults that
/// persist across main items; Local items only describe the next one.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Item {
    /// Data fields read from the device.
    Input(Flag),
    /// Data fields written to the device.
    Output(Flag),
    /// Configuration fields not intended for the end user.
    Feature(Flag),
    /// Opens a grouping of Input, Output, and Feature items.
    Collection(CollectionKind),
    /// Closes the innermost open collection.
    EndCollection,

    /// Current usage page, qualifying subsequent usage IDs.
    UsagePage(u16),
    /// Minimum extent value in logical units.
    LogicalMin(i32),
    /// Maximum extent value in logical units.
    LogicalMax(i32),
    /// Logical minimum with units applied.
    PhysicalMin(i32),
    /// Logical maximum with units applied.
    PhysicalMax(i32),
    /// Base-10 exponent applied to the physical unit.
    UnitExponent(i32),
    /// Physical unit nibbles. See [`Unit`].
    Unit(u32),
    /// Size of each generated report field in bits.
    ReportSize(u32),
    /// Report ID multiplexing reports over one endpoint. ID 0 is reserved
    /// for the default report and never appears in a descriptor.
    ReportId(u8),
    /// Number of fields generated by the next main item.
    ReportCount(u32),
    /// Pushes a copy of the global item table onto the state stack.
    Push,
    /// Restores the global item table from the state stack.
    Pop,

    /// Suggested usage for the next main item or collection.
    Usage(u32),
    /// Starting usage of an inclusive range.
    UsageMin(u32),
    /// Ending usage of an inclusive range.
    UsageMax(u32),
    /// Designator index into the physical descriptor.
    DesignatorIndex(u32),
    /// Starting designator of a range.
    DesignatorMin(u32),
    /// Ending designator of a range.
    DesignatorMax(u32),
    /// String descriptor index associated with a control.
    StringIndex(u32),
    /// Starting string index of a range.
    StringMin(u32),
    /// Ending string index of a range.
    StringMax(u32),
    /// Opens (1) or closes (0) a set of aliased usages.
    Delimiter(u32),

    /// Any tag this library does not interpret, kept verbatim so that
    /// re-serialization is lossless.
    Unknown {
        /// Original prefix byte (tag, type, and size code).
        prefix: u8,
        /// Raw payload, little-endian.
        data: u32,
    },
}

impl Item {
    /// Returns the item's tag, unless the tag is unrecognized.
    #[must_use]
    pub const fn tag(&self) -> Option<Tag> {
        Some(match *self {
            Self::Input(_) => Tag::Input,
            Self::Output(_) => Tag::Output,
            Self::Feature(_) => Tag::Feature,
            Self::Collection(_) => Tag::Collection,
            Self::EndCollection => Tag::EndCollection,
            Self::UsagePage(_) => Tag::UsagePage,
            Self::LogicalMin(_) => Tag::LogicalMin,
            Self::LogicalMax(_) => Tag::LogicalMax,
            Self::PhysicalMin(_) => Tag::PhysicalMin,
            Self::PhysicalMax(_) => Tag::PhysicalMax,
            Self::UnitExponent(_) => Tag::UnitExponent,
            Self::Unit(_) => Tag::Unit,
            Self::ReportSize(_) => Tag::ReportSize,
            Self::ReportId(_) => Tag::ReportId,
            Self::ReportCount(_) => Tag::ReportCount,
            Self::Push => Tag::Push,
            Self::Pop => Tag::Pop,
            Self::Usage(_) => Tag::Usage,
            Self::UsageMin(_) => Tag::UsageMin,
            Self::UsageMax(_) => Tag::UsageMax,
            Self::DesignatorIndex(_) => Tag::DesignatorIndex,
            Self::DesignatorMin(_) => Tag::DesignatorMin,
            Self::DesignatorMax(_) => Tag::DesignatorMax,
            Self::StringIndex(_) => Tag::StringIndex,
            Self::StringMin(_) => Tag::StringMin,
            Self::StringMax(_) => Tag::StringMax,
            Self::Delimiter(_) => Tag::Delimiter,
            Self::Unknown { .. } => return None,
        })
    }

    /// Returns the opcode identifying the item's tag and type.
    #[must_use]
    pub fn tag_code(&self) -> u8 {
        match *self {
            Self::Unknown { prefix, .. } => prefix & !3,
            ref it => it.tag().map_or(0, Tag::code),
        }
    }

    /// Returns the tag's display name.
    #[must_use]
    pub fn tag_name(&self) -> &'static str {
        self.tag().map_or("Unknown", Tag::name)
    }

    /// Returns the payload as a plain integer, if the item carries one.
    #[must_use]
    pub fn data(&self) -> Option<i64> {
        match *self {
            Self::Input(f) | Self::Output(f) | Self::Feature(f) => Some(f.bits().into()),
            Self::Collection(k) => Some(k.raw().into()),
            Self::EndCollection | Self::Push | Self::Pop => None,
            Self::LogicalMin(v)
            | Self::LogicalMax(v)
            | Self::PhysicalMin(v)
            | Self::PhysicalMax(v)
            | Self::UnitExponent(v) => Some(v.into()),
            Self::UsagePage(v) => Some(v.into()),
            Self::ReportId(v) => Some(v.into()),
            Self::Unit(v)
            | Self::ReportSize(v)
            | Self::ReportCount(v)
            | Self::Usage(v)
            | Self::UsageMin(v)
            | Self::UsageMax(v)
            | Self::DesignatorIndex(v)
            | Self::DesignatorMin(v)
            | Self::DesignatorMax(v)
            | Self::StringIndex(v)
            | Self::StringMin(v)
            | Self::StringMax(v)
            | Self::Delimiter(v) => Some(v.into()),
            Self::Unknown { prefix, data } => (prefix & 3 != 0).then_some(data.into()),
        }
    }
}

/// Serializes `items` into descriptor bytes.
#[must_use]
pub fn serialize(items: &[Item]) -> Vec<u8> {
    let mut out = Vec::with_capacity(items.len() * 2);
    for it in items {
        put(&mut out, it);
    }
    out
}

/// Parses descriptor bytes into a flat item list, preserving order.
///
/// Unknown tags are kept structurally so that re-serialization is lossless.
/// Fails with [`Error::Malformed`] when the stream ends mid-item and with
/// [`Error::LongItem`] on a `0xFE` prefix.
pub fn parse(bytes: &[u8]) -> Result<Vec<Item>> {
    let mut items = Vec::new();
    let mut i = 0;
    while let Some(&prefix) = bytes.get(i) {
        if prefix == LONG_ITEM_PREFIX {
            return Err(Error::LongItem(i));
        }
        let n = payload_len(prefix & 3);
        let Some(data) = bytes.get(i + 1..i + 1 + n) else {
            return Err(Error::Malformed(i));
        };
        let mut v = [0_u8; 4];
        v[..n].copy_from_slice(data);
        items.push(decode(prefix, u32::from_le_bytes(v), n));
        i += 1 + n;
    }
    Ok(items)
}

/// Renders an item list as JSON for external tooling. Every element is a
/// `{tag_code, tag_name, data}` object; items without a payload have a
/// `null` data member.
#[must_use]
pub fn to_json(items: &[Item]) -> serde_json::Value {
    serde_json::Value::Array(
        items
            .iter()
            .map(|it| {
                serde_json::json!({
                    "tag_code": it.tag_code(),
                    "tag_name": it.tag_name(),
                    "data": it.data(),
                })
            })
            .collect(),
    )
}

/// Maps a prefix size code to the payload length in bytes (3 means 4).
const fn payload_len(size_code: u8) -> usize {
    (4 >> (3 - size_code)) as usize
}

/// Appends one serialized item.
fn put(out: &mut Vec<u8>, v: &Item) {
    match *v {
        Item::Input(f) => put_u32(out, Tag::Input, f.bits().into()),
        Item::Output(f) => put_u32(out, Tag::Output, f.bits().into()),
        Item::Feature(f) => put_u32(out, Tag::Feature, f.bits().into()),
        Item::Collection(k) => put_u32(out, Tag::Collection, k.raw().into()),
        Item::EndCollection => out.push(Tag::EndCollection.code()),

        Item::UsagePage(v) => put_u32(out, Tag::UsagePage, v.into()),
        Item::LogicalMin(v) => put_i32(out, Tag::LogicalMin, v),
        Item::LogicalMax(v) => put_i32(out, Tag::LogicalMax, v),
        Item::PhysicalMin(v) => put_i32(out, Tag::PhysicalMin, v),
        Item::PhysicalMax(v) => put_i32(out, Tag::PhysicalMax, v),
        Item::UnitExponent(v) => put_i32(out, Tag::UnitExponent, v),
        Item::Unit(v) => put_u32(out, Tag::Unit, v),
        Item::ReportSize(v) => put_u32(out, Tag::ReportSize, v),
        Item::ReportId(v) => put_u32(out, Tag::ReportId, v.into()),
        Item::ReportCount(v) => put_u32(out, Tag::ReportCount, v),
        Item::Push => out.push(Tag::Push.code()),
        Item::Pop => out.push(Tag::Pop.code()),

        Item::Usage(v) => put_u32(out, Tag::Usage, v),
        Item::UsageMin(v) => put_u32(out, Tag::UsageMin, v),
        Item::UsageMax(v) => put_u32(out, Tag::UsageMax, v),
        Item::DesignatorIndex(v) => put_u32(out, Tag::DesignatorIndex, v),
        Item::DesignatorMin(v) => put_u32(out, Tag::DesignatorMin, v),
        Item::DesignatorMax(v) => put_u32(out, Tag::DesignatorMax, v),
        Item::StringIndex(v) => put_u32(out, Tag::StringIndex, v),
        Item::StringMin(v) => put_u32(out, Tag::StringMin, v),
        Item::StringMax(v) => put_u32(out, Tag::StringMax, v),
        Item::Delimiter(v) => put_u32(out, Tag::Delimiter, v),

        Item::Unknown { prefix, data } => {
            out.push(prefix);
            out.extend_from_slice(&data.to_le_bytes()[..payload_len(prefix & 3)]);
        }
    }
}

/// Appends a short item with an unsigned payload, using the smallest of 1,
/// 2, or 4 bytes that holds the value. Zero-size payloads are never
/// produced since Windows mishandles some of them; this also matches the
/// HID Descriptor Tool.
fn put_u32(out: &mut Vec<u8>, t: Tag, v: u32) {
    #[allow(clippy::cast_possible_truncation)]
    let n = if u32::from(v as u16) != v {
        4
    } else if u32::from(v as u8) != v {
        2
    } else {
        1
    };
    put_raw(out, t, v.to_le_bytes(), n);
}

/// Appends a short item with a signed payload in two's complement at the
/// smallest of 1, 2, or 4 bytes.
fn put_i32(out: &mut Vec<u8>, t: Tag, v: i32) {
    #[allow(clippy::cast_possible_truncation)]
    let n = if i32::from(v as i16) != v {
        4
    } else if i32::from(v as i8) != v {
        2
    } else {
        1
    };
    put_raw(out, t, v.to_le_bytes(), n);
}

fn put_raw(out: &mut Vec<u8>, t: Tag, v: [u8; 4], n: usize) {
    #[allow(clippy::cast_possible_truncation)]
    out.push(t.code() | (n.trailing_zeros() as u8 + 1));
    out.extend_from_slice(&v[..n]);
}

/// Builds a typed item from a parsed prefix and payload.
#[allow(clippy::cast_possible_truncation)]
fn decode(prefix: u8, raw: u32, n: usize) -> Item {
    let Ok(tag) = Tag::try_from(prefix & !3) else {
        return Item::Unknown { prefix, data: raw };
    };
    let signed = as_i32(raw, n);
    match tag {
        Tag::Input => Item::Input(Flag::from_bits_retain(raw as u16)),
        Tag::Output => Item::Output(Flag::from_bits_retain(raw as u16)),
        Tag::Feature => Item::Feature(Flag::from_bits_retain(raw as u16)),
        Tag::Collection => Item::Collection(CollectionKind::from(raw as u8)),
        Tag::EndCollection => Item::EndCollection,
        Tag::UsagePage => Item::UsagePage(raw as u16),
        Tag::LogicalMin => Item::LogicalMin(signed),
        Tag::LogicalMax => Item::LogicalMax(signed),
        Tag::PhysicalMin => Item::PhysicalMin(signed),
        Tag::PhysicalMax => Item::PhysicalMax(signed),
        Tag::UnitExponent => Item::UnitExponent(signed),
        Tag::Unit => Item::Unit(raw),
        Tag::ReportSize => Item::ReportSize(raw),
        Tag::ReportId => Item::ReportId(raw as u8),
        Tag::ReportCount => Item::ReportCount(raw),
        Tag::Push => Item::Push,
        Tag::Pop => Item::Pop,
        Tag::Usage => Item::Usage(raw),
        Tag::UsageMin => Item::UsageMin(raw),
        Tag::UsageMax => Item::UsageMax(raw),
        Tag::DesignatorIndex => Item::DesignatorIndex(raw),
        Tag::DesignatorMin => Item::DesignatorMin(raw),
        Tag::DesignatorMax => Item::DesignatorMax(raw),
        Tag::StringIndex => Item::StringIndex(raw),
        Tag::StringMin => Item::StringMin(raw),
        Tag::StringMax => Item::StringMax(raw),
        Tag::Delimiter => Item::Delimiter(raw),
        // 0xFC, 0xFD, 0xFF: long tag with a non-reserved size code.
        Tag::Long => Item::Unknown { prefix, data: raw },
    }
}

/// Sign-extends an `n`-byte little-endian payload. A missing payload is 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const fn as_i32(raw: u32, n: usize) -> i32 {
    match n {
        1 => raw as u8 as i8 as i32,
        2 => raw as u16 as i16 as i32,
        _ => raw as i32,
    }
}
