//! Analyzed descriptor layout: per-report, per-section ordered lists of
//! bit-positioned fields. A layout is immutable once analysis has produced
//! it and may be shared freely for concurrent read-only codec use.

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::bits;
use crate::spec::ReportType;

/// A single bit-positioned report field.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// Display name, unique among the named fields of its section.
    pub name: String,
    /// First bit of the field within its section.
    pub bit_offset: u32,
    /// Field width in bits.
    pub bit_width: u32,
    /// Usage page qualifying `usage_id`.
    pub usage_page: u16,
    /// Usage ID; 0 marks alignment padding.
    pub usage_id: u32,
    /// Minimum reported value.
    pub logical_min: i32,
    /// Maximum reported value.
    pub logical_max: i32,
    /// Physical extent minimum.
    pub physical_min: i32,
    /// Physical extent maximum.
    pub physical_max: i32,
    /// Values are two's complement.
    pub signed: bool,
    /// Section the field belongs to.
    pub report_type: ReportType,
    /// Report the field belongs to; 0 is the default report.
    pub report_id: u8,
}

impl Field {
    /// First byte touched by the field.
    #[inline]
    #[must_use]
    pub const fn byte_offset(&self) -> u32 {
        self.bit_offset / 8
    }

    /// Mask covering the field's bits before shifting into place.
    #[inline]
    #[must_use]
    pub const fn mask(&self) -> u64 {
        bits::mask(self.bit_width)
    }

    /// Whether the field is alignment filler with no usage.
    #[inline]
    #[must_use]
    pub const fn is_padding(&self) -> bool {
        self.usage_id == 0
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, s: S) -> core::result::Result<S::Ok, S::Error> {
        let mut st = s.serialize_struct("Field", 14)?;
        st.serialize_field("bit_offset", &self.bit_offset)?;
        st.serialize_field("bit_width", &self.bit_width)?;
        st.serialize_field("byte_offset", &self.byte_offset())?;
        st.serialize_field("mask", &self.mask())?;
        st.serialize_field("name", &self.name)?;
        st.serialize_field("usage_page", &self.usage_page)?;
        st.serialize_field("usage_id", &self.usage_id)?;
        st.serialize_field("logical_min", &self.logical_min)?;
        st.serialize_field("logical_max", &self.logical_max)?;
        st.serialize_field("physical_min", &self.physical_min)?;
        st.serialize_field("physical_max", &self.physical_max)?;
        st.serialize_field("signed", &self.signed)?;
        st.serialize_field("report_type", &self.report_type)?;
        st.serialize_field("report_id", &self.report_id)?;
        st.end()
    }
}

/// Ordered fields of one `(report_id, report_type)` pair. Fields appear in
/// descriptor order, which is also `bit_offset` order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Section {
    /// Section type.
    pub report_type: ReportType,
    /// Owning report ID.
    pub report_id: u8,
    /// Fields in bit order.
    pub fields: Vec<Field>,
}

impl Section {
    /// Size of the section in bytes, padded to the next byte boundary.
    /// Zero when the section is empty.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.fields
            .iter()
            .map(|f| ((f.bit_offset + f.bit_width) as usize + 7) / 8)
            .max()
            .unwrap_or(0)
    }

    /// Looks up a non-padding field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| !f.is_padding() && f.name == name)
    }

    /// Whether the section holds no fields at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Section {
    fn serialize<S: Serializer>(&self, s: S) -> core::result::Result<S::Ok, S::Error> {
        let mut st = s.serialize_struct("Section", 4)?;
        st.serialize_field("report_type", &self.report_type)?;
        st.serialize_field("report_id", &self.report_id)?;
        st.serialize_field("size_bytes", &self.size_bytes())?;
        st.serialize_field("fields", &self.fields)?;
        st.end()
    }
}

/// Input, Output, and Feature sections of one report.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ReportLayout {
    /// Report ID; 0 is the default report.
    pub report_id: u8,
    /// Input section.
    pub input: Section,
    /// Output section.
    pub output: Section,
    /// Feature section.
    pub feature: Section,
}

impl ReportLayout {
    fn new(report_id: u8) -> Self {
        let section = |report_type| Section {
            report_type,
            report_id,
            fields: Vec::new(),
        };
        Self {
            report_id,
            input: section(ReportType::Input),
            output: section(ReportType::Output),
            feature: section(ReportType::Feature),
        }
    }

    /// Returns the section for `ty`.
    #[must_use]
    pub const fn section(&self, ty: ReportType) -> &Section {
        match ty {
            ReportType::Input => &self.input,
            ReportType::Output => &self.output,
            ReportType::Feature => &self.feature,
        }
    }

    fn section_mut(&mut self, ty: ReportType) -> &mut Section {
        match ty {
            ReportType::Input => &mut self.input,
            ReportType::Output => &mut self.output,
            ReportType::Feature => &mut self.feature,
        }
    }
}

/// Field layout of an entire descriptor, keyed by Report ID.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct Layout {
    reports: BTreeMap<u8, ReportLayout>,
}

impl Layout {
    /// Report IDs present, ascending.
    #[must_use]
    pub fn report_ids(&self) -> Vec<u8> {
        self.reports.keys().copied().collect()
    }

    /// Returns one report's layout.
    #[must_use]
    pub fn report(&self, id: u8) -> Option<&ReportLayout> {
        self.reports.get(&id)
    }

    /// Returns the section for a `(report_id, report_type)` pair.
    #[must_use]
    pub fn section(&self, id: u8, ty: ReportType) -> Option<&Section> {
        self.reports.get(&id).map(|r| r.section(ty))
    }

    /// Whether runtime packets carry a leading Report ID byte.
    #[must_use]
    pub fn uses_report_ids(&self) -> bool {
        self.reports.len() > 1 || self.reports.keys().next().is_some_and(|&id| id != 0)
    }

    /// The only Report ID, when unambiguous. An empty layout resolves to
    /// the default report.
    #[must_use]
    pub fn sole_report_id(&self) -> Option<u8> {
        match self.reports.len() {
            0 => Some(0),
            1 => self.reports.keys().next().copied(),
            _ => None,
        }
    }

    /// All fields across all reports and sections, in report order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.reports.values().flat_map(|r| {
            r.input
                .fields
                .iter()
                .chain(&r.output.fields)
                .chain(&r.feature.fields)
        })
    }

    /// JSON rendering of the layout map for external tooling.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    pub(crate) fn push_field(&mut self, field: Field) {
        self.reports
            .entry(field.report_id)
            .or_insert_with(|| ReportLayout::new(field.report_id))
            .section_mut(field.report_type)
            .fields
            .push(field);
    }
}
