//! Runtime report codec: bit-packed encode/decode of name→value mappings
//! against an analyzed [`Layout`], multiplexed by Report ID.

use std::collections::BTreeMap;

use serde::ser::{Serialize, Serializer};
use tracing::warn;

use crate::bits;
use crate::layout::{Field, Layout, Section};
use crate::spec::{usage, ReportType};

/// Error type returned by encode and decode.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The mapping names a field absent from the selected section.
    #[error("unknown field {0:?}")]
    UnknownField(String),
    /// A strict-mode value lies outside the field's range.
    #[error("value {value} for field {field:?} is outside {min}..={max}")]
    FieldOverflow {
        /// Offending field name.
        field: String,
        /// Rejected value.
        value: i64,
        /// Lower bound.
        min: i64,
        /// Upper bound.
        max: i64,
    },
    /// A Report ID with no matching section.
    #[error("unknown report id {0}")]
    UnknownReportId(u8),
    /// The layout defines several reports and no ID was given.
    #[error("report id required, descriptor defines reports {0:?}")]
    AmbiguousReportId(Vec<u8>),
    /// Packet length does not match the section size.
    #[error("expected {expected} payload bytes, got {actual}")]
    SizeMismatch {
        /// Section size recorded in the layout.
        expected: usize,
        /// Payload length received.
        actual: usize,
    },
    /// Decode input was empty.
    #[error("empty report packet")]
    EmptyPacket,
}

/// Common codec result type.
pub type Result<T> = core::result::Result<T, Error>;

/// A decoded or to-be-encoded field value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Value {
    /// On/off control. Single-bit Button-page fields decode to this.
    Bool(bool),
    /// Numeric control.
    Int(i64),
}

impl Value {
    /// Numeric form of the value; booleans map to 0/1.
    #[inline]
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Bool(b) => b as i64,
            Self::Int(v) => v,
        }
    }
}

impl From<bool> for Value {
    #[inline(always)]
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    #[inline(always)]
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    #[inline(always)]
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u32> for Value {
    #[inline(always)]
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, s: S) -> core::result::Result<S::Ok, S::Error> {
        match *self {
            Self::Bool(v) => s.serialize_bool(v),
            Self::Int(v) => s.serialize_i64(v),
        }
    }
}

/// Field values of one report section, keyed by field name.
pub type Values = BTreeMap<String, Value>;

/// Report encoder/decoder over an immutable layout.
#[derive(Clone, Copy, Debug)]
pub struct Codec<'a> {
    layout: &'a Layout,
    strict: bool,
}

impl<'a> Codec<'a> {
    /// Creates a codec in clamping (non-strict) mode.
    #[inline]
    #[must_use]
    pub const fn new(layout: &'a Layout) -> Self {
        Self {
            layout,
            strict: false,
        }
    }

    /// Switches to strict mode: out-of-range values are rejected instead
    /// of clamped.
    #[inline]
    #[must_use]
    pub const fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Encodes `values` into a report packet for the selected report and
    /// section. Fields absent from the mapping keep their zeroed default;
    /// names absent from the section are rejected. When the descriptor
    /// uses Report IDs the packet gains a leading ID byte.
    pub fn encode(
        &self,
        values: &Values,
        report_id: Option<u8>,
        ty: ReportType,
    ) -> Result<Vec<u8>> {
        let id = self.resolve(report_id)?;
        let section = self.section(id, ty)?;
        for name in values.keys() {
            if section.field(name).is_none() {
                return Err(Error::UnknownField(name.clone()));
            }
        }
        let mut buf = vec![0; section.size_bytes()];
        for f in &section.fields {
            if f.is_padding() {
                continue;
            }
            let Some(v) = values.get(&f.name) else {
                continue;
            };
            let v = self.bound(f, v.as_i64())?;
            #[allow(clippy::cast_sign_loss)]
            bits::write(&mut buf, f.bit_offset, f.bit_width, v as u64);
        }
        if self.layout.uses_report_ids() {
            buf.insert(0, id);
        }
        Ok(buf)
    }

    /// Decodes a report packet into its Report ID and field values. When
    /// the descriptor uses Report IDs the first byte selects the section.
    #[allow(clippy::cast_possible_wrap)]
    pub fn decode(&self, packet: &[u8], ty: ReportType) -> Result<(u8, Values)> {
        let (id, payload) = if self.layout.uses_report_ids() {
            let (&id, payload) = packet.split_first().ok_or(Error::EmptyPacket)?;
            (id, payload)
        } else {
            (self.layout.sole_report_id().unwrap_or(0), packet)
        };
        let section = self.section(id, ty)?;
        let expected = section.size_bytes();
        if payload.len() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: payload.len(),
            });
        }
        let mut values = Values::new();
        for f in &section.fields {
            if f.is_padding() {
                continue;
            }
            let raw = bits::read(payload, f.bit_offset, f.bit_width);
            let v = if f.signed {
                Value::Int(bits::sign_extend(raw, f.bit_width))
            } else if is_button_bit(f) {
                Value::Bool(raw != 0)
            } else {
                Value::Int(raw as i64)
            };
            values.insert(f.name.clone(), v);
        }
        Ok((id, values))
    }

    /// Returns the default value mapping for a section: every non-padding
    /// field at zero, clamped into its range. Useful as an encode
    /// template.
    pub fn defaults(&self, report_id: Option<u8>, ty: ReportType) -> Result<Values> {
        let id = self.resolve(report_id)?;
        let section = self.section(id, ty)?;
        Ok(section
            .fields
            .iter()
            .filter(|f| !f.is_padding())
            .map(|f| {
                let v = if is_button_bit(f) {
                    Value::Bool(false)
                } else {
                    let (min, max) = bounds(f);
                    Value::Int(0.clamp(min, max))
                };
                (f.name.clone(), v)
            })
            .collect())
    }

    fn resolve(&self, report_id: Option<u8>) -> Result<u8> {
        match report_id {
            Some(id) if self.layout.report(id).is_some() => Ok(id),
            Some(id) => Err(Error::UnknownReportId(id)),
            None => self
                .layout
                .sole_report_id()
                .ok_or_else(|| Error::AmbiguousReportId(self.layout.report_ids())),
        }
    }

    fn section(&self, id: u8, ty: ReportType) -> Result<&'a Section> {
        self.layout
            .section(id, ty)
            .ok_or(Error::UnknownReportId(id))
    }

    /// Clamps or rejects `v` against the field's range.
    fn bound(&self, f: &Field, v: i64) -> Result<i64> {
        let (min, max) = bounds(f);
        if (min..=max).contains(&v) {
            return Ok(v);
        }
        if self.strict {
            return Err(Error::FieldOverflow {
                field: f.name.clone(),
                value: v,
                min,
                max,
            });
        }
        let clamped = v.clamp(min, max);
        warn!(field = %f.name, value = v, clamped, "value clamped to field range");
        Ok(clamped)
    }
}

fn is_button_bit(f: &Field) -> bool {
    f.usage_page == u16::from(usage::Page::Button) && f.bit_width == 1
}

/// The range values are validated against: the logical extents when they
/// are declared, otherwise the raw width of the field.
#[allow(clippy::cast_possible_wrap)]
fn bounds(f: &Field) -> (i64, i64) {
    if f.logical_min < f.logical_max {
        (f.logical_min.into(), f.logical_max.into())
    } else if f.bit_width == 0 {
        (0, 0)
    } else if f.signed {
        let half = 1_i64 << (f.bit_width - 1);
        (-half, half - 1)
    } else {
        (0, f.mask() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::analyze;
    use crate::compile::compile;
    use crate::schema::{widgets, Collection, Node, ReportField, ReportGroup};
    use crate::spec::usage::{GenericDesktop, Page};
    use crate::spec::CollectionKind;
    use matches::assert_matches;

    fn mouse_layout() -> Layout {
        let root: Node =
            Collection::new(Page::GenericDesktop, GenericDesktop::Mouse, CollectionKind::Physical)
                .child(widgets::buttons(3))
                .child(widgets::padding(5))
                .child(widgets::axis(GenericDesktop::X))
                .child(widgets::axis(GenericDesktop::Y))
                .child(widgets::axis(GenericDesktop::Wheel))
                .into();
        analyze(&compile(&root).unwrap()).unwrap().layout
    }

    fn values(entries: &[(&str, Value)]) -> Values {
        entries.iter().map(|(k, v)| (String::from(*k), *v)).collect()
    }

    #[test]
    fn encode_mouse_report() {
        let layout = mouse_layout();
        let codec = Codec::new(&layout);
        let packet = codec
            .encode(
                &values(&[("Button_1", true.into()), ("X", 100.into())]),
                None,
                ReportType::Input,
            )
            .unwrap();
        assert_eq!(packet, [0x01, 0x64, 0x00, 0x00]);
    }

    #[test]
    fn decode_round_trip() {
        let layout = mouse_layout();
        let codec = Codec::new(&layout);
        let packet = codec
            .encode(
                &values(&[("Button_1", true.into()), ("X", 100.into())]),
                None,
                ReportType::Input,
            )
            .unwrap();
        let (id, decoded) = codec.decode(&packet, ReportType::Input).unwrap();
        assert_eq!(id, 0);
        assert_eq!(
            decoded,
            values(&[
                ("Button_1", true.into()),
                ("Button_2", false.into()),
                ("Button_3", false.into()),
                ("X", 100.into()),
                ("Y", 0.into()),
                ("Wheel", 0.into()),
            ])
        );
    }

    #[test]
    fn signed_encoding() {
        let layout = mouse_layout();
        let codec = Codec::new(&layout);
        let packet = codec
            .encode(&values(&[("Y", (-10).into())]), None, ReportType::Input)
            .unwrap();
        assert_eq!(packet, [0x00, 0x00, 0xF6, 0x00]);
        let (_, decoded) = codec.decode(&packet, ReportType::Input).unwrap();
        assert_eq!(decoded["Y"], Value::Int(-10));
    }

    #[test]
    fn clamping_and_strict_mode() {
        let layout = mouse_layout();
        let codec = Codec::new(&layout);
        let packet = codec
            .encode(&values(&[("X", 300.into())]), None, ReportType::Input)
            .unwrap();
        assert_eq!(packet[1], 0x7F);
        let packet = codec
            .encode(&values(&[("X", (-300).into())]), None, ReportType::Input)
            .unwrap();
        assert_eq!(packet[1], 0x81); // -127

        let strict = Codec::new(&layout).strict();
        assert_matches!(
            strict.encode(&values(&[("X", 300.into())]), None, ReportType::Input),
            Err(Error::FieldOverflow { value: 300, min: -127, max: 127, .. })
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        let layout = mouse_layout();
        let codec = Codec::new(&layout);
        let err = codec
            .encode(&values(&[("Whel", 1.into())]), None, ReportType::Input)
            .unwrap_err();
        assert_eq!(err, Error::UnknownField("Whel".into()));
        // Padding is not addressable either.
        assert_matches!(
            codec.encode(&values(&[("Padding / Reserved", 1.into())]), None, ReportType::Input),
            Err(Error::UnknownField(_))
        );
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let layout = mouse_layout();
        let codec = Codec::new(&layout);
        assert_matches!(
            codec.decode(&[0x00; 3], ReportType::Input),
            Err(Error::SizeMismatch { expected: 4, actual: 3 })
        );
    }

    #[test]
    fn defaults_template() {
        let layout = mouse_layout();
        let codec = Codec::new(&layout);
        let defaults = codec.defaults(None, ReportType::Input).unwrap();
        assert_eq!(
            defaults,
            values(&[
                ("Button_1", false.into()),
                ("Button_2", false.into()),
                ("Button_3", false.into()),
                ("X", 0.into()),
                ("Y", 0.into()),
                ("Wheel", 0.into()),
            ])
        );
        let packet = codec.encode(&defaults, None, ReportType::Input).unwrap();
        assert_eq!(packet, [0x00; 4]);
    }

    fn multiplexed_layout() -> Layout {
        let root: Node =
            Collection::new(Page::GenericDesktop, GenericDesktop::Gamepad, CollectionKind::Application)
                .child(
                    ReportGroup::new(1)
                        .child(widgets::buttons(8))
                        .child(widgets::axis(GenericDesktop::X))
                        .child(widgets::axis(GenericDesktop::Y)),
                )
                .child(
                    ReportGroup::new(2)
                        .child(ReportField::new(Page::Key, (0xE0..=0xE7).collect(), 1, 8).range(0, 1))
                        .child(widgets::padding(8))
                        .child(widgets::keyboard_keys(6)),
                )
                .into();
        analyze(&compile(&root).unwrap()).unwrap().layout
    }

    #[test]
    fn report_id_multiplexing() {
        let layout = multiplexed_layout();
        assert!(layout.uses_report_ids());
        assert_eq!(layout.report_ids(), [1, 2]);
        assert_eq!(layout.section(1, ReportType::Input).unwrap().size_bytes(), 3);
        assert_eq!(layout.section(2, ReportType::Input).unwrap().size_bytes(), 8);

        let codec = Codec::new(&layout);
        let mouse = codec
            .encode(
                &values(&[("Button_1", true.into()), ("X", 5.into())]),
                Some(1),
                ReportType::Input,
            )
            .unwrap();
        assert_eq!(mouse.len(), 4);
        assert_eq!(mouse[0], 0x01);

        let kbd = codec
            .encode(
                &values(&[("Left_Shift", true.into())]),
                Some(2),
                ReportType::Input,
            )
            .unwrap();
        assert_eq!(kbd.len(), 9);
        assert_eq!(kbd[0], 0x02);

        // Decode dispatches on the leading byte.
        let (id, decoded) = codec.decode(&mouse, ReportType::Input).unwrap();
        assert_eq!(id, 1);
        assert_eq!(decoded["X"], Value::Int(5));
        let (id, decoded) = codec.decode(&kbd, ReportType::Input).unwrap();
        assert_eq!(id, 2);
        assert_eq!(decoded["Left_Shift"], Value::Int(1));

        // Encoding without an ID is ambiguous here.
        assert_matches!(
            codec.encode(&Values::new(), None, ReportType::Input),
            Err(Error::AmbiguousReportId(_))
        );
        assert_matches!(
            codec.decode(&[0x07, 0x00, 0x00], ReportType::Input),
            Err(Error::UnknownReportId(0x07))
        );
    }

    #[test]
    fn output_section_round_trip() {
        let root: Node =
            Collection::new(Page::GenericDesktop, GenericDesktop::Keyboard, CollectionKind::Application)
                .child(widgets::leds())
                .child(widgets::padding(3).output())
                .into();
        let layout = analyze(&compile(&root).unwrap()).unwrap().layout;
        let codec = Codec::new(&layout);
        let packet = codec
            .encode(
                &values(&[("Caps_Lock", 1.into())]),
                None,
                ReportType::Output,
            )
            .unwrap();
        assert_eq!(packet, [0x02]);
        let (_, decoded) = codec.decode(&packet, ReportType::Output).unwrap();
        assert_eq!(decoded["Caps_Lock"], Value::Int(1));
        assert_eq!(decoded["Num_Lock"], Value::Int(0));
    }
}
