//! Schema lowering: a depth-first walk emitting descriptor items while a
//! state tracker suppresses Global items whose value was already emitted.
//! The dedup pass is what produces the canonically short descriptors.

use std::collections::HashMap;

use tracing::debug;

use crate::schema::{Collection, Node, ReportField, ReportGroup};
use crate::spec::{self, Flag, Item, ReportType};

/// Schema rejection reasons.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A collection is missing its usage page or usage.
    #[error("collection requires a usage page and usage")]
    MissingUsage,
    /// A field declares no report count.
    #[error("field has a zero report count")]
    ZeroCount,
    /// A field width outside the supported range.
    #[error("field width {0} is outside 1..=32 bits")]
    BadWidth(u32),
    /// A field's logical extents are inverted.
    #[error("logical range {min}..={max} is inverted")]
    InvertedRange {
        /// Declared minimum.
        min: i32,
        /// Declared maximum.
        max: i32,
    },
    /// A report group tried to return to the reserved default report.
    #[error("report id 0 cannot follow report id {0}")]
    ReservedReportId(u8),
}

/// Common compilation result type.
pub type Result<T> = core::result::Result<T, Error>;

/// Report ID assignment strategy.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ReportIdStrategy {
    /// Use the IDs declared on report groups.
    #[default]
    Explicit,
    /// Renumber report groups 1..N in traversal order.
    Auto,
}

/// Compilation options.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Pad each report's Input section to a byte boundary with a trailing
    /// constant item. Output and Feature sections are left as declared.
    pub auto_pad: bool,
    /// Report ID assignment strategy.
    pub report_ids: ReportIdStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_pad: true,
            report_ids: ReportIdStrategy::Explicit,
        }
    }
}

/// Last-emitted value of each Global register. `None` means nothing was
/// emitted yet, which never equals a desired value.
#[derive(Debug, Default)]
struct Tracker {
    usage_page: Option<u16>,
    logical_min: Option<i32>,
    logical_max: Option<i32>,
    physical_min: Option<i32>,
    physical_max: Option<i32>,
    unit_exponent: Option<i32>,
    unit: Option<u32>,
    report_size: Option<u32>,
    report_count: Option<u32>,
}

/// Lowers a schema tree to a descriptor item stream.
#[derive(Debug)]
pub struct Compiler {
    cfg: Config,
    items: Vec<Item>,
    state: Tracker,
    /// Input bits accumulated per report ID, for alignment padding.
    input_bits: HashMap<u8, u32>,
    report_id: u8,
    next_auto_id: u8,
}

impl Compiler {
    /// Creates a compiler with the given options.
    #[must_use]
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            items: Vec::new(),
            state: Tracker::default(),
            input_bits: HashMap::new(),
            report_id: 0,
            next_auto_id: 1,
        }
    }

    /// Compiles `root` into a descriptor item stream.
    pub fn compile(mut self, root: &Node) -> Result<Vec<Item>> {
        validate(root)?;
        self.visit(root)?;
        if self.cfg.auto_pad {
            self.align_input();
        }
        debug!(items = self.items.len(), "schema lowered");
        Ok(self.items)
    }

    fn visit(&mut self, node: &Node) -> Result<()> {
        match node {
            Node::Collection(c) => self.collection(c),
            Node::Group(g) => self.group(g),
            Node::Field(f) => {
                self.field(f);
                Ok(())
            }
        }
    }

    fn collection(&mut self, c: &Collection) -> Result<()> {
        self.global(|s| &mut s.usage_page, c.usage_page, Item::UsagePage);
        self.items.push(Item::Usage(c.usage));
        self.items.push(Item::Collection(c.kind));
        for child in &c.children {
            self.visit(child)?;
        }
        self.items.push(Item::EndCollection);
        Ok(())
    }

    fn group(&mut self, g: &ReportGroup) -> Result<()> {
        let id = match self.cfg.report_ids {
            ReportIdStrategy::Explicit => g.id,
            ReportIdStrategy::Auto => {
                let id = self.next_auto_id;
                self.next_auto_id += 1;
                id
            }
        };
        if id != self.report_id {
            if id == 0 {
                return Err(Error::ReservedReportId(self.report_id));
            }
            // Close out the previous report's alignment before switching.
            if self.cfg.auto_pad {
                self.align_input();
            }
            self.items.push(Item::ReportId(id));
            self.report_id = id;
        }
        for child in &g.children {
            self.visit(child)?;
        }
        Ok(())
    }

    /// Emits the Global updates a field needs, its Local usages, and its
    /// main item. Global emission order is fixed: UsagePage, LogicalMin,
    /// LogicalMax, PhysicalMin, PhysicalMax, UnitExponent, Unit,
    /// ReportSize, ReportCount.
    fn field(&mut self, f: &ReportField) {
        self.global(|s| &mut s.usage_page, f.usage_page, Item::UsagePage);
        self.global(|s| &mut s.logical_min, f.logical_min, Item::LogicalMin);
        self.global(|s| &mut s.logical_max, f.logical_max, Item::LogicalMax);
        if let Some(v) = f.physical_min {
            self.global(|s| &mut s.physical_min, v, Item::PhysicalMin);
        }
        if let Some(v) = f.physical_max {
            self.global(|s| &mut s.physical_max, v, Item::PhysicalMax);
        }
        if let Some(v) = f.unit_exponent {
            self.global(|s| &mut s.unit_exponent, v, Item::UnitExponent);
        }
        if let Some(u) = f.unit {
            self.global(|s| &mut s.unit, u.raw(), Item::Unit);
        }
        self.global(|s| &mut s.report_size, f.size, Item::ReportSize);
        self.global(|s| &mut s.report_count, f.count, Item::ReportCount);

        match f.usages.as_slice() {
            [] => {}
            &[u] => self.items.push(Item::Usage(u)),
            us if ascending_run(us) => {
                self.items.push(Item::UsageMin(us[0]));
                self.items.push(Item::UsageMax(us[us.len() - 1]));
            }
            us => self.items.extend(us.iter().map(|&u| Item::Usage(u))),
        }

        let mut flags = Flag::empty();
        if f.constant {
            flags |= Flag::CONST;
        }
        if f.variable {
            flags |= Flag::VAR;
        }
        if f.relative {
            flags |= Flag::REL;
        }
        self.items.push(match f.report_type {
            ReportType::Input => Item::Input(flags),
            ReportType::Output => Item::Output(flags),
            ReportType::Feature => Item::Feature(flags),
        });
        if f.report_type == ReportType::Input {
            *self.input_bits.entry(self.report_id).or_insert(0) += f.size * f.count;
        }
    }

    /// Pads the current report's Input section to the next byte boundary.
    fn align_input(&mut self) {
        let bits = self.input_bits.get(&self.report_id).copied().unwrap_or(0);
        let rem = bits % 8;
        if rem == 0 {
            return;
        }
        let pad = 8 - rem;
        self.state.report_size = Some(pad);
        self.state.report_count = Some(1);
        self.items.push(Item::ReportSize(pad));
        self.items.push(Item::ReportCount(1));
        self.items.push(Item::Input(Flag::CONST | Flag::VAR));
        *self.input_bits.entry(self.report_id).or_insert(0) += pad;
    }

    /// Emits `mk(v)` unless `v` is already the tracker's current value.
    fn global<T: Copy + PartialEq>(
        &mut self,
        slot: fn(&mut Tracker) -> &mut Option<T>,
        v: T,
        mk: fn(T) -> Item,
    ) {
        let cur = slot(&mut self.state);
        if *cur == Some(v) {
            return;
        }
        *cur = Some(v);
        self.items.push(mk(v));
    }
}

/// Compiles a schema with the default configuration straight to bytes.
pub fn compile(root: &Node) -> Result<Vec<u8>> {
    Compiler::new(Config::default())
        .compile(root)
        .map(|items| spec::serialize(&items))
}

/// Returns whether `us` ascends in steps of exactly one.
fn ascending_run(us: &[u32]) -> bool {
    us.windows(2).all(|w| w[0].checked_add(1) == Some(w[1]))
}

fn validate(node: &Node) -> Result<()> {
    match node {
        Node::Collection(c) => {
            if c.usage_page == 0 || c.usage == 0 {
                return Err(Error::MissingUsage);
            }
            c.children.iter().try_for_each(validate)
        }
        Node::Group(g) => g.children.iter().try_for_each(validate),
        Node::Field(f) => {
            if f.count == 0 {
                return Err(Error::ZeroCount);
            }
            if f.size == 0 || f.size > 32 {
                return Err(Error::BadWidth(f.size));
            }
            if f.logical_min > f.logical_max {
                return Err(Error::InvertedRange {
                    min: f.logical_min,
                    max: f.logical_max,
                });
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::widgets;
    use crate::spec::usage::{GenericDesktop, Page};
    use crate::spec::CollectionKind;
    use matches::assert_matches;

    fn mouse() -> Node {
        Collection::new(Page::GenericDesktop, GenericDesktop::Mouse, CollectionKind::Physical)
            .child(widgets::buttons(3))
            .child(widgets::padding(5))
            .child(widgets::axis(GenericDesktop::X))
            .child(widgets::axis(GenericDesktop::Y))
            .child(widgets::axis(GenericDesktop::Wheel))
            .into()
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02X}")).collect()
    }

    #[test]
    fn mouse_canonical_bytes() {
        let bytes = compile(&mouse()).unwrap();
        let want = concat!(
            "05010902A100",         // Usage Page, Usage (Mouse), Collection (Physical)
            "05091500250175019503", // buttons: page, 0..1, 1 bit x 3
            "190129038102",         // usages 1..3, Input (Data,Var,Abs)
            "05002500750595018103", // padding: page 0, max 0, 5 bits, Input (Const,Var)
            "0501158125",           // back to Generic Desktop, -127..
            "7F750809308102",       // ..127, 8 bits, X, Input
            "09318102",             // Y, Input
            "09388102",             // Wheel, Input
            "C0",                   // End Collection
        );
        assert_eq!(hex(&bytes), want);
        assert_eq!(bytes.len(), 53);
    }

    #[test]
    fn dedup_suppresses_repeated_globals() {
        let root: Node = Collection::new(Page::GenericDesktop, GenericDesktop::Pointer, CollectionKind::Application)
            .child(widgets::axis(GenericDesktop::X))
            .child(widgets::axis(GenericDesktop::Y))
            .into();
        let items = Compiler::new(Config { auto_pad: false, ..Config::default() })
            .compile(&root)
            .unwrap();
        let pages = items.iter().filter(|i| matches!(i, Item::UsagePage(_))).count();
        let mins = items.iter().filter(|i| matches!(i, Item::LogicalMin(_))).count();
        assert_eq!(pages, 1);
        assert_eq!(mins, 1);
    }

    #[test]
    fn contiguous_usages_become_a_range() {
        let items = Compiler::new(Config::default()).compile(&mouse()).unwrap();
        assert!(items.contains(&Item::UsageMin(1)));
        assert!(items.contains(&Item::UsageMax(3)));
    }

    #[test]
    fn sparse_usages_stay_individual() {
        let field = crate::schema::ReportField::new(Page::Button, vec![1, 3], 1, 2).range(0, 1);
        let root: Node = Collection::new(Page::GenericDesktop, GenericDesktop::Gamepad, CollectionKind::Application)
            .child(field)
            .into();
        let items = Compiler::new(Config { auto_pad: false, ..Config::default() })
            .compile(&root)
            .unwrap();
        assert!(!items.iter().any(|i| matches!(i, Item::UsageMin(_))));
        assert_eq!(
            items.iter().filter(|i| matches!(i, Item::Usage(_))).count(),
            3 // collection usage plus the two button usages
        );
    }

    #[test]
    fn auto_pad_completes_the_byte() {
        let root: Node = Collection::new(Page::GenericDesktop, GenericDesktop::Gamepad, CollectionKind::Application)
            .child(widgets::buttons(3))
            .into();
        let items = Compiler::new(Config::default()).compile(&root).unwrap();
        // Padding is appended after the walk, so the stream ends with the
        // forced Size, Count, Input triple.
        let n = items.len();
        assert_eq!(items[n - 3], Item::ReportSize(5));
        assert_eq!(items[n - 2], Item::ReportCount(1));
        assert_eq!(items[n - 1], Item::Input(Flag::CONST | Flag::VAR));
    }

    #[test]
    fn aligned_input_needs_no_pad() {
        let bytes = compile(&mouse()).unwrap();
        // 3 + 5 + 24 bits is byte-aligned already.
        assert_eq!(bytes.last(), Some(&0xC0));
    }

    #[test]
    fn report_groups_emit_ids_once() {
        let root: Node = Collection::new(Page::GenericDesktop, GenericDesktop::Gamepad, CollectionKind::Application)
            .child(
                ReportGroup::new(1)
                    .child(widgets::buttons(8))
                    .child(widgets::axis(GenericDesktop::X)),
            )
            .child(ReportGroup::new(2).child(widgets::axis(GenericDesktop::Y)))
            .into();
        let items = Compiler::new(Config::default()).compile(&root).unwrap();
        let ids: Vec<_> = items
            .iter()
            .filter_map(|i| match i {
                Item::ReportId(v) => Some(*v),
                _ => None,
            })
            .collect();
        assert_eq!(ids, [1, 2]);
    }

    #[test]
    fn auto_ids_renumber_in_traversal_order() {
        let root: Node = Collection::new(Page::GenericDesktop, GenericDesktop::Gamepad, CollectionKind::Application)
            .child(ReportGroup::new(7).child(widgets::buttons(8)))
            .child(ReportGroup::new(7).child(widgets::axis(GenericDesktop::X)))
            .into();
        let cfg = Config {
            report_ids: ReportIdStrategy::Auto,
            ..Config::default()
        };
        let items = Compiler::new(cfg).compile(&root).unwrap();
        let ids: Vec<_> = items
            .iter()
            .filter_map(|i| match i {
                Item::ReportId(v) => Some(*v),
                _ => None,
            })
            .collect();
        assert_eq!(ids, [1, 2]);
    }

    #[test]
    fn misaligned_report_padded_before_switch() {
        let root: Node = Collection::new(Page::GenericDesktop, GenericDesktop::Gamepad, CollectionKind::Application)
            .child(ReportGroup::new(1).child(widgets::buttons(3)))
            .child(ReportGroup::new(2).child(widgets::axis(GenericDesktop::X)))
            .into();
        let items = Compiler::new(Config::default()).compile(&root).unwrap();
        // The 5-bit pad for report 1 must precede the ReportId(2) item.
        let pad = items
            .iter()
            .position(|i| *i == Item::Input(Flag::CONST | Flag::VAR))
            .unwrap();
        let second = items.iter().position(|i| *i == Item::ReportId(2)).unwrap();
        assert!(pad < second, "pad at {pad}, ReportId(2) at {second}");
    }

    #[test]
    fn rejects_bad_schemas() {
        let no_usage: Node = Collection::new(0_u16, 0_u32, CollectionKind::Application).into();
        assert_matches!(compile(&no_usage), Err(Error::MissingUsage));

        let zero_count: Node = Collection::new(Page::GenericDesktop, GenericDesktop::Gamepad, CollectionKind::Application)
            .child(widgets::buttons(0))
            .into();
        assert_matches!(compile(&zero_count), Err(Error::ZeroCount));

        let wide: Node = Collection::new(Page::GenericDesktop, GenericDesktop::Gamepad, CollectionKind::Application)
            .child(widgets::axis(GenericDesktop::X).bits(64))
            .into();
        assert_matches!(compile(&wide), Err(Error::BadWidth(64)));

        let inverted: Node = Collection::new(Page::GenericDesktop, GenericDesktop::Gamepad, CollectionKind::Application)
            .child(widgets::axis(GenericDesktop::X).range(10, -10))
            .into();
        assert_matches!(compile(&inverted), Err(Error::InvertedRange { min: 10, max: -10 }));

        let back_to_default: Node = Collection::new(Page::GenericDesktop, GenericDesktop::Gamepad, CollectionKind::Application)
            .child(ReportGroup::new(1).child(widgets::buttons(8)))
            .child(ReportGroup::new(0).child(widgets::buttons(8)))
            .into();
        assert_matches!(compile(&back_to_default), Err(Error::ReservedReportId(1)));
    }

    #[test]
    fn physical_extents_and_units_are_emitted() {
        let root: Node = Collection::new(Page::GenericDesktop, GenericDesktop::Joystick, CollectionKind::Application)
            .child(widgets::hat_switch())
            .into();
        let items = Compiler::new(Config { auto_pad: false, ..Config::default() })
            .compile(&root)
            .unwrap();
        assert!(items.contains(&Item::PhysicalMin(0)));
        assert!(items.contains(&Item::PhysicalMax(315)));
        assert!(items.contains(&Item::Unit(0x14)));
    }
}
