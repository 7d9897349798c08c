//! Descriptor analysis: parses the byte stream and executes the HID
//! parser state machine forward to recover the per-report field layout.
//!
//! The state machine keeps a global item table, a local item queue, a
//! Push/Pop snapshot stack, and one bit cursor per `(report_id,
//! report_type)` pair. Main items drain the local queue into fields;
//! Collection and EndCollection only affect the tree view and, being main
//! items themselves, clear the local queue.

use std::collections::HashMap;

use smallvec::SmallVec;
use tracing::debug;

use crate::layout::{Field, Layout};
use crate::spec::{self, usage, Flag, Item, ReportType};

/// Error type returned by the analyzer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Byte-level parse failure.
    #[error(transparent)]
    Parse(#[from] spec::Error),
    /// EndCollection without a matching Collection, or a collection left
    /// open at the end of the descriptor. The index names the offending
    /// item, or one past the last item for an unclosed collection.
    #[error("unbalanced collection at item {0}")]
    UnbalancedCollection(usize),
    /// Pop with an empty snapshot stack.
    #[error("state stack underflow at item {0}")]
    StackUnderflow(usize),
}

/// Common analysis result type.
pub type Result<T> = core::result::Result<T, Error>;

/// Analyzer output: the flat item list and the layout derived from it.
#[derive(Clone, Debug)]
pub struct Analysis {
    /// Parsed items in descriptor order.
    pub items: Vec<Item>,
    /// Per-report field layout.
    pub layout: Layout,
}

/// Item-level collection tree node.
#[derive(Clone, Debug)]
pub struct ItemNode {
    /// The item at this node.
    pub item: Item,
    /// Items nested within, when this item opens a collection.
    pub children: Vec<ItemNode>,
}

/// Analyzes a raw descriptor into items and a layout.
pub fn analyze(bytes: &[u8]) -> Result<Analysis> {
    let items = spec::parse(bytes)?;
    let layout = interpret(&items)?;
    debug!(
        items = items.len(),
        reports = layout.report_ids().len(),
        "descriptor analyzed"
    );
    Ok(Analysis { items, layout })
}

/// Builds the collection tree view of a flat item list. `EndCollection`
/// items are consumed by the `Collection` node they close.
pub fn tree(items: &[Item]) -> Result<Vec<ItemNode>> {
    let mut root = Vec::new();
    let mut open: Vec<(Item, Vec<ItemNode>)> = Vec::new();
    for (i, item) in items.iter().enumerate() {
        match item {
            Item::Collection(_) => open.push((item.clone(), Vec::new())),
            Item::EndCollection => {
                let (collection, children) = open
                    .pop()
                    .ok_or(Error::UnbalancedCollection(i))?;
                let node = ItemNode {
                    item: collection,
                    children,
                };
                match open.last_mut() {
                    Some((_, siblings)) => siblings.push(node),
                    None => root.push(node),
                }
            }
            _ => {
                let node = ItemNode {
                    item: item.clone(),
                    children: Vec::new(),
                };
                match open.last_mut() {
                    Some((_, siblings)) => siblings.push(node),
                    None => root.push(node),
                }
            }
        }
    }
    if open.is_empty() {
        Ok(root)
    } else {
        Err(Error::UnbalancedCollection(items.len()))
    }
}

/// Global item state table. All registers default to zero, which is also
/// the reset state mandated for the default report.
#[derive(Clone, Debug, Default)]
struct Globals {
    usage_page: u16,
    logical_min: i32,
    logical_max: i32,
    physical_min: i32,
    physical_max: i32,
    unit_exponent: i32,
    unit: u32,
    report_size: u32,
    report_count: u32,
    report_id: u8,
}

/// Local item queue, cleared after every main item.
#[derive(Debug, Default)]
struct Locals {
    usages: SmallVec<[u32; 16]>,
    pending_min: Option<u32>,
}

impl Locals {
    fn clear(&mut self) {
        self.usages.clear();
        self.pending_min = None;
    }

    /// Usage for field index `i`: the queued usage at that index, the last
    /// queued usage when the queue is shorter than the count, or 0 when
    /// the queue is empty (padding).
    fn usage(&self, i: u32) -> u32 {
        self.usages
            .get(i as usize)
            .or_else(|| self.usages.last())
            .copied()
            .unwrap_or(0)
    }
}

fn interpret(items: &[Item]) -> Result<Layout> {
    let mut layout = Layout::default();
    let mut globals = Globals::default();
    let mut stack: Vec<Globals> = Vec::new();
    let mut locals = Locals::default();
    let mut cursors: HashMap<(u8, ReportType), u32> = HashMap::new();
    let mut names: HashMap<(u8, ReportType), HashMap<String, u32>> = HashMap::new();
    let mut depth = 0_usize;

    for (i, item) in items.iter().enumerate() {
        match *item {
            Item::UsagePage(v) => globals.usage_page = v,
            Item::LogicalMin(v) => globals.logical_min = v,
            Item::LogicalMax(v) => globals.logical_max = v,
            Item::PhysicalMin(v) => globals.physical_min = v,
            Item::PhysicalMax(v) => globals.physical_max = v,
            Item::UnitExponent(v) => globals.unit_exponent = v,
            Item::Unit(v) => globals.unit = v,
            Item::ReportSize(v) => globals.report_size = v,
            Item::ReportCount(v) => globals.report_count = v,
            Item::ReportId(v) => globals.report_id = v,
            Item::Push => stack.push(globals.clone()),
            Item::Pop => globals = stack.pop().ok_or(Error::StackUnderflow(i))?,

            Item::Usage(v) => locals.usages.push(v),
            Item::UsageMin(v) => locals.pending_min = Some(v),
            Item::UsageMax(v) => {
                if let Some(min) = locals.pending_min.take() {
                    if min <= v {
                        locals.usages.extend(min..=v);
                    }
                }
            }

            Item::Collection(_) => {
                depth += 1;
                locals.clear();
            }
            Item::EndCollection => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(Error::UnbalancedCollection(i))?;
                locals.clear();
            }

            Item::Input(f) => {
                emit(&mut layout, &globals, &mut locals, &mut cursors, &mut names, ReportType::Input, f);
            }
            Item::Output(f) => {
                emit(&mut layout, &globals, &mut locals, &mut cursors, &mut names, ReportType::Output, f);
            }
            Item::Feature(f) => {
                emit(&mut layout, &globals, &mut locals, &mut cursors, &mut names, ReportType::Feature, f);
            }

            // Designators, strings, delimiters, and unknown tags are
            // structural pass-through.
            _ => {}
        }
    }
    if depth != 0 {
        return Err(Error::UnbalancedCollection(items.len()));
    }
    Ok(layout)
}

/// Generates the fields of one main item and advances the section cursor.
fn emit(
    layout: &mut Layout,
    globals: &Globals,
    locals: &mut Locals,
    cursors: &mut HashMap<(u8, ReportType), u32>,
    names: &mut HashMap<(u8, ReportType), HashMap<String, u32>>,
    ty: ReportType,
    flags: Flag,
) {
    let id = globals.report_id;
    let cursor = cursors.entry((id, ty)).or_insert(0);
    let tracker = names.entry((id, ty)).or_default();
    let array = !flags.contains(Flag::VAR);
    let signed = globals.logical_min < 0;

    for i in 0..globals.report_count {
        let usage_id = locals.usage(i);
        layout.push_field(Field {
            name: field_name(tracker, globals.usage_page, usage_id, array),
            bit_offset: *cursor,
            bit_width: globals.report_size,
            usage_page: globals.usage_page,
            usage_id,
            logical_min: globals.logical_min,
            logical_max: globals.logical_max,
            physical_min: globals.physical_min,
            physical_max: globals.physical_max,
            signed,
            report_type: ty,
            report_id: id,
        });
        *cursor += globals.report_size;
    }
    locals.clear();
}

/// Derives a human name for a field and disambiguates duplicates within
/// the section with `_2`, `_3`, ... suffixes. Padding fields all share one
/// name and are never suffixed; the codec skips them by usage ID.
fn field_name(tracker: &mut HashMap<String, u32>, page: u16, usage_id: u32, array: bool) -> String {
    let base = if array {
        format!("{} Idx", page_display(page))
    } else {
        usage_display(page, usage_id)
    };
    if base == PADDING_NAME {
        return base;
    }
    let n = tracker.entry(base.clone()).or_insert(0);
    *n += 1;
    if *n == 1 {
        base
    } else {
        format!("{base}_{n}")
    }
}

/// Display name shared by all alignment-padding fields (usage ID 0).
const PADDING_NAME: &str = "Padding / Reserved";

fn usage_display(page: u16, usage_id: u32) -> String {
    if usage_id == 0 {
        return PADDING_NAME.into();
    }
    if page == u16::from(usage::Page::Button) {
        return format!("Button_{usage_id}");
    }
    match usage::usage_name(page, usage_id) {
        Some(name) => name.into(),
        None => format!("Usage 0x{usage_id:02X}"),
    }
}

fn page_display(page: u16) -> String {
    match usage::page_name(page) {
        Some(name) => name.into(),
        None if usage::is_vendor(page) => format!("Vendor Defined (0x{page:04X})"),
        None => format!("Unknown Page 0x{page:02X}"),
    }
}
