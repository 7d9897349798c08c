//! Declarative device schema: a tree of collections, report groups, and
//! report fields that the compiler lowers to a descriptor item stream.
//!
//! The tree is built once, stays immutable during compilation, and owns no
//! back-edges. Leaves describe *desired* global state; the compiler diffs
//! that against what was already emitted.

use crate::spec::{CollectionKind, ReportType, Unit};

pub mod widgets;

/// Node of the schema tree.
#[derive(Clone, Debug)]
pub enum Node {
    /// A grouping construct with a declared semantic role.
    Collection(Collection),
    /// A Report ID scope.
    Group(ReportGroup),
    /// A leaf producing report fields.
    Field(ReportField),
}

impl From<Collection> for Node {
    #[inline]
    fn from(c: Collection) -> Self {
        Self::Collection(c)
    }
}

impl From<ReportGroup> for Node {
    #[inline]
    fn from(g: ReportGroup) -> Self {
        Self::Group(g)
    }
}

impl From<ReportField> for Node {
    #[inline]
    fn from(f: ReportField) -> Self {
        Self::Field(f)
    }
}

/// A descriptor collection: a nestable grouping with a usage naming its
/// function and a semantic role (\[HID\] Section 6.2.2.6).
#[derive(Clone, Debug)]
pub struct Collection {
    /// Usage page qualifying `usage`.
    pub usage_page: u16,
    /// Usage naming the collection's function.
    pub usage: u32,
    /// Semantic role.
    pub kind: CollectionKind,
    /// Child nodes, lowered in order.
    pub children: Vec<Node>,
}

impl Collection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new(usage_page: impl Into<u16>, usage: impl Into<u32>, kind: CollectionKind) -> Self {
        Self {
            usage_page: usage_page.into(),
            usage: usage.into(),
            kind,
            children: Vec::new(),
        }
    }

    /// Appends a child node.
    #[must_use]
    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }
}

/// Assigns a Report ID to all descendant fields. This is not a HID
/// collection; no `EndCollection` is generated. Sibling nodes after the
/// group inherit the ID until another group overrides it.
#[derive(Clone, Debug)]
pub struct ReportGroup {
    /// Report ID declared for the scope. Must be non-zero.
    pub id: u8,
    /// Child nodes, lowered in order.
    pub children: Vec<Node>,
}

impl ReportGroup {
    /// Creates an empty report scope.
    #[must_use]
    pub fn new(id: u8) -> Self {
        Self {
            id,
            children: Vec::new(),
        }
    }

    /// Appends a child node.
    #[must_use]
    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }
}

/// The generic schema leaf. One `ReportField` lowers to the global and
/// local items it needs followed by a single main item generating `count`
/// fields of `size` bits each.
///
/// The widget constructors in [`widgets`] preconfigure common controls;
/// the chainable setters refine them.
#[derive(Clone, Debug)]
pub struct ReportField {
    /// Usage page of the generated fields.
    pub usage_page: u16,
    /// Usages assigned to the fields in order. Empty for padding. A
    /// contiguous ascending list compiles to a UsageMin/UsageMax pair.
    pub usages: Vec<u32>,
    /// Field width in bits.
    pub size: u32,
    /// Number of fields generated.
    pub count: u32,
    /// Minimum reported value.
    pub logical_min: i32,
    /// Maximum reported value.
    pub logical_max: i32,
    /// Physical extent minimum, if declared.
    pub physical_min: Option<i32>,
    /// Physical extent maximum, if declared.
    pub physical_max: Option<i32>,
    /// Unit exponent, if declared.
    pub unit_exponent: Option<i32>,
    /// Physical unit, if declared.
    pub unit: Option<Unit>,
    /// Report section the fields belong to.
    pub report_type: ReportType,
    /// Relative rather than absolute data.
    pub relative: bool,
    /// Constant (filler) rather than device data.
    pub constant: bool,
    /// Variable fields rather than an array of indices.
    pub variable: bool,
}

impl ReportField {
    /// Creates an absolute variable input field with a 0..=0 logical range.
    #[must_use]
    pub fn new(usage_page: impl Into<u16>, usages: Vec<u32>, size: u32, count: u32) -> Self {
        Self {
            usage_page: usage_page.into(),
            usages,
            size,
            count,
            logical_min: 0,
            logical_max: 0,
            physical_min: None,
            physical_max: None,
            unit_exponent: None,
            unit: None,
            report_type: ReportType::Input,
            relative: false,
            constant: false,
            variable: true,
        }
    }

    /// Sets the field width in bits.
    #[must_use]
    pub fn bits(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Sets the logical extents.
    #[must_use]
    pub fn range(mut self, min: i32, max: i32) -> Self {
        self.logical_min = min;
        self.logical_max = max;
        self
    }

    /// Sets the physical extents.
    #[must_use]
    pub fn physical_range(mut self, min: i32, max: i32) -> Self {
        self.physical_min = Some(min);
        self.physical_max = Some(max);
        self
    }

    /// Sets the physical unit.
    #[must_use]
    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the unit exponent.
    #[must_use]
    pub fn unit_exponent(mut self, exp: i32) -> Self {
        self.unit_exponent = Some(exp);
        self
    }

    /// Marks the data as relative (change since the last report).
    #[must_use]
    pub fn relative(mut self) -> Self {
        self.relative = true;
        self
    }

    /// Marks the fields as constant filler.
    #[must_use]
    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }

    /// Generates an array of control indices instead of variable fields.
    #[must_use]
    pub fn array(mut self) -> Self {
        self.variable = false;
        self
    }

    /// Moves the fields to the output report section.
    #[must_use]
    pub fn output(mut self) -> Self {
        self.report_type = ReportType::Output;
        self
    }

    /// Moves the fields to the feature report section.
    #[must_use]
    pub fn feature(mut self) -> Self {
        self.report_type = ReportType::Feature;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::usage::{GenericDesktop, Page};

    #[test]
    fn tree_building() {
        let root = Collection::new(Page::GenericDesktop, GenericDesktop::Mouse, CollectionKind::Physical)
            .child(widgets::buttons(3))
            .child(ReportGroup::new(1).child(widgets::axis(GenericDesktop::X)));
        assert_eq!(root.usage_page, 0x01);
        assert_eq!(root.usage, 0x02);
        assert_eq!(root.children.len(), 2);
        match &root.children[1] {
            Node::Group(g) => assert_eq!(g.id, 1),
            n => panic!("expected group, got {n:?}"),
        }
    }

    #[test]
    fn field_refinement() {
        let f = widgets::axis(GenericDesktop::X)
            .bits(14)
            .range(0, 16383)
            .relative();
        assert_eq!(f.size, 14);
        assert_eq!((f.logical_min, f.logical_max), (0, 16383));
        assert!(f.relative);
        assert!(f.variable);
        assert_eq!(f.report_type, ReportType::Input);
    }
}
