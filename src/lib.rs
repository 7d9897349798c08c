//! A toolkit for USB HID report descriptors.
//!
//! The crate translates a declarative device description into the compact
//! binary bytecode defined by [USB HID v1.11] Section 6.2.2, and conversely
//! parses such bytecode back into a structured per-report field [`Layout`]
//! against which runtime report packets are encoded and decoded.
//!
//! Three subsystems make up the core:
//!
//! * [`compile`] lowers a [`schema`] tree of collections and widgets to a
//!   flat stream of HID short items, tracking the HID parser's global
//!   state in reverse so that redundant items are never emitted.
//! * [`analyze`] executes the parser state machine forward over raw
//!   descriptor bytes and recovers the bit-level field layout of every
//!   report.
//! * [`codec`] encodes name→value mappings into binary reports and back,
//!   handling Report ID multiplexing and bit-packed little-endian fields.
//!
//! [USB HID v1.11]: https://www.usb.org/sites/default/files/hid1_11.pdf
//!
//! # Example
//!
//! ```
//! use hidforge::schema::{widgets, Collection};
//! use hidforge::spec::usage::{GenericDesktop, Page};
//! use hidforge::spec::{CollectionKind, ReportType};
//!
//! let mouse = Collection::new(Page::GenericDesktop, GenericDesktop::Mouse, CollectionKind::Physical)
//!     .child(widgets::buttons(3))
//!     .child(widgets::padding(5))
//!     .child(widgets::axis(GenericDesktop::X))
//!     .child(widgets::axis(GenericDesktop::Y))
//!     .child(widgets::axis(GenericDesktop::Wheel))
//!     .into();
//!
//! let bytes = hidforge::compile(&mouse)?;
//! let analysis = hidforge::analyze(&bytes)?;
//!
//! let codec = hidforge::Codec::new(&analysis.layout);
//! let mut report = codec.defaults(None, ReportType::Input)?;
//! report.insert("Button_1".into(), true.into());
//! report.insert("X".into(), 100.into());
//! assert_eq!(codec.encode(&report, None, ReportType::Input)?, [0x01, 0x64, 0x00, 0x00]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(unused_crate_dependencies)]

pub mod analyze;
pub mod bits;
pub mod codec;
pub mod compile;
pub mod layout;
pub mod schema;
pub mod spec;

pub use crate::analyze::{analyze, Analysis};
pub use crate::codec::{Codec, Value, Values};
pub use crate::compile::{compile, Compiler, Config};
pub use crate::layout::{Field, Layout, Section};
pub use crate::spec::{Flag, Item, ReportType, Tag};
