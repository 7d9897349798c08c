//! Predefined widgets for common controls: buttons, padding, axes, hat
//! switches, key arrays, LEDs, and media keys. Each widget is a
//! preconfigured [`ReportField`] that the chainable setters can refine.

use super::ReportField;
use crate::spec::usage::{Consumer, GenericDesktop, Led, Page};
use crate::spec::Unit;

/// A bank of `count` one-bit buttons over Button page usages `1..=count`.
#[must_use]
pub fn buttons(count: u16) -> ReportField {
    ReportField::new(
        Page::Button,
        (1..=u32::from(count)).collect(),
        1,
        count.into(),
    )
    .range(0, 1)
}

/// Constant filler bits with no usage.
#[must_use]
pub fn padding(bits: u32) -> ReportField {
    ReportField::new(0_u16, Vec::new(), bits, 1).constant()
}

/// A single axis: 8 bits, signed −127..=127, absolute. Use
/// [`ReportField::relative`] for pointer motion and [`ReportField::bits`]
/// plus [`ReportField::range`] for wider controls.
#[must_use]
pub fn axis(usage: GenericDesktop) -> ReportField {
    ReportField::new(Page::GenericDesktop, vec![usage.into()], 8, 1).range(-127, 127)
}

/// A hat switch: 4 bits, eight directions (0..=7) over 0..=315 degrees.
#[must_use]
pub fn hat_switch() -> ReportField {
    ReportField::new(
        Page::GenericDesktop,
        vec![GenericDesktop::HatSwitch.into()],
        4,
        1,
    )
    .range(0, 7)
    .physical_range(0, 315)
    .unit(Unit::DEGREES)
}

/// A boot-protocol style key array: `count` simultaneous keys of one byte
/// each over Keyboard/Keypad usages 0..=101.
#[must_use]
pub fn keyboard_keys(count: u32) -> ReportField {
    ReportField::new(Page::Key, (0..=101).collect(), 8, count)
        .range(0, 101)
        .array()
}

/// Keyboard LED indicators (Num Lock through Kana) as a five-bit output
/// bank.
#[must_use]
pub fn leds() -> ReportField {
    let usages = vec![
        Led::NumLock.into(),
        Led::CapsLock.into(),
        Led::ScrollLock.into(),
        Led::Compose.into(),
        Led::Kana.into(),
    ];
    ReportField::new(Page::Led, usages, 1, 5).range(0, 1).output()
}

/// Multimedia keys as a Consumer-page bitmask. `playback` adds track
/// controls, `volume` adds mute and volume steps.
#[must_use]
pub fn media_keys(playback: bool, volume: bool) -> ReportField {
    let mut usages: Vec<u32> = Vec::new();
    if playback {
        usages.extend([
            Consumer::ScanNextTrack.into(),
            Consumer::ScanPrevTrack.into(),
            Consumer::Stop.into(),
        ] as [u32; 3]);
    }
    if volume {
        usages.extend([
            Consumer::Mute.into(),
            Consumer::VolumeIncrement.into(),
            Consumer::VolumeDecrement.into(),
        ] as [u32; 3]);
    }
    #[allow(clippy::cast_possible_truncation)]
    let count = usages.len() as u32;
    ReportField::new(Page::Consumer, usages, 1, count).range(0, 1)
}
