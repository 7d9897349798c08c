//! HID usage pages and usage IDs (\[HUT\]), plus the display-name lookup
//! used to label analyzed report fields.

/// Usage page IDs (\[HUT\] Section 3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
#[repr(u16)]
pub enum Page {
    /// Generic Desktop Page.
    GenericDesktop = 0x01,
    /// Simulation Controls Page.
    Sim = 0x02,
    /// Game Controls Page.
    Game = 0x05,
    /// Generic Device Controls Page.
    GenericDevice = 0x06,
    /// Keyboard/Keypad Page.
    Key = 0x07,
    /// LED Page.
    Led = 0x08,
    /// Button Page.
    Button = 0x09,
    /// Ordinal Page.
    Ordinal = 0x0A,
    /// Telephony Device Page.
    Telephony = 0x0B,
    /// Consumer Page.
    Consumer = 0x0C,
    /// Digitizers Page.
    Digitizer = 0x0D,
    /// Sensors Page.
    Sensor = 0x20,
}

impl From<Page> for u16 {
    #[inline(always)]
    fn from(p: Page) -> Self {
        p as Self
    }
}

/// Returns whether `page` lies in the vendor-defined range.
#[inline]
#[must_use]
pub const fn is_vendor(page: u16) -> bool {
    page >= 0xFF00
}

/// Generic Desktop usage IDs (\[HUT\] Section 4).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
#[repr(u8)]
pub enum GenericDesktop {
    Pointer = 0x01,
    Mouse = 0x02,
    Joystick = 0x04,
    Gamepad = 0x05,
    Keyboard = 0x06,
    Keypad = 0x07,
    MultiAxisController = 0x08,
    X = 0x30,
    Y = 0x31,
    Z = 0x32,
    Rx = 0x33,
    Ry = 0x34,
    Rz = 0x35,
    Slider = 0x36,
    Dial = 0x37,
    Wheel = 0x38,
    HatSwitch = 0x39,
    SystemControl = 0x80,
    SystemPowerDown = 0x81,
    SystemSleep = 0x82,
    SystemWakeUp = 0x83,
    SystemContextMenu = 0x84,
    SystemMainMenu = 0x85,
    SystemAppMenu = 0x86,
}

impl From<GenericDesktop> for u32 {
    #[inline(always)]
    fn from(u: GenericDesktop) -> Self {
        u as Self
    }
}

/// LED usage IDs (\[HUT\] Section 11).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
#[repr(u8)]
pub enum Led {
    NumLock = 0x01,
    CapsLock = 0x02,
    ScrollLock = 0x03,
    Compose = 0x04,
    Kana = 0x05,
    Power = 0x06,
    Shift = 0x07,
    DoNotDisturb = 0x08,
    Mute = 0x09,
}

impl From<Led> for u32 {
    #[inline(always)]
    fn from(u: Led) -> Self {
        u as Self
    }
}

/// Consumer usage IDs (\[HUT\] Section 15).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
#[repr(u16)]
pub enum Consumer {
    ConsumerControl = 0x01,
    Power = 0x30,
    Reset = 0x31,
    Sleep = 0x32,
    Play = 0xB0,
    Pause = 0xB1,
    Record = 0xB2,
    FastForward = 0xB3,
    Rewind = 0xB4,
    ScanNextTrack = 0xB5,
    ScanPrevTrack = 0xB6,
    Stop = 0xB7,
    Eject = 0xB8,
    RandomPlay = 0xB9,
    Volume = 0xE0,
    Mute = 0xE2,
    Bass = 0xE3,
    Treble = 0xE4,
    BassBoost = 0xE5,
    VolumeIncrement = 0xE9,
    VolumeDecrement = 0xEA,
}

impl From<Consumer> for u32 {
    #[inline(always)]
    fn from(u: Consumer) -> Self {
        u as Self
    }
}

/// Returns the display name of a known usage page.
#[must_use]
pub fn page_name(page: u16) -> Option<&'static str> {
    Some(match page {
        0x01 => "Generic Desktop",
        0x07 => "Keyboard/Keypad",
        0x08 => "LED",
        0x09 => "Button",
        0x0C => "Consumer",
        _ => return None,
    })
}

/// Returns the display name of a known usage within a page. Button-page
/// usages are formatted by the caller (`Button_<n>`), not listed here.
#[must_use]
pub fn usage_name(page: u16, usage: u32) -> Option<&'static str> {
    match page {
        0x01 => generic_desktop_name(usage),
        0x07 => key_name(usage),
        0x08 => led_name(usage),
        0x0C => consumer_name(usage),
        _ => None,
    }
}

fn generic_desktop_name(u: u32) -> Option<&'static str> {
    Some(match u {
        0x01 => "Pointer",
        0x02 => "Mouse",
        0x04 => "Joystick",
        0x05 => "Gamepad",
        0x06 => "Keyboard",
        0x07 => "Keypad",
        0x08 => "Multi_Axis_Controller",
        0x30 => "X",
        0x31 => "Y",
        0x32 => "Z",
        0x33 => "Rx",
        0x34 => "Ry",
        0x35 => "Rz",
        0x36 => "Slider",
        0x37 => "Dial",
        0x38 => "Wheel",
        0x39 => "Hat_Switch",
        0x80 => "System_Control",
        0x81 => "System_Power_Down",
        0x82 => "System_Sleep",
        0x83 => "System_Wake_Up",
        0x84 => "System_Context_Menu",
        0x85 => "System_Main_Menu",
        0x86 => "System_App_Menu",
        _ => return None,
    })
}

fn key_name(u: u32) -> Option<&'static str> {
    const LETTERS: [&str; 26] = [
        "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q",
        "R", "S", "T", "U", "V", "W", "X", "Y", "Z",
    ];
    const DIGITS: [&str; 10] = ["1", "2", "3", "4", "5", "6", "7", "8", "9", "0"];
    Some(match u {
        0x00 => "No_Event",
        0x01 => "Error_Roll_Over",
        0x02 => "Post_Fail",
        0x03 => "Error_Undefined",
        0x04..=0x1D => LETTERS[(u - 0x04) as usize],
        0x1E..=0x27 => DIGITS[(u - 0x1E) as usize],
        0x28 => "Enter",
        0x29 => "Escape",
        0x2A => "Backspace",
        0x2B => "Tab",
        0x2C => "Space",
        0xE0 => "Left_Control",
        0xE1 => "Left_Shift",
        0xE2 => "Left_Alt",
        0xE3 => "Left_Gui",
        0xE4 => "Right_Control",
        0xE5 => "Right_Shift",
        0xE6 => "Right_Alt",
        0xE7 => "Right_Gui",
        _ => return None,
    })
}

fn led_name(u: u32) -> Option<&'static str> {
    Some(match u {
        0x01 => "Num_Lock",
        0x02 => "Caps_Lock",
        0x03 => "Scroll_Lock",
        0x04 => "Compose",
        0x05 => "Kana",
        0x06 => "Power",
        0x07 => "Shift",
        0x08 => "Do_Not_Disturb",
        0x09 => "Mute",
        _ => return None,
    })
}

fn consumer_name(u: u32) -> Option<&'static str> {
    Some(match u {
        0x01 => "Consumer_Control",
        0x30 => "Power",
        0x31 => "Reset",
        0x32 => "Sleep",
        0xB0 => "Play",
        0xB1 => "Pause",
        0xB2 => "Record",
        0xB3 => "Fast_Forward",
        0xB4 => "Rewind",
        0xB5 => "Scan_Next_Track",
        0xB6 => "Scan_Prev_Track",
        0xB7 => "Stop",
        0xB8 => "Eject",
        0xB9 => "Random_Play",
        0xE0 => "Volume",
        0xE2 => "Mute",
        0xE3 => "Bass",
        0xE4 => "Treble",
        0xE5 => "Bass_Boost",
        0xE9 => "Volume_Increment",
        0xEA => "Volume_Decrement",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(usage_name(0x01, 0x30), Some("X"));
        assert_eq!(usage_name(0x01, 0x39), Some("Hat_Switch"));
        assert_eq!(usage_name(0x01, 0x38), Some("Wheel"));
        assert_eq!(usage_name(0x07, 0x04), Some("A"));
        assert_eq!(usage_name(0x07, 0x27), Some("0"));
        assert_eq!(usage_name(0x07, 0xE1), Some("Left_Shift"));
        assert_eq!(usage_name(0x08, 0x02), Some("Caps_Lock"));
        assert_eq!(usage_name(0x0C, 0xE9), Some("Volume_Increment"));
        assert_eq!(usage_name(0x01, 0xFF), None);
        assert_eq!(usage_name(0xFF00, 0x01), None);
    }

    #[test]
    fn pages() {
        assert_eq!(page_name(0x01), Some("Generic Desktop"));
        assert_eq!(page_name(0x09), Some("Button"));
        assert_eq!(page_name(0x42), None);
        assert!(is_vendor(0xFF00));
        assert!(is_vendor(0xFFFF));
        assert!(!is_vendor(0x0C));
    }

    #[test]
    fn conversions() {
        assert_eq!(u16::from(Page::Button), 0x09);
        assert_eq!(u32::from(GenericDesktop::Wheel), 0x38);
        assert_eq!(u32::from(Led::Kana), 0x05);
        assert_eq!(u32::from(Consumer::VolumeDecrement), 0xEA);
    }
}
