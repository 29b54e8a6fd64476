/// Linux `EV_KEY` event type.
pub const EV_KEY: u16 = 0x01;

/// Key code of the scan button on the reference board (`KEY_PROG1`).
pub const KEY_SCAN: u16 = 148;

/// Key value reported on press (release is 0, autorepeat is 2).
pub const KEY_PRESSED: i32 = 1;

/// A discrete event from an input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputEvent {
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    pub const fn new(event_type: u16, code: u16, value: i32) -> Self {
        Self {
            event_type,
            code,
            value,
        }
    }

    pub const fn key_press(code: u16) -> Self {
        Self::new(EV_KEY, code, KEY_PRESSED)
    }
}

/// The event that starts a capture cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerSpec {
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

impl TriggerSpec {
    pub const fn key_press(code: u16) -> Self {
        Self {
            event_type: EV_KEY,
            code,
            value: KEY_PRESSED,
        }
    }

    pub fn matches(&self, event: &InputEvent) -> bool {
        event.event_type == self.event_type && event.value == self.value && event.code == self.code
    }
}

impl Default for TriggerSpec {
    fn default() -> Self {
        Self::key_press(KEY_SCAN)
    }
}
