//! # Button Bank
//!
//! Reads the configured push buttons. Buttons are wired active-low with
//! pull-ups, so a pressed button reads as a low level.

use tracing::trace;

/// Raw digital input access, implemented by the hardware layer.
#[cfg_attr(test, mockall::automock)]
pub trait ButtonReader {
    /// Raw level of `pin` (`true` = high = released).
    fn read_button(&mut self, pin: u8) -> bool;
}

/// Pressed state per button, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonVector(Vec<bool>);

impl ButtonVector {
    /// `count` released buttons
    #[must_use]
    pub fn released(count: usize) -> Self {
        Self(vec![false; count])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }
}

impl From<Vec<bool>> for ButtonVector {
    fn from(pressed: Vec<bool>) -> Self {
        Self(pressed)
    }
}

impl FromIterator<bool> for ButtonVector {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The fixed set of button pins for this build.
///
/// Arity comes from configuration: six buttons on the full handle, four on
/// the reduced one.
#[derive(Debug, Clone)]
pub struct ButtonBank {
    pins: Vec<u8>,
}

impl ButtonBank {
    #[must_use]
    pub fn new(pins: Vec<u8>) -> Self {
        Self { pins }
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Read every pin once; `pressed = !raw_level`.
    pub fn read_all<R: ButtonReader + ?Sized>(&self, reader: &mut R) -> ButtonVector {
        let buttons: ButtonVector = self.pins.iter().map(|&pin| !reader.read_button(pin)).collect();
        trace!("Buttons: {:?}", buttons.as_slice());
        buttons
    }
}
