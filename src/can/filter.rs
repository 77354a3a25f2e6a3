//! # CAN Acceptance Filters
//!
//! Inbound frames are dispatched to the status decoder only when they match
//! at least one configured `(address, mask)` pair.

use serde::Deserialize;

use super::protocol::CanFrame;

/// A single acceptance filter, configured at startup and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CanFilter {
    /// Reference identifier
    pub address: u32,

    /// Bits of the identifier that must equal `address`
    pub mask: u32,

    /// Matches extended (29-bit) frames when true, standard frames otherwise
    #[serde(default = "default_extended")]
    pub extended: bool,
}

fn default_extended() -> bool { true }

impl CanFilter {
    /// Creates a filter for the given addressing mode.
    #[must_use]
    pub const fn new(address: u32, mask: u32, extended: bool) -> Self {
        Self { address, mask, extended }
    }

    /// Mask predicate: `(id & mask) == (address & mask)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use joycan_bridge::can::filter::CanFilter;
    ///
    /// let filter = CanFilter::new(0x00EF_0002, 0xFF, true);
    /// assert!(filter.matches(0x18EF_F102));
    /// assert!(!filter.matches(0x18EF_F103));
    /// ```
    #[must_use]
    pub fn matches(&self, id: u32) -> bool {
        (id & self.mask) == (self.address & self.mask)
    }

    /// Mask predicate plus addressing mode check.
    #[must_use]
    pub fn accepts(&self, frame: &CanFrame) -> bool {
        frame.extended == self.extended && self.matches(frame.id)
    }
}

/// The deployment's filter table.
#[derive(Debug, Clone, Default)]
pub struct CanFilterSet {
    filters: Vec<CanFilter>,
}

impl CanFilterSet {
    #[must_use]
    pub fn new(filters: Vec<CanFilter>) -> Self {
        Self { filters }
    }

    /// True when any filter accepts the frame. An empty set accepts nothing.
    #[must_use]
    pub fn accepts(&self, frame: &CanFrame) -> bool {
        self.filters.iter().any(|filter| filter.accepts(frame))
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::can::protocol::STATUS_FRAME_ID;

    fn frame(id: u32, extended: bool) -> CanFrame {
        CanFrame { id, extended, payload: vec![] }
    }

    #[test]
    fn test_status_frame_accepted() {
        let filter = CanFilter::new(0x00EF_0002, 0xFF, true);
        assert!(filter.matches(STATUS_FRAME_ID));
    }

    #[test]
    fn test_neighbour_id_rejected() {
        let filter = CanFilter::new(0x00EF_0002, 0xFF, true);
        assert!(!filter.matches(0x18EF_F103));
    }

    #[test]
    fn test_zero_mask_matches_everything() {
        let filter = CanFilter::new(0x123, 0, true);
        assert!(filter.matches(0));
        assert!(filter.matches(0x1FFF_FFFF));
    }

    #[test]
    fn test_full_mask_is_exact_match() {
        let filter = CanFilter::new(STATUS_FRAME_ID, 0x1FFF_FFFF, true);
        assert!(filter.matches(STATUS_FRAME_ID));
        assert!(!filter.matches(STATUS_FRAME_ID + 1));
    }

    #[test]
    fn test_addressing_mode_must_agree() {
        let filter = CanFilter::new(0x666, 0xFFF, true);
        assert!(filter.accepts(&frame(0x666, true)));
        assert!(!filter.accepts(&frame(0x666, false)));
    }

    #[test]
    fn test_set_accepts_if_any_filter_matches() {
        let set = CanFilterSet::new(vec![
            CanFilter::new(0x00EF_0002, 0xFF, true),
            CanFilter::new(0x666, 0xFFF, true),
        ]);
        assert_eq!(set.len(), 2);
        assert!(set.accepts(&frame(STATUS_FRAME_ID, true)));
        assert!(set.accepts(&frame(0x0000_0666, true)));
        assert!(!set.accepts(&frame(0x18EF_F103, true)));
    }

    #[test]
    fn test_empty_set_rejects_everything() {
        let set = CanFilterSet::default();
        assert!(set.is_empty());
        assert!(!set.accepts(&frame(STATUS_FRAME_ID, true)));
    }
}
