//! USB identifiers for ANT radio sticks.
//!
//! Garmin/Dynastream sticks all share one vendor ID; the product ID tells the
//! generations apart.

/// Dynastream Innovations vendor ID.
pub const DYNASTREAM_VID: u16 = 0x0FCF;

/// ANT USB2 stick (nRF24AP2 based).
pub const ANT_USB2_PID: u16 = 0x1008;

/// ANT USB-m stick. The most common stick in circulation.
pub const ANT_USB_M_PID: u16 = 0x1009;

/// Product ID used when the configuration does not name one.
pub const DEFAULT_PRODUCT_ID: u16 = ANT_USB_M_PID;

/// All known ANT stick product IDs.
pub const ALL_PIDS: &[u16] = &[ANT_USB2_PID, ANT_USB_M_PID];

/// Returns a human-readable name for a known product ID.
///
/// # Examples
///
/// ```
/// use antpulse_types::usb;
///
/// assert_eq!(usb::product_name(0x1009), Some("ANT USB-m"));
/// assert_eq!(usb::product_name(0xBEEF), None);
/// ```
#[must_use]
pub fn product_name(product_id: u16) -> Option<&'static str> {
    match product_id {
        ANT_USB2_PID => Some("ANT USB2"),
        ANT_USB_M_PID => Some("ANT USB-m"),
        _ => None,
    }
}

/// Check whether a product ID belongs to a known ANT stick.
#[must_use]
pub fn is_known_product(product_id: u16) -> bool {
    ALL_PIDS.contains(&product_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_products() {
        for pid in ALL_PIDS {
            assert!(is_known_product(*pid));
            assert!(product_name(*pid).is_some());
        }
        assert!(!is_known_product(0x0000));
    }

    #[test]
    fn test_default_is_usb_m() {
        assert_eq!(DEFAULT_PRODUCT_ID, 0x1009);
        assert_eq!(product_name(DEFAULT_PRODUCT_ID), Some("ANT USB-m"));
    }
}
