//! Shared helpers.

pub mod decimal;

/// Strip a venue namespace prefix (e.g. "vntls:OPENAI" -> "OPENAI") for display.
///
/// Calculations and cooldown keys keep the raw instrument.
pub fn display_name(instrument: &str) -> &str {
    match instrument.split_once(':') {
        Some((_, name)) if !name.is_empty() => name,
        _ => instrument,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("vntls:OPENAI"), "OPENAI");
        assert_eq!(display_name("BTC"), "BTC");
        assert_eq!(display_name("weird:"), "weird:");
    }
}
