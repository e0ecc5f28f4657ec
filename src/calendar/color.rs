/// Colors the server accepts for calendars and plans.
pub const SUPPORTED_COLORS: [&str; 4] = ["red", "blue", "yellow", "green"];

pub fn is_supported_color(color: &str) -> bool {
    SUPPORTED_COLORS.contains(&color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_colors_are_supported() {
        for color in SUPPORTED_COLORS {
            assert!(is_supported_color(color));
        }
    }

    #[test]
    fn unknown_or_miscased_colors_are_rejected() {
        assert!(!is_supported_color("purple"));
        assert!(!is_supported_color("Red"));
        assert!(!is_supported_color(""));
    }
}
