//! ArduSub flight mode table.
//!
//! Maps between the human-readable mode names used on the HTTP surface and
//! the `custom_mode` codes carried in heartbeats and DO_SET_MODE commands.

/// Depth-hold mode; attitude and heading commands are only accepted here.
pub const ALT_HOLD: u32 = 2;

const MODE_TABLE: &[(u32, &str)] = &[
    (0, "MANUAL"),
    (1, "STABILIZE"),
    (2, "ALT_HOLD"),
    (3, "AUTO"),
    (4, "GUIDED"),
    (5, "LOITER"),
    (6, "RTL"),
    (7, "CIRCLE"),
    (8, "POSITION"),
    (9, "LAND"),
    (10, "OF_LOITER"),
    (11, "DRIFT"),
    (13, "SPORT"),
    (14, "FLIP"),
    (15, "AUTOTUNE"),
    (16, "POSHOLD"),
    (17, "BRAKE"),
    (18, "THROW"),
    (19, "AVOID_ADSB"),
    (20, "GUIDED_NOGPS"),
    (21, "SMART_RTL"),
    (22, "FLOWHOLD"),
    (23, "FOLLOW"),
    (24, "ZIGZAG"),
    (25, "SYSTEMID"),
    (26, "AUTOROTATE"),
    (27, "AUTO_RTL"),
];

/// Resolve a mode name (case-insensitive) to its custom mode code.
pub fn mode_code(name: &str) -> Option<u32> {
    MODE_TABLE
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(name))
        .map(|(code, _)| *code)
}

/// Human-readable name for a custom mode code.
///
/// Unknown codes render as `Mode_<code>`.
pub fn mode_name(code: u32) -> String {
    MODE_TABLE
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| format!("Mode_{}", code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alt_hold_resolves_to_2() {
        assert_eq!(mode_code("ALT_HOLD"), Some(ALT_HOLD));
        assert_eq!(mode_code("alt_hold"), Some(ALT_HOLD));
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert_eq!(mode_code("WARP_SPEED"), None);
    }

    #[test]
    fn known_codes_map_to_names() {
        assert_eq!(mode_name(0), "MANUAL");
        assert_eq!(mode_name(2), "ALT_HOLD");
        assert_eq!(mode_name(19), "AVOID_ADSB");
    }

    #[test]
    fn unknown_code_gets_numeric_label() {
        // 12 is a hole in the ArduPilot mode numbering
        assert_eq!(mode_name(12), "Mode_12");
        assert_eq!(mode_name(99), "Mode_99");
    }
}
