//! Logical key names to X keysyms
//!
//! Viewers send either a single character (what a terminal or image window
//! reports for a key press) or a keysym name such as `Return` or `F5`.

/// Named keysyms accepted on the input channel
const NAMED_KEYSYMS: &[(&str, u32)] = &[
    ("BackSpace", 0xff08),
    ("Tab", 0xff09),
    ("Return", 0xff0d),
    ("Enter", 0xff0d),
    ("Pause", 0xff13),
    ("Escape", 0xff1b),
    ("Delete", 0xffff),
    ("Home", 0xff50),
    ("Left", 0xff51),
    ("Up", 0xff52),
    ("Right", 0xff53),
    ("Down", 0xff54),
    ("Page_Up", 0xff55),
    ("Prior", 0xff55),
    ("Page_Down", 0xff56),
    ("Next", 0xff56),
    ("End", 0xff57),
    ("Insert", 0xff63),
    ("Menu", 0xff67),
    ("F1", 0xffbe),
    ("F2", 0xffbf),
    ("F3", 0xffc0),
    ("F4", 0xffc1),
    ("F5", 0xffc2),
    ("F6", 0xffc3),
    ("F7", 0xffc4),
    ("F8", 0xffc5),
    ("F9", 0xffc6),
    ("F10", 0xffc7),
    ("F11", 0xffc8),
    ("F12", 0xffc9),
    ("Shift_L", 0xffe1),
    ("Shift_R", 0xffe2),
    ("Control_L", 0xffe3),
    ("Control_R", 0xffe4),
    ("Caps_Lock", 0xffe5),
    ("Alt_L", 0xffe9),
    ("Alt_R", 0xffea),
    ("Super_L", 0xffeb),
    ("Super_R", 0xffec),
    ("space", 0x0020),
];

/// Resolves a logical key name to a keysym
///
/// Returns `None` for empty names and names that are neither a single
/// character nor a known keysym name.
pub fn keysym_from_name(name: &str) -> Option<u32> {
    let mut chars = name.chars();
    let first = chars.next()?;

    if chars.next().is_none() {
        return Some(keysym_from_char(first));
    }

    NAMED_KEYSYMS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, keysym)| *keysym)
}

/// Keysym for a single character
fn keysym_from_char(c: char) -> u32 {
    match c {
        '\u{8}' => 0xff08,
        '\t' => 0xff09,
        '\n' | '\r' => 0xff0d,
        '\u{1b}' => 0xff1b,
        '\u{7f}' => 0xffff,
        // Latin-1 keysyms equal their code points
        ' '..='~' | '\u{a0}'..='\u{ff}' => c as u32,
        other => 0x0100_0000 + other as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_characters() {
        assert_eq!(keysym_from_name("a"), Some(0x61));
        assert_eq!(keysym_from_name("A"), Some(0x41));
        assert_eq!(keysym_from_name("7"), Some(0x37));
        assert_eq!(keysym_from_name(" "), Some(0x20));
        assert_eq!(keysym_from_name("\r"), Some(0xff0d));
        assert_eq!(keysym_from_name("\u{8}"), Some(0xff08));
        assert_eq!(keysym_from_name("é"), Some(0xe9));
        assert_eq!(keysym_from_name("€"), Some(0x0100_20ac));
    }

    #[test]
    fn test_named_keys() {
        assert_eq!(keysym_from_name("Return"), Some(0xff0d));
        assert_eq!(keysym_from_name("F12"), Some(0xffc9));
        assert_eq!(keysym_from_name("Escape"), Some(0xff1b));
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!(keysym_from_name(""), None);
        assert_eq!(keysym_from_name("NotAKey"), None);
        assert_eq!(keysym_from_name("return"), None);
    }
}
