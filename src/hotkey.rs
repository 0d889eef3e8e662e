use std::fmt;

/// Modifier keys. Left and right variants are folded together by the hook
/// backends before they reach the chord tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Alt,
    Control,
    Shift,
    Meta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Modifier(Modifier),
    /// Uppercase ASCII letter or digit.
    Char(char),
    Function(u8),
    Escape,
    Space,
    Enter,
    Tab,
    Other,
}

/// A held modifier plus a trigger key, e.g. `Alt+1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chord {
    pub modifier: Modifier,
    pub trigger: Key,
}

impl Default for Chord {
    fn default() -> Self {
        Self {
            modifier: Modifier::Alt,
            trigger: Key::Char('1'),
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Modifier::Alt => "ALT",
            Modifier::Control => "CTRL",
            Modifier::Shift => "SHIFT",
            Modifier::Meta => "META",
        })
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Modifier(modifier) => write!(f, "{modifier}"),
            Key::Char(c) => write!(f, "{c}"),
            Key::Function(n) => write!(f, "F{n}"),
            Key::Escape => f.write_str("ESC"),
            Key::Space => f.write_str("SPACE"),
            Key::Enter => f.write_str("ENTER"),
            Key::Tab => f.write_str("TAB"),
            Key::Other => f.write_str("?"),
        }
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.modifier, self.trigger)
    }
}

fn parse_modifier(upper: &str) -> Option<Modifier> {
    match upper {
        "ALT" | "OPTION" => Some(Modifier::Alt),
        "CTRL" | "CONTROL" => Some(Modifier::Control),
        "SHIFT" => Some(Modifier::Shift),
        "META" | "WIN" | "SUPER" | "CMD" => Some(Modifier::Meta),
        _ => None,
    }
}

/// Parses a single key name such as `"1"`, `"P"`, `"F5"` or `"Escape"`.
pub fn parse_key(s: &str) -> Option<Key> {
    let upper = s.trim().to_ascii_uppercase();
    if let Some(modifier) = parse_modifier(&upper) {
        return Some(Key::Modifier(modifier));
    }
    match upper.as_str() {
        "ESC" | "ESCAPE" => Some(Key::Escape),
        "SPACE" => Some(Key::Space),
        "ENTER" | "RETURN" => Some(Key::Enter),
        "TAB" => Some(Key::Tab),
        _ if upper.len() > 1 && upper.starts_with('F') => match upper[1..].parse::<u8>() {
            Ok(n @ 1..=12) => Some(Key::Function(n)),
            _ => None,
        },
        _ => {
            let mut chars = upper.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphanumeric() => Some(Key::Char(c)),
                _ => None,
            }
        }
    }
}

/// Parses a chord string like `"Alt+1"` or `"ctrl + p"`. Exactly one
/// modifier and one non-modifier trigger are required.
pub fn parse_chord(s: &str) -> Option<Chord> {
    let mut modifier = None;
    let mut trigger = None;

    for part in s.split('+') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match parse_key(part)? {
            Key::Modifier(m) => {
                if modifier.replace(m).is_some() {
                    return None;
                }
            }
            key => {
                if trigger.replace(key).is_some() {
                    return None;
                }
            }
        }
    }

    Some(Chord {
        modifier: modifier?,
        trigger: trigger?,
    })
}
