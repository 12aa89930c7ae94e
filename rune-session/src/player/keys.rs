//! Keyboard traversal over the ordered track controls

/// A key press as reported by the host (DOM `KeyboardEvent.key` names)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    Enter,
    Space,
    Character(char),
    Other(String),
}

impl Key {
    pub fn from_dom(key: &str) -> Self {
        match key {
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            "Home" => Key::Home,
            "End" => Key::End,
            "Enter" => Key::Enter,
            " " | "Spacebar" => Key::Space,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Character(c),
                    _ => Key::Other(other.to_string()),
                }
            }
        }
    }
}

/// What a key press on a track control asks the player to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Select the focused control's track with autoplay
    Activate,
    /// Move focus to this index and select it without autoplay
    Preview(usize),
}

/// Map a key to an action; movement is relative to the active track and wraps
pub fn resolve_key(key: &Key, active: usize, count: usize) -> Option<KeyAction> {
    if count == 0 {
        return None;
    }
    let active = active.min(count - 1);
    match key {
        Key::Enter | Key::Space => Some(KeyAction::Activate),
        Key::ArrowUp | Key::ArrowLeft => Some(KeyAction::Preview((active + count - 1) % count)),
        Key::ArrowDown | Key::ArrowRight => Some(KeyAction::Preview((active + 1) % count)),
        Key::Home => Some(KeyAction::Preview(0)),
        Key::End => Some(KeyAction::Preview(count - 1)),
        Key::Character(_) | Key::Other(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dom_names() {
        assert_eq!(Key::from_dom("ArrowLeft"), Key::ArrowLeft);
        assert_eq!(Key::from_dom(" "), Key::Space);
        assert_eq!(Key::from_dom("g"), Key::Character('g'));
        assert_eq!(Key::from_dom("Escape"), Key::Other("Escape".to_string()));
    }

    #[test]
    fn test_arrows_wrap_both_ways() {
        assert_eq!(resolve_key(&Key::ArrowUp, 0, 3), Some(KeyAction::Preview(2)));
        assert_eq!(resolve_key(&Key::ArrowLeft, 1, 3), Some(KeyAction::Preview(0)));
        assert_eq!(resolve_key(&Key::ArrowDown, 2, 3), Some(KeyAction::Preview(0)));
        assert_eq!(resolve_key(&Key::ArrowRight, 0, 3), Some(KeyAction::Preview(1)));
    }

    #[test]
    fn test_home_end_and_activation() {
        assert_eq!(resolve_key(&Key::Home, 2, 3), Some(KeyAction::Preview(0)));
        assert_eq!(resolve_key(&Key::End, 0, 3), Some(KeyAction::Preview(2)));
        assert_eq!(resolve_key(&Key::Enter, 1, 3), Some(KeyAction::Activate));
        assert_eq!(resolve_key(&Key::Character('x'), 1, 3), None);
        assert_eq!(resolve_key(&Key::Home, 0, 0), None);
    }
}
