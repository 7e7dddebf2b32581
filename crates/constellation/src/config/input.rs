//! Supporting user-defined keybindings.

/// The user config for defining keybindings.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, Clone)]
pub(crate) struct KeybindingConfigRaw {
    /// The modifier keys, like `CTRL`, `SHIFT`, etc.
    pub mods: Option<String>,
    /// The actual key, like a 'x' or `PageUp`.
    pub key: String,
}

/// All the possible actions a user can trigger.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
pub(crate) enum KeybindingAction {
    /// Freeze the particles where they are, or let them carry on.
    TogglePause,
    /// Paint over all the trails with the background colour.
    Redraw,
    /// Show or hide the settings menu.
    ToggleMenu,
    /// Exit.
    Quit,
}

impl KeybindingAction {
    /// Every action, in the order they're listed in the menu.
    pub const ALL: [Self; 4] = [Self::TogglePause, Self::Redraw, Self::ToggleMenu, Self::Quit];

    /// A short human description.
    pub const fn describe(self) -> &'static str {
        match self {
            Self::TogglePause => "pause/resume",
            Self::Redraw => "clear trails",
            Self::ToggleMenu => "show/hide menu",
            Self::Quit => "quit",
        }
    }
}

/// All the active user-configured keybindings.
pub(crate) type KeybindingsRaw = std::collections::HashMap<KeybindingAction, KeybindingConfigRaw>;

/// The user keybindings converted to native `termwiz::input::KeyEvent`s.
pub(crate) type KeybindingsAsEvents =
    std::collections::HashMap<KeybindingAction, termwiz::input::KeyEvent>;

impl TryFrom<KeybindingConfigRaw> for termwiz::input::KeyEvent {
    type Error = std::io::Error;

    /// There's no `impl From<String>` for `termwiz::input::KeyEvent`, but it does derive
    /// `serde::Deserialize`. So we go through `toml` to avoid manually mapping every keycode and
    /// modifier.
    fn try_from(binding: KeybindingConfigRaw) -> std::result::Result<Self, Self::Error> {
        let key = if binding.key.chars().count() == 1 {
            format!("{{ Char = \"{}\" }}", binding.key.replace('"', "\\\""))
        } else {
            format!("\"{}\"", binding.key)
        };

        let config = format!(
            "
                modifiers = {{ bits = 0 }}
                key = {key}
            ",
        );

        let result: core::result::Result<Self, toml::de::Error> = toml::from_str(&config);
        match result {
            Ok(mut key_event) => {
                if let Some(modifiers) = binding.mods {
                    match modifiers.try_into() {
                        Ok(parsed_modifier) => {
                            key_event.modifiers = parsed_modifier;
                        }
                        Err(err) => {
                            return Err(std::io::Error::new(
                                std::io::ErrorKind::InvalidInput,
                                format!("Couldn't parse keybinding modifier: {err:?}"),
                            ))
                        }
                    }
                }
                Ok(key_event)
            }
            Err(error) => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Invalid key ({binding:?}): {}", error.message()),
            )),
        }
    }
}

/// A short human readable version of a keybinding, for showing in the menu.
pub(crate) fn describe_key_event(event: &termwiz::input::KeyEvent) -> String {
    let key = match event.key {
        termwiz::input::KeyCode::Char(' ') => "space".to_owned(),
        termwiz::input::KeyCode::Char(character) => character.to_string(),
        other => format!("{other:?}"),
    };

    if event.modifiers == termwiz::input::Modifiers::NONE {
        key
    } else {
        format!("{:?}+{key}", event.modifiers)
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests aren't so strict")]
mod test {
    use super::*;

    fn run(config: &str) -> termwiz::input::KeyEvent {
        let parsed: KeybindingConfigRaw = toml::from_str(config).unwrap();
        parsed.try_into().unwrap()
    }

    #[test]
    fn keybinding_space() {
        let config = r#"
            key = " "
        "#;
        let expected = termwiz::input::KeyEvent {
            modifiers: termwiz::input::Modifiers::NONE,
            key: termwiz::input::KeyCode::Char(' '),
        };
        assert_eq!(run(config), expected);
    }

    #[test]
    fn keybinding_r() {
        let config = r#"
            key = "r"
        "#;
        let expected = termwiz::input::KeyEvent {
            modifiers: termwiz::input::Modifiers::NONE,
            key: termwiz::input::KeyCode::Char('r'),
        };
        assert_eq!(run(config), expected);
    }

    #[test]
    fn keybinding_escape() {
        let config = r#"
            key = "Escape"
        "#;
        let expected = termwiz::input::KeyEvent {
            modifiers: termwiz::input::Modifiers::NONE,
            key: termwiz::input::KeyCode::Escape,
        };
        assert_eq!(run(config), expected);
    }

    #[test]
    fn keybinding_ctrl_shift_p() {
        let config = r#"
            mods = "CTRL|SHIFT"
            key = "p"
        "#;
        let expected = termwiz::input::KeyEvent {
            modifiers: termwiz::input::Modifiers::CTRL | termwiz::input::Modifiers::SHIFT,
            key: termwiz::input::KeyCode::Char('p'),
        };
        assert_eq!(run(config), expected);
    }

    #[test]
    fn bad_key() {
        let parsed: KeybindingConfigRaw = toml::from_str(r#"key = "NotAKey""#).unwrap();
        let result: Result<termwiz::input::KeyEvent, _> = parsed.try_into();
        assert!(result.is_err());
    }

    #[test]
    fn describing_keys() {
        assert_eq!(describe_key_event(&run(r#"key = " ""#)), "space");
        assert_eq!(describe_key_event(&run(r#"key = "q""#)), "q");
        assert_eq!(describe_key_event(&run(r#"key = "Home""#)), "Home");
    }
}
