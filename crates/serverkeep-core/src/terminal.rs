use serde::{Deserialize, Deserializer};

/// Token replaced by the full command line when a template is expanded.
pub const COMMAND_PLACEHOLDER: &str = "{command}";

/// Terminal emulators the interactive launch knows how to drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalKind {
    Ghostty,
    Kitty,
    Konsole,
    GnomeTerminal,
    XTerminalEmulator,
    Xterm,
    WindowsConsole,
    Custom(Vec<String>),
}

impl TerminalKind {
    pub fn name(&self) -> &str {
        match self {
            Self::Ghostty => "ghostty",
            Self::Kitty => "kitty",
            Self::Konsole => "konsole",
            Self::GnomeTerminal => "gnome-terminal",
            Self::XTerminalEmulator => "x-terminal-emulator",
            Self::Xterm => "xterm",
            Self::WindowsConsole => "windows-console",
            Self::Custom(_) => "custom",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "ghostty" => Some(Self::Ghostty),
            "kitty" => Some(Self::Kitty),
            "konsole" => Some(Self::Konsole),
            "gnome-terminal" | "gnome_terminal" | "gnometerminal" => Some(Self::GnomeTerminal),
            "x-terminal-emulator" | "x_terminal_emulator" => Some(Self::XTerminalEmulator),
            "xterm" => Some(Self::Xterm),
            "windows-console" | "cmd" => Some(Self::WindowsConsole),
            _ => None,
        }
    }

    pub fn template(&self) -> Vec<String> {
        let tokens: &[&str] = match self {
            Self::Ghostty => &["ghostty", "-e", "bash", "-lc", COMMAND_PLACEHOLDER],
            Self::Kitty => &["kitty", "--hold", "bash", "-lc", COMMAND_PLACEHOLDER],
            Self::Konsole => &["konsole", "-e", "bash", "-lc", "{command}; exec bash"],
            Self::GnomeTerminal => &["gnome-terminal", "--", "bash", "-lc", "{command}; exec bash"],
            Self::XTerminalEmulator => &["x-terminal-emulator", "-e", "bash", "-lc", COMMAND_PLACEHOLDER],
            Self::Xterm => &["xterm", "-e", "bash", "-lc", COMMAND_PLACEHOLDER],
            Self::WindowsConsole => &["cmd", "/c", "start", "Hytale Server", "cmd", "/k", COMMAND_PLACEHOLDER],
            Self::Custom(tokens) => return tokens.clone(),
        };
        tokens.iter().map(|token| token.to_string()).collect()
    }

    /// Program and arguments with the placeholder replaced.
    ///
    /// A custom template without a placeholder gets the command line appended
    /// as its last argument.
    pub fn expand(&self, command_line: &str) -> Vec<String> {
        let template = self.template();
        let has_placeholder = template
            .iter()
            .any(|token| token.contains(COMMAND_PLACEHOLDER));
        let mut tokens = template
            .into_iter()
            .map(|token| token.replace(COMMAND_PLACEHOLDER, command_line))
            .collect::<Vec<_>>();
        if !has_placeholder {
            tokens.push(command_line.to_string());
        }
        tokens
    }
}

/// Ranked candidates tried when no terminal preference is configured.
pub fn default_terminal_kinds() -> Vec<TerminalKind> {
    if cfg!(windows) {
        return vec![TerminalKind::WindowsConsole];
    }
    vec![
        TerminalKind::XTerminalEmulator,
        TerminalKind::GnomeTerminal,
        TerminalKind::Konsole,
        TerminalKind::Xterm,
    ]
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TerminalSetting {
    Named(String),
    Tokens(Vec<String>),
}

impl<'de> Deserialize<'de> for TerminalKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match TerminalSetting::deserialize(deserializer)? {
            TerminalSetting::Named(name) => TerminalKind::parse(&name).ok_or_else(|| {
                serde::de::Error::custom(format!("unknown terminal '{name}'"))
            }),
            TerminalSetting::Tokens(tokens) if tokens.is_empty() => Err(
                serde::de::Error::custom("custom terminal template must not be empty"),
            ),
            TerminalSetting::Tokens(tokens) => Ok(TerminalKind::Custom(tokens)),
        }
    }
}
