use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub info: Style,
    pub dim: Style,
}

impl Theme {
    /// Colors only when stdout is a terminal
    pub fn detect() -> Self {
        if console::Term::stdout().is_term() {
            Self::colored()
        } else {
            Self::plain()
        }
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().green().bold(),
            success: Style::new().green(),
            error: Style::new().red().bold(),
            warn: Style::new().yellow().bold(),
            info: Style::new().cyan(),
            dim: Style::new().bright_black(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            error: Style::new(),
            warn: Style::new(),
            info: Style::new(),
            dim: Style::new(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
