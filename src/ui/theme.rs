use crate::identifier::ModuleId;
use crate::ui::Icons;
use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// What an edge target is, for display purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Module,
    /// Pseudo-identifier of an intentionally unresolved import
    Unresolved,
    /// Loader-plugin resource
    Plugin,
}

impl EdgeKind {
    pub fn of(target: &ModuleId, empty_sentinel: &str, plugin_separator: char) -> Self {
        if target.is_pseudo(empty_sentinel) {
            EdgeKind::Unresolved
        } else if target.is_plugin_resource(plugin_separator) {
            EdgeKind::Plugin
        } else {
            EdgeKind::Module
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            EdgeKind::Module => Icons::LINK,
            EdgeKind::Unresolved => Icons::HOLE,
            EdgeKind::Plugin => Icons::PLUG,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub warn: Style,
    /// Graph keys
    pub module: Style,
    pub unresolved: Style,
    pub plugin: Style,
    pub count: Style,
}

impl Theme {
    /// Colors only when stdout is a terminal and `console` allows them
    /// (`NO_COLOR`, `CLICOLOR_FORCE`)
    pub fn detect() -> Self {
        if console::Term::stdout().is_term() && console::colors_enabled() {
            Self::colored()
        } else {
            Self::plain()
        }
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            warn: Style::new().yellow().bold(),
            module: Style::new().bold(),
            unresolved: Style::new().magenta().italic(),
            plugin: Style::new().blue().italic(),
            count: Style::new().bright_black(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            warn: Style::new(),
            module: Style::new(),
            unresolved: Style::new(),
            plugin: Style::new(),
            count: Style::new(),
        }
    }

    pub fn edge(&self, kind: EdgeKind) -> Style {
        match kind {
            EdgeKind::Module => Style::new(),
            EdgeKind::Unresolved => self.unresolved.clone(),
            EdgeKind::Plugin => self.plugin.clone(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
