use ratatui::style::{Color, Modifier, Style};

pub struct Theme {
    pub focus_border: Style,
    pub blurred_border: Style,
    pub text: Style,
    pub text_secondary: Style,
    pub cursor: Style,

    // Specific components
    pub highlight: Style,
    pub chosen_file: Style,
    pub problem_label: Style,
    pub problem_spans: Style,
    pub problem_reason: Style,
    pub problem_detail: Style,
    pub no_problems: Style,
    pub history_label: Style,
    pub history_meta: Style,
    pub footer: Style,
    pub footer_ready: Style,
    pub busy: Style,
    pub popup: Style,
    pub popup_error: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            focus_border: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            blurred_border: Style::default().fg(Color::DarkGray),
            text: Style::default().fg(Color::White),
            text_secondary: Style::default().fg(Color::Gray),
            cursor: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),

            highlight: Style::default().fg(Color::Black).bg(Color::Yellow),
            chosen_file: Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            problem_label: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            problem_spans: Style::default().fg(Color::White),
            problem_reason: Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
            problem_detail: Style::default().fg(Color::Magenta),
            no_problems: Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            history_label: Style::default().fg(Color::Cyan),
            history_meta: Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            footer: Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
            footer_ready: Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            busy: Style::default().fg(Color::Yellow).add_modifier(Modifier::SLOW_BLINK),
            popup: Style::default().fg(Color::White).bg(Color::Black),
            popup_error: Style::default().fg(Color::Red).bg(Color::Black),
        }
    }
}

impl Theme {
    pub fn border(&self, focused: bool) -> Style {
        if focused { self.focus_border } else { self.blurred_border }
    }
}
