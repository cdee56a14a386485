use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    widgets::{Paragraph, Widget},
};

/// Key-hint bar shown at the bottom of the browse view.
#[derive(Default)]
pub struct Controls {
    pub row_count: Option<usize>,
}

impl Controls {
    pub fn with_row_count(row_count: usize) -> Self {
        Self {
            row_count: Some(row_count),
        }
    }
}

impl Widget for &Controls {
    fn render(self, area: Rect, buf: &mut Buffer) {
        const CONTROLS: [(&str, &str); 6] = [
            ("a", "Add"),
            ("e", "Edit"),
            ("d", "Delete"),
            ("</>", "Sort"),
            ("r", "Reverse"),
            ("q", "Quit"),
        ];

        // Two cells per hint: the key, then its action label.
        let mut constraints: Vec<Constraint> = Vec::with_capacity(CONTROLS.len() * 2 + 2);
        for (key, action) in CONTROLS {
            constraints.push(Constraint::Length(key.chars().count() as u16 + 2));
            constraints.push(Constraint::Length(action.chars().count() as u16 + 1));
        }
        if self.row_count.is_some() {
            constraints.push(Constraint::Length(15));
        }
        constraints.push(Constraint::Fill(1));

        let cells = Layout::new(Direction::Horizontal, constraints).split(area);
        let base_style = Style::default();

        for (i, (key, action)) in CONTROLS.iter().enumerate() {
            Paragraph::new(*key)
                .style(base_style.bold())
                .centered()
                .render(cells[i * 2], buf);
            Paragraph::new(*action)
                .style(base_style.bg(Color::DarkGray))
                .render(cells[i * 2 + 1], buf);
        }

        if let Some(row_count) = self.row_count {
            Paragraph::new(format!(" Rows: {row_count}"))
                .style(base_style)
                .render(cells[CONTROLS.len() * 2], buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_hints_and_row_count() {
        let controls = Controls::with_row_count(42);
        let area = Rect::new(0, 0, 60, 1);
        let mut buf = Buffer::empty(area);
        (&controls).render(area, &mut buf);
        let line: String = (0..60).map(|x| buf[(x, 0)].symbol().to_string()).collect();
        assert!(line.contains("Add"));
        assert!(line.contains("Quit"));
        assert!(line.contains("Rows: 42"));
    }
}
