use console::{Style, measure_text_width};
use std::sync::Arc;

const SEPARATOR: &str = " | ";

/// Fixed cycle of label styles, indexed by a context's position in the
/// match set.
#[derive(Debug, Clone)]
pub struct Palette {
    styles: Vec<Style>,
}

impl Default for Palette {
    fn default() -> Self {
        let styles = vec![
            // foreground only
            Style::new().red(),
            Style::new().blue(),
            Style::new().green(),
            Style::new().yellow().on_black(),
            Style::new().black().bright(),
            Style::new().magenta(),
            Style::new().cyan(),
            Style::new().red().bright(),
            Style::new().blue().bright(),
            Style::new().green().bright(),
            Style::new().magenta().bright(),
            Style::new().yellow().bright().on_black(),
            Style::new().cyan().bright(),
            // inverse
            Style::new().on_red().white(),
            Style::new().on_blue().white(),
            Style::new().on_cyan().black(),
            Style::new().on_green().black(),
            Style::new().on_magenta().white().bright(),
            Style::new().on_yellow().black(),
            Style::new().on_black().on_bright().white(),
            Style::new().on_red().on_bright().white(),
            Style::new().on_blue().on_bright().white(),
            Style::new().on_cyan().on_bright().black(),
            Style::new().on_green().on_bright().black(),
            Style::new().on_magenta().on_bright().black(),
            Style::new().on_yellow().on_bright().black(),
            // mixed
            Style::new().on_red().yellow(),
            Style::new().on_yellow().red(),
            Style::new().on_blue().yellow(),
            Style::new().on_yellow().blue(),
            Style::new().on_black().white().bright(),
            Style::new().on_white().on_bright().black(),
        ];
        Self::new(styles)
    }
}

impl Palette {
    pub fn new(styles: Vec<Style>) -> Self {
        let styles = if styles.is_empty() {
            vec![Style::new()]
        } else {
            styles
        };
        // Labels go to both streams; decide on colors from stderr like the
        // rest of the diagnostics.
        Self {
            styles: styles.into_iter().map(Style::for_stderr).collect(),
        }
    }

    /// A palette that never emits escape codes.
    pub fn plain() -> Self {
        Self::new(vec![Style::new()])
    }

    /// Style for the context at `position` in the match set.
    pub fn slot(&self, position: usize) -> &Style {
        &self.styles[position % self.styles.len()]
    }
}

/// Precomputed output prefixes for a match set, one per position.
#[derive(Debug, Clone)]
pub struct Labels {
    labels: Vec<Arc<[u8]>>,
}

impl Labels {
    /// Pad every name to the widest one and apply its position's style.
    pub fn new(targets: &[String], palette: &Palette) -> Self {
        let width = targets
            .iter()
            .map(|t| measure_text_width(t))
            .max()
            .unwrap_or(0);

        let labels = targets
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let pad = " ".repeat(width - measure_text_width(name));
                let label = format!("{}{}{}", pad, palette.slot(i).apply_to(name), SEPARATOR);
                Arc::from(label.into_bytes())
            })
            .collect();

        Self { labels }
    }

    pub fn get(&self, position: usize) -> Option<Arc<[u8]>> {
        self.labels.get(position).cloned()
    }
}
