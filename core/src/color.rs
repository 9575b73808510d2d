use crate::error::PaletteError;
use crate::span::Trace;
use std::collections::HashMap;

/// Jaeger UI service colors.
pub const DEFAULT_COLORS: [&str; 20] = [
    "#17B8BE", "#F8DCA1", "#B7885E", "#FFCB99", "#F89570", "#829AE3", "#E79FD5", "#1E96BE",
    "#89DAC1", "#B3AD9E", "#12939A", "#DDB27C", "#88572C", "#FF9833", "#EF5D28", "#162A65",
    "#DA70BF", "#125C77", "#4DC19C", "#776E57",
];

/// Fixed, non-empty list of `#RRGGBB` display colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorPalette {
    colors: Vec<String>,
}

impl ColorPalette {
    pub fn new(colors: Vec<String>) -> Result<Self, PaletteError> {
        if colors.is_empty() {
            return Err(PaletteError::Empty);
        }
        if let Some(bad) = colors.iter().find(|c| !is_hex_color(c)) {
            return Err(PaletteError::InvalidColor(bad.clone()));
        }
        Ok(Self { colors })
    }

    /// Color at `index`, wrapping around the palette.
    pub fn color(&self, index: usize) -> &str {
        &self.colors[index % self.colors.len()]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_COLORS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

pub(crate) fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Service name to color mapping accumulated over one batch of traces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceColors {
    assigned: HashMap<String, String>,
}

impl ServiceColors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, service_name: &str) -> Option<&str> {
        self.assigned.get(service_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    /// Color every process of `trace`.
    ///
    /// A service seen earlier in the batch keeps its color. A new service takes
    /// the palette entry at its process's position in this trace's process map.
    /// Span copies of each process are updated to match.
    pub fn assign(&mut self, trace: &mut Trace, palette: &ColorPalette) {
        for (position, process) in trace.processes.values_mut().enumerate() {
            let color = self
                .assigned
                .entry(process.service_name.clone())
                .or_insert_with(|| palette.color(position).to_string());
            process.color = Some(color.clone());
        }

        for span in &mut trace.spans {
            span.process.color = trace
                .processes
                .get(&span.process_id)
                .and_then(|process| process.color.clone());
        }
    }
}

/// Color all traces of one batch so each service keeps a single color.
pub fn assign_colors(traces: &mut [Trace], palette: &ColorPalette) -> ServiceColors {
    let mut colors = ServiceColors::new();
    for trace in traces.iter_mut() {
        colors.assign(trace, palette);
    }
    colors
}
