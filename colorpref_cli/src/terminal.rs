//! ANSI truecolor rendering of samples.

use std::io::Write;

use colorpref_core::{ColorSample, ColorView};

const SWATCH_WIDTH: usize = 24;
const SWATCH_ROWS: usize = 3;

pub struct TerminalView<W: Write> {
    out: W,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        let result = self
            .out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush());
        if let Err(err) = result {
            tracing::warn!(error = %err, "failed to write to terminal");
        }
    }
}

impl<W: Write> ColorView for TerminalView<W> {
    fn show_color(&mut self, sample: &ColorSample) {
        let [r, g, b] = sample.to_rgb8();
        let row = format!("\x1b[48;2;{r};{g};{b}m{}\x1b[0m\n", " ".repeat(SWATCH_WIDTH));
        let mut text = String::from("\n");
        for _ in 0..SWATCH_ROWS {
            text.push_str(&row);
        }
        text.push_str(&format!(
            "{}  (h {:.2} s {:.2} v {:.2})\n",
            sample.to_hex(),
            sample.hue(),
            sample.saturation(),
            sample.value()
        ));
        self.write(&text);
    }

    fn show_prediction_text(&mut self, text: &str) {
        self.write(&format!("prediction: {text}\n"));
    }

    // Output is append-only; a new swatch already separates samples.
    fn clear_prediction_text(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swatch_uses_truecolor_background_and_hex() {
        let mut view = TerminalView::new(Vec::new());
        view.show_color(&ColorSample::new([0.0, 0.0, 0.2]).unwrap());
        let out = String::from_utf8(view.into_inner()).unwrap();
        assert!(out.contains("\x1b[48;2;51;51;51m"));
        assert!(out.contains("#333333  (h 0.00 s 0.00 v 0.20)"));
        assert_eq!(out.matches("\x1b[0m").count(), SWATCH_ROWS);
    }

    #[test]
    fn prediction_text_is_labelled() {
        let mut view = TerminalView::new(Vec::new());
        view.show_prediction_text("7.9");
        view.clear_prediction_text();
        let out = String::from_utf8(view.into_inner()).unwrap();
        assert_eq!(out, "prediction: 7.9\n");
    }
}
