//! Console progress bar with two output strategies.
//!
//! Interactive terminals get a single line redrawn in place; anything else
//! (pipes, files, log shippers) gets one line per emitted update.
use std::io::{self, IsTerminal, Write};

use anyhow::{ensure, Result};
use tracing::debug;

/// Destination for rendered progress lines.
pub trait ProgressRender {
    fn render(&mut self, line: &str, finished: bool) -> io::Result<()>;
}

impl<R: ProgressRender + ?Sized> ProgressRender for Box<R> {
    fn render(&mut self, line: &str, finished: bool) -> io::Result<()> {
        (**self).render(line, finished)
    }
}

/// Redraws the current line with `\r`; ends with a newline once finished.
pub struct InPlaceRenderer<W> {
    out: W,
}

impl<W: Write> InPlaceRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressRender for InPlaceRenderer<W> {
    fn render(&mut self, line: &str, finished: bool) -> io::Result<()> {
        write!(self.out, "\r{line}")?;
        if finished {
            writeln!(self.out)?;
        }
        self.out.flush()
    }
}

/// One line per update.
pub struct LineRenderer<W> {
    out: W,
}

impl<W: Write> LineRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressRender for LineRenderer<W> {
    fn render(&mut self, line: &str, _finished: bool) -> io::Result<()> {
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }
}

pub struct ProgressBar<R> {
    total: u64,
    every: u64,
    width: usize,
    show_counter: bool,
    renderer: R,
}

impl<R: ProgressRender> ProgressBar<R> {
    /// `every` is the cadence: only multiples of it (and the final step) draw.
    pub fn new(total: u64, every: u64, width: usize, renderer: R) -> Result<Self> {
        ensure!(every >= 1, "progress cadence must be at least 1, got {every}");
        ensure!(width >= 1, "progress bar width must be at least 1, got {width}");
        Ok(Self {
            total,
            every,
            width,
            show_counter: true,
            renderer,
        })
    }

    /// Drop the `done/total (pct%)` annotation.
    pub fn without_counter(mut self) -> Self {
        self.show_counter = false;
        self
    }

    pub fn update(&mut self, done: u64) -> io::Result<()> {
        let finished = done >= self.total;
        if done % self.every != 0 && !finished {
            return Ok(());
        }
        debug!(target: "progress", done, total = self.total, "progress");
        let line = self.line(done);
        self.renderer.render(&line, finished)
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    fn line(&self, done: u64) -> String {
        let ratio = if self.total == 0 {
            1.0
        } else {
            (done.min(self.total) as f64) / (self.total as f64)
        };
        let filled = ((ratio * self.width as f64).floor() as usize).min(self.width);
        let mut line = String::with_capacity(self.width + 32);
        line.push('[');
        line.push_str(&"#".repeat(filled));
        line.push_str(&"-".repeat(self.width - filled));
        line.push(']');
        if self.show_counter {
            line.push_str(&format!(" {done}/{} ({:.1}%)", self.total, ratio * 100.0));
        }
        line
    }
}

/// Progress bar on stdout, redrawing in place only when stdout is a terminal.
pub fn stdout_progress(
    total: u64,
    every: u64,
    width: usize,
) -> Result<ProgressBar<Box<dyn ProgressRender + Send>>> {
    let stdout = io::stdout();
    let renderer: Box<dyn ProgressRender + Send> = if stdout.is_terminal() {
        Box::new(InPlaceRenderer::new(stdout))
    } else {
        Box::new(LineRenderer::new(stdout))
    };
    ProgressBar::new(total, every, width, renderer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(bar: ProgressBar<LineRenderer<Vec<u8>>>) -> String {
        String::from_utf8(bar.into_renderer().into_inner()).unwrap()
    }

    #[test]
    fn emits_only_on_cadence_and_completion() {
        let mut bar = ProgressBar::new(10, 4, 10, LineRenderer::new(Vec::new())).unwrap();
        for done in 1..=10 {
            bar.update(done).unwrap();
        }
        let out = rendered(bar);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "[####------] 4/10 (40.0%)",
                "[########--] 8/10 (80.0%)",
                "[##########] 10/10 (100.0%)",
            ]
        );
    }

    #[test]
    fn counter_can_be_hidden() {
        let mut bar = ProgressBar::new(2, 1, 4, LineRenderer::new(Vec::new()))
            .unwrap()
            .without_counter();
        bar.update(1).unwrap();
        assert_eq!(rendered(bar), "[##--]\n");
    }

    #[test]
    fn in_place_renderer_rewrites_line() {
        let mut bar = ProgressBar::new(2, 1, 2, InPlaceRenderer::new(Vec::new())).unwrap();
        bar.update(1).unwrap();
        bar.update(2).unwrap();
        let out = String::from_utf8(bar.into_renderer().into_inner()).unwrap();
        assert_eq!(out, "\r[#-] 1/2 (50.0%)\r[##] 2/2 (100.0%)\n");
    }

    #[test]
    fn empty_total_renders_complete() {
        let mut bar = ProgressBar::new(0, 5, 3, LineRenderer::new(Vec::new())).unwrap();
        bar.update(0).unwrap();
        assert_eq!(rendered(bar), "[###] 0/0 (100.0%)\n");
    }

    #[test]
    fn rejects_zero_cadence_and_width() {
        assert!(ProgressBar::new(5, 0, 10, LineRenderer::new(Vec::new())).is_err());
        assert!(ProgressBar::new(5, 1, 0, LineRenderer::new(Vec::new())).is_err());
    }
}
