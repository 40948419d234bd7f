//! Count-up numbers.
//!
//! A [`Counter`] animates an integer from `from` to `to` on wall-clock time
//! with an ease-out cubic curve, starting once its trigger has been entered.
//! It only writes the element's text when the displayed number changes.

use crate::easing::ease_out_cubic;
use crate::event::ElementRef;
use crate::timeline::Playback;
use crate::traits::Surface;
use log::debug;
use serde::{Deserialize, Serialize};

/// Defaults shared by every counter on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterParams {
    pub duration_s: f64,
    /// Thousands separator; empty disables grouping.
    pub separator: String,
}

impl Default for CounterParams {
    fn default() -> Self {
        Self {
            duration_s: 2.0,
            separator: ",".to_string(),
        }
    }
}

/// A number on `target` that counts from `from` to `to` with an ease-out
/// cubic once started.
#[derive(Debug, Clone)]
pub struct Counter {
    target: ElementRef,
    from: i64,
    to: i64,
    separator: String,
    playback: Playback,
    shown: Option<i64>,
}

impl Counter {
    pub fn new(target: ElementRef, from: i64, to: i64, params: &CounterParams) -> Self {
        Self {
            target,
            from,
            to,
            separator: params.separator.clone(),
            playback: Playback::new(0.0, params.duration_s),
            shown: None,
        }
    }

    /// Wait `delay` seconds after [`start`](Self::start) before counting.
    pub fn with_delay(mut self, delay: f64) -> Self {
        self.playback = Playback::new(delay, self.playback.duration());
        self
    }

    pub fn target(&self) -> ElementRef {
        self.target
    }

    pub fn is_started(&self) -> bool {
        self.playback.is_started()
    }

    /// Start counting at `now`.  Later calls are ignored.
    pub fn start(&mut self, now: f64) {
        if self.playback.is_started() {
            return;
        }
        debug!("counter {} started at {:.3}", self.target, now);
        self.playback.start(now);
    }

    /// The number to show at `now`.
    pub fn value(&self, now: f64) -> i64 {
        let t = ease_out_cubic(self.playback.progress(now));
        (self.from as f64 + (self.to - self.from) as f64 * t).round() as i64
    }

    pub fn is_complete(&self, now: f64) -> bool {
        self.playback.is_complete(now)
    }

    /// Write the number at `now` if it differs from the last one written.
    pub fn render<S: Surface + ?Sized>(&mut self, surface: &mut S, now: f64) {
        let value = self.value(now);
        if self.shown == Some(value) {
            return;
        }
        surface.set_text(self.target, &format_number(value, &self.separator));
        self.shown = Some(value);
    }

    /// Forget what was written, so a remount writes again.
    pub fn reset_shown(&mut self) {
        self.shown = None;
    }
}

/// Group thousands with `separator`.
pub fn format_number(n: i64, separator: &str) -> String {
    let digits = n.unsigned_abs().to_string();
    if separator.is_empty() {
        return n.to_string();
    }
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * separator.len() + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordingSurface;

    const EL: ElementRef = ElementRef(9);

    #[test]
    fn formatting() {
        assert_eq!(format_number(0, ","), "0");
        assert_eq!(format_number(999, ","), "999");
        assert_eq!(format_number(10000, ","), "10,000");
        assert_eq!(format_number(50_000_000, " "), "50 000 000");
        assert_eq!(format_number(-1234567, "."), "-1.234.567");
        assert_eq!(format_number(10000, ""), "10000");
    }

    #[test]
    fn counts_with_ease_out_cubic() {
        let mut c = Counter::new(EL, 0, 10000, &CounterParams::default());
        assert_eq!(c.value(5.0), 0);
        c.start(1.0);
        assert_eq!(c.value(1.0), 0);
        // t = 0.5 → 1 - 0.125
        assert_eq!(c.value(2.0), 8750);
        assert_eq!(c.value(3.0), 10000);
        assert_eq!(c.value(30.0), 10000);
        assert!(c.is_complete(3.0));
    }

    #[test]
    fn delay_holds_the_start_value() {
        let mut c = Counter::new(EL, 5, 98, &CounterParams::default()).with_delay(0.5);
        c.start(0.0);
        assert_eq!(c.value(0.4), 5);
        assert_eq!(c.value(2.5), 98);
    }

    #[test]
    fn starting_twice_is_a_no_op() {
        let mut c = Counter::new(EL, 0, 100, &CounterParams::default());
        c.start(1.0);
        c.start(1.9);
        assert_eq!(c.value(3.0), 100);
    }

    #[test]
    fn renders_only_changes() {
        let mut s = RecordingSurface::new();
        let mut c = Counter::new(EL, 0, 10000, &CounterParams::default());
        c.render(&mut s, 0.0);
        c.render(&mut s, 0.1);
        c.start(0.0);
        c.render(&mut s, 1.0);
        c.render(&mut s, 2.0);
        c.render(&mut s, 2.5);
        assert_eq!(s.texts_for(EL), vec!["0", "8,750", "10,000"]);
    }
}
