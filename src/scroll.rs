//! The scroll-progress driver.
//!
//! A [`ScrollDriver`] turns the document scroll offset into a normalized
//! progress for one trigger region.  The region is measured from the
//! trigger element's rect in the document flow:
//!
//! ```text
//! document y ──────────────────────────────────────────────▶
//!            │ trigger_start            trigger_end │
//!   progress │ 0 ──────────────────────────────── 1 │
//! ```
//!
//! `progress = clamp((scroll_y - trigger_start) / (trigger_end - trigger_start), 0, 1)`,
//! and a degenerate region (`trigger_end <= trigger_start`) always reports `1`.
//!
//! # Trigger expressions
//!
//! | Expression      | Meaning                                              |
//! |-----------------|------------------------------------------------------|
//! | `"top top"`     | element top meets viewport top                        |
//! | `"top 80%"`     | element top meets 80% of the viewport height          |
//! | `"bottom top"`  | element bottom meets viewport top                     |
//! | `"left right"`  | horizontal alias of `"top bottom"`                    |
//! | `"+=500%"`      | five viewport heights past the start (end only)       |
//! | `"+=1200"`      | 1200 px past the start (end only)                     |
//! | `"+=width(#3)"` | the width of element 3 past the start (end only)     |
//!
//! # Pinning
//!
//! A pinned section is never frozen by stopping the document scroll.  While
//! progress advances, the host shows the element as a fixed-position overlay
//! and a spacer of `trigger_end - trigger_start` pixels reserves the scrolled
//! distance in the flow; see [`PinPlacement`].

use crate::event::{ElementRef, Rect, Viewport};
use crate::traits::Layout;
use log::debug;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Error from parsing a trigger expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid trigger expression {0:?}")]
pub struct TriggerParseError(String);

/// A point along one axis of a box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Edge {
    /// `top` / `left`
    Start,
    Center,
    /// `bottom` / `right`
    End,
    /// Percentage of the extent.
    Percent(f64),
    /// Pixels from the start.
    Pixels(f64),
}

impl Edge {
    pub fn resolve(&self, extent: f64) -> f64 {
        match *self {
            Edge::Start => 0.0,
            Edge::Center => extent / 2.0,
            Edge::End => extent,
            Edge::Percent(p) => extent * p / 100.0,
            Edge::Pixels(px) => px,
        }
    }

    fn parse(s: &str) -> Option<Edge> {
        match s {
            "top" | "left" => Some(Edge::Start),
            "center" => Some(Edge::Center),
            "bottom" | "right" => Some(Edge::End),
            _ => {
                if let Some(p) = s.strip_suffix('%') {
                    p.parse().ok().map(Edge::Percent)
                } else {
                    let px = s.strip_suffix("px").unwrap_or(s);
                    px.parse().ok().map(Edge::Pixels)
                }
            }
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Start => write!(f, "top"),
            Edge::Center => write!(f, "center"),
            Edge::End => write!(f, "bottom"),
            Edge::Percent(p) => write!(f, "{}%", p),
            Edge::Pixels(px) => write!(f, "{}px", px),
        }
    }
}

/// A scroll distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distance {
    Pixels(f64),
    /// Percent of the viewport height.
    ViewportPercent(f64),
    /// The current width of an element (a horizontal track).
    ElementWidth(ElementRef),
}

impl Distance {
    fn resolve<L: Layout + ?Sized>(&self, layout: &L, viewport: Viewport) -> Option<f64> {
        match *self {
            Distance::Pixels(px) => Some(px),
            Distance::ViewportPercent(p) => Some(viewport.height * p / 100.0),
            Distance::ElementWidth(el) => layout.element_rect(el).map(|r| r.width),
        }
    }
}

/// Where a trigger region starts or ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerPos {
    /// `element` edge of the trigger meets the `viewport` edge.
    Meet { element: Edge, viewport: Edge },
    /// A distance past the start of the region.
    PastStart(Distance),
}

impl TriggerPos {
    pub const TOP_TOP: TriggerPos = TriggerPos::Meet {
        element: Edge::Start,
        viewport: Edge::Start,
    };
    pub const TOP_BOTTOM: TriggerPos = TriggerPos::Meet {
        element: Edge::Start,
        viewport: Edge::End,
    };
    pub const BOTTOM_TOP: TriggerPos = TriggerPos::Meet {
        element: Edge::End,
        viewport: Edge::Start,
    };

    pub fn parse(s: &str) -> Result<TriggerPos, TriggerParseError> {
        let s = s.trim();
        let bad = || TriggerParseError(s.to_string());
        if let Some(rest) = s.strip_prefix("+=") {
            let rest = rest.trim();
            let distance = if let Some(inner) = rest
                .strip_prefix("width(")
                .and_then(|r| r.strip_suffix(')'))
            {
                let id = inner.trim().trim_start_matches('#');
                Distance::ElementWidth(ElementRef(id.parse().map_err(|_| bad())?))
            } else if let Some(p) = rest.strip_suffix('%') {
                Distance::ViewportPercent(p.trim().parse().map_err(|_| bad())?)
            } else {
                let px = rest.strip_suffix("px").unwrap_or(rest);
                Distance::Pixels(px.trim().parse().map_err(|_| bad())?)
            };
            return Ok(TriggerPos::PastStart(distance));
        }
        let mut parts = s.split_whitespace();
        let (Some(el), Some(vp), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(bad());
        };
        Ok(TriggerPos::Meet {
            element: Edge::parse(el).ok_or_else(bad)?,
            viewport: Edge::parse(vp).ok_or_else(bad)?,
        })
    }

    /// Document scroll offset at which this position is reached.
    /// `start` is the already-resolved region start (for `PastStart`).
    fn resolve<L: Layout + ?Sized>(
        &self,
        rect: Rect,
        viewport: Viewport,
        layout: &L,
        start: f64,
    ) -> Option<f64> {
        match self {
            TriggerPos::Meet { element, viewport: vp } => {
                Some(rect.y + element.resolve(rect.height) - vp.resolve(viewport.height))
            }
            TriggerPos::PastStart(d) => d.resolve(layout, viewport).map(|d| start + d),
        }
    }
}

impl fmt::Display for TriggerPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerPos::Meet { element, viewport } => write!(f, "{} {}", element, viewport),
            TriggerPos::PastStart(Distance::Pixels(px)) => write!(f, "+={}", px),
            TriggerPos::PastStart(Distance::ViewportPercent(p)) => write!(f, "+={}%", p),
            TriggerPos::PastStart(Distance::ElementWidth(el)) => write!(f, "+=width({})", el),
        }
    }
}

impl Serialize for TriggerPos {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TriggerPos {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        TriggerPos::parse(&s).map_err(DeError::custom)
    }
}

/// How displayed progress follows scroll progress.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Scrub {
    /// Not scrubbed: the trigger fires once when the region is entered and
    /// never reverses.
    Off,
    /// Displayed progress equals scroll progress.
    #[default]
    Immediate,
    /// Displayed progress catches up with scroll progress over roughly
    /// this many seconds.
    Lag(f64),
}

impl Serialize for Scrub {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Scrub::Off => serializer.serialize_bool(false),
            Scrub::Immediate => serializer.serialize_bool(true),
            Scrub::Lag(s) => serializer.serialize_f64(s),
        }
    }
}

impl<'de> Deserialize<'de> for Scrub {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Lag(f64),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Flag(false) => Scrub::Off,
            Repr::Flag(true) => Scrub::Immediate,
            Repr::Lag(s) if s > 0.0 => Scrub::Lag(s),
            Repr::Lag(_) => Scrub::Immediate,
        })
    }
}

/// Per-section trigger configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollTriggerConfig {
    pub trigger: ElementRef,
    #[serde(default)]
    pub pin: bool,
    /// Defaults to `"top top"` when pinned, `"top bottom"` otherwise.
    #[serde(default)]
    pub start: Option<TriggerPos>,
    /// Defaults to `"bottom top"`.
    #[serde(default)]
    pub end: Option<TriggerPos>,
    #[serde(default)]
    pub scrub: Scrub,
    /// Snap increment in progress units, e.g. `1/3` for four cards.
    #[serde(default)]
    pub snap: Option<f64>,
}

impl ScrollTriggerConfig {
    pub fn new(trigger: ElementRef) -> Self {
        Self {
            trigger,
            pin: false,
            start: None,
            end: None,
            scrub: Scrub::Immediate,
            snap: None,
        }
    }

    pub fn pinned(mut self) -> Self {
        self.pin = true;
        self
    }

    pub fn start(mut self, pos: TriggerPos) -> Self {
        self.start = Some(pos);
        self
    }

    pub fn end(mut self, pos: TriggerPos) -> Self {
        self.end = Some(pos);
        self
    }

    pub fn scrub(mut self, scrub: Scrub) -> Self {
        self.scrub = scrub;
        self
    }

    pub fn snap(mut self, increment: f64) -> Self {
        self.snap = (increment > 0.0 && increment <= 1.0).then_some(increment);
        self
    }

    fn start_pos(&self) -> TriggerPos {
        self.start.unwrap_or(if self.pin {
            TriggerPos::TOP_TOP
        } else {
            TriggerPos::TOP_BOTTOM
        })
    }

    fn end_pos(&self) -> TriggerPos {
        self.end.unwrap_or(TriggerPos::BOTTOM_TOP)
    }
}

/// Scroll offset → progress for one trigger region.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollProgressState {
    pub raw_scroll_y: f64,
    pub trigger_start: f64,
    pub trigger_end: f64,
    pub progress: f64,
}

impl ScrollProgressState {
    pub fn new(raw_scroll_y: f64, trigger_start: f64, trigger_end: f64) -> Self {
        Self {
            raw_scroll_y,
            trigger_start,
            trigger_end,
            progress: progress_for(raw_scroll_y, trigger_start, trigger_end),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.trigger_end > self.trigger_start)
    }

    /// Document offset at which the region shows `progress`.
    pub fn scroll_for(&self, progress: f64) -> f64 {
        self.trigger_start + progress * (self.trigger_end - self.trigger_start)
    }
}

/// `clamp((y - start) / (end - start), 0, 1)`, or `1` for an empty or
/// inverted region.
pub fn progress_for(scroll_y: f64, trigger_start: f64, trigger_end: f64) -> f64 {
    let span = trigger_end - trigger_start;
    if !(span > 0.0) {
        return 1.0;
    }
    let p = (scroll_y - trigger_start) / span;
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

/// Progress of an element riding a horizontally translated track, from its
/// left edge meeting the viewport's right edge to its right edge meeting the
/// viewport's left edge.
pub fn container_progress(viewport_width: f64, element_x: f64, element_width: f64, track_x: f64) -> f64 {
    let span = viewport_width + element_width;
    if !(span > 0.0) {
        return 1.0;
    }
    ((viewport_width - (element_x + track_x)) / span).clamp(0.0, 1.0)
}

/// Visual placement of a pinned trigger element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PinState {
    /// In normal flow, not yet reached.
    Before,
    /// Shown as a fixed overlay `fixed_top` pixels below the viewport top.
    Pinned { fixed_top: f64 },
    /// Back in flow, pushed down by the spacer.
    After { offset: f64 },
}

/// What the host needs to lay out a pinned section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PinPlacement {
    pub state: PinState,
    /// Height of the spacer reserving the pinned scroll distance.
    pub spacer: f64,
}

/// Drives one trigger region.
#[derive(Debug, Clone)]
pub struct ScrollDriver {
    config: ScrollTriggerConfig,
    element: Option<Rect>,
    state: ScrollProgressState,
    /// Effective target progress (scroll progress, or a snapped value).
    target: f64,
    displayed: f64,
    entered: bool,
    measured: bool,
    scrolled_since_frame: bool,
    last_scroll_at: Option<f64>,
    last_frame_at: Option<f64>,
    snap_delay: f64,
    snapped: bool,
    scroll_request: Option<f64>,
}

impl ScrollDriver {
    pub fn new(config: ScrollTriggerConfig) -> Self {
        Self {
            config,
            element: None,
            state: ScrollProgressState::default(),
            target: 0.0,
            displayed: 0.0,
            entered: false,
            measured: false,
            scrolled_since_frame: false,
            last_scroll_at: None,
            last_frame_at: None,
            snap_delay: 0.1,
            snapped: false,
            scroll_request: None,
        }
    }

    /// Seconds without scroll input before snapping kicks in.
    pub fn with_snap_delay(mut self, seconds: f64) -> Self {
        self.snap_delay = seconds.max(0.0);
        self
    }

    pub fn config(&self) -> &ScrollTriggerConfig {
        &self.config
    }

    pub fn state(&self) -> &ScrollProgressState {
        &self.state
    }

    pub fn is_measured(&self) -> bool {
        self.measured
    }

    /// Measure the trigger region from scratch.
    ///
    /// Returns `false` (and leaves the driver unmeasured) when the trigger
    /// element or a referenced element is not mounted.
    pub fn measure<L: Layout + ?Sized>(&mut self, layout: &L) -> bool {
        let Some(rect) = layout.element_rect(self.config.trigger) else {
            debug!("trigger {} missing, not measuring", self.config.trigger);
            self.measured = false;
            return false;
        };
        let viewport = layout.viewport();
        let Some(start) = self.config.start_pos().resolve(rect, viewport, layout, rect.y) else {
            self.measured = false;
            return false;
        };
        let Some(end) = self.config.end_pos().resolve(rect, viewport, layout, start) else {
            debug!("end of trigger {} references a missing element", self.config.trigger);
            self.measured = false;
            return false;
        };
        let first = !self.measured;
        self.element = Some(rect);
        self.state = ScrollProgressState::new(self.state.raw_scroll_y, start, end);
        self.measured = true;
        debug!(
            "trigger {} measured: [{:.1}, {:.1}] ({} x {})",
            self.config.trigger, start, end, viewport.width, viewport.height
        );
        self.retarget();
        // A snap taken against the old region is redone on the next tick.
        self.snapped = false;
        self.scroll_request = None;
        if first {
            self.displayed = self.target;
        }
        true
    }

    /// Store a new scroll offset.  Displayed progress only moves on
    /// [`tick`](Self::tick), so several scroll events between two frames
    /// collapse into the latest one.
    pub fn on_scroll(&mut self, y: f64) {
        self.state = ScrollProgressState::new(y, self.state.trigger_start, self.state.trigger_end);
        self.scrolled_since_frame = true;
        self.snapped = false;
        self.retarget();
    }

    /// Recompute the region after a viewport change, before the next
    /// progress read.
    pub fn on_resize<L: Layout + ?Sized>(&mut self, layout: &L) -> bool {
        self.measure(layout)
    }

    fn retarget(&mut self) {
        if !self.measured {
            return;
        }
        self.target = self.state.progress;
        if self.state.progress > 0.0 {
            self.entered = true;
        }
    }

    /// Advance displayed progress to frame time `now` (seconds) and return it.
    pub fn tick(&mut self, now: f64) -> f64 {
        if !self.measured {
            return self.displayed;
        }
        let dt = self
            .last_frame_at
            .map(|t| (now - t).max(0.0))
            .unwrap_or(0.0);
        self.last_frame_at = Some(now);
        if self.scrolled_since_frame {
            self.last_scroll_at = Some(now);
            self.scrolled_since_frame = false;
        }

        self.apply_snap(now);

        self.displayed = match self.config.scrub {
            Scrub::Off => {
                if self.entered {
                    1.0
                } else {
                    0.0
                }
            }
            Scrub::Immediate => self.target,
            Scrub::Lag(lag) => smooth(self.displayed, self.target, dt, lag),
        };
        self.displayed
    }

    fn apply_snap(&mut self, now: f64) {
        let Some(increment) = self.config.snap else {
            return;
        };
        let Some(last) = self.last_scroll_at else {
            return;
        };
        if self.snapped || now - last < self.snap_delay {
            return;
        }
        let p = self.state.progress;
        let snapped = ((p / increment).round() * increment).clamp(0.0, 1.0);
        self.snapped = true;
        if p <= 0.0 || p >= 1.0 || (snapped - p).abs() < 1e-9 {
            return;
        }
        debug!("snap {:.3} -> {:.3}", p, snapped);
        self.target = snapped;
        self.scroll_request = Some(self.state.scroll_for(snapped));
    }

    /// Progress the visuals should show, as of the last tick.
    pub fn displayed(&self) -> f64 {
        self.displayed
    }

    /// Progress the visuals are heading to.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Whether the region has ever been entered.
    pub fn entered(&self) -> bool {
        self.entered
    }

    /// A pending snap scroll request, if any.
    pub fn take_scroll_request(&mut self) -> Option<f64> {
        self.scroll_request.take()
    }

    /// Placement of the trigger element, if pinning is enabled and the
    /// region is measured.
    pub fn pin_placement(&self) -> Option<PinPlacement> {
        if !self.config.pin || !self.measured {
            return None;
        }
        let rect = self.element?;
        let s = &self.state;
        let spacer = (s.trigger_end - s.trigger_start).max(0.0);
        let state = if s.raw_scroll_y < s.trigger_start {
            PinState::Before
        } else if s.raw_scroll_y <= s.trigger_end {
            PinState::Pinned {
                fixed_top: rect.y - s.trigger_start,
            }
        } else {
            PinState::After { offset: spacer }
        };
        Some(PinPlacement { state, spacer })
    }
}

/// Exponential approach with time constant `lag / 4`: after `lag` seconds
/// less than 2% of the gap remains.
fn smooth(current: f64, target: f64, dt: f64, lag: f64) -> f64 {
    if lag <= 0.0 {
        return target;
    }
    let k = 1.0 - (-dt * 4.0 / lag).exp();
    let next = current + (target - current) * k;
    if (target - next).abs() < 1e-4 {
        target
    } else {
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;

    const SECTION: ElementRef = ElementRef(1);
    const TRACK: ElementRef = ElementRef(2);

    struct TestLayout {
        viewport: Cell<Viewport>,
        rects: HashMap<ElementRef, Rect>,
    }

    impl TestLayout {
        fn new(viewport: Viewport) -> Self {
            Self {
                viewport: Cell::new(viewport),
                rects: HashMap::new(),
            }
        }

        fn with(mut self, el: ElementRef, rect: Rect) -> Self {
            self.rects.insert(el, rect);
            self
        }
    }

    impl Layout for TestLayout {
        fn viewport(&self) -> Viewport {
            self.viewport.get()
        }

        fn element_rect(&self, element: ElementRef) -> Option<Rect> {
            self.rects.get(&element).copied()
        }
    }

    fn hero_layout() -> TestLayout {
        TestLayout::new(Viewport::new(1000.0, 800.0))
            .with(SECTION, Rect::new(0.0, 200.0, 1000.0, 800.0))
    }

    #[test]
    fn parse_trigger_expressions() {
        assert_eq!(TriggerPos::parse("top top"), Ok(TriggerPos::TOP_TOP));
        assert_eq!(
            TriggerPos::parse("top 80%"),
            Ok(TriggerPos::Meet {
                element: Edge::Start,
                viewport: Edge::Percent(80.0)
            })
        );
        assert_eq!(TriggerPos::parse("left right"), Ok(TriggerPos::TOP_BOTTOM));
        assert_eq!(
            TriggerPos::parse("center 120px"),
            Ok(TriggerPos::Meet {
                element: Edge::Center,
                viewport: Edge::Pixels(120.0)
            })
        );
        assert_eq!(
            TriggerPos::parse("+=500%"),
            Ok(TriggerPos::PastStart(Distance::ViewportPercent(500.0)))
        );
        assert_eq!(
            TriggerPos::parse("+=1200"),
            Ok(TriggerPos::PastStart(Distance::Pixels(1200.0)))
        );
        assert_eq!(
            TriggerPos::parse("+=width(#2)"),
            Ok(TriggerPos::PastStart(Distance::ElementWidth(TRACK)))
        );
        assert!(TriggerPos::parse("top").is_err());
        assert!(TriggerPos::parse("top top top").is_err());
        assert!(TriggerPos::parse("middle top").is_err());
        assert!(TriggerPos::parse("+=lots").is_err());
    }

    #[test]
    fn trigger_expressions_serialize_as_strings() {
        let cfg: ScrollTriggerConfig = serde_json::from_str(
            r#"{ "trigger": 1, "pin": true, "end": "+=500%", "scrub": 1.2 }"#,
        )
        .unwrap();
        assert!(cfg.pin);
        assert_eq!(cfg.start, None);
        assert_eq!(cfg.end, Some(TriggerPos::PastStart(Distance::ViewportPercent(500.0))));
        assert_eq!(cfg.scrub, Scrub::Lag(1.2));
        assert_eq!(serde_json::to_string(&TriggerPos::BOTTOM_TOP).unwrap(), r#""bottom top""#);
    }

    #[test]
    fn scrub_accepts_bool_or_seconds() {
        assert_eq!(serde_json::from_str::<Scrub>("false").unwrap(), Scrub::Off);
        assert_eq!(serde_json::from_str::<Scrub>("true").unwrap(), Scrub::Immediate);
        assert_eq!(serde_json::from_str::<Scrub>("1").unwrap(), Scrub::Lag(1.0));
        assert_eq!(serde_json::from_str::<Scrub>("0").unwrap(), Scrub::Immediate);
    }

    #[test]
    fn progress_formula() {
        assert_eq!(progress_for(100.0, 200.0, 600.0), 0.0);
        assert_eq!(progress_for(400.0, 200.0, 600.0), 0.5);
        assert_eq!(progress_for(900.0, 200.0, 600.0), 1.0);
    }

    #[test]
    fn degenerate_region_is_complete() {
        for y in [-100.0, 0.0, 200.0, 1e9] {
            assert_eq!(progress_for(y, 200.0, 200.0), 1.0);
            assert_eq!(progress_for(y, 300.0, 200.0), 1.0);
        }
        assert!(ScrollProgressState::new(0.0, 5.0, 5.0).is_degenerate());
    }

    #[test]
    fn zero_height_trigger_never_divides_by_zero() {
        let layout = TestLayout::new(Viewport::new(1000.0, 800.0))
            .with(SECTION, Rect::new(0.0, 500.0, 1000.0, 0.0));
        let cfg = ScrollTriggerConfig::new(SECTION)
            .start(TriggerPos::TOP_TOP)
            .end(TriggerPos::BOTTOM_TOP);
        let mut d = ScrollDriver::new(cfg);
        assert!(d.measure(&layout));
        for y in [0.0, 500.0, 1000.0] {
            d.on_scroll(y);
            let p = d.tick(y);
            assert_eq!(p, 1.0);
            assert!(!p.is_nan());
        }
    }

    #[test]
    fn pinned_region_spans_extra_distance() {
        let layout = hero_layout();
        let cfg = ScrollTriggerConfig::new(SECTION)
            .pinned()
            .end(TriggerPos::parse("+=500%").unwrap());
        let mut d = ScrollDriver::new(cfg);
        assert!(d.measure(&layout));
        assert_eq!(d.state().trigger_start, 200.0);
        assert_eq!(d.state().trigger_end, 200.0 + 4000.0);

        d.on_scroll(2200.0);
        assert_eq!(d.tick(0.0), 0.5);
    }

    #[test]
    fn unpinned_default_region() {
        let layout = hero_layout();
        let mut d = ScrollDriver::new(ScrollTriggerConfig::new(SECTION));
        assert!(d.measure(&layout));
        // "top bottom" → "bottom top"
        assert_eq!(d.state().trigger_start, 200.0 - 800.0);
        assert_eq!(d.state().trigger_end, 1000.0);
    }

    #[test]
    fn missing_trigger_is_a_no_op() {
        let layout = TestLayout::new(Viewport::new(1000.0, 800.0));
        let mut d = ScrollDriver::new(ScrollTriggerConfig::new(SECTION));
        assert!(!d.measure(&layout));
        d.on_scroll(500.0);
        assert_eq!(d.tick(0.0), 0.0);
        assert!(d.pin_placement().is_none());
    }

    #[test]
    fn width_distance_needs_its_element() {
        let layout = hero_layout();
        let cfg = ScrollTriggerConfig::new(SECTION)
            .pinned()
            .end(TriggerPos::PastStart(Distance::ElementWidth(TRACK)));
        let mut d = ScrollDriver::new(cfg.clone());
        assert!(!d.measure(&layout));

        let layout = hero_layout().with(TRACK, Rect::new(0.0, 200.0, 4000.0, 800.0));
        let mut d = ScrollDriver::new(cfg);
        assert!(d.measure(&layout));
        assert_eq!(d.state().trigger_end, 4200.0);
    }

    #[test]
    fn resize_recomputes_region_from_scratch() {
        let layout = hero_layout();
        let cfg = ScrollTriggerConfig::new(SECTION)
            .pinned()
            .end(TriggerPos::parse("+=100%").unwrap());
        let mut d = ScrollDriver::new(cfg);
        d.measure(&layout);
        d.on_scroll(600.0);
        assert_eq!(d.tick(0.0), 0.5);

        layout.viewport.set(Viewport::new(500.0, 400.0));
        assert!(d.on_resize(&layout));
        assert_eq!(d.state().trigger_end, 600.0);
        assert_eq!(d.target(), 1.0);
        assert_eq!(d.tick(0.016), 1.0);
    }

    #[test]
    fn scroll_events_between_frames_coalesce() {
        let layout = hero_layout();
        let cfg = ScrollTriggerConfig::new(SECTION)
            .pinned()
            .end(TriggerPos::PastStart(Distance::Pixels(1000.0)));
        let mut d = ScrollDriver::new(cfg);
        d.measure(&layout);
        d.on_scroll(300.0);
        d.on_scroll(900.0);
        d.on_scroll(700.0);
        assert_eq!(d.displayed(), 0.0);
        assert_eq!(d.tick(0.0), 0.5);
    }

    #[test]
    fn lagged_scrub_converges() {
        let layout = hero_layout();
        let cfg = ScrollTriggerConfig::new(SECTION)
            .pinned()
            .end(TriggerPos::PastStart(Distance::Pixels(1000.0)))
            .scrub(Scrub::Lag(1.0));
        let mut d = ScrollDriver::new(cfg);
        d.measure(&layout);
        d.tick(0.0);
        d.on_scroll(1200.0);
        let first = d.tick(0.1);
        assert!(first > 0.0 && first < 1.0);
        let mut prev = first;
        let mut t = 0.1;
        while t < 3.0 {
            t += 1.0 / 60.0;
            let p = d.tick(t);
            assert!(p >= prev);
            prev = p;
        }
        assert_eq!(prev, 1.0);
    }

    #[test]
    fn smoothing_leaves_under_two_percent_after_lag() {
        let v = smooth(0.0, 1.0, 1.0, 1.0);
        assert!(v > 0.98 && v < 1.0);
        assert_eq!(smooth(0.3, 0.7, 0.5, 0.0), 0.7);
    }

    #[test]
    fn unscrubbed_trigger_fires_once() {
        let layout = hero_layout();
        let cfg = ScrollTriggerConfig::new(SECTION)
            .start(TriggerPos::parse("top 80%").unwrap())
            .scrub(Scrub::Off);
        let mut d = ScrollDriver::new(cfg);
        d.measure(&layout);
        // start = 200 - 640
        d.on_scroll(-500.0);
        assert_eq!(d.tick(0.0), 0.0);
        assert!(!d.entered());
        d.on_scroll(0.0);
        assert_eq!(d.tick(0.1), 1.0);
        d.on_scroll(-1000.0);
        assert_eq!(d.tick(0.2), 1.0);
        assert!(d.entered());
    }

    #[test]
    fn snap_after_scroll_settles() {
        let layout = hero_layout();
        let cfg = ScrollTriggerConfig::new(SECTION)
            .pinned()
            .end(TriggerPos::PastStart(Distance::Pixels(3000.0)))
            .snap(1.0 / 3.0);
        let mut d = ScrollDriver::new(cfg).with_snap_delay(0.1);
        d.measure(&layout);
        // progress 0.3 → nearest third is 1/3
        d.on_scroll(200.0 + 900.0);
        assert!((d.tick(1.0) - 0.3).abs() < 1e-9);
        assert!((d.tick(1.05) - 0.3).abs() < 1e-9);
        assert!(d.take_scroll_request().is_none());

        let p = d.tick(1.2);
        assert!((p - 1.0 / 3.0).abs() < 1e-9);
        let y = d.take_scroll_request().unwrap();
        assert!((y - 1200.0).abs() < 1e-6);
        assert!(d.take_scroll_request().is_none());

        // The host honours the request; nothing further to snap.
        d.on_scroll(y);
        d.tick(1.3);
        d.tick(1.5);
        assert!(d.take_scroll_request().is_none());
    }

    #[test]
    fn snap_survives_a_resize() {
        let layout = hero_layout();
        let cfg = ScrollTriggerConfig::new(SECTION)
            .pinned()
            .end(TriggerPos::PastStart(Distance::Pixels(3000.0)))
            .snap(1.0 / 3.0);
        let mut d = ScrollDriver::new(cfg).with_snap_delay(0.1);
        d.measure(&layout);
        d.on_scroll(200.0 + 900.0);
        d.tick(1.0);
        assert!((d.tick(1.2) - 1.0 / 3.0).abs() < 1e-9);

        // The window resizes before the host honours the scroll request.
        layout.viewport.set(Viewport::new(500.0, 400.0));
        assert!(d.on_resize(&layout));
        assert!(d.take_scroll_request().is_none());

        let p = d.tick(1.25);
        assert!((p - 1.0 / 3.0).abs() < 1e-9);
        let y = d.take_scroll_request().unwrap();
        assert!((y - 1200.0).abs() < 1e-6);
    }

    #[test]
    fn pin_placement_follows_scroll() {
        let layout = hero_layout();
        let cfg = ScrollTriggerConfig::new(SECTION)
            .pinned()
            .end(TriggerPos::PastStart(Distance::Pixels(1000.0)));
        let mut d = ScrollDriver::new(cfg);
        d.measure(&layout);

        d.on_scroll(100.0);
        let p = d.pin_placement().unwrap();
        assert_eq!(p.state, PinState::Before);
        assert_eq!(p.spacer, 1000.0);

        d.on_scroll(700.0);
        assert_eq!(d.pin_placement().unwrap().state, PinState::Pinned { fixed_top: 0.0 });

        d.on_scroll(1500.0);
        assert_eq!(
            d.pin_placement().unwrap().state,
            PinState::After { offset: 1000.0 }
        );
    }

    #[test]
    fn unpinned_sections_have_no_placement() {
        let layout = hero_layout();
        let mut d = ScrollDriver::new(ScrollTriggerConfig::new(SECTION));
        d.measure(&layout);
        assert!(d.pin_placement().is_none());
    }

    #[test]
    fn container_progress_edges() {
        // element left edge at viewport right
        assert_eq!(container_progress(1000.0, 1000.0, 1000.0, 0.0), 0.0);
        // element right edge at viewport left
        assert_eq!(container_progress(1000.0, 1000.0, 1000.0, -2000.0), 1.0);
        assert_eq!(container_progress(1000.0, 1000.0, 1000.0, -1000.0), 0.5);
        assert_eq!(container_progress(0.0, 0.0, 0.0, 0.0), 1.0);
    }
}
