//! One scroll-driven section of the page.
//!
//! A [`ScrollSection`] bundles what a mounted section owns: its
//! [`Timeline`], the [`ScrollDriver`] feeding it, the [`RenderBinder`]
//! writing it and the listener handles it registered.  Everything it
//! registers on [`mount`](ScrollSection::mount) is released on
//! [`unmount`](ScrollSection::unmount).
//!
//! Two optional riders hang off a section:
//!
//! * [`ContainerTween`]s animate an element by its position inside a track
//!   the section translates horizontally (card parallax).
//! * [`Counter`]s start once section progress reaches a threshold.
//!
//! [`TimedSection`] is the time-driven sibling: an entrance timeline played
//! once on wall-clock time after mount.

use crate::binder::{RenderBinder, Transform};
use crate::counter::Counter;
use crate::event::{ElementRef, ListenerKind};
use crate::listeners::{ListenerRegistry, Subscriptions};
use crate::property::Property;
use crate::scroll::{container_progress, PinPlacement, ScrollDriver, ScrollTriggerConfig};
use crate::timeline::{Playback, Timeline};
use crate::traits::{Layout, Surface};
use log::{debug, info};

const SECTION_LISTENERS: [ListenerKind; 3] =
    [ListenerKind::Scroll, ListenerKind::Resize, ListenerKind::Frame];

/// Geometry a container tween needs, refreshed on mount and resize.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ContainerGeometry {
    viewport_width: f64,
    track_width: f64,
    element_x: f64,
    element_width: f64,
}

/// A timeline driven by an element's position inside a horizontally
/// translated track instead of by document scroll.
#[derive(Debug, Clone)]
pub struct ContainerTween {
    track: ElementRef,
    element: ElementRef,
    timeline: Timeline,
    geometry: Option<ContainerGeometry>,
}

impl ContainerTween {
    /// `element` rides inside `track`; `timeline` runs from the element's
    /// left edge entering the viewport on the right to its right edge
    /// leaving on the left.
    pub fn new(track: ElementRef, element: ElementRef, timeline: Timeline) -> Self {
        Self {
            track,
            element,
            timeline,
            geometry: None,
        }
    }

    fn measure<L: Layout + ?Sized>(&mut self, layout: &L) {
        self.geometry = match (layout.element_rect(self.track), layout.element_rect(self.element)) {
            (Some(track), Some(el)) => Some(ContainerGeometry {
                viewport_width: layout.viewport().width,
                track_width: track.width,
                element_x: el.x,
                element_width: el.width,
            }),
            _ => {
                debug!("container tween on {} has a missing element", self.element);
                None
            }
        };
    }

    /// Progress for a track translated by `x_percent` of its width plus
    /// `x` pixels.
    fn progress(&self, x_percent: f64, x: f64) -> Option<f64> {
        let g = self.geometry?;
        let track_x = x_percent / 100.0 * g.track_width + x;
        Some(container_progress(g.viewport_width, g.element_x, g.element_width, track_x))
    }
}

/// A counter and the section progress at which it starts.
#[derive(Debug, Clone)]
struct GatedCounter {
    counter: Counter,
    start_at: f64,
    /// Whether the counter's element was laid out at mount.
    present: bool,
}

/// A timeline bound to a scroll trigger.
pub struct ScrollSection {
    name: String,
    timeline: Timeline,
    driver: ScrollDriver,
    binder: RenderBinder,
    bases: Vec<(ElementRef, Transform)>,
    tweens: Vec<ContainerTween>,
    counters: Vec<GatedCounter>,
    subscriptions: Subscriptions,
    mounted: bool,
    last_pin: Option<PinPlacement>,
}

impl ScrollSection {
    pub fn new(name: impl Into<String>, timeline: Timeline, trigger: ScrollTriggerConfig) -> Self {
        Self {
            name: name.into(),
            timeline,
            driver: ScrollDriver::new(trigger),
            binder: RenderBinder::new(),
            bases: Vec::new(),
            tweens: Vec::new(),
            counters: Vec::new(),
            subscriptions: Subscriptions::new(),
            mounted: false,
            last_pin: None,
        }
    }

    /// Static transform of `target`, e.g. a tilted product shot.
    pub fn with_base(mut self, target: ElementRef, base: Transform) -> Self {
        self.bases.push((target, base));
        self
    }

    /// Animate an element by its position inside a track this section
    /// translates.
    pub fn with_container_tween(mut self, tween: ContainerTween) -> Self {
        self.tweens.push(tween);
        self
    }

    /// Start `counter` once section progress reaches `start_at`.
    pub fn with_counter(mut self, counter: Counter, start_at: f64) -> Self {
        self.counters.push(GatedCounter {
            counter,
            start_at,
            present: false,
        });
        self
    }

    /// Quiet period, in seconds, before the playhead snaps.
    pub fn with_snap_delay(mut self, seconds: f64) -> Self {
        self.driver = self.driver.with_snap_delay(seconds);
        self
    }

    /// Owner name of the section's listener handles.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// The scroll driver, for reading trigger geometry and progress.
    pub fn driver(&self) -> &ScrollDriver {
        &self.driver
    }

    /// The scroll-driven timeline.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Progress shown as of the last frame.
    pub fn progress(&self) -> f64 {
        self.driver.displayed()
    }

    /// Measure the trigger and take listener handles.
    ///
    /// Returns `false` without registering anything when the trigger element
    /// is missing; the section then stays inert.  Animated elements the
    /// layout does not know are skipped: they get no hints and no writes.
    pub fn mount<L, S>(&mut self, registry: &mut ListenerRegistry, layout: &L, surface: &mut S) -> bool
    where
        L: Layout + ?Sized,
        S: Surface + ?Sized,
    {
        if self.mounted {
            return true;
        }
        if !self.driver.measure(layout) {
            debug!("section {}: trigger missing, not mounting", self.name);
            return false;
        }
        for tween in &mut self.tweens {
            tween.measure(layout);
        }

        let mut targets = self.timeline.targets();
        targets.extend(self.tweens.iter().flat_map(|t| t.timeline.targets()));
        let (targets, absent): (Vec<_>, Vec<_>) = targets
            .into_iter()
            .partition(|&t| layout.element_rect(t).is_some());
        if !absent.is_empty() {
            debug!("section {}: skipping absent targets {:?}", self.name, absent);
        }
        self.binder.set_absent(absent);
        self.binder.attach(surface, &targets);
        for gated in &mut self.counters {
            gated.present = layout.element_rect(gated.counter.target()).is_some();
        }
        for &(target, base) in &self.bases {
            self.binder.set_base(target, base);
        }

        self.subscriptions = Subscriptions::subscribe(registry, &self.name, &SECTION_LISTENERS);
        self.mounted = true;
        info!(
            "section {} mounted: {} segments over {} targets",
            self.name,
            self.timeline.segments().len(),
            targets.len()
        );
        true
    }

    pub fn on_scroll(&mut self, y: f64) {
        if self.mounted {
            self.driver.on_scroll(y);
        }
    }

    /// Re-measure synchronously so the next progress read sees the new
    /// geometry.
    pub fn on_resize<L: Layout + ?Sized>(&mut self, layout: &L) {
        if !self.mounted {
            return;
        }
        if !self.driver.on_resize(layout) {
            debug!("section {}: trigger vanished on resize", self.name);
        }
        for tween in &mut self.tweens {
            tween.measure(layout);
        }
    }

    /// Advance progress to `now` and stage every resolved value.  Nothing is
    /// written until [`flush`](Self::flush).
    pub fn resolve(&mut self, now: f64) {
        if !self.mounted {
            return;
        }
        let progress = self.driver.tick(now);
        let frame = self.timeline.resolve(progress);
        self.binder.stage(&frame);

        for tween in &self.tweens {
            let x_percent = frame.number(tween.track, Property::XPercent).unwrap_or(0.0);
            let x = frame.number(tween.track, Property::TranslateX).unwrap_or(0.0);
            if let Some(p) = tween.progress(x_percent, x) {
                self.binder.stage(&tween.timeline.resolve(p));
            }
        }

        if self.driver.entered() {
            for gated in &mut self.counters {
                if progress >= gated.start_at {
                    gated.counter.start(now);
                }
            }
        }
    }

    /// Write everything staged by [`resolve`](Self::resolve).
    pub fn flush<S: Surface + ?Sized>(&mut self, surface: &mut S, now: f64) {
        if !self.mounted {
            return;
        }
        self.binder.flush(surface);

        let pin = self.driver.pin_placement();
        if pin != self.last_pin {
            if let Some(placement) = &pin {
                surface.place_pinned(self.driver.config().trigger, placement);
            }
            self.last_pin = pin;
        }
        if let Some(y) = self.driver.take_scroll_request() {
            surface.request_scroll(y);
        }
        for gated in self.counters.iter_mut().filter(|g| g.present) {
            gated.counter.render(surface, now);
        }
    }

    /// Clear every override, release the pin, drop compositing hints and
    /// release every listener handle.
    pub fn unmount<S: Surface + ?Sized>(&mut self, registry: &mut ListenerRegistry, surface: &mut S) {
        if !self.mounted {
            return;
        }
        let trigger = self.driver.config().trigger;
        let pinned = self.last_pin.is_some();
        let cleared = self.binder.wrote(trigger);
        self.binder.detach(surface);
        if pinned && !cleared {
            surface.clear_style(trigger);
        }
        self.subscriptions.release_all(registry);
        for gated in &mut self.counters {
            gated.counter.reset_shown();
        }
        self.last_pin = None;
        self.mounted = false;
        info!("section {} unmounted", self.name);
    }
}

/// A timeline played on wall-clock time, starting with the first frame
/// after mount.
pub struct TimedSection {
    name: String,
    timeline: Timeline,
    playback: Playback,
    binder: RenderBinder,
    subscriptions: Subscriptions,
    mounted: bool,
}

impl TimedSection {
    /// `duration` and `delay` are in seconds.
    pub fn new(name: impl Into<String>, timeline: Timeline, delay: f64, duration: f64) -> Self {
        Self {
            name: name.into(),
            timeline,
            playback: Playback::new(delay, duration),
            binder: RenderBinder::new(),
            subscriptions: Subscriptions::new(),
            mounted: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn mount<L, S>(&mut self, registry: &mut ListenerRegistry, layout: &L, surface: &mut S) -> bool
    where
        L: Layout + ?Sized,
        S: Surface + ?Sized,
    {
        if self.mounted {
            return true;
        }
        let targets = self.timeline.targets();
        if targets.iter().any(|&t| layout.element_rect(t).is_none()) {
            debug!("timed section {}: target missing, not mounting", self.name);
            return false;
        }
        self.binder.attach(surface, &targets);
        self.subscriptions = Subscriptions::subscribe(registry, &self.name, &[ListenerKind::Frame]);
        self.mounted = true;
        true
    }

    pub fn resolve(&mut self, now: f64) {
        if !self.mounted {
            return;
        }
        if !self.playback.is_started() {
            self.playback.start(now);
        }
        let frame = self.timeline.resolve(self.playback.progress(now));
        self.binder.stage(&frame);
    }

    pub fn flush<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        if self.mounted {
            self.binder.flush(surface);
        }
    }

    pub fn is_complete(&self, now: f64) -> bool {
        self.playback.is_complete(now)
    }

    pub fn unmount<S: Surface + ?Sized>(&mut self, registry: &mut ListenerRegistry, surface: &mut S) {
        if !self.mounted {
            return;
        }
        self.binder.detach(surface);
        self.subscriptions.release_all(registry);
        self.mounted = false;
    }
}
