//! The timeline engine: segments on a normalized `0..1` master axis.
//!
//! A [`Timeline`] is an ordered list of [`Segment`]s.  Each segment owns a
//! local window `[start, start + duration]` of the master axis, an
//! [`Easing`], and one or more [`PropertyChange`]s.  Resolving the timeline
//! for a progress value is a pure function of that value: scrubbing back and
//! forth always reproduces the same output, with no path-dependent drift.
//!
//! # Channels
//!
//! Every `(target, property)` pair is a *channel*.  Segments on the same
//! channel are expected not to overlap.  When they do, the last registered
//! segment that has started wins; overlapping pairs are logged when the
//! segment is pushed.  Before any segment on a channel has started, the
//! channel shows the `from` value of its earliest-starting segment.

use crate::easing::Easing;
use crate::event::ElementRef;
use crate::property::{Property, PropertyChange, Value, ValueKindMismatch};
use log::debug;
use std::collections::HashMap;

/// Errors produced while building a timeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimelineError {
    #[error("segment duration must be in (0, 1], got {0}")]
    InvalidDuration(f64),
    #[error("segment start must be in [0, 1], got {0}")]
    InvalidStart(f64),
    #[error("segment has no property changes")]
    NoChanges,
    #[error("timeline has zero length")]
    ZeroLength,
    #[error("invalid position {0:?}")]
    InvalidPosition(String),
    #[error(transparent)]
    ValueKind(#[from] ValueKindMismatch),
}

/// One animated window of the master axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    start: f64,
    duration: f64,
    changes: Vec<PropertyChange>,
    easing: Easing,
}

impl Segment {
    pub fn new(
        start: f64,
        duration: f64,
        changes: Vec<PropertyChange>,
        easing: Easing,
    ) -> Result<Self, TimelineError> {
        if !(duration.is_finite() && duration > 0.0 && duration <= 1.0) {
            return Err(TimelineError::InvalidDuration(duration));
        }
        if !(start.is_finite() && (0.0..=1.0).contains(&start)) {
            return Err(TimelineError::InvalidStart(start));
        }
        if changes.is_empty() {
            return Err(TimelineError::NoChanges);
        }
        Ok(Self {
            start,
            duration,
            changes,
            easing,
        })
    }

    /// Offset on the master axis, in `0..=1`.
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Length on the master axis, in `(0, 1]`.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    pub fn changes(&self) -> &[PropertyChange] {
        &self.changes
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    /// `clamp((progress - start) / duration, 0, 1)`.
    pub fn local_progress(&self, progress: f64) -> f64 {
        ((progress - self.start) / self.duration).clamp(0.0, 1.0)
    }

    pub fn eased(&self, progress: f64) -> f64 {
        self.easing.apply(self.local_progress(progress))
    }

    fn overlaps(&self, other: &Segment) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

/// Where a change lives: `(segment index, change index)`.
type Slot = (usize, usize);

#[derive(Debug, Clone)]
struct Channel {
    target: ElementRef,
    property: Property,
    /// In registration order.
    slots: Vec<Slot>,
}

/// One resolved channel value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedValue {
    pub target: ElementRef,
    pub property: Property,
    pub value: Value,
}

/// Every channel value of a timeline at one progress.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedFrame {
    pub progress: f64,
    pub values: Vec<ResolvedValue>,
}

impl ResolvedFrame {
    pub fn get(&self, target: ElementRef, property: Property) -> Option<Value> {
        self.values
            .iter()
            .find(|v| v.target == target && v.property == property)
            .map(|v| v.value)
    }

    pub fn number(&self, target: ElementRef, property: Property) -> Option<f64> {
        self.get(target, property).and_then(|v| v.as_number())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An ordered list of segments over the normalized master axis.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    segments: Vec<Segment>,
    channels: Vec<Channel>,
    index: HashMap<(ElementRef, Property), usize>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment.  Registration order is the tie-break for equal
    /// starts and the winner for overlapping segments on one channel.
    pub fn push(&mut self, segment: Segment) {
        let seg_idx = self.segments.len();
        for (change_idx, change) in segment.changes.iter().enumerate() {
            let key = (change.target, change.property);
            let ch_idx = match self.index.get(&key) {
                Some(&i) => i,
                None => {
                    self.channels.push(Channel {
                        target: change.target,
                        property: change.property,
                        slots: Vec::new(),
                    });
                    self.index.insert(key, self.channels.len() - 1);
                    self.channels.len() - 1
                }
            };
            let channel = &mut self.channels[ch_idx];
            for &(other, _) in &channel.slots {
                let prev = &self.segments[other];
                if prev.overlaps(&segment) {
                    debug!(
                        "overlapping segments on {} {}: [{:.3}, {:.3}] and [{:.3}, {:.3}], last registered wins",
                        change.target,
                        change.property,
                        prev.start,
                        prev.end(),
                        segment.start,
                        segment.end()
                    );
                }
            }
            channel.slots.push((seg_idx, change_idx));
        }
        self.segments.push(segment);
    }

    /// Build and append a segment in one step.
    pub fn add(
        &mut self,
        start: f64,
        duration: f64,
        changes: Vec<PropertyChange>,
        easing: Easing,
    ) -> Result<(), TimelineError> {
        self.push(Segment::new(start, duration, changes, easing)?);
        Ok(())
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Every element this timeline writes to, in first-use order.
    pub fn targets(&self) -> Vec<ElementRef> {
        let mut out: Vec<ElementRef> = Vec::new();
        for ch in &self.channels {
            if !out.contains(&ch.target) {
                out.push(ch.target);
            }
        }
        out
    }

    /// Resolve every channel at `progress` (clamped to `[0, 1]`).
    pub fn resolve(&self, progress: f64) -> ResolvedFrame {
        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        let values = self
            .channels
            .iter()
            .filter_map(|ch| {
                self.resolve_channel(ch, progress).map(|value| ResolvedValue {
                    target: ch.target,
                    property: ch.property,
                    value,
                })
            })
            .collect();
        ResolvedFrame { progress, values }
    }

    fn resolve_channel(&self, ch: &Channel, progress: f64) -> Option<Value> {
        let governing = ch
            .slots
            .iter()
            .rev()
            .find(|(s, _)| self.segments[*s].start <= progress);
        match governing {
            Some(&(s, c)) => {
                let seg = &self.segments[s];
                Some(seg.changes[c].value_at(seg.eased(progress)))
            }
            None => {
                // Nothing started yet: the earliest segment's `from`.  `min_by`
                // keeps the first of equal starts, i.e. registration order.
                let &(s, c) = ch.slots.iter().min_by(|a, b| {
                    self.segments[a.0]
                        .start
                        .total_cmp(&self.segments[b.0].start)
                })?;
                Some(self.segments[s].changes[c].from)
            }
        }
    }
}

//  Builder

/// Placement of a new segment relative to the ones already added.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    /// Absolute start.
    At(f64),
    /// Right after the previous segment ends.
    AfterPrevious,
    /// Together with the previous segment (`"<"`).
    WithPrevious,
    /// Offset from the end of the previous segment (`"+=0.5"`, `"-=0.3"`).
    Relative(f64),
}

impl Position {
    /// Parse `"0.12"`, `"<"`, `"+=0.5"` or `"-=0.3"`.
    pub fn parse(s: &str) -> Result<Position, TimelineError> {
        let s = s.trim();
        let bad = || TimelineError::InvalidPosition(s.to_string());
        if s == "<" {
            return Ok(Position::WithPrevious);
        }
        if let Some(rest) = s.strip_prefix("+=") {
            return rest.trim().parse().map(Position::Relative).map_err(|_| bad());
        }
        if let Some(rest) = s.strip_prefix("-=") {
            return rest
                .trim()
                .parse::<f64>()
                .map(|d| Position::Relative(-d))
                .map_err(|_| bad());
        }
        s.parse().map(Position::At).map_err(|_| bad())
    }
}

#[derive(Debug, Clone)]
struct Pending {
    start: f64,
    duration: f64,
    changes: Vec<PropertyChange>,
    easing: Easing,
}

/// Places segments in arbitrary units and normalizes them onto `0..1`.
///
/// ```ignore
/// let mut b = TimelineBuilder::new();
/// b.add(vec![fade_in], 0.8, Easing::parse("power3.out").unwrap(), Position::At(0.0))?;
/// b.add(vec![slide_up], 0.6, Easing::parse("power2.out").unwrap(), Position::parse("-=0.3")?)?;
/// let tl = b.build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct TimelineBuilder {
    pending: Vec<Pending>,
    min_length: f64,
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the master axis to be at least `length` units long, so a
    /// timeline whose last segment ends early still leaves a tail.
    pub fn with_length(mut self, length: f64) -> Self {
        self.min_length = length;
        self
    }

    pub fn add(
        &mut self,
        changes: Vec<PropertyChange>,
        duration: f64,
        easing: Easing,
        position: Position,
    ) -> Result<&mut Self, TimelineError> {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(TimelineError::InvalidDuration(duration));
        }
        if changes.is_empty() {
            return Err(TimelineError::NoChanges);
        }
        let prev = self.pending.last();
        let prev_end = prev.map(|p| p.start + p.duration).unwrap_or(0.0);
        let start = match position {
            Position::At(t) => t,
            Position::AfterPrevious => prev_end,
            Position::WithPrevious => prev.map(|p| p.start).unwrap_or(0.0),
            Position::Relative(dt) => prev_end + dt,
        };
        if !start.is_finite() {
            return Err(TimelineError::InvalidStart(start));
        }
        self.pending.push(Pending {
            start: start.max(0.0),
            duration,
            changes,
            easing,
        });
        Ok(self)
    }

    /// Total length in builder units.
    pub fn length(&self) -> f64 {
        self.pending
            .iter()
            .map(|p| p.start + p.duration)
            .fold(self.min_length, f64::max)
    }

    pub fn build(self) -> Result<Timeline, TimelineError> {
        let total = self.length();
        if total <= 0.0 {
            return Err(TimelineError::ZeroLength);
        }
        let mut tl = Timeline::new();
        for p in self.pending {
            tl.add(p.start / total, p.duration / total, p.changes, p.easing)?;
        }
        Ok(tl)
    }
}

//  Time-driven playback

/// Maps wall-clock time onto progress for timelines played on time instead
/// of scroll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Playback {
    delay: f64,
    duration: f64,
    started_at: Option<f64>,
}

impl Playback {
    pub fn new(delay: f64, duration: f64) -> Self {
        Self {
            delay: delay.max(0.0),
            duration,
            started_at: None,
        }
    }

    /// Seconds between start and the first animated frame.
    pub fn delay(&self) -> f64 {
        self.delay
    }

    /// Seconds the timeline takes once the delay has passed.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Start (or restart) at wall-clock `now`.
    pub fn start(&mut self, now: f64) {
        self.started_at = Some(now);
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn progress(&self, now: f64) -> f64 {
        let Some(start) = self.started_at else {
            return 0.0;
        };
        if self.duration <= 0.0 {
            return if now - start >= self.delay { 1.0 } else { 0.0 };
        }
        ((now - start - self.delay) / self.duration).clamp(0.0, 1.0)
    }

    pub fn is_complete(&self, now: f64) -> bool {
        self.is_started() && self.progress(now) >= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::EaseDir;
    use crate::property::ClipInset;

    const A: ElementRef = ElementRef(1);
    const B: ElementRef = ElementRef(2);

    fn change(target: ElementRef, property: Property, from: f64, to: f64) -> PropertyChange {
        PropertyChange::new(target, property, from, to).unwrap()
    }

    fn single(easing: Easing) -> Timeline {
        let mut tl = Timeline::new();
        tl.add(0.4, 0.4, vec![change(A, Property::Opacity, 0.0, 1.0)], easing)
            .unwrap();
        tl
    }

    #[test]
    fn before_inside_and_after_a_segment() {
        let easing = Easing::power(2, EaseDir::InOut);
        let tl = single(easing);
        assert_eq!(tl.resolve(0.3).number(A, Property::Opacity), Some(0.0));
        let mid = tl.resolve(0.6).number(A, Property::Opacity).unwrap();
        assert!((mid - easing.apply(0.5)).abs() < 1e-12);
        assert_eq!(tl.resolve(0.9).number(A, Property::Opacity), Some(1.0));
    }

    #[test]
    fn resolving_twice_is_identical() {
        let tl = single(Easing::Elastic(EaseDir::Out));
        for i in 0..=100 {
            let p = i as f64 / 100.0;
            assert_eq!(tl.resolve(p), tl.resolve(p));
        }
    }

    #[test]
    fn scrubbing_has_no_hysteresis() {
        let mut tl = single(Easing::Sine(EaseDir::InOut));
        tl.add(0.0, 1.0, vec![change(B, Property::RotateZ, 0.0, 360.0)], Easing::Linear)
            .unwrap();
        let steps: Vec<f64> = (0..=50).map(|i| i as f64 / 50.0).collect();
        let forward: Vec<ResolvedFrame> = steps.iter().map(|&p| tl.resolve(p)).collect();
        let mut backward: Vec<ResolvedFrame> =
            steps.iter().rev().map(|&p| tl.resolve(p)).collect();
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn overshoot_is_clamped() {
        let mut tl = Timeline::new();
        tl.add(0.5, 0.8, vec![change(A, Property::TranslateY, 0.0, 100.0)], Easing::Linear)
            .unwrap();
        let v = tl.resolve(1.0).number(A, Property::TranslateY).unwrap();
        assert!((v - 62.5).abs() < 1e-9);
        assert_eq!(tl.resolve(2.0), tl.resolve(1.0));
        assert_eq!(tl.resolve(-1.0).number(A, Property::TranslateY), Some(0.0));
    }

    #[test]
    fn nan_progress_resolves_as_zero() {
        let tl = single(Easing::Linear);
        assert_eq!(tl.resolve(f64::NAN), tl.resolve(0.0));
    }

    #[test]
    fn sequential_segments_on_one_channel() {
        let mut tl = Timeline::new();
        tl.add(0.0, 0.2, vec![change(A, Property::Opacity, 0.0, 1.0)], Easing::Linear)
            .unwrap();
        tl.add(0.8, 0.2, vec![change(A, Property::Opacity, 1.0, 0.0)], Easing::Linear)
            .unwrap();
        assert_eq!(tl.resolve(0.1).number(A, Property::Opacity), Some(0.5));
        assert_eq!(tl.resolve(0.5).number(A, Property::Opacity), Some(1.0));
        assert_eq!(tl.resolve(0.9).number(A, Property::Opacity), Some(0.5));
        assert_eq!(tl.resolve(1.0).number(A, Property::Opacity), Some(0.0));
    }

    #[test]
    fn overlapping_segments_last_registered_wins() {
        let mut tl = Timeline::new();
        tl.add(0.0, 0.6, vec![change(A, Property::Scale, 1.0, 2.0)], Easing::Linear)
            .unwrap();
        tl.add(0.2, 0.6, vec![change(A, Property::Scale, 5.0, 6.0)], Easing::Linear)
            .unwrap();
        // Only the first has started.
        let early = tl.resolve(0.1).number(A, Property::Scale).unwrap();
        assert!((early - (1.0 + 0.1 / 0.6)).abs() < 1e-12);
        // Both active: the later registration governs.
        assert_eq!(tl.resolve(0.5).number(A, Property::Scale), Some(5.5));
    }

    #[test]
    fn registration_order_breaks_start_ties() {
        let mut tl = Timeline::new();
        tl.add(0.3, 0.2, vec![change(A, Property::TranslateX, 0.0, 10.0)], Easing::Linear)
            .unwrap();
        tl.add(0.3, 0.2, vec![change(A, Property::TranslateX, 100.0, 200.0)], Easing::Linear)
            .unwrap();
        // Not started: the first-registered `from`.
        assert_eq!(tl.resolve(0.1).number(A, Property::TranslateX), Some(0.0));
        // Started: the last registered governs.
        assert_eq!(tl.resolve(0.4).number(A, Property::TranslateX), Some(150.0));
    }

    #[test]
    fn unstarted_channel_shows_earliest_from() {
        let mut tl = Timeline::new();
        tl.add(0.6, 0.2, vec![change(A, Property::Opacity, 0.3, 0.0)], Easing::Linear)
            .unwrap();
        tl.add(0.2, 0.2, vec![change(A, Property::Opacity, 0.7, 1.0)], Easing::Linear)
            .unwrap();
        assert_eq!(tl.resolve(0.0).number(A, Property::Opacity), Some(0.7));
    }

    #[test]
    fn clip_channels_resolve() {
        let mut tl = Timeline::new();
        tl.add(
            0.0,
            1.0,
            vec![PropertyChange::new(A, Property::ClipPath, ClipInset::top_half(), ClipInset::NONE)
                .unwrap()],
            Easing::Linear,
        )
        .unwrap();
        assert_eq!(
            tl.resolve(0.5).get(A, Property::ClipPath),
            Some(Value::Clip(ClipInset::new(0.0, 0.0, 25.0, 0.0)))
        );
    }

    #[test]
    fn segment_validation() {
        let c = vec![change(A, Property::Opacity, 0.0, 1.0)];
        assert_eq!(
            Segment::new(0.0, 0.0, c.clone(), Easing::Linear),
            Err(TimelineError::InvalidDuration(0.0))
        );
        assert_eq!(
            Segment::new(0.0, 1.5, c.clone(), Easing::Linear),
            Err(TimelineError::InvalidDuration(1.5))
        );
        assert_eq!(
            Segment::new(-0.1, 0.5, c.clone(), Easing::Linear),
            Err(TimelineError::InvalidStart(-0.1))
        );
        assert_eq!(
            Segment::new(0.0, 0.5, vec![], Easing::Linear),
            Err(TimelineError::NoChanges)
        );
        assert!(Segment::new(1.0, 1.0, c, Easing::Linear).is_ok());
    }

    #[test]
    fn targets_in_first_use_order() {
        let mut tl = Timeline::new();
        tl.add(
            0.0,
            0.5,
            vec![change(B, Property::Opacity, 0.0, 1.0), change(A, Property::Scale, 1.0, 2.0)],
            Easing::Linear,
        )
        .unwrap();
        tl.add(0.5, 0.5, vec![change(B, Property::Scale, 1.0, 2.0)], Easing::Linear)
            .unwrap();
        assert_eq!(tl.targets(), vec![B, A]);
    }

    //  Builder

    #[test]
    fn position_parsing() {
        assert_eq!(Position::parse("0.12"), Ok(Position::At(0.12)));
        assert_eq!(Position::parse("<"), Ok(Position::WithPrevious));
        assert_eq!(Position::parse("+=0.5"), Ok(Position::Relative(0.5)));
        assert_eq!(Position::parse("-=0.3"), Ok(Position::Relative(-0.3)));
        assert!(Position::parse("soon").is_err());
        assert!(Position::parse("-=x").is_err());
    }

    #[test]
    fn builder_normalizes_relative_positions() {
        let mut b = TimelineBuilder::new();
        b.add(
            vec![change(A, Property::Opacity, 0.0, 1.0)],
            0.8,
            Easing::power(3, EaseDir::Out),
            Position::At(0.0),
        )
        .unwrap();
        b.add(
            vec![change(B, Property::TranslateY, 30.0, 0.0)],
            0.6,
            Easing::power(2, EaseDir::Out),
            Position::parse("-=0.3").unwrap(),
        )
        .unwrap();
        assert!((b.length() - 1.1).abs() < 1e-12);
        let tl = b.build().unwrap();
        let segs = tl.segments();
        assert_eq!(segs.len(), 2);
        assert!((segs[0].duration() - 0.8 / 1.1).abs() < 1e-12);
        assert!((segs[1].start() - 0.5 / 1.1).abs() < 1e-12);
        assert!((segs[1].end() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn builder_with_previous_and_after_previous() {
        let mut b = TimelineBuilder::new().with_length(4.0);
        b.add(vec![change(A, Property::Opacity, 0.0, 1.0)], 1.0, Easing::Linear, Position::At(1.0))
            .unwrap()
            .add(vec![change(B, Property::Opacity, 0.0, 1.0)], 1.0, Easing::Linear, Position::WithPrevious)
            .unwrap()
            .add(vec![change(B, Property::Scale, 1.0, 0.0)], 1.0, Easing::Linear, Position::AfterPrevious)
            .unwrap();
        let tl = b.build().unwrap();
        let starts: Vec<f64> = tl.segments().iter().map(|s| s.start()).collect();
        assert_eq!(starts, vec![0.25, 0.25, 0.5]);
    }

    #[test]
    fn builder_clamps_negative_start() {
        let mut b = TimelineBuilder::new();
        b.add(vec![change(A, Property::Opacity, 0.0, 1.0)], 1.0, Easing::Linear, Position::Relative(-5.0))
            .unwrap();
        let tl = b.build().unwrap();
        assert_eq!(tl.segments()[0].start(), 0.0);
    }

    #[test]
    fn empty_builder_has_zero_length() {
        assert_eq!(TimelineBuilder::new().build().unwrap_err(), TimelineError::ZeroLength);
    }

    //  Playback

    #[test]
    fn playback_respects_delay() {
        let mut p = Playback::new(1.5, 0.8);
        assert_eq!(p.progress(10.0), 0.0);
        p.start(10.0);
        assert_eq!(p.progress(11.0), 0.0);
        assert!((p.progress(11.9) - 0.5).abs() < 1e-9);
        assert!(p.is_complete(12.4));
        assert!(!p.is_complete(12.0));
    }

    #[test]
    fn zero_duration_playback_jumps() {
        let mut p = Playback::new(0.0, 0.0);
        p.start(1.0);
        assert_eq!(p.progress(1.0), 1.0);
    }
}
