//! The landing page sections, built from the public engine API.
//!
//! | Section        | Trigger                    | Drives                                   |
//! |----------------|----------------------------|------------------------------------------|
//! | `hero-intro`   | 1.5 s after mount          | subtitle and call-to-action entrance     |
//! | `hero-stats`   | hero, pinned, `+=500%`     | split hero, stats fade, 9 parallax props |
//! | `stats-bg`     | stats, `top bottom`        | background drift                         |
//! | `projects`     | projects, pinned, `+=width`| horizontal card track with snapping      |
//!
//! Elements are addressed by name through an [`ElementTable`]; the host
//! resolves names to its own nodes.

use crate::binder::Transform;
use crate::config::Config;
use crate::counter::Counter;
use crate::easing::{EaseDir, Easing};
use crate::event::{ElementRef, Rect, Viewport};
use crate::layout::StaticLayout;
use crate::letters::LetterDispersion;
use crate::property::{Property, PropertyChange};
use crate::scroll::{Distance, Scrub, ScrollTriggerConfig, TriggerPos};
use crate::section::{ContainerTween, ScrollSection, TimedSection};
use crate::timeline::{Position, Timeline, TimelineBuilder, TimelineError};
use std::collections::BTreeMap;

/// Names of the elements a scene animates.
#[derive(Debug, Clone, Default)]
pub struct ElementTable {
    by_name: BTreeMap<String, ElementRef>,
    names: Vec<String>,
}

impl ElementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The element called `name`, allocated on first use.
    pub fn el(&mut self, name: &str) -> ElementRef {
        if let Some(&el) = self.by_name.get(name) {
            return el;
        }
        let el = ElementRef(self.names.len() as u32);
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), el);
        el
    }

    /// The element called `name`, if one was allocated.
    pub fn get(&self, name: &str) -> Option<ElementRef> {
        self.by_name.get(name).copied()
    }

    /// Reverse lookup, used to label output records.
    pub fn name_of(&self, el: ElementRef) -> Option<&str> {
        self.names.get(el.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One parallax prop of the hero/stats transition.
struct Prop {
    name: &'static str,
    y_percent: f64,
    rotation: f64,
    /// Static tilt from the markup.
    base_rotation: f64,
}

const PROPS: [Prop; 9] = [
    Prop { name: "homme", y_percent: -220.0, rotation: 0.0, base_rotation: 0.0 },
    Prop { name: "balle-back", y_percent: -1200.0, rotation: 240.0, base_rotation: 0.0 },
    Prop { name: "raquette-back", y_percent: -650.0, rotation: -35.0, base_rotation: -15.0 },
    Prop { name: "balle", y_percent: -1800.0, rotation: 360.0, base_rotation: 0.0 },
    Prop { name: "balle-2", y_percent: -2200.0, rotation: -300.0, base_rotation: 0.0 },
    Prop { name: "gourde", y_percent: -900.0, rotation: -25.0, base_rotation: 0.0 },
    Prop { name: "gourde-2", y_percent: -1100.0, rotation: 18.0, base_rotation: 8.0 },
    Prop { name: "raquette", y_percent: -700.0, rotation: 45.0, base_rotation: 20.0 },
    Prop { name: "raquette2", y_percent: -800.0, rotation: -50.0, base_rotation: -25.0 },
];

/// Stat values and the section progress at which they become visible.
const STATS: [i64; 4] = [10_000, 5_000, 98, 50];
const STATS_VISIBLE_AT: f64 = 0.12;

pub const PROJECT_CARDS: usize = 4;

/// Name of the section whose progress drives the letter dispersion.
pub const LETTER_DRIVER: &str = "hero-stats";

/// Everything the landing page mounts.
pub struct Scene {
    pub elements: ElementTable,
    pub intros: Vec<TimedSection>,
    pub sections: Vec<ScrollSection>,
    pub letters: LetterDispersion,
    /// Character nodes of each hero title line.
    pub title: Vec<Vec<ElementRef>>,
}

fn scrub(config: &Config, own_lag: f64) -> Scrub {
    match config.scroll.scrub_lag.unwrap_or(own_lag) {
        lag if lag > 0.0 => Scrub::Lag(lag),
        _ => Scrub::Immediate,
    }
}

fn change(
    target: ElementRef,
    property: Property,
    from: f64,
    to: f64,
) -> Result<PropertyChange, TimelineError> {
    Ok(PropertyChange::new(target, property, from, to)?)
}

fn hero_intro(els: &mut ElementTable) -> Result<TimedSection, TimelineError> {
    let subtitle = els.el("hero-subtitle");
    let cta = els.el("hero-cta");
    let mut b = TimelineBuilder::new();
    b.add(
        vec![
            change(subtitle, Property::Opacity, 0.0, 1.0)?,
            change(subtitle, Property::TranslateY, 20.0, 0.0)?,
        ],
        0.8,
        Easing::power(3, EaseDir::Out),
        Position::At(0.0),
    )?;
    b.add(
        vec![
            change(cta, Property::Opacity, 0.0, 1.0)?,
            change(cta, Property::TranslateY, 30.0, 0.0)?,
        ],
        0.6,
        Easing::power(2, EaseDir::Out),
        Position::parse("-=0.3")?,
    )?;
    let duration = b.length();
    Ok(TimedSection::new("hero-intro", b.build()?, 1.5, duration))
}

fn hero_stats(els: &mut ElementTable, config: &Config) -> Result<ScrollSection, TimelineError> {
    let hero = els.el("hero");
    let top_half = els.el("hero-top-half");
    let bottom_half = els.el("hero-bottom-half");
    let stats = els.el("stats");
    let back = els.el("parallax-back");
    let front = els.el("parallax-front");
    let fade = Easing::power(1, EaseDir::Out);

    let mut b = TimelineBuilder::new();
    let split = Easing::power(2, EaseDir::InOut);
    b.add(vec![change(top_half, Property::YPercent, 0.0, -50.0)?], 0.18, split, Position::At(0.0))?
        .add(vec![change(bottom_half, Property::YPercent, 0.0, 50.0)?], 0.18, split, Position::WithPrevious)?
        .add(vec![change(stats, Property::Opacity, 0.0, 1.0)?], 0.08, fade, Position::At(0.12))?
        .add(vec![change(back, Property::Opacity, 0.0, 1.0)?], 0.07, fade, Position::At(0.16))?
        .add(vec![change(front, Property::Opacity, 0.0, 1.0)?], 0.07, fade, Position::At(0.18))?;

    let mut bases = Vec::new();
    for prop in &PROPS {
        let el = els.el(&format!("parallax-{}", prop.name));
        b.add(
            vec![
                change(el, Property::YPercent, 0.0, prop.y_percent)?,
                change(el, Property::RotateZ, prop.base_rotation, prop.rotation)?,
            ],
            0.82,
            Easing::Linear,
            Position::At(0.18),
        )?;
        if prop.base_rotation != 0.0 {
            bases.push((el, Transform::rotated(prop.base_rotation)));
        }
    }

    let trigger = ScrollTriggerConfig::new(hero)
        .pinned()
        .start(TriggerPos::TOP_TOP)
        .end(TriggerPos::PastStart(Distance::ViewportPercent(500.0)))
        .scrub(scrub(config, 1.2));
    let mut section = ScrollSection::new("hero-stats", b.build()?, trigger)
        .with_snap_delay(config.scroll.snap_delay());
    for (el, base) in bases {
        section = section.with_base(el, base);
    }
    for (i, to) in STATS.iter().enumerate() {
        let el = els.el(&format!("stat-{}", i));
        section = section.with_counter(Counter::new(el, 0, *to, &config.counter), STATS_VISIBLE_AT);
    }
    Ok(section)
}

fn stats_background(els: &mut ElementTable, config: &Config) -> Result<ScrollSection, TimelineError> {
    let stats = els.el("stats");
    let bg = els.el("stats-bg");
    let mut tl = Timeline::new();
    tl.add(0.0, 1.0, vec![change(bg, Property::TranslateY, 0.0, -200.0)?], Easing::Linear)?;
    let trigger = ScrollTriggerConfig::new(stats)
        .start(TriggerPos::TOP_BOTTOM)
        .end(TriggerPos::BOTTOM_TOP)
        .scrub(scrub(config, 1.0));
    Ok(ScrollSection::new("stats-bg", tl, trigger))
}

fn projects(els: &mut ElementTable, config: &Config) -> Result<ScrollSection, TimelineError> {
    let section_el = els.el("projects");
    let track = els.el("projects-track");
    let shift = -100.0 * (PROJECT_CARDS - 1) as f64;

    let mut cards = Vec::new();
    let mut tweens = Vec::new();
    for i in 0..PROJECT_CARDS {
        let card = els.el(&format!("project-card-{}", i));
        let image = els.el(&format!("project-card-{}-bg", i));
        cards.push(change(card, Property::XPercent, 0.0, shift)?);

        let mut parallax = Timeline::new();
        parallax.add(0.0, 1.0, vec![change(image, Property::TranslateX, 0.0, -100.0)?], Easing::Linear)?;
        tweens.push(ContainerTween::new(card, card, parallax));
    }
    let mut tl = Timeline::new();
    tl.add(0.0, 1.0, cards, Easing::Linear)?;

    let trigger = ScrollTriggerConfig::new(section_el)
        .pinned()
        .start(TriggerPos::TOP_TOP)
        .end(TriggerPos::PastStart(Distance::ElementWidth(track)))
        .scrub(scrub(config, 1.0))
        .snap(1.0 / (PROJECT_CARDS - 1) as f64);
    let mut section =
        ScrollSection::new("projects", tl, trigger).with_snap_delay(config.scroll.snap_delay());
    for tween in tweens {
        section = section.with_container_tween(tween);
    }
    Ok(section)
}

/// Build the landing page.  `title_lines` holds the character count of
/// each hero title line.
pub fn landing_page(config: &Config, title_lines: &[usize]) -> Result<Scene, TimelineError> {
    let mut elements = ElementTable::new();
    let intros = vec![hero_intro(&mut elements)?];
    let sections = vec![
        hero_stats(&mut elements, config)?,
        stats_background(&mut elements, config)?,
        projects(&mut elements, config)?,
    ];
    let title = title_lines
        .iter()
        .enumerate()
        .map(|(line, &len)| {
            (0..len)
                .map(|i| elements.el(&format!("title-{}-{}", line, i)))
                .collect()
        })
        .collect();
    Ok(Scene {
        elements,
        intros,
        sections,
        letters: LetterDispersion::new(config.letters.clone(), title_lines.len()),
        title,
    })
}

impl Scene {
    pub fn default_layout(&self, viewport: Viewport) -> StaticLayout {
        default_layout(&self.elements, &self.title, viewport)
    }
}

/// A plausible document layout for `viewport`: the hero fills the first
/// screen, its pinned distance follows, then the project track.
///
/// Takes the element table and title lines rather than a [`Scene`] so a host
/// can lay out again after handing the scene to a stage.
pub fn default_layout(
    elements: &ElementTable,
    title: &[Vec<ElementRef>],
    viewport: Viewport,
) -> StaticLayout {
    let (vw, vh) = (viewport.width, viewport.height);
    let mut layout = StaticLayout::new(viewport);
    let mut put = |name: &str, rect: Rect| {
        if let Some(el) = elements.get(name) {
            layout.insert(el, rect);
        }
    };

    let screen = Rect::new(0.0, 0.0, vw, vh);
    for name in [
        "hero",
        "hero-top-half",
        "hero-bottom-half",
        "stats",
        "stats-bg",
        "parallax-back",
        "parallax-front",
    ] {
        put(name, screen);
    }
    put("hero-subtitle", Rect::new(vw * 0.2, vh * 0.7, vw * 0.6, 40.0));
    put("hero-cta", Rect::new(vw * 0.4, vh * 0.8, vw * 0.2, 56.0));
    for (i, prop) in PROPS.iter().enumerate() {
        let x = vw * (i as f64 + 0.5) / PROPS.len() as f64;
        put(&format!("parallax-{}", prop.name), Rect::new(x - 60.0, vh - 120.0, 120.0, 120.0));
    }
    for i in 0..STATS.len() {
        let x = vw * (i as f64 + 0.5) / STATS.len() as f64;
        put(&format!("stat-{}", i), Rect::new(x - 80.0, vh * 0.5, 160.0, 64.0));
    }

    let projects_y = vh * 6.0;
    put("projects", Rect::new(0.0, projects_y, vw, vh));
    put(
        "projects-track",
        Rect::new(0.0, projects_y, vw * PROJECT_CARDS as f64, vh),
    );
    for i in 0..PROJECT_CARDS {
        let card = Rect::new(vw * i as f64, projects_y, vw, vh);
        put(&format!("project-card-{}", i), card);
        put(&format!("project-card-{}-bg", i), card);
    }

    for (line, chars) in title.iter().enumerate() {
        let y = vh * 0.2 + line as f64 * vh * 0.12;
        let w = vw * 0.05;
        let x0 = (vw - w * chars.len() as f64) / 2.0;
        for (i, &el) in chars.iter().enumerate() {
            layout.insert(el, Rect::new(x0 + w * i as f64, y, w, vh * 0.1));
        }
    }
    layout
}
