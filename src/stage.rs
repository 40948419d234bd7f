//! The stage: every mounted section of a page plus its background.
//!
//! [`Stage::handle`] is the single entry point for host events:
//!
//! | Event           | Effect                                                    |
//! |-----------------|-----------------------------------------------------------|
//! | `Scroll { y }`  | every section stores `y` as its latest target             |
//! | `Resize { .. }` | every trigger is re-measured now; the shader is resized   |
//! | `Frame { t }`   | resolve every timeline, then write everything, then draw  |
//!
//! Within one frame no write happens before every timeline has resolved,
//! and scroll events between frames collapse into the last one.

use crate::event::{ElementRef, HostEvent, ListenerKind, Rect, Viewport};
use crate::letters::LetterDispersion;
use crate::listeners::ListenerRegistry;
use crate::scenes::{Scene, LETTER_DRIVER};
use crate::section::{ScrollSection, TimedSection};
use crate::shader::ShaderBackground;
use crate::traits::{GpuBackend, Layout, Surface};
use log::{debug, info, warn};

pub struct Stage<B: GpuBackend> {
    registry: ListenerRegistry,
    intros: Vec<TimedSection>,
    sections: Vec<ScrollSection>,
    letters: LetterDispersion,
    letter_driver: Option<usize>,
    title: Vec<Vec<ElementRef>>,
    shader: Option<ShaderBackground<B>>,
    scroll_y: f64,
    mounted: bool,
}

impl<B: GpuBackend> Stage<B> {
    pub fn new(scene: Scene, shader: Option<ShaderBackground<B>>) -> Self {
        let letter_driver = scene
            .sections
            .iter()
            .position(|s| s.name() == LETTER_DRIVER);
        Self {
            registry: ListenerRegistry::new(),
            intros: scene.intros,
            sections: scene.sections,
            letters: scene.letters,
            letter_driver,
            title: scene.title,
            shader,
            scroll_y: 0.0,
            mounted: false,
        }
    }

    pub fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }

    pub fn sections(&self) -> &[ScrollSection] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&ScrollSection> {
        self.sections.iter().find(|s| s.name() == name)
    }

    pub fn letters(&self) -> &LetterDispersion {
        &self.letters
    }

    pub fn shader(&self) -> Option<&ShaderBackground<B>> {
        self.shader.as_ref()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Mount every section whose elements are present.
    pub fn mount<L, S>(&mut self, layout: &L, surface: &mut S)
    where
        L: Layout + ?Sized,
        S: Surface + ?Sized,
    {
        if self.mounted {
            return;
        }
        for intro in &mut self.intros {
            if !intro.mount(&mut self.registry, layout, surface) {
                debug!("intro {} skipped", intro.name());
            }
        }
        let mut mounted = 0;
        for section in &mut self.sections {
            if section.mount(&mut self.registry, layout, surface) {
                section.on_scroll(self.scroll_y);
                mounted += 1;
            }
        }
        self.report_title(layout, surface);

        let viewport = layout.viewport();
        if let Some(shader) = &mut self.shader {
            if let Err(e) = shader.mount(
                &mut self.registry,
                viewport.width.max(0.0) as u32,
                viewport.height.max(0.0) as u32,
            ) {
                warn!("shader background unavailable: {}", e);
            }
        }
        self.mounted = true;
        info!(
            "stage mounted: {}/{} sections, {} listeners",
            mounted,
            self.sections.len(),
            self.registry.active()
        );
    }

    /// Each title line reports the characters it rendered, in viewport
    /// coordinates.
    fn report_title<L, S>(&mut self, layout: &L, surface: &mut S)
    where
        L: Layout + ?Sized,
        S: Surface + ?Sized,
    {
        let viewport = layout.viewport();
        for (line, chars) in self.title.iter().enumerate() {
            let rendered: Vec<(ElementRef, Rect)> = chars
                .iter()
                .filter_map(|&el| {
                    layout.element_rect(el).map(|r| {
                        (el, Rect::new(r.x, r.y - self.scroll_y, r.width, r.height))
                    })
                })
                .collect();
            if rendered.is_empty() {
                continue;
            }
            self.letters.report(surface, line as u32, &rendered, viewport);
        }
    }

    pub fn handle<L, S>(&mut self, event: &HostEvent, layout: &L, surface: &mut S)
    where
        L: Layout + ?Sized,
        S: Surface + ?Sized,
    {
        if !self.mounted {
            debug!("event before mount ignored: {:?}", event);
            return;
        }
        match *event {
            HostEvent::Scroll { y } => {
                self.scroll_y = y;
                for section in &mut self.sections {
                    section.on_scroll(y);
                }
            }
            HostEvent::Resize { width, height } => {
                let viewport = layout.viewport();
                if viewport != Viewport::new(width, height) {
                    debug!(
                        "resize to {}x{} but layout reports {}x{}",
                        width, height, viewport.width, viewport.height
                    );
                }
                for section in &mut self.sections {
                    section.on_resize(layout);
                }
                if let Some(shader) = &mut self.shader {
                    shader.resize(width.max(0.0) as u32, height.max(0.0) as u32);
                }
            }
            HostEvent::Frame { time } => self.frame(time, surface),
        }
    }

    fn frame<S: Surface + ?Sized>(&mut self, time: f64, surface: &mut S) {
        for intro in &mut self.intros {
            intro.resolve(time);
        }
        for section in &mut self.sections {
            section.resolve(time);
        }
        if let Some(progress) = self.letter_driver.map(|i| self.sections[i].progress()) {
            self.letters.update(progress);
        }

        for intro in &mut self.intros {
            intro.flush(surface);
        }
        for section in &mut self.sections {
            section.flush(surface, time);
        }
        self.letters.flush(surface);

        if let Some(shader) = &mut self.shader {
            shader.frame(time);
        }
    }

    /// Release everything [`mount`](Self::mount) took.
    pub fn unmount<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        if !self.mounted {
            return;
        }
        for section in &mut self.sections {
            section.unmount(&mut self.registry, surface);
        }
        for intro in &mut self.intros {
            intro.unmount(&mut self.registry, surface);
        }
        self.letters.dispose(surface);
        if let Some(shader) = &mut self.shader {
            shader.unmount(&mut self.registry);
        }
        self.mounted = false;
        let left = self.registry.active();
        if left > 0 {
            warn!(
                "{} listeners outlive the stage ({} frame)",
                left,
                self.registry.active_of(ListenerKind::Frame)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::layout::StaticLayout;
    use crate::letters::LetterState;
    use crate::record::{RecordingSurface, SurfaceWrite};
    use crate::scenes::landing_page;
    use crate::shader::{NullBackend, ShaderState, SilkParams};

    const VIEWPORT: Viewport = Viewport {
        width: 1000.0,
        height: 800.0,
    };

    fn setup() -> (Stage<NullBackend>, StaticLayout, crate::scenes::ElementTable) {
        let scene = landing_page(&Config::default(), &[3, 4]).unwrap();
        let layout = scene.default_layout(VIEWPORT);
        let elements = scene.elements.clone();
        let shader = ShaderBackground::new(NullBackend, &SilkParams::default()).unwrap();
        (Stage::new(scene, Some(shader)), layout, elements)
    }

    #[test]
    fn mount_then_unmount_releases_every_listener() {
        let (mut stage, layout, _) = setup();
        let mut s = RecordingSurface::new();
        assert_eq!(stage.registry().active(), 0);
        stage.mount(&layout, &mut s);
        // 3 scroll sections x 3, 1 intro frame, shader frame + resize
        assert_eq!(stage.registry().active(), 3 * 3 + 1 + 2);
        assert_eq!(stage.shader().unwrap().state(), ShaderState::Running);

        for (i, y) in [0.0, 500.0, 2000.0, 5000.0].iter().enumerate() {
            stage.handle(&HostEvent::Scroll { y: *y }, &layout, &mut s);
            stage.handle(&HostEvent::Frame { time: i as f64 * 0.016 }, &layout, &mut s);
        }
        stage.unmount(&mut s);
        assert_eq!(stage.registry().active(), 0);
        assert_eq!(stage.shader().unwrap().state(), ShaderState::Disposed);
        assert!(s.hinted().is_empty());
    }

    #[test]
    fn scroll_alone_writes_nothing() {
        let (mut stage, layout, _) = setup();
        let mut s = RecordingSurface::new();
        stage.mount(&layout, &mut s);
        s.drain();
        for y in [10.0, 200.0, 400.0] {
            stage.handle(&HostEvent::Scroll { y }, &layout, &mut s);
        }
        assert!(s.writes.is_empty());
        stage.handle(&HostEvent::Frame { time: 0.0 }, &layout, &mut s);
        assert!(!s.writes.is_empty());
        stage.unmount(&mut s);
    }

    #[test]
    fn missing_section_is_skipped() {
        let (mut stage, mut layout, els) = setup();
        let projects = els.get("projects").unwrap();
        layout.remove(projects);
        let mut s = RecordingSurface::new();
        stage.mount(&layout, &mut s);
        assert!(!stage.section("projects").unwrap().is_mounted());
        assert!(stage.section("hero-stats").unwrap().is_mounted());

        stage.handle(&HostEvent::Scroll { y: 6000.0 }, &layout, &mut s);
        stage.handle(&HostEvent::Frame { time: 0.0 }, &layout, &mut s);
        let card = els.get("project-card-0").unwrap();
        assert!(s.styles_for(card).is_empty());
        stage.unmount(&mut s);
        assert_eq!(stage.registry().active(), 0);
    }

    #[test]
    fn letters_disperse_with_hero_progress() {
        let (mut stage, layout, els) = setup();
        let mut s = RecordingSurface::new();
        stage.mount(&layout, &mut s);
        assert_eq!(stage.letters().state(), LetterState::Ready);
        assert_eq!(stage.letters().len(), 7);

        let ch = els.get("title-0-0").unwrap();
        let before = stage.letters().rotation_of(ch).unwrap();

        // Resizing never touches the snapshot.
        let mut small = layout.clone();
        small.set_viewport(Viewport::new(500.0, 400.0));
        stage.handle(&HostEvent::Resize { width: 500.0, height: 400.0 }, &small, &mut s);
        assert_eq!(stage.letters().rotation_of(ch).unwrap(), before);
        stage.handle(&HostEvent::Resize { width: 1000.0, height: 800.0 }, &layout, &mut s);

        // Hero pinned over 5 viewports; 10% of it is inside the letter range.
        stage.handle(&HostEvent::Scroll { y: 400.0 }, &layout, &mut s);
        let mut t = 0.0;
        while t < 10.0 {
            stage.handle(&HostEvent::Frame { time: t }, &layout, &mut s);
            t += 0.05;
        }
        assert_eq!(stage.letters().state(), LetterState::AnimatingOut);
        let opacity = s.last_style(ch).unwrap().opacity.unwrap();
        assert!(opacity < 1.0 && opacity > 0.0);

        stage.unmount(&mut s);
        assert!(s.writes.contains(&SurfaceWrite::Clear { target: ch }));
        assert_eq!(stage.letters().state(), LetterState::Disposed);
    }

    #[test]
    fn counters_run_once_stats_are_visible() {
        let (mut stage, layout, els) = setup();
        let mut s = RecordingSurface::new();
        stage.mount(&layout, &mut s);
        let stat = els.get("stat-0").unwrap();

        // 20% through the hero: stats are visible.
        stage.handle(&HostEvent::Scroll { y: 800.0 }, &layout, &mut s);
        let mut t = 0.0;
        while t < 12.0 {
            stage.handle(&HostEvent::Frame { time: t }, &layout, &mut s);
            t += 0.1;
        }
        let texts = s.texts_for(stat);
        assert_eq!(texts.first().map(String::as_str), Some("0"));
        assert_eq!(texts.last().map(String::as_str), Some("10,000"));
        stage.unmount(&mut s);
    }

    #[test]
    fn events_before_mount_are_ignored() {
        let (mut stage, layout, _) = setup();
        let mut s = RecordingSurface::new();
        stage.handle(&HostEvent::Frame { time: 0.0 }, &layout, &mut s);
        assert!(s.writes.is_empty());
        stage.unmount(&mut s);
        assert_eq!(stage.registry().active(), 0);
    }
}
