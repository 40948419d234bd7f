//! GTK4 preview of the landing page scene.
//!
//! Every element becomes a labelled box inside a scrollable `gtk4::Fixed`
//! laid out by [`default_layout`].  Scrolling the window drives the stage,
//! and a GLib timer delivers frames, so pinning, scrubbing, snapping and
//! the count-up numbers can be watched without a browser.
//!
//! Run with:
//!     cargo run --features preview-gtk --bin scrubline-preview
//!
//! Rotations about the X and Y axes are drawn as 3D rotations without
//! perspective; clip insets are not drawn.

use gtk4::prelude::*;
use gtk4::{gdk, glib, graphene, gsk};
use log::{debug, error, info, warn};
use scrubline::binder::{StyleUpdate, Transform};
use scrubline::config::Config;
use scrubline::event::{ElementRef, HostEvent, Rect, Viewport};
use scrubline::layout::StaticLayout;
use scrubline::scenes::{default_layout, landing_page, ElementTable};
use scrubline::scroll::{PinPlacement, PinState};
use scrubline::shader::{NullBackend, ShaderBackground};
use scrubline::stage::Stage;
use scrubline::traits::{Layout, Surface};
use std::collections::HashMap;
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Character count of each hero title line.
const TITLE_LINES: [usize; 4] = [5, 4, 6, 5];

fn css(background: &str) -> String {
    format!(
        r#"
window, scrolledwindow {{
    background-color: {background};
}}

.element {{
    border: 1px solid rgba(255, 255, 255, 0.35);
    border-radius: 4px;
    color: white;
    font-size: 11px;
}}

.title-char {{
    background-color: rgba(255, 255, 255, 0.85);
    color: black;
    font-size: 20px;
    font-weight: bold;
}}

.stat {{
    font-size: 28px;
    font-weight: bold;
}}
"#
    )
}

//  Surface

struct Node {
    label: gtk4::Label,
    transform: Transform,
}

/// Writes the stage's output onto GTK widgets.
struct GtkSurface {
    fixed: gtk4::Fixed,
    adjustment: gtk4::Adjustment,
    nodes: HashMap<ElementRef, Node>,
    rects: HashMap<ElementRef, Rect>,
    pins: HashMap<ElementRef, PinState>,
}

impl GtkSurface {
    fn new(fixed: gtk4::Fixed, adjustment: gtk4::Adjustment, elements: &ElementTable) -> Self {
        let mut nodes = HashMap::new();
        for i in 0..elements.len() {
            let el = ElementRef(i as u32);
            let name = elements.name_of(el).unwrap_or("?");
            let label = gtk4::Label::new(Some(name));
            label.add_css_class("element");
            if name.starts_with("title-") {
                label.set_text("A");
                label.add_css_class("title-char");
            }
            if name.starts_with("stat-") {
                label.add_css_class("stat");
            }
            label.set_can_target(false);
            fixed.put(&label, 0.0, 0.0);
            nodes.insert(
                el,
                Node {
                    label,
                    transform: Transform::IDENTITY,
                },
            );
        }
        Self {
            fixed,
            adjustment,
            nodes,
            rects: HashMap::new(),
            pins: HashMap::new(),
        }
    }

    /// Take new document geometry from `layout`.
    fn relayout(&mut self, layout: &StaticLayout, document_height: f64) {
        self.rects.clear();
        for (&el, node) in &self.nodes {
            match layout.element_rect(el) {
                Some(rect) => {
                    node.label
                        .set_size_request(rect.width.round() as i32, rect.height.round() as i32);
                    node.label.set_visible(true);
                    self.rects.insert(el, rect);
                }
                None => node.label.set_visible(false),
            }
        }
        let viewport = layout.viewport();
        self.fixed
            .set_size_request(viewport.width.round() as i32, document_height.round() as i32);
    }

    /// Vertical shift a pin applies to `rect`, relative to document flow.
    fn pin_shift(&self, rect: &Rect) -> f64 {
        let scroll_y = self.adjustment.value();
        for (el, state) in &self.pins {
            let Some(pinned) = self.rects.get(el) else {
                continue;
            };
            let inside = rect.y >= pinned.y && rect.bottom() <= pinned.bottom() + 0.5;
            if !inside {
                continue;
            }
            return match *state {
                PinState::Before => 0.0,
                PinState::Pinned { fixed_top } => scroll_y + fixed_top - pinned.y,
                PinState::After { offset } => offset,
            };
        }
        0.0
    }

    /// Position every node from its rect, pin and transform.
    fn place_all(&self) {
        for (el, node) in &self.nodes {
            let Some(rect) = self.rects.get(el) else {
                continue;
            };
            let t = &node.transform;
            let x = rect.x + t.x + t.x_percent / 100.0 * rect.width;
            let y = rect.y + self.pin_shift(rect) + t.y + t.y_percent / 100.0 * rect.height;
            let (cx, cy) = ((rect.width / 2.0) as f32, (rect.height / 2.0) as f32);
            let transform = gsk::Transform::new()
                .translate(&graphene::Point::new(x as f32 + cx, y as f32 + cy))
                .rotate_3d(t.rotate_x as f32, &graphene::Vec3::x_axis())
                .rotate_3d(t.rotate_y as f32, &graphene::Vec3::y_axis())
                .rotate(t.rotate_z as f32)
                .scale(t.scale as f32, t.scale as f32)
                .translate(&graphene::Point::new(-cx, -cy));
            self.fixed.set_child_transform(&node.label, Some(&transform));
        }
    }
}

impl Surface for GtkSurface {
    fn apply_style(&mut self, target: ElementRef, style: &StyleUpdate) {
        let Some(node) = self.nodes.get_mut(&target) else {
            return;
        };
        if let Some(transform) = style.transform {
            node.transform = transform;
        }
        if let Some(opacity) = style.opacity {
            node.label.set_opacity(opacity.clamp(0.0, 1.0));
        }
    }

    fn clear_style(&mut self, target: ElementRef) {
        if let Some(node) = self.nodes.get_mut(&target) {
            node.transform = Transform::IDENTITY;
            node.label.set_opacity(1.0);
        }
        self.pins.remove(&target);
    }

    fn set_compositing_hint(&mut self, _target: ElementRef, _enabled: bool) {}

    fn place_pinned(&mut self, target: ElementRef, placement: &PinPlacement) {
        debug!("pin {} -> {:?}", target, placement.state);
        self.pins.insert(target, placement.state);
    }

    fn set_text(&mut self, target: ElementRef, text: &str) {
        if let Some(node) = self.nodes.get(&target) {
            node.label.set_text(text);
        }
    }

    fn request_scroll(&mut self, y: f64) {
        self.adjustment.set_value(y);
    }
}

//  Main

/// Document height: everything laid out plus the projects' pinned distance.
fn document_height(layout: &StaticLayout, elements: &ElementTable) -> f64 {
    let track = elements
        .get("projects-track")
        .and_then(|el| layout.element_rect(el))
        .map(|r| r.width)
        .unwrap_or(0.0);
    layout.extent() + track
}

fn main() {
    env_logger::init();

    if let Err(e) = gtk4::init() {
        error!("failed to initialise GTK4: {}", e);
        std::process::exit(1);
    }
    info!("GTK4 initialised on main thread");

    let config = Config::load_default();
    let scene = match landing_page(&config, &TITLE_LINES) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to build scene: {}", e);
            std::process::exit(1);
        }
    };
    let elements = scene.elements.clone();
    let title = scene.title.clone();

    let provider = gtk4::CssProvider::new();
    #[allow(deprecated)]
    provider.load_from_data(&css(&config.shader.color));
    match gdk::Display::default() {
        Some(display) => gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        ),
        None => warn!("no GDK display, CSS will not be applied"),
    }

    let initial = Viewport::default();
    let window = gtk4::Window::new();
    window.set_title(Some("scrubline preview"));
    window.set_default_size(initial.width as i32, initial.height as i32);

    let scrolled = gtk4::ScrolledWindow::new();
    let fixed = gtk4::Fixed::new();
    scrolled.set_child(Some(&fixed));
    window.set_child(Some(&scrolled));
    let adjustment = scrolled.vadjustment();

    let (tx, rx) = mpsc::channel::<HostEvent>();
    adjustment.connect_value_changed(move |adj| {
        let _ = tx.send(HostEvent::Scroll { y: adj.value() });
    });

    let mut layout = default_layout(&elements, &title, initial);
    let mut surface = GtkSurface::new(fixed, adjustment, &elements);
    surface.relayout(&layout, document_height(&layout, &elements));

    let shader = match ShaderBackground::new(NullBackend, &config.shader) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("running without shader background: {}", e);
            None
        }
    };
    let mut stage = Stage::new(scene, shader);
    stage.mount(&layout, &mut surface);
    window.present();

    let main_loop = glib::MainLoop::new(None, false);
    {
        let main_loop = main_loop.clone();
        window.connect_close_request(move |_| {
            main_loop.quit();
            glib::Propagation::Proceed
        });
    }

    let clock = Instant::now();
    let interval = Duration::from_millis(config.frame.interval_ms.max(1));
    info!("preview running ({}ms frames)", interval.as_millis());

    glib::timeout_add_local(interval, move || {
        // 1. Follow the window size.
        let (w, h) = (scrolled.width() as f64, scrolled.height() as f64);
        if w > 0.0 && h > 0.0 && Viewport::new(w, h) != layout.viewport() {
            layout = default_layout(&elements, &title, Viewport::new(w, h));
            surface.relayout(&layout, document_height(&layout, &elements));
            stage.handle(&HostEvent::Resize { width: w, height: h }, &layout, &mut surface);
        }

        // 2. Drain scroll events.
        while let Ok(event) = rx.try_recv() {
            stage.handle(&event, &layout, &mut surface);
        }

        // 3. Resolve and write one frame.
        let time = clock.elapsed().as_secs_f64();
        stage.handle(&HostEvent::Frame { time }, &layout, &mut surface);
        surface.place_all();

        glib::ControlFlow::Continue
    });

    info!("entering GLib main loop");
    main_loop.run();
    info!("GLib main loop exited");
}
