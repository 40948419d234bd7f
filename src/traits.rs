//! Core traits that decouple scrubline from any specific host environment.
//!
//! Every concrete host (a browser binding, the GTK preview, the CLI's
//! recording surface, a test harness, …) implements some of these traits.
//! The animation engine only depends on these abstractions, and each section
//! receives its collaborators explicitly instead of reaching for a global
//! registry.

use crate::binder::StyleUpdate;
use crate::event::{ElementRef, HostEvent, Rect, Viewport};
use crate::scroll::PinPlacement;
use crate::shader::Uniforms;
use std::sync::mpsc;

/// Read-only access to document geometry.
///
/// An implementation might query a browser's layout engine, or it might be a
/// fixed table of rects used in tests.
pub trait Layout {
    /// Current viewport size.
    fn viewport(&self) -> Viewport;

    /// Rect of `element` in **document** coordinates, i.e. where it sits in
    /// the flow independent of the current scroll offset.
    ///
    /// Returns `None` when the element is not mounted (missing-target).
    fn element_rect(&self, element: ElementRef) -> Option<Rect>;
}

/// Write access to the presentation layer of visual nodes.
///
/// Writes are fire-and-forget: a write to a node the host no longer knows is
/// a no-op on the host side, never an error.
pub trait Surface {
    /// Apply the changed parts of an element's presentation.
    fn apply_style(&mut self, target: ElementRef, style: &StyleUpdate);

    /// Drop every presentation override previously written to `target`.
    fn clear_style(&mut self, target: ElementRef);

    /// Mark (or unmark) `target` for GPU-accelerated compositing.
    fn set_compositing_hint(&mut self, target: ElementRef, enabled: bool);

    /// Place a pinned section: a fixed-position overlay while pinned, plus a
    /// spacer reserving the scrolled distance.
    fn place_pinned(&mut self, target: ElementRef, placement: &PinPlacement);

    /// Replace the text content of `target` (used by counters).
    fn set_text(&mut self, target: ElementRef, text: &str);

    /// Ask the host to scroll the document to `y` (used by snapping).
    fn request_scroll(&mut self, y: f64);
}

/// A GPU rendering context for the procedural background.
///
/// The [`ShaderBackground`](crate::shader::ShaderBackground) state machine
/// drives this trait; it never touches a graphics API directly.
pub trait GpuBackend {
    /// The error type produced by this backend.
    type Error: std::error::Error + 'static;
    /// Handle of a linked shader program.
    type Program;

    /// Allocate a rendering surface of the given size and attach it to the
    /// container.
    fn create_surface(&mut self, width: u32, height: u32) -> Result<(), Self::Error>;

    /// Compile and link a program from GLSL sources.
    fn compile_program(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<Self::Program, Self::Error>;

    /// Resize the drawing buffer and viewport.
    fn resize(&mut self, width: u32, height: u32);

    /// Draw one full-screen frame with `program`.
    fn draw(&mut self, program: &Self::Program, uniforms: &Uniforms) -> Result<(), Self::Error>;

    /// Release a program.
    fn delete_program(&mut self, program: Self::Program);

    /// Release the rendering surface and its context, and detach it from the
    /// container.
    fn destroy_surface(&mut self);
}

/// A source of [`HostEvent`]s.
///
/// Implementations read events from some transport (a file, stdin, a
/// browser bridge) and forward them into the provided [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](EventSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each received event must be sent through `sink` exactly once, in order.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait EventSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start reading and forward every event into `sink`.
    fn run(&mut self, sink: mpsc::Sender<HostEvent>) -> Result<(), Self::Error>;
}
