//! **scrubline**: scroll-synchronized animation timelines.
//!
//! A page is a set of *sections*.  Each section owns a timeline of property
//! tweens and a trigger region on the document; scrolling through the region
//! moves the timeline's playhead, optionally pinning the section in place
//! and easing the playhead toward the scroll position (scrub).
//!
//! # Architecture
//!
//! The engine never touches a document or a GPU directly.  Hosts plug in
//! through the traits in [`traits`]:
//!
//! * [`traits::Layout`]: element rects and the viewport, read at mount and
//!   on resize.
//! * [`traits::Surface`]: style writes, compositing hints, pin placement,
//!   counter text and snap scroll requests.
//! * [`traits::GpuBackend`]: the context behind the
//!   [`shader::ShaderBackground`] state machine.
//! * [`traits::EventSource`]: delivers [`event::HostEvent`]s from some
//!   transport, such as the [`source::JsonLinesSource`] the CLI reads.
//!
//! [`stage::Stage`] ties a [`scenes::Scene`] to these collaborators and
//! handles one event at a time: scroll events only store a target, and each
//! frame resolves every timeline before anything is written.
//!
//! | Module       | Concern                                               |
//! |--------------|-------------------------------------------------------|
//! | [`easing`]   | named easing curves                                   |
//! | [`timeline`] | segments, positions, resolve-at-progress              |
//! | [`scroll`]   | trigger expressions, progress, scrub, snap, pinning   |
//! | [`binder`]   | composing and coalescing style writes                 |
//! | [`section`]  | a timeline bound to a trigger or to wall-clock time   |
//! | [`letters`]  | hero title letter dispersion                          |
//! | [`counter`]  | count-up numbers                                      |
//! | [`shader`]   | procedural background                                 |
//! | [`listeners`]| listener handle accounting                            |

pub mod bezier;
pub mod binder;
pub mod config;
pub mod counter;
pub mod easing;
pub mod event;
pub mod layout;
pub mod letters;
pub mod listeners;
pub mod property;
pub mod record;
pub mod scenes;
pub mod scroll;
pub mod section;
pub mod shader;
pub mod source;
pub mod stage;
pub mod timeline;
pub mod traits;
