//! The procedural "silk" background.
//!
//! [`ShaderBackground`] is a small state machine over a [`GpuBackend`]:
//!
//! ```text
//! Uninitialized ──mount──▶ Running ──unmount──▶ Disposed
//!        └──────────────unmount────────────────────┘
//! ```
//!
//! There is no way back from `Disposed`.  A failed mount releases whatever
//! it had allocated and lands in `Disposed` as well.
//!
//! The frame loop is driven from outside: every [`frame`](ShaderBackground::frame)
//! call renders one frame at wall-clock time `now`.  `uTime` counts seconds
//! since the first frame after mount and is not reset by resizes.

use crate::event::ListenerKind;
use crate::listeners::{ListenerRegistry, Subscriptions};
use crate::traits::GpuBackend;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

pub const VERTEX_SHADER: &str = r#"
attribute vec2 uv;
attribute vec2 position;

varying vec2 vUv;

void main() {
  vUv = uv;
  gl_Position = vec4(position, 0, 1);
}
"#;

pub const FRAGMENT_SHADER: &str = r#"
precision highp float;

varying vec2 vUv;

uniform float uTime;
uniform vec3 uColor;
uniform vec3 uResolution;
uniform float uSpeed;
uniform float uScale;
uniform float uRotation;
uniform float uNoiseIntensity;

const float e = 2.71828182845904523536;

float noise(vec2 texCoord) {
  float G = e;
  vec2 r = (G * sin(G * texCoord));
  return fract(r.x * r.y * (1.0 + texCoord.x));
}

vec2 rotateUvs(vec2 uv, float angle) {
  float c = cos(angle);
  float s = sin(angle);
  mat2 rot = mat2(c, -s, s, c);
  return rot * uv;
}

void main() {
  float rnd = noise(gl_FragCoord.xy);
  vec2 uv = rotateUvs(vUv * uScale, uRotation);
  vec2 tex = uv * uScale;
  float tOffset = uSpeed * uTime;

  tex.y += 0.03 * sin(8.0 * tex.x - tOffset);

  float pattern = 0.6 +
                  0.4 * sin(5.0 * (tex.x + tex.y +
                                   cos(3.0 * tex.x + 5.0 * tex.y) +
                                   0.02 * tOffset) +
                           sin(20.0 * (tex.x + tex.y - 0.1 * tOffset)));

  vec3 col = uColor * vec3(pattern) - vec3(rnd / 15.0 * uNoiseIntensity);
  gl_FragColor = vec4(col, 1.0);
}
"#;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShaderError {
    #[error("invalid color {0:?}, expected #rrggbb")]
    InvalidColor(String),
    #[error("gpu backend error: {0}")]
    Backend(String),
    #[error("background already disposed")]
    Disposed,
}

/// Look of the background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SilkParams {
    pub speed: f64,
    pub scale: f64,
    /// `#rrggbb`
    pub color: String,
    pub noise_intensity: f64,
    /// Radians.
    pub rotation: f64,
}

impl Default for SilkParams {
    fn default() -> Self {
        Self {
            speed: 1.0,
            scale: 1.0,
            color: "#555555".to_string(),
            noise_intensity: 3.5,
            rotation: 0.0,
        }
    }
}

/// Parse `#rrggbb` (or `#rgb`) into normalized rgb.
pub fn parse_hex_color(hex: &str) -> Result<[f32; 3], ShaderError> {
    let bad = || ShaderError::InvalidColor(hex.to_string());
    let clean = hex.trim().trim_start_matches('#');
    let expanded: String = match clean.len() {
        3 => clean.chars().flat_map(|c| [c, c]).collect(),
        6 => clean.to_string(),
        _ => return Err(bad()),
    };
    let channel = |i: usize| -> Result<f32, ShaderError> {
        let byte = expanded
            .get(i..i + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .ok_or_else(bad)?;
        Ok(byte as f32 / 255.0)
    };
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

/// Values of the fragment shader's uniforms for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniforms {
    pub time: f32,
    pub color: [f32; 3],
    /// `(width, height, width / height)`
    pub resolution: [f32; 3],
    pub speed: f32,
    pub scale: f32,
    pub rotation: f32,
    pub noise_intensity: f32,
}

fn resolution(width: u32, height: u32) -> [f32; 3] {
    let (w, h) = (width as f32, height as f32);
    let aspect = if height == 0 { 1.0 } else { w / h };
    [w, h, aspect]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderState {
    Uninitialized,
    Running,
    Disposed,
}

/// The background renderer.
pub struct ShaderBackground<B: GpuBackend> {
    backend: B,
    state: ShaderState,
    program: Option<B::Program>,
    uniforms: Uniforms,
    epoch: Option<f64>,
    frames: u64,
    subscriptions: Subscriptions,
}

impl<B: GpuBackend> ShaderBackground<B> {
    pub fn new(backend: B, params: &SilkParams) -> Result<Self, ShaderError> {
        let color = parse_hex_color(&params.color)?;
        Ok(Self {
            backend,
            state: ShaderState::Uninitialized,
            program: None,
            uniforms: Uniforms {
                time: 0.0,
                color,
                resolution: resolution(0, 0),
                speed: params.speed as f32,
                scale: params.scale as f32,
                rotation: params.rotation as f32,
                noise_intensity: params.noise_intensity as f32,
            },
            epoch: None,
            frames: 0,
            subscriptions: Subscriptions::new(),
        })
    }

    pub fn state(&self) -> ShaderState {
        self.state
    }

    pub fn uniforms(&self) -> &Uniforms {
        &self.uniforms
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Allocate the surface, compile the program and start listening for
    /// frames and resizes.  Mounting a running background is a no-op.
    pub fn mount(
        &mut self,
        registry: &mut ListenerRegistry,
        width: u32,
        height: u32,
    ) -> Result<(), ShaderError> {
        match self.state {
            ShaderState::Running => return Ok(()),
            ShaderState::Disposed => return Err(ShaderError::Disposed),
            ShaderState::Uninitialized => {}
        }

        if let Err(e) = self.backend.create_surface(width, height) {
            self.state = ShaderState::Disposed;
            return Err(ShaderError::Backend(e.to_string()));
        }
        let program = match self.backend.compile_program(VERTEX_SHADER, FRAGMENT_SHADER) {
            Ok(p) => p,
            Err(e) => {
                self.backend.destroy_surface();
                self.state = ShaderState::Disposed;
                return Err(ShaderError::Backend(e.to_string()));
            }
        };

        self.program = Some(program);
        self.uniforms.resolution = resolution(width, height);
        self.subscriptions = Subscriptions::subscribe(
            registry,
            "shader",
            &[ListenerKind::Frame, ListenerKind::Resize],
        );
        self.state = ShaderState::Running;
        info!("shader background running at {}x{}", width, height);
        Ok(())
    }

    /// Render one frame.  Does nothing unless running.
    pub fn frame(&mut self, now: f64) {
        if self.state != ShaderState::Running {
            return;
        }
        let Some(program) = self.program.as_ref() else {
            return;
        };
        let epoch = *self.epoch.get_or_insert(now);
        self.uniforms.time = (now - epoch).max(0.0) as f32;
        if let Err(e) = self.backend.draw(program, &self.uniforms) {
            warn!("shader draw failed: {}", e);
            return;
        }
        self.frames += 1;
    }

    /// Track a new container size.  The time accumulator keeps running.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.state != ShaderState::Running {
            debug!("resize ignored in state {:?}", self.state);
            return;
        }
        self.backend.resize(width, height);
        self.uniforms.resolution = resolution(width, height);
    }

    /// Stop the loop and release every GPU resource.
    pub fn unmount(&mut self, registry: &mut ListenerRegistry) {
        if self.state == ShaderState::Disposed {
            return;
        }
        if let Some(program) = self.program.take() {
            self.backend.delete_program(program);
        }
        if self.state == ShaderState::Running {
            self.backend.destroy_surface();
        }
        self.subscriptions.release_all(registry);
        self.state = ShaderState::Disposed;
        info!("shader background disposed after {} frames", self.frames);
    }
}

impl<B: GpuBackend> Drop for ShaderBackground<B> {
    fn drop(&mut self) {
        if self.state == ShaderState::Running {
            error!("shader background dropped while running, releasing GPU resources");
            if let Some(program) = self.program.take() {
                self.backend.delete_program(program);
            }
            self.backend.destroy_surface();
        }
    }
}

/// A backend that draws nothing.  Used when no GPU is available, e.g. by
/// the CLI.
#[derive(Debug, Default)]
pub struct NullBackend;

impl GpuBackend for NullBackend {
    type Error = std::convert::Infallible;
    type Program = ();

    fn create_surface(&mut self, _width: u32, _height: u32) -> Result<(), Self::Error> {
        Ok(())
    }

    fn compile_program(&mut self, _vs: &str, _fs: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    fn resize(&mut self, _width: u32, _height: u32) {}

    fn draw(&mut self, _program: &(), _uniforms: &Uniforms) -> Result<(), Self::Error> {
        Ok(())
    }

    fn delete_program(&mut self, _program: ()) {}

    fn destroy_surface(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Record-keeping mock backend.
    #[derive(Debug, Default)]
    struct RecorderGpu {
        calls: RefCell<Vec<String>>,
        drawn: RefCell<Vec<Uniforms>>,
        fail_compile: bool,
        live_programs: RefCell<u32>,
        surface: RefCell<Option<(u32, u32)>>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("recorder gpu error")]
    struct RecorderGpuErr;

    impl GpuBackend for RecorderGpu {
        type Error = RecorderGpuErr;
        type Program = u32;

        fn create_surface(&mut self, width: u32, height: u32) -> Result<(), RecorderGpuErr> {
            self.calls.borrow_mut().push(format!("create {}x{}", width, height));
            *self.surface.borrow_mut() = Some((width, height));
            Ok(())
        }

        fn compile_program(&mut self, vs: &str, fs: &str) -> Result<u32, RecorderGpuErr> {
            assert!(vs.contains("gl_Position"));
            assert!(fs.contains("uNoiseIntensity"));
            if self.fail_compile {
                return Err(RecorderGpuErr);
            }
            self.calls.borrow_mut().push("compile".into());
            *self.live_programs.borrow_mut() += 1;
            Ok(7)
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.calls.borrow_mut().push(format!("resize {}x{}", width, height));
            *self.surface.borrow_mut() = Some((width, height));
        }

        fn draw(&mut self, program: &u32, uniforms: &Uniforms) -> Result<(), RecorderGpuErr> {
            assert_eq!(*program, 7);
            self.drawn.borrow_mut().push(*uniforms);
            Ok(())
        }

        fn delete_program(&mut self, _program: u32) {
            self.calls.borrow_mut().push("delete".into());
            *self.live_programs.borrow_mut() -= 1;
        }

        fn destroy_surface(&mut self) {
            self.calls.borrow_mut().push("destroy".into());
            *self.surface.borrow_mut() = None;
        }
    }

    fn background() -> ShaderBackground<RecorderGpu> {
        ShaderBackground::new(RecorderGpu::default(), &SilkParams::default()).unwrap()
    }

    #[test]
    fn hex_colors() {
        let c = parse_hex_color("#555555").unwrap();
        assert!((c[0] - 85.0 / 255.0).abs() < 1e-6);
        assert_eq!(parse_hex_color("fff").unwrap(), [1.0, 1.0, 1.0]);
        assert_eq!(parse_hex_color("#000000").unwrap(), [0.0, 0.0, 0.0]);
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#zzzzzz").is_err());
    }

    #[test]
    fn invalid_color_is_rejected_up_front() {
        let params = SilkParams {
            color: "blue".into(),
            ..SilkParams::default()
        };
        assert!(matches!(
            ShaderBackground::new(RecorderGpu::default(), &params),
            Err(ShaderError::InvalidColor(_))
        ));
    }

    #[test]
    fn lifecycle() {
        let mut reg = ListenerRegistry::new();
        let mut bg = background();
        assert_eq!(bg.state(), ShaderState::Uninitialized);
        bg.frame(0.0);
        assert_eq!(bg.frames(), 0);

        bg.mount(&mut reg, 800, 600).unwrap();
        assert_eq!(bg.state(), ShaderState::Running);
        assert_eq!(reg.active(), 2);
        assert_eq!(bg.uniforms().resolution, [800.0, 600.0, 800.0 / 600.0]);

        bg.frame(10.0);
        bg.frame(10.5);
        assert_eq!(bg.frames(), 2);

        bg.unmount(&mut reg);
        assert_eq!(bg.state(), ShaderState::Disposed);
        assert_eq!(reg.active(), 0);
        assert_eq!(*bg.backend().live_programs.borrow(), 0);
        assert!(bg.backend().surface.borrow().is_none());
    }

    #[test]
    fn resize_keeps_time_running() {
        let mut reg = ListenerRegistry::new();
        let mut bg = background();
        bg.mount(&mut reg, 800, 600).unwrap();
        bg.frame(100.0);
        bg.frame(101.0);
        bg.resize(400, 200);
        bg.frame(102.0);

        let drawn = bg.backend().drawn.borrow();
        let times: Vec<f32> = drawn.iter().map(|u| u.time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0]);
        assert_eq!(drawn[2].resolution, [400.0, 200.0, 2.0]);
        assert_eq!(*bg.backend().surface.borrow(), Some((400, 200)));
        assert_eq!(
            bg.backend().calls.borrow().iter().filter(|c| *c == "compile").count(),
            1
        );
        drop(drawn);
        bg.unmount(&mut reg);
    }

    #[test]
    fn no_remount_after_dispose() {
        let mut reg = ListenerRegistry::new();
        let mut bg = background();
        bg.mount(&mut reg, 800, 600).unwrap();
        bg.unmount(&mut reg);
        assert_eq!(bg.mount(&mut reg, 800, 600), Err(ShaderError::Disposed));
        assert_eq!(bg.state(), ShaderState::Disposed);
        bg.frame(1.0);
        bg.resize(10, 10);
        assert_eq!(bg.frames(), 0);
        assert_eq!(reg.active(), 0);
    }

    #[test]
    fn unmount_before_mount_disposes() {
        let mut reg = ListenerRegistry::new();
        let mut bg = background();
        bg.unmount(&mut reg);
        assert_eq!(bg.state(), ShaderState::Disposed);
        assert!(bg.backend().calls.borrow().is_empty());
    }

    #[test]
    fn failed_compile_releases_the_surface() {
        let mut reg = ListenerRegistry::new();
        let gpu = RecorderGpu {
            fail_compile: true,
            ..RecorderGpu::default()
        };
        let mut bg = ShaderBackground::new(gpu, &SilkParams::default()).unwrap();
        let err = bg.mount(&mut reg, 800, 600).unwrap_err();
        assert!(matches!(err, ShaderError::Backend(_)));
        assert_eq!(bg.state(), ShaderState::Disposed);
        assert!(bg.backend().surface.borrow().is_none());
        assert_eq!(reg.active(), 0);
    }

    #[test]
    fn mount_twice_is_a_no_op() {
        let mut reg = ListenerRegistry::new();
        let mut bg = background();
        bg.mount(&mut reg, 800, 600).unwrap();
        bg.mount(&mut reg, 800, 600).unwrap();
        assert_eq!(reg.active(), 2);
        assert_eq!(
            bg.backend().calls.borrow().iter().filter(|c| *c == "compile").count(),
            1
        );
        bg.unmount(&mut reg);
    }
}
