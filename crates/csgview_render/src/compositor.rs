//! Multi-pass CSG compositor
//!
//! [`render_chain`] walks a flattened sequence run by run. Runs of a single
//! solid are drawn directly; longer runs are first composited into the depth
//! buffer by the backend, then colored with a depth `Equal` pass that only
//! touches the surviving fragments.
//!
//! The GPU state machine is hidden behind [`CsgBackend`] so the algorithm can
//! be driven against the wgpu backend or a recording backend in tests.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use csgview_core::{
    segment, ChainKind, ColorPair, ColorScheme, FlattenedEntry, Mat4, SurfaceMode, TriangleMesh,
};

/// Depth comparison used by surface passes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DepthFunc {
    /// Normal rendering
    #[default]
    LessEqual,
    /// Only fragments exactly on the composited depth
    Equal,
}

/// Shading program bound for a run's color pass
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShadingProgram {
    /// Lit faces with highlighted polygon edges
    Edge,
    /// Lit faces
    Lit,
    /// Flat face color
    Unlit,
}

impl ShadingProgram {
    /// Program for a draw with the given edge setting and capability
    pub fn select(show_edges: bool, shading_capable: bool) -> Self {
        match (show_edges, shading_capable) {
            (true, true) => ShadingProgram::Edge,
            (false, true) => ShadingProgram::Lit,
            (_, false) => ShadingProgram::Unlit,
        }
    }
}

/// Error compositing one run
#[derive(Debug, Clone, PartialEq)]
pub enum CompositeError {
    /// Composite called outside `begin_run`/`end_run`
    NoActiveRun,
    /// The run is longer than the reserved transient slots
    SlotsExhausted { needed: usize, reserved: usize },
    /// The backend rejected the passes
    Backend(String),
}

impl std::fmt::Display for CompositeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompositeError::NoActiveRun => write!(f, "no active run"),
            CompositeError::SlotsExhausted { needed, reserved } => {
                write!(f, "run needs {} slots but only {} are reserved", needed, reserved)
            }
            CompositeError::Backend(msg) => write!(f, "backend error: {}", msg),
        }
    }
}

impl std::error::Error for CompositeError {}

/// GPU operations the compositing algorithm relies on
pub trait CsgBackend {
    /// Start a run of `len` solids; transient per-solid state is acquired here
    fn begin_run(&mut self, len: usize);

    /// Leave the visible surface of the run's boolean result in the depth buffer
    fn composite(&mut self, run: &[FlattenedEntry], kind: ChainKind) -> Result<(), CompositeError>;

    /// Depth comparison for subsequent surface draws
    fn set_depth_func(&mut self, func: DepthFunc);

    /// Bind a shading program (`None` unbinds)
    fn use_program(&mut self, program: Option<ShadingProgram>);

    /// Face and edge colors for subsequent surface draws
    fn set_color(&mut self, colors: ColorPair);

    /// Rasterize a solid's surface
    fn render_surface(&mut self, mesh: &Arc<TriangleMesh>, transform: &Mat4, mode: SurfaceMode);

    /// Finish the run, releasing transient state
    fn end_run(&mut self);
}

/// Scoped run on a backend
///
/// Dropping the scope restores `LessEqual` and ends the run, also when the
/// color pass is skipped.
pub struct RunScope<'a, B: CsgBackend + ?Sized> {
    backend: &'a mut B,
}

impl<'a, B: CsgBackend + ?Sized> RunScope<'a, B> {
    pub fn begin(backend: &'a mut B, len: usize) -> Self {
        backend.begin_run(len);
        Self { backend }
    }
}

impl<B: CsgBackend + ?Sized> Deref for RunScope<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.backend
    }
}

impl<B: CsgBackend + ?Sized> DerefMut for RunScope<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.backend
    }
}

impl<B: CsgBackend + ?Sized> Drop for RunScope<'_, B> {
    fn drop(&mut self) {
        self.backend.set_depth_func(DepthFunc::LessEqual);
        self.backend.end_run();
    }
}

/// Counts for one sequence
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChainStats {
    /// Runs processed
    pub runs: usize,
    /// Runs of a single solid drawn without compositing
    pub fast_path: usize,
    /// Runs composited successfully
    pub composited: usize,
    /// Runs whose compositing failed (color pass skipped)
    pub failed: usize,
}

impl std::ops::AddAssign for ChainStats {
    fn add_assign(&mut self, other: Self) {
        self.runs += other.runs;
        self.fast_path += other.fast_path;
        self.composited += other.composited;
        self.failed += other.failed;
    }
}

/// Draw one flattened sequence
///
/// `program` is bound for every color pass; `None` draws without one.
pub fn render_chain<B: CsgBackend + ?Sized>(
    backend: &mut B,
    entries: &[FlattenedEntry],
    kind: ChainKind,
    program: Option<ShadingProgram>,
    scheme: &ColorScheme,
) -> ChainStats {
    let mut stats = ChainStats::default();

    for run in segment::runs(entries) {
        stats.runs += 1;
        let slice = &entries[run.range()];
        let mut scope = RunScope::begin(backend, run.len());

        if run.is_single() {
            stats.fast_path += 1;
        } else {
            match scope.composite(slice, kind) {
                Ok(()) => {
                    stats.composited += 1;
                    scope.set_depth_func(DepthFunc::Equal);
                }
                Err(e) => {
                    log::warn!("Skipping run [{}, {}): compositing failed: {}", run.start, run.end, e);
                    stats.failed += 1;
                    continue;
                }
            }
        }

        scope.use_program(program);
        for entry in slice {
            scope.set_color(scheme.resolve(entry.color, kind, entry.operation));
            scope.render_surface(
                &entry.solid,
                &entry.transform,
                SurfaceMode::for_entry(kind, entry.operation),
            );
        }
        scope.use_program(None);
    }

    log::debug!(
        "{:?} sequence: {} runs ({} direct, {} composited, {} failed)",
        kind,
        stats.runs,
        stats.fast_path,
        stats.composited,
        stats.failed
    );
    stats
}
