//! Entry point for drawing a CSG scene
//!
//! [`CsgRenderer`] holds the flattened sequences of one scene and draws them
//! on any [`CsgBackend`]: primary objects first, then background, then
//! highlights.

use csgview_core::{ChainKind, ColorScheme, CsgChain};

use crate::capability::CapabilityRecord;
use crate::compositor::{render_chain, ChainStats, CsgBackend, ShadingProgram};

/// Counts for one call to [`CsgRenderer::draw`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub primary: ChainStats,
    pub background: ChainStats,
    pub highlights: ChainStats,
    /// Nothing was drawn because the context cannot composite
    pub skipped: bool,
}

impl DrawStats {
    /// Sum over all sequences
    pub fn total(&self) -> ChainStats {
        let mut total = self.primary;
        total += self.background;
        total += self.highlights;
        total
    }
}

/// Draws the sequences of one scene
pub struct CsgRenderer {
    primary: CsgChain,
    highlights: Option<CsgChain>,
    background: Option<CsgChain>,
    scheme: ColorScheme,
    capabilities: CapabilityRecord,
}

impl CsgRenderer {
    /// Renderer for `primary` on a context with the given capabilities
    pub fn new(primary: CsgChain, capabilities: CapabilityRecord) -> Self {
        Self {
            primary,
            highlights: None,
            background: None,
            scheme: ColorScheme::default(),
            capabilities,
        }
    }

    /// Set the highlighted sequence (drawn last)
    pub fn with_highlights(mut self, chain: CsgChain) -> Self {
        self.highlights = Some(chain);
        self
    }

    /// Set the background sequence
    pub fn with_background(mut self, chain: CsgChain) -> Self {
        self.background = Some(chain);
        self
    }

    pub fn with_scheme(mut self, scheme: ColorScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn primary(&self) -> &CsgChain {
        &self.primary
    }

    pub fn capabilities(&self) -> &CapabilityRecord {
        &self.capabilities
    }

    /// Program bound for the color passes
    pub fn program(&self, show_edges: bool) -> ShadingProgram {
        ShadingProgram::select(show_edges, self.capabilities.is_shading_capable())
    }

    /// Draw every sequence
    ///
    /// Faces are always drawn; `_show_faces` is accepted for symmetry with
    /// other renderers. `show_edges` selects the edge program when it is
    /// available.
    pub fn draw<B: CsgBackend + ?Sized>(&self, backend: &mut B, _show_faces: bool, show_edges: bool) -> DrawStats {
        if !self.capabilities.is_compositing_capable() {
            log::warn!("Context cannot composite CSG; nothing drawn");
            return DrawStats {
                skipped: true,
                ..DrawStats::default()
            };
        }

        let program = Some(self.program(show_edges));
        let mut stats = DrawStats {
            primary: render_chain(backend, self.primary.entries(), ChainKind::Normal, program, &self.scheme),
            ..DrawStats::default()
        };
        if let Some(chain) = &self.background {
            stats.background = render_chain(backend, chain.entries(), ChainKind::Background, program, &self.scheme);
        }
        if let Some(chain) = &self.highlights {
            stats.highlights = render_chain(backend, chain.entries(), ChainKind::Highlight, program, &self.scheme);
        }

        let total = stats.total();
        log::debug!(
            "Drew {} runs ({} direct, {} composited, {} failed)",
            total.runs,
            total.fast_path,
            total.composited,
            total.failed
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_sums_sequences() {
        let stats = DrawStats {
            primary: ChainStats { runs: 2, fast_path: 1, composited: 1, failed: 0 },
            highlights: ChainStats { runs: 1, fast_path: 1, ..Default::default() },
            ..Default::default()
        };
        assert_eq!(stats.total(), ChainStats { runs: 3, fast_path: 2, composited: 1, failed: 0 });
    }

    #[test]
    fn test_incapable_context_skips() {
        struct Unreachable;
        impl CsgBackend for Unreachable {
            fn begin_run(&mut self, _len: usize) {
                panic!("backend must not be touched");
            }
            fn composite(
                &mut self,
                _run: &[csgview_core::FlattenedEntry],
                _kind: ChainKind,
            ) -> Result<(), crate::compositor::CompositeError> {
                unreachable!()
            }
            fn set_depth_func(&mut self, _func: crate::compositor::DepthFunc) {}
            fn use_program(&mut self, _program: Option<ShadingProgram>) {}
            fn set_color(&mut self, _colors: csgview_core::ColorPair) {}
            fn render_surface(
                &mut self,
                _mesh: &std::sync::Arc<csgview_core::TriangleMesh>,
                _transform: &csgview_core::Mat4,
                _mode: csgview_core::SurfaceMode,
            ) {
            }
            fn end_run(&mut self) {}
        }

        let renderer = CsgRenderer::new(CsgChain::new(), CapabilityRecord::default());
        let stats = renderer.draw(&mut Unreachable, true, true);
        assert!(stats.skipped);
        assert_eq!(stats.total(), ChainStats::default());
    }
}
