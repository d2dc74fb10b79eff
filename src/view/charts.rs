use serde::Serialize;
use serde_json::Value;
use tracing::debug;

pub type ChartId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChartLibrary {
    /// Bar, line and radar charts (`new Chart(ctx, config)`).
    ChartJs,
    /// Time-series figures (`Plotly.newPlot(el, data, layout, config)`).
    Plotly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub library: ChartLibrary,
    pub config: Value,
}

impl ChartSpec {
    pub fn new(library: ChartLibrary, config: Value) -> Self {
        Self { library, config }
    }
}

/// The charting library: creates instances bound to a canvas and disposes of
/// them.
#[cfg_attr(test, mockall::automock)]
pub trait ChartSurface {
    fn create(&mut self, canvas: &str, spec: ChartSpec) -> ChartId;
    fn destroy(&mut self, id: ChartId);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveChart {
    pub id: ChartId,
    pub canvas: String,
    pub spec: ChartSpec,
}

/// In-memory surface holding every live instance of one page.
#[derive(Debug, Default)]
pub struct ChartRegistry {
    next_id: ChartId,
    live: Vec<LiveChart>,
}

impl ChartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> &[LiveChart] {
        &self.live
    }

    pub fn live_on(&self, canvas: &str) -> usize {
        self.live.iter().filter(|c| c.canvas == canvas).count()
    }

    pub fn on_canvas(&self, canvas: &str) -> Option<&LiveChart> {
        self.live.iter().find(|c| c.canvas == canvas)
    }
}

impl ChartSurface for ChartRegistry {
    fn create(&mut self, canvas: &str, spec: ChartSpec) -> ChartId {
        self.next_id += 1;
        let id = self.next_id;
        debug!("Chart {} created on #{}", id, canvas);
        self.live.push(LiveChart {
            id,
            canvas: canvas.to_string(),
            spec,
        });
        id
    }

    fn destroy(&mut self, id: ChartId) {
        self.live.retain(|c| c.id != id);
        debug!("Chart {} destroyed", id);
    }
}

/// Owns at most one live instance on its canvas.
#[derive(Debug)]
pub struct ChartHandle {
    canvas: &'static str,
    instance: Option<ChartId>,
}

impl ChartHandle {
    pub fn new(canvas: &'static str) -> Self {
        Self {
            canvas,
            instance: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.instance.is_some()
    }

    /// Destroys the current instance, if any, then creates one from `spec`.
    pub fn replace<S: ChartSurface>(&mut self, surface: &mut S, spec: ChartSpec) -> ChartId {
        self.dispose(surface);
        let id = surface.create(self.canvas, spec);
        self.instance = Some(id);
        id
    }

    pub fn dispose<S: ChartSurface>(&mut self, surface: &mut S) {
        if let Some(id) = self.instance.take() {
            surface.destroy(id);
        }
    }
}
