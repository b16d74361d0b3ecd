// Application state for HTTP handlers
use crate::application::plot_data_source::PlotDataSource;

#[derive(Clone)]
pub struct AppState {
    pub plot: PlotDataSource,
}
