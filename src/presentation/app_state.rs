// Application state for HTTP handlers
use crate::application::station_service::StationService;

#[derive(Clone)]
pub struct AppState {
    pub station: StationService,
}
