use std::sync::Arc;

use crate::calendar::CalendarLayout;
use crate::services::SessionService;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionService>,
    pub calendar: CalendarLayout,
}
