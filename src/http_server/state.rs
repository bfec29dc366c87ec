use crate::services::auto_sync::AutoSyncController;
use crate::services::jobs::executor::JobExecutor;

pub struct AppState {
    pub executor: JobExecutor,
    pub auto_sync: AutoSyncController,
}
