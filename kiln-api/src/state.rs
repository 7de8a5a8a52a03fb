use std::sync::Arc;

use kiln_staging::PricingWorkflow;

#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<PricingWorkflow>,
}
