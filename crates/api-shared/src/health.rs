use crate::dto::{HealthRes, RootRes};

/// Message returned by the root liveness route.
pub const ROOT_MESSAGE: &str = "Prescription Analysis API is running";

/// Simple health service shared by the REST API and the CLI.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Creates a new instance of HealthService.
    pub fn new() -> Self {
        Self
    }

    /// Report the service as healthy. The process only answers once startup has completed.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "rxcheck is alive".into(),
        }
    }

    /// Body of the root liveness route.
    pub fn root() -> RootRes {
        RootRes {
            message: ROOT_MESSAGE.into(),
        }
    }
}
