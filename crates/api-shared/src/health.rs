use crate::dto::HealthRes;

/// Liveness check shared by every front end.
#[derive(Clone, Debug, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Reports the service as healthy along with the crate version.
    pub fn check_health() -> HealthRes {
        HealthRes {
            status: "healthy".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_healthy() {
        let res = HealthService::check_health();
        assert_eq!(res.status, "healthy");
        assert!(!res.version.is_empty());
    }
}
