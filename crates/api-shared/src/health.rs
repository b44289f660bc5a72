use crate::dto::HealthRes;

/// Health responses for the REST API.
///
/// Storage reachability is checked by the caller; this only shapes the response.
pub struct HealthService;

impl HealthService {
    /// Health response for a reachable storage backend.
    pub fn ready() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Ready!!".into(),
        }
    }

    /// Health response for an unreachable storage backend.
    pub fn unavailable() -> HealthRes {
        HealthRes {
            ok: false,
            message: "Internal Server Error".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_and_unavailable_flags() {
        assert!(HealthService::ready().ok);
        assert!(!HealthService::unavailable().ok);
    }
}
