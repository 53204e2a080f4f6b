use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::config::ServiceSettings;
use crate::detect::result::DetectionBatch;

use super::service::{DetectionRequest, DetectionService};
use super::services::FixedDetectionService;

/// Shared handle to a registered service.
pub type SharedService = Arc<Mutex<dyn DetectionService>>;

/// Thread-safe registry of detection services.
///
/// Services are wrapped in `Mutex` because `DetectionService::detect` takes `&mut self`.
pub struct ServiceRegistry {
    services: HashMap<String, SharedService>,
    default_name: Option<String>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
            default_name: None,
        }
    }

    /// Registry with both mock presets and, when a URL is configured, the HTTP service.
    /// The configured default is selected last.
    pub fn from_settings(settings: &ServiceSettings) -> Result<Self> {
        let mut registry = Self::new();
        let mut upload = FixedDetectionService::upload();
        let mut webcam = FixedDetectionService::webcam();
        if let Some(delay) = settings.mock_delay {
            upload = upload.with_delay(delay);
            webcam = webcam.with_delay(delay);
        }
        registry.register(upload);
        registry.register(webcam);

        if let Some(url) = &settings.url {
            #[cfg(feature = "detect-http")]
            {
                let http = super::services::HttpDetectionService::new(
                    super::services::HttpConfig {
                        url: url.clone(),
                        timeout: settings.timeout,
                    },
                )?;
                registry.register(http);
            }
            #[cfg(not(feature = "detect-http"))]
            {
                return Err(anyhow!(
                    "detection service url '{}' requires the detect-http feature",
                    url
                ));
            }
        }

        registry.set_default(&settings.default)?;
        Ok(registry)
    }

    /// Register a service. The first registered service becomes the default.
    pub fn register<S: DetectionService + 'static>(&mut self, service: S) {
        let name = service.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.services.insert(name, Arc::new(Mutex::new(service)));
    }

    /// Set default service by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.services.contains_key(name) {
            return Err(anyhow!(
                "detection service '{}' not registered (available: {})",
                name,
                self.list().join(", ")
            ));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    /// Get service by name.
    pub fn get(&self, name: &str) -> Option<SharedService> {
        self.services.get(name).cloned()
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    /// Get default service.
    pub fn default_service(&self) -> Option<SharedService> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// Registered service names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.keys().cloned().collect();
        names.sort();
        names
    }

    /// Run detection with the named service, or the default when `name` is `None`.
    pub fn detect(&self, name: Option<&str>, request: &DetectionRequest) -> Result<DetectionBatch> {
        let service = match name {
            Some(name) => self
                .get(name)
                .ok_or_else(|| anyhow!("detection service '{}' not registered", name))?,
            None => self
                .default_service()
                .ok_or_else(|| anyhow!("no detection service registered"))?,
        };
        let mut guard = service
            .lock()
            .map_err(|_| anyhow!("detection service lock poisoned"))?;
        guard.detect(request)
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::services::{UPLOAD_SERVICE_NAME, WEBCAM_SERVICE_NAME};
    use std::time::Duration;

    fn settings(default: &str) -> ServiceSettings {
        ServiceSettings {
            default: default.to_string(),
            url: None,
            timeout: Duration::from_secs(1),
            mock_delay: Some(Duration::ZERO),
        }
    }

    #[test]
    fn first_registered_is_default() {
        let mut registry = ServiceRegistry::new();
        registry.register(FixedDetectionService::webcam());
        registry.register(FixedDetectionService::upload());
        assert_eq!(registry.default_name(), Some(WEBCAM_SERVICE_NAME));
        assert_eq!(
            registry.list(),
            vec![UPLOAD_SERVICE_NAME.to_string(), WEBCAM_SERVICE_NAME.to_string()]
        );
    }

    #[test]
    fn from_settings_selects_configured_default() {
        let registry = ServiceRegistry::from_settings(&settings(WEBCAM_SERVICE_NAME)).unwrap();
        assert_eq!(registry.default_name(), Some(WEBCAM_SERVICE_NAME));

        let batch = registry
            .detect(None, &DetectionRequest::jpeg(vec![1, 2, 3]))
            .unwrap();
        assert_eq!(batch.detections[0].confidence, 0.89);

        let batch = registry
            .detect(Some(UPLOAD_SERVICE_NAME), &DetectionRequest::jpeg(vec![1]))
            .unwrap();
        assert_eq!(batch.detections[0].confidence, 0.92);
    }

    #[test]
    fn unknown_default_is_an_error() {
        assert!(ServiceRegistry::from_settings(&settings("yolo")).is_err());
        let registry = ServiceRegistry::new();
        assert!(registry
            .detect(Some("missing"), &DetectionRequest::jpeg(vec![1]))
            .is_err());
        assert!(registry.detect(None, &DetectionRequest::jpeg(vec![1])).is_err());
    }
}
