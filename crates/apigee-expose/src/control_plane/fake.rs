//! Scripted in-memory control plane for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::traits::{
    Address, ApigeeInstance, CertificateStatus, ControlPlane, Operation, OperationRef,
    OperationState, PscNegRequest, SslCertificate,
};
use crate::error::ExposeError;

/// Control plane whose status lookups replay scripted responses.
///
/// Mutations always succeed and return a fresh Apigee operation handle named
/// after the call. Every call is recorded.
pub(crate) struct FakeControlPlane {
    operation_states: Mutex<VecDeque<Result<OperationState, ExposeError>>>,
    certificate_states: Mutex<VecDeque<CertificateStatus>>,
    operation_error: Mutex<Option<String>>,
    instances: Vec<ApigeeInstance>,
    ip: String,
    calls: Mutex<Vec<String>>,
}

impl FakeControlPlane {
    pub(crate) fn new() -> Self {
        Self {
            operation_states: Mutex::new(VecDeque::new()),
            certificate_states: Mutex::new(VecDeque::new()),
            operation_error: Mutex::new(None),
            instances: vec![ApigeeInstance {
                name: "eval-instance".into(),
                location: "us-central1".into(),
                host: Some("10.0.0.2".into()),
                service_attachment: Some(
                    "projects/tenant/regions/us-central1/serviceAttachments/apigee-sa".into(),
                ),
            }],
            ip: "34.1.2.3".into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue operation states returned by successive `get_operation` calls.
    /// Once drained, operations report `Finished`.
    pub(crate) fn with_operation_states(self, states: &[OperationState]) -> Self {
        self.operation_states
            .lock()
            .unwrap()
            .extend(states.iter().copied().map(Ok));
        self
    }

    /// Queue a failing status lookup.
    pub(crate) fn with_operation_failure(self, error: ExposeError) -> Self {
        self.operation_states.lock().unwrap().push_back(Err(error));
        self
    }

    /// Make finished operations carry an error.
    pub(crate) fn with_operation_error(self, message: &str) -> Self {
        *self.operation_error.lock().unwrap() = Some(message.to_string());
        self
    }

    /// Queue certificate statuses. Once drained, certificates report `Active`.
    pub(crate) fn with_certificate_states(self, states: &[CertificateStatus]) -> Self {
        self.certificate_states
            .lock()
            .unwrap()
            .extend(states.iter().cloned());
        self
    }

    pub(crate) fn without_instances(mut self) -> Self {
        self.instances.clear();
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn started(&self, call: &str) -> Result<OperationRef, ExposeError> {
        self.record(call);
        Ok(OperationRef::Apigee {
            id: format!("{call}-op"),
        })
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn get_operation(&self, operation: &OperationRef) -> Result<Operation, ExposeError> {
        self.record("get_operation");
        let next = self.operation_states.lock().unwrap().pop_front();
        let state = next.unwrap_or(Ok(OperationState::Finished))?;
        let error = if state == OperationState::Finished {
            self.operation_error.lock().unwrap().clone()
        } else {
            None
        };
        Ok(Operation {
            reference: operation.clone(),
            state,
            error,
        })
    }

    async fn list_instances(&self) -> Result<Vec<ApigeeInstance>, ExposeError> {
        self.record("list_instances");
        Ok(self.instances.clone())
    }

    async fn get_instance(&self, name: &str) -> Result<ApigeeInstance, ExposeError> {
        self.record("get_instance");
        self.instances
            .iter()
            .find(|i| i.name == name)
            .cloned()
            .ok_or_else(|| ExposeError::NotFound(name.to_string()))
    }

    async fn create_environment(&self, _name: &str) -> Result<OperationRef, ExposeError> {
        self.started("create_environment")
    }

    async fn attach_environment_to_instance(
        &self,
        _instance: &str,
        _environment: &str,
    ) -> Result<OperationRef, ExposeError> {
        self.started("attach_environment_to_instance")
    }

    async fn create_environment_group(
        &self,
        _name: &str,
        hostnames: &[String],
    ) -> Result<OperationRef, ExposeError> {
        self.record(&format!("hostnames={}", hostnames.join(",")));
        self.started("create_environment_group")
    }

    async fn attach_environment_to_group(
        &self,
        _group: &str,
        _environment: &str,
    ) -> Result<OperationRef, ExposeError> {
        self.started("attach_environment_to_group")
    }

    async fn reserve_global_address(&self, _name: &str) -> Result<OperationRef, ExposeError> {
        self.started("reserve_global_address")
    }

    async fn get_global_address(&self, name: &str) -> Result<Address, ExposeError> {
        self.record("get_global_address");
        Ok(Address {
            name: name.to_string(),
            address: Some(self.ip.clone()),
            status: "RESERVED".into(),
        })
    }

    async fn create_managed_certificate(
        &self,
        _name: &str,
        _domains: &[String],
    ) -> Result<OperationRef, ExposeError> {
        self.started("create_managed_certificate")
    }

    async fn get_ssl_certificate(&self, name: &str) -> Result<SslCertificate, ExposeError> {
        self.record("get_ssl_certificate");
        let status = self
            .certificate_states
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(CertificateStatus::Active);
        Ok(SslCertificate {
            name: name.to_string(),
            status,
            domains: Vec::new(),
        })
    }

    async fn create_psc_neg(&self, req: &PscNegRequest) -> Result<OperationRef, ExposeError> {
        self.record(&format!("neg_target={}", req.target_service));
        self.started("create_psc_neg")
    }

    async fn create_backend_service(&self, _name: &str) -> Result<OperationRef, ExposeError> {
        self.started("create_backend_service")
    }

    async fn add_backend(
        &self,
        _backend_service: &str,
        _neg: &str,
        _region: &str,
    ) -> Result<OperationRef, ExposeError> {
        self.started("add_backend")
    }

    async fn create_url_map(
        &self,
        _name: &str,
        _default_service: &str,
    ) -> Result<OperationRef, ExposeError> {
        self.started("create_url_map")
    }

    async fn create_https_proxy(
        &self,
        _name: &str,
        _url_map: &str,
        _certificate: &str,
    ) -> Result<OperationRef, ExposeError> {
        self.started("create_https_proxy")
    }

    async fn create_forwarding_rule(
        &self,
        _name: &str,
        address: &str,
        _proxy: &str,
    ) -> Result<OperationRef, ExposeError> {
        self.record(&format!("forwarding_address={address}"));
        self.started("create_forwarding_rule")
    }
}
