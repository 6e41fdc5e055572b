//! Service operations of the gateway.

use tracing::{info, warn};

use super::CfGateway;
use crate::application::ports::{ControlPlane, PlatformSession, ServiceGateway};
use crate::domain::{
    ActivationError, LastOperation, ManagedService, ResourceKind, UserProvidedService,
};

impl<P: ControlPlane, A> ServiceGateway for CfGateway<P, A> {
    async fn service_exists(&self, space: &str, name: &str) -> Result<bool, ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::Service, name, action);
        let session = self.open(Some(space)).await.map_err(fault("inspect"))?;
        match session.service(name).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(fault("inspect")(err)),
        }
    }

    async fn create_user_provided_service(
        &self,
        service: &UserProvidedService,
    ) -> Result<(), ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::Service, &service.name, action);
        let session = self.open(Some(&service.space)).await.map_err(fault("create"))?;
        session
            .create_user_provided_service(service)
            .await
            .map_err(fault("create"))?;
        info!(service = %service.name, "user-provided service registered");
        Ok(())
    }

    async fn create_managed_service(&self, service: &ManagedService) -> Result<(), ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::Service, &service.name, action);
        let session = self.open(Some(&service.space)).await.map_err(fault("create"))?;
        session
            .create_service(service)
            .await
            .map_err(fault("create"))?;
        info!(service = %service.name, plan = %service.plan, "managed service requested from broker");
        Ok(())
    }

    async fn delete_service(&self, space: &str, name: &str) -> Result<(), ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::Service, name, action);
        let session = self.open(Some(space)).await.map_err(fault("delete"))?;
        match session.delete_service(name).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => {
                warn!(service = %name, "service already gone");
                Ok(())
            }
            Err(err) => Err(fault("delete")(err)),
        }
    }

    async fn last_operation(
        &self,
        space: &str,
        name: &str,
    ) -> Result<Option<LastOperation>, ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::Service, name, action);
        let session = self.open(Some(space)).await.map_err(fault("inspect"))?;
        match session.service(name).await {
            Ok(record) => {
                if record.last_operation.is_none() {
                    info!(service = %name, "service reports no last operation");
                }
                Ok(record.last_operation)
            }
            Err(err) if err.is_not_found() => {
                info!(service = %name, "service instance not found");
                Ok(None)
            }
            Err(err) => Err(fault("inspect")(err)),
        }
    }

    async fn list_services(&self, space: &str) -> Result<Vec<String>, ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::Space, space, action);
        let session = self.open(Some(space)).await.map_err(fault("list services of"))?;
        let records = session.services().await.map_err(fault("list services of"))?;
        Ok(records.into_iter().map(|r| r.name).collect())
    }

    async fn is_service_bound(
        &self,
        space: &str,
        app: &str,
        service: &str,
    ) -> Result<bool, ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::Service, service, action);
        let session = self.open(Some(space)).await.map_err(fault("inspect"))?;
        match session.service(service).await {
            Ok(record) => Ok(record.bound_apps.iter().any(|bound| bound == app)),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(fault("inspect")(err)),
        }
    }

    async fn bind_service(
        &self,
        space: &str,
        app: &str,
        service: &str,
    ) -> Result<(), ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::Service, service, action);
        let session = self.open(Some(space)).await.map_err(fault("bind"))?;
        session
            .bind_service(app, service)
            .await
            .map_err(fault("bind"))
    }

    async fn unbind_service(
        &self,
        space: &str,
        app: &str,
        service: &str,
    ) -> Result<(), ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::Service, service, action);
        let session = self.open(Some(space)).await.map_err(fault("unbind"))?;
        session
            .unbind_service(app, service)
            .await
            .map_err(fault("unbind"))
    }
}
