//! Space operations of the gateway. All calls are organization-scoped.

use tracing::warn;

use super::CfGateway;
use crate::application::ports::{ControlPlane, PlatformSession, SpaceGateway};
use crate::domain::{ActivationError, ResourceKind, SpaceRole};

impl<P: ControlPlane, A> SpaceGateway for CfGateway<P, A> {
    async fn space_exists(&self, name: &str) -> Result<bool, ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::Space, name, action);
        let session = self.open(None).await.map_err(fault("inspect"))?;
        let spaces = session.spaces().await.map_err(fault("inspect"))?;
        Ok(spaces.iter().any(|s| s == name))
    }

    async fn create_space(&self, name: &str) -> Result<(), ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::Space, name, action);
        let session = self.open(None).await.map_err(fault("create"))?;
        session.create_space(name).await.map_err(fault("create"))
    }

    async fn delete_space(&self, name: &str) -> Result<(), ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::Space, name, action);
        let session = self.open(None).await.map_err(fault("delete"))?;
        match session.delete_space(name).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => {
                warn!(space = %name, "space already gone");
                Ok(())
            }
            Err(err) => Err(fault("delete")(err)),
        }
    }

    async fn associate_role(&self, space: &str, role: SpaceRole) -> Result<(), ActivationError> {
        let fault = |action| ActivationError::platform(ResourceKind::Space, space, action);
        let session = self.open(None).await.map_err(fault("grant role on"))?;
        session
            .associate_role(space, &self.settings.email, role)
            .await
            .map_err(fault("grant role on"))
    }
}
