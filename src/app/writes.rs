use std::sync::Arc;

use crate::adapters::gateway::{
    ADMIN_LOGS_PATH, GatewayError, HttpGateway, SITES_PATH, VEHICLES_PATH,
};
use crate::app::sync::ConfirmedWrites;
use crate::domain::live_collection::Reconciliation;
use crate::domain::models::{LogEntry, Site, Vehicle};
use crate::domain::validation::{AdminLogDraft, AdminLogEdit, SiteDraft, VehicleDraft};

/// Write handles for the collections mounted by the runtime.
#[derive(Clone)]
pub struct LiveWrites {
    pub vehicles: ConfirmedWrites<Vehicle>,
    pub sites: ConfirmedWrites<Site>,
    pub admin_logs: ConfirmedWrites<LogEntry>,
}

/// Sends a write to the backend and, once it succeeds, applies the returned
/// record to the local collection. The later push echo is then a no-op.
pub struct RecordWriter {
    gateway: Arc<HttpGateway>,
    live: LiveWrites,
}

impl RecordWriter {
    pub fn new(gateway: Arc<HttpGateway>, live: LiveWrites) -> Self {
        Self { gateway, live }
    }

    pub fn create_vehicle(&self, draft: VehicleDraft) -> Result<Vehicle, GatewayError> {
        let vehicle = self.gateway.create_vehicle(draft)?;
        applied("vehicles", &vehicle.id, self.live.vehicles.created(vehicle.clone()));
        Ok(vehicle)
    }

    pub fn update_vehicle(&self, id: &str, draft: VehicleDraft) -> Result<Vehicle, GatewayError> {
        let vehicle = self.gateway.update_vehicle(id, draft)?;
        applied("vehicles", &vehicle.id, self.live.vehicles.updated(vehicle.clone()));
        Ok(vehicle)
    }

    pub fn delete_vehicle(&self, id: &str) -> Result<(), GatewayError> {
        self.gateway.delete(VEHICLES_PATH, id)?;
        applied("vehicles", id, self.live.vehicles.deleted(id));
        Ok(())
    }

    pub fn create_site(&self, draft: &SiteDraft) -> Result<Site, GatewayError> {
        let site = self.gateway.create_site(draft)?;
        applied("sites", &site.id, self.live.sites.created(site.clone()));
        Ok(site)
    }

    pub fn update_site(&self, id: &str, draft: &SiteDraft) -> Result<Site, GatewayError> {
        let site = self.gateway.update_site(id, draft)?;
        applied("sites", &site.id, self.live.sites.updated(site.clone()));
        Ok(site)
    }

    pub fn delete_site(&self, id: &str) -> Result<(), GatewayError> {
        self.gateway.delete(SITES_PATH, id)?;
        applied("sites", id, self.live.sites.deleted(id));
        Ok(())
    }

    pub fn create_admin_log(&self, draft: &AdminLogDraft) -> Result<LogEntry, GatewayError> {
        let entry = self.gateway.create_admin_log(draft)?;
        applied("admin-truck-logs", &entry.id, self.live.admin_logs.created(entry.clone()));
        Ok(entry)
    }

    pub fn update_admin_log(&self, id: &str, edit: &AdminLogEdit) -> Result<LogEntry, GatewayError> {
        let entry = self.gateway.update_admin_log(id, edit)?;
        applied("admin-truck-logs", &entry.id, self.live.admin_logs.updated(entry.clone()));
        Ok(entry)
    }

    pub fn delete_admin_log(&self, id: &str) -> Result<(), GatewayError> {
        self.gateway.delete(ADMIN_LOGS_PATH, id)?;
        applied("admin-truck-logs", id, self.live.admin_logs.deleted(id));
        Ok(())
    }
}

fn applied(collection: &str, id: &str, outcome: Reconciliation) {
    tracing::debug!(collection, id, outcome = ?outcome, "confirmed write applied locally");
}
