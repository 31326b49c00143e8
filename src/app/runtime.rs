use std::sync::Arc;

use actix_web::{App, HttpServer, web};

use crate::adapters::gateway::RemoteData;
use crate::adapters::push_channel::PushChannelConfig;
use crate::adapters::status_api::{ApiState, configure_routes};
use crate::adapters::wire::{decode_admin_log, decode_record};
use crate::app::bootstrap::Services;
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::app::notifications::{
    FIELD_LOG_CREATED, NotificationSubscriber, TracingNotifier, UnreadTracker,
};
use crate::app::services::SqliteStateService;
use crate::app::sync::{
    ChannelHandle, CollectionSubscriber, LiveSyncChannel, StatusBoard, SyncDispatcher,
    shared_collection,
};
use crate::app::writes::LiveWrites;
use crate::domain::models::{Site, Vehicle};

pub const VEHICLES_OWNER: &str = "vehicles";
pub const SITES_OWNER: &str = "sites";
pub const ADMIN_LOGS_OWNER: &str = "admin-truck-logs";
pub const NOTIFICATIONS_OWNER: &str = "notifications";

/// Opens one push connection per owner. Each owner holds its own collection.
pub fn mount_owners(
    config: &AppConfig,
    remote: &Arc<dyn RemoteData>,
    store: &Arc<SqliteStateService>,
    board: &Arc<StatusBoard>,
    tracker: &Arc<UnreadTracker>,
) -> (Vec<ChannelHandle>, LiveWrites) {
    let push = PushChannelConfig {
        origin: config.socket_url.clone(),
        connect_timeout: config.request_timeout(),
        reconnect_base: config.reconnect_base(),
        reconnect_max: config.reconnect_max(),
    };

    let vehicles = {
        let remote = Arc::clone(remote);
        CollectionSubscriber::new(
            VEHICLES_OWNER,
            "truck",
            shared_collection(),
            Box::new(move || remote.vehicles()),
            decode_record::<Vehicle>,
        )
        // currentStatus follows the latest field log
        .refetch_on(FIELD_LOG_CREATED)
    };

    let sites = {
        let remote = Arc::clone(remote);
        CollectionSubscriber::new(
            SITES_OWNER,
            "quarry",
            shared_collection(),
            Box::new(move || remote.sites()),
            decode_record::<Site>,
        )
    };

    let admin_logs = {
        let remote = Arc::clone(remote);
        CollectionSubscriber::new(
            ADMIN_LOGS_OWNER,
            "adminTruckLog",
            shared_collection(),
            Box::new(move || remote.admin_logs(None)),
            decode_admin_log,
        )
    };

    let live = LiveWrites {
        vehicles: vehicles.confirmed_writes(),
        sites: sites.confirmed_writes(),
        admin_logs: admin_logs.confirmed_writes(),
    };

    let notifications = {
        let remote = Arc::clone(remote);
        NotificationSubscriber::new(
            Arc::clone(tracker),
            store.clone(),
            Box::new(move || remote.field_logs(None)),
        )
    };

    let owners = [
        SyncDispatcher::new(VEHICLES_OWNER, Arc::clone(board)).subscribe(vehicles),
        SyncDispatcher::new(SITES_OWNER, Arc::clone(board)).subscribe(sites),
        SyncDispatcher::new(ADMIN_LOGS_OWNER, Arc::clone(board)).subscribe(admin_logs),
        SyncDispatcher::new(NOTIFICATIONS_OWNER, Arc::clone(board)).subscribe(notifications),
    ];

    let handles = owners
        .into_iter()
        .map(|dispatcher| LiveSyncChannel::mount(push.clone(), dispatcher))
        .collect();
    (handles, live)
}

pub fn teardown_all(handles: Vec<ChannelHandle>) {
    for handle in handles {
        handle.teardown();
    }
}

pub fn run(config: AppConfig, services: Services) -> Result<(), AppError> {
    let board = Arc::new(StatusBoard::new());
    let tracker = Arc::new(UnreadTracker::new(
        TracingNotifier::new(config.notification_permission),
        services.store.clone(),
    ));
    let remote: Arc<dyn RemoteData> = services.gateway.clone();

    // the status server is read-only; writes go through `RecordWriter` in library callers
    let (handles, _live) = mount_owners(&config, &remote, &services.store, &board, &tracker);

    let api_state = ApiState {
        board,
        notifications: tracker,
    };
    let bind = config.status_bind.clone();

    tracing::info!(bind = %bind, "status server starting");

    let server_result = actix_web::rt::System::new().block_on(async move {
        HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(api_state.clone()))
                .configure(configure_routes)
        })
        .bind(&bind)?
        .run()
        .await
    });

    teardown_all(handles);

    server_result.map_err(AppError::runtime)
}
