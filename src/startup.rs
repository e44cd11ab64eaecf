//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::events::EventEmitter;
use crate::application::services::{
    ChatService, ChatServiceImpl, JwtTokenVerifier, MessageService, MessageServiceImpl,
    SessionAuthenticator,
};
use crate::config::{Settings, StoreBackend};
use crate::domain::{ChatProjection, ChatRepository, MessageRepository, UserRepository};
use crate::infrastructure::database;
use crate::infrastructure::memory::InMemoryStore;
use crate::infrastructure::repositories::{
    PgChatProjection, PgChatRepository, PgMessageRepository, PgUserRepository,
};
use crate::infrastructure::storage::LocalAttachmentStore;
use crate::presentation::http::{create_router, handlers::health};
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::Gateway;
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub chats: Arc<dyn ChatService>,
    pub messages: Arc<dyn MessageService>,
    pub authenticator: SessionAuthenticator,
    pub gateway: Arc<Gateway>,
    pub uploads: Arc<LocalAttachmentStore>,
    /// Present only for the postgres backend
    pub db: Option<PgPool>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// State backed by PostgreSQL
    pub async fn with_postgres(settings: Settings, pool: PgPool) -> std::io::Result<Self> {
        let uploads = Arc::new(LocalAttachmentStore::new(settings.uploads.clone()).await?);
        Ok(Self::assemble(
            settings,
            Arc::new(PgUserRepository::new(pool.clone())),
            Arc::new(PgChatRepository::new(pool.clone())),
            Arc::new(PgMessageRepository::new(pool.clone())),
            Arc::new(PgChatProjection::new(pool.clone())),
            uploads,
            Some(pool),
        ))
    }

    /// State backed by the process-local store
    pub async fn with_memory(settings: Settings, store: Arc<InMemoryStore>) -> std::io::Result<Self> {
        let uploads = Arc::new(LocalAttachmentStore::new(settings.uploads.clone()).await?);
        Ok(Self::assemble(
            settings,
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            uploads,
            None,
        ))
    }

    fn assemble<U, C, M, P>(
        settings: Settings,
        users: Arc<U>,
        chat_repo: Arc<C>,
        message_repo: Arc<M>,
        projection: Arc<P>,
        uploads: Arc<LocalAttachmentStore>,
        db: Option<PgPool>,
    ) -> Self
    where
        U: UserRepository + 'static,
        C: ChatRepository + 'static,
        M: MessageRepository + 'static,
        P: ChatProjection + 'static,
    {
        let ids = Arc::new(SnowflakeGenerator::new(
            settings.snowflake.machine_id as u64,
            0u64,
        ));
        let gateway = Arc::new(Gateway::new());
        let events: Arc<dyn EventEmitter> = gateway.clone();

        let messages: Arc<dyn MessageService> = Arc::new(MessageServiceImpl::new(
            message_repo,
            chat_repo.clone(),
            projection.clone(),
            uploads.clone(),
            events.clone(),
            ids.clone(),
        ));
        let chats: Arc<dyn ChatService> = Arc::new(ChatServiceImpl::new(
            chat_repo,
            users.clone(),
            projection,
            messages.clone(),
            events,
            ids,
        ));
        let authenticator = SessionAuthenticator::new(
            Arc::new(JwtTokenVerifier::new(&settings.jwt.secret)),
            users,
        );

        Self {
            chats,
            messages,
            authenticator,
            gateway,
            uploads,
            db,
            settings: Arc::new(settings),
        }
    }
}

/// Build the full router with tracing and CORS layers
pub fn build_router(state: AppState) -> Router {
    let cors_layer = cors::create_cors_layer(&state.settings.cors);
    create_router(state)
        .layer(logging::create_trace_layer())
        .layer(cors_layer)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        health::init_server_start();

        let state = match settings.database.backend {
            StoreBackend::Postgres => {
                let db = database::create_pool(&settings.database)
                    .await
                    .context("failed to connect to the database")?;
                tracing::info!("Database connection pool created");

                if settings.database.run_migrations {
                    database::run_migrations(&db)
                        .await
                        .context("failed to run migrations")?;
                }
                AppState::with_postgres(settings.clone(), db).await?
            }
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory store, data is lost on restart");
                AppState::with_memory(settings.clone(), Arc::new(InMemoryStore::new())).await?
            }
        };

        let router = build_router(state);

        // Bind to address
        let addr = settings
            .server
            .socket_addr()
            .context("invalid server address")?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                ctrl_c.await.ok();
                tracing::info!("Received Ctrl+C, shutting down");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        tracing::info!("Received Ctrl+C, shutting down");
    }
}
