use std::{process, sync::Arc};

use postwell::{
    application::{
        api_keys::StaticApiKey,
        error::AppError,
        posts::PostService,
        repos::PostsRepo,
    },
    cache::{CacheConfig, ListCache, spawn_sweeper},
    config,
    infra::{
        error::InfraError,
        http::{self, ApiState},
        memory::{InMemoryPostStore, StoreConfig},
        telemetry,
    },
};
use tokio::{net::TcpListener, sync::oneshot, task::JoinError};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| match err {
        config::LoadError::Invalid { .. } => AppError::validation(err.to_string()),
        config::LoadError::Build(_) => {
            AppError::unexpected(format!("failed to load configuration: {err}"))
        }
    })?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings);

    let sweeper_handle = app
        .cache_config
        .sweep_interval
        .map(|interval| spawn_sweeper(app.cache.clone(), interval));

    let result = serve_http(&settings, app.api_state).await;

    if let Some(handle) = sweeper_handle {
        handle.abort();
        let _ = handle.await;
    }

    result
}

struct ApplicationContext {
    api_state: ApiState,
    cache: Arc<ListCache>,
    cache_config: CacheConfig,
}

fn build_application_context(settings: &config::Settings) -> ApplicationContext {
    let store_config = StoreConfig::from(&settings.store);
    let store: Arc<dyn PostsRepo> = Arc::new(InMemoryPostStore::new(store_config));

    let cache_config = CacheConfig::from(&settings.cache);
    let cache = Arc::new(ListCache::new(&cache_config));

    let posts = PostService::new(store, cache.clone());
    let api_key = StaticApiKey::new(settings.auth.api_key.clone());

    info!(
        target = "postwell::serve",
        id_space = store_config.id_space,
        cache_ttl_secs = cache_config.ttl.as_secs(),
        sweep_interval_secs = cache_config.sweep_interval.map(|d| d.as_secs()),
        "application context ready"
    );

    ApplicationContext {
        api_state: ApiState::new(posts, api_key),
        cache,
        cache_config,
    }
}

async fn serve_http(settings: &config::Settings, api_state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(api_state);

    let listener = TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "postwell::serve",
        addr = %settings.server.addr,
        "server is running"
    );

    let (signal_tx, signal_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            shutdown_signal().await;
            let _ = signal_tx.send(());
        },
    );
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        joined = &mut server => return flatten_server_result(joined),
        _ = signal_rx => {}
    }

    let grace = settings.server.graceful_shutdown;
    info!(
        target = "postwell::serve",
        grace_secs = grace.as_secs(),
        "shutting down, draining in-flight requests"
    );

    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => {
            flatten_server_result(joined)?;
            info!(target = "postwell::serve", "server exited properly");
            Ok(())
        }
        Err(_) => {
            server.abort();
            warn!(
                target = "postwell::serve",
                grace_secs = grace.as_secs(),
                "graceful shutdown timed out; aborting open connections"
            );
            Ok(())
        }
    }
}

fn flatten_server_result(joined: Result<std::io::Result<()>, JoinError>) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::from(InfraError::from(err))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

