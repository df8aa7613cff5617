use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use homeroom::config::{AppConfig, Backend};
use homeroom::openapi::ApiDoc;
use homeroom::storage::build_blob_store;
use homeroom::{config, AppState, LocalRepo, RemoteRepo, Repo};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds; release reads the real environment.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Bootstrapping homeroom server");
    let cfg = AppConfig::from_env()?;
    info!(frontend_url = ?cfg.frontend_url, "CORS origin from FRONTEND_URL");

    let repo: Arc<dyn Repo> = match cfg.backend {
        Backend::Local => {
            info!(data_dir = %cfg.data_dir.display(), "Using local snapshot backend");
            Arc::new(LocalRepo::new(build_blob_store(&cfg.data_dir))?)
        }
        Backend::Remote => {
            let url = cfg.remote_url.clone().context("remote backend without URL")?;
            info!(url = %url, "Relaying to remote endpoint");
            Arc::new(RemoteRepo::new(url))
        }
    };
    let state = AppState { repo };

    let openapi = ApiDoc::openapi();
    let frontend = cfg.frontend_url.clone();

    let server = HttpServer::new(move || {
        let cors = {
            let mut c = Cors::default()
                // local dev servers
                .allowed_origin("http://localhost:5173")
                .allowed_origin("http://127.0.0.1:5173")
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allow_any_header()
                .allowed_methods(["GET", "POST", "OPTIONS"])
                .max_age(3600);
            if let Some(front) = &frontend {
                c = c.allowed_origin(front);
            }
            c
        };

        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind(cfg.bind.as_str())
    .with_context(|| format!("binding {}", cfg.bind))?;

    info!("Listening on http://{}", cfg.bind);

    server.run().await?;
    Ok(())
}
