use pinboard::db::Db;
use pinboard::handlers;
use pinboard::model::{Message, Model};
use pinboard::route;
use pinboard::router::{AppState, Middleware, PostMiddleware, Router};
use pinboard::settings::Settings;
use pinboard::template;
use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let settings = Settings::from_env()?;
    template::set_display_logs(settings.template.debug);

    let db = Arc::new(Db::connect(&settings.database_url()).await?);
    Message::ensure_table(db.clone()).await?;

    let mut router = Router::new();
    router.set_app_state(AppState {
        db,
        settings: settings.clone(),
    });

    // Access log: stamp the start time on the way in, report on the way out.
    let timing: Middleware = Arc::new(|ctx| {
        ctx.start_time = Some(Instant::now());
        None
    });
    let access_log: PostMiddleware = Arc::new(|ctx, response| {
        let elapsed = ctx
            .start_time
            .map(|t| t.elapsed().as_micros())
            .unwrap_or(0);
        log::info!(
            "{:?} {} -> {} ({} us)",
            ctx.method,
            ctx.path,
            response.status_code,
            elapsed
        );
        response
    });
    router.add_middleware(timing);
    router.add_post_middleware(access_log);

    route!(
        router,
        Get "/" => { handlers::index },
        Post "/submit" => { handlers::submit },
    );

    router.run(settings).await
}
