//! Minimal fox application.
//!
//! ```text
//! cargo run -p fox --example hello
//! curl localhost:8080/hello/world
//! ```

use fox::prelude::*;
use http::StatusCode;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), fox::Error> {
    let config = ConfigLoader::new()
        .with_development()
        .with_dotenv()?
        .with_optional_file("fox.toml")?
        .with_env_prefix("FOX")
        .load()?;

    let mut app = App::with_settings(config.routing.clone());

    app.use_(handlers![|ctx| Box::pin(async move {
        ctx.set_header("x-powered-by", "fox")?;
        ctx.next().await
    })]);

    app.get(
        "/hello/:name?",
        handlers![|ctx| Box::pin(async move {
            let greeting = format!("hello {}", ctx.param_or("name", "stranger"));
            ctx.send_string(&greeting);
            Ok(())
        })],
    );

    let mut api = app.group("/api", Vec::new());
    api.get(
        "/routes",
        handlers![|ctx| Box::pin(async move {
            let routes = json!({ "path": ctx.path(), "matched": ctx.is_matched() });
            ctx.status(StatusCode::OK).json(&routes)
        })],
    );

    fox::serve(app, &config).await
}
