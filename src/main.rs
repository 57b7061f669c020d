use tessera::config::Config;
use tessera::http::mime::MimeType;
use tessera::http::request::Method;
use tessera::http::response::{Response, StatusCode};
use tessera::routing::{CompiledPath, Router, handler};
use tessera::server;

/// Largest request body the demo routes will buffer.
const MAX_BODY: usize = 1024 * 1024;

fn demo_router() -> anyhow::Result<Router> {
    let mut router = Router::new();

    let hello = handler(|_req| Ok(Response::ok("Hello from Tessera\n")));
    router.add_route(
        "hello",
        CompiledPath::new("/")?,
        hello,
        vec![Method::GET],
        vec![MimeType::text()],
    )?;

    let greet = handler(|req| {
        let name = req.path_param("name").unwrap_or("stranger").to_string();
        Ok(Response::text(StatusCode::Ok, format!("Hello, {}!\n", name)))
    });
    router.add_route(
        "greet",
        CompiledPath::new("/hello/{name}")?,
        greet,
        vec![Method::GET],
        vec![MimeType::text()],
    )?;

    let echo = handler(|req| {
        let body = req.read_body(MAX_BODY)?;
        Ok(Response::new(StatusCode::Ok).body(body).build())
    });
    router.add_route(
        "echo",
        CompiledPath::new("/echo")?,
        echo,
        vec![Method::POST, Method::PUT],
        vec![MimeType::any()],
    )?;

    Ok(router)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = match std::env::var("TESSERA_CONFIG") {
        Ok(path) => Config::from_yaml_file(path)?,
        Err(_) => Config::load(),
    };
    let router = demo_router()?;

    tokio::select! {
        res = server::listener::run(&cfg, router) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
