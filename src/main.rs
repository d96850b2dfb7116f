//! grove demo server.
//!
//! Registers the sample routes (static, named, wildcard and regex segments,
//! nested groups, static files, templates) and serves them until Ctrl+C or
//! SIGTERM.

use std::path::PathBuf;

use axum::http::StatusCode;
use clap::Parser;
use serde_json::{json, Value};

use grove::config::{read_config, validate_config, ConfigError, ServerConfig, TlsConfig};
use grove::engine::{Context, Engine, Next};
use grove::lifecycle::{spawn_signal_listener, Shutdown};
use grove::render::FuncMap;
use grove::routing::RouteError;
use grove::{observability, HttpServer};

const ARR_TEMPLATE: &str = "<html><body><p>hello, {{ .title }}</p>\
{{range .stuArr}}<p>{{ .name }} is {{ .age }} years old</p>{{end}}</body></html>";
const DATE_TEMPLATE: &str = "<html><body><p>hello, {{ .title }}</p><p>Date: {{ formatAsDate .now }}</p></body></html>";

#[derive(Parser, Debug)]
#[command(name = "grove")]
#[command(about = "Demo server for the grove router and middleware engine", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the config file.
    #[arg(long)]
    bind: Option<String>,

    /// PEM certificate; enables TLS together with --tls-key.
    #[arg(long, requires = "tls_key")]
    tls_cert: Option<String>,

    /// PEM private key.
    #[arg(long, requires = "tls_cert")]
    tls_key: Option<String>,

    /// Request body read timeout in seconds.
    #[arg(long)]
    read_timeout: Option<u64>,

    /// Response write timeout in seconds.
    #[arg(long)]
    write_timeout: Option<u64>,

    /// Log filter directive, e.g. "debug" or "grove=debug,tower_http=info".
    #[arg(long)]
    log_level: Option<String>,

    /// Value of the `Server` response header.
    #[arg(long, default_value = "BWS")]
    server_name: String,
}

impl Cli {
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let (Some(cert_path), Some(key_path)) = (&self.tls_cert, &self.tls_key) {
            config.listener.tls = Some(TlsConfig {
                cert_path: cert_path.clone(),
                key_path: key_path.clone(),
            });
        }
        if let Some(secs) = self.read_timeout {
            config.timeouts.read_secs = secs;
        }
        if let Some(secs) = self.write_timeout {
            config.timeouts.write_secs = secs;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

fn server_name(name: String) -> impl Fn(&mut Context, Next) + Send + Sync + 'static {
    tracing::debug!(server_name = %name, "Init server name middleware");
    move |ctx: &mut Context, next: Next| {
        ctx.set_header("Server", &name);
        next.run(ctx);
    }
}

fn format_as_date(value: &Value) -> String {
    // Accepts RFC 3339 strings; keeps the calendar date.
    value
        .as_str()
        .and_then(|s| s.get(..10))
        .unwrap_or_default()
        .to_string()
}

fn register_routes(engine: &mut Engine, config: &ServerConfig) -> Result<(), RouteError> {
    for mount in &config.statics {
        engine.root().static_files(&mount.mount, &mount.root)?;
    }

    {
        let mut g = engine.group("/g");
        g.static_files("/assets", "./static")?;
        let mut g1 = g.group("/g1");
        g1.static_files("/test", "./static")?;
    }

    engine.get("/", |ctx: &mut Context| {
        let test = ctx.query("test").unwrap_or_default();
        ctx.json(
            StatusCode::OK,
            &json!({ "username": "leffss", "passwd": "123456", "test": test }),
        );
    })?;

    engine.get("/t1/id", |ctx: &mut Context| ctx.string(StatusCode::OK, "id static"))?;

    engine.get("/t1/:id", |ctx: &mut Context| {
        let body = format!("id: {} :", ctx.param("id").unwrap_or_default());
        ctx.string(StatusCode::OK, body);
    })?;

    engine.get("/test1/:name/test2", |ctx: &mut Context| {
        let name = ctx.param("name").unwrap_or_default().to_string();
        ctx.string(StatusCode::OK, name);
    })?;

    engine.get("/test2/*name", |ctx: &mut Context| {
        let name = ctx.param("name").unwrap_or_default().to_string();
        ctx.string(StatusCode::OK, name);
    })?;

    engine.get(r"/re1/{id:\d+}", |ctx: &mut Context| {
        let body = format!("re1 id: {}", ctx.param("id").unwrap_or_default());
        ctx.string(StatusCode::OK, body);
    })?;

    engine.get("/re2/{id:[a-z]+}", |ctx: &mut Context| {
        let body = format!("re2 id: {}", ctx.param("id").unwrap_or_default());
        ctx.string(StatusCode::OK, body);
    })?;

    engine.get(
        "/re3/{year:[12][0-9]{3}}/{month:[1-9]{2}}/{day:[1-9]{2}}/{hour:(12|[3-9])}",
        |ctx: &mut Context| {
            let p = |name: &str| ctx.param(name).unwrap_or_default().to_string();
            let body = format!(
                "re3 year: {}, month: {}, day: {}, hour: {}",
                p("year"),
                p("month"),
                p("day"),
                p("hour")
            );
            ctx.string(StatusCode::OK, body);
        },
    )?;

    engine.get("/re2/{id:[a-z]+}/test", |ctx: &mut Context| {
        let body = format!("re2 id: {} test", ctx.param("id").unwrap_or_default());
        ctx.string(StatusCode::OK, body);
    })?;

    // Out-of-range index, exercising Recovery.
    engine.any("/panic", |ctx: &mut Context| {
        let names = ["geektutu"];
        let name = names[ctx.params().len() + 100];
        ctx.string(StatusCode::OK, name);
    })?;

    engine.post("/post", |ctx: &mut Context| {
        let body = ctx.post_json().unwrap_or_default().to_string();
        ctx.string(StatusCode::OK, body);
    })?;

    engine.get("/students", |ctx: &mut Context| {
        let data = json!({
            "title": "gee",
            "stuArr": [
                { "name": "Geektutu", "age": 20 },
                { "name": "Jack", "age": 22 },
            ],
        });
        ctx.html(StatusCode::OK, "arr.tmpl", &data);
    })?;

    engine.get("/date", |ctx: &mut Context| {
        let data = json!({ "title": "gee", "now": "2019-08-17T00:00:00Z" });
        ctx.html(StatusCode::OK, "custom_func.tmpl", &data);
    })?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ServerConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    observability::logging::init(&config.observability)?;
    tracing::info!("grove v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        read_timeout_secs = config.timeouts.read_secs,
        write_timeout_secs = config.timeouts.write_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut engine = Engine::with_defaults();
    engine.use_middleware(server_name(cli.server_name.clone()));

    let mut funcs = FuncMap::new();
    funcs.insert("formatAsDate", format_as_date);
    engine.set_func_map(funcs);
    engine.add_template("arr.tmpl", ARR_TEMPLATE)?;
    engine.add_template("custom_func.tmpl", DATE_TEMPLATE)?;
    if let Some(glob) = &config.templates.glob {
        engine.load_templates(glob)?;
    }

    register_routes(&mut engine, &config)?;

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(engine, config);
    server.serve(shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
