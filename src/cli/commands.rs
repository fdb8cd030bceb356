use crate::config::{DocsConfig, OpenApiSetting};
use crate::docs::ApiDocs;
use crate::openapi::{entries_from_document, load_document};
use crate::registry::DocEntry;
use crate::router::{HandlerResponse, Router};
use crate::server::{DocsService, HttpServer};
use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use http::Method;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

/// Page rendering needs more than may's default coroutine stack.
pub const DEFAULT_STACK_SIZE: usize = 0x40000;

/// Command-line interface for routedoc
#[derive(Parser)]
#[command(name = "routedoc")]
#[command(about = "Browsable API documentation for may_minihttp services", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the demo application with its documentation page
    Serve {
        /// Configuration file (YAML, TOML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// OpenAPI document to import, overriding the configuration
        #[arg(long)]
        openapi: Option<PathBuf>,

        /// Address to listen on
        #[arg(short, long, env = "ROUTEDOC_ADDR", default_value = "127.0.0.1:8080")]
        addr: String,

        /// Rebuild documentation when its sources change
        #[arg(long, default_value_t = false)]
        watch: bool,

        /// Coroutine stack size in bytes
        #[arg(long, env = "ROUTEDOC_STACK_SIZE", default_value_t = DEFAULT_STACK_SIZE)]
        stack_size: usize,
    },
    /// Print the documentation entries read from an OpenAPI document
    Inspect {
        /// Path to the OpenAPI document (YAML or JSON)
        #[arg(short, long)]
        openapi: PathBuf,
    },
}

/// The demo host application: `GET /hello` and `POST /api/user`.
pub fn demo_app() -> Router {
    let api = Router::new().post("/user", |req| match req.body.as_ref() {
        Some(body) if body.get("name").and_then(|n| n.as_str()).is_some() => {
            HandlerResponse::json(201, json!({"message": "User created", "user": body}))
        }
        _ => HandlerResponse::json(400, json!({"error": "name is required"})),
    });
    Router::new()
        .get("/hello", |_| HandlerResponse::json(200, json!({"message": "Hello, world!"})))
        .nest("/api", api)
}

/// Manual documentation for [`demo_app`].
pub fn register_demo_docs(docs: &ApiDocs) {
    docs.require_docs(
        "/hello",
        Some(Method::GET),
        DocEntry::new("Returns a welcome message.")
            .response("200", "{\n  \"message\": \"Hello, world!\"\n}"),
    );
    docs.require_docs(
        "/api/user",
        Some(Method::POST),
        DocEntry::new("Creates a new user.")
            .param("name", "string", "Name of the user")
            .param("email", "string", "Email address of the user")
            .response("201", "{\n  \"message\": \"User created\"\n}")
            .response("400", "{\n  \"error\": \"name is required\"\n}"),
    );
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DocsConfig> {
    let config = match path {
        Some(p) => DocsConfig::from_file(p).with_context(|| format!("loading {}", p.display()))?,
        None => DocsConfig::default(),
    };
    Ok(config.with_env_overrides())
}

struct ServeArgs {
    config: Option<PathBuf>,
    openapi: Option<PathBuf>,
    addr: String,
    watch: bool,
    stack_size: usize,
}

fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let ServeArgs {
        config,
        openapi,
        addr,
        watch,
        stack_size,
    } = args;
    may::config().set_stack_size(stack_size);

    let mut config = load_config(config.as_deref())?;
    if let Some(path) = openapi {
        config.openapi = OpenApiSetting::Path(path);
    }
    if watch {
        config.require_docs.hot_reload = true;
    }

    let app = demo_app();
    let docs = ApiDocs::new(Some(&app), config)?;
    register_demo_docs(&docs);
    let endpoint = docs.config().endpoint.clone();

    let handle = HttpServer(DocsService::new(docs, app))
        .start(addr.as_str())
        .with_context(|| format!("binding {addr}"))?;
    handle.wait_ready()?;
    info!(addr = %handle.addr(), %endpoint, "documentation available");
    handle
        .join()
        .map_err(|_| anyhow!("server terminated abnormally"))
}

fn inspect(path: &Path) -> anyhow::Result<()> {
    let Some(doc) = load_document(path)? else {
        bail!("{} does not exist", path.display());
    };
    let entries: Vec<_> = entries_from_document(&doc)
        .into_iter()
        .map(|op| json!({"path": op.path, "method": op.method.as_str(), "entry": op.entry}))
        .collect();
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve {
            config,
            openapi,
            addr,
            watch,
            stack_size,
        } => serve(ServeArgs {
            config,
            openapi,
            addr,
            watch,
            stack_size,
        }),
        Commands::Inspect { openapi } => inspect(&openapi),
    }
}
