use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use machshop_genealogy::{
    config::{self, AppConfig},
    db,
    dto::{BackwardTraceResult, CreateGenealogyRequest, ForwardTraceResult, GenealogyEdgeResponse, GenealogyGraph},
    migrator,
    repositories::SeaOrmGenealogyStore,
    services::GenealogyService,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let context = CliContext::initialize(cfg).await?;

    match cli.command {
        Commands::Forward(args) => handle_forward(&context, args, cli.json).await?,
        Commands::Backward(args) => handle_backward(&context, args, cli.json).await?,
        Commands::Graph(args) => handle_graph(&context, args, cli.json).await?,
        Commands::Link(args) => handle_link(&context, args, cli.json).await?,
        Commands::CheckCycles(args) => handle_check_cycles(&context, args, cli.json).await?,
        Commands::Migrate => handle_migrate(&context, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "genealogy",
    about = "Lot and serial traceability against the genealogy database",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every unit a lot went into
    Forward(LotArgs),
    /// List the components consumed to build a unit
    Backward(TraceArgs),
    /// Print the genealogy graph below a unit
    Graph(TraceArgs),
    /// Record that a component was assembled into a parent
    Link(LinkArgs),
    /// Check the genealogy below a unit for loops
    CheckCycles(IdentifierArgs),
    /// Apply pending database migrations
    Migrate,
}

#[derive(Args)]
struct LotArgs {
    lot_number: String,
}

#[derive(Args)]
struct IdentifierArgs {
    identifier: String,
}

#[derive(Args)]
struct TraceArgs {
    identifier: String,
    #[arg(long, help = "Maximum number of levels to expand")]
    max_depth: Option<u32>,
}

#[derive(Args)]
struct LinkArgs {
    #[arg(long)]
    parent: String,
    #[arg(long)]
    component: String,
    #[arg(long, help = "RFC 3339 assembly timestamp")]
    assembly_date: Option<DateTime<Utc>>,
    #[arg(long)]
    operator: Option<String>,
}

struct CliContext {
    db: Arc<DatabaseConnection>,
    service: GenealogyService,
}

impl CliContext {
    async fn initialize(cfg: AppConfig) -> Result<Self> {
        let db = Arc::new(
            db::establish_connection_from_app_config(&cfg)
                .await
                .context("failed to connect to database")?,
        );
        let service = GenealogyService::new(Arc::new(SeaOrmGenealogyStore::new(db.clone())))
            .with_graph_depths(cfg.default_graph_depth, cfg.max_graph_depth)
            .with_fetch_concurrency(cfg.db_max_connections as usize);
        Ok(Self { db, service })
    }
}

async fn handle_forward(context: &CliContext, args: LotArgs, json: bool) -> Result<()> {
    let result = context
        .service
        .get_forward_traceability(&args.lot_number)
        .await
        .context("forward trace failed")?;

    if json {
        print_json(&result)
    } else {
        render_forward(&result);
        Ok(())
    }
}

async fn handle_backward(context: &CliContext, args: TraceArgs, json: bool) -> Result<()> {
    let result = context
        .service
        .get_backward_traceability(&args.identifier, args.max_depth)
        .await
        .context("backward trace failed")?;

    if json {
        print_json(&result)
    } else {
        render_backward(&result);
        Ok(())
    }
}

async fn handle_graph(context: &CliContext, args: TraceArgs, json: bool) -> Result<()> {
    let graph = context
        .service
        .get_genealogy_graph(&args.identifier, args.max_depth)
        .await
        .context("graph build failed")?;

    if json {
        print_json(&graph)
    } else {
        render_graph(&graph);
        Ok(())
    }
}

async fn handle_link(context: &CliContext, args: LinkArgs, json: bool) -> Result<()> {
    let edge = context
        .service
        .create_genealogy_relationship(CreateGenealogyRequest {
            parent_identifier: args.parent,
            component_identifier: args.component,
            assembly_date: args.assembly_date,
            assembly_operator: args.operator,
        })
        .await
        .context("failed to record genealogy relationship")?;
    let edge = GenealogyEdgeResponse::from(edge);

    if json {
        print_json(&edge)
    } else {
        println!(
            "Linked {} <- {} (edge {})",
            edge.parent_serial_number.as_deref().unwrap_or("?"),
            edge.component_serial_number.as_deref().unwrap_or("?"),
            edge.id
        );
        Ok(())
    }
}

async fn handle_check_cycles(context: &CliContext, args: IdentifierArgs, json: bool) -> Result<()> {
    let found = context
        .service
        .detect_circular_references(&args.identifier)
        .await;

    if json {
        print_json(&json!({
            "identifier": args.identifier,
            "hasCircularReference": found,
        }))
    } else {
        if found {
            println!("Circular reference found below {}", args.identifier);
        } else {
            println!("No circular reference below {}", args.identifier);
        }
        Ok(())
    }
}

async fn handle_migrate(context: &CliContext, json: bool) -> Result<()> {
    migrator::run_migrations(&context.db)
        .await
        .context("migration failed")?;

    if json {
        print_json(&json!({ "migrated": true }))
    } else {
        println!("Migrations applied");
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_forward(result: &ForwardTraceResult) {
    println!(
        "Lot {} used in {} product(s)",
        result.lot_number, result.total_products
    );
    for product in &result.used_in_products {
        println!(
            "- {} • {} ({}) • {} • used {}{}",
            product.serial_number,
            product.part_number,
            product.part_name,
            product.current_status,
            product.date_used.to_rfc3339(),
            product
                .work_order_number
                .as_deref()
                .map(|wo| format!(" • WO {}", wo))
                .unwrap_or_default()
        );
    }
}

fn render_backward(result: &BackwardTraceResult) {
    println!(
        "{} ({} {}) consumed {} component(s)",
        result.serial_number, result.part_number, result.part_name, result.total_components
    );
    for component in &result.components {
        println!(
            "{}- {} • {} ({}) • lot {} • supplier {}",
            "  ".repeat(component.level as usize),
            component.serial_number,
            component.part_number,
            component.part_name,
            component.lot_number.as_deref().unwrap_or("-"),
            component.supplier.as_deref().unwrap_or("-")
        );
    }
}

fn render_graph(graph: &GenealogyGraph) {
    println!(
        "{} node(s), {} edge(s), depth {}",
        graph.nodes.len(),
        graph.edges.len(),
        graph.max_depth
    );
    for node in &graph.nodes {
        println!(
            "{}- {} • {} • {:?}",
            "  ".repeat(node.level as usize),
            node.serial_number,
            node.part_number,
            node.node_type
        );
    }
}
