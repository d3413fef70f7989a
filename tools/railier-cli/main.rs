use clap::{Parser, Subcommand};
use railier::error::ConversionError;
use railier::prelude::*;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

// --- JSON Deserialization Structs (Input Format Specific) ---
// These structs match the flow-editor export format and are only used here for conversion.

#[derive(Deserialize)]
struct RawFlow {
    id: String,
    #[serde(default)]
    version: Option<u32>,
    nodes: Vec<RawNode>,
    edges: Vec<RawEdge>,
}

#[derive(Deserialize)]
struct RawNode {
    id: String,
    data: RawNodeData,
}

#[derive(Deserialize)]
struct RawNodeData {
    #[serde(alias = "templateId")]
    template_id: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    config: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawEdge {
    #[serde(default)]
    id: Option<String>,
    source: String,
    #[serde(alias = "sourceHandle")]
    source_handle: String,
    target: String,
    #[serde(alias = "targetHandle")]
    target_handle: String,
}

// --- Converter Implementation ---

/// Block kind from an explicit category, else from the template id prefix.
fn infer_kind(category: Option<&str>, template_id: &str) -> Result<BlockKind, ConversionError> {
    if let Some(category) = category {
        return serde_json::from_value(Value::String(category.to_string())).map_err(|_| {
            ConversionError::Invalid(format!("unknown block category '{}'", category))
        });
    }
    let kind = match template_id.split('-').next().unwrap_or_default() {
        "input" => BlockKind::Input,
        "condition" => BlockKind::Condition,
        "logic" => BlockKind::Logic,
        "action" => BlockKind::Action,
        "data" => BlockKind::Data,
        "llm" | "model" => BlockKind::ModelCheck,
        "output" => BlockKind::Output,
        _ => {
            return Err(ConversionError::Invalid(format!(
                "cannot infer the kind of template '{}'",
                template_id
            )));
        }
    };
    Ok(kind)
}

impl IntoGraph for RawFlow {
    fn into_graph(self) -> Result<GuardrailGraph, ConversionError> {
        let mut graph = GuardrailGraph::new(self.id);
        if let Some(version) = self.version {
            graph.version = version;
        }

        for node in self.nodes {
            let kind = infer_kind(node.data.category.as_deref(), &node.data.template_id)?;
            let mut block = Block::new(node.id, kind, node.data.template_id);
            block.config = node.data.config;
            graph.blocks.push(block);
        }

        for edge in self.edges {
            let mut connection = Connection::new(
                &edge.source,
                &edge.source_handle,
                &edge.target,
                &edge.target_handle,
            );
            if let Some(id) = edge.id {
                connection.id = id;
            }
            graph.connections.push(connection);
        }

        Ok(graph)
    }
}

/// Guardrail graph validation and evaluation CLI
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a guardrail graph and print its execution order
    Validate {
        /// Path to the graph JSON file (canonical or flow-editor export)
        graph_path: PathBuf,
    },
    /// Evaluate a request against a guardrail graph
    Evaluate {
        /// Path to the graph JSON file (canonical or flow-editor export)
        graph_path: PathBuf,
        /// The message to evaluate
        #[arg(short, long)]
        message: Option<String>,
        /// The caller's role
        #[arg(short, long)]
        role: Option<String>,
        /// Path to a request context JSON file
        #[arg(short, long)]
        context: Option<String>,
        /// Path to an engine settings TOML file
        #[arg(short, long)]
        settings: Option<PathBuf>,
        /// Print the result as JSON instead of a trace table
        #[arg(long)]
        json: bool,
    },
    /// List the built-in block templates
    Templates,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("railier=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Validate { graph_path } => run_validate(&graph_path),
        Command::Evaluate {
            graph_path,
            message,
            role,
            context,
            settings,
            json,
        } => run_evaluate(&graph_path, message, role, context, settings, json).await,
        Command::Templates => run_templates(),
    }
}

/// Loads a graph file, accepting both the canonical format and flow-editor exports.
fn load_graph(path: &Path) -> GuardrailGraph {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read graph file '{}': {}",
            path.display(),
            e
        ))
    });
    let raw: Value = serde_json::from_str(&content)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse graph JSON: {}", e)));

    if raw.get("nodes").is_some() {
        let flow: RawFlow = serde_json::from_value(raw)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse flow export: {}", e)));
        flow.into_graph()
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to convert flow to graph: {}", e)))
    } else {
        serde_json::from_value(raw)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse guardrail graph: {}", e)))
    }
}

fn run_validate(graph_path: &Path) {
    let graph = load_graph(graph_path);
    let report = railier::compiler::validate(&graph);

    println!(
        "Guardrail '{}' (version {}): {} block(s), {} connection(s)",
        graph.id,
        graph.version,
        graph.blocks.len(),
        graph.connections.len()
    );
    for error in &report.errors {
        println!("  error:   {}", error);
    }
    for warning in &report.warnings {
        println!("  warning: {:?}", warning);
    }

    if !report.is_valid() {
        exit_with_error(&format!("{} validation error(s)", report.errors.len()));
    }

    let plan = Compiler::builder(graph)
        .build()
        .compile()
        .unwrap_or_else(|e| exit_with_error(&format!("Compilation failed: {}", e)));
    println!("\nValid. Execution order:");
    for (position, block_id) in plan.execution_order().iter().enumerate() {
        println!("  {:>3}. {}", position + 1, block_id);
    }
}

async fn run_evaluate(
    graph_path: &Path,
    message: Option<String>,
    role: Option<String>,
    context_path: Option<String>,
    settings_path: Option<PathBuf>,
    json: bool,
) {
    let graph = load_graph(graph_path);

    let settings = match settings_path {
        Some(path) => EngineSettings::load(&path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load settings: {}", e))),
        None => EngineSettings::default(),
    };

    let mut context = match context_path {
        Some(path) => ExecutionContext::from_file(&path).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to load context from '{}': {}", path, e))
        }),
        None => ExecutionContext::default(),
    };
    if let Some(message) = message {
        context.message = message;
    }
    if let Some(role) = role {
        context.user_role = Some(role);
    }

    let evaluator = build_evaluator(settings);

    let eval_start = Instant::now();
    let result = evaluator
        .evaluate(&graph, &context)
        .await
        .unwrap_or_else(|e| exit_with_error(&format!("Evaluation failed: {}", e)));
    let eval_duration = eval_start.elapsed();

    if json {
        let record = AuditRecord::new(&graph.id, graph.version, &context, &result);
        let rendered = serde_json::to_string_pretty(&record)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to render result: {}", e)));
        println!("{}", rendered);
        return;
    }

    println!("{}", TraceFormatter::format_result(&result));
    println!("\n--- Performance Summary ---");
    println!("Blocks Evaluated:     {}", result.trace.len());
    println!("Evaluation:           {:?}", eval_duration);
}

#[cfg(feature = "ollama")]
fn build_evaluator(settings: EngineSettings) -> Evaluator {
    let model_check = railier::model_check::OllamaModelCheck::from_settings(&settings.model);
    Evaluator::builder(settings)
        .with_model_check(std::sync::Arc::new(model_check))
        .build()
}

#[cfg(not(feature = "ollama"))]
fn build_evaluator(settings: EngineSettings) -> Evaluator {
    Evaluator::builder(settings).build()
}

fn run_templates() {
    let registry = BlockRegistry::default();
    for descriptor in registry.templates() {
        let inputs: Vec<&str> = descriptor.inputs.iter().map(|h| h.name).collect();
        println!(
            "{:<20} {:<12} [{}] -> [{}]  {}",
            descriptor.template_id,
            descriptor.kind.as_str(),
            inputs.join(", "),
            descriptor.outputs.join(", "),
            descriptor.description
        );
    }
}

/// A helper function to print an error message and exit the process.
fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    process::exit(1);
}
