use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use serde_json::{Map, Value, json};
use std::path::Path;
use std::time::Instant;
use stepgraph::prelude::*;

/// Runs a single operation or a workflow document and prints its outputs as JSON
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Operation name, or path to a workflow JSON document
    target: Option<String>,

    /// Input bindings as NAME=VALUE; values parse as JSON and fall back to strings
    args: Vec<String>,

    /// List the built-in operations and exit
    #[arg(short, long)]
    list: bool,
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn number(inputs: &Inputs, name: &str) -> Result<f64> {
    inputs
        .get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| anyhow!("input '{}' must be a number", name))
}

/// Operations available to `stepgraph-cli`.
fn demo_registry() -> OperationRegistry {
    let mut registry = OperationRegistry::new();
    registry
        .register_fn(
            OperationSignature::new("math.add").with_input("a").with_input("b"),
            |inputs, _| Ok(json!(number(inputs, "a")? + number(inputs, "b")?)),
        )
        .register_fn(
            OperationSignature::new("math.scale")
                .with_input("x")
                .with_input("factor"),
            |inputs, _| Ok(json!(number(inputs, "x")? * number(inputs, "factor")?)),
        )
        .register_fn(
            OperationSignature::new("math.divmod")
                .with_input("a")
                .with_input("b")
                .with_output("quotient")
                .with_output("remainder"),
            |inputs, _| {
                let (a, b) = (number(inputs, "a")?, number(inputs, "b")?);
                if b == 0.0 {
                    bail!("division by zero");
                }
                Ok(json!({"quotient": (a / b).floor(), "remainder": a.rem_euclid(b)}))
            },
        )
        .register_fn(
            OperationSignature::new("text.concat")
                .with_input("left")
                .with_input("right"),
            |inputs, _| {
                let text = |name: &str| match inputs.get(name) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                Ok(json!(text("left") + &text("right")))
            },
        );
    registry
}

fn parse_bindings(args: &[String]) -> Result<Vec<(String, Value)>> {
    args.iter()
        .map(|arg| {
            let (name, raw) = arg
                .split_once('=')
                .with_context(|| format!("argument '{}' is not of the form NAME=VALUE", arg))?;
            let value =
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            Ok((name.to_string(), value))
        })
        .collect()
}

fn collect_outputs(node: NodeRef<'_>) -> Result<Value> {
    let mut outputs = Map::new();
    for output in node.outputs() {
        outputs.insert(output.name().to_string(), output.value()?);
    }
    Ok(Value::Object(outputs))
}

fn run(target: &str, args: &[String], registry: &OperationRegistry) -> Result<Value> {
    let bindings = parse_bindings(args)?;
    let tracker = ProgressTracker::new();

    if target.ends_with(".json") && Path::new(target).is_file() {
        let mut workflow = Workflow::load_path(target, registry)
            .with_context(|| format!("could not load workflow '{}'", target))?;
        for (name, value) in bindings {
            workflow.set_input_value(&name, value)?;
        }
        workflow.invoke(&tracker)?;
        return collect_outputs(workflow.root());
    }

    let mut step = OperationStep::new(target, registry)?.with_id("op");
    for (name, value) in bindings {
        if !step.signature().inputs.contains_key(&name) {
            bail!("operation '{}' has no input named '{}'", target, name);
        }
        step = step.with_input_value(name, value);
    }
    let mut workflow = Workflow::new(OperationSignature::new("stepgraph-cli"))?;
    workflow.add_step(step)?;
    workflow.invoke(&tracker)?;
    let node = workflow.node("op").context("operation step vanished")?;
    collect_outputs(node)
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let registry = demo_registry();

    if cli.list {
        for name in registry.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let target = cli
        .target
        .context("missing TARGET: an operation name or a workflow .json path")?;

    let start = Instant::now();
    let outputs = run(&target, &cli.args, &registry)?;
    tracing::info!(elapsed = ?start.elapsed(), "run finished");
    println!("{}", serde_json::to_string_pretty(&outputs)?);
    Ok(())
}
