use std::cell::RefCell;
use std::rc::Rc;

use clap::Parser;
use tracing::{error, info};

use aero_script::cli::{self, Cli};
use aero_script::config::HostConfig;
use aero_script::host::RecordingHost;
use aero_script::lua::Value;
use aero_script::script::ScriptEngine;
use aero_script::Result;

fn main() {
    let args = Cli::parse();
    cli::init_logging(args.verbose);

    if let Err(e) = run(&args) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: &Cli) -> Result<()> {
    let config = Rc::new(RefCell::new(HostConfig::default()));
    let mut engine = ScriptEngine::new(Rc::new(RecordingHost::new()), Rc::clone(&config))?;
    if let Some(path) = &args.init {
        engine = engine.with_init_path(path);
    }

    // ── Init script ───────────────────────────────────────────────────────────
    match engine.init_path() {
        Some(path) => info!(path = %path.display(), "init script"),
        None => info!("no init script location"),
    }
    engine.run_init_file()?;

    // ── --eval chunks ─────────────────────────────────────────────────────────
    for chunk in &args.eval {
        let values = engine.run_source(chunk)?;
        if !values.is_empty() {
            let rendered: Vec<String> = values.iter().map(render).collect();
            println!("{}", rendered.join("\t"));
        }
    }

    for line in cli::summary(&config.borrow()) {
        println!("{line}");
    }
    Ok(())
}

fn render(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_owned(),
        Value::Boolean(b) => b.to_string(),
        Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => format!("<{}>", other.describe()),
    }
}
