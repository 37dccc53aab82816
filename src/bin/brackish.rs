//! CLI wrapper for the brackish template engine.
//!
//! Usage:
//!   brackish <template-file> [data.json]   # Render a template file
//!   brackish -e "expr"                     # Evaluate an expression
//!   brackish --brackets "[ ]" ...          # Use a custom bracket pair
//!   brackish                               # Start REPL (interactive mode)

use brackish::runner::api::Sandbox;
use brackish::runner::ds::value::JsValue;
use brackish::template::TemplateEngine;
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::process;

fn main() {
    env_logger::init();

    let mut args = env::args().skip(1);
    let mut brackets: Option<String> = None;
    let mut eval_source: Option<String> = None;
    let mut positional: Vec<String> = vec![];

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "-e" | "--eval" => match args.next() {
                Some(source) => eval_source = Some(source),
                None => fail("-e requires an expression"),
            },
            "--brackets" => match args.next() {
                Some(pair) => brackets = Some(pair),
                None => fail("--brackets requires a pair such as \"[ ]\""),
            },
            other => positional.push(other.to_string()),
        }
    }

    let mut engine = TemplateEngine::new();
    if let Some(pair) = &brackets {
        if let Err(e) = engine.set_brackets(Some(pair)) {
            fail(&e.to_string());
        }
    }

    if let Some(source) = eval_source {
        eval_code(&source);
        return;
    }

    match positional.len() {
        0 => run_repl(),
        1 => run_template(&engine, &positional[0], None),
        2 => run_template(&engine, &positional[0], Some(&positional[1])),
        _ => {
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    println!("brackish - bracket-delimited micro-templating");
    println!();
    println!("Usage:");
    println!("  brackish <template-file> [data.json]   Render a template file");
    println!("  brackish -e \"expr\"                     Evaluate an expression");
    println!("  brackish --brackets \"[ ]\" ...          Use a custom bracket pair");
    println!("  brackish                               Start the REPL");
}

fn fail(message: &str) -> ! {
    eprintln!("brackish: {}", message);
    process::exit(1)
}

fn run_template(engine: &TemplateEngine, template_path: &str, data_path: Option<&str>) {
    let template = match fs::read_to_string(template_path) {
        Ok(template) => template,
        Err(e) => fail(&format!("cannot read {}: {}", template_path, e)),
    };
    let data = match data_path {
        Some(path) => {
            let raw = match fs::read_to_string(path) {
                Ok(raw) => raw,
                Err(e) => fail(&format!("cannot read {}: {}", path, e)),
            };
            match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => fail(&format!("invalid JSON in {}: {}", path, e)),
            }
        }
        None => serde_json::Value::Object(serde_json::Map::new()),
    };

    engine.set_error_handler(|e| eprintln!("brackish: expression error: {}", e));
    match engine.render_json(&template, &data) {
        Ok(value) => println!("{}", value),
        Err(e) => fail(&e.to_string()),
    }
}

fn eval_code(source: &str) {
    let sandbox = Sandbox::new();
    match sandbox.eval(source, None) {
        Ok(value) => print_value(&value),
        Err(e) => fail(&e.to_string()),
    }
}

fn run_repl() {
    println!("brackish sandbox REPL - empty line or Ctrl-D exits");
    let sandbox = Sandbox::new();
    let scope = sandbox.scope(None);
    let stdin = io::stdin();

    loop {
        print!("> ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => break,
        }
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        match sandbox
            .prepare(line)
            .and_then(|program| sandbox.eval_ast_in_scope(&program, scope.clone()))
        {
            Ok(value) => print_value(&value),
            Err(e) => eprintln!("{}", e),
        }
    }
}

fn print_value(value: &JsValue) {
    match value {
        JsValue::String(s) => println!("\"{}\"", s),
        other => println!("{}", other),
    }
}
