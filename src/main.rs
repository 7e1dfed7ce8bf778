use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use minischeme::{Value, eval_string, evaluator};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        run_repl();
    } else {
        run_script(&args);
    }
}

/// Script mode: the first argument is a file to load, the rest are bound
/// as a list of strings under `args` in the root environment.
fn run_script(args: &[String]) {
    let env = evaluator::create_global_env();
    let script_args: Vec<Value> = args[1..]
        .iter()
        .map(|arg| Value::String(arg.clone()))
        .collect();
    env.define("args", Value::List(script_args));

    if let Err(e) = evaluator::load_file(&env, &args[0]) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_repl() {
    println!("Mini Scheme Interpreter");
    println!("Type expressions to evaluate them; quit (or Ctrl+D) exits.");
    println!();

    let mut rl = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("could not initialize line editor: {}", e);
            std::process::exit(1);
        }
    };
    let env = evaluator::create_global_env();

    loop {
        match rl.readline("Lisp>>> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if line == "quit" {
                    break;
                }

                match eval_string(&env, line) {
                    Ok(printed) => println!("{}", printed),
                    Err(e) => println!("{}", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted. Use Ctrl+D or quit to exit.");
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(err) => {
                eprintln!("readline error: {:?}", err);
                break;
            }
        }
    }
}
