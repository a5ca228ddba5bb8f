use clap::{ArgAction, Parser, ValueEnum};
use ll1_compiler::frontend::{tokenize, FirstFollowSets, Grammar};
use ll1_compiler::{CompileError, Compiler, CompilerOptions};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ll1c")]
#[command(about = "Table-driven LL(1) compiler front end emitting three-address code")]
struct Args {
    /// Path to the source file to compile (a built-in sample when omitted)
    file: Option<PathBuf>,

    /// What to print
    #[arg(long, value_enum, default_value_t = Emit::Tac)]
    emit: Emit,

    /// Also write the TAC dump (`Result: .. Arg1: .. Arg2: .. Op: ..`) to this file
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Grammar file in `Name -> a b | EPSILON` format (default: built-in grammar)
    #[arg(long)]
    grammar: Option<PathBuf>,

    /// FIRST/FOLLOW sets as JSON (default: computed from the grammar)
    #[arg(long)]
    first_follow: Option<PathBuf>,

    /// Entry function; every other function gets a default return
    #[arg(long, default_value = "main")]
    entry: String,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// TAC listing annotated with source lines
    Tac,
    /// One `Result/Arg1/Arg2/Op` line per instruction
    Dump,
    /// Indented parse tree
    Tree,
    /// Parsing table cells and overwritten cells
    Table,
    /// Scanner output
    Tokens,
    /// FIRST/FOLLOW sets as JSON
    Sets,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Compilation error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(args: Args) -> Result<(), CompileError> {
    let src = match &args.file {
        Some(path) => {
            log::info!("compiling {}", path.display());
            fs::read_to_string(path)?
        }
        None => {
            log::info!("no input file, compiling the built-in sample");
            DEFAULT_SAMPLE.trim_start().to_string()
        }
    };

    let grammar = match &args.grammar {
        Some(path) => Grammar::parse(&fs::read_to_string(path)?)?,
        None => Grammar::builtin()?,
    };
    let sets = match &args.first_follow {
        Some(path) => FirstFollowSets::from_json(&fs::read_to_string(path)?)?,
        None => FirstFollowSets::compute(&grammar),
    };

    let options = CompilerOptions {
        entry_function: args.entry.clone(),
        dump_path: args.dump.clone(),
    };
    let compiler = Compiler::with_grammar(grammar, &sets, options)?;

    match args.emit {
        Emit::Tokens => {
            for token in tokenize(&src)? {
                println!("{:>4}  {}", token.line, token);
            }
        }
        Emit::Sets => println!("{}", sets.to_json()?),
        Emit::Table => {
            for line in compiler.table().to_lines() {
                println!("{}", line);
            }
            for c in compiler.table().conflicts() {
                println!(
                    "overwritten: M[{}, {}] = {} -> {} (was {})",
                    c.nonterminal, c.lookahead, c.nonterminal, c.winner, c.replaced
                );
            }
        }
        Emit::Tree => print!("{}", compiler.parse(&src)?.render()),
        Emit::Tac => {
            let program = compiler.compile(&src)?;
            for line in program.to_annotated_lines() {
                println!("{}", line);
            }
        }
        Emit::Dump => print!("{}", compiler.compile(&src)?.dump_text()),
    }
    Ok(())
}

const DEFAULT_SAMPLE: &str = r#"
# Sum, clamp and count down
def add(int a, int b):
    int s = a + b
    return s

def clamp(int v, int hi):
    if (v > hi): v = hi
    elif (v < 0): v = 0

def main():
    int x = 5
    int y = add(x, 10) * 2
    char c = 'k'
    if (x < y && y < 100 || !x):
        y = clamp(y, 20)
    else:
        y--
    while (y > 0):
        y = y - 1
    for (int i = 0; i < 3; i++):
        x = x + i
    do:
        x--
    until (x <= 0)
    add(x, y)
"#;
