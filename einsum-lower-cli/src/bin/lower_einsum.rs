use std::collections::VecDeque;
use std::error::Error;

use einsum_lower::{LowerOptions, Model, lower_einsum};
use einsum_lower_cli::logging;
use tracing::{info, warn};

struct Args {
    /// Model file to read.
    input: String,

    /// Path to write the lowered model to.
    output: String,

    /// Skip checking declared operand ranks.
    no_rank_check: bool,

    /// Enable debug logging.
    verbose: bool,

    /// Positional arguments after `<output>`, which are ignored.
    ignored: Vec<String>,
}

fn usage(bin_name: &str) -> String {
    format!(
        "Lower Einsum operators in ONNX models to MatMul.

Usage: {bin_name} [OPTIONS] <input> <output>

Further positional arguments are ignored.

  --no-rank-check  Lower nodes even if an operand's declared rank is not 5
  -v, --verbose    Enable verbose logging
  -h, --help       Print help
"
    )
}

fn parse_args(mut parser: lexopt::Parser) -> Result<Args, lexopt::Error> {
    use lexopt::prelude::*;

    let mut values = VecDeque::new();
    let mut no_rank_check = false;
    let mut verbose = false;

    let bin_name = parser.bin_name().unwrap_or("lower-einsum").to_string();

    while let Some(arg) = parser.next()? {
        match arg {
            Value(val) => values.push_back(val.string()?),
            Long("no-rank-check") => no_rank_check = true,
            Short('v') | Long("verbose") => verbose = true,
            Short('h') | Long("help") => {
                println!("{}", usage(&bin_name));
                std::process::exit(0);
            }
            _ => return Err(arg.unexpected()),
        }
    }

    let input = values.pop_front().ok_or("missing `<input>` arg")?;
    let output = values.pop_front().ok_or("missing `<output>` arg")?;

    Ok(Args {
        input,
        output,
        no_rank_check,
        verbose,
        ignored: values.into(),
    })
}

/// Rewrite the `Einsum` operators of an ONNX model which use the equations
/// `hbwpc,hbwqc->hbwpq` or `hbwij,hbwjc->hbwic` so that the model can run on
/// backends without `Einsum` support.
///
/// ```text
/// lower-einsum model.onnx model.lowered.onnx
/// ```
fn main() -> Result<(), Box<dyn Error>> {
    let args = match parse_args(lexopt::Parser::from_env()) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("Error: {}\n\n{}", err, usage("lower-einsum"));
            std::process::exit(1);
        }
    };
    logging::init(args.verbose)?;
    if !args.ignored.is_empty() {
        warn!(args = ?args.ignored, "ignoring extra positional arguments");
    }

    let mut model = Model::load_file(&args.input)?;
    let opts = LowerOptions::default().with_check_rank(!args.no_rank_check);
    let report = lower_einsum(&mut model, &opts)?;

    for lowered in &report.lowered {
        info!(
            node = lowered.name.as_str(),
            equation = lowered.pattern.equation(),
            replacement_len = lowered.replacement_len,
            "lowered"
        );
    }
    for skipped in &report.skipped {
        info!(
            node = skipped.name.as_str(),
            equation = skipped.equation.as_deref().unwrap_or("(none)"),
            "skipped unsupported equation"
        );
    }

    model.save_file(&args.output)?;
    println!("Wrote {}", args.output);

    Ok(())
}
