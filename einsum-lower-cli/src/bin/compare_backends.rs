use std::error::Error;
use std::path::Path;

use einsum_lower_cli::backend::{InputTensor, RtenBackend, load_baseline, load_candidate};
use einsum_lower_cli::compare::{compare_outputs, random_normal};
use einsum_lower_cli::input_shape::resolve_input_shape;
use einsum_lower_cli::logging;
use rten_tensor::prelude::*;

/// Default size for dynamic input dimensions.
const DEFAULT_SIZE: i64 = 64;

struct Args {
    /// Model file to load.
    model: String,

    /// Size of dynamic input dimensions other than batch and channels.
    size: i64,

    /// Enable debug logging.
    verbose: bool,
}

fn usage(bin_name: &str) -> String {
    format!(
        "Compare model outputs from a CPU baseline and the DirectML backend.

The baseline is ONNX Runtime's CPU provider when built with the `directml`
feature, and the rten runtime otherwise. Without the feature only the
baseline is run.

Usage: {bin_name} --model <path> [OPTIONS]

  --model <path>  ONNX model to run
  --size <n>      Size of dynamic input dimensions (default {DEFAULT_SIZE})
  -v, --verbose   Enable verbose logging
  -h, --help      Print help
"
    )
}

fn parse_args() -> Result<Args, lexopt::Error> {
    use lexopt::prelude::*;

    let mut model = None;
    let mut size = DEFAULT_SIZE;
    let mut verbose = false;

    let mut parser = lexopt::Parser::from_env();
    let bin_name = parser.bin_name().unwrap_or("compare-backends").to_string();

    while let Some(arg) = parser.next()? {
        match arg {
            Long("model") => model = Some(parser.value()?.string()?),
            Long("size") => size = parser.value()?.parse()?,
            Short('v') | Long("verbose") => verbose = true,
            Short('h') | Long("help") => {
                println!("{}", usage(&bin_name));
                std::process::exit(0);
            }
            _ => return Err(arg.unexpected()),
        }
    }

    let model = model.ok_or("missing `--model` option")?;

    Ok(Args {
        model,
        size,
        verbose,
    })
}

/// Run an ONNX model with ONNX Runtime's CPU and DirectML providers, using
/// the same random input, and report the largest differences between their
/// outputs.
///
/// Dynamic input dimensions are resolved as batch size 1, 3 channels and
/// `--size` for the rest. Differing output shapes are an error. If DirectML
/// is unavailable, only the baseline is run. Builds without ONNX Runtime use
/// rten as the baseline.
fn main() -> Result<(), Box<dyn Error>> {
    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("Error: {}\n\n{}", err, usage("compare-backends"));
            std::process::exit(1);
        }
    };
    logging::init(args.verbose)?;

    let model_path = Path::new(&args.model);
    let rten = RtenBackend::load(model_path)?;

    let input_info = rten.first_input()?;
    let shape = resolve_input_shape(&input_info.dims, args.size);
    println!("Input \"{}\" shape: {:?}", input_info.name, shape);

    let mut rng = fastrand::Rng::new();
    let input = InputTensor {
        name: input_info.name,
        data: random_normal(&mut rng, &shape),
    };

    let mut baseline = load_baseline(model_path, rten)?;
    let baseline_outputs = baseline.run(&input)?;
    println!("{} outputs: {}", baseline.name(), baseline_outputs.len());

    let Some(mut candidate) = load_candidate(model_path)? else {
        println!("DirectML backend unavailable, skipping comparison");
        return Ok(());
    };

    let candidate_outputs = candidate.run(&input)?;
    println!("{} outputs: {}", candidate.name(), candidate_outputs.len());

    let diffs = compare_outputs(&baseline_outputs, &candidate_outputs)?;
    for (i, (output, diff)) in baseline_outputs.iter().zip(&diffs).enumerate() {
        println!(
            "Output {}: shape={:?}, max_abs={:.6e}, max_rel={:.6e}",
            i,
            output.shape(),
            diff.max_abs,
            diff.max_rel
        );
    }
    println!("Comparison done");

    Ok(())
}
