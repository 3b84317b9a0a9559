//! Command line tool for tagging a sentence with a trained model

use anyhow::{anyhow, Result};
use burn_tagger::{
    cli::{datasets::Dataset, models::Model},
    pipelines::token_classification::{infer, Config},
};
use pico_args::Arguments;

#[cfg(not(feature = "tch"))]
use burn::backend::{ndarray::NdArrayDevice, NdArray};

#[cfg(feature = "tch")]
use burn::backend::{libtorch::LibTorchDevice, LibTorch};

#[cfg(not(feature = "tch"))]
type Backend = NdArray;

#[cfg(feature = "tch")]
type Backend = LibTorch;

const HELP: &str = "\
Usage: infer [OPTIONS] WORDS...

Arguments:
  WORDS                The words of the sentence to tag

Options:
  -h, --help           Print help
  -d, --data-dir       The path to the top-level data directory (defaults to 'data')
  -s, --dataset        The dataset the model was trained on (defaults to 'ud-ancora')
  -m, --model          The starter model the tagger was trained from
  --json               Print the tags as JSON
";

#[derive(Debug)]
struct Args {
    /// Prints the usage menu
    help: bool,

    /// The top-level data directory
    data_dir: Option<String>,

    /// The dataset the model was trained on
    dataset: Option<String>,

    /// The starter model
    model: Option<String>,

    /// Print JSON instead of a table
    json: bool,

    /// The sentence to tag
    words: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut pargs = Arguments::from_env();

    let mut args = Args {
        help: pargs.contains(["-h", "--help"]),
        data_dir: pargs.opt_value_from_str(["-d", "--data-dir"])?,
        dataset: pargs.opt_value_from_str(["-s", "--dataset"])?,
        model: pargs.opt_value_from_str(["-m", "--model"])?,
        json: pargs.contains("--json"),
        words: Vec::new(),
    };

    for word in pargs.finish() {
        let word = word
            .into_string()
            .map_err(|w| anyhow!("Invalid UTF-8 in argument: {:?}", w))?;

        args.words.push(word);
    }

    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = parse_args()?;

    if args.help {
        println!("{}", HELP);
        return Ok(());
    }

    if args.words.is_empty() {
        return Err(anyhow!("Missing required argument: WORDS"));
    }

    let dataset = match &args.dataset {
        Some(name) => Dataset::try_from(name.as_str())?,
        None => Dataset::UdAncora,
    };

    let model = match &args.model {
        Some(name) => Model::try_from(name.as_str())?,
        None => dataset.default_model(),
    };

    let mut config = Config::new()
        .with_dataset_name(dataset.to_string())
        .with_starter(model.to_string());

    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    let artifact_dir = config.artifact_dir();

    let mut tagged = infer::<Backend>(device(), &artifact_dir, vec![args.words])?;
    let tagged = tagged.pop().unwrap_or_default();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&tagged)?);
        return Ok(());
    }

    for word in tagged {
        println!("{}\t{}\t{:.4}", word.word, word.tag, word.score);
    }

    Ok(())
}

#[cfg(not(feature = "tch"))]
fn device() -> NdArrayDevice {
    NdArrayDevice::Cpu
}

#[cfg(feature = "tch")]
fn device() -> LibTorchDevice {
    LibTorchDevice::Cpu
}
