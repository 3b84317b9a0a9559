//! Command line tool for training a tagger

use anyhow::anyhow;
use burn::{config::Config as _, data::dataset::Dataset as _};
use burn_tagger::{
    cli::{datasets::Dataset, models::Model},
    datasets::{dummy, ud_ancora, LoadableDataset},
    pipelines::token_classification::{self, Config, Item, Starter},
    utils::classes::label_set,
};
use pico_args::Arguments;

#[cfg(not(feature = "tch"))]
use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};

#[cfg(feature = "tch")]
use burn::backend::{libtorch::LibTorchDevice, Autodiff, LibTorch};

#[cfg(not(feature = "tch"))]
type Backend = Autodiff<NdArray>;

#[cfg(feature = "tch")]
type Backend = Autodiff<LibTorch>;

const HELP: &str = "\
Usage: train DATASET [OPTIONS]

Arguments:
  DATASET              The dataset to use ('ud-ancora' or 'dummy')

Options:
  -h, --help           Print help
  -m, --model          The starter model to use (e.g., 'bert-base-multilingual-cased', 'random')
  -d, --data-dir       The path to the top-level data directory (defaults to 'data')
  -n, --num-epochs     Number of epochs to train for
  -b, --batch-size     Batch size
  -c, --config         A JSON training config to start from
";

#[derive(Debug)]
struct Args {
    dataset: String,
    model: Option<String>,
    num_epochs: Option<usize>,
    batch_size: Option<usize>,
    data_dir: Option<String>,
    config: Option<String>,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let args = Args {
            model: pargs.opt_value_from_str(["-m", "--model"])?,
            num_epochs: pargs.opt_value_from_str(["-n", "--num-epochs"])?,
            batch_size: pargs.opt_value_from_str(["-b", "--batch-size"])?,
            data_dir: pargs.opt_value_from_str(["-d", "--data-dir"])?,
            config: pargs.opt_value_from_str(["-c", "--config"])?,
            dataset: pargs.free_from_str().map_err(|e| match e {
                pico_args::Error::MissingArgument => anyhow!("Missing required argument: DATASET"),
                _ => anyhow!("{}", e),
            })?,
        };

        Ok(Some(args))
    }

    /// Apply the command line overrides on top of the base config
    fn config(&self, dataset: &Dataset, model: &Model) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .map_err(|e| anyhow!("Unable to load config file {}: {}", path, e))?,
            None => Config::new(),
        };

        config.dataset_name = dataset.to_string();
        config.starter = model.to_string();

        if let Some(num_epochs) = self.num_epochs {
            config.n_epoch = num_epochs;
        }

        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }

        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.to_string();
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    let dataset = Dataset::try_from(args.dataset.as_str())?;

    let model = match &args.model {
        Some(model) => Model::try_from(model.as_str())?,
        None => dataset.default_model(),
    };

    let config = args.config(&dataset, &model)?;

    // Fail on unknown names before anything is downloaded
    burn_tagger::registry::resolve(&config)?;

    match dataset {
        Dataset::UdAncora => {
            run::<ud_ancora::Item, ud_ancora::Dataset>(&model, config, None).await
        }
        Dataset::Dummy => {
            let vocab = dummy::DummyConfig::new().vocab();

            run::<ud_ancora::Item, dummy::Dataset>(&model, config, Some(vocab)).await
        }
    }
}

async fn run<I, D>(model: &Model, config: Config, vocab: Option<Vec<String>>) -> anyhow::Result<()>
where
    I: Item,
    D: LoadableDataset<I>,
{
    let train = D::load(&config.data_dir, "train").await?;
    let dev = D::load(&config.data_dir, "dev").await?;

    let tags = label_set(train.tags().iter().chain(dev.tags().iter()));

    let starter = match model {
        Model::Bert(name) => Starter::from_hub(name).await?,
        Model::Random => {
            let vocab = match vocab {
                Some(vocab) => vocab,
                None => {
                    let words: Vec<String> =
                        train.iter().flat_map(|item| item.words().to_vec()).collect();

                    label_set(&words)
                }
            };

            Starter::random(vocab, config.max_seq_length)?
        }
    };

    let artifact_dir = config.artifact_dir();

    token_classification::train::<Backend, I, D>(
        device(),
        starter,
        train,
        dev,
        tags,
        config,
        &artifact_dir,
    )?;

    Ok(())
}

#[cfg(not(feature = "tch"))]
fn device() -> NdArrayDevice {
    NdArrayDevice::Cpu
}

#[cfg(feature = "tch")]
fn device() -> LibTorchDevice {
    LibTorchDevice::Cuda(0)
}
