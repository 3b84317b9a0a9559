use std::path::PathBuf;

use burn::{
    config::Config as _,
    data::dataset::Dataset,
    module::{AutodiffModule, Module},
    optim::{GradientsAccumulator, Optimizer},
    record::{CompactRecorder, Recorder},
    tensor::backend::{AutodiffBackend, Backend},
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tokenizers::Tokenizer;

use crate::{
    models::{encoder::EncoderConfig, LayerError, Tagger},
    registry::{self, OptimizerConfig},
    utils::hugging_face::download_hf_model,
};

use super::{
    evaluate_sequences, loss::sequence_categorical_crossentropy, tokenizer, Batcher, Config, Item,
};

/// The encoder configuration, weights and tokenizer that training starts from
#[derive(Clone)]
pub struct Starter {
    /// Encoder configuration
    pub encoder: EncoderConfig,

    /// Pretrained weights, if any
    pub weights: Option<PathBuf>,

    /// The tokenizer that goes with the encoder
    pub tokenizer: Tokenizer,
}

impl Starter {
    /// Download a pretrained model from the Hugging Face Hub
    pub async fn from_hub(model_name: &str) -> anyhow::Result<Self> {
        let files = download_hf_model(model_name).await?;

        let encoder = EncoderConfig::load(&files.config)
            .map_err(|e| anyhow!("Unable to load Hugging Face Config file: {}", e))?;

        let tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| anyhow!("Unable to load tokenizer for {}: {}", model_name, e))?;

        Ok(Self {
            encoder,
            weights: Some(files.weights),
            tokenizer,
        })
    }

    /// A small randomly initialized encoder over a word-level vocabulary
    pub fn random<V>(vocab: V, max_seq_length: usize) -> anyhow::Result<Self>
    where
        V: IntoIterator<Item = String>,
    {
        let tokenizer = tokenizer::word_level(vocab)?;

        let encoder = EncoderConfig::new(
            tokenizer.get_vocab_size(true),
            32,
            2,
            4,
            64,
            max_seq_length,
        );

        Ok(Self {
            encoder,
            weights: None,
            tokenizer,
        })
    }
}

/// Define train function
pub fn train<B: AutodiffBackend, I: Item, D: Dataset<I>>(
    device: B::Device,  // Device on which to perform computation (e.g., CPU or CUDA device)
    starter: Starter,   // Encoder and tokenizer to start from
    dataset_train: D,   // Training dataset
    dataset_dev: D,     // Evaluation dataset
    tags: Vec<String>,  // Tag names, indexed by class id
    config: Config,     // Experiment configuration
    artifact_dir: &str, // Directory to save model and config files
) -> anyhow::Result<Tagger<B>> {
    config.validate()?;

    let (architecture, optimizer) = registry::resolve(&config)?;

    if tags.is_empty() {
        return Err(anyhow!("Tags are not defined for the dataset"));
    }

    B::seed(&device, config.seed);

    let tagger_config = architecture(starter.encoder.clone(), tags, &config);
    let mut model = tagger_config.init::<B>(&device);

    if let Some(weights) = &starter.weights {
        model.encoder = model.encoder.load_pretrained(weights.clone())?;
    }

    // Initialize batchers for training and evaluation data
    let batcher_train = Batcher::<B>::new(
        starter.tokenizer.clone(),
        &tagger_config,
        config.max_seq_length,
        device.clone(),
    )?;
    let batcher_dev = Batcher::<B::InnerBackend>::new(
        starter.tokenizer.clone(),
        &tagger_config,
        config.max_seq_length,
        device.clone(),
    )?;

    let items_train: Vec<I> = dataset_train.iter().collect();
    let items_dev: Vec<I> = dataset_dev.iter().collect();

    log::info!(
        "Training {} on {} sentences, evaluating on {}",
        config.starter,
        items_train.len(),
        items_dev.len()
    );

    let loop_data = Loop {
        batcher_train: &batcher_train,
        batcher_dev: &batcher_dev,
        items_train: &items_train,
        items_dev: &items_dev,
        config: &config,
    };

    let model = match optimizer(&config) {
        OptimizerConfig::Adam(optim) => loop_data.fit(model, optim.init::<B, Tagger<B>>())?,
        OptimizerConfig::AdamW(optim) => loop_data.fit(model, optim.init::<B, Tagger<B>>())?,
    };

    // Save the configuration and the trained model
    std::fs::create_dir_all(artifact_dir)
        .map_err(|e| anyhow!("Unable to create artifact directory {}: {}", artifact_dir, e))?;

    config
        .save(format!("{artifact_dir}/config.json"))
        .map_err(|e| anyhow!("Unable to save training config: {}", e))?;

    tagger_config
        .save(format!("{artifact_dir}/tagger.json"))
        .map_err(|e| anyhow!("Unable to save model config: {}", e))?;

    CompactRecorder::new()
        .record(
            model.clone().into_record(),
            format!("{artifact_dir}/model").into(),
        )
        .map_err(|e| anyhow!("Unable to save trained model weights: {}", e))?;

    starter
        .tokenizer
        .save(format!("{artifact_dir}/tokenizer.json"), false)
        .map_err(|e| anyhow!("Unable to save tokenizer: {}", e))?;

    log::info!("Saved artifacts to {}", artifact_dir);

    Ok(model)
}

/// Everything the epoch loop reads from, borrowed for the duration of training
struct Loop<'a, B: AutodiffBackend, I: Item> {
    batcher_train: &'a Batcher<B>,
    batcher_dev: &'a Batcher<B::InnerBackend>,
    items_train: &'a [I],
    items_dev: &'a [I],
    config: &'a Config,
}

impl<B: AutodiffBackend, I: Item> Loop<'_, B, I> {
    fn fit<O>(&self, mut model: Tagger<B>, mut optimizer: O) -> anyhow::Result<Tagger<B>>
    where
        O: Optimizer<Tagger<B>, B>,
    {
        let config = self.config;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut accumulator = GradientsAccumulator::<Tagger<B>>::new();
        let mut order: Vec<usize> = (0..self.items_train.len()).collect();

        for epoch in 1..=config.n_epoch {
            order.shuffle(&mut rng);

            let mut batch_count = 0;
            let mut losses = Vec::new();

            for chunk in order.chunks(config.batch_size) {
                let items: Vec<I> = chunk.iter().map(|&i| self.items_train[i].clone()).collect();
                let batch = self.batcher_train.batch_train(&items)?;

                let (guesses, backprop) = match model.begin_update(batch.input) {
                    Ok(update) => update,
                    Err(LayerError::NoWords) => {
                        log::warn!("Skipping a batch with no words to tag");
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };

                let guesses: Vec<_> = guesses.into_iter().map(|g| g.inner()).collect();
                let truths: Vec<_> = batch.targets.into_iter().map(|t| t.inner()).collect();

                let (d_guesses, loss) = sequence_categorical_crossentropy(&guesses, &truths)?;

                backprop
                    .apply(d_guesses)?
                    .accumulate(&model, &mut accumulator);

                losses.push(loss);
                batch_count += 1;

                if batch_count == config.batch_per_update {
                    model = optimizer.step(config.learn_rate, model, accumulator.grads());
                    batch_count = 0;
                }
            }

            // A partial accumulation is applied here, not carried into the next epoch
            if batch_count > 0 {
                model = optimizer.step(config.learn_rate, model, accumulator.grads());
            }

            let mean_loss = if losses.is_empty() {
                0.0
            } else {
                losses.iter().sum::<f32>() / losses.len() as f32
            };

            let score = evaluate_sequences(
                &model.valid(),
                self.batcher_dev,
                self.items_dev,
                config.eval_batch_size,
            )?;

            log::info!(
                "Epoch {}/{}: loss {:.4}, accuracy {:.4}",
                epoch,
                config.n_epoch,
                mean_loss,
                score
            );
        }

        Ok(model)
    }
}

/// Load the model, batcher and configuration saved by [`train`]
pub fn load_artifacts<B: Backend>(
    artifact_dir: &str,
    device: B::Device,
) -> anyhow::Result<(Tagger<B>, Batcher<B>, Config)> {
    let config = Config::load(format!("{artifact_dir}/config.json"))
        .map_err(|e| anyhow!("Unable to load config file: {}", e))?;

    let tagger_config = crate::models::TaggerConfig::load(format!("{artifact_dir}/tagger.json"))
        .map_err(|e| anyhow!("Unable to load model config file: {}", e))?;

    let tokenizer = Tokenizer::from_file(format!("{artifact_dir}/tokenizer.json"))
        .map_err(|e| anyhow!("Unable to load tokenizer: {}", e))?;

    let record = CompactRecorder::new()
        .load(format!("{artifact_dir}/model").into(), &device)
        .map_err(|e| anyhow!("Unable to load trained model weights: {}", e))?;

    let model = tagger_config.init::<B>(&device).load_record(record);

    let batcher = Batcher::new(tokenizer, &tagger_config, config.max_seq_length, device)?;

    Ok((model, batcher, config))
}
