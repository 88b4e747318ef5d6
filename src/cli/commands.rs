//! Command handlers.

use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::logging::{log, LogLevel};
use super::{Cli, Command};
use crate::batch::{BatchBuilder, BatchConfig};
use crate::config::PipelineConfig;
use crate::corpus::{read_corpus_with, Corpus, ReaderOptions};
use crate::error::Result;
use crate::eval::{collect_tags, BioScorer, SpanScorer};
use crate::model::{SequenceTagger, TaggerConfig};
use crate::train::Trainer;
use crate::vocab::{Vocab, TAG_RESERVED, TOKEN_RESERVED};

/// Dispatch a parsed command line.
pub fn run_command(cli: Cli) -> Result<()> {
    let level = if cli.quiet {
        LogLevel::Quiet
    } else if cli.verbose {
        LogLevel::Verbose
    } else {
        LogLevel::Normal
    };

    match cli.command {
        Command::Train {
            config,
            epochs,
            lr,
            batch_size,
        } => {
            let mut config = PipelineConfig::from_yaml_file(&config)?;
            if let Some(epochs) = epochs {
                config.training.epochs = epochs;
            }
            if let Some(lr) = lr {
                config.training.learning_rate = lr;
            }
            if let Some(batch_size) = batch_size {
                config.training.batch_size = batch_size;
            }
            config.validate()?;
            train(&config, level)
        }
        Command::Info { config } => {
            let config = PipelineConfig::from_yaml_file(&config)?;
            info(&config, level)
        }
    }
}

fn load_partition(path: &Path, options: ReaderOptions, level: LogLevel) -> Result<Corpus> {
    let mut corpus = read_corpus_with(path, options)?;
    corpus.normalize();
    log(
        level,
        LogLevel::Verbose,
        &format!(
            "{}: {} examples, {} tokens",
            path.display(),
            corpus.len(),
            corpus.token_count()
        ),
    );
    Ok(corpus)
}

struct Pipeline {
    train: Corpus,
    validation: Corpus,
    test: Corpus,
    token_vocab: Vocab,
    tag_vocab: Vocab,
}

fn load_pipeline(config: &PipelineConfig, level: LogLevel) -> Result<Pipeline> {
    let options = ReaderOptions {
        skip_malformed: config.data.skip_malformed,
    };
    let train = load_partition(&config.data.train, options, level)?;
    let validation = load_partition(&config.data.validation, options, level)?;
    let test = load_partition(&config.data.test, options, level)?;

    // token vocabulary sees train + validation; tags come from train only
    let token_vocab = Vocab::build(
        train.token_groups().chain(validation.token_groups()),
        &TOKEN_RESERVED,
    );
    let tag_vocab = Vocab::build(train.tag_groups(), &TAG_RESERVED);

    Ok(Pipeline {
        train,
        validation,
        test,
        token_vocab,
        tag_vocab,
    })
}

fn train(config: &PipelineConfig, level: LogLevel) -> Result<()> {
    let pipeline = load_pipeline(config, level)?;
    log(
        level,
        LogLevel::Normal,
        &format!(
            "Corpus: {} train / {} validation / {} test examples; {} tokens, {} tags",
            pipeline.train.len(),
            pipeline.validation.len(),
            pipeline.test.len(),
            pipeline.token_vocab.len(),
            pipeline.tag_vocab.len()
        ),
    );

    let mut training = config.training.clone();
    if level == LogLevel::Quiet {
        training.log_interval = 0;
    }

    let mut rng = match training.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut model = SequenceTagger::new(
        TaggerConfig {
            vocab_size: pipeline.token_vocab.len(),
            n_tags: pipeline.tag_vocab.len(),
            embedding_dim: config.model.embedding_dim,
            hidden_dim: config.model.hidden_dim,
        },
        &mut rng,
    );

    let train_batches = BatchBuilder::new(
        &pipeline.train,
        &pipeline.token_vocab,
        &pipeline.tag_vocab,
        BatchConfig {
            batch_size: training.batch_size,
            shuffle: true,
            allow_smaller_last: true,
        },
    )?;
    let eval_config = BatchConfig {
        batch_size: training.batch_size,
        shuffle: false,
        allow_smaller_last: true,
    };
    let validation_batches = BatchBuilder::new(
        &pipeline.validation,
        &pipeline.token_vocab,
        &pipeline.tag_vocab,
        eval_config,
    )?;
    let test_batches = BatchBuilder::new(
        &pipeline.test,
        &pipeline.token_vocab,
        &pipeline.tag_vocab,
        eval_config,
    )?;

    let epochs = training.epochs;
    let mut trainer = Trainer::new(training);
    for epoch in 0..epochs {
        let train_loss = trainer.train_epoch(&mut model, &train_batches, &mut rng);
        let val_loss = trainer.validation_loss(&model, &validation_batches);
        log(
            level,
            LogLevel::Normal,
            &format!("Epoch {}/{epochs}: train_loss={train_loss:.4}, val_loss={val_loss:.4}", epoch + 1),
        );
    }

    let scorer = BioScorer;
    for (name, batches) in [
        ("Validation", &validation_batches),
        ("Test", &test_batches),
    ] {
        let (y_true, y_pred) = collect_tags(&model, batches, &pipeline.tag_vocab);
        let score = scorer.score(&y_true, &y_pred)?;
        log(
            level,
            LogLevel::Normal,
            &format!(
                "{name}: precision={:.4}, recall={:.4}, f1={:.4}",
                score.precision, score.recall, score.f1
            ),
        );
        log(
            level,
            LogLevel::Verbose,
            &scorer.report(&y_true, &y_pred)?,
        );
    }

    Ok(())
}

fn info(config: &PipelineConfig, level: LogLevel) -> Result<()> {
    let pipeline = load_pipeline(config, level)?;

    for (name, corpus) in [
        ("train", &pipeline.train),
        ("validation", &pipeline.validation),
        ("test", &pipeline.test),
    ] {
        log(
            level,
            LogLevel::Normal,
            &format!(
                "{name}: {} examples, {} tokens",
                corpus.len(),
                corpus.token_count()
            ),
        );
    }

    log(
        level,
        LogLevel::Normal,
        &format!(
            "token vocabulary: {} symbols; tag vocabulary: {} symbols",
            pipeline.token_vocab.len(),
            pipeline.tag_vocab.len()
        ),
    );

    let batches = BatchBuilder::new(
        &pipeline.train,
        &pipeline.token_vocab,
        &pipeline.tag_vocab,
        BatchConfig {
            batch_size: config.training.batch_size,
            shuffle: false,
            allow_smaller_last: true,
        },
    )?;
    log(
        level,
        LogLevel::Normal,
        &format!(
            "batches per training pass: {} (batch size {})",
            batches.batches_per_pass(),
            config.training.batch_size
        ),
    );

    Ok(())
}
