//! End-to-end pipeline test: partition files on disk through training to a
//! span-level report.

use std::fs;
use std::path::PathBuf;

use etiquetar::batch::{BatchBuilder, BatchConfig};
use etiquetar::config::PipelineConfig;
use etiquetar::corpus::{read_corpus, URL_TOKEN, USR_TOKEN};
use etiquetar::eval::{collect_tags, evaluate_corpus, BioScorer, SpanScorer};
use etiquetar::model::{SequenceTagger, TaggerConfig};
use etiquetar::train::{TrainConfig, Trainer};
use etiquetar::vocab::{Vocab, TAG_RESERVED, TOKEN_RESERVED};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

const TRAIN_DATA: &str = "\
@paris\tO
loves\tO
paris\tB-loc
so\tO
much\tO

i\tO
saw\tO
paris\tB-loc
hilton\tI-per
yesterday\tO

check\tO
http://t.co/x\tO
for\tO
london\tB-loc
news\tO

london\tB-loc
and\tO
paris\tB-loc
are\tO
cities\tO
";

const VALID_DATA: &str = "\
i\tO
like\tO
london\tB-loc

paris\tB-loc
is\tO
great\tO
";

fn write_partition(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

struct Fixture {
    train_batches: BatchBuilder,
    valid_batches: BatchBuilder,
    tag_vocab: Vocab,
    model: SequenceTagger,
    rng: StdRng,
}

fn fixture(dir: &TempDir) -> Fixture {
    let train_path = write_partition(dir, "train.txt", TRAIN_DATA);
    let valid_path = write_partition(dir, "validation.txt", VALID_DATA);

    let mut train = read_corpus(&train_path).unwrap();
    let mut valid = read_corpus(&valid_path).unwrap();
    train.normalize();
    valid.normalize();

    let token_vocab = Vocab::build(
        train.token_groups().chain(valid.token_groups()),
        &TOKEN_RESERVED,
    );
    let tag_vocab = Vocab::build(train.tag_groups(), &TAG_RESERVED);

    // normalization replaced the mention and the URL before vocab construction
    assert!(token_vocab.get(USR_TOKEN).is_some());
    assert!(token_vocab.get(URL_TOKEN).is_some());
    assert!(token_vocab.get("@paris").is_none());

    let train_batches = BatchBuilder::new(
        &train,
        &token_vocab,
        &tag_vocab,
        BatchConfig {
            batch_size: 2,
            shuffle: true,
            allow_smaller_last: true,
        },
    )
    .unwrap();
    let valid_batches = BatchBuilder::new(
        &valid,
        &token_vocab,
        &tag_vocab,
        BatchConfig {
            batch_size: 2,
            shuffle: false,
            allow_smaller_last: true,
        },
    )
    .unwrap();

    let mut rng = StdRng::seed_from_u64(17);
    let model = SequenceTagger::new(
        TaggerConfig {
            vocab_size: token_vocab.len(),
            n_tags: tag_vocab.len(),
            embedding_dim: 16,
            hidden_dim: 16,
        },
        &mut rng,
    );

    Fixture {
        train_batches,
        valid_batches,
        tag_vocab,
        model,
        rng,
    }
}

#[test]
fn test_training_reduces_loss_on_toy_corpus() {
    let dir = TempDir::new().unwrap();
    let mut fx = fixture(&dir);

    let mut trainer = Trainer::new(TrainConfig {
        epochs: 50,
        batch_size: 2,
        learning_rate: 0.05,
        momentum: 0.9,
        log_interval: 0,
        ..TrainConfig::default()
    });

    let first = trainer.train_epoch(&mut fx.model, &fx.train_batches, &mut fx.rng);
    for _ in 1..50 {
        trainer.train_epoch(&mut fx.model, &fx.train_batches, &mut fx.rng);
    }
    let last = *trainer.metrics.losses().last().unwrap();

    assert!(
        last < first * 0.5,
        "expected the toy corpus to be memorized: first={first:.4}, last={last:.4}"
    );
}

#[test]
fn test_evaluation_produces_span_scores_and_report() {
    let dir = TempDir::new().unwrap();
    let mut fx = fixture(&dir);

    let mut trainer = Trainer::new(TrainConfig {
        epochs: 30,
        batch_size: 2,
        learning_rate: 0.05,
        momentum: 0.9,
        log_interval: 0,
        ..TrainConfig::default()
    });
    for _ in 0..30 {
        trainer.train_epoch(&mut fx.model, &fx.train_batches, &mut fx.rng);
    }

    let scorer = BioScorer;
    let score = evaluate_corpus(&fx.model, &fx.valid_batches, &fx.tag_vocab, &scorer).unwrap();
    assert!((0.0..=1.0).contains(&score.precision));
    assert!((0.0..=1.0).contains(&score.recall));
    assert!((0.0..=1.0).contains(&score.f1));

    let (y_true, y_pred) = collect_tags(&fx.model, &fx.valid_batches, &fx.tag_vocab);
    assert_eq!(y_true.len(), y_pred.len());
    assert_eq!(y_true.len(), 6); // 3 + 3 validation tokens, no padding

    let report = scorer.report(&y_true, &y_pred).unwrap();
    assert!(report.contains("micro avg"));
    assert!(report.contains("precision"));
}

#[test]
fn test_pipeline_config_loads_from_yaml() {
    let dir = TempDir::new().unwrap();
    let train_path = write_partition(&dir, "train.txt", TRAIN_DATA);
    let valid_path = write_partition(&dir, "validation.txt", VALID_DATA);
    let test_path = write_partition(&dir, "test.txt", VALID_DATA);

    let yaml = format!(
        "data:\n  train: {}\n  validation: {}\n  test: {}\nmodel:\n  embedding_dim: 16\n  hidden_dim: 16\ntraining:\n  epochs: 2\n  batch_size: 4\n  seed: 5\n",
        train_path.display(),
        valid_path.display(),
        test_path.display()
    );
    let config_path = dir.path().join("config.yaml");
    fs::write(&config_path, yaml).unwrap();

    let config = PipelineConfig::from_yaml_file(&config_path).unwrap();
    assert_eq!(config.model.embedding_dim, 16);
    assert_eq!(config.training.epochs, 2);
    assert_eq!(config.training.seed, Some(5));
    assert_eq!(config.data.train, train_path);
}
