
use crate::error::{EmbeddingError, Result};
use serde::{Serialize, Deserialize};
use std::{fmt::Display, fs, path::Path};

/// Hyperparameters of one training run. They are saved next to the
/// trained vectors (`params.json`) so a model can always be traced back
/// to the exact run that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainParams {
    pub vector_size: usize,
    pub window: usize,
    pub min_count: usize,
    pub epochs: usize,
    pub workers: usize,
    pub learning_rate: f32,
    pub x_max: f32,
    pub alpha: f32,
    pub batch_size: usize,
    pub max_vocab_size: Option<usize>,
    pub seed: Option<u64>
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            vector_size: 100,
            window: 30,
            min_count: 1,
            epochs: 50,
            workers: 4,
            learning_rate: 0.05,
            x_max: 100.0,
            alpha: 0.75,
            batch_size: 32,
            max_vocab_size: None,
            seed: None
        }
    }
}

impl TrainParams {

    pub fn validate(&self) -> Result<()> {

        let positive = [
            ("vector_size", self.vector_size),
            ("window", self.window),
            ("min_count", self.min_count),
            ("epochs", self.epochs),
            ("workers", self.workers),
            ("batch_size", self.batch_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(EmbeddingError::invalid(format!("{} must be a positive integer", name)));
            }
        }

        if self.max_vocab_size == Some(0) {
            return Err(EmbeddingError::invalid("max_vocab_size must be positive when given"));
        }

        // NaN fails these comparisons as well
        if !(self.learning_rate > 0.0) || !(self.x_max > 0.0) || !(self.alpha > 0.0) {
            return Err(EmbeddingError::invalid("learning_rate, x_max and alpha must be positive"));
        }

        Ok(())
    }
}

impl Display for TrainParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "training hyper parameters:
        vector_size: {},
        window: {},
        min_count: {},
        epochs: {},
        workers: {},
        learning_rate: {},
        x_max: {},
        alpha: {},
        batch_size: {},
        max_vocab_size: {:?},
        seed: {:?}",
        self.vector_size, self.window, self.min_count, self.epochs, self.workers, self.learning_rate,
        self.x_max, self.alpha, self.batch_size, self.max_vocab_size, self.seed
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Train,
    Pretrained
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    pub mode: Mode,
    pub corpus_file: Option<String>,
    pub lowercase: bool,
    pub registry_dir: String,
    pub pretrained_model: String,
    pub catalog_category: Option<String>,
    pub desc_len: Option<usize>,
    pub query_words: Vec<String>,
    pub top_k: usize,
    pub output_dir: Option<String>,
    pub train: TrainParams
}

impl Default for Params {
    fn default() -> Self {
        Self {
            mode: Mode::Pretrained,
            corpus_file: None,
            lowercase: false,
            registry_dir: "registry".to_owned(),
            pretrained_model: "glove-wiki-gigaword-50".to_owned(),
            catalog_category: Some("models".to_owned()),
            desc_len: None,
            query_words: ["stop", "woman", "man", "bishop", "india"].map(|w| w.to_owned()).to_vec(),
            top_k: 5,
            output_dir: None,
            train: TrainParams::default()
        }
    }
}

impl Display for Params {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "using hyper-params:
        mode: {:?}
        corpus_file: {:?}
        lowercase: {}
        registry_dir: {}
        pretrained_model: {}
        catalog_category: {:?}
        query_words: {:?}
        top_k: {}
        output_dir: {:?},
        Using training hyper-params: {}",
        self.mode, self.corpus_file, self.lowercase, self.registry_dir, self.pretrained_model,
        self.catalog_category, self.query_words, self.top_k, self.output_dir, self.train)
    }
}

pub struct Config {
    params: Params
}

impl Config {

    pub fn get_params(&self) -> Params {
        self.params.clone()
    }

    // omitted fields fall back to their defaults
    pub fn from_json(json: &str) -> Result<Config> {
        let params: Params = serde_json::from_str(json)?;
        Config::new(params)
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let json = fs::read_to_string(path)?;
        Config::from_json(&json)
    }

    pub fn new(params: Params) -> Result<Config> {

        if params.top_k == 0 {
            return Err(EmbeddingError::invalid("top_k must be a positive integer"));
        }
        if params.mode == Mode::Train {
            if params.corpus_file.is_none() {
                return Err(EmbeddingError::invalid("corpus_file is required for training"));
            }
            params.train.validate()?;
        }

        Ok( Self { params } )
    }
}


pub mod files_handling {

    use crate::config::TrainParams;
    use crate::cooccurrence::Vocab;
    use crate::error::{EmbeddingError, Result};
    use ndarray::Array2;
    use ndarray_npy::{read_npy, write_npy};
    use std::fs::{self, File};
    use std::io::{BufReader, BufWriter};
    use std::path::Path;

    pub fn read_input<R: ReadFile>(file_path: &Path) -> Result<<R as ReadFile>::Item> {
        <R as ReadFile>::read_file(file_path)
    }

    pub fn save_output<S: SaveFile>(output_dir: &Path, file_name: &str, item: &S) -> Result<()> {

        // create output folder
        fs::create_dir_all(output_dir)?;

        // SaveFile can be Array2<f32>, Vocab or TrainParams
        item.save_file(output_dir, file_name)
    }

    pub trait ReadFile {
        type Item;
        fn read_file(file_path: &Path) -> Result<Self::Item>;
    }

    // the corpus, read once in full
    impl ReadFile for String {
        type Item = Self;
        fn read_file(file_path: &Path) -> Result<Self::Item> {
            let bytes = fs::read(file_path)?;
            String::from_utf8(bytes).map_err(|e| EmbeddingError::Encoding(format!("{}: {}", file_path.display(), e)))
        }
    }

    impl ReadFile for Array2<f32> {
        type Item = Self;
        fn read_file(file_path: &Path) -> Result<Self::Item> {
            let item = read_npy(file_path.with_extension("npy"))?;
            Ok(item)
        }
    }

    impl ReadFile for Vocab {
        type Item = Self;
        fn read_file(file_path: &Path) -> Result<Self::Item> {
            let f = BufReader::new(File::open(file_path.with_extension("json"))?);
            let item = serde_json::from_reader(f)?;
            Ok(item)
        }
    }

    impl ReadFile for TrainParams {
        type Item = Self;
        fn read_file(file_path: &Path) -> Result<Self::Item> {
            let f = BufReader::new(File::open(file_path.with_extension("json"))?);
            let item = serde_json::from_reader(f)?;
            Ok(item)
        }
    }

    pub trait SaveFile {
        fn save_file(&self, output_dir: &Path, file_name: &str) -> Result<()>;
    }

    impl SaveFile for Array2<f32> {
        fn save_file(&self, output_dir: &Path, file_name: &str) -> Result<()> {
            let out = output_dir.join(file_name).with_extension("npy");
            write_npy(out, self)?;
            Ok(())
        }
    }

    impl SaveFile for Vocab {
        fn save_file(&self, output_dir: &Path, file_name: &str) -> Result<()> {
            let out = output_dir.join(file_name).with_extension("json");
            let f = BufWriter::new(File::create(out)?);
            serde_json::to_writer(f, self)?;
            Ok(())
        }
    }

    impl SaveFile for TrainParams {
        fn save_file(&self, output_dir: &Path, file_name: &str) -> Result<()> {
            let out = output_dir.join(file_name).with_extension("json");
            let f = BufWriter::new(File::create(out)?);
            serde_json::to_writer_pretty(f, self)?;
            Ok(())
        }
    }
}
