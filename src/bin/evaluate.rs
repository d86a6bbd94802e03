use clap::{Parser, ValueEnum};
use std::{fs::File, io::{self, BufRead, Write}, path::PathBuf, process::ExitCode};
use word_neighbors::{Embeddings, LocalRegistry, Result, TrainedModel};


// checks on embeddings, treated as a separate executable so it can be ran independently from main:
// the K most similar words to a given word,
// the K most similar words to a combination of words (analogies).
#[derive(Parser)]
#[command(name = "evaluate")]
#[command(about = "Word similarity and analogy queries against a saved or pre-trained model")]
struct Cli {
    /// "a" for analogies (one `a b c d` quartet per line), "b" for word similarity (one word per line)
    #[arg(value_enum)]
    selector: Selector,

    /// Input file matching the selector
    input: PathBuf,

    /// Directory written by a training run (vecs.npy, words.json, params.json)
    #[arg(long, conflicts_with = "model", required_unless_present = "model")]
    model_dir: Option<PathBuf>,

    /// Name of a pre-trained model in the registry
    #[arg(long)]
    model: Option<String>,

    /// Registry directory used with --model
    #[arg(long, default_value = "registry")]
    registry_dir: PathBuf,

    /// Number of neighbors per query
    #[arg(short, long, default_value = "10")]
    k: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum Selector {
    A,
    B,
}

fn main() -> ExitCode {

    word_neighbors::init_logging();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {

    let lines = io::BufReader::new(File::open(&cli.input)?)
    .lines()
    .collect::<io::Result<Vec<String>>>()?;
    let lines: Vec<String> = lines.into_iter().filter(|line| !line.trim().is_empty()).collect();

    let model: Box<dyn Embeddings> = match (&cli.model_dir, &cli.model) {
        (Some(model_dir), _) => Box::new(TrainedModel::read(model_dir)?),
        (None, Some(name)) => Box::new(word_neighbors::load(&LocalRegistry::new(&cli.registry_dir), name)?),
        (None, None) => return Err(word_neighbors::EmbeddingError::invalid("either --model-dir or --model is required"))
    };

    let mut out = io::stdout().lock();
    match cli.selector {
        Selector::A => {
            let inputs = lines
            .iter()
            .map(|line| line.split_whitespace().map(|x| x.to_string()).collect::<Vec<String>>())
            .collect::<Vec<Vec<String>>>();
            run_analogies(&inputs, cli.k, model.as_ref(), &mut out)
        },
        Selector::B => run_similarity(&lines, cli.k, model.as_ref(), &mut out)
    }
}


fn run_analogies<W: Write>(inputs: &[Vec<String>], k: usize, model: &dyn Embeddings, out: &mut W) -> Result<()> {

    // each input is 4 strings, the object is to find the analogy
    // of the combination of the first 3, in hope that it would match 4.
    // a is to b as like c is to ?
    // translates to b - a + c : ?
    // i.e : high is to higher as like good is to : better

    for input in inputs {

        if input.len() != 4 {
            tracing::warn!("skipping analogy line with {} words: {:?}", input.len(), input);
            continue;
        }

        let source = [input[0].as_str(), input[1].as_str(), input[2].as_str()];
        let target = input[3].as_str();

        let analogies = model.analogy(source, k)?;
        let mut found_target = false;
        for (i, (analogy, score)) in analogies.iter().enumerate() {
            writeln!(out, "{} : {} - {} + {} ? {} = {}", i, source[1], source[0], source[2], analogy, score)?;
            if analogy == target {
                found_target = true;
                writeln!(out, "found target '{}' analogy in place {}", target, 1+i)?;
            }
        }

        if !found_target {
            writeln!(out, "target '{}' was not found within the first {} analogies", target, k)?;
        }

        writeln!(out)?;
    }
    Ok(())

}

fn run_similarity<W: Write>(inputs: &[String], k: usize, model: &dyn Embeddings, out: &mut W) -> Result<()> {

    // the k most similar words to each of the input tokens
    for token in inputs {

        let token = token.trim();
        writeln!(out, "searching {} most similar words to {}", k, token)?;
        for (i, (similar_token, score)) in model.nearest(token, k)?.iter().enumerate() {
            writeln!(out, "{} : {} ? {} = {}", i, token, similar_token, score)?;
        }
        writeln!(out)?;
    }

    Ok(())

}
