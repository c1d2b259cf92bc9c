use rand::SeedableRng;
use rand::rngs::StdRng;
use shingles_core::{Dictionary, GeneratorConfig};
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    shingles_core::init_tracing();

    // First argument: corpus path, the remaining ones are seeds
    let mut args = std::env::args().skip(1);
    let corpus = args.next().unwrap_or_else(|| "./data/input.txt".to_owned());

    // Order 4: up to three words of context
    let mut config = GeneratorConfig::new(4)?;

    // Past 12 words, generation starts closing quotes and parentheses
    config.set_sentence_cap(12)?;

    // Builds the model from the corpus, or reads `input.bin` if it exists
    let dictionary = Dictionary::from_corpus(&corpus, config)?;
    info!(words = dictionary.len(), "model ready");

    // Ten free sentences; dead ends come back empty
    let mut rng = StdRng::from_os_rng();
    for i in 0..10 {
        println!("Generated sentence {}: {}", i + 1, dictionary.generate_with("", &mut rng));
    }

    // One sentence per seed, plus the words most likely to follow it
    for seed in args {
        println!("{seed} -> {}", dictionary.generate_with(&seed, &mut rng));
        println!("    next: {:?}", dictionary.next_most_probable_word(&seed));
        println!("    candidates: {}", dictionary.next_candidate_words(&seed).join(", "));
    }

    Ok(())
}
