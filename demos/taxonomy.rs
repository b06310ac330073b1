//! Two-layer taxonomy of building uses, named and scored.
//!
//! Uses a character-trigram hashing encoder so it runs without a model download.
//! Set `RUST_LOG=strata=debug` to watch the k scans.

use strata::{
    name_clusters, LabeledItem, Result, TaxonomyBuilder, TaxonomyEvaluator, TaxonomyParams,
    TaxonomyTree, TextEncoder,
};
use tracing_subscriber::EnvFilter;

/// Hashes character trigrams into a fixed number of buckets.
struct TrigramEncoder {
    dim: usize,
}

impl TextEncoder for TrigramEncoder {
    fn name(&self) -> &str {
        "trigram-64"
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let chars: Vec<char> = format!("  {}  ", text.to_lowercase()).chars().collect();
                let mut v = vec![0.0f32; self.dim];
                for w in chars.windows(3) {
                    let h = w
                        .iter()
                        .fold(2166136261u32, |h, c| (h ^ *c as u32).wrapping_mul(16777619));
                    v[h as usize % self.dim] += 1.0;
                }
                let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(f32::EPSILON);
                v.iter_mut().for_each(|x| *x /= norm);
                v
            })
            .collect())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let raw = [
        ("cafe; tea room", "The ground floor became a cafe and tea room."),
        ("coffee shop", "Converted into a coffee shop."),
        ("restaurant", "Now a restaurant."),
        ("private house", "Sold and converted to a private house."),
        ("flats", "Redeveloped as flats."),
        ("holiday home", "Used as a holiday home."),
        ("art gallery", "Reopened as an art gallery."),
        ("community gallery", "Run by volunteers as a community gallery."),
        ("gift shop", "The building is now a gift shop."),
        ("charity shop", "A charity shop occupies the site."),
        ("office", "Used as council offices."),
        ("storage", "Used for storage by the council."),
    ];
    let items: Vec<LabeledItem> = raw
        .iter()
        .flat_map(|(labels, note)| LabeledItem::explode(labels, note, &Default::default()))
        .collect();

    let params = TaxonomyParams::default()
        .with_sentence_template("The new use of the building is")
        .with_layers(2)
        .with_k_range(2, 5);
    let encoder = TrigramEncoder { dim: 64 };
    let mut builder = TaxonomyBuilder::new(&encoder, params)?;
    let taxonomy = builder.generate_taxonomy(&items)?;

    for report in taxonomy.layer_reports() {
        for group in &report.groups {
            println!(
                "layer {} parent {:>5}: {} items -> k={} score={:?}",
                report.layer, group.parent, group.size, group.k, group.score
            );
        }
    }

    println!("{}", TaxonomyTree::from_taxonomy(&taxonomy).to_json()?);

    // Stand-in for a text-generation model: name a cluster after its first label.
    let names = name_clusters(&taxonomy, 2, &|members: &[String]| -> Result<String> {
        Ok(members.first().cloned().unwrap_or_default())
    })?;
    let evaluation = TaxonomyEvaluator::new(&encoder).evaluate(&taxonomy, 2, &names)?;
    println!(
        "coherence {:.3}, coverage {:.3}",
        evaluation.coherence, evaluation.coverage
    );
    Ok(())
}
