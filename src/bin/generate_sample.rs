use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const DESCRIPTORS: [&str; 5] = [
    "End of maturation",
    "Berry weight",
    "Bunch compactness",
    "Total acidity",
    "Anthocyanin content",
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

struct Variety {
    name: String,
    species: &'static str,
    parent1: Option<&'static str>,
    parent2: Option<&'static str>,
    descriptors: Vec<f64>,
    kmeans: i64,
    ward: i64,
}

fn generate(rng: &mut SimpleRng) -> Vec<Variety> {
    let names = [
        "Chardonnay", "Müller-Thurgau", "Grüner Veltliner", "Gewürztraminer", "Pinot noir",
        "Riesling", "Savagnin", "Chasselas", "Gamay", "Merlot", "Cabernet franc", "Syrah",
        "Mourvèdre", "Sémillon", "Ugni blanc", "Aligoté", "Mencía", "Albariño", "Tempranillo",
        "Trousseau", "Poulsard", "Blaufränkisch", "Zweigelt", "Sauvignon blanc",
    ];
    let parents = ["Pinot", "Gouais blanc", "Riesling", "Madeleine Royale", "Savagnin", "Traminer"];

    // Cluster centres in the normalized descriptor space.
    let centres = [
        [-0.8, 0.6, -0.2, 0.9, -0.5],
        [0.1, -0.4, 0.7, -0.3, 0.2],
        [0.9, 0.2, -0.6, -0.7, 1.0],
    ];

    names
        .iter()
        .enumerate()
        .map(|(i, &name)| {
            let kmeans = (i % centres.len()) as i64;
            let centre = centres[kmeans as usize];
            let descriptors = centre.iter().map(|&c| rng.gauss(c, 0.35)).collect();
            // Ward mostly agrees with K-means, with some disagreement.
            let ward = if rng.next_f64() < 0.8 {
                kmeans + 1
            } else {
                (kmeans + 1) % 3 + 1
            };
            let crossing = rng.next_f64() < 0.5;
            Variety {
                name: name.to_string(),
                species: "Vitis vinifera",
                parent1: crossing.then(|| rng.pick(&parents)),
                parent2: crossing.then(|| rng.pick(&parents)),
                descriptors,
                kmeans: kmeans + 1,
                ward,
            }
        })
        .collect()
}

fn headers() -> Vec<&'static str> {
    let mut h = vec!["Prime name", "Species", "Parent 1", "Parent 2"];
    h.extend(DESCRIPTORS);
    h.extend(["Kmeans cluster", "Ward cluster"]);
    h
}

/// Semicolon-separated, ISO-8859-1 encoded: the layout the explorer reads.
fn write_csv(varieties: &[Variety], path: &Path) -> Result<()> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(Vec::new());
    out.write_record(headers())?;
    for v in varieties {
        let mut record = vec![
            v.name.clone(),
            v.species.to_string(),
            v.parent1.unwrap_or_default().to_string(),
            v.parent2.unwrap_or_default().to_string(),
        ];
        record.extend(v.descriptors.iter().map(|d| format!("{d:.4}")));
        record.push(v.kmeans.to_string());
        record.push(v.ward.to_string());
        out.write_record(&record)?;
    }
    let bytes = out
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV: {}", e.error()))?;
    let utf8 = String::from_utf8(bytes)?;
    let latin1: Vec<u8> = utf8
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect();
    std::fs::write(path, latin1).with_context(|| format!("writing {}", path.display()))
}

fn write_parquet(varieties: &[Variety], path: &Path) -> Result<()> {
    let optional = |f: fn(&Variety) -> Option<&'static str>| -> ArrayRef {
        Arc::new(StringArray::from(varieties.iter().map(f).collect::<Vec<_>>()))
    };

    let mut fields = vec![
        Field::new("Prime name", DataType::Utf8, false),
        Field::new("Species", DataType::Utf8, false),
        Field::new("Parent 1", DataType::Utf8, true),
        Field::new("Parent 2", DataType::Utf8, true),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(
            varieties.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            varieties.iter().map(|v| v.species).collect::<Vec<_>>(),
        )),
        optional(|v| v.parent1),
        optional(|v| v.parent2),
    ];
    for (i, name) in DESCRIPTORS.iter().enumerate() {
        fields.push(Field::new(*name, DataType::Float64, false));
        columns.push(Arc::new(Float64Array::from(
            varieties.iter().map(|v| v.descriptors[i]).collect::<Vec<_>>(),
        )));
    }
    fields.push(Field::new("Kmeans cluster", DataType::Int64, false));
    columns.push(Arc::new(Int64Array::from(
        varieties.iter().map(|v| v.kmeans).collect::<Vec<_>>(),
    )));
    fields.push(Field::new("Ward cluster", DataType::Int64, false));
    columns.push(Arc::new(Int64Array::from(
        varieties.iter().map(|v| v.ward).collect::<Vec<_>>(),
    )));

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

/// Write a synthetic variety table as CSV and Parquet.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Output directory.
    #[arg(default_value = "sample_data")]
    dir: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();

    let dir = Args::parse().dir;
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let varieties = generate(&mut rng);

    let csv_path = dir.join("scion_sample.csv");
    write_csv(&varieties, &csv_path)?;
    let parquet_path = dir.join("scion_sample.parquet");
    write_parquet(&varieties, &parquet_path)?;

    log::info!(
        "Wrote {} varieties to {} and {}",
        varieties.len(),
        csv_path.display(),
        parquet_path.display()
    );
    println!("Wrote {} varieties to {}", varieties.len(), dir.display());
    Ok(())
}
