use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use hypso_overlap::data::model::{PointRecord, RockCategory};

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
}

/// Elevation distribution (mean, std dev) of one category at one site.
struct CategoryShape {
    category: RockCategory,
    mean: f64,
    std_dev: f64,
}

/// A synthetic study site centred on (`lon`, `lat`).
struct SampleSite {
    lon: f64,
    lat: f64,
    shapes: [CategoryShape; 3],
}

const POINTS_PER_TABLE: usize = 240;
const POINTS_PER_STREAM: usize = 12;

fn shapes(means: [f64; 3], std_dev: f64) -> [CategoryShape; 3] {
    RockCategory::ALL.map(|category| CategoryShape {
        category,
        mean: means[category.index()],
        std_dev,
    })
}

fn generate_points(site: &SampleSite, shape: &CategoryShape, rng: &mut SimpleRng) -> Vec<PointRecord> {
    (0..POINTS_PER_TABLE)
        .map(|i| {
            // Sparse gaps in the survey show up as the 0 "no data" marker.
            let elevation = if rng.next_f64() < 0.02 {
                0.0
            } else {
                (rng.gauss(shape.mean, shape.std_dev).max(1.0) * 10.0).round() / 10.0
            };
            PointRecord {
                object_id: i as i64 + 1,
                stream_id: (i / POINTS_PER_STREAM) as i64 + 1,
                longitude: site.lon + rng.gauss(0.0, 0.05),
                latitude: site.lat + rng.gauss(0.0, 0.05),
                elevation,
            }
        })
        .collect()
}

fn write_csv(path: &Path, points: &[PointRecord]) {
    let mut writer = csv::Writer::from_path(path).expect("Failed to create output file");
    for point in points {
        writer.serialize(point).expect("Failed to write row");
    }
    writer.flush().expect("Failed to flush output file");
}

fn write_json(path: &Path, points: &[PointRecord]) {
    let file = File::create(path).expect("Failed to create output file");
    serde_json::to_writer_pretty(file, points).expect("Failed to write JSON");
}

fn write_parquet(path: &Path, points: &[PointRecord]) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("ObjectID", DataType::Int64, false),
        Field::new("StreamID", DataType::Int64, false),
        Field::new("Long", DataType::Float64, false),
        Field::new("Lat", DataType::Float64, false),
        Field::new("Elevation", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from_iter_values(points.iter().map(|p| p.object_id))),
            Arc::new(Int64Array::from_iter_values(points.iter().map(|p| p.stream_id))),
            Arc::new(Float64Array::from_iter_values(points.iter().map(|p| p.longitude))),
            Arc::new(Float64Array::from_iter_values(points.iter().map(|p| p.latitude))),
            Arc::new(Float64Array::from_iter_values(points.iter().map(|p| p.elevation))),
        ],
    )
    .expect("Failed to create RecordBatch");

    let file = File::create(path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");
}

fn main() {
    let mut args = std::env::args().skip(1);
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| "sample_data".to_string()));
    let format = args.next().unwrap_or_else(|| "csv".to_string());
    if !["csv", "json", "parquet"].contains(&format.as_str()) {
        eprintln!("Unknown format '{format}', expected csv, json or parquet");
        std::process::exit(2);
    }
    std::fs::create_dir_all(&out_dir).expect("Failed to create output directory");

    let mut rng = SimpleRng::new(42);

    // Site 2 keeps its lithologies at separate elevations, so it has no overlap.
    let sites = [
        SampleSite { lon: -105.6, lat: 40.3, shapes: shapes([1850.0, 1950.0, 2050.0], 90.0) },
        SampleSite { lon: -106.9, lat: 39.1, shapes: shapes([900.0, 1500.0, 2300.0], 25.0) },
        SampleSite { lon: -111.7, lat: 44.4, shapes: shapes([2600.0, 2450.0, 2700.0], 140.0) },
    ];

    let mut written = 0;
    for (i, site) in sites.iter().enumerate() {
        for shape in &site.shapes {
            let points = generate_points(site, shape, &mut rng);
            let name = format!(
                "site{:02}_{}.{format}",
                i + 1,
                shape.category.name().to_ascii_lowercase()
            );
            let path = out_dir.join(name);
            match format.as_str() {
                "json" => write_json(&path, &points),
                "parquet" => write_parquet(&path, &points),
                _ => write_csv(&path, &points),
            }
            written += points.len();
        }
    }

    println!(
        "Wrote {written} points for {} sites ({} tables) to {}",
        sites.len(),
        sites.len() * 3,
        out_dir.display()
    );
}
