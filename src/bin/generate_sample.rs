use serde_json::{json, Value};

/// Streets around the City of London with an approximate centre point.
const STREETS: [(&str, f64, f64); 8] = [
    ("On or near Wood Street", -0.0936, 51.5155),
    ("On or near Cheapside", -0.0935, 51.5141),
    ("On or near Poultry", -0.0902, 51.5135),
    ("On or near Moorgate", -0.0888, 51.5172),
    ("On or near Gresham Street", -0.0921, 51.5151),
    ("On or near Bishopsgate", -0.0816, 51.5165),
    ("On or near Fenchurch Street", -0.0810, 51.5117),
    ("On or near Queen Victoria Street", -0.0965, 51.5121),
];

/// Crime type with its relative frequency.
const CRIME_TYPES: [(&str, u32); 7] = [
    ("Theft from the person", 30),
    ("Other theft", 25),
    ("Bicycle theft", 15),
    ("Anti-social behaviour", 12),
    ("Drugs", 8),
    ("Robbery", 6),
    ("Shoplifting", 4),
];

const OUTCOMES: [&str; 4] = [
    "Investigation complete; no suspect identified",
    "Under investigation",
    "Unable to prosecute suspect",
    "Offender given a caution",
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

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn pick_crime_type(rng: &mut SimpleRng) -> &'static str {
    let total: u32 = CRIME_TYPES.iter().map(|(_, w)| w).sum();
    let mut roll = (rng.next_f64() * total as f64) as u32;
    for (name, weight) in CRIME_TYPES {
        if roll < weight {
            return name;
        }
        roll -= weight;
    }
    CRIME_TYPES[0].0
}

fn crime(rng: &mut SimpleRng, id: usize, month: u32) -> Value {
    let (street, lon, lat) = STREETS[rng.below(STREETS.len())];
    let outcome = if rng.next_f64() < 0.15 {
        Value::Null
    } else {
        json!(OUTCOMES[rng.below(OUTCOMES.len())])
    };

    json!({
        "type": "Feature",
        "id": format!("{id:08x}"),
        "geometry": {
            "type": "Point",
            "coordinates": [rng.gauss(lon, 0.0004), rng.gauss(lat, 0.0003)]
        },
        "properties": {
            "Crime type": pick_crime_type(rng),
            "Month": format!("2024-{month:02}"),
            "Location": street,
            "Last outcome category": outcome
        }
    })
}

fn main() {
    let mut rng = SimpleRng::new(42);

    let mut features = Vec::new();
    for month in 1..=12u32 {
        // Busier in summer.
        let summer = if (6..=8).contains(&month) { 25 } else { 0 };
        let n = 40 + rng.gauss(0.0, 6.0).abs() as usize + summer;
        for _ in 0..n {
            let id = features.len();
            features.push(crime(&mut rng, id, month));
        }
    }

    let count = features.len();
    let collection = json!({ "type": "FeatureCollection", "features": features });

    let output_path = "sample_crimes.geojson";
    let text = serde_json::to_string_pretty(&collection).expect("Failed to serialise GeoJSON");
    std::fs::write(output_path, text).expect("Failed to write output file");

    println!("Wrote {count} crimes (2024-01 … 2024-12) to {output_path}");
}
