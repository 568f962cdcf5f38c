use tentackle::data::synthetic::ExportBuilder;
use tentackle::data::{Dimensions, RawCurve, Variant};

/// Idealised tensile response: linear up to yield, work-hardening to the
/// peak, then necking until fracture.
fn tensile_curve(
    points: usize,
    modulus: f64,
    yield_strain: f64,
    fracture_strain: f64,
    dims: &Dimensions,
    rng: &mut SimpleRng,
) -> RawCurve {
    let area = dims.thickness * dims.width;
    let yield_stress = modulus * yield_strain;
    let peak_strain = yield_strain + 0.7 * (fracture_strain - yield_strain);

    let mut force = Vec::with_capacity(points);
    let mut elongation = Vec::with_capacity(points);
    for i in 0..points {
        let strain = fracture_strain * i as f64 / (points - 1) as f64;
        let stress = if strain <= yield_strain {
            modulus * strain
        } else if strain <= peak_strain {
            let t = (strain - yield_strain) / (peak_strain - yield_strain);
            yield_stress * (1.0 + 0.35 * (t * std::f64::consts::FRAC_PI_2).sin())
        } else {
            let t = (strain - peak_strain) / (fracture_strain - peak_strain);
            yield_stress * 1.35 * (1.0 - 0.25 * t * t)
        };
        let noise = rng.gauss(0.0, yield_stress * 0.004);
        force.push(((stress + noise) * area).max(0.0));
        elongation.push(strain * dims.length);
    }
    RawCurve { force, elongation }
}

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

fn main() {
    let mut rng = SimpleRng::new(42);

    // (variant, output file, batches, subbatches, modulus in MPa)
    let files = [
        (Variant::Legacy, "sample_legacy.csv", 3, 1, 2400.0),
        (Variant::VariantB, "sample_variant_b.csv", 1, 3, 3100.0),
    ];

    for (variant, output_path, batches, subbatches, modulus) in files {
        let mut builder = ExportBuilder::new(variant, batches, subbatches).source_name("sample");
        let mut written = 0;

        for batch in 1..=batches {
            for subbatch in 1..=subbatches {
                let dims = Dimensions {
                    thickness: 0.2 + 0.01 * rng.next_f64(),
                    width: 10.0,
                    length: 50.0,
                };
                let fracture = 0.08 + 0.04 * rng.next_f64();
                let raw = tensile_curve(400, modulus, 0.012, fracture, &dims, &mut rng);
                builder = builder.sample(batch, subbatch, dims, raw);
                written += 1;
            }
        }

        builder
            .write(std::path::Path::new(output_path))
            .expect("Failed to write export");
        println!("Wrote {written} samples ({variant}) to {output_path}");
    }
}
